use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::decision::DecisionError;
use super::documents::{DocumentKind, TextExtractor};
use super::domain::{DocumentSlot, LoanDetailsInput, PersonalInfoInput};
use super::emi::{EmiQuote, EmiRequest};
use super::faq::FaqResponder;
use super::notification::Notifier;
use super::service::{ServiceError, UnderwritingService};
use super::wizard::{Direction, SessionId, WizardError};

const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

/// Router builder exposing the wizard, export, batch and helper endpoints.
pub fn underwriting_router<X, N>(service: Arc<UnderwritingService<X, N>>) -> Router
where
    X: TextExtractor + 'static,
    N: Notifier + 'static,
{
    Router::new()
        .route(
            "/api/v1/underwriting/sessions",
            post(start_session_handler::<X, N>),
        )
        .route(
            "/api/v1/underwriting/sessions/:session_id",
            get(view_session_handler::<X, N>).delete(end_session_handler::<X, N>),
        )
        .route(
            "/api/v1/underwriting/sessions/:session_id/personal",
            post(personal_handler::<X, N>),
        )
        .route(
            "/api/v1/underwriting/sessions/:session_id/loan",
            post(loan_handler::<X, N>),
        )
        .route(
            "/api/v1/underwriting/sessions/:session_id/navigate",
            post(navigate_handler::<X, N>),
        )
        .route(
            "/api/v1/underwriting/sessions/:session_id/documents/:slot",
            post(upload_handler::<X, N>),
        )
        .route(
            "/api/v1/underwriting/sessions/:session_id/decision",
            post(decision_handler::<X, N>),
        )
        .route(
            "/api/v1/underwriting/submissions",
            get(submissions_handler::<X, N>),
        )
        .route("/api/v1/underwriting/batch", post(batch_handler::<X, N>))
        .route("/api/v1/underwriting/emi", post(emi_handler))
        .route("/api/v1/underwriting/faq", post(faq_handler))
        .with_state(service)
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServiceError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Wizard(WizardError::Validation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::Wizard(WizardError::SequenceBlocked { .. })
            | ServiceError::Wizard(WizardError::DecisionFinalized(_))
            | ServiceError::Wizard(WizardError::NameTaken(_))
            | ServiceError::Wizard(WizardError::DuplicateApplication(_)) => StatusCode::CONFLICT,
            ServiceError::Wizard(WizardError::Decision(DecisionError::PrerequisiteIncomplete(_))) => {
                StatusCode::CONFLICT
            }
            ServiceError::Wizard(WizardError::Decision(DecisionError::IdentityMismatch { .. })) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ServiceError::Batch(_) => StatusCode::BAD_REQUEST,
            ServiceError::Wizard(WizardError::Decision(_)) | ServiceError::Export(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let payload = match &self {
            ServiceError::Wizard(WizardError::Validation(rejection)) => json!({
                "error": self.to_string(),
                "stage": rejection.stage,
                "reasons": rejection.reasons,
            }),
            _ => json!({ "error": self.to_string() }),
        };
        (status, axum::Json(payload)).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct NavigateRequest {
    direction: Direction,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct UploadParams {
    kind: Option<DocumentKind>,
    filename: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FaqRequest {
    question: String,
}

pub(crate) async fn start_session_handler<X, N>(
    State(service): State<Arc<UnderwritingService<X, N>>>,
) -> Response
where
    X: TextExtractor + 'static,
    N: Notifier + 'static,
{
    let view = service.start_session();
    (StatusCode::CREATED, axum::Json(view)).into_response()
}

pub(crate) async fn view_session_handler<X, N>(
    State(service): State<Arc<UnderwritingService<X, N>>>,
    Path(session_id): Path<String>,
) -> Response
where
    X: TextExtractor + 'static,
    N: Notifier + 'static,
{
    match service.view(&SessionId(session_id)).await {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn end_session_handler<X, N>(
    State(service): State<Arc<UnderwritingService<X, N>>>,
    Path(session_id): Path<String>,
) -> Response
where
    X: TextExtractor + 'static,
    N: Notifier + 'static,
{
    match service.end_session(&SessionId(session_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn personal_handler<X, N>(
    State(service): State<Arc<UnderwritingService<X, N>>>,
    Path(session_id): Path<String>,
    axum::Json(input): axum::Json<PersonalInfoInput>,
) -> Response
where
    X: TextExtractor + 'static,
    N: Notifier + 'static,
{
    match service.save_personal(&SessionId(session_id), input).await {
        Ok(saved) => (StatusCode::OK, axum::Json(saved)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn loan_handler<X, N>(
    State(service): State<Arc<UnderwritingService<X, N>>>,
    Path(session_id): Path<String>,
    axum::Json(input): axum::Json<LoanDetailsInput>,
) -> Response
where
    X: TextExtractor + 'static,
    N: Notifier + 'static,
{
    match service.save_loan(&SessionId(session_id), input).await {
        Ok(saved) => (StatusCode::OK, axum::Json(saved)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn navigate_handler<X, N>(
    State(service): State<Arc<UnderwritingService<X, N>>>,
    Path(session_id): Path<String>,
    axum::Json(request): axum::Json<NavigateRequest>,
) -> Response
where
    X: TextExtractor + 'static,
    N: Notifier + 'static,
{
    match service
        .navigate(&SessionId(session_id), request.direction)
        .await
    {
        Ok(stage) => {
            let payload = json!({
                "stage": stage,
                "stage_label": stage.label(),
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error.into_response(),
    }
}

fn resolve_kind(params: &UploadParams, headers: &HeaderMap) -> Option<DocumentKind> {
    params
        .kind
        .or_else(|| params.filename.as_deref().and_then(DocumentKind::from_filename))
        .or_else(|| {
            headers
                .get(header::CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.parse::<mime::Mime>().ok())
                .and_then(|media| DocumentKind::from_mime(&media))
        })
}

pub(crate) async fn upload_handler<X, N>(
    State(service): State<Arc<UnderwritingService<X, N>>>,
    Path((session_id, slot)): Path<(String, String)>,
    Query(params): Query<UploadParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    X: TextExtractor + 'static,
    N: Notifier + 'static,
{
    let Some(slot) = DocumentSlot::parse(&slot) else {
        let payload = json!({
            "error": format!("unknown document slot '{slot}'"),
        });
        return (StatusCode::NOT_FOUND, axum::Json(payload)).into_response();
    };

    let Some(kind) = resolve_kind(&params, &headers) else {
        let payload = json!({
            "error": "upload must be an image or a PDF scan",
        });
        return (StatusCode::UNSUPPORTED_MEDIA_TYPE, axum::Json(payload)).into_response();
    };

    match service
        .upload_document(&SessionId(session_id), slot, &body, kind)
        .await
    {
        Ok(upload) => (StatusCode::OK, axum::Json(upload)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn decision_handler<X, N>(
    State(service): State<Arc<UnderwritingService<X, N>>>,
    Path(session_id): Path<String>,
) -> Response
where
    X: TextExtractor + 'static,
    N: Notifier + 'static,
{
    match service.submit(&SessionId(session_id)).await {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn submissions_handler<X, N>(
    State(service): State<Arc<UnderwritingService<X, N>>>,
) -> Response
where
    X: TextExtractor + 'static,
    N: Notifier + 'static,
{
    match service.submissions_csv() {
        Ok(csv) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, CSV_CONTENT_TYPE)],
            csv,
        )
            .into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn batch_handler<X, N>(
    State(service): State<Arc<UnderwritingService<X, N>>>,
    body: Bytes,
) -> Response
where
    X: TextExtractor + 'static,
    N: Notifier + 'static,
{
    let mut scored = Vec::new();
    match service.score_batch(body.as_ref(), &mut scored) {
        Ok(_) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, CSV_CONTENT_TYPE)],
            scored,
        )
            .into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn emi_handler(axum::Json(request): axum::Json<EmiRequest>) -> Response {
    match EmiQuote::compute(request) {
        Ok(quote) => (StatusCode::OK, axum::Json(quote)).into_response(),
        Err(error) => {
            let payload = json!({
                "error": error.to_string(),
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn faq_handler(axum::Json(request): axum::Json<FaqRequest>) -> Response {
    let answer = FaqResponder.answer(&request.question);
    (StatusCode::OK, axum::Json(answer)).into_response()
}
