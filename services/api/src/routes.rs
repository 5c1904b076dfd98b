use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use credit_underwriting::workflows::underwriting::{
    underwriting_router, Notifier, TextExtractor, UnderwritingService, IMPROVEMENT_TIPS,
};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_underwriting_routes<X, N>(
    service: Arc<UnderwritingService<X, N>>,
) -> axum::Router
where
    X: TextExtractor + 'static,
    N: Notifier + 'static,
{
    underwriting_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/underwriting/tips",
            axum::routing::get(credit_tips_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Static guidance for improving a CIBIL score.
pub(crate) async fn credit_tips_endpoint() -> Json<serde_json::Value> {
    Json(json!({ "tips": IMPROVEMENT_TIPS }))
}
