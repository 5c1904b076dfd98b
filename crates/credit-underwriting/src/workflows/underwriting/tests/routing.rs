use super::common::*;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::workflows::underwriting::router::decision_handler;
use crate::workflows::underwriting::{PersonalInfoInput, PlainTextExtractor, UnderwritingService};

fn json_request(method: &str, uri: &str, payload: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(payload).unwrap()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn start_session(router: &axum::Router) -> String {
    let response = router
        .clone()
        .oneshot(empty_request("POST", "/api/v1/underwriting/sessions"))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert_eq!(payload["stage"], json!("personal_info"));
    payload["session_id"]
        .as_str()
        .expect("session id")
        .to_string()
}

async fn navigate(router: &axum::Router, session: &str, direction: &str) -> StatusCode {
    router
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/v1/underwriting/sessions/{session}/navigate"),
            &json!({ "direction": direction }),
        ))
        .await
        .expect("route executes")
        .status()
}

#[tokio::test]
async fn full_wizard_over_http_approves_the_reference_applicant() {
    let (router, notifier) = router_with_notifier();
    let session = start_session(&router).await;
    let base = format!("/api/v1/underwriting/sessions/{session}");

    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("{base}/personal"),
            &serde_json::to_value(asha_personal()).unwrap(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let saved = read_json_body(response).await;
    let applicant_id = saved["applicant_id"].as_str().expect("id").to_string();

    assert_eq!(navigate(&router, &session, "next").await, StatusCode::OK);

    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("{base}/loan"),
            &serde_json::to_value(asha_loan()).unwrap(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json_body(response).await["loan_percent_income"], json!(50.0));

    assert_eq!(navigate(&router, &session, "next").await, StatusCode::OK);

    let response = router
        .clone()
        .oneshot(
            Request::post(format!("{base}/documents/aadhar?filename=aadhar.png"))
                .body(Body::from("Government of India\nAsha Rao"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let upload = read_json_body(response).await;
    assert_eq!(upload["extracted"], json!(true));
    assert_eq!(upload["kind"], json!("image"));

    assert_eq!(navigate(&router, &session, "next").await, StatusCode::OK);

    let response = router
        .clone()
        .oneshot(empty_request("POST", &format!("{base}/decision")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let report = read_json_body(response).await;
    assert_eq!(report["headline"], json!("Loan Approved"));
    assert_eq!(report["decision"], json!("approved"));
    assert_eq!(report["applicant_id"], json!(applicant_id));
    assert_eq!(report["notification"]["status"], json!("sent"));
    assert_eq!(report["replayed"], json!(false));
    assert_eq!(notifier.sent().len(), 1);

    let response = router
        .clone()
        .oneshot(empty_request("GET", "/api/v1/underwriting/submissions"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/csv; charset=utf-8"
    );
    let csv = read_text_body(response).await;
    assert!(csv.contains(&applicant_id));
    assert!(csv.contains("approved"));
}

#[tokio::test]
async fn invalid_personal_info_is_unprocessable() {
    let (router, _) = router_with_notifier();
    let session = start_session(&router).await;
    let payload = serde_json::to_value(PersonalInfoInput {
        phone: "0000000000".to_string(),
        ..asha_personal()
    })
    .unwrap();

    let response = router
        .oneshot(json_request(
            "POST",
            &format!("/api/v1/underwriting/sessions/{session}/personal"),
            &payload,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json_body(response).await;
    assert_eq!(body["stage"], json!("personal_info"));
    assert_eq!(body["reasons"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn blocked_navigation_is_a_conflict() {
    let (router, _) = router_with_notifier();
    let session = start_session(&router).await;

    assert_eq!(navigate(&router, &session, "next").await, StatusCode::CONFLICT);
    assert_eq!(navigate(&router, &session, "previous").await, StatusCode::OK);
}

#[tokio::test]
async fn unknown_sessions_are_not_found() {
    let (router, _) = router_with_notifier();

    let response = router
        .clone()
        .oneshot(empty_request("GET", "/api/v1/underwriting/sessions/missing"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = router
        .oneshot(empty_request("DELETE", "/api/v1/underwriting/sessions/missing"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn sessions_can_be_viewed_and_discarded() {
    let (router, _) = router_with_notifier();
    let session = start_session(&router).await;
    let uri = format!("/api/v1/underwriting/sessions/{session}");

    let response = router.clone().oneshot(empty_request("GET", &uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let view = read_json_body(response).await;
    assert_eq!(view["stage_label"], json!("Personal Information"));
    assert_eq!(view["record"]["decision"], json!("pending"));

    let response = router.clone().oneshot(empty_request("DELETE", &uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = router.oneshot(empty_request("GET", &uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn uploads_need_a_known_slot_and_kind() {
    let (router, _) = router_with_notifier();
    let session = start_session(&router).await;
    let base = format!("/api/v1/underwriting/sessions/{session}/documents");

    let response = router
        .clone()
        .oneshot(
            Request::post(format!("{base}/passport?kind=image"))
                .body(Body::from("text"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = router
        .clone()
        .oneshot(
            Request::post(format!("{base}/pan?filename=notes.docx"))
                .body(Body::from("text"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let response = router
        .oneshot(
            Request::post(format!("{base}/pan"))
                .header(header::CONTENT_TYPE, "application/pdf")
                .body(Body::from("text"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(
        response.status(),
        StatusCode::CONFLICT,
        "uploads belong to the upload stage"
    );
}

#[tokio::test]
async fn decision_handler_reports_incomplete_sessions_as_conflicts() {
    let service = Arc::new(UnderwritingService::new(
        harness_with(
            PlainTextExtractor,
            MemoryNotifier::default(),
            baseline_engine(),
            fast_policy(),
        )
        .controller,
    ));
    let view = service.start_session();

    let response = decision_handler::<PlainTextExtractor, MemoryNotifier>(
        State(service),
        Path(view.session_id.0.clone()),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn batch_route_scores_csv_uploads() {
    let (router, _) = router_with_notifier();
    let csv = "name,applicant_age,gender,income_annum,email,phone,marital_status,employee_status,residence_type,cibil_score,loan_amount,loan_interest,loan_type,loan_purpose,loan_term,active_loans\n\
               Asha Rao,30,Female,1200000,asha@x.com,9876543210,Single,Employed,Rented,750,600000,12.5,Personal,Wedding,36,1\n";

    let response = router
        .oneshot(
            Request::post("/api/v1/underwriting/batch")
                .header(header::CONTENT_TYPE, "text/csv")
                .body(Body::from(csv))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let scored = read_text_body(response).await;
    let mut lines = scored.lines();
    assert!(lines
        .next()
        .unwrap()
        .ends_with("decision,approval_probability,detail"));
    assert!(lines.next().unwrap().contains(",approved,"));
}

#[tokio::test]
async fn emi_route_quotes_installments() {
    let (router, _) = router_with_notifier();

    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/underwriting/emi",
            &json!({ "principal": 100000.0, "annual_rate_percent": 12.0, "months": 12 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let quote = read_json_body(response).await;
    let installment = quote["monthly_installment"].as_f64().unwrap();
    assert!((installment - 8884.88).abs() < 0.01);

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/v1/underwriting/emi",
            &json!({ "principal": 100000.0, "annual_rate_percent": 12.0, "months": 0 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn faq_route_answers_questions() {
    let (router, _) = router_with_notifier();

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/v1/underwriting/faq",
            &json!({ "question": "How is my EMI calculated?" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let answer = read_json_body(response).await;
    assert_eq!(answer["topic"], json!("emi"));
}
