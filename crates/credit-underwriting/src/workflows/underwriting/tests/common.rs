use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::response::Response;
use serde_json::Value;

use crate::workflows::underwriting::classifier::{Classifier, ClassifierError};
use crate::workflows::underwriting::decision::DecisionEngine;
use crate::workflows::underwriting::documents::{DocumentKind, ExtractionError, TextExtractor};
use crate::workflows::underwriting::domain::{
    EmploymentStatus, Gender, LoanDetailsInput, LoanType, MaritalStatus, PersonalInfoInput,
    ResidenceType,
};
use crate::workflows::underwriting::encoding::{FeatureSchema, FeatureVector};
use crate::workflows::underwriting::notification::{
    DecisionNotice, NotificationError, Notifier,
};
use crate::workflows::underwriting::registry::ApplicantRegistry;
use crate::workflows::underwriting::submissions::SubmissionLog;
use crate::workflows::underwriting::wizard::{
    Direction, WizardController, WizardPolicy, WizardSession,
};
use crate::workflows::underwriting::{underwriting_router, BaselineScorecard, PlainTextExtractor};
use crate::workflows::underwriting::UnderwritingService;

pub(super) fn asha_personal() -> PersonalInfoInput {
    PersonalInfoInput {
        name: "Asha Rao".to_string(),
        applicant_age: 30,
        gender: Gender::Female,
        income_annum: 1_200_000.0,
        email: "asha@x.com".to_string(),
        phone: "9876543210".to_string(),
        address: Some("12 MG Road, Bengaluru".to_string()),
    }
}

pub(super) fn asha_loan() -> LoanDetailsInput {
    LoanDetailsInput {
        marital_status: MaritalStatus::Single,
        employee_status: EmploymentStatus::Employed,
        residence_type: ResidenceType::Rented,
        cibil_score: 750,
        loan_amount: 600_000.0,
        loan_interest: 12.5,
        loan_type: LoanType::Personal,
        loan_purpose: "Wedding".to_string(),
        loan_term: 36,
        active_loans: 1,
    }
}

pub(super) fn low_cibil_loan() -> LoanDetailsInput {
    LoanDetailsInput {
        cibil_score: 640,
        ..asha_loan()
    }
}

pub(super) fn fast_policy() -> WizardPolicy {
    WizardPolicy {
        require_loan_before_upload: true,
        extraction_timeout: Duration::from_millis(50),
        notification_timeout: Duration::from_millis(50),
    }
}

pub(super) fn baseline_engine() -> Arc<DecisionEngine> {
    let schema = FeatureSchema::standard();
    let classifier = Arc::new(BaselineScorecard::new(&schema));
    Arc::new(DecisionEngine::new(classifier, schema))
}

pub(super) fn engine_with(classifier: Arc<dyn Classifier>) -> Arc<DecisionEngine> {
    Arc::new(DecisionEngine::new(classifier, FeatureSchema::standard()))
}

pub(super) struct Harness<X, N> {
    pub(super) controller: WizardController<X, N>,
    pub(super) registry: Arc<ApplicantRegistry>,
    pub(super) submissions: Arc<SubmissionLog>,
    pub(super) notifier: Arc<N>,
}

pub(super) fn harness_with<X, N>(
    extractor: X,
    notifier: N,
    engine: Arc<DecisionEngine>,
    policy: WizardPolicy,
) -> Harness<X, N>
where
    X: TextExtractor + 'static,
    N: Notifier + 'static,
{
    let registry = Arc::new(ApplicantRegistry::new());
    let submissions = Arc::new(SubmissionLog::new());
    let notifier = Arc::new(notifier);
    let controller = WizardController::new(
        registry.clone(),
        submissions.clone(),
        engine,
        Arc::new(extractor),
        notifier.clone(),
        policy,
    );
    Harness {
        controller,
        registry,
        submissions,
        notifier,
    }
}

pub(super) fn harness() -> Harness<PlainTextExtractor, MemoryNotifier> {
    harness_with(
        PlainTextExtractor,
        MemoryNotifier::default(),
        baseline_engine(),
        fast_policy(),
    )
}

/// Save both forms and walk the session to the final stage.
pub(super) fn complete_forms<X, N>(
    controller: &WizardController<X, N>,
    session: &mut WizardSession,
    loan: LoanDetailsInput,
) where
    X: TextExtractor + 'static,
    N: Notifier + 'static,
{
    controller
        .save_personal(session, asha_personal())
        .expect("personal info saves");
    controller
        .navigate(session, Direction::Next)
        .expect("advance to loan details");
    controller.save_loan(session, loan).expect("loan saves");
    controller
        .navigate(session, Direction::Next)
        .expect("advance to uploads");
    controller
        .navigate(session, Direction::Next)
        .expect("advance to decision");
}

/// Classifier returning a fixed class and counting invocations.
pub(super) struct StubClassifier {
    feature_names: Vec<String>,
    class: u8,
    calls: AtomicUsize,
}

impl StubClassifier {
    pub(super) fn new(class: u8) -> Self {
        Self::with_features(class, FeatureSchema::standard().columns())
    }

    pub(super) fn with_features(class: u8, feature_names: Vec<String>) -> Self {
        Self {
            feature_names,
            class,
            calls: AtomicUsize::new(0),
        }
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Classifier for StubClassifier {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn predict(&self, _features: &FeatureVector) -> Result<u8, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.class)
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryNotifier {
    sent: Arc<Mutex<Vec<DecisionNotice>>>,
}

impl MemoryNotifier {
    pub(super) fn sent(&self) -> Vec<DecisionNotice> {
        self.sent.lock().expect("notifier mutex poisoned").clone()
    }
}

impl Notifier for MemoryNotifier {
    async fn notify(&self, notice: &DecisionNotice) -> Result<(), NotificationError> {
        self.sent
            .lock()
            .expect("notifier mutex poisoned")
            .push(notice.clone());
        Ok(())
    }
}

pub(super) struct FailingNotifier;

impl Notifier for FailingNotifier {
    async fn notify(&self, _notice: &DecisionNotice) -> Result<(), NotificationError> {
        Err(NotificationError::Transport("smtp relay offline".to_string()))
    }
}

pub(super) struct SlowNotifier;

impl Notifier for SlowNotifier {
    async fn notify(&self, _notice: &DecisionNotice) -> Result<(), NotificationError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(())
    }
}

pub(super) struct FailingExtractor;

impl TextExtractor for FailingExtractor {
    async fn extract_text(
        &self,
        _bytes: &[u8],
        kind: DocumentKind,
    ) -> Result<String, ExtractionError> {
        Err(ExtractionError::Empty(kind.label()))
    }
}

pub(super) struct SlowExtractor;

impl TextExtractor for SlowExtractor {
    async fn extract_text(
        &self,
        _bytes: &[u8],
        _kind: DocumentKind,
    ) -> Result<String, ExtractionError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok("late text".to_string())
    }
}

pub(super) fn router_with_notifier() -> (axum::Router, MemoryNotifier) {
    let notifier = MemoryNotifier::default();
    let harness = harness_with(
        PlainTextExtractor,
        notifier.clone(),
        baseline_engine(),
        fast_policy(),
    );
    let service = Arc::new(UnderwritingService::new(harness.controller));
    (underwriting_router(service), notifier)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) async fn read_text_body(response: Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    String::from_utf8(body.to_vec()).expect("utf-8 body")
}
