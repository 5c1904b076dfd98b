use std::sync::{Arc, Mutex};

use credit_underwriting::workflows::underwriting::{
    ApplicantRegistry, BaselineScorecard, Decision, DecisionEngine, DecisionNotice, Direction,
    DocumentKind, DocumentSlot, EmploymentStatus, FeatureSchema, Gender, LoanDetailsInput,
    LoanType, MaritalStatus, NotificationError, Notifier, PersonalInfoInput, PlainTextExtractor,
    ResidenceType, SubmissionLog, WizardController, WizardPolicy, WizardSession, WizardStage,
};

#[derive(Default, Clone)]
struct RecordingNotifier {
    notices: Arc<Mutex<Vec<DecisionNotice>>>,
}

impl Notifier for RecordingNotifier {
    async fn notify(&self, notice: &DecisionNotice) -> Result<(), NotificationError> {
        self.notices
            .lock()
            .expect("notice mutex poisoned")
            .push(notice.clone());
        Ok(())
    }
}

fn controller(
    notifier: RecordingNotifier,
) -> (
    WizardController<PlainTextExtractor, RecordingNotifier>,
    Arc<SubmissionLog>,
) {
    let schema = FeatureSchema::standard();
    let engine = DecisionEngine::new(Arc::new(BaselineScorecard::new(&schema)), schema);
    engine.verify().expect("baseline matches the standard schema");
    let submissions = Arc::new(SubmissionLog::new());
    let controller = WizardController::new(
        Arc::new(ApplicantRegistry::new()),
        submissions.clone(),
        Arc::new(engine),
        Arc::new(PlainTextExtractor),
        Arc::new(notifier),
        WizardPolicy::default(),
    );
    (controller, submissions)
}

fn personal() -> PersonalInfoInput {
    PersonalInfoInput {
        name: "Asha Rao".to_string(),
        applicant_age: 30,
        gender: Gender::Female,
        income_annum: 1_200_000.0,
        email: "asha@x.com".to_string(),
        phone: "9876543210".to_string(),
        address: None,
    }
}

fn loan() -> LoanDetailsInput {
    LoanDetailsInput {
        marital_status: MaritalStatus::Married,
        employee_status: EmploymentStatus::Employed,
        residence_type: ResidenceType::Owned,
        cibil_score: 750,
        loan_amount: 600_000.0,
        loan_interest: 12.5,
        loan_type: LoanType::Personal,
        loan_purpose: "Wedding".to_string(),
        loan_term: 36,
        active_loans: 1,
    }
}

#[tokio::test]
async fn applicant_walks_every_stage_to_an_approval() {
    let notifier = RecordingNotifier::default();
    let (controller, submissions) = controller(notifier.clone());
    let mut session = WizardSession::new();

    let saved = controller
        .save_personal(&mut session, personal())
        .expect("personal info accepted");
    assert_eq!(
        controller.navigate(&mut session, Direction::Next).expect("advance"),
        WizardStage::LoanDetails
    );

    let loan_saved = controller
        .save_loan(&mut session, loan())
        .expect("loan accepted");
    assert!((loan_saved.loan_percent_income - 50.0).abs() < 1e-9);
    assert_eq!(
        controller.navigate(&mut session, Direction::Next).expect("advance"),
        WizardStage::UploadDocuments
    );

    for (slot, text) in [
        (DocumentSlot::Aadhar, "Unique Identification Authority\nAsha Rao\nDOB 01/01/1995"),
        (DocumentSlot::Pan, "Permanent Account Number\nASHA RAO"),
        (DocumentSlot::Salary, "Salary slip - March\nNet pay 100000"),
    ] {
        let upload = controller
            .upload_document(&mut session, slot, text.as_bytes(), DocumentKind::ScannedDocument)
            .await
            .expect("upload handled");
        assert!(upload.extracted, "{slot:?} text extracted");
    }
    assert_eq!(
        controller.navigate(&mut session, Direction::Next).expect("advance"),
        WizardStage::FinalDecision
    );

    let report = controller.submit(&mut session).await.expect("decision");
    assert_eq!(report.outcome.decision, Decision::Approved);
    assert_eq!(report.outcome.applicant_id, Some(saved.applicant_id.clone()));
    let approval_id = report.outcome.approval_id.clone().expect("approval id");

    let replay = controller.submit(&mut session).await.expect("replay");
    assert!(replay.replayed);
    assert_eq!(replay.outcome.approval_id, Some(approval_id.clone()));

    let notices = notifier.notices.lock().expect("notice mutex poisoned").clone();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].recipient, "asha@x.com");
    assert!(notices[0].body().contains(&approval_id.0));

    let exported = submissions.snapshot();
    assert_eq!(exported.len(), 1);
    assert_eq!(exported[0].decision, Decision::Approved);
    assert_eq!(exported[0].document_texts.len(), 3);
}

#[tokio::test]
async fn over_leveraged_loan_never_reaches_a_decision() {
    let (controller, submissions) = controller(RecordingNotifier::default());
    let mut session = WizardSession::new();

    controller
        .save_personal(
            &mut session,
            PersonalInfoInput {
                income_annum: 1_000_000.0,
                ..personal()
            },
        )
        .expect("personal info accepted");
    controller
        .navigate(&mut session, Direction::Next)
        .expect("advance");

    let rejected = controller.save_loan(
        &mut session,
        LoanDetailsInput {
            loan_amount: 15_000_000.0,
            ..loan()
        },
    );
    assert!(rejected.is_err());
    assert!(session.record.loan.is_none());
    assert!(submissions.is_empty());
    assert!(controller.navigate(&mut session, Direction::Next).is_err());
    assert_eq!(session.stage, WizardStage::LoanDetails);
}
