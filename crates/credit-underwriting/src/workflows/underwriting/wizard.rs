use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::decision::{DecisionEngine, DecisionError, DecisionOutcome};
use super::documents::{extract_with_timeout, DocumentKind, DocumentUpload, TextExtractor};
use super::domain::{
    ApplicantId, ApplicantRecord, Decision, DocumentSlot, LoanDetailsInput, PersonalInfoInput,
    WizardStage,
};
use super::notification::{
    notify_with_timeout, DecisionNotice, NoticeDetails, NotificationStatus, Notifier,
};
use super::registry::{ApplicantRegistry, DuplicateRegistration, Registration};
use super::submissions::{DuplicateApplication, SubmissionLog};
use super::validation::{validate_loan, validate_personal, ValidationRejected};

/// Opaque handle for a wizard session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn issue() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Next,
    Previous,
}

/// Tunables for stage gating and collaborator timeouts.
#[derive(Debug, Clone, PartialEq)]
pub struct WizardPolicy {
    /// Require a loan-details save before entering the upload stage.
    pub require_loan_before_upload: bool,
    pub extraction_timeout: Duration,
    pub notification_timeout: Duration,
}

impl Default for WizardPolicy {
    fn default() -> Self {
        Self {
            require_loan_before_upload: true,
            extraction_timeout: Duration::from_secs(5),
            notification_timeout: Duration::from_secs(3),
        }
    }
}

/// Per-session context: the stage pointer and the one live applicant record.
#[derive(Debug, Clone)]
pub struct WizardSession {
    pub id: SessionId,
    pub stage: WizardStage,
    pub record: ApplicantRecord,
    pub notification: Option<NotificationStatus>,
    pub started_at: DateTime<Utc>,
    outcome: Option<DecisionOutcome>,
}

impl WizardSession {
    pub fn new() -> Self {
        Self {
            id: SessionId::issue(),
            stage: WizardStage::PersonalInfo,
            record: ApplicantRecord::new(),
            notification: None,
            started_at: Utc::now(),
            outcome: None,
        }
    }

    pub fn outcome(&self) -> Option<&DecisionOutcome> {
        self.outcome.as_ref()
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            session_id: self.id.clone(),
            stage: self.stage,
            stage_label: self.stage.label(),
            record: self.record.clone(),
            notification: self.notification.clone(),
        }
    }
}

impl Default for WizardSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable snapshot of a session for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: SessionId,
    pub stage: WizardStage,
    pub stage_label: &'static str,
    pub record: ApplicantRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<NotificationStatus>,
}

#[derive(Debug, thiserror::Error)]
pub enum WizardError {
    #[error(transparent)]
    Validation(#[from] ValidationRejected),
    #[error("sequence blocked at {stage}: {reason}")]
    SequenceBlocked { stage: WizardStage, reason: String },
    #[error("application already {}; saved data can no longer change", .0.label())]
    DecisionFinalized(Decision),
    #[error("{0}; a saved applicant id cannot change")]
    NameTaken(DuplicateRegistration),
    #[error(transparent)]
    DuplicateApplication(#[from] DuplicateApplication),
    #[error(transparent)]
    Decision(#[from] DecisionError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonalSaved {
    pub applicant_id: ApplicantId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate: Option<DuplicateRegistration>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoanSaved {
    pub loan_percent_income: f64,
}

/// Decision render returned by the final stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionReport {
    pub headline: &'static str,
    #[serde(flatten)]
    pub outcome: DecisionOutcome,
    pub notification: NotificationStatus,
    /// `true` when the stored decision was returned instead of a fresh one.
    pub replayed: bool,
}

/// Drives stage sequencing and owns each session record's lifecycle.
pub struct WizardController<X, N> {
    registry: Arc<ApplicantRegistry>,
    submissions: Arc<SubmissionLog>,
    engine: Arc<DecisionEngine>,
    extractor: Arc<X>,
    notifier: Arc<N>,
    policy: WizardPolicy,
}

impl<X, N> WizardController<X, N>
where
    X: TextExtractor + 'static,
    N: Notifier + 'static,
{
    pub fn new(
        registry: Arc<ApplicantRegistry>,
        submissions: Arc<SubmissionLog>,
        engine: Arc<DecisionEngine>,
        extractor: Arc<X>,
        notifier: Arc<N>,
        policy: WizardPolicy,
    ) -> Self {
        Self {
            registry,
            submissions,
            engine,
            extractor,
            notifier,
            policy,
        }
    }

    pub fn engine(&self) -> &DecisionEngine {
        &self.engine
    }

    pub fn submissions(&self) -> &SubmissionLog {
        &self.submissions
    }

    pub fn policy(&self) -> &WizardPolicy {
        &self.policy
    }

    fn require_stage(session: &WizardSession, expected: WizardStage) -> Result<(), WizardError> {
        if session.stage != expected {
            return Err(WizardError::SequenceBlocked {
                stage: session.stage,
                reason: format!("this action belongs to the {expected} stage"),
            });
        }
        Ok(())
    }

    fn require_open(session: &WizardSession) -> Result<(), WizardError> {
        if session.record.decision.is_final() {
            return Err(WizardError::DecisionFinalized(session.record.decision));
        }
        Ok(())
    }

    /// Validate and merge the personal-information form.
    pub fn save_personal(
        &self,
        session: &mut WizardSession,
        input: PersonalInfoInput,
    ) -> Result<PersonalSaved, WizardError> {
        Self::require_stage(session, WizardStage::PersonalInfo)?;
        Self::require_open(session)?;

        let personal = validate_personal(input).inspect_err(|rejection| {
            warn!(session_id = %session.id, %rejection, "personal info rejected");
        })?;

        let (applicant_id, duplicate) = match session.record.applicant_id.clone() {
            Some(id) => {
                self.registry
                    .bind(&personal.name, &id)
                    .map_err(WizardError::NameTaken)
                    .inspect_err(|error| {
                        warn!(session_id = %session.id, applicant_id = %id, %error, "rename rejected");
                    })?;
                (id, None)
            }
            None => match self.registry.register(&personal.name) {
                Registration::Issued(id) => (id, None),
                Registration::Existing(duplicate) => (duplicate.existing_id.clone(), Some(duplicate)),
            },
        };

        session.record.merge_personal(personal);
        session.record.assign_applicant_id(applicant_id.clone());
        info!(session_id = %session.id, %applicant_id, "personal info saved");

        Ok(PersonalSaved {
            applicant_id,
            duplicate,
        })
    }

    /// Validate and merge the loan-details form, recomputing the loan-to-income percentage.
    pub fn save_loan(
        &self,
        session: &mut WizardSession,
        input: LoanDetailsInput,
    ) -> Result<LoanSaved, WizardError> {
        Self::require_stage(session, WizardStage::LoanDetails)?;
        Self::require_open(session)?;

        let income_annum =
            session
                .record
                .income_annum()
                .ok_or_else(|| WizardError::SequenceBlocked {
                    stage: session.stage,
                    reason: "personal information must be saved first".to_string(),
                })?;

        let loan = validate_loan(input, income_annum).inspect_err(|rejection| {
            warn!(session_id = %session.id, %rejection, "loan details rejected");
        })?;
        let loan_percent_income = loan.loan_percent_income;

        let mut candidate = session.record.clone();
        candidate.merge_loan(loan);
        self.submissions
            .submit(&session.id, &candidate)
            .inspect_err(|duplicate| {
                warn!(session_id = %session.id, %duplicate, "duplicate application rejected");
            })?;
        session.record = candidate;
        info!(session_id = %session.id, loan_percent_income, "loan details saved");

        Ok(LoanSaved {
            loan_percent_income,
        })
    }

    /// Move the stage pointer; forward moves are gated on saved data.
    pub fn navigate(
        &self,
        session: &mut WizardSession,
        direction: Direction,
    ) -> Result<WizardStage, WizardError> {
        let target = match direction {
            Direction::Previous => session.stage.previous(),
            Direction::Next => {
                self.check_forward(session)?;
                session.stage.next()
            }
        };

        if let Some(stage) = target {
            session.stage = stage;
        }
        Ok(session.stage)
    }

    fn check_forward(&self, session: &WizardSession) -> Result<(), WizardError> {
        let blocked = match session.stage {
            WizardStage::PersonalInfo if !session.record.has_personal_info() => {
                Some("name, income, email and phone must be saved first")
            }
            WizardStage::LoanDetails
                if self.policy.require_loan_before_upload
                    && !session.record.has_loan_details() =>
            {
                Some("loan details must be saved first")
            }
            _ => None,
        };

        match blocked {
            Some(reason) => Err(WizardError::SequenceBlocked {
                stage: session.stage,
                reason: reason.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Extract text from an uploaded document. Extraction failures are warnings only.
    pub async fn upload_document(
        &self,
        session: &mut WizardSession,
        slot: DocumentSlot,
        bytes: &[u8],
        kind: DocumentKind,
    ) -> Result<DocumentUpload, WizardError> {
        Self::require_stage(session, WizardStage::UploadDocuments)?;
        Self::require_open(session)?;

        match extract_with_timeout(
            self.extractor.as_ref(),
            bytes,
            kind,
            self.policy.extraction_timeout,
        )
        .await
        {
            Ok(text) => {
                let characters = text.chars().count();
                session.record.record_document(slot, text);
                info!(session_id = %session.id, slot = slot.label(), characters, "document text extracted");
                Ok(DocumentUpload {
                    slot,
                    kind,
                    extracted: true,
                    characters,
                    warning: None,
                })
            }
            Err(error) => {
                warn!(session_id = %session.id, slot = slot.label(), %error, "document extraction failed");
                Ok(DocumentUpload {
                    slot,
                    kind,
                    extracted: false,
                    characters: 0,
                    warning: Some(error.to_string()),
                })
            }
        }
    }

    /// Render the final decision. Resubmission returns the stored decision unchanged.
    pub async fn submit(&self, session: &mut WizardSession) -> Result<DecisionReport, WizardError> {
        Self::require_stage(session, WizardStage::FinalDecision)?;

        if let Some(outcome) = &session.outcome {
            return Ok(DecisionReport {
                headline: outcome.headline(),
                outcome: outcome.clone(),
                notification: session
                    .notification
                    .clone()
                    .unwrap_or(NotificationStatus::Pending),
                replayed: true,
            });
        }

        let session_id = session.id.clone();
        let outcome = self
            .engine
            .decide(&mut session.record)
            .inspect_err(|error| {
                warn!(%session_id, %error, "decision attempt aborted");
            })?;
        session.outcome = Some(outcome.clone());
        session.notification = Some(NotificationStatus::Pending);
        self.submissions.upsert(&session.id, &session.record);

        let notification = self.dispatch_notice(session, &outcome).await;
        session.notification = Some(notification.clone());

        Ok(DecisionReport {
            headline: outcome.headline(),
            outcome,
            notification,
            replayed: false,
        })
    }

    async fn dispatch_notice(
        &self,
        session: &WizardSession,
        outcome: &DecisionOutcome,
    ) -> NotificationStatus {
        let Some(personal) = session.record.personal.as_ref() else {
            return NotificationStatus::Failed {
                reason: "no recipient on record".to_string(),
            };
        };

        let details = match (&outcome.approval_id, &outcome.reason) {
            (Some(approval_id), _) => NoticeDetails::Approved {
                approval_id: approval_id.clone(),
            },
            (None, reason) => NoticeDetails::Rejected {
                reason: reason.clone().unwrap_or_default(),
            },
        };
        let notice = DecisionNotice {
            recipient: personal.email.clone(),
            applicant_name: personal.name.clone(),
            applicant_id: session.record.applicant_id.clone(),
            details,
        };

        match notify_with_timeout(
            self.notifier.as_ref(),
            &notice,
            self.policy.notification_timeout,
        )
        .await
        {
            Ok(()) => NotificationStatus::Sent {
                recipient: notice.recipient,
            },
            Err(error) => {
                warn!(session_id = %session.id, %error, "decision notification failed");
                NotificationStatus::Failed {
                    reason: error.to_string(),
                }
            }
        }
    }
}
