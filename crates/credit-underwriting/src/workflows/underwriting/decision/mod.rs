mod policy;

pub use policy::IMPROVEMENT_TIPS;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use super::classifier::{Classifier, ClassifierError, APPROVE_CLASS, REJECT_CLASS};
use super::domain::{ApplicantId, ApplicantRecord, ApprovalId, Decision};
use super::encoding::{EncodingError, FeatureEncoder, FeatureSchema};
use policy::{check_identity, rejection_reason};

/// Failures that abort a single decision attempt. Saved fields are never touched.
#[derive(Debug, thiserror::Error)]
pub enum DecisionError {
    #[error("prerequisite incomplete: {0} must be saved first")]
    PrerequisiteIncomplete(&'static str),
    #[error("identity mismatch: '{name}' was not found in the uploaded identity documents")]
    IdentityMismatch { name: String },
    #[error("feature schema mismatch: {0}")]
    SchemaMismatch(#[from] EncodingError),
    #[error("classifier failure: {0}")]
    Classifier(#[from] ClassifierError),
}

/// Classifier verdict for a record, free of side effects.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Approve,
    Reject { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assessment {
    pub verdict: Verdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_probability: Option<f64>,
}

impl Assessment {
    pub fn decision(&self) -> Decision {
        match self.verdict {
            Verdict::Approve => Decision::Approved,
            Verdict::Reject { .. } => Decision::Rejected,
        }
    }
}

/// Terminal decision attached to an applicant record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionOutcome {
    pub applicant_id: Option<ApplicantId>,
    pub decision: Decision,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_id: Option<ApprovalId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_probability: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub tips: Vec<String>,
    pub decided_at: DateTime<Utc>,
}

impl DecisionOutcome {
    pub fn headline(&self) -> &'static str {
        match self.decision {
            Decision::Approved => "Loan Approved",
            Decision::Rejected => "Loan Rejected",
            Decision::Pending => "Decision Pending",
        }
    }
}

/// Runs the encoder and classifier against a completed record.
pub struct DecisionEngine {
    classifier: Arc<dyn Classifier>,
    encoder: FeatureEncoder,
}

impl DecisionEngine {
    pub fn new(classifier: Arc<dyn Classifier>, schema: FeatureSchema) -> Self {
        let encoder = FeatureEncoder::new(schema, classifier.feature_names().to_vec());
        Self {
            classifier,
            encoder,
        }
    }

    pub fn encoder(&self) -> &FeatureEncoder {
        &self.encoder
    }

    /// Fail fast when the classifier's declared columns do not fit the schema.
    pub fn verify(&self) -> Result<(), EncodingError> {
        self.encoder.verify()
    }

    /// Prerequisite and identity checks, encoding, and prediction.
    pub fn assess(&self, record: &ApplicantRecord) -> Result<Assessment, DecisionError> {
        if !record.has_personal_info() {
            return Err(DecisionError::PrerequisiteIncomplete("personal information"));
        }
        if !record.has_loan_details() {
            return Err(DecisionError::PrerequisiteIncomplete("loan details"));
        }
        check_identity(record)?;

        let features = self.encoder.encode(record)?;
        let class = self.classifier.predict(&features)?;
        let approval_probability = self
            .classifier
            .predict_proba(&features)?
            .map(|[_, approve]| approve);
        debug!(class, ?approval_probability, "classifier prediction");

        let verdict = match class {
            APPROVE_CLASS => Verdict::Approve,
            REJECT_CLASS => Verdict::Reject {
                reason: rejection_reason(record, approval_probability),
            },
            other => return Err(ClassifierError::InvalidClass(other).into()),
        };

        Ok(Assessment {
            verdict,
            approval_probability,
        })
    }

    /// Decide the record and attach the decision to it.
    ///
    /// A record that already carries a terminal decision is returned as recorded, so an
    /// approval id is minted at most once per record.
    pub fn decide(&self, record: &mut ApplicantRecord) -> Result<DecisionOutcome, DecisionError> {
        if record.decision.is_final() {
            debug!(applicant_id = ?record.applicant_id, "decision already recorded");
            return Ok(Self::recorded_outcome(record));
        }

        let assessment = self.assess(record)?;
        let decided_at = Utc::now();
        let outcome = match assessment.verdict {
            Verdict::Approve => DecisionOutcome {
                applicant_id: record.applicant_id.clone(),
                decision: Decision::Approved,
                approval_id: Some(ApprovalId::issue()),
                approval_probability: assessment.approval_probability,
                reason: None,
                tips: Vec::new(),
                decided_at,
            },
            Verdict::Reject { reason } => DecisionOutcome {
                applicant_id: record.applicant_id.clone(),
                decision: Decision::Rejected,
                approval_id: None,
                approval_probability: assessment.approval_probability,
                reason: Some(reason),
                tips: improvement_tips(),
                decided_at,
            },
        };
        record.finalize(outcome.decision, outcome.approval_id.clone(), decided_at);

        info!(
            applicant_id = ?outcome.applicant_id,
            decision = outcome.decision.label(),
            "credit decision rendered"
        );
        Ok(outcome)
    }

    fn recorded_outcome(record: &ApplicantRecord) -> DecisionOutcome {
        let rejected = record.decision == Decision::Rejected;
        DecisionOutcome {
            applicant_id: record.applicant_id.clone(),
            decision: record.decision,
            approval_id: record.approval_id.clone(),
            approval_probability: None,
            reason: rejected.then(|| rejection_reason(record, None)),
            tips: if rejected { improvement_tips() } else { Vec::new() },
            decided_at: record.decided_at.unwrap_or_else(Utc::now),
        }
    }
}

fn improvement_tips() -> Vec<String> {
    IMPROVEMENT_TIPS.iter().map(|tip| tip.to_string()).collect()
}
