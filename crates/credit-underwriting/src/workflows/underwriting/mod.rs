//! Credit underwriting wizard: staged data capture, feature encoding and loan decisions.
//!
//! A [`WizardController`] walks one applicant record through personal information, loan
//! details and document upload before the [`DecisionEngine`] renders a terminal decision.
//! [`UnderwritingService`] keeps concurrent sessions apart and [`underwriting_router`]
//! exposes them over HTTP.

pub mod batch;
pub mod classifier;
pub mod decision;
pub mod documents;
pub mod domain;
pub mod emi;
pub mod encoding;
pub mod faq;
pub mod notification;
pub mod registry;
pub mod router;
pub mod service;
pub mod submissions;
pub mod validation;
pub mod wizard;

#[cfg(test)]
mod tests;

pub use batch::{score_batch, BatchError, BatchRow, BatchSummary};
pub use classifier::{
    BaselineScorecard, Classifier, ClassifierError, LogisticModel, ModelArtifact, APPROVE_CLASS,
    REJECT_CLASS,
};
pub use decision::{
    Assessment, DecisionEngine, DecisionError, DecisionOutcome, Verdict, IMPROVEMENT_TIPS,
};
pub use documents::{
    CommandExtractor, DocumentKind, DocumentUpload, ExtractionError, PlainTextExtractor,
    TextExtractor,
};
pub use domain::{
    ApplicantId, ApplicantRecord, ApprovalId, Decision, DocumentSlot, EmploymentStatus, Gender,
    LoanDetails, LoanDetailsInput, LoanType, MaritalStatus, PersonalInfo, PersonalInfoInput,
    ResidenceType, WizardStage,
};
pub use emi::{EmiError, EmiQuote, EmiRequest};
pub use encoding::{
    CategoricalField, EncodingError, FeatureEncoder, FeatureSchema, FeatureVector, SCHEMA_VERSION,
};
pub use faq::{FaqAnswer, FaqResponder};
pub use notification::{
    DecisionNotice, LogNotifier, NoticeDetails, NotificationError, NotificationStatus, Notifier,
};
pub use registry::{ApplicantRegistry, DuplicateRegistration, Registration};
pub use router::underwriting_router;
pub use service::{ServiceError, UnderwritingService};
pub use submissions::{DuplicateApplication, ExportError, SubmissionLog};
pub use validation::{validate_loan, validate_personal, ValidationRejected};
pub use wizard::{
    DecisionReport, Direction, LoanSaved, PersonalSaved, SessionId, SessionView,
    WizardController, WizardError, WizardPolicy, WizardSession,
};
