use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::domain::{ApplicantId, ApprovalId, Decision};

/// Decision-specific payload of a notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum NoticeDetails {
    Approved { approval_id: ApprovalId },
    Rejected { reason: String },
}

/// Decision e-mail sent to the applicant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionNotice {
    pub recipient: String,
    pub applicant_name: String,
    pub applicant_id: Option<ApplicantId>,
    pub details: NoticeDetails,
}

impl DecisionNotice {
    pub fn decision(&self) -> Decision {
        match self.details {
            NoticeDetails::Approved { .. } => Decision::Approved,
            NoticeDetails::Rejected { .. } => Decision::Rejected,
        }
    }

    pub fn subject(&self) -> String {
        format!("Your loan application has been {}", self.decision().label())
    }

    pub fn body(&self) -> String {
        match &self.details {
            NoticeDetails::Approved { approval_id } => format!(
                "Dear {},\n\nCongratulations! Your loan application has been approved.\n\
                 Approval ID: {}\n\nOur team will contact you with the disbursement schedule.",
                self.applicant_name, approval_id
            ),
            NoticeDetails::Rejected { reason } => format!(
                "Dear {},\n\nWe regret to inform you that your loan application was not approved.\n\
                 Reason: {}\n\nYou are welcome to reapply once your credit profile improves.",
                self.applicant_name, reason
            ),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
    #[error("notification timed out after {0:?}")]
    TimedOut(Duration),
}

/// Fire-and-forget decision notification collaborator.
pub trait Notifier: Send + Sync {
    fn notify(
        &self,
        notice: &DecisionNotice,
    ) -> impl Future<Output = Result<(), NotificationError>> + Send;
}

pub async fn notify_with_timeout<N: Notifier>(
    notifier: &N,
    notice: &DecisionNotice,
    timeout: Duration,
) -> Result<(), NotificationError> {
    match tokio::time::timeout(timeout, notifier.notify(notice)).await {
        Ok(result) => result,
        Err(_) => Err(NotificationError::TimedOut(timeout)),
    }
}

/// Delivery state reported alongside a decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NotificationStatus {
    Sent { recipient: String },
    Failed { reason: String },
    /// Dispatch started but its result was never recorded.
    Pending,
}

/// Simulated e-mail delivery: renders the message and emits it as a log event.
#[derive(Debug, Clone)]
pub struct LogNotifier {
    sender: String,
}

impl LogNotifier {
    pub fn new(sender: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
        }
    }
}

impl Notifier for LogNotifier {
    async fn notify(&self, notice: &DecisionNotice) -> Result<(), NotificationError> {
        info!(
            from = %self.sender,
            to = %notice.recipient,
            subject = %notice.subject(),
            body = %notice.body(),
            "decision email dispatched"
        );
        Ok(())
    }
}
