use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::Mutex as SessionLock;
use tracing::info;

use super::batch::{score_batch, BatchError, BatchSummary};
use super::documents::{DocumentKind, DocumentUpload, TextExtractor};
use super::domain::{DocumentSlot, LoanDetailsInput, PersonalInfoInput, WizardStage};
use super::notification::Notifier;
use super::submissions::ExportError;
use super::wizard::{
    DecisionReport, Direction, LoanSaved, PersonalSaved, SessionId, SessionView,
    WizardController, WizardError, WizardSession,
};

/// Session store in front of the wizard controller.
///
/// Each session sits behind its own async lock so one action runs to completion before
/// the next; different sessions never contend.
pub struct UnderwritingService<X, N> {
    controller: WizardController<X, N>,
    sessions: Mutex<HashMap<SessionId, Arc<SessionLock<WizardSession>>>>,
}

/// Error raised by the underwriting service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("session {0} not found")]
    SessionNotFound(SessionId),
    #[error(transparent)]
    Wizard(#[from] WizardError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Batch(#[from] BatchError),
}

impl<X, N> UnderwritingService<X, N>
where
    X: TextExtractor + 'static,
    N: Notifier + 'static,
{
    pub fn new(controller: WizardController<X, N>) -> Self {
        Self {
            controller,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn controller(&self) -> &WizardController<X, N> {
        &self.controller
    }

    pub fn start_session(&self) -> SessionView {
        let session = WizardSession::new();
        let view = session.view();
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session.id.clone(), Arc::new(SessionLock::new(session)));
        info!(session_id = %view.session_id, "wizard session started");
        view
    }

    /// Discard a session and its record.
    pub fn end_session(&self, id: &SessionId) -> Result<(), ServiceError> {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .map(|_| info!(session_id = %id, "wizard session ended"))
            .ok_or_else(|| ServiceError::SessionNotFound(id.clone()))
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn session(&self, id: &SessionId) -> Result<Arc<SessionLock<WizardSession>>, ServiceError> {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
            .ok_or_else(|| ServiceError::SessionNotFound(id.clone()))
    }

    pub async fn view(&self, id: &SessionId) -> Result<SessionView, ServiceError> {
        let session = self.session(id)?;
        let guard = session.lock().await;
        Ok(guard.view())
    }

    pub async fn save_personal(
        &self,
        id: &SessionId,
        input: PersonalInfoInput,
    ) -> Result<PersonalSaved, ServiceError> {
        let session = self.session(id)?;
        let mut guard = session.lock().await;
        Ok(self.controller.save_personal(&mut guard, input)?)
    }

    pub async fn save_loan(
        &self,
        id: &SessionId,
        input: LoanDetailsInput,
    ) -> Result<LoanSaved, ServiceError> {
        let session = self.session(id)?;
        let mut guard = session.lock().await;
        Ok(self.controller.save_loan(&mut guard, input)?)
    }

    pub async fn navigate(
        &self,
        id: &SessionId,
        direction: Direction,
    ) -> Result<WizardStage, ServiceError> {
        let session = self.session(id)?;
        let mut guard = session.lock().await;
        Ok(self.controller.navigate(&mut guard, direction)?)
    }

    pub async fn upload_document(
        &self,
        id: &SessionId,
        slot: DocumentSlot,
        bytes: &[u8],
        kind: DocumentKind,
    ) -> Result<DocumentUpload, ServiceError> {
        let session = self.session(id)?;
        let mut guard = session.lock().await;
        Ok(self
            .controller
            .upload_document(&mut guard, slot, bytes, kind)
            .await?)
    }

    pub async fn submit(&self, id: &SessionId) -> Result<DecisionReport, ServiceError> {
        let session = self.session(id)?;
        let mut guard = session.lock().await;
        Ok(self.controller.submit(&mut guard).await?)
    }

    pub fn submissions_csv(&self) -> Result<String, ServiceError> {
        Ok(self.controller.submissions().to_csv()?)
    }

    pub fn score_batch<R: Read, W: Write>(
        &self,
        input: R,
        output: W,
    ) -> Result<BatchSummary, ServiceError> {
        Ok(score_batch(self.controller.engine(), input, output)?)
    }
}
