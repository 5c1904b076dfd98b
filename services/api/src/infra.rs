use credit_underwriting::config::UnderwritingConfig;
use credit_underwriting::error::AppError;
use credit_underwriting::workflows::underwriting::{
    ApplicantRegistry, BaselineScorecard, Classifier, CommandExtractor, DecisionEngine,
    DecisionNotice, DocumentKind, ExtractionError, FeatureSchema, LogNotifier, LogisticModel,
    NotificationError, Notifier, PlainTextExtractor, SubmissionLog, TextExtractor,
    UnderwritingService, WizardController,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::info;

pub(crate) type ApiService = UnderwritingService<ConfiguredExtractor, OutboxNotifier>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Extraction backend chosen from configuration.
#[derive(Debug, Clone)]
pub(crate) enum ConfiguredExtractor {
    Plain(PlainTextExtractor),
    Command(CommandExtractor),
}

impl ConfiguredExtractor {
    pub(crate) fn from_config(config: &UnderwritingConfig) -> Self {
        match &config.ocr_command {
            Some(program) => Self::Command(CommandExtractor::tesseract(program.clone())),
            None => Self::Plain(PlainTextExtractor),
        }
    }
}

impl TextExtractor for ConfiguredExtractor {
    async fn extract_text(
        &self,
        bytes: &[u8],
        kind: DocumentKind,
    ) -> Result<String, ExtractionError> {
        match self {
            Self::Plain(extractor) => extractor.extract_text(bytes, kind).await,
            Self::Command(extractor) => extractor.extract_text(bytes, kind).await,
        }
    }
}

/// Logs every notice and keeps the most recent ones for inspection.
#[derive(Clone)]
pub(crate) struct OutboxNotifier {
    delivery: LogNotifier,
    outbox: Arc<Mutex<Vec<DecisionNotice>>>,
}

impl OutboxNotifier {
    const RETAINED: usize = 100;

    pub(crate) fn new(sender: impl Into<String>) -> Self {
        Self {
            delivery: LogNotifier::new(sender),
            outbox: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn sent(&self) -> Vec<DecisionNotice> {
        self.outbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Notifier for OutboxNotifier {
    async fn notify(&self, notice: &DecisionNotice) -> Result<(), NotificationError> {
        self.delivery.notify(notice).await?;
        let mut outbox = self.outbox.lock().unwrap_or_else(PoisonError::into_inner);
        if outbox.len() == Self::RETAINED {
            outbox.remove(0);
        }
        outbox.push(notice.clone());
        Ok(())
    }
}

/// Load the configured model artifact, or the baseline scorecard when none is set.
pub(crate) fn build_engine(config: &UnderwritingConfig) -> Result<DecisionEngine, AppError> {
    let schema = FeatureSchema::standard();
    let classifier: Arc<dyn Classifier> = match &config.model_path {
        Some(path) => {
            info!(model = %path.display(), "loading credit model artifact");
            Arc::new(LogisticModel::from_path(path)?)
        }
        None => {
            info!("no credit model configured; using baseline scorecard");
            Arc::new(BaselineScorecard::new(&schema))
        }
    };

    let engine = DecisionEngine::new(classifier, schema);
    engine.verify()?;
    Ok(engine)
}

pub(crate) fn build_service(
    config: &UnderwritingConfig,
) -> Result<(ApiService, OutboxNotifier), AppError> {
    let notifier = OutboxNotifier::new(config.notify_sender.clone());
    let controller = WizardController::new(
        Arc::new(ApplicantRegistry::new()),
        Arc::new(SubmissionLog::new()),
        Arc::new(build_engine(config)?),
        Arc::new(ConfiguredExtractor::from_config(config)),
        Arc::new(notifier.clone()),
        config.wizard_policy(),
    );
    Ok((UnderwritingService::new(controller), notifier))
}
