use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::domain::DocumentSlot;

/// Shape of an uploaded file, as far as text extraction is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Image,
    ScannedDocument,
}

impl DocumentKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::ScannedDocument => "scanned document",
        }
    }

    pub fn from_mime(media: &mime::Mime) -> Option<Self> {
        if media.type_() == mime::IMAGE {
            Some(Self::Image)
        } else if *media == mime::APPLICATION_PDF {
            Some(Self::ScannedDocument)
        } else {
            None
        }
    }

    /// Guess the kind from an uploaded file name.
    pub fn from_filename(filename: &str) -> Option<Self> {
        mime_guess::from_path(filename)
            .iter()
            .find_map(|media| Self::from_mime(&media))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("no text could be extracted from the {0}")]
    Empty(&'static str),
    #[error("document is not readable as text")]
    NotText,
    #[error("text extraction timed out after {0:?}")]
    TimedOut(Duration),
    #[error("extraction command {program} failed: {detail}")]
    Command { program: String, detail: String },
    #[error("extraction io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Optical text extraction collaborator.
pub trait TextExtractor: Send + Sync {
    fn extract_text(
        &self,
        bytes: &[u8],
        kind: DocumentKind,
    ) -> impl Future<Output = Result<String, ExtractionError>> + Send;
}

/// Extraction bounded by `timeout`; dropping the inner future cancels it.
pub async fn extract_with_timeout<X: TextExtractor>(
    extractor: &X,
    bytes: &[u8],
    kind: DocumentKind,
    timeout: Duration,
) -> Result<String, ExtractionError> {
    match tokio::time::timeout(timeout, extractor.extract_text(bytes, kind)).await {
        Ok(result) => result,
        Err(_) => Err(ExtractionError::TimedOut(timeout)),
    }
}

/// Reads documents that already carry a UTF-8 text layer.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    async fn extract_text(
        &self,
        bytes: &[u8],
        kind: DocumentKind,
    ) -> Result<String, ExtractionError> {
        let text = std::str::from_utf8(bytes).map_err(|_| ExtractionError::NotText)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(ExtractionError::Empty(kind.label()));
        }
        Ok(text.to_string())
    }
}

/// Pipes the document through an external OCR binary, e.g. `tesseract stdin stdout`.
#[derive(Debug, Clone)]
pub struct CommandExtractor {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandExtractor {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn tesseract(program: impl Into<PathBuf>) -> Self {
        Self::new(program, vec!["stdin".to_string(), "stdout".to_string()])
    }
}

impl TextExtractor for CommandExtractor {
    async fn extract_text(
        &self,
        bytes: &[u8],
        kind: DocumentKind,
    ) -> Result<String, ExtractionError> {
        let program = self.program.display().to_string();
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(bytes).await?;
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(ExtractionError::Command {
                program,
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if text.is_empty() {
            return Err(ExtractionError::Empty(kind.label()));
        }
        Ok(text)
    }
}

/// Result of a document upload as reported back to the applicant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentUpload {
    pub slot: DocumentSlot,
    pub kind: DocumentKind,
    pub extracted: bool,
    pub characters: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}
