use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::encoding::{FeatureSchema, FeatureVector, SCHEMA_VERSION};

pub const APPROVE_CLASS: u8 = 1;
pub const REJECT_CLASS: u8 = 0;

/// Pre-trained binary classifier consumed by the decision engine.
pub trait Classifier: Send + Sync {
    /// Feature names in the exact order the model was trained on.
    fn feature_names(&self) -> &[String];

    /// Predicted class: `1` approves, `0` rejects.
    fn predict(&self, features: &FeatureVector) -> Result<u8, ClassifierError>;

    /// `[p_reject, p_approve]` when the model exposes probabilities.
    fn predict_proba(&self, _features: &FeatureVector) -> Result<Option<[f64; 2]>, ClassifierError> {
        Ok(None)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("failed to read model artifact {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid model artifact: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("model artifact targets schema {found}, expected {expected}")]
    SchemaVersion { expected: String, found: String },
    #[error("feature vector has {found} columns, model expects {expected}")]
    Shape { expected: usize, found: usize },
    #[error("feature vector is missing '{0}'")]
    MissingFeature(String),
    #[error("classifier produced unsupported class {0}")]
    InvalidClass(u8),
}

fn default_threshold() -> f64 {
    0.5
}

/// JSON artifact exported from the training pipeline.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelArtifact {
    pub schema_version: String,
    pub feature_names: Vec<String>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

/// Logistic-regression model loaded from a [`ModelArtifact`].
#[derive(Debug, Clone)]
pub struct LogisticModel {
    feature_names: Vec<String>,
    coefficients: Vec<f64>,
    intercept: f64,
    threshold: f64,
}

impl LogisticModel {
    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self, ClassifierError> {
        if artifact.schema_version != SCHEMA_VERSION {
            return Err(ClassifierError::SchemaVersion {
                expected: SCHEMA_VERSION.to_string(),
                found: artifact.schema_version,
            });
        }
        if artifact.coefficients.len() != artifact.feature_names.len() {
            return Err(ClassifierError::Shape {
                expected: artifact.feature_names.len(),
                found: artifact.coefficients.len(),
            });
        }

        Ok(Self {
            feature_names: artifact.feature_names,
            coefficients: artifact.coefficients,
            intercept: artifact.intercept,
            threshold: artifact.threshold,
        })
    }

    pub fn from_json(raw: &str) -> Result<Self, ClassifierError> {
        Self::from_artifact(serde_json::from_str(raw)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ClassifierError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ClassifierError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    fn approval_probability(&self, features: &FeatureVector) -> Result<f64, ClassifierError> {
        if features.len() != self.coefficients.len() {
            return Err(ClassifierError::Shape {
                expected: self.coefficients.len(),
                found: features.len(),
            });
        }
        if let Some((expected, _)) = self
            .feature_names
            .iter()
            .zip(&features.names)
            .find(|(expected, found)| expected != found)
        {
            return Err(ClassifierError::MissingFeature(expected.clone()));
        }

        let logit = self.intercept
            + self
                .coefficients
                .iter()
                .zip(&features.values)
                .map(|(weight, value)| weight * value)
                .sum::<f64>();
        Ok(1.0 / (1.0 + (-logit).exp()))
    }
}

impl Classifier for LogisticModel {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn predict(&self, features: &FeatureVector) -> Result<u8, ClassifierError> {
        let probability = self.approval_probability(features)?;
        Ok(if probability >= self.threshold {
            APPROVE_CLASS
        } else {
            REJECT_CLASS
        })
    }

    fn predict_proba(&self, features: &FeatureVector) -> Result<Option<[f64; 2]>, ClassifierError> {
        let approve = self.approval_probability(features)?;
        Ok(Some([1.0 - approve, approve]))
    }
}

/// Rule-based fallback used when no model artifact is configured.
///
/// Approves when the CIBIL score is at least `min_cibil_score` and the requested amount
/// stays under `max_percent_income` percent of annual income.
#[derive(Debug, Clone)]
pub struct BaselineScorecard {
    feature_names: Vec<String>,
    pub min_cibil_score: f64,
    pub max_percent_income: f64,
}

impl BaselineScorecard {
    pub fn new(schema: &FeatureSchema) -> Self {
        Self {
            feature_names: schema.columns(),
            min_cibil_score: 700.0,
            max_percent_income: 70.0,
        }
    }

    fn feature(features: &FeatureVector, name: &str) -> Result<f64, ClassifierError> {
        features
            .get(name)
            .ok_or_else(|| ClassifierError::MissingFeature(name.to_string()))
    }
}

impl Classifier for BaselineScorecard {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn predict(&self, features: &FeatureVector) -> Result<u8, ClassifierError> {
        let cibil = Self::feature(features, "cibil_score")?;
        let percent_income = Self::feature(features, "loan_percent_income")?;
        Ok(
            if cibil >= self.min_cibil_score && percent_income < self.max_percent_income {
                APPROVE_CLASS
            } else {
                REJECT_CLASS
            },
        )
    }
}
