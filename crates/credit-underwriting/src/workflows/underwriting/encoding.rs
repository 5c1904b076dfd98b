//! Feature assembly for the credit classifier.
//!
//! The category vocabularies and the drop-first convention are part of a versioned
//! [`FeatureSchema`] shared with whatever trained the classifier: the first entry of each
//! vocabulary is the reference category and gets no indicator column. Indicator columns
//! are named `<field>_<category>`.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use super::domain::ApplicantRecord;

pub const SCHEMA_VERSION: &str = "credit-features/v1";

pub const NUMERIC_FEATURES: [&str; 8] = [
    "applicant_age",
    "income_annum",
    "cibil_score",
    "loan_amount",
    "loan_interest",
    "loan_percent_income",
    "loan_term",
    "active_loans",
];

/// Columns of the trained schema the wizard never collects; always encoded as zero.
pub const ZERO_FILLED_FEATURES: [&str; 4] = [
    "residential_assets_value",
    "commercial_assets_value",
    "luxury_assets_value",
    "bank_asset_value",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoricalField {
    Gender,
    MaritalStatus,
    EmployeeStatus,
    ResidenceType,
    LoanType,
    LoanPurpose,
}

impl CategoricalField {
    pub const fn ordered() -> [Self; 6] {
        [
            Self::Gender,
            Self::MaritalStatus,
            Self::EmployeeStatus,
            Self::ResidenceType,
            Self::LoanType,
            Self::LoanPurpose,
        ]
    }

    pub const fn column_prefix(self) -> &'static str {
        match self {
            Self::Gender => "gender",
            Self::MaritalStatus => "marital_status",
            Self::EmployeeStatus => "employee_status",
            Self::ResidenceType => "residence_type",
            Self::LoanType => "loan_type",
            Self::LoanPurpose => "loan_purpose",
        }
    }

    /// Training vocabulary in sorted order; the first entry is the reference category.
    pub const fn vocabulary(self) -> &'static [&'static str] {
        match self {
            Self::Gender => &["Female", "Male", "Other"],
            Self::MaritalStatus => &["Married", "Single"],
            Self::EmployeeStatus => &["Employed", "Self-Employed", "Unemployed"],
            Self::ResidenceType => &["Mortgaged", "Owned", "Rented"],
            Self::LoanType => &["Business", "Education", "Gold", "House", "Personal", "Vehicle"],
            Self::LoanPurpose => &[
                "Business",
                "Debt Consolidation",
                "Education",
                "Home Improvement",
                "Medical",
                "Travel",
                "Wedding",
            ],
        }
    }

    fn raw_value(self, record: &ApplicantRecord) -> Option<&str> {
        let personal = record.personal.as_ref();
        let loan = record.loan.as_ref();
        match self {
            Self::Gender => personal.map(|p| p.gender.label()),
            Self::MaritalStatus => loan.map(|l| l.marital_status.label()),
            Self::EmployeeStatus => loan.map(|l| l.employee_status.label()),
            Self::ResidenceType => loan.map(|l| l.residence_type.label()),
            Self::LoanType => loan.map(|l| l.loan_type.label()),
            Self::LoanPurpose => loan.map(|l| l.loan_purpose.as_str()),
        }
    }
}

/// Versioned contract between the encoder and a trained classifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureSchema {
    pub version: String,
    pub numeric: Vec<String>,
    pub categorical: Vec<(CategoricalField, Vec<String>)>,
    pub zero_filled: Vec<String>,
}

impl FeatureSchema {
    pub fn standard() -> Self {
        Self {
            version: SCHEMA_VERSION.to_string(),
            numeric: NUMERIC_FEATURES.iter().map(|name| name.to_string()).collect(),
            categorical: CategoricalField::ordered()
                .into_iter()
                .map(|field| {
                    let vocabulary = field
                        .vocabulary()
                        .iter()
                        .map(|category| category.to_string())
                        .collect();
                    (field, vocabulary)
                })
                .collect(),
            zero_filled: ZERO_FILLED_FEATURES
                .iter()
                .map(|name| name.to_string())
                .collect(),
        }
    }

    pub fn indicator_column(field: CategoricalField, category: &str) -> String {
        format!("{}_{}", field.column_prefix(), category)
    }

    /// Every column this schema can produce: numeric, indicators, then zero-filled.
    pub fn columns(&self) -> Vec<String> {
        let mut columns = self.numeric.clone();
        for (field, vocabulary) in &self.categorical {
            columns.extend(
                vocabulary
                    .iter()
                    .skip(1)
                    .map(|category| Self::indicator_column(*field, category)),
            );
        }
        columns.extend(self.zero_filled.iter().cloned());
        columns
    }

    fn vocabulary_match(&self, field: CategoricalField, raw: &str) -> Option<&str> {
        let raw = raw.trim();
        self.categorical
            .iter()
            .find(|(candidate, _)| *candidate == field)
            .and_then(|(_, vocabulary)| {
                vocabulary
                    .iter()
                    .find(|category| category.eq_ignore_ascii_case(raw))
            })
            .map(String::as_str)
    }
}

/// Encoded feature row in the classifier's declared column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureVector {
    pub names: Vec<String>,
    pub values: Vec<f64>,
}

impl FeatureVector {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|candidate| candidate == name)
            .map(|index| self.values[index])
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodingError {
    #[error("classifier declares feature '{name}' unknown to schema {version}")]
    UnknownFeature { name: String, version: String },
    #[error("classifier omits required feature '{0}'")]
    MissingFeature(String),
    #[error("classifier declares feature '{0}' more than once")]
    DuplicateFeature(String),
    #[error("record is missing {0} required for encoding")]
    IncompleteRecord(&'static str),
}

/// Maps a completed [`ApplicantRecord`] onto the classifier's declared columns.
#[derive(Debug, Clone)]
pub struct FeatureEncoder {
    schema: FeatureSchema,
    declared: Vec<String>,
}

impl FeatureEncoder {
    pub fn new(schema: FeatureSchema, declared: Vec<String>) -> Self {
        Self { schema, declared }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn declared(&self) -> &[String] {
        &self.declared
    }

    /// Check that the classifier's declared columns can be reconciled with the schema.
    pub fn verify(&self) -> Result<(), EncodingError> {
        let known: HashSet<String> = self.schema.columns().into_iter().collect();
        let mut seen = HashSet::new();
        for name in &self.declared {
            if !seen.insert(name.as_str()) {
                return Err(EncodingError::DuplicateFeature(name.clone()));
            }
            if !known.contains(name) {
                return Err(EncodingError::UnknownFeature {
                    name: name.clone(),
                    version: self.schema.version.clone(),
                });
            }
        }
        if let Some(missing) = self
            .schema
            .numeric
            .iter()
            .find(|name| !seen.contains(name.as_str()))
        {
            return Err(EncodingError::MissingFeature(missing.clone()));
        }
        Ok(())
    }

    pub fn encode(&self, record: &ApplicantRecord) -> Result<FeatureVector, EncodingError> {
        self.verify()?;

        let personal = record
            .personal
            .as_ref()
            .ok_or(EncodingError::IncompleteRecord("personal information"))?;
        let loan = record
            .loan
            .as_ref()
            .ok_or(EncodingError::IncompleteRecord("loan details"))?;

        let mut encoded: BTreeMap<String, f64> = BTreeMap::new();
        let numeric = [
            ("applicant_age", f64::from(personal.applicant_age)),
            ("income_annum", personal.income_annum),
            ("cibil_score", f64::from(loan.cibil_score)),
            ("loan_amount", loan.loan_amount),
            ("loan_interest", loan.loan_interest),
            ("loan_percent_income", loan.loan_percent_income),
            ("loan_term", f64::from(loan.loan_term)),
            ("active_loans", f64::from(loan.active_loans)),
        ];
        for (name, value) in numeric {
            encoded.insert(name.to_string(), value);
        }

        for field in CategoricalField::ordered() {
            let Some(raw) = field.raw_value(record) else {
                continue;
            };
            // Out-of-vocabulary values fall back to the reference category.
            if let Some(category) = self.schema.vocabulary_match(field, raw) {
                encoded.insert(FeatureSchema::indicator_column(field, category), 1.0);
            }
        }

        let values = self
            .declared
            .iter()
            .map(|name| encoded.get(name).copied().unwrap_or(0.0))
            .collect();

        Ok(FeatureVector {
            names: self.declared.clone(),
            values,
        })
    }
}
