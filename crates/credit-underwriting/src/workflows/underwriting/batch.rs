//! Bulk scoring of already-complete applications.
//!
//! Each CSV row runs through the same stage validators, encoder and decision engine as the
//! interactive wizard, so an identical row always gets the wizard's decision. The input
//! columns are echoed unchanged, followed by `decision`, `approval_probability` and `detail`.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};
use tracing::info;

use super::decision::{DecisionEngine, Verdict};
use super::domain::{
    ApplicantRecord, EmploymentStatus, Gender, LoanDetailsInput, LoanType, MaritalStatus,
    PersonalInfoInput, ResidenceType,
};
use super::validation::{validate_loan, validate_personal};

const ANNOTATION_COLUMNS: [&str; 3] = ["decision", "approval_probability", "detail"];

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("invalid batch csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to write scored batch: {0}")]
    Io(#[from] std::io::Error),
    #[error("batch header already contains reserved column '{0}'")]
    ReservedColumn(&'static str),
}

/// One complete application in a scoring batch.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchRow {
    pub name: String,
    pub applicant_age: i32,
    pub gender: Gender,
    pub income_annum: f64,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub address: Option<String>,
    pub marital_status: MaritalStatus,
    pub employee_status: EmploymentStatus,
    pub residence_type: ResidenceType,
    pub cibil_score: i32,
    pub loan_amount: f64,
    pub loan_interest: f64,
    pub loan_type: LoanType,
    pub loan_purpose: String,
    pub loan_term: i32,
    #[serde(default)]
    pub active_loans: i32,
}

impl BatchRow {
    /// Build a record through the wizard's own stage validators.
    pub fn into_record(self) -> Result<ApplicantRecord, String> {
        let personal = validate_personal(PersonalInfoInput {
            name: self.name,
            applicant_age: self.applicant_age,
            gender: self.gender,
            income_annum: self.income_annum,
            email: self.email,
            phone: self.phone,
            address: self.address,
        })
        .map_err(|rejection| rejection.to_string())?;

        let loan = validate_loan(
            LoanDetailsInput {
                marital_status: self.marital_status,
                employee_status: self.employee_status,
                residence_type: self.residence_type,
                cibil_score: self.cibil_score,
                loan_amount: self.loan_amount,
                loan_interest: self.loan_interest,
                loan_type: self.loan_type,
                loan_purpose: self.loan_purpose,
                loan_term: self.loan_term,
                active_loans: self.active_loans,
            },
            personal.income_annum,
        )
        .map_err(|rejection| rejection.to_string())?;

        let mut record = ApplicantRecord::new();
        record.merge_personal(personal);
        record.merge_loan(loan);
        Ok(record)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub rows: usize,
    pub approved: usize,
    pub rejected: usize,
    pub invalid: usize,
    pub errored: usize,
}

struct Annotation {
    decision: &'static str,
    approval_probability: Option<f64>,
    detail: String,
}

fn annotate(engine: &DecisionEngine, row: Result<BatchRow, String>) -> Annotation {
    let record = match row.and_then(BatchRow::into_record) {
        Ok(record) => record,
        Err(detail) => {
            return Annotation {
                decision: "invalid",
                approval_probability: None,
                detail,
            }
        }
    };

    match engine.assess(&record) {
        Ok(assessment) => {
            let detail = match &assessment.verdict {
                Verdict::Approve => String::new(),
                Verdict::Reject { reason } => reason.clone(),
            };
            Annotation {
                decision: assessment.decision().label(),
                approval_probability: assessment.approval_probability,
                detail,
            }
        }
        Err(error) => Annotation {
            decision: "error",
            approval_probability: None,
            detail: error.to_string(),
        },
    }
}

/// Score every row of `input` and write the annotated batch to `output`.
pub fn score_batch<R: Read, W: Write>(
    engine: &DecisionEngine,
    input: R,
    output: W,
) -> Result<BatchSummary, BatchError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(input);
    let headers = reader.headers()?.clone();
    if let Some(reserved) = ANNOTATION_COLUMNS
        .iter()
        .find(|column| headers.iter().any(|header| header == **column))
    {
        return Err(BatchError::ReservedColumn(*reserved));
    }

    let mut writer = csv::Writer::from_writer(output);
    let mut out_headers = headers.clone();
    for column in ANNOTATION_COLUMNS {
        out_headers.push_field(column);
    }
    writer.write_record(&out_headers)?;

    let mut summary = BatchSummary::default();
    for raw in reader.records() {
        let (raw, row) = match raw {
            Ok(raw) if raw.len() == headers.len() => {
                let row = raw
                    .deserialize::<BatchRow>(Some(&headers))
                    .map_err(|error| error.to_string());
                (raw, row)
            }
            Ok(raw) => {
                let detail = format!(
                    "expected {} fields, found {}",
                    headers.len(),
                    raw.len()
                );
                (raw, Err(detail))
            }
            Err(error) => (csv::StringRecord::new(), Err(error.to_string())),
        };
        let annotation = annotate(engine, row);

        summary.rows += 1;
        match annotation.decision {
            "approved" => summary.approved += 1,
            "rejected" => summary.rejected += 1,
            "invalid" => summary.invalid += 1,
            _ => summary.errored += 1,
        }

        let mut out: csv::StringRecord = (0..headers.len())
            .map(|index| raw.get(index).unwrap_or_default())
            .collect();
        out.push_field(annotation.decision);
        out.push_field(
            &annotation
                .approval_probability
                .map(|probability| format!("{probability:.4}"))
                .unwrap_or_default(),
        );
        out.push_field(&annotation.detail);
        writer.write_record(&out)?;
    }
    writer.flush()?;

    info!(
        rows = summary.rows,
        approved = summary.approved,
        rejected = summary.rejected,
        invalid = summary.invalid,
        errored = summary.errored,
        "batch scored"
    );
    Ok(summary)
}
