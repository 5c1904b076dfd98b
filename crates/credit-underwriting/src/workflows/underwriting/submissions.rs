use std::io::Write;
use std::sync::{Mutex, PoisonError};

use serde::Serialize;

use super::domain::{ApplicantId, ApplicantRecord};
use super::wizard::SessionId;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to write submissions csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to flush submissions csv: {0}")]
    Io(#[from] std::io::Error),
    #[error("submissions csv is not valid utf-8")]
    Encoding,
}

/// An identical application was already submitted from another session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("duplicate application detected for {}", .applicant_id.as_ref().map(|id| id.0.as_str()).unwrap_or("unregistered applicant"))]
pub struct DuplicateApplication {
    pub applicant_id: Option<ApplicantId>,
}

/// Records that completed the loan-details stage, one entry per session, in
/// first-submission order.
///
/// Re-saving from the same session replaces its entry in place.
#[derive(Debug, Default)]
pub struct SubmissionLog {
    entries: Mutex<Vec<(SessionId, ApplicantRecord)>>,
}

fn same_application(left: &ApplicantRecord, right: &ApplicantRecord) -> bool {
    left.personal.is_some()
        && left.loan.is_some()
        && left.personal == right.personal
        && left.loan == right.loan
}

impl SubmissionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log a session's application, rejecting one identical to another session's entry.
    pub fn submit(
        &self,
        session: &SessionId,
        record: &ApplicantRecord,
    ) -> Result<(), DuplicateApplication> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries
            .iter()
            .any(|(owner, entry)| owner != session && same_application(entry, record))
        {
            return Err(DuplicateApplication {
                applicant_id: record.applicant_id.clone(),
            });
        }
        Self::replace_or_push(&mut entries, session, record);
        Ok(())
    }

    /// Refresh a session's entry after its decision lands.
    pub fn upsert(&self, session: &SessionId, record: &ApplicantRecord) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Self::replace_or_push(&mut entries, session, record);
    }

    fn replace_or_push(
        entries: &mut Vec<(SessionId, ApplicantRecord)>,
        session: &SessionId,
        record: &ApplicantRecord,
    ) {
        match entries.iter_mut().find(|(owner, _)| owner == session) {
            Some((_, existing)) => *existing = record.clone(),
            None => entries.push((session.clone(), record.clone())),
        }
    }

    pub fn snapshot(&self) -> Vec<ApplicantRecord> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, record)| record.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), ExportError> {
        write_records(&self.snapshot(), writer)
    }

    pub fn to_csv(&self) -> Result<String, ExportError> {
        let mut buffer = Vec::new();
        self.write_csv(&mut buffer)?;
        String::from_utf8(buffer).map_err(|_| ExportError::Encoding)
    }
}

/// Flat, reviewer-facing row of an exported record.
#[derive(Debug, Serialize)]
struct SubmissionRow<'a> {
    applicant_id: &'a str,
    name: &'a str,
    applicant_age: Option<u8>,
    gender: &'a str,
    income_annum: Option<f64>,
    email: &'a str,
    phone: &'a str,
    address: &'a str,
    marital_status: &'a str,
    employee_status: &'a str,
    residence_type: &'a str,
    cibil_score: Option<u16>,
    loan_amount: Option<f64>,
    loan_interest: Option<f64>,
    loan_percent_income: Option<f64>,
    loan_type: &'a str,
    loan_purpose: &'a str,
    loan_term: Option<u16>,
    active_loans: Option<u32>,
    documents: String,
    decision: &'a str,
    approval_id: &'a str,
}

impl<'a> From<&'a ApplicantRecord> for SubmissionRow<'a> {
    fn from(record: &'a ApplicantRecord) -> Self {
        let personal = record.personal.as_ref();
        let loan = record.loan.as_ref();
        Self {
            applicant_id: record
                .applicant_id
                .as_ref()
                .map(|id| id.0.as_str())
                .unwrap_or_default(),
            name: personal.map(|p| p.name.as_str()).unwrap_or_default(),
            applicant_age: personal.map(|p| p.applicant_age),
            gender: personal.map(|p| p.gender.label()).unwrap_or_default(),
            income_annum: personal.map(|p| p.income_annum),
            email: personal.map(|p| p.email.as_str()).unwrap_or_default(),
            phone: personal.map(|p| p.phone.as_str()).unwrap_or_default(),
            address: personal
                .and_then(|p| p.address.as_deref())
                .unwrap_or_default(),
            marital_status: loan.map(|l| l.marital_status.label()).unwrap_or_default(),
            employee_status: loan.map(|l| l.employee_status.label()).unwrap_or_default(),
            residence_type: loan.map(|l| l.residence_type.label()).unwrap_or_default(),
            cibil_score: loan.map(|l| l.cibil_score),
            loan_amount: loan.map(|l| l.loan_amount),
            loan_interest: loan.map(|l| l.loan_interest),
            loan_percent_income: loan.map(|l| l.loan_percent_income),
            loan_type: loan.map(|l| l.loan_type.label()).unwrap_or_default(),
            loan_purpose: loan.map(|l| l.loan_purpose.as_str()).unwrap_or_default(),
            loan_term: loan.map(|l| l.loan_term),
            active_loans: loan.map(|l| l.active_loans),
            documents: record
                .document_texts
                .keys()
                .map(|slot| slot.label())
                .collect::<Vec<_>>()
                .join("|"),
            decision: record.decision.label(),
            approval_id: record
                .approval_id
                .as_ref()
                .map(|id| id.0.as_str())
                .unwrap_or_default(),
        }
    }
}

pub fn write_records<W: Write>(records: &[ApplicantRecord], writer: W) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_writer(writer);
    for record in records {
        writer.serialize(SubmissionRow::from(record))?;
    }
    writer.flush()?;
    Ok(())
}
