use super::super::domain::{ApplicantRecord, DocumentSlot};
use super::DecisionError;

/// Static guidance shown with every rejection, in display order.
pub const IMPROVEMENT_TIPS: [&str; 5] = [
    "Pay EMIs on time.",
    "Keep credit usage below 30%.",
    "Maintain a mix of secured and unsecured loans.",
    "Avoid frequent loan applications.",
    "Check credit report regularly.",
];

const LOW_CIBIL_THRESHOLD: u16 = 700;
const HIGH_LOAN_PERCENT_INCOME: f64 = 70.0;
const MANY_ACTIVE_LOANS: u32 = 3;

fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Require the applicant's name in at least one extracted identity document.
///
/// Passes when no identity document text has been extracted.
pub(crate) fn check_identity(record: &ApplicantRecord) -> Result<(), DecisionError> {
    let identity_texts: Vec<&str> = DocumentSlot::ordered()
        .into_iter()
        .filter(|slot| slot.is_identity())
        .filter_map(|slot| record.document_text(slot))
        .collect();
    if identity_texts.is_empty() {
        return Ok(());
    }

    let name = record.name().unwrap_or_default();
    let needle = normalize(name);
    if !needle.is_empty()
        && identity_texts
            .iter()
            .any(|text| normalize(text).contains(&needle))
    {
        Ok(())
    } else {
        Err(DecisionError::IdentityMismatch {
            name: name.to_string(),
        })
    }
}

/// Human-readable reason attached to a rejection notice.
pub(crate) fn rejection_reason(record: &ApplicantRecord, approval_probability: Option<f64>) -> String {
    let mut signals = Vec::new();
    if let Some(loan) = &record.loan {
        if loan.cibil_score < LOW_CIBIL_THRESHOLD {
            signals.push(format!("CIBIL score {} is below {LOW_CIBIL_THRESHOLD}", loan.cibil_score));
        }
        if loan.loan_percent_income >= HIGH_LOAN_PERCENT_INCOME {
            signals.push(format!(
                "requested amount is {:.1}% of annual income",
                loan.loan_percent_income
            ));
        }
        if loan.active_loans >= MANY_ACTIVE_LOANS {
            signals.push(format!("{} loans already active", loan.active_loans));
        }
    }

    let mut reason = match approval_probability {
        Some(probability) => format!(
            "application did not meet the credit model's approval threshold (approval probability {:.2})",
            probability
        ),
        None => "application did not meet the credit model's approval threshold".to_string(),
    };
    if !signals.is_empty() {
        reason.push_str(": ");
        reason.push_str(&signals.join("; "));
    }
    reason
}
