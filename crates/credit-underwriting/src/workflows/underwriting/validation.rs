use std::sync::OnceLock;

use regex::Regex;

use super::domain::{
    LoanDetails, LoanDetailsInput, PersonalInfo, PersonalInfoInput, WizardStage,
};

pub const MIN_APPLICANT_AGE: i32 = 18;
pub const MAX_APPLICANT_AGE: i32 = 70;
pub const MIN_CIBIL_SCORE: i32 = 300;
pub const MAX_CIBIL_SCORE: i32 = 900;
pub const MIN_LOAN_AMOUNT: f64 = 10_000.0;
pub const MIN_LOAN_INTEREST: f64 = 1.0;
pub const MAX_LOAN_INTEREST: f64 = 30.0;
pub const MIN_LOAN_TERM_MONTHS: i32 = 6;
pub const MAX_LOAN_TERM_MONTHS: i32 = 360;
/// Requests at or above this multiple of annual income are over-leveraged.
pub const LOAN_TO_INCOME_CAP: f64 = 10.0;

const BLOCKED_PHONE_NUMBERS: [&str; 2] = ["0000000000", "9999999999"];

/// Aggregate rejection raised when a stage save fails one or more rules.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{stage} rejected: {}", reasons.join("; "))]
pub struct ValidationRejected {
    pub stage: WizardStage,
    pub reasons: Vec<String>,
}

impl ValidationRejected {
    fn check(stage: WizardStage, reasons: Vec<String>) -> Result<(), Self> {
        if reasons.is_empty() {
            Ok(())
        } else {
            Err(Self { stage, reasons })
        }
    }
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[A-Za-z0-9]+$").expect("email pattern compiles")
    })
}

fn phone_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[6-9]\d{9}$").expect("phone pattern compiles"))
}

pub fn is_valid_email(email: &str) -> bool {
    email_pattern().is_match(email)
}

pub fn is_valid_phone(phone: &str) -> bool {
    phone_pattern().is_match(phone) && !BLOCKED_PHONE_NUMBERS.contains(&phone)
}

pub fn loan_percent_income(loan_amount: f64, income_annum: f64) -> f64 {
    loan_amount / income_annum * 100.0
}

/// Validate the personal-information form and normalize it for merging.
pub fn validate_personal(input: PersonalInfoInput) -> Result<PersonalInfo, ValidationRejected> {
    let name = input.name.trim().to_string();
    let email = input.email.trim().to_string();
    let phone = input.phone.trim().to_string();
    let address = input
        .address
        .map(|address| address.trim().to_string())
        .filter(|address| !address.is_empty());

    let mut reasons = Vec::new();
    if name.is_empty() {
        reasons.push("applicant name is required".to_string());
    }
    if !(MIN_APPLICANT_AGE..=MAX_APPLICANT_AGE).contains(&input.applicant_age) {
        reasons.push(format!(
            "age must be between {MIN_APPLICANT_AGE} and {MAX_APPLICANT_AGE}"
        ));
    }
    if !(input.income_annum.is_finite() && input.income_annum > 0.0) {
        reasons.push("annual income must be greater than zero".to_string());
    }
    if !is_valid_email(&email) {
        reasons.push(format!("'{email}' is not a valid email address"));
    }
    if !is_valid_phone(&phone) {
        reasons.push(format!(
            "'{phone}' is not a valid 10-digit mobile number starting with 6-9"
        ));
    }
    ValidationRejected::check(WizardStage::PersonalInfo, reasons)?;

    Ok(PersonalInfo {
        name,
        applicant_age: input.applicant_age as u8,
        gender: input.gender,
        income_annum: input.income_annum,
        email,
        phone,
        address,
    })
}

/// Validate the loan-details form against the applicant's saved annual income.
pub fn validate_loan(
    input: LoanDetailsInput,
    income_annum: f64,
) -> Result<LoanDetails, ValidationRejected> {
    let loan_purpose = input.loan_purpose.trim().to_string();

    let mut reasons = Vec::new();
    if loan_purpose.is_empty() {
        reasons.push("loan purpose is required".to_string());
    }
    if !(MIN_CIBIL_SCORE..=MAX_CIBIL_SCORE).contains(&input.cibil_score) {
        reasons.push(format!(
            "CIBIL score must be between {MIN_CIBIL_SCORE} and {MAX_CIBIL_SCORE}"
        ));
    }
    if !(input.loan_amount.is_finite() && input.loan_amount >= MIN_LOAN_AMOUNT) {
        reasons.push(format!("loan amount must be at least {MIN_LOAN_AMOUNT:.0}"));
    } else if input.loan_amount >= income_annum * LOAN_TO_INCOME_CAP {
        reasons.push(format!(
            "loan amount {:.2} must be below {LOAN_TO_INCOME_CAP}x annual income ({:.2})",
            input.loan_amount,
            income_annum * LOAN_TO_INCOME_CAP
        ));
    }
    if !(MIN_LOAN_INTEREST..=MAX_LOAN_INTEREST).contains(&input.loan_interest) {
        reasons.push(format!(
            "interest rate must be between {MIN_LOAN_INTEREST}% and {MAX_LOAN_INTEREST}%"
        ));
    }
    if !(MIN_LOAN_TERM_MONTHS..=MAX_LOAN_TERM_MONTHS).contains(&input.loan_term) {
        reasons.push(format!(
            "loan term must be between {MIN_LOAN_TERM_MONTHS} and {MAX_LOAN_TERM_MONTHS} months"
        ));
    }
    if input.active_loans < 0 {
        reasons.push("active loan count cannot be negative".to_string());
    }
    ValidationRejected::check(WizardStage::LoanDetails, reasons)?;

    Ok(LoanDetails {
        marital_status: input.marital_status,
        employee_status: input.employee_status,
        residence_type: input.residence_type,
        cibil_score: input.cibil_score as u16,
        loan_amount: input.loan_amount,
        loan_interest: input.loan_interest,
        loan_percent_income: loan_percent_income(input.loan_amount, income_annum),
        loan_type: input.loan_type,
        loan_purpose,
        loan_term: input.loan_term as u16,
        active_loans: input.active_loans as u32,
    })
}
