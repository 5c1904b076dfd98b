use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn issue_token(prefix: &str) -> String {
    format!(
        "{prefix}-{}",
        Uuid::new_v4().simple().to_string().to_ascii_uppercase()
    )
}

/// Identifier issued on the first successful personal-info save.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicantId(pub String);

impl ApplicantId {
    pub fn issue() -> Self {
        Self(issue_token("APL"))
    }
}

impl fmt::Display for ApplicantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier attached to an approved application.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApprovalId(pub String);

impl ApprovalId {
    pub fn issue() -> Self {
        Self(issue_token("APR"))
    }
}

impl fmt::Display for ApprovalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered stages of the application wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStage {
    PersonalInfo,
    LoanDetails,
    UploadDocuments,
    FinalDecision,
}

impl WizardStage {
    pub const fn ordered() -> [Self; 4] {
        [
            Self::PersonalInfo,
            Self::LoanDetails,
            Self::UploadDocuments,
            Self::FinalDecision,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::PersonalInfo => "Personal Information",
            Self::LoanDetails => "Loan Details",
            Self::UploadDocuments => "Upload Documents",
            Self::FinalDecision => "Final Decision",
        }
    }

    pub const fn next(self) -> Option<Self> {
        match self {
            Self::PersonalInfo => Some(Self::LoanDetails),
            Self::LoanDetails => Some(Self::UploadDocuments),
            Self::UploadDocuments => Some(Self::FinalDecision),
            Self::FinalDecision => None,
        }
    }

    pub const fn previous(self) -> Option<Self> {
        match self {
            Self::PersonalInfo => None,
            Self::LoanDetails => Some(Self::PersonalInfo),
            Self::UploadDocuments => Some(Self::LoanDetails),
            Self::FinalDecision => Some(Self::UploadDocuments),
        }
    }
}

impl fmt::Display for WizardStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Male => "Male",
            Self::Female => "Female",
            Self::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaritalStatus {
    Single,
    Married,
}

impl MaritalStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Single => "Single",
            Self::Married => "Married",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmploymentStatus {
    Employed,
    Unemployed,
    #[serde(rename = "Self-Employed")]
    SelfEmployed,
}

impl EmploymentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Employed => "Employed",
            Self::Unemployed => "Unemployed",
            Self::SelfEmployed => "Self-Employed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResidenceType {
    Owned,
    Rented,
    Mortgaged,
}

impl ResidenceType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Owned => "Owned",
            Self::Rented => "Rented",
            Self::Mortgaged => "Mortgaged",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoanType {
    House,
    Vehicle,
    Education,
    Gold,
    Personal,
    Business,
}

impl LoanType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::House => "House",
            Self::Vehicle => "Vehicle",
            Self::Education => "Education",
            Self::Gold => "Gold",
            Self::Personal => "Personal",
            Self::Business => "Business",
        }
    }
}

/// Uploadable supporting documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentSlot {
    Aadhar,
    Pan,
    Salary,
}

impl DocumentSlot {
    pub const fn ordered() -> [Self; 3] {
        [Self::Aadhar, Self::Pan, Self::Salary]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Aadhar => "Aadhar Card",
            Self::Pan => "PAN Card",
            Self::Salary => "Salary Slip",
        }
    }

    /// Identity documents take part in the name cross-check before a decision.
    pub const fn is_identity(self) -> bool {
        matches!(self, Self::Aadhar | Self::Pan)
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "aadhar" | "aadhaar" => Some(Self::Aadhar),
            "pan" => Some(Self::Pan),
            "salary" | "salary_slip" => Some(Self::Salary),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl Decision {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub const fn is_final(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Raw personal-information form as submitted by the applicant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalInfoInput {
    pub name: String,
    pub applicant_age: i32,
    pub gender: Gender,
    pub income_annum: f64,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub address: Option<String>,
}

/// Raw loan-details form as submitted by the applicant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanDetailsInput {
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

/// Validated personal-information section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalInfo {
    pub name: String,
    pub applicant_age: u8,
    pub gender: Gender,
    pub income_annum: f64,
    pub email: String,
    pub phone: String,
    pub address: Option<String>,
}

/// Validated loan-details section, including the derived loan-to-income percentage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanDetails {
    pub marital_status: MaritalStatus,
    pub employee_status: EmploymentStatus,
    pub residence_type: ResidenceType,
    pub cibil_score: u16,
    pub loan_amount: f64,
    pub loan_interest: f64,
    pub loan_percent_income: f64,
    pub loan_type: LoanType,
    pub loan_purpose: String,
    pub loan_term: u16,
    pub active_loans: u32,
}

/// The single accumulating record of an in-progress application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicantRecord {
    pub applicant_id: Option<ApplicantId>,
    pub personal: Option<PersonalInfo>,
    pub loan: Option<LoanDetails>,
    pub document_texts: BTreeMap<DocumentSlot, String>,
    pub decision: Decision,
    pub approval_id: Option<ApprovalId>,
    pub decided_at: Option<DateTime<Utc>>,
}

impl ApplicantRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(&self) -> Option<&str> {
        self.personal.as_ref().map(|personal| personal.name.as_str())
    }

    pub fn email(&self) -> Option<&str> {
        self.personal.as_ref().map(|personal| personal.email.as_str())
    }

    pub fn income_annum(&self) -> Option<f64> {
        self.personal.as_ref().map(|personal| personal.income_annum)
    }

    /// Name, income, email and phone are all present.
    pub fn has_personal_info(&self) -> bool {
        self.personal.as_ref().is_some_and(|personal| {
            !personal.name.is_empty()
                && personal.income_annum > 0.0
                && !personal.email.is_empty()
                && !personal.phone.is_empty()
        })
    }

    pub fn has_loan_details(&self) -> bool {
        self.loan.is_some()
    }

    pub fn document_text(&self, slot: DocumentSlot) -> Option<&str> {
        self.document_texts.get(&slot).map(String::as_str)
    }

    pub(crate) fn merge_personal(&mut self, personal: PersonalInfo) {
        self.personal = Some(personal);
    }

    pub(crate) fn merge_loan(&mut self, loan: LoanDetails) {
        self.loan = Some(loan);
    }

    pub(crate) fn record_document(&mut self, slot: DocumentSlot, text: String) {
        self.document_texts.insert(slot, text);
    }

    pub(crate) fn assign_applicant_id(&mut self, id: ApplicantId) {
        if self.applicant_id.is_none() {
            self.applicant_id = Some(id);
        }
    }

    pub(crate) fn finalize(
        &mut self,
        decision: Decision,
        approval_id: Option<ApprovalId>,
        decided_at: DateTime<Utc>,
    ) {
        if self.decision.is_final() {
            return;
        }
        self.decision = decision;
        self.approval_id = match decision {
            Decision::Approved => approval_id,
            _ => None,
        };
        self.decided_at = Some(decided_at);
    }
}
