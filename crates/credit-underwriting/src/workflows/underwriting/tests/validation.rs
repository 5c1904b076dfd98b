use super::common::*;
use crate::workflows::underwriting::domain::{PersonalInfoInput, WizardStage};
use crate::workflows::underwriting::validation::{
    is_valid_email, is_valid_phone, loan_percent_income, validate_loan, validate_personal,
};

#[test]
fn accepts_the_reference_applicant() {
    let personal = validate_personal(asha_personal()).expect("valid personal info");
    assert_eq!(personal.name, "Asha Rao");
    assert_eq!(personal.applicant_age, 30);

    let loan = validate_loan(asha_loan(), personal.income_annum).expect("valid loan");
    assert!((loan.loan_percent_income - 50.0).abs() < 1e-9);
}

#[test]
fn placeholder_phone_is_rejected_even_when_everything_else_is_valid() {
    let input = PersonalInfoInput {
        phone: "0000000000".to_string(),
        ..asha_personal()
    };

    let rejection = validate_personal(input).expect_err("phone must be rejected");
    assert_eq!(rejection.stage, WizardStage::PersonalInfo);
    assert_eq!(rejection.reasons.len(), 1);
    assert!(rejection.reasons[0].contains("0000000000"));
}

#[test]
fn phone_rules_follow_indian_mobile_format() {
    assert!(is_valid_phone("9876543210"));
    assert!(is_valid_phone("6000000001"));
    assert!(!is_valid_phone("9999999999"));
    assert!(!is_valid_phone("5876543210"));
    assert!(!is_valid_phone("987654321"));
    assert!(!is_valid_phone("98765432100"));
    assert!(!is_valid_phone("98765x3210"));
}

#[test]
fn email_requires_local_part_domain_and_suffix() {
    assert!(is_valid_email("asha@x.com"));
    assert!(!is_valid_email("asha@x"));
    assert!(!is_valid_email("asha.x.com"));
    assert!(!is_valid_email("asha rao@x.com"));
}

#[test]
fn collects_every_failing_rule() {
    let input = PersonalInfoInput {
        name: "   ".to_string(),
        applicant_age: 17,
        income_annum: 0.0,
        email: "nobody".to_string(),
        ..asha_personal()
    };

    let rejection = validate_personal(input).expect_err("invalid input");
    assert_eq!(rejection.reasons.len(), 4);
    assert!(rejection.to_string().starts_with("Personal Information rejected"));
}

#[test]
fn age_bounds_are_inclusive() {
    for age in [18, 70] {
        let input = PersonalInfoInput {
            applicant_age: age,
            ..asha_personal()
        };
        assert!(validate_personal(input).is_ok(), "age {age} should pass");
    }
    let input = PersonalInfoInput {
        applicant_age: 71,
        ..asha_personal()
    };
    assert!(validate_personal(input).is_err());
}

#[test]
fn blank_address_is_dropped() {
    let input = PersonalInfoInput {
        address: Some("  ".to_string()),
        ..asha_personal()
    };
    let personal = validate_personal(input).expect("valid");
    assert_eq!(personal.address, None);
}

#[test]
fn over_leveraged_loan_is_rejected() {
    let loan = crate::workflows::underwriting::domain::LoanDetailsInput {
        loan_amount: 15_000_000.0,
        ..asha_loan()
    };

    let rejection = validate_loan(loan, 1_000_000.0).expect_err("15M is not below 10M");
    assert_eq!(rejection.stage, WizardStage::LoanDetails);
    assert!(rejection.reasons[0].contains("annual income"));
}

#[test]
fn loan_equal_to_the_cap_is_rejected() {
    let loan = crate::workflows::underwriting::domain::LoanDetailsInput {
        loan_amount: 10_000_000.0,
        ..asha_loan()
    };
    assert!(validate_loan(loan, 1_000_000.0).is_err());
}

#[test]
fn loan_ranges_are_enforced() {
    let loan = crate::workflows::underwriting::domain::LoanDetailsInput {
        cibil_score: 901,
        loan_amount: 9_999.0,
        loan_interest: 0.5,
        loan_term: 400,
        active_loans: -1,
        loan_purpose: String::new(),
        ..asha_loan()
    };

    let rejection = validate_loan(loan, 1_200_000.0).expect_err("every rule fails");
    assert_eq!(rejection.reasons.len(), 6);
}

#[test]
fn loan_percent_income_matches_ratio() {
    for (amount, income) in [(10_000.0, 1.0), (600_000.0, 1_200_000.0), (123_456.0, 987_654.0)] {
        let expected = amount / income * 100.0;
        assert!((loan_percent_income(amount, income) - expected).abs() < 1e-9);
    }
}
