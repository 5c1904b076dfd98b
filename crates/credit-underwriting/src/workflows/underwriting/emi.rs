use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EmiError {
    #[error("principal must be greater than zero")]
    InvalidPrincipal,
    #[error("annual interest rate must be between 0 and 100 percent")]
    InvalidRate,
    #[error("tenure must be at least one month")]
    InvalidTenure,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmiRequest {
    pub principal: f64,
    pub annual_rate_percent: f64,
    pub months: u32,
}

/// Equated monthly installment for a fixed-rate loan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EmiQuote {
    pub monthly_installment: f64,
    pub total_payment: f64,
    pub total_interest: f64,
}

impl EmiQuote {
    pub fn compute(request: EmiRequest) -> Result<Self, EmiError> {
        let EmiRequest {
            principal,
            annual_rate_percent,
            months,
        } = request;

        if !(principal.is_finite() && principal > 0.0) {
            return Err(EmiError::InvalidPrincipal);
        }
        if !(0.0..=100.0).contains(&annual_rate_percent) {
            return Err(EmiError::InvalidRate);
        }
        if months == 0 {
            return Err(EmiError::InvalidTenure);
        }

        let n = f64::from(months);
        let monthly_rate = annual_rate_percent / 12.0 / 100.0;
        let monthly_installment = if monthly_rate == 0.0 {
            principal / n
        } else {
            let growth = (1.0 + monthly_rate).powf(n);
            principal * monthly_rate * growth / (growth - 1.0)
        };
        let total_payment = monthly_installment * n;

        Ok(Self {
            monthly_installment,
            total_payment,
            total_interest: total_payment - principal,
        })
    }
}
