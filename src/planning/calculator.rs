use crate::error::{AssistantError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmiBreakdown {
    pub years: u32,
    pub emi: f64,
    pub total_amount: f64,
    pub total_interest: f64,
}

fn non_negative(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(AssistantError::InvalidInput(format!(
            "{} must be a non-negative number, got {}",
            name, value
        )))
    }
}

/// Future value of a monthly contribution compounding at the monthly
/// equivalent of an annual rate.
pub fn future_value(monthly: f64, annual_rate_pct: f64, years: f64) -> Result<f64> {
    non_negative("monthly saving", monthly)?;
    non_negative("annual rate", annual_rate_pct)?;
    non_negative("years", years)?;

    let months = years * 12.0;
    let rate = (1.0 + annual_rate_pct / 100.0).powf(1.0 / 12.0) - 1.0;
    if rate == 0.0 {
        return Ok(monthly * months);
    }
    Ok(monthly * ((1.0 + rate).powf(months) - 1.0) / rate)
}

/// Equated monthly instalment on a reducing-balance loan.
pub fn calculate_emi(principal: f64, annual_rate_pct: f64, years: u32) -> Result<EmiBreakdown> {
    non_negative("principal", principal)?;
    non_negative("annual rate", annual_rate_pct)?;
    if years == 0 {
        return Err(AssistantError::InvalidInput(
            "loan tenure must be at least one year".to_string(),
        ));
    }

    let payments = f64::from(years * 12);
    let rate = annual_rate_pct / 1200.0;
    let emi = if rate == 0.0 {
        principal / payments
    } else {
        let growth = (1.0 + rate).powf(payments);
        principal * rate * growth / (growth - 1.0)
    };
    let total_amount = emi * payments;

    Ok(EmiBreakdown {
        years,
        emi,
        total_amount,
        total_interest: total_amount - principal,
    })
}

/// Future value of a monthly SIP using the simple monthly rate `r / 1200`.
pub fn mutual_fund_savings(monthly: f64, years: u32, annual_rate_pct: f64) -> Result<f64> {
    non_negative("monthly saving", monthly)?;
    non_negative("annual rate", annual_rate_pct)?;

    let payments = f64::from(years * 12);
    let rate = annual_rate_pct / 1200.0;
    if rate == 0.0 {
        return Ok(monthly * payments);
    }
    Ok(monthly * ((1.0 + rate).powf(payments) - 1.0) / rate)
}
