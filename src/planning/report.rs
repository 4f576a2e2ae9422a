use crate::error::Result;
use crate::ledger::{FundReturn, Ledger};
use crate::planning::calculator::future_value;
use crate::planning::periods::InvestmentPeriod;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Funds suggested per period on the dashboard.
pub const DEFAULT_TOP_N: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundProjection {
    pub fund_name: String,
    pub return_percentage: f64,
    pub total_invested_amount: f64,
    pub future_value: f64,
}

impl FundProjection {
    pub fn project(fund: &FundReturn, monthly_saving: f64, period: InvestmentPeriod) -> Result<Self> {
        let years = period.years();
        Ok(Self {
            fund_name: fund.fund_name.clone(),
            return_percentage: fund.return_percentage,
            total_invested_amount: monthly_saving * 12.0 * years,
            future_value: future_value(monthly_saving, fund.return_percentage, years)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InvestmentReport {
    pub monthly_saving: f64,
    pub periods: BTreeMap<InvestmentPeriod, Vec<FundProjection>>,
}

impl InvestmentReport {
    pub fn best_for(&self, period: InvestmentPeriod) -> Option<&FundProjection> {
        self.periods.get(&period).and_then(|funds| funds.first())
    }
}

/// Projects `monthly_saving` into the top funds of each period. A period
/// whose funds cannot be fetched or projected is left out of the report.
pub fn build_report(
    ledger: &Ledger,
    monthly_saving: f64,
    periods: &[InvestmentPeriod],
    top_n: usize,
) -> InvestmentReport {
    let mut report = InvestmentReport {
        monthly_saving,
        periods: BTreeMap::new(),
    };

    for &period in periods {
        let projections = ledger
            .top_performing_funds(period, top_n)
            .and_then(|funds| {
                funds
                    .iter()
                    .map(|fund| FundProjection::project(fund, monthly_saving, period))
                    .collect::<Result<Vec<_>>>()
            });
        match projections {
            Ok(funds) => {
                report.periods.insert(period, funds);
            }
            Err(e) => warn!("Failed to retrieve data for {}: {}", period, e),
        }
    }
    report
}
