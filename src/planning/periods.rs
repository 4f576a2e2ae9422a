use crate::error::{AssistantError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Horizon over which a fund's historical return is reported and savings are
/// projected. Each token has a matching `ret_<token>` column in
/// `scheme_performance`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum InvestmentPeriod {
    #[serde(rename = "7_days")]
    Days7,
    #[serde(rename = "14_days")]
    Days14,
    #[serde(rename = "21_days")]
    Days21,
    #[serde(rename = "28_days")]
    Days28,
    #[serde(rename = "90_days")]
    Days90,
    #[serde(rename = "365_days")]
    Days365,
    #[serde(rename = "730_days")]
    Days730,
    #[serde(rename = "1095_days")]
    Days1095,
    #[serde(rename = "1825_days")]
    Days1825,
    #[serde(rename = "3650_days")]
    Days3650,
    #[serde(rename = "1week")]
    Week1,
    #[serde(rename = "1month")]
    Month1,
    #[serde(rename = "3month")]
    Month3,
    #[serde(rename = "6month")]
    Month6,
    #[serde(rename = "9month")]
    Month9,
    #[serde(rename = "1year")]
    Year1,
    #[serde(rename = "2year")]
    Year2,
    #[serde(rename = "3year")]
    Year3,
    #[serde(rename = "4year")]
    Year4,
    #[serde(rename = "5year")]
    Year5,
    #[serde(rename = "7year")]
    Year7,
    #[serde(rename = "10year")]
    Year10,
    #[serde(rename = "15year")]
    Year15,
    #[serde(rename = "20year")]
    Year20,
}

/// Periods shown on the savings dashboard.
pub const DASHBOARD_PERIODS: [InvestmentPeriod; 7] = [
    InvestmentPeriod::Month6,
    InvestmentPeriod::Year1,
    InvestmentPeriod::Year2,
    InvestmentPeriod::Year3,
    InvestmentPeriod::Year4,
    InvestmentPeriod::Year5,
    InvestmentPeriod::Year10,
];

impl InvestmentPeriod {
    pub const ALL: [InvestmentPeriod; 24] = [
        Self::Days7,
        Self::Days14,
        Self::Days21,
        Self::Days28,
        Self::Days90,
        Self::Days365,
        Self::Days730,
        Self::Days1095,
        Self::Days1825,
        Self::Days3650,
        Self::Week1,
        Self::Month1,
        Self::Month3,
        Self::Month6,
        Self::Month9,
        Self::Year1,
        Self::Year2,
        Self::Year3,
        Self::Year4,
        Self::Year5,
        Self::Year7,
        Self::Year10,
        Self::Year15,
        Self::Year20,
    ];

    pub fn token(self) -> &'static str {
        match self {
            Self::Days7 => "7_days",
            Self::Days14 => "14_days",
            Self::Days21 => "21_days",
            Self::Days28 => "28_days",
            Self::Days90 => "90_days",
            Self::Days365 => "365_days",
            Self::Days730 => "730_days",
            Self::Days1095 => "1095_days",
            Self::Days1825 => "1825_days",
            Self::Days3650 => "3650_days",
            Self::Week1 => "1week",
            Self::Month1 => "1month",
            Self::Month3 => "3month",
            Self::Month6 => "6month",
            Self::Month9 => "9month",
            Self::Year1 => "1year",
            Self::Year2 => "2year",
            Self::Year3 => "3year",
            Self::Year4 => "4year",
            Self::Year5 => "5year",
            Self::Year7 => "7year",
            Self::Year10 => "10year",
            Self::Year15 => "15year",
            Self::Year20 => "20year",
        }
    }

    /// Length of the period in years.
    pub fn years(self) -> f64 {
        match self {
            Self::Days7 | Self::Week1 => 7.0 / 365.0,
            Self::Days14 => 14.0 / 365.0,
            Self::Days21 => 21.0 / 365.0,
            Self::Days28 => 28.0 / 365.0,
            Self::Days90 => 90.0 / 365.0,
            Self::Days365 | Self::Year1 => 1.0,
            Self::Days730 | Self::Year2 => 2.0,
            Self::Days1095 | Self::Year3 => 3.0,
            Self::Days1825 | Self::Year5 => 5.0,
            Self::Days3650 | Self::Year10 => 10.0,
            Self::Month1 => 1.0 / 12.0,
            Self::Month3 => 3.0 / 12.0,
            Self::Month6 => 0.5,
            Self::Month9 => 9.0 / 12.0,
            Self::Year4 => 4.0,
            Self::Year7 => 7.0,
            Self::Year15 => 15.0,
            Self::Year20 => 20.0,
        }
    }

    /// Column in `scheme_performance` holding the fund return for this period.
    pub fn return_column(self) -> String {
        format!("ret_{}", self.token())
    }
}

impl fmt::Display for InvestmentPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for InvestmentPeriod {
    type Err = AssistantError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        Self::ALL
            .iter()
            .copied()
            .find(|period| period.token() == normalized)
            .ok_or_else(|| AssistantError::UnknownPeriod(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tokens() {
        assert_eq!("1year".parse::<InvestmentPeriod>().unwrap(), InvestmentPeriod::Year1);
        assert_eq!(" 2 year ".parse::<InvestmentPeriod>().unwrap(), InvestmentPeriod::Year2);
        assert_eq!("90_days".parse::<InvestmentPeriod>().unwrap(), InvestmentPeriod::Days90);
        assert!(matches!(
            "fortnight".parse::<InvestmentPeriod>(),
            Err(AssistantError::UnknownPeriod(_))
        ));
    }

    #[test]
    fn test_years() {
        assert_eq!(InvestmentPeriod::Month6.years(), 0.5);
        assert_eq!(InvestmentPeriod::Days1825.years(), 5.0);
        assert!((InvestmentPeriod::Month3.years() - 0.25).abs() < 1e-12);
        assert!((InvestmentPeriod::Week1.years() - InvestmentPeriod::Days7.years()).abs() < 1e-12);
    }

    #[test]
    fn test_tokens_round_trip_through_serde() {
        for period in InvestmentPeriod::ALL {
            let json = serde_json::to_string(&period).unwrap();
            assert_eq!(json, format!("\"{}\"", period.token()));
            assert_eq!(period.token().parse::<InvestmentPeriod>().unwrap(), period);
        }
    }

    #[test]
    fn test_return_column() {
        assert_eq!(InvestmentPeriod::Year10.return_column(), "ret_10year");
        assert_eq!(InvestmentPeriod::Days7.return_column(), "ret_7_days");
    }
}
