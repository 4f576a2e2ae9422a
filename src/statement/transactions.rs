use crate::error::{AssistantError, Result};
use crate::statement::classification::TransactionCategory;
use crate::statement::pdf::RawTransactionRow;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const STATEMENT_DATE_FORMAT: &str = "%d/%m/%Y";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_date: Option<NaiveDate>,
    pub value_date: Option<NaiveDate>,
    pub description: String,
    pub debit: f64,
    pub credit: f64,
    pub balance: f64,
    pub category: TransactionCategory,
}

impl Transaction {
    pub fn from_raw(raw: &RawTransactionRow, category: TransactionCategory) -> Result<Self> {
        Ok(Self {
            transaction_date: convert_date(&raw.transaction_date)?,
            value_date: convert_date(&raw.value_date)?,
            description: raw.description.clone(),
            debit: convert_amount(&raw.debit)?,
            credit: convert_amount(&raw.credit)?,
            balance: convert_amount(&raw.balance)?,
            category,
        })
    }
}

/// Parses a `dd/mm/yyyy` statement date. Blank input has no date.
pub fn convert_date(raw: &str) -> Result<Option<NaiveDate>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(trimmed, STATEMENT_DATE_FORMAT)
        .map(Some)
        .map_err(|_| AssistantError::InvalidInput(format!("Date conversion error for '{}'", raw)))
}

/// Parses an amount with thousands separators. Blank input is zero.
pub fn convert_amount(raw: &str) -> Result<f64> {
    let cleaned = raw.trim().replace(',', "");
    if cleaned.is_empty() {
        return Ok(0.0);
    }
    cleaned
        .parse::<f64>()
        .map_err(|_| AssistantError::InvalidInput(format!("Amount conversion error for '{}'", raw)))
}

pub fn is_valid_value(raw: &str) -> bool {
    let trimmed = raw.trim();
    !(trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case("nan")
        || trimmed.eq_ignore_ascii_case("none"))
}

/// Keeps rows whose dates and amounts are all present.
pub fn filter_valid_rows(rows: Vec<RawTransactionRow>) -> Vec<RawTransactionRow> {
    rows.into_iter()
        .filter(|row| {
            [
                &row.transaction_date,
                &row.value_date,
                &row.debit,
                &row.credit,
                &row.balance,
            ]
            .iter()
            .all(|value| is_valid_value(value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(date: &str, debit: &str) -> RawTransactionRow {
        RawTransactionRow {
            transaction_date: date.to_string(),
            value_date: date.to_string(),
            description: "UPI/ZOMATO".to_string(),
            debit: debit.to_string(),
            credit: "0.00".to_string(),
            balance: "1,20,500.75".to_string(),
        }
    }

    #[test]
    fn test_convert_date() {
        assert_eq!(
            convert_date("31/01/2024").unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31)
        );
        assert_eq!(convert_date("  ").unwrap(), None);
        assert!(convert_date("2024-01-31").is_err());
    }

    #[test]
    fn test_convert_amount() {
        assert_eq!(convert_amount("1,234.50").unwrap(), 1234.5);
        assert_eq!(convert_amount("").unwrap(), 0.0);
        assert!(convert_amount("abc").is_err());
    }

    #[test]
    fn test_filter_valid_rows() {
        let rows = vec![raw("01/02/2024", "10.00"), raw("nan", "1.00"), raw("02/02/2024", "")];
        let kept = filter_valid_rows(rows);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].transaction_date, "01/02/2024");
    }

    #[test]
    fn test_from_raw() {
        let txn = Transaction::from_raw(&raw("05/03/2024", "250.00"), TransactionCategory::Food)
            .unwrap();
        assert_eq!(txn.transaction_date, NaiveDate::from_ymd_opt(2024, 3, 5));
        assert_eq!(txn.debit, 250.0);
        assert_eq!(txn.balance, 120500.75);
        assert_eq!(txn.category, TransactionCategory::Food);
    }
}
