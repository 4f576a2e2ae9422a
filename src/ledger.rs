//! SQLite-backed store for statement details, transactions and fund returns.

use crate::error::{AssistantError, Result};
use crate::planning::periods::InvestmentPeriod;
use crate::schema::{
    schema_description, PERSONAL_INFO_TABLE, SCHEME_PERFORMANCE_TABLE, TRANSACTION_INFO_TABLE,
};
use crate::statement::info::StatementInfo;
use crate::statement::transactions::Transaction;
use log::{debug, info};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Average balance of one account over the first days of a month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyBalance {
    pub bank_name: String,
    pub person_name: String,
    pub account_no: String,
    pub year: i32,
    pub month: u32,
    pub average_balance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundReturn {
    pub fund_name: String,
    pub return_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FundPerformance {
    pub fund_name: String,
    pub returns: BTreeMap<InvestmentPeriod, f64>,
}

impl FundPerformance {
    pub fn new(fund_name: impl Into<String>) -> Self {
        Self {
            fund_name: fund_name.into(),
            returns: BTreeMap::new(),
        }
    }

    pub fn with_return(mut self, period: InvestmentPeriod, pct: f64) -> Self {
        self.returns.insert(period, pct);
        self
    }
}

pub struct Ledger {
    conn: Connection,
}

impl Ledger {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| {
            AssistantError::Connection(format!("cannot open {}: {}", path.display(), e))
        })?;
        info!("Opened ledger at {}", path.display());
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let ledger = Self { conn };
        ledger.migrate()?;
        Ok(ledger)
    }

    fn migrate(&self) -> Result<()> {
        for ddl in schema_description().ddl() {
            self.conn.execute_batch(&ddl)?;
        }
        Ok(())
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Inserts or refreshes the account holder keyed by customer id and
    /// returns its row id.
    pub fn upsert_personal_info(&self, info: &StatementInfo) -> Result<i64> {
        let sql = format!(
            "INSERT INTO {table} \
             (bank_name, person_name, branch_name, person_address, bank_address, account_no, ifsc, customer_id) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) \
             ON CONFLICT(customer_id) DO UPDATE SET \
             bank_name = excluded.bank_name, person_name = excluded.person_name, \
             branch_name = excluded.branch_name, person_address = excluded.person_address, \
             bank_address = excluded.bank_address, account_no = excluded.account_no, \
             ifsc = excluded.ifsc",
            table = PERSONAL_INFO_TABLE
        );
        self.conn.execute(
            &sql,
            params![
                info.bank_name,
                info.person_name,
                info.branch_name,
                info.person_address,
                info.branch_address,
                info.account_no,
                info.ifsc,
                info.customer_id,
            ],
        )?;

        let id: Option<i64> = self
            .conn
            .query_row(
                &format!("SELECT id FROM {} WHERE customer_id = ?1", PERSONAL_INFO_TABLE),
                params![info.customer_id],
                |row| row.get(0),
            )
            .optional()?;
        id.ok_or_else(|| {
            AssistantError::NoData(format!(
                "personal record for customer '{}' was not found after insertion",
                info.customer_id
            ))
        })
    }

    /// Writes all transactions in one database transaction.
    pub fn insert_transactions(
        &mut self,
        person_id: i64,
        info: &StatementInfo,
        transactions: &[Transaction],
    ) -> Result<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {} \
                 (person_id, bank_name, person_name, account_no, transaction_date, value_date, description, debit, credit, balance, label) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                TRANSACTION_INFO_TABLE
            ))?;
            for txn in transactions {
                stmt.execute(params![
                    person_id,
                    info.bank_name,
                    info.person_name,
                    info.account_no,
                    txn.transaction_date,
                    txn.value_date,
                    txn.description,
                    txn.debit,
                    txn.credit,
                    txn.balance,
                    txn.category.label(),
                ])?;
            }
        }
        tx.commit()?;
        debug!("Inserted {} transactions for person {}", transactions.len(), person_id);
        Ok(transactions.len())
    }

    pub fn average_balances(&self) -> Result<Vec<MonthlyBalance>> {
        let sql = format!(
            "WITH adjusted AS ( \
                 SELECT bank_name, person_name, account_no, \
                        date(transaction_date, 'start of month') AS month_start, balance \
                 FROM {table} \
                 WHERE transaction_date IS NOT NULL \
                   AND date(transaction_date) BETWEEN date(transaction_date, 'start of month', '-1 day') \
                                                  AND date(transaction_date, 'start of month', '+1 day') \
             ), monthly AS ( \
                 SELECT bank_name, person_name, account_no, \
                        CAST(strftime('%Y', month_start) AS INTEGER) AS year, \
                        CAST(strftime('%m', month_start) AS INTEGER) AS month, \
                        AVG(balance) AS average_balance \
                 FROM adjusted \
                 GROUP BY bank_name, person_name, account_no, year, month \
             ) \
             SELECT bank_name, person_name, account_no, year, month, ROUND(average_balance, 2) \
             FROM monthly \
             ORDER BY bank_name, person_name, account_no, year, month",
            table = TRANSACTION_INFO_TABLE
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            Ok(MonthlyBalance {
                bank_name: row.get(0)?,
                person_name: row.get(1)?,
                account_no: row.get(2)?,
                year: row.get(3)?,
                month: row.get(4)?,
                average_balance: row.get(5)?,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(AssistantError::from)
    }

    /// Best `n` funds by return over `period`. The column name comes from the
    /// period enum, never from caller text.
    pub fn top_performing_funds(&self, period: InvestmentPeriod, n: usize) -> Result<Vec<FundReturn>> {
        let column = period.return_column();
        let sql = format!(
            "SELECT fund_name, {column} AS return_percentage FROM {table} \
             WHERE {column} IS NOT NULL \
             ORDER BY return_percentage DESC LIMIT ?1",
            column = column,
            table = SCHEME_PERFORMANCE_TABLE
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let funds = stmt
            .query_map(params![n as i64], |row| {
                Ok(FundReturn {
                    fund_name: row.get(0)?,
                    return_percentage: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        if funds.is_empty() {
            return Err(AssistantError::NoData(format!(
                "no fund returns recorded for {}",
                period
            )));
        }
        Ok(funds)
    }

    pub fn insert_fund_performance(&self, fund: &FundPerformance) -> Result<()> {
        let columns: Vec<String> = fund.returns.keys().map(|p| p.return_column()).collect();
        let placeholders: Vec<String> = (0..=columns.len()).map(|i| format!("?{}", i + 1)).collect();
        let updates = if columns.is_empty() {
            "fund_name = excluded.fund_name".to_string()
        } else {
            columns
                .iter()
                .map(|c| format!("{c} = excluded.{c}", c = c))
                .collect::<Vec<_>>()
                .join(", ")
        };

        let mut all_columns = vec!["fund_name".to_string()];
        all_columns.extend(columns);
        let sql = format!(
            "INSERT INTO {table} ({columns}) VALUES ({placeholders}) \
             ON CONFLICT(fund_name) DO UPDATE SET {updates}",
            table = SCHEME_PERFORMANCE_TABLE,
            columns = all_columns.join(", "),
            placeholders = placeholders.join(", "),
            updates = updates
        );

        let mut values: Vec<rusqlite::types::Value> = vec![fund.fund_name.clone().into()];
        values.extend(fund.returns.values().map(|v| rusqlite::types::Value::Real(*v)));
        self.conn.execute(&sql, params_from_iter(values))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::classification::TransactionCategory;
    use chrono::NaiveDate;

    fn info(customer_id: &str, name: &str) -> StatementInfo {
        StatementInfo {
            bank_name: "Example Bank".to_string(),
            person_name: name.to_string(),
            customer_id: customer_id.to_string(),
            account_no: "0012345".to_string(),
            branch_address: "MG Road".to_string(),
            ..Default::default()
        }
    }

    fn txn(y: i32, m: u32, d: u32, balance: f64) -> Transaction {
        Transaction {
            transaction_date: NaiveDate::from_ymd_opt(y, m, d),
            value_date: NaiveDate::from_ymd_opt(y, m, d),
            description: "UPI".to_string(),
            debit: 0.0,
            credit: 0.0,
            balance,
            category: TransactionCategory::Others,
        }
    }

    #[test]
    fn test_upsert_is_keyed_by_customer() {
        let ledger = Ledger::open_in_memory().unwrap();
        let first = ledger.upsert_personal_info(&info("C1", "A Kumar")).unwrap();
        let again = ledger.upsert_personal_info(&info("C1", "A. Kumar")).unwrap();
        let other = ledger.upsert_personal_info(&info("C2", "B Rao")).unwrap();
        assert_eq!(first, again);
        assert_ne!(first, other);

        let (name, address): (String, String) = ledger
            .connection()
            .query_row(
                "SELECT person_name, bank_address FROM personal_info WHERE id = ?1",
                [first],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(name, "A. Kumar");
        assert_eq!(address, "MG Road");
    }

    #[test]
    fn test_upsert_refreshes_account_number() {
        let ledger = Ledger::open_in_memory().unwrap();
        let id = ledger.upsert_personal_info(&info("C1", "A Kumar")).unwrap();
        let moved = StatementInfo {
            account_no: "0099999".to_string(),
            ..info("C1", "A Kumar")
        };
        assert_eq!(ledger.upsert_personal_info(&moved).unwrap(), id);

        let account_no: String = ledger
            .connection()
            .query_row(
                "SELECT account_no FROM personal_info WHERE id = ?1",
                [id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(account_no, "0099999");
    }

    #[test]
    fn test_average_balances_use_month_start() {
        let mut ledger = Ledger::open_in_memory().unwrap();
        let person = info("C1", "A Kumar");
        let id = ledger.upsert_personal_info(&person).unwrap();
        let rows = vec![
            txn(2024, 1, 1, 1000.0),
            txn(2024, 1, 2, 2000.0),
            txn(2024, 1, 15, 9999.0),
            txn(2024, 2, 1, 3000.333),
        ];
        assert_eq!(ledger.insert_transactions(id, &person, &rows).unwrap(), 4);

        let balances = ledger.average_balances().unwrap();
        assert_eq!(balances.len(), 2);
        assert_eq!(balances[0].year, 2024);
        assert_eq!(balances[0].month, 1);
        assert_eq!(balances[0].average_balance, 1500.0);
        assert_eq!(balances[1].month, 2);
        assert_eq!(balances[1].average_balance, 3000.33);
    }

    #[test]
    fn test_top_performing_funds() {
        let ledger = Ledger::open_in_memory().unwrap();
        for (name, pct) in [("Alpha", 12.5), ("Beta", 18.0), ("Gamma", 9.0), ("Delta", 15.0)] {
            ledger
                .insert_fund_performance(
                    &FundPerformance::new(name).with_return(InvestmentPeriod::Year1, pct),
                )
                .unwrap();
        }
        ledger
            .insert_fund_performance(&FundPerformance::new("Alpha").with_return(InvestmentPeriod::Year1, 20.0))
            .unwrap();

        let top = ledger.top_performing_funds(InvestmentPeriod::Year1, 3).unwrap();
        let names: Vec<_> = top.iter().map(|f| f.fund_name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Beta", "Delta"]);
        assert_eq!(top[0].return_percentage, 20.0);

        assert!(matches!(
            ledger.top_performing_funds(InvestmentPeriod::Year10, 3),
            Err(AssistantError::NoData(_))
        ));
    }

    #[test]
    fn test_open_file_runs_migrations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.sqlite3");
        Ledger::open(&path).unwrap();
        let ledger = Ledger::open(&path).unwrap();
        let tables: i64 = ledger
            .connection()
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('personal_info', 'transaction_info', 'scheme_performance')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 3);
    }
}
