//! Static description of the queryable relational schema.
//!
//! The same table definitions drive the prompt text handed to the language
//! model and the migrations run by [`crate::ledger::Ledger`], so the model is
//! always grounded on the tables that actually exist.

use crate::planning::periods::InvestmentPeriod;
use serde::Serialize;
use std::sync::OnceLock;

pub const PERSONAL_INFO_TABLE: &str = "personal_info";
pub const TRANSACTION_INFO_TABLE: &str = "transaction_info";
pub const SCHEME_PERFORMANCE_TABLE: &str = "scheme_performance";

#[derive(Debug, Clone, Serialize)]
pub struct ColumnSpec {
    pub name: String,
    /// Column type including any SQL modifiers (`PRIMARY KEY`, `NOT NULL`, ...).
    pub sql_type: String,
    pub description: String,
}

impl ColumnSpec {
    fn new(name: impl Into<String>, sql_type: &str, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.to_string(),
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TableSpec {
    pub name: String,
    pub description: String,
    pub columns: Vec<ColumnSpec>,
    /// Table-level constraints appended after the column list.
    pub constraints: Vec<String>,
}

impl TableSpec {
    pub fn ddl(&self) -> String {
        let mut parts: Vec<String> = self
            .columns
            .iter()
            .map(|c| format!("    {} {}", c.name, c.sql_type))
            .collect();
        parts.extend(self.constraints.iter().map(|c| format!("    {}", c)));
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n{}\n)",
            self.name,
            parts.join(",\n")
        )
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SchemaDescription {
    pub tables: Vec<TableSpec>,
}

impl SchemaDescription {
    pub fn table(&self, name: &str) -> Option<&TableSpec> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Prompt-ready rendering of every table and column.
    pub fn render(&self) -> String {
        let mut out = String::from("Database: SQLite\n");
        for table in &self.tables {
            out.push_str(&format!("\nTable `{}`: {}\n", table.name, table.description));
            for column in &table.columns {
                out.push_str(&format!(
                    "  - {} {}: {}\n",
                    column.name,
                    base_type(&column.sql_type),
                    column.description
                ));
            }
        }
        out
    }

    pub fn ddl(&self) -> Vec<String> {
        self.tables.iter().map(TableSpec::ddl).collect()
    }
}

fn base_type(sql_type: &str) -> &str {
    sql_type.split_whitespace().next().unwrap_or(sql_type)
}

/// Process-wide schema description, built on first use and never mutated.
pub fn schema_description() -> &'static SchemaDescription {
    static SCHEMA: OnceLock<SchemaDescription> = OnceLock::new();
    SCHEMA.get_or_init(build_schema)
}

fn build_schema() -> SchemaDescription {
    let personal_info = TableSpec {
        name: PERSONAL_INFO_TABLE.to_string(),
        description: "Account holder details read from the header of each bank statement".to_string(),
        columns: vec![
            ColumnSpec::new("id", "INTEGER PRIMARY KEY AUTOINCREMENT", "Row id referenced by transaction_info.person_id"),
            ColumnSpec::new("bank_name", "TEXT NOT NULL DEFAULT ''", "Name of the bank issuing the statement"),
            ColumnSpec::new("person_name", "TEXT NOT NULL DEFAULT ''", "Account holder name"),
            ColumnSpec::new("branch_name", "TEXT NOT NULL DEFAULT ''", "Home branch of the account"),
            ColumnSpec::new("person_address", "TEXT NOT NULL DEFAULT ''", "Postal address of the account holder"),
            ColumnSpec::new("bank_address", "TEXT NOT NULL DEFAULT ''", "Postal address of the branch"),
            ColumnSpec::new("account_no", "TEXT NOT NULL DEFAULT ''", "Bank account number"),
            ColumnSpec::new("ifsc", "TEXT NOT NULL DEFAULT ''", "IFSC code of the branch"),
            ColumnSpec::new("customer_id", "TEXT NOT NULL UNIQUE", "Bank customer id; one row per customer"),
        ],
        constraints: vec![],
    };

    let transaction_info = TableSpec {
        name: TRANSACTION_INFO_TABLE.to_string(),
        description: "One row per bank statement transaction".to_string(),
        columns: vec![
            ColumnSpec::new("txn_id", "INTEGER PRIMARY KEY AUTOINCREMENT", "Transaction row id"),
            ColumnSpec::new("person_id", "INTEGER NOT NULL", "References personal_info.id"),
            ColumnSpec::new("bank_name", "TEXT NOT NULL DEFAULT ''", "Bank name copied from personal_info"),
            ColumnSpec::new("person_name", "TEXT NOT NULL DEFAULT ''", "Account holder name copied from personal_info"),
            ColumnSpec::new("account_no", "TEXT NOT NULL DEFAULT ''", "Account number copied from personal_info"),
            ColumnSpec::new("transaction_date", "TEXT", "Posting date, ISO format YYYY-MM-DD"),
            ColumnSpec::new("value_date", "TEXT", "Value date, ISO format YYYY-MM-DD"),
            ColumnSpec::new("description", "TEXT NOT NULL DEFAULT ''", "Narration printed on the statement"),
            ColumnSpec::new("debit", "REAL NOT NULL DEFAULT 0", "Amount withdrawn, 0 when none"),
            ColumnSpec::new("credit", "REAL NOT NULL DEFAULT 0", "Amount deposited, 0 when none"),
            ColumnSpec::new("balance", "REAL NOT NULL DEFAULT 0", "Running balance after the transaction"),
            ColumnSpec::new(
                "label",
                "TEXT NOT NULL DEFAULT 'Others'",
                "Spending category: one of 'Food', 'Fuel', 'EMI', 'Super Market', 'IPMS', 'Travel', 'Others'",
            ),
        ],
        constraints: vec![format!(
            "FOREIGN KEY (person_id) REFERENCES {}(id)",
            PERSONAL_INFO_TABLE
        )],
    };

    let mut fund_columns = vec![ColumnSpec::new(
        "fund_name",
        "TEXT PRIMARY KEY",
        "Mutual fund scheme name",
    )];
    fund_columns.extend(InvestmentPeriod::ALL.iter().map(|period| {
        ColumnSpec::new(
            period.return_column(),
            "REAL",
            format!("Annualised return in percent over {}", period.token()),
        )
    }));

    let scheme_performance = TableSpec {
        name: SCHEME_PERFORMANCE_TABLE.to_string(),
        description: "Historical mutual fund scheme returns".to_string(),
        columns: fund_columns,
        constraints: vec![],
    };

    SchemaDescription {
        tables: vec![personal_info, transaction_info, scheme_performance],
    }
}
