//! High-level façade over ingestion, question answering, planning and the
//! dashboard.

use crate::config::AssistantConfig;
use crate::error::{AssistantError, Result};
use crate::executor::{QueryRows, SqliteExecutor};
use crate::ledger::{FundPerformance, Ledger, MonthlyBalance};
use crate::llm::client::{ChatClient, LanguageModel};
use crate::llm::generator::SqlQueryGenerator;
use crate::planning::goals::{is_financial_goal_query, plan_goal, GoalEntityExtractor, GoalPlan};
use crate::planning::periods::DASHBOARD_PERIODS;
use crate::planning::report::{build_report, InvestmentReport, DEFAULT_TOP_N};
use crate::repair::RepairLoop;
use crate::resolver::{fault_message, Answer, QueryResolver};
use crate::statement::classification::{TransactionCategory, TransactionClassifier};
use crate::statement::info::StatementInfoExtractor;
use crate::statement::pdf::{validate_upload, StatementDocument};
use crate::statement::transactions::{filter_valid_rows, Transaction};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const QUERY_REQUIRED_MESSAGE: &str = "Query parameter is required";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AssistantReply {
    Rows(QueryRows),
    Plan(Box<GoalPlan>),
    Message(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestSummary {
    pub person_id: i64,
    pub customer_id: String,
    pub person_name: String,
    pub rows_read: usize,
    pub rows_skipped: usize,
    pub transactions_inserted: usize,
    pub categories: BTreeMap<TransactionCategory, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub person_name: String,
    pub account_no: String,
    pub balances: Vec<MonthlyBalance>,
    pub average_balance: i64,
    pub suggestions: InvestmentReport,
}

/// Mean of the monthly averages rounded to a whole amount, 0 when empty.
pub fn rounded_average_balance(balances: &[MonthlyBalance]) -> i64 {
    if balances.is_empty() {
        return 0;
    }
    let total: f64 = balances.iter().map(|b| b.average_balance).sum();
    (total / balances.len() as f64).round() as i64
}

pub struct FinancialAssistant<M> {
    model: M,
    db_path: PathBuf,
    resolver: QueryResolver<SqlQueryGenerator<M>, SqliteExecutor>,
}

impl FinancialAssistant<ChatClient> {
    pub fn from_config(config: &AssistantConfig) -> Self {
        Self::with_model(ChatClient::new(&config.llm), config)
    }
}

impl<M> FinancialAssistant<M>
where
    M: LanguageModel + Clone,
{
    pub fn with_model(model: M, config: &AssistantConfig) -> Self {
        let executor = SqliteExecutor::new(&config.database.path, config.database.access);
        let resolver = QueryResolver::new(
            SqlQueryGenerator::new(model.clone()),
            executor,
            RepairLoop::from_config(&config.repair),
        );
        Self {
            model,
            db_path: config.database.path.clone(),
            resolver,
        }
    }

    pub fn resolver(&self) -> &QueryResolver<SqlQueryGenerator<M>, SqliteExecutor> {
        &self.resolver
    }

    pub fn open_ledger(&self) -> Result<Ledger> {
        Ledger::open(&self.db_path)
    }

    pub fn monthly_saving(&self) -> Result<i64> {
        let balances = self.open_ledger()?.average_balances()?;
        Ok(rounded_average_balance(&balances))
    }

    /// Routes a query to the goal planner or to SQL question answering.
    pub async fn answer(&self, query: &str) -> AssistantReply {
        if query.trim().is_empty() {
            return AssistantReply::Message(QUERY_REQUIRED_MESSAGE.to_string());
        }

        if is_financial_goal_query(query) {
            info!("Routing goal query to the planner");
            let saving = match self.monthly_saving() {
                Ok(saving) => saving,
                Err(e) => {
                    warn!("Could not compute the average balance: {}", e);
                    return AssistantReply::Message(fault_message(&e));
                }
            };
            return match self.plan(query, saving as f64).await {
                Ok(plan) => AssistantReply::Plan(Box::new(plan)),
                Err(e) => AssistantReply::Message(format!(
                    "Error in processing financial analysis: {}",
                    e
                )),
            };
        }

        match self.resolver.resolve(query).await {
            Answer::Rows(rows) => AssistantReply::Rows(rows),
            Answer::Message(msg) => AssistantReply::Message(msg),
        }
    }

    pub async fn plan(&self, sentence: &str, monthly_saving: f64) -> Result<GoalPlan> {
        let entities = GoalEntityExtractor::new(self.model.clone())
            .extract(sentence)
            .await?;
        let period = entities.period()?;

        let fund_return = {
            let ledger = self.open_ledger()?;
            match ledger.top_performing_funds(period, 1) {
                Ok(funds) => funds.first().map(|f| f.return_percentage),
                Err(AssistantError::NoData(msg)) => {
                    warn!("{}; planning without projected savings", msg);
                    None
                }
                Err(e) => return Err(e),
            }
        };

        plan_goal(&entities, monthly_saving, fund_return)
    }

    pub async fn ingest_statement(&self, path: &Path) -> Result<IngestSummary> {
        validate_upload(path)?;
        let document = StatementDocument::open(path)?;
        self.ingest_document(&document).await
    }

    pub async fn ingest_document(&self, document: &StatementDocument) -> Result<IngestSummary> {
        let statement_info = StatementInfoExtractor::new(self.model.clone())
            .extract(&document.header_text())
            .await?;
        if statement_info.customer_id.trim().is_empty() {
            return Err(AssistantError::MalformedResponse(
                "statement header has no customer id".to_string(),
            ));
        }

        let raw_rows = document.transaction_rows()?;
        let rows_read = raw_rows.len();
        let rows = filter_valid_rows(raw_rows);

        let descriptions: Vec<String> = rows.iter().map(|r| r.description.clone()).collect();
        let labels = TransactionClassifier::new(self.model.clone())
            .classify_all(&descriptions)
            .await?;

        let transactions = rows
            .iter()
            .zip(labels)
            .map(|(row, label)| Transaction::from_raw(row, label))
            .collect::<Result<Vec<_>>>()?;

        let mut categories = BTreeMap::new();
        for txn in &transactions {
            *categories.entry(txn.category).or_insert(0) += 1;
        }

        let mut ledger = self.open_ledger()?;
        let person_id = ledger.upsert_personal_info(&statement_info)?;
        let inserted = ledger.insert_transactions(person_id, &statement_info, &transactions)?;
        info!(
            "Ingested {} of {} rows for customer {}",
            inserted, rows_read, statement_info.customer_id
        );

        Ok(IngestSummary {
            person_id,
            customer_id: statement_info.customer_id,
            person_name: statement_info.person_name,
            rows_read,
            rows_skipped: rows_read - rows.len(),
            transactions_inserted: inserted,
            categories,
        })
    }

    pub fn dashboard(&self) -> Result<Dashboard> {
        let ledger = self.open_ledger()?;
        let balances = ledger.average_balances()?;
        let first = balances
            .first()
            .ok_or_else(|| AssistantError::NoData("no transactions ingested yet".to_string()))?;
        let average_balance = rounded_average_balance(&balances);
        let suggestions = build_report(
            &ledger,
            average_balance as f64,
            &DASHBOARD_PERIODS,
            DEFAULT_TOP_N,
        );

        Ok(Dashboard {
            person_name: first.person_name.clone(),
            account_no: first.account_no.clone(),
            average_balance,
            suggestions,
            balances,
        })
    }

    pub fn import_funds(&self, funds: &[FundPerformance]) -> Result<usize> {
        let ledger = self.open_ledger()?;
        for fund in funds {
            ledger.insert_fund_performance(fund)?;
        }
        Ok(funds.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balance(avg: f64) -> MonthlyBalance {
        MonthlyBalance {
            bank_name: "B".to_string(),
            person_name: "P".to_string(),
            account_no: "1".to_string(),
            year: 2024,
            month: 1,
            average_balance: avg,
        }
    }

    #[test]
    fn test_rounded_average_balance() {
        assert_eq!(rounded_average_balance(&[]), 0);
        assert_eq!(rounded_average_balance(&[balance(1000.4), balance(2000.8)]), 1501);
    }

    #[test]
    fn test_reply_json_shape() {
        let json =
            serde_json::to_value(AssistantReply::Message(QUERY_REQUIRED_MESSAGE.to_string()))
                .unwrap();
        assert_eq!(json["kind"], "message");
        assert_eq!(json["value"], QUERY_REQUIRED_MESSAGE);
    }
}
