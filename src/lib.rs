//! # Financial Query Assistant
//!
//! A library for answering natural-language questions about personal bank
//! data. Statements are read from PDF, stored in SQLite, and queried through
//! SQL written by a language model.
//!
//! ## Core Concepts
//!
//! - **Query Generator**: sends the question plus a schema prompt to a chat model and returns SQL text
//! - **Query Executor**: runs one statement against SQLite and reports rows or an error message, never a fault
//! - **Repair Loop**: feeds execution errors back to the model for a corrected query, bounded by an attempt ceiling
//! - **Resolver**: the entry point mapping every outcome to rows or a fixed user-facing message
//! - **Ledger**: statement details, labelled transactions and fund returns
//! - **Planning**: savings projections, EMI comparisons and goal plans
//!
//! ## Example
//!
//! ```rust,ignore
//! use financial_query_assistant::*;
//!
//! let config = AssistantConfig::new(
//!     LlmConfig::new(std::env::var("OPENAI_KEY")?),
//!     DatabaseConfig::new("finq.sqlite3"),
//! );
//!
//! let resolver = QueryResolver::new(
//!     SqlQueryGenerator::new(ChatClient::new(&config.llm)),
//!     SqliteExecutor::read_only(&config.database.path),
//!     RepairLoop::from_config(&config.repair),
//! );
//!
//! match resolver.resolve("How much did I spend on fuel in March?").await {
//!     Answer::Rows(rows) => println!("{:?}", rows),
//!     Answer::Message(msg) => println!("{}", msg),
//! }
//! ```

pub mod assistant;
pub mod config;
pub mod error;
pub mod executor;
pub mod guard;
pub mod ledger;
pub mod llm;
pub mod planning;
pub mod repair;
pub mod resolver;
pub mod schema;
pub mod statement;

pub use assistant::{AssistantReply, Dashboard, FinancialAssistant, IngestSummary};
pub use config::{AssistantConfig, DatabaseConfig, LlmConfig, RepairConfig};
pub use error::{AssistantError, Result};
pub use executor::{AccessMode, CellValue, ExecutionOutcome, QueryExecutor, QueryRows, SqliteExecutor};
pub use guard::{StatementGuard, StatementKind};
pub use ledger::{FundPerformance, FundReturn, Ledger, MonthlyBalance};
pub use llm::{ChatClient, LanguageModel, QueryGenerator, SqlQueryGenerator};
pub use repair::{RepairEvent, RepairLoop, RepairOutcome, RetryPolicy};
pub use resolver::{Answer, QueryResolver, NO_ANSWER_MESSAGE};
pub use schema::{schema_description, SchemaDescription};
