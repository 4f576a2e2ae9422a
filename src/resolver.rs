use crate::error::{AssistantError, Result};
use crate::executor::{QueryExecutor, QueryRows};
use crate::llm::generator::QueryGenerator;
use crate::llm::prompts::sql_system_prompt;
use crate::repair::{RepairEvent, RepairLoop, RepairOutcome};
use crate::schema::{schema_description, SchemaDescription};
use log::{error, info};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::Sender;

pub const NO_ANSWER_MESSAGE: &str = "No answer could be obtained for this question.";
pub const NO_QUERY_MESSAGE: &str = "No generated query received from the LLM model.";
pub const CONNECTION_ERROR_MESSAGE: &str =
    "Database connection error. Please check your connection settings.";
pub const SYNTAX_ERROR_MESSAGE: &str = "Error in the generated SQL query syntax.";
pub const GENERATION_ERROR_MESSAGE: &str =
    "The language model could not generate a query. Please try again later.";

/// What the caller of [`QueryResolver::resolve`] receives: rows, or one of a
/// small fixed set of messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Answer {
    Rows(QueryRows),
    Message(String),
}

impl Answer {
    pub fn rows(&self) -> Option<&QueryRows> {
        match self {
            Answer::Rows(rows) => Some(rows),
            Answer::Message(_) => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Answer::Rows(_) => None,
            Answer::Message(msg) => Some(msg),
        }
    }
}

/// Answers natural-language questions over the ledger schema.
pub struct QueryResolver<G, E> {
    schema: &'static SchemaDescription,
    system_prompt: String,
    generator: G,
    executor: E,
    repair: RepairLoop,
}

impl<G, E> QueryResolver<G, E>
where
    G: QueryGenerator,
    E: QueryExecutor,
{
    pub fn new(generator: G, executor: E, repair: RepairLoop) -> Self {
        let schema = schema_description();
        Self {
            schema,
            system_prompt: sql_system_prompt(schema),
            generator,
            executor,
            repair,
        }
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn repair_loop(&self) -> &RepairLoop {
        &self.repair
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Resolves a question. Faults are converted to fixed messages here and
    /// nowhere else.
    pub async fn resolve(&self, question: &str) -> Answer {
        self.resolve_with_progress(question, None).await
    }

    pub async fn resolve_with_progress(
        &self,
        question: &str,
        progress: Option<&Sender<RepairEvent>>,
    ) -> Answer {
        match self.try_resolve(question, progress).await {
            Ok(RepairOutcome::Success { rows, attempts, .. }) => {
                info!("Resolved question in {} attempt(s)", attempts);
                Answer::Rows(rows)
            }
            Ok(RepairOutcome::Exhausted { .. }) => Answer::Message(NO_ANSWER_MESSAGE.to_string()),
            Err(e) => {
                error!("Failed to resolve question: {}", e);
                Answer::Message(fault_message(&e))
            }
        }
    }

    /// Runs the repair loop and hands back its raw outcome, faults included.
    pub async fn try_resolve(
        &self,
        question: &str,
        progress: Option<&Sender<RepairEvent>>,
    ) -> Result<RepairOutcome> {
        self.repair
            .run(
                &self.generator,
                &self.executor,
                question,
                &self.system_prompt,
                self.schema,
                progress,
            )
            .await
    }
}

/// Maps a fault to the user-facing message for its category.
pub fn fault_message(err: &AssistantError) -> String {
    match err {
        AssistantError::EmptyGeneration => NO_QUERY_MESSAGE.to_string(),
        AssistantError::Generation(_) => GENERATION_ERROR_MESSAGE.to_string(),
        AssistantError::Connection(_) | AssistantError::Database(_) => {
            CONNECTION_ERROR_MESSAGE.to_string()
        }
        AssistantError::StatementRejected(_) => SYNTAX_ERROR_MESSAGE.to_string(),
        other => format!("An unexpected error occurred: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_messages() {
        assert_eq!(fault_message(&AssistantError::EmptyGeneration), NO_QUERY_MESSAGE);
        assert_eq!(
            fault_message(&AssistantError::Generation("401".into())),
            GENERATION_ERROR_MESSAGE
        );
        assert_eq!(
            fault_message(&AssistantError::Connection("refused".into())),
            CONNECTION_ERROR_MESSAGE
        );
        assert_eq!(
            fault_message(&AssistantError::StatementRejected("DROP".into())),
            SYNTAX_ERROR_MESSAGE
        );
        assert_eq!(
            fault_message(&AssistantError::Suggestion("rate limited".into())),
            "An unexpected error occurred: Error generating query suggestion: rate limited"
        );
    }

    #[test]
    fn test_answer_serializes_tagged() {
        let json = serde_json::to_value(Answer::Message(NO_ANSWER_MESSAGE.into())).unwrap();
        assert_eq!(json["kind"], "message");
        assert_eq!(json["value"], NO_ANSWER_MESSAGE);
        assert!(Answer::Rows(QueryRows::empty()).rows().unwrap().is_empty());
    }
}
