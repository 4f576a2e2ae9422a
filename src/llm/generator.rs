use crate::error::Result;
use crate::llm::client::LanguageModel;
use crate::llm::types::{ChatMessage, SamplingConfig};
use crate::llm::utils::strip_code_fence;
use async_trait::async_trait;

/// Fixed sampling for SQL generation.
pub const SQL_SAMPLING: SamplingConfig = SamplingConfig::new(150, 0.7, Some(0.9));

/// Produces SQL text for a question. The text is not validated; execution
/// decides whether it is usable.
#[async_trait]
pub trait QueryGenerator: Send + Sync {
    async fn generate(&self, question: &str, system_prompt: &str) -> Result<String>;
}

pub struct SqlQueryGenerator<M> {
    model: M,
}

impl<M: LanguageModel> SqlQueryGenerator<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &M {
        &self.model
    }
}

#[async_trait]
impl<M: LanguageModel> QueryGenerator for SqlQueryGenerator<M> {
    async fn generate(&self, question: &str, system_prompt: &str) -> Result<String> {
        let messages = [ChatMessage::system(system_prompt), ChatMessage::user(question)];
        let raw = self.model.complete(&messages, &SQL_SAMPLING).await?;
        Ok(strip_code_fence(&raw))
    }
}
