use crate::config::LlmConfig;
use crate::error::{AssistantError, Result};
use crate::llm::types::*;
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use std::sync::Arc;

/// Capability boundary around the external language model. Tests substitute
/// deterministic implementations returning canned text.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage], sampling: &SamplingConfig)
        -> Result<String>;
}

#[async_trait]
impl<M: LanguageModel + ?Sized> LanguageModel for Arc<M> {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        sampling: &SamplingConfig,
    ) -> Result<String> {
        (**self).complete(messages, sampling).await
    }
}

/// Client for an OpenAI-compatible chat-completions endpoint.
#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl ChatClient {
    pub fn new(config: &LlmConfig) -> Self {
        Self {
            client: Client::new(),
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl LanguageModel for ChatClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        sampling: &SamplingConfig,
    ) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let payload = ChatCompletionRequest {
            model: &self.model,
            messages,
            max_tokens: sampling.max_tokens,
            temperature: sampling.temperature,
            top_p: sampling.top_p,
        };

        debug!(
            "Sending {} messages to {} (max_tokens={})",
            messages.len(),
            self.model,
            sampling.max_tokens
        );

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AssistantError::Generation(format!("request failed: {}", e)))?;

        let status = res.status();
        if !status.is_success() {
            let err_text = res.text().await.unwrap_or_default();
            return Err(AssistantError::Generation(format!(
                "API error (status {}): {}",
                status, err_text
            )));
        }

        let body: ChatCompletionResponse = res
            .json()
            .await
            .map_err(|e| AssistantError::Generation(format!("unreadable response: {}", e)))?;

        first_choice_text(body)
    }
}

pub(crate) fn first_choice_text(body: ChatCompletionResponse) -> Result<String> {
    body.choices
        .into_iter()
        .next()
        .ok_or_else(|| AssistantError::Generation("no choices returned".to_string()))?
        .message
        .content
        .ok_or_else(|| AssistantError::Generation("first choice has no content".to_string()))
}
