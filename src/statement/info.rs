use crate::error::{AssistantError, Result};
use crate::llm::client::LanguageModel;
use crate::llm::prompts::{statement_info_prompt, STATEMENT_INFO_SYSTEM_PROMPT};
use crate::llm::types::{ChatMessage, SamplingConfig};
use crate::llm::utils::clean_json_output;
use log::{debug, warn};
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

pub const INFO_SAMPLING: SamplingConfig = SamplingConfig::new(256, 0.0, Some(1.0));

/// Account details printed in a statement header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "PascalCase")]
pub struct StatementInfo {
    pub bank_name: String,
    pub person_name: String,
    pub person_address: String,
    #[serde(rename = "CustomerID")]
    pub customer_id: String,
    pub branch_name: String,
    pub branch_address: String,
    #[serde(rename = "IFSC")]
    pub ifsc: String,
    pub account_no: String,
}

pub struct StatementInfoExtractor<M> {
    model: M,
}

impl<M: LanguageModel> StatementInfoExtractor<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }

    pub async fn extract(&self, header_text: &str) -> Result<StatementInfo> {
        let schema = serde_json::to_string_pretty(&schema_for!(StatementInfo))?;
        let messages = [
            ChatMessage::system(STATEMENT_INFO_SYSTEM_PROMPT),
            ChatMessage::user(statement_info_prompt(header_text, &schema)),
        ];

        let raw = self.model.complete(&messages, &INFO_SAMPLING).await?;
        debug!("Statement info reply: {}", raw);

        let json = clean_json_output(&raw);
        serde_json::from_str::<StatementInfo>(&json).map_err(|e| {
            warn!("Could not parse statement info: {}", e);
            AssistantError::MalformedResponse(format!("statement info: {}", e))
        })
    }
}
