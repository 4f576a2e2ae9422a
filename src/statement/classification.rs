use crate::error::Result;
use crate::llm::client::LanguageModel;
use crate::llm::prompts::CLASSIFICATION_SYSTEM_PROMPT;
use crate::llm::types::{ChatMessage, SamplingConfig};
use futures::stream::{self, StreamExt, TryStreamExt};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const CLASSIFICATION_SAMPLING: SamplingConfig = SamplingConfig::new(10, 0.0, None);

/// Default number of descriptions classified concurrently.
pub const DEFAULT_CLASSIFY_CONCURRENCY: usize = 4;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub enum TransactionCategory {
    Food,
    Fuel,
    #[serde(rename = "EMI")]
    Emi,
    #[serde(rename = "Super Market")]
    SuperMarket,
    #[serde(rename = "IPMS")]
    Ipms,
    Travel,
    #[default]
    Others,
}

impl TransactionCategory {
    pub const ALL: [TransactionCategory; 7] = [
        TransactionCategory::Food,
        TransactionCategory::Fuel,
        TransactionCategory::Emi,
        TransactionCategory::SuperMarket,
        TransactionCategory::Ipms,
        TransactionCategory::Travel,
        TransactionCategory::Others,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TransactionCategory::Food => "Food",
            TransactionCategory::Fuel => "Fuel",
            TransactionCategory::Emi => "EMI",
            TransactionCategory::SuperMarket => "Super Market",
            TransactionCategory::Ipms => "IPMS",
            TransactionCategory::Travel => "Travel",
            TransactionCategory::Others => "Others",
        }
    }

    /// Maps a model reply to a category. Anything unrecognised is `Others`.
    pub fn from_label(raw: &str) -> Self {
        let cleaned = raw.trim().trim_end_matches('.').trim();
        Self::ALL
            .into_iter()
            .find(|category| category.label().eq_ignore_ascii_case(cleaned))
            .unwrap_or(TransactionCategory::Others)
    }
}

impl fmt::Display for TransactionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub struct TransactionClassifier<M> {
    model: M,
    concurrency: usize,
}

impl<M: LanguageModel> TransactionClassifier<M> {
    pub fn new(model: M) -> Self {
        Self {
            model,
            concurrency: DEFAULT_CLASSIFY_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub async fn classify(&self, description: &str) -> Result<TransactionCategory> {
        let messages = [
            ChatMessage::system(CLASSIFICATION_SYSTEM_PROMPT),
            ChatMessage::user(format!("Description: {}", description)),
        ];
        let reply = self
            .model
            .complete(&messages, &CLASSIFICATION_SAMPLING)
            .await?;
        let category = TransactionCategory::from_label(&reply);
        debug!("Classified '{}' as {}", description, category);
        Ok(category)
    }

    /// Classifies descriptions with bounded concurrency, preserving order.
    pub async fn classify_all(&self, descriptions: &[String]) -> Result<Vec<TransactionCategory>> {
        stream::iter(descriptions)
            .map(|description| self.classify(description))
            .buffered(self.concurrency)
            .try_collect()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AssistantError;
    use async_trait::async_trait;

    /// Labels by keyword, the way a well-behaved model would.
    struct KeywordModel;

    #[async_trait]
    impl LanguageModel for KeywordModel {
        async fn complete(
            &self,
            messages: &[ChatMessage],
            sampling: &SamplingConfig,
        ) -> Result<String> {
            assert_eq!(*sampling, CLASSIFICATION_SAMPLING);
            let text = messages[1].content.to_uppercase();
            let label = if text.contains("KFC") {
                "Food"
            } else if text.contains("IRCTC") {
                " Travel.\n"
            } else if text.contains("FAIL") {
                return Err(AssistantError::Generation("boom".to_string()));
            } else {
                "Shopping"
            };
            Ok(label.to_string())
        }
    }

    #[test]
    fn test_from_label() {
        assert_eq!(TransactionCategory::from_label("EMI"), TransactionCategory::Emi);
        assert_eq!(
            TransactionCategory::from_label("super market"),
            TransactionCategory::SuperMarket
        );
        assert_eq!(TransactionCategory::from_label("Other"), TransactionCategory::Others);
        assert_eq!(TransactionCategory::from_label(""), TransactionCategory::Others);
    }

    #[test]
    fn test_serde_uses_labels() {
        assert_eq!(
            serde_json::to_string(&TransactionCategory::SuperMarket).unwrap(),
            "\"Super Market\""
        );
        for category in TransactionCategory::ALL {
            let json = serde_json::to_string(&category).unwrap();
            assert_eq!(json, format!("\"{}\"", category.label()));
        }
    }

    #[tokio::test]
    async fn test_classify_all_keeps_order() {
        let classifier = TransactionClassifier::new(KeywordModel).with_concurrency(2);
        let descriptions = vec![
            "PCA KFC RESTAURANT".to_string(),
            "IRCTC TICKET".to_string(),
            "ONLINE PURCHASE".to_string(),
        ];
        let labels = classifier.classify_all(&descriptions).await.unwrap();
        assert_eq!(
            labels,
            vec![
                TransactionCategory::Food,
                TransactionCategory::Travel,
                TransactionCategory::Others
            ]
        );
    }

    #[tokio::test]
    async fn test_classify_fault_propagates() {
        let classifier = TransactionClassifier::new(KeywordModel);
        assert!(classifier.classify("FAIL").await.is_err());
    }
}
