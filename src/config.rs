//! Explicitly constructed configuration.
//!
//! Credentials and connection parameters live in [`AssistantConfig`] and are
//! handed to the generator and executor at construction time.
//! [`AssistantConfig::from_env`] is the only place that reads the process
//! environment.

use crate::error::{AssistantError, Result};
use crate::executor::AccessMode;
use crate::repair::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_DB_PATH: &str = "finq.sqlite3";
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;
pub const DEFAULT_BACKOFF_MS: u64 = 1000;

#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
}

impl LlmConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: default_base_url(),
            model: default_model(),
        }
    }
}

// Keeps the key out of logs.
impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    #[serde(default)]
    pub access: AccessMode,
}

impl DatabaseConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            access: AccessMode::ReadOnly,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepairConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
    #[serde(default)]
    pub retry_policy: RetryPolicy,
}

impl RepairConfig {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_ms: DEFAULT_BACKOFF_MS,
            retry_policy: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    pub llm: LlmConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub repair: RepairConfig,
}

impl AssistantConfig {
    pub fn new(llm: LlmConfig, database: DatabaseConfig) -> Self {
        Self {
            llm,
            database,
            repair: RepairConfig::default(),
        }
    }

    /// Builds a configuration from environment variables.
    ///
    /// Reads `OPENAI_KEY` (falling back to `OPENAI_API_KEY`), `OPENAI_BASE_URL`,
    /// `LLM_MODEL`, `FINQ_DB_PATH`, `FINQ_MAX_ATTEMPTS`, `FINQ_BACKOFF_MS` and
    /// `FINQ_RETRY_POLICY`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("OPENAI_KEY")
            .or_else(|| lookup("OPENAI_API_KEY"))
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                AssistantError::Config("OPENAI_KEY environment variable not set".to_string())
            })?;

        let llm = LlmConfig {
            api_key,
            base_url: lookup("OPENAI_BASE_URL").unwrap_or_else(default_base_url),
            model: lookup("LLM_MODEL").unwrap_or_else(default_model),
        };

        let database = DatabaseConfig::new(
            lookup("FINQ_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
        );

        let mut repair = RepairConfig::default();
        if let Some(raw) = lookup("FINQ_MAX_ATTEMPTS") {
            repair.max_attempts = parse_setting("FINQ_MAX_ATTEMPTS", &raw)?;
            if repair.max_attempts == 0 {
                return Err(AssistantError::Config(
                    "FINQ_MAX_ATTEMPTS must be at least 1".to_string(),
                ));
            }
        }
        if let Some(raw) = lookup("FINQ_BACKOFF_MS") {
            repair.backoff_ms = parse_setting("FINQ_BACKOFF_MS", &raw)?;
        }
        if let Some(raw) = lookup("FINQ_RETRY_POLICY") {
            repair.retry_policy = match raw.trim().to_ascii_lowercase().as_str() {
                "asymmetric" => RetryPolicy::Asymmetric,
                "symmetric" => RetryPolicy::Symmetric,
                _ => {
                    return Err(AssistantError::Config(format!(
                        "FINQ_RETRY_POLICY has invalid value '{}'",
                        raw
                    )))
                }
            };
        }

        Ok(Self {
            llm,
            database,
            repair,
        })
    }
}

fn parse_setting<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| AssistantError::Config(format!("{} has invalid value '{}'", name, raw)))
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_max_attempts() -> usize {
    DEFAULT_MAX_ATTEMPTS
}

fn default_backoff_ms() -> u64 {
    DEFAULT_BACKOFF_MS
}
