use garde::Validate;
use serde::Deserialize;
use std::time::Duration;

use crate::models::tag::{InvalidAlphabet, TagAlphabet, DEFAULT_TAG_ALPHABET};

/// Settings for the queue worker, read from the environment (or `.env`).
#[derive(Debug, Deserialize, Validate)]
pub struct WorkerConfig {
    /// Base URL of the bot backend serving `/api/queue/*`
    #[garde(length(min = 1))]
    pub remote_api_url: String,

    /// Bearer token for the queue API
    #[garde(length(min = 1))]
    pub queue_api_secret: String,

    /// OpenAI-compatible chat completions URL (e.g. LM Studio)
    #[garde(length(min = 1))]
    pub lm_studio_endpoint: String,

    /// Model name sent with each vision request
    #[serde(default = "default_vision_model")]
    #[garde(length(min = 1))]
    pub vision_model: String,

    #[serde(default = "default_vision_max_tokens")]
    #[garde(range(min = 1))]
    pub vision_max_tokens: u32,

    /// Whole-request budget for one vision call
    #[serde(default = "default_vision_timeout_secs")]
    #[garde(range(min = 1))]
    pub vision_timeout_secs: u64,

    /// Whole-request budget for one image download
    #[serde(default = "default_image_timeout_secs")]
    #[garde(range(min = 1))]
    pub image_timeout_secs: u64,

    /// Characters a player tag may use after the `#`
    #[serde(default = "default_tag_alphabet")]
    #[garde(length(min = 1))]
    pub tag_alphabet: String,

    /// Where to write the Prometheus text snapshot after a run, if anywhere
    #[serde(default)]
    #[garde(skip)]
    pub metrics_file: Option<String>,
}

fn default_vision_model() -> String {
    "vision-model".to_string()
}

fn default_vision_max_tokens() -> u32 {
    100
}

fn default_vision_timeout_secs() -> u64 {
    120
}

fn default_image_timeout_secs() -> u64 {
    30
}

fn default_tag_alphabet() -> String {
    DEFAULT_TAG_ALPHABET.to_string()
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    /// Build from explicit `(NAME, value)` pairs.
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config: Self = envy::from_iter(vars)?;
        config.validate()?;
        config.alphabet()?;
        Ok(config)
    }

    pub fn alphabet(&self) -> Result<TagAlphabet, ConfigError> {
        Ok(self.tag_alphabet.parse()?)
    }

    pub fn vision_timeout(&self) -> Duration {
        Duration::from_secs(self.vision_timeout_secs)
    }

    pub fn image_timeout(&self) -> Duration {
        Duration::from_secs(self.image_timeout_secs)
    }
}

/// Settings for the Gemini bridge.
#[derive(Debug, Deserialize, Validate)]
pub struct BridgeConfig {
    /// OpenAI-compatible chat completions URL (e.g. LM Studio)
    #[garde(length(min = 1))]
    pub lm_studio_endpoint: String,

    #[serde(default = "default_bridge_timeout_secs")]
    #[garde(range(min = 1))]
    pub bridge_timeout_secs: u64,
}

fn default_bridge_timeout_secs() -> u64 {
    60
}

impl BridgeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let config: Self = envy::from_env()?;
        config.validate()?;
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.bridge_timeout_secs)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read environment: {0}")]
    Env(#[from] envy::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] garde::Report),

    #[error("Invalid TAG_ALPHABET: {0}")]
    Alphabet(#[from] InvalidAlphabet),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    const REQUIRED: &[(&str, &str)] = &[
        ("REMOTE_API_URL", "https://bot.example"),
        ("QUEUE_API_SECRET", "s3cret"),
        ("LM_STUDIO_ENDPOINT", "http://localhost:1234/v1/chat/completions"),
    ];

    #[test]
    fn test_defaults() {
        let config = WorkerConfig::from_vars(vars(REQUIRED)).unwrap();
        assert_eq!(config.vision_model, "vision-model");
        assert_eq!(config.vision_max_tokens, 100);
        assert_eq!(config.vision_timeout(), Duration::from_secs(120));
        assert_eq!(config.image_timeout(), Duration::from_secs(30));
        assert_eq!(config.alphabet().unwrap(), TagAlphabet::default());
        assert!(config.metrics_file.is_none());
    }

    #[test]
    fn test_metrics_file() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("METRICS_FILE", "/var/lib/node_exporter/tag_worker.prom"));
        let config = WorkerConfig::from_vars(vars(&pairs)).unwrap();
        assert_eq!(
            config.metrics_file.as_deref(),
            Some("/var/lib/node_exporter/tag_worker.prom")
        );
    }

    #[test]
    fn test_missing_endpoint() {
        let err = WorkerConfig::from_vars(vars(&REQUIRED[..2])).unwrap_err();
        assert!(matches!(err, ConfigError::Env(_)));
    }

    #[test]
    fn test_empty_secret_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs[1] = ("QUEUE_API_SECRET", "");
        let err = WorkerConfig::from_vars(vars(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_custom_alphabet() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("TAG_ALPHABET", "0289PYLQGRJCUVOA"));
        let config = WorkerConfig::from_vars(vars(&pairs)).unwrap();
        assert!(config.alphabet().unwrap().contains('A'));

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("TAG_ALPHABET", "abc"));
        let err = WorkerConfig::from_vars(vars(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Alphabet(InvalidAlphabet::Character('a'))));
    }
}
