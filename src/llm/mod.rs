//! Text-completion capability for structured extraction.
//!
//! The pipeline depends on a capability shape, not a vendor: given a prompt,
//! return a completion with token accounting. Concrete providers implement
//! [`CompletionClient`] and are selected by configuration name; pipeline
//! code never branches on a provider.

mod groq;
pub mod prompts;

pub use groq::GroqClient;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration for the completion capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Provider adapter to use ("groq" or any OpenAI-compatible endpoint).
    #[serde(default = "default_provider")]
    pub provider: String,
    /// API endpoint base URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// API key, required by hosted providers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,
    /// Output-length cap for completion calls.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Sampling temperature. Extraction runs at 0.0 for reproducibility.
    #[serde(default)]
    pub temperature: f32,
    /// Per-call timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Maximum characters of OCR text embedded in a prompt.
    #[serde(default = "default_max_prompt_chars")]
    pub max_prompt_chars: usize,
}

fn default_provider() -> String {
    "groq".to_string()
}
fn default_endpoint() -> String {
    "https://api.groq.com/openai/v1".to_string()
}
fn default_model() -> String {
    "llama-3.1-8b-instant".to_string()
}
fn default_max_tokens() -> u32 {
    2000
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_max_prompt_chars() -> usize {
    8000
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            endpoint: default_endpoint(),
            api_key: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: 0.0,
            timeout_secs: default_timeout_secs(),
            max_prompt_chars: default_max_prompt_chars(),
        }
    }
}

/// One completion call's result.
#[derive(Debug, Clone, Default)]
pub struct Completion {
    /// Raw completion text.
    pub text: String,
    /// Prompt tokens the provider reported consuming.
    pub input_tokens: u64,
    /// Completion tokens the provider reported producing.
    pub output_tokens: u64,
}

/// Errors from the completion capability.
///
/// Transport-shaped failures are retryable with backoff; everything else is
/// terminal for the call.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("api error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("response parse error: {0}")]
    Parse(String),
}

impl CompletionError {
    /// Whether the caller should retry with backoff.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection(_) | Self::RateLimited(_) => true,
            Self::Api { status, .. } => *status >= 500,
            Self::Parse(_) => false,
        }
    }
}

/// Capability: given a prompt, return a text completion with token counts.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<Completion, CompletionError>;
}

/// Build the configured completion client.
///
/// Every supported provider speaks the OpenAI-compatible chat API, so they
/// share one adapter pointed at different endpoints.
pub fn create_completion_client(
    config: &CompletionConfig,
) -> anyhow::Result<Arc<dyn CompletionClient>> {
    match config.provider.as_str() {
        "groq" | "openai" | "together" => Ok(Arc::new(GroqClient::new(config.clone())?)),
        other => anyhow::bail!("unknown completion provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(CompletionError::Connection("timeout".into()).is_retryable());
        assert!(CompletionError::RateLimited("429".into()).is_retryable());
        assert!(CompletionError::Api {
            status: 503,
            message: "unavailable".into()
        }
        .is_retryable());
        assert!(!CompletionError::Api {
            status: 401,
            message: "bad key".into()
        }
        .is_retryable());
        assert!(!CompletionError::Parse("bad json".into()).is_retryable());
    }

    #[test]
    fn test_default_config() {
        let config = CompletionConfig::default();
        assert_eq!(config.provider, "groq");
        assert_eq!(config.temperature, 0.0);
        assert!(config.endpoint.contains("groq"));
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let config = CompletionConfig {
            provider: "carrier-pigeon".to_string(),
            ..Default::default()
        };
        assert!(create_completion_client(&config).is_err());
    }
}
