//! Configuration management for the extraction service.
//!
//! Settings come from environment variables (a `.env` file is loaded at
//! startup). Anything unset falls back to the documented default; the only
//! hard requirement is an API key for the completion provider.

use std::str::FromStr;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::llm::CompletionConfig;
use crate::ocr::TextSourceConfig;
use crate::validate::{ReconcilePolicy, DEFAULT_QUALITY_THRESHOLD};

/// Application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Text-acquisition (OCR) configuration.
    pub ocr: TextSourceConfig,
    /// Completion-capability configuration.
    pub completion: CompletionConfig,
    /// Quality score below which an extraction is rejected.
    pub quality_threshold: f64,
    /// Variance percentage below which reconciliation is acceptable.
    pub reconcile_acceptable_pct: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ocr: TextSourceConfig::default(),
            completion: CompletionConfig::default(),
            quality_threshold: DEFAULT_QUALITY_THRESHOLD,
            reconcile_acceptable_pct: ReconcilePolicy::default().acceptable_pct,
        }
    }
}

/// Read an env var, parsing into T, keeping `default` when unset.
fn env_or<T: FromStr>(key: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("invalid value for {}", key)),
        Err(_) => Ok(default),
    }
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

impl Settings {
    /// Load settings from the environment.
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let ocr = TextSourceConfig {
            backend: env_or("OCR_BACKEND", defaults.ocr.backend)?,
            tesseract_cmd: env_opt("TESSERACT_CMD"),
            language: env_or("OCR_LANGUAGE", defaults.ocr.language)?,
            max_dimension: env_or("OCR_MAX_DIMENSION", defaults.ocr.max_dimension)?,
            fetch_timeout_secs: env_or("FETCH_TIMEOUT_SECS", defaults.ocr.fetch_timeout_secs)?,
        };

        let completion = CompletionConfig {
            provider: env_or("LLM_PROVIDER", defaults.completion.provider)?,
            endpoint: env_or("LLM_ENDPOINT", defaults.completion.endpoint)?,
            api_key: env_opt("LLM_API_KEY").or_else(|| env_opt("GROQ_API_KEY")),
            model: env_or("LLM_MODEL", defaults.completion.model)?,
            max_tokens: env_or("LLM_MAX_TOKENS", defaults.completion.max_tokens)?,
            temperature: env_or("LLM_TEMPERATURE", defaults.completion.temperature)?,
            timeout_secs: env_or("LLM_TIMEOUT_SECS", defaults.completion.timeout_secs)?,
            max_prompt_chars: env_or("MAX_OCR_CHARS", defaults.completion.max_prompt_chars)?,
        };

        Ok(Self {
            ocr,
            completion,
            quality_threshold: env_or("QUALITY_THRESHOLD", defaults.quality_threshold)?,
            reconcile_acceptable_pct: env_or(
                "RECONCILE_ACCEPTABLE_PCT",
                defaults.reconcile_acceptable_pct,
            )?,
        })
    }

    /// Validate settings at startup.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.completion.api_key.is_none() {
            anyhow::bail!("LLM_API_KEY not set; add it to .env or the environment");
        }
        if !(0.0..=100.0).contains(&self.quality_threshold) {
            anyhow::bail!("QUALITY_THRESHOLD must be between 0 and 100");
        }
        Ok(())
    }

    /// Reconciliation policy from the configured threshold.
    pub fn reconcile_policy(&self) -> ReconcilePolicy {
        ReconcilePolicy {
            acceptable_pct: self.reconcile_acceptable_pct,
            ..ReconcilePolicy::default()
        }
    }

    /// Settings summary for startup logging, without secrets.
    pub fn summary(&self) -> String {
        format!(
            "ocr={} model={} quality_threshold={} api_key_set={}",
            self.ocr.backend,
            self.completion.model,
            self.quality_threshold,
            self.completion.api_key.is_some()
        )
    }
}
