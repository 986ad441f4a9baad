//! Text acquisition from document images.
//!
//! The pipeline depends on one capability: given a document URL, return
//! best-effort plain text. [`TextSource`] is that capability; the Tesseract
//! subprocess adapter is the default concrete backend, selected by
//! configuration name. An empty string means "no extractable text" and is
//! not an error.

mod fetch;
mod tesseract;

pub use fetch::clean_text;
pub use tesseract::TesseractTextSource;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while acquiring text from a document.
///
/// Each variant is terminal for the request; acquisition is not retried.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("failed to fetch document: {0}")]
    Fetch(String),

    #[error("failed to decode document image: {0}")]
    Decode(String),

    #[error("OCR backend not available: {0}")]
    BackendNotAvailable(String),

    #[error("OCR failed: {0}")]
    OcrFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration for the text-acquisition capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextSourceConfig {
    /// Backend adapter to use.
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Override path to the tesseract binary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tesseract_cmd: Option<String>,
    /// OCR language.
    #[serde(default = "default_language")]
    pub language: String,
    /// Images with a dimension beyond this are downscaled before OCR.
    #[serde(default = "default_max_dimension")]
    pub max_dimension: u32,
    /// Timeout for fetching document bytes, in seconds.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

fn default_backend() -> String {
    "tesseract".to_string()
}
fn default_language() -> String {
    "eng".to_string()
}
fn default_max_dimension() -> u32 {
    4000
}
fn default_fetch_timeout_secs() -> u64 {
    30
}

impl Default for TextSourceConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            tesseract_cmd: None,
            language: default_language(),
            max_dimension: default_max_dimension(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

/// Capability: resolve a document URL to plain text.
#[async_trait]
pub trait TextSource: Send + Sync {
    /// Fetch, decode, and OCR the document at `document_url`.
    ///
    /// Returns normalized text. An empty string signals "no extractable
    /// text" and must be branched on by the caller, not treated as failure.
    async fn extract(&self, document_url: &str) -> Result<String, OcrError>;
}

/// Build the configured text source.
pub fn create_text_source(config: &TextSourceConfig) -> anyhow::Result<Arc<dyn TextSource>> {
    match config.backend.as_str() {
        "tesseract" => Ok(Arc::new(TesseractTextSource::new(config.clone())?)),
        other => anyhow::bail!("unknown OCR backend: {}", other),
    }
}
