//! billextract - bill line-item extraction service.
//!
//! Extracts structured line items (name, quantity, rate, amount) from
//! photographed or scanned bills by chaining OCR text extraction with
//! LLM-based structured extraction, then validating and reconciling the
//! result before returning it over an HTTP API.

pub mod cli;
pub mod config;
pub mod extract;
pub mod llm;
pub mod models;
pub mod ocr;
pub mod pipeline;
pub mod server;
pub mod validate;
