//! Structured extraction: turn OCR text into candidate line items.
//!
//! One extraction attempt per page, with bounded transport retries and at
//! most one repair attempt when the completion parses to zero items.
//! Failure here always degrades to an empty outcome; it never aborts the
//! pipeline.

pub mod parse;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::llm::{prompts, Completion, CompletionClient, CompletionConfig};
use crate::models::{ExtractionOutcome, TokenUsage};

/// Transport attempts per completion call (first try plus retries).
const MAX_TRANSPORT_ATTEMPTS: u32 = 3;

/// Initial backoff delay, doubled after each failed attempt.
const INITIAL_BACKOFF: Duration = Duration::from_millis(500);

/// Drives the structured-extraction step of the pipeline.
pub struct StructuredExtractor {
    client: Arc<dyn CompletionClient>,
    config: CompletionConfig,
    initial_backoff: Duration,
}

impl StructuredExtractor {
    pub fn new(client: Arc<dyn CompletionClient>, config: CompletionConfig) -> Self {
        Self {
            client,
            config,
            initial_backoff: INITIAL_BACKOFF,
        }
    }

    /// Override the initial backoff delay (tests use a tiny one).
    pub fn with_initial_backoff(mut self, delay: Duration) -> Self {
        self.initial_backoff = delay;
        self
    }

    /// Extract candidate line items from one page's OCR text.
    ///
    /// Token counts from every completion call made here, including the
    /// repair attempt, are recorded into `usage` as soon as transport
    /// succeeds, even if parsing subsequently fails.
    pub async fn extract_items(
        &self,
        text: &str,
        page_label: &str,
        usage: &mut TokenUsage,
    ) -> ExtractionOutcome {
        let prompt =
            prompts::build_extraction_prompt(text, page_label, self.config.max_prompt_chars);

        let Some(completion) = self.call_with_retry(&prompt).await else {
            return ExtractionOutcome::default();
        };
        usage.record(completion.input_tokens, completion.output_tokens);

        let outcome = parse::parse_completion(&completion.text);
        if !outcome.is_empty() {
            info!("extracted {} candidate items", outcome.items.len());
            return outcome;
        }

        warn!("no items parsed from completion, issuing repair attempt");
        let repair_prompt =
            prompts::build_repair_prompt(text, &completion.text, self.config.max_prompt_chars);

        let Some(repair) = self.call_with_retry(&repair_prompt).await else {
            return outcome;
        };
        usage.record(repair.input_tokens, repair.output_tokens);

        let repaired = parse::parse_completion(&repair.text);
        if repaired.is_empty() {
            warn!("repair attempt also yielded zero items");
            return outcome;
        }
        info!("repair attempt recovered {} items", repaired.items.len());
        repaired
    }

    /// Call the completion capability, retrying transport-shaped failures
    /// with exponential backoff. Exhaustion returns None.
    async fn call_with_retry(&self, user_prompt: &str) -> Option<Completion> {
        let mut delay = self.initial_backoff;
        for attempt in 1..=MAX_TRANSPORT_ATTEMPTS {
            match self
                .client
                .complete(prompts::SYSTEM_PROMPT, user_prompt)
                .await
            {
                Ok(completion) => {
                    debug!("completion succeeded on attempt {}", attempt);
                    return Some(completion);
                }
                Err(e) if e.is_retryable() && attempt < MAX_TRANSPORT_ATTEMPTS => {
                    warn!(
                        "completion attempt {} failed ({}), retrying in {:?}",
                        attempt, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                Err(e) => {
                    error!("completion call failed: {}", e);
                    return None;
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::llm::CompletionError;

    /// Scripted completion client: returns queued responses in order.
    struct ScriptedClient {
        script: Mutex<Vec<Result<Completion, CompletionError>>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedClient {
        fn new(script: Vec<Result<Completion, CompletionError>>) -> Self {
            Self {
                script: Mutex::new(script),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedClient {
        async fn complete(
            &self,
            _system_prompt: &str,
            user_prompt: &str,
        ) -> Result<Completion, CompletionError> {
            self.calls.lock().unwrap().push(user_prompt.to_string());
            let mut script = self.script.lock().unwrap();
            if script.is_empty() {
                return Err(CompletionError::Connection("script exhausted".into()));
            }
            script.remove(0)
        }
    }

    fn completion(text: &str, input: u64, output: u64) -> Completion {
        Completion {
            text: text.to_string(),
            input_tokens: input,
            output_tokens: output,
        }
    }

    const GOOD: &str = r#"{"page_type": "Bill Detail", "line_items": [
        {"item_name": "Aspirin", "item_quantity": 2, "item_rate": 50, "item_amount": 100}
    ]}"#;

    fn extractor(client: Arc<ScriptedClient>) -> StructuredExtractor {
        StructuredExtractor::new(client, CompletionConfig::default())
            .with_initial_backoff(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_successful_extraction_records_tokens() {
        let client = Arc::new(ScriptedClient::new(vec![Ok(completion(GOOD, 100, 40))]));
        let mut usage = TokenUsage::new();

        let outcome = extractor(client.clone())
            .extract_items("bill text", "1", &mut usage)
            .await;

        assert_eq!(outcome.items.len(), 1);
        assert_eq!(usage.total_tokens, 140);
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_zero_items_triggers_exactly_one_repair() {
        let client = Arc::new(ScriptedClient::new(vec![
            Ok(completion("no json here", 80, 10)),
            Ok(completion(GOOD, 120, 40)),
        ]));
        let mut usage = TokenUsage::new();

        let outcome = extractor(client.clone())
            .extract_items("bill text", "1", &mut usage)
            .await;

        assert_eq!(outcome.items.len(), 1);
        assert_eq!(client.call_count(), 2);
        // Tokens from both the failed attempt and the repair accumulate.
        assert_eq!(usage.input_tokens, 200);
        assert_eq!(usage.output_tokens, 50);
    }

    #[tokio::test]
    async fn test_repair_failure_degrades_to_empty() {
        let client = Arc::new(ScriptedClient::new(vec![
            Ok(completion("garbage", 80, 10)),
            Ok(completion("still garbage", 90, 10)),
        ]));
        let mut usage = TokenUsage::new();

        let outcome = extractor(client.clone())
            .extract_items("bill text", "1", &mut usage)
            .await;

        assert!(outcome.is_empty());
        // No second repair: exactly two calls.
        assert_eq!(client.call_count(), 2);
        assert_eq!(usage.total_tokens, 190);
    }

    #[tokio::test]
    async fn test_transport_retry_then_success() {
        let client = Arc::new(ScriptedClient::new(vec![
            Err(CompletionError::RateLimited("429".into())),
            Ok(completion(GOOD, 100, 40)),
        ]));
        let mut usage = TokenUsage::new();

        let outcome = extractor(client.clone())
            .extract_items("bill text", "1", &mut usage)
            .await;

        assert_eq!(outcome.items.len(), 1);
        assert_eq!(client.call_count(), 2);
    }

    #[tokio::test]
    async fn test_transport_exhaustion_yields_empty_with_zero_tokens() {
        let client = Arc::new(ScriptedClient::new(vec![
            Err(CompletionError::Connection("down".into())),
            Err(CompletionError::Connection("down".into())),
            Err(CompletionError::Connection("down".into())),
        ]));
        let mut usage = TokenUsage::new();

        let outcome = extractor(client.clone())
            .extract_items("bill text", "1", &mut usage)
            .await;

        assert!(outcome.is_empty());
        assert_eq!(usage.total_tokens, 0);
        assert_eq!(client.call_count(), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_error_fails_fast() {
        let client = Arc::new(ScriptedClient::new(vec![Err(CompletionError::Api {
            status: 401,
            message: "bad key".into(),
        })]));
        let mut usage = TokenUsage::new();

        let outcome = extractor(client.clone())
            .extract_items("bill text", "1", &mut usage)
            .await;

        assert!(outcome.is_empty());
        assert_eq!(client.call_count(), 1);
    }
}
