//! Pipeline orchestration: one request, one strictly-ordered run.
//!
//! OCR must complete before extraction, extraction before validation,
//! validation before reconciliation and assembly. All per-request state
//! (token counters, duplicate tracking) is constructed inside `process` and
//! discarded with the run; the processor itself holds only read-only
//! configuration and stateless clients, so it is safe to share across
//! concurrent requests.

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::extract::StructuredExtractor;
use crate::llm::{CompletionClient, CompletionConfig};
use crate::models::{
    DuplicateSummary, LineItem, PageType, QualityReport, ReconciliationReport, TokenUsage,
};
use crate::ocr::TextSource;
use crate::validate::{self, ReconcilePolicy, DEFAULT_QUALITY_THRESHOLD};

/// Longest accepted document URL.
const MAX_DOCUMENT_URL_LEN: usize = 2000;

/// Failures a pipeline run can surface to the caller.
///
/// Messages are short and human-readable; provider and transport details
/// stay in the logs.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Malformed request input.
    #[error("{0}")]
    InvalidRequest(String),

    /// Document unreachable, undecodable, or without extractable text.
    #[error("{0}")]
    Acquisition(String),

    /// Structured extraction yielded zero items even after the repair
    /// attempt.
    #[error("no bill line items found in the document")]
    NoLineItems,

    /// Items were extracted but the result is too unreliable to return.
    #[error("extraction quality below threshold (score: {score}%)")]
    QualityBelowThreshold { score: f64 },

    /// Anything that must never reach the caller verbatim. The display
    /// string is generic; the detail is for logging.
    #[error("internal server error during document processing")]
    Internal(String),
}

/// Validated line items for one page of a bill.
#[derive(Debug, Clone)]
pub struct ExtractedPage {
    pub page_no: String,
    pub page_type: PageType,
    pub items: Vec<LineItem>,
}

/// Everything one successful pipeline run produced.
#[derive(Debug, Clone)]
pub struct BillExtraction {
    pub pages: Vec<ExtractedPage>,
    pub usage: TokenUsage,
    pub quality: QualityReport,
    pub duplicates: DuplicateSummary,
    pub reconciliation: Option<ReconciliationReport>,
    pub total_item_count: usize,
}

/// Validate the document reference from the request.
fn validate_document_url(url: &str) -> Result<(), PipelineError> {
    if url.trim().is_empty() {
        return Err(PipelineError::InvalidRequest(
            "document URL is required".to_string(),
        ));
    }
    if url.len() > MAX_DOCUMENT_URL_LEN {
        return Err(PipelineError::InvalidRequest(format!(
            "document URL is too long (max {} characters)",
            MAX_DOCUMENT_URL_LEN
        )));
    }
    let parsed = Url::parse(url).map_err(|_| {
        PipelineError::InvalidRequest("document URL is not a valid URL".to_string())
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(PipelineError::InvalidRequest(
            "document URL must start with http:// or https://".to_string(),
        ));
    }
    Ok(())
}

/// Runs the extraction pipeline for bill documents.
pub struct BillProcessor {
    text_source: Arc<dyn TextSource>,
    extractor: StructuredExtractor,
    quality_threshold: f64,
    reconcile_policy: ReconcilePolicy,
}

impl BillProcessor {
    pub fn new(
        text_source: Arc<dyn TextSource>,
        client: Arc<dyn CompletionClient>,
        completion: CompletionConfig,
    ) -> Self {
        Self {
            text_source,
            extractor: StructuredExtractor::new(client, completion),
            quality_threshold: DEFAULT_QUALITY_THRESHOLD,
            reconcile_policy: ReconcilePolicy::default(),
        }
    }

    /// Set the quality score below which results are rejected.
    pub fn with_quality_threshold(mut self, threshold: f64) -> Self {
        self.quality_threshold = threshold;
        self
    }

    /// Set the reconciliation variance policy.
    pub fn with_reconcile_policy(mut self, policy: ReconcilePolicy) -> Self {
        self.reconcile_policy = policy;
        self
    }

    /// Process one document through the full pipeline.
    ///
    /// `claimed_total`, when supplied, enables reconciliation as optional
    /// enrichment; its absence skips that stage entirely.
    pub async fn process(
        &self,
        document_url: &str,
        claimed_total: Option<f64>,
    ) -> Result<BillExtraction, PipelineError> {
        let started = Instant::now();
        validate_document_url(document_url)?;

        // Step A: acquire text.
        let text = self
            .text_source
            .extract(document_url)
            .await
            .map_err(|e| {
                warn!("text acquisition failed: {}", e);
                PipelineError::Acquisition(
                    "failed to extract text from document; ensure the document is accessible \
                     and contains readable text"
                        .to_string(),
                )
            })?;

        if text.trim().is_empty() {
            return Err(PipelineError::Acquisition(
                "no readable text found in the document".to_string(),
            ));
        }
        info!("OCR text acquired, {} chars", text.len());

        // Step B: structured extraction, with per-run token accounting.
        let mut usage = TokenUsage::new();
        let outcome = self.extractor.extract_items(&text, "1", &mut usage).await;

        if outcome.items.is_empty() {
            return Err(PipelineError::NoLineItems);
        }
        info!("extraction produced {} candidate items", outcome.items.len());

        // Step C: validation and quality gate.
        let assessment = validate::assess_quality(&outcome.items);
        if assessment.report.quality_score < self.quality_threshold {
            warn!(
                "extraction quality too low: {}%",
                assessment.report.quality_score
            );
            return Err(PipelineError::QualityBelowThreshold {
                score: assessment.report.quality_score,
            });
        }
        if !assessment.duplicates.is_empty() {
            warn!(
                "found {} potential duplicate item group(s)",
                assessment.duplicates.count
            );
        }

        // Step D: optional reconciliation against a claimed total.
        let reconciliation = claimed_total.map(|total| {
            validate::reconcile(&assessment.accepted, total, self.reconcile_policy)
        });

        let page_type = outcome
            .page_type
            .unwrap_or_else(|| PageType::detect(&text));

        let total_item_count = assessment.accepted.len();
        let page = ExtractedPage {
            page_no: "1".to_string(),
            page_type,
            items: assessment.accepted.clone(),
        };

        info!(
            "processed document in {:.2}s: {} items, {} tokens",
            started.elapsed().as_secs_f64(),
            total_item_count,
            usage.total_tokens
        );

        Ok(BillExtraction {
            pages: vec![page],
            usage,
            quality: assessment.report,
            duplicates: assessment.duplicates,
            reconciliation,
            total_item_count,
        })
    }
}
