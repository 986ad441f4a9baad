//! Validation of extracted line items.
//!
//! LLMs fed OCR text fail in systematic ways: dates and invoice numbers come
//! back as item names, identifiers come back as amounts, the same row gets
//! emitted twice. This module rejects those candidates with pattern
//! heuristics and scores what survives.

mod duplicates;
mod reconcile;

pub use duplicates::check_duplicates;
pub use reconcile::{reconcile, ReconcilePolicy};

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::models::{DuplicateSummary, LineItem, QualityReport, RawLineItem};

/// Default quality score below which an extraction is considered unreliable.
pub const DEFAULT_QUALITY_THRESHOLD: f64 = 50.0;

/// Quality-score discount per duplicate group.
const DUPLICATE_PENALTY: f64 = 0.1;

/// Regex patterns for strings that are bill metadata, not product names.
///
/// Checked in order against the lowercased, trimmed name; the first match
/// rejects the item.
static METADATA_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        // ISO dates: 2024-01-15
        (Regex::new(r"^\d{4}-\d{2}-\d{2}").unwrap(), "date"),
        // US dates: 01/15/2024
        (Regex::new(r"^\d{2}/\d{2}/\d{4}").unwrap(), "date"),
        // Loose slash/dash dates: 1-5-24, 15/1/2024
        (Regex::new(r"^\d{1,2}[-/]\d{1,2}[-/]\d{2,4}").unwrap(), "date"),
        // Invoice/reference/bill/id prefixes followed by digits
        (Regex::new(r"^inv[^a-z]*\d+").unwrap(), "invoice number"),
        (Regex::new(r"^ref[^a-z]*\d+").unwrap(), "reference number"),
        (Regex::new(r"^bill[^a-z]*\d+").unwrap(), "bill number"),
        (Regex::new(r"^id[^a-z]*\d+").unwrap(), "identifier"),
        // Times: 14:30
        (Regex::new(r"^\d{2}:\d{2}").unwrap(), "time"),
        // Page markers: "page 2"
        (Regex::new(r"^page\s*\d+").unwrap(), "page marker"),
        // Numeric ranges: "1-5", "1 / 2"
        (Regex::new(r"^\d+\s*[-/]\s*\d+$").unwrap(), "numeric range"),
        // Reference codes: cust-789012
        (Regex::new(r"^[a-z]+-\d{6}").unwrap(), "reference code"),
        // Long bare digit runs (account numbers, ids)
        (Regex::new(r"^\d{10,}$").unwrap(), "identifier"),
    ]
});

/// Digits and punctuation only, no letters at all.
static NO_LETTERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\d\-/:.]+$").unwrap());

/// Check whether a candidate name is bill metadata rather than a product.
///
/// Returns the kind of metadata matched, or None for a plausible name.
pub fn metadata_kind(name: &str) -> Option<&'static str> {
    let lower = name.trim().to_lowercase();
    for (pattern, kind) in METADATA_PATTERNS.iter() {
        if pattern.is_match(&lower) {
            debug!("metadata pattern ({}) matched name: {:?}", kind, name);
            return Some(kind);
        }
    }
    if NO_LETTERS.is_match(name.trim()) {
        debug!("name contains no letters: {:?}", name);
        return Some("bare number");
    }
    None
}

/// Validate a single candidate item.
///
/// Rules run in order; the first failure is the rejection reason. Rule 5
/// (amount approximately equals quantity x rate) is advisory only and never
/// rejects, since discounts and taxes legitimately break exact equality.
pub fn validate_item(item: &RawLineItem) -> Result<LineItem, String> {
    let name = item
        .name
        .as_deref()
        .ok_or_else(|| "missing required field: name".to_string())?;
    let quantity = item
        .quantity
        .ok_or_else(|| "missing required field: quantity".to_string())?;
    let rate = item
        .rate
        .ok_or_else(|| "missing required field: rate".to_string())?;
    let amount = item
        .amount
        .ok_or_else(|| "missing required field: amount".to_string())?;

    let name = name.trim();
    if name.is_empty() {
        return Err("name is empty".to_string());
    }

    if let Some(kind) = metadata_kind(name) {
        return Err(format!(
            "name looks like metadata ({}), not a product: {:?}",
            kind, name
        ));
    }

    if !(quantity.is_finite() && quantity >= 0.0) {
        return Err("quantity must be a non-negative number".to_string());
    }
    if !(rate.is_finite() && rate >= 0.0) {
        return Err("rate must be a non-negative number".to_string());
    }
    if !(amount.is_finite() && amount >= 0.0) {
        return Err("amount must be a non-negative number".to_string());
    }

    Ok(LineItem {
        name: name.to_string(),
        quantity,
        rate,
        amount,
    })
}

/// Check the advisory amount = quantity x rate relation.
///
/// Tolerance is max(0.01, 5% of the computed product).
fn amount_mismatch(item: &LineItem) -> Option<String> {
    let calculated = item.quantity * item.rate;
    let tolerance = f64::max(0.01, calculated * 0.05);
    if (calculated - item.amount).abs() > tolerance {
        Some(format!(
            "amount mismatch for {:?}: {} x {} = {:.2}, but amount = {:.2}",
            item.name, item.quantity, item.rate, calculated, item.amount
        ))
    } else {
        None
    }
}

/// Accepted items plus the aggregate quality findings for one extraction.
#[derive(Debug, Clone, Default)]
pub struct QualityAssessment {
    pub report: QualityReport,
    pub accepted: Vec<LineItem>,
    pub duplicates: DuplicateSummary,
}

/// Validate every candidate and compute the aggregate quality score.
///
/// `quality_score = 100 * (valid / total)`, further discounted by 10% per
/// duplicate group, floored at 0. Zero candidates score 0.
pub fn assess_quality(items: &[RawLineItem]) -> QualityAssessment {
    let mut report = QualityReport {
        total_items: items.len(),
        ..Default::default()
    };
    let mut accepted = Vec::new();

    for (idx, raw) in items.iter().enumerate() {
        match validate_item(raw) {
            Ok(item) => {
                if let Some(issue) = amount_mismatch(&item) {
                    warn!("{}", issue);
                    report.issues.push(format!("item {}: {}", idx + 1, issue));
                }
                report.valid_items += 1;
                accepted.push(item);
            }
            Err(reason) => {
                report.invalid_items += 1;
                report.issues.push(format!("item {}: {}", idx + 1, reason));
            }
        }
    }

    let duplicates = check_duplicates(&accepted);
    if !duplicates.is_empty() {
        report.issues.push(format!(
            "found {} potential duplicate item group(s)",
            duplicates.count
        ));
        report
            .issues
            .extend(duplicates.details.iter().take(3).cloned());
    }

    let mut score = if report.total_items > 0 {
        report.valid_items as f64 / report.total_items as f64
    } else {
        0.0
    };
    score *= 1.0 - duplicates.count as f64 * DUPLICATE_PENALTY;
    report.quality_score = (score.max(0.0) * 100.0 * 100.0).round() / 100.0;

    debug!(
        "quality assessment: {}/{} valid, score {}",
        report.valid_items, report.total_items, report.quality_score
    );

    QualityAssessment {
        report,
        accepted,
        duplicates,
    }
}
