//! Derived quality, duplicate, and reconciliation reports.

use serde::{Deserialize, Serialize};

/// Aggregate quality assessment of one extraction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QualityReport {
    pub total_items: usize,
    pub valid_items: usize,
    pub invalid_items: usize,
    /// Human-readable descriptions of every problem found.
    pub issues: Vec<String>,
    /// 0-100. Fraction of items passing validation, discounted for
    /// duplicate groups.
    pub quality_score: f64,
}

/// Duplicate line items found within one extraction.
#[derive(Debug, Clone, Default)]
pub struct DuplicateSummary {
    /// Number of distinct keys seen more than once, not the number of
    /// extra occurrences.
    pub count: usize,
    pub details: Vec<String>,
}

impl DuplicateSummary {
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// How closely the extracted amounts match a claimed bill total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationStatus {
    Perfect,
    Acceptable,
    NeedsReview,
}

impl ReconciliationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Perfect => "perfect",
            Self::Acceptable => "acceptable",
            Self::NeedsReview => "needs_review",
        }
    }
}

/// Result of comparing extracted amounts against a claimed total.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub calculated_total: f64,
    pub claimed_total: f64,
    pub variance: f64,
    pub variance_percentage: f64,
    pub status: ReconciliationStatus,
}
