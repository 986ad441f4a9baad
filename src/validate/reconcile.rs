//! Reconciliation of extracted amounts against a claimed bill total.

use tracing::{info, warn};

use crate::models::{LineItem, ReconciliationReport, ReconciliationStatus};

/// Variance thresholds for classifying a reconciliation.
///
/// The default treats variance under 1% as acceptable. The looser
/// convention used by some billing sources is expressed by raising
/// `acceptable_pct` (e.g. to 5.0), not by adding another tier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconcilePolicy {
    /// Absolute variance below which totals are a perfect match.
    pub perfect_variance: f64,
    /// Variance percentage below which totals are acceptable.
    pub acceptable_pct: f64,
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        Self {
            perfect_variance: 0.01,
            acceptable_pct: 1.0,
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Compare the sum of extracted amounts against a claimed bill total.
///
/// Reconciliation is optional enrichment: it runs only when the caller
/// supplies a claimed total, and its result never gates the pipeline.
pub fn reconcile(
    items: &[LineItem],
    claimed_total: f64,
    policy: ReconcilePolicy,
) -> ReconciliationReport {
    let calculated_total = round2(items.iter().map(|i| i.amount).sum());
    let variance = (calculated_total - claimed_total).abs();
    let variance_percentage = if claimed_total > 0.0 {
        variance / claimed_total * 100.0
    } else {
        0.0
    };

    let status = if variance < policy.perfect_variance {
        info!("totals match perfectly");
        ReconciliationStatus::Perfect
    } else if variance_percentage < policy.acceptable_pct {
        info!(
            "totals match within acceptable range (<{}%)",
            policy.acceptable_pct
        );
        ReconciliationStatus::Acceptable
    } else {
        warn!(
            "total variance {:.2} ({:.2}%) needs review",
            variance, variance_percentage
        );
        ReconciliationStatus::NeedsReview
    };

    ReconciliationReport {
        calculated_total,
        claimed_total,
        variance: round2(variance),
        variance_percentage: round2(variance_percentage),
        status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items() -> Vec<LineItem> {
        vec![
            LineItem {
                name: "Medicine A".to_string(),
                quantity: 5.0,
                rate: 50.0,
                amount: 250.0,
            },
            LineItem {
                name: "Medicine B".to_string(),
                quantity: 3.0,
                rate: 100.0,
                amount: 300.0,
            },
        ]
    }

    #[test]
    fn test_perfect_match() {
        let report = reconcile(&items(), 550.0, ReconcilePolicy::default());
        assert_eq!(report.status, ReconciliationStatus::Perfect);
        assert_eq!(report.variance, 0.0);
        assert_eq!(report.calculated_total, 550.0);
    }

    #[test]
    fn test_variance_just_over_one_percent_needs_review() {
        // variance 6.0 / 550.0 = 1.09%, over the <1% threshold.
        let report = reconcile(&items(), 556.0, ReconcilePolicy::default());
        assert_eq!(report.status, ReconciliationStatus::NeedsReview);
        assert_eq!(report.variance, 6.0);
    }

    #[test]
    fn test_variance_under_one_percent_is_acceptable() {
        // variance 5.0 / 555.0 = 0.9%.
        let report = reconcile(&items(), 555.0, ReconcilePolicy::default());
        assert_eq!(report.status, ReconciliationStatus::Acceptable);
    }

    #[test]
    fn test_large_variance_needs_review() {
        let report = reconcile(&items(), 1000.0, ReconcilePolicy::default());
        assert_eq!(report.status, ReconciliationStatus::NeedsReview);
        assert!(report.variance > 0.0);
    }

    #[test]
    fn test_zero_claimed_total() {
        let report = reconcile(&items(), 0.0, ReconcilePolicy::default());
        assert_eq!(report.calculated_total, 550.0);
        assert_eq!(report.variance_percentage, 0.0);
    }

    #[test]
    fn test_loose_policy() {
        let loose = ReconcilePolicy {
            acceptable_pct: 5.0,
            ..ReconcilePolicy::default()
        };
        // 1.09% variance is acceptable under the loose convention.
        let report = reconcile(&items(), 556.0, loose);
        assert_eq!(report.status, ReconciliationStatus::Acceptable);
    }
}
