//! Duplicate line-item detection.
//!
//! Extraction sometimes emits the same row twice, either because the bill
//! repeats a table header region or because the model echoes an item.
//! Duplicates are reported and discounted from the quality score, but kept
//! in the response; the caller decides what to do with them.

use std::collections::HashMap;

use tracing::warn;

use crate::models::{DuplicateSummary, LineItem};

/// Round to two decimals and convert to an integer key component.
fn cents(value: f64) -> i64 {
    (value * 100.0).round() as i64
}

/// Find exact or near-exact repeats within the extracted set.
///
/// Items are keyed by (lowercased trimmed name, amount at two decimals,
/// quantity at two decimals). The count is the number of distinct keys with
/// more than one occurrence.
pub fn check_duplicates(items: &[LineItem]) -> DuplicateSummary {
    let mut seen: HashMap<(String, i64, i64), usize> = HashMap::new();
    let mut details = Vec::new();

    for item in items {
        let key = (
            item.name.trim().to_lowercase(),
            cents(item.amount),
            cents(item.quantity),
        );
        let occurrences = seen.entry(key).or_insert(0);
        *occurrences += 1;
        if *occurrences > 1 {
            let detail = format!(
                "item: {} | amount: {} | qty: {}",
                item.name, item.amount, item.quantity
            );
            warn!("potential duplicate found: {}", detail);
            details.push(detail);
        }
    }

    let count = seen.values().filter(|&&n| n > 1).count();
    DuplicateSummary { count, details }
}
