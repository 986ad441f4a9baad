//! Result of one structured-extraction attempt.

use super::{PageType, RawLineItem};

/// What a structured-extraction attempt yielded, before validation.
///
/// Transient: exists only during one pipeline run. An empty outcome is a
/// valid, non-erroring result.
#[derive(Debug, Clone, Default)]
pub struct ExtractionOutcome {
    /// Page classification reported by the completion, if recognized.
    pub page_type: Option<PageType>,
    /// Candidate line items, possibly empty, possibly containing invalid
    /// entries.
    pub items: Vec<RawLineItem>,
    /// Free-text notes the completion attached, if any.
    pub notes: Option<String>,
}

impl ExtractionOutcome {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
