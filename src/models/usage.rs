//! Per-request token accounting.

use serde::{Deserialize, Serialize};

/// Running token counters for one pipeline run.
///
/// Constructed fresh at the start of each run and accumulated additively
/// across every completion call made during that run, including repair
/// retries. Never shared across requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completion call's reported token counts.
    pub fn record(&mut self, input_tokens: u64, output_tokens: u64) {
        self.input_tokens += input_tokens;
        self.output_tokens += output_tokens;
        self.total_tokens += input_tokens + output_tokens;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_accumulates() {
        let mut usage = TokenUsage::new();
        usage.record(100, 30);
        usage.record(50, 20);
        assert_eq!(usage.input_tokens, 150);
        assert_eq!(usage.output_tokens, 50);
        assert_eq!(usage.total_tokens, 200);
    }

    #[test]
    fn test_new_is_zeroed() {
        let usage = TokenUsage::new();
        assert_eq!(usage.total_tokens, 0);
    }
}
