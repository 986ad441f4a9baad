//! Resilient parsing of completion output.
//!
//! Models wrap answers in markdown fences, echo the prompt before the
//! answer, and emit numbers as currency strings. This stage absorbs all of
//! that with a defined fallback: anything unparseable becomes zero items,
//! never an error.

use serde_json::Value;
use tracing::debug;

use crate::models::{ExtractionOutcome, PageType, RawLineItem};

/// Strip a surrounding markdown code fence, if present.
///
/// Handles a leading fence tag (with or without a language) and a trailing
/// fence, in either order of discovery.
fn strip_code_fences(text: &str) -> &str {
    let mut text = text.trim();
    if let Some(rest) = text.strip_prefix("```") {
        // Drop the language tag up to the first newline.
        text = match rest.find('\n') {
            Some(idx) => &rest[idx + 1..],
            None => rest,
        };
    }
    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// Find the last complete `{...}` span in the text.
///
/// The scan is string- and escape-aware so braces inside JSON strings do not
/// confuse the depth tracking. Models sometimes echo the prompt (which
/// contains example objects) before the answer, so the LAST complete span is
/// the one we want.
fn last_json_object(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let mut spans: Vec<(usize, usize)> = Vec::new();
    let mut start = None;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            b'}' => {
                if depth > 0 {
                    depth -= 1;
                    if depth == 0 {
                        if let Some(s) = start.take() {
                            spans.push((s, i + 1));
                        }
                    }
                }
            }
            _ => {}
        }
    }

    spans.last().map(|&(s, e)| &text[s..e])
}

/// Coerce a JSON value to a number.
///
/// Currency symbols, thousands separators, and surrounding whitespace are
/// strippable noise. A value that cannot be coerced is absent, not zero.
pub fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => {
            let cleaned: String = s
                .trim()
                .chars()
                .filter(|c| !matches!(c, '₹' | '$' | '€' | '£' | ',' | ' '))
                .collect();
            if cleaned.is_empty() {
                return None;
            }
            cleaned.parse::<f64>().ok().filter(|f| f.is_finite())
        }
        _ => None,
    }
}

fn coerce_name(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        // The model occasionally emits a bare number where a name belongs;
        // keep its string form so the validator can reject it with a reason.
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_item(value: &Value) -> RawLineItem {
    RawLineItem {
        name: coerce_name(value.get("item_name")),
        quantity: value.get("item_quantity").and_then(coerce_number),
        rate: value.get("item_rate").and_then(coerce_number),
        amount: value.get("item_amount").and_then(coerce_number),
    }
}

/// Parse completion text into an extraction outcome.
///
/// Returns an empty outcome on any parse failure.
pub fn parse_completion(text: &str) -> ExtractionOutcome {
    let cleaned = strip_code_fences(text);
    if cleaned.is_empty() {
        return ExtractionOutcome::default();
    }

    let Some(json_span) = last_json_object(cleaned) else {
        debug!("no JSON object found in completion");
        return ExtractionOutcome::default();
    };

    let parsed: Value = match serde_json::from_str(json_span) {
        Ok(v) => v,
        Err(e) => {
            debug!("completion JSON failed to parse: {}", e);
            return ExtractionOutcome::default();
        }
    };

    let items = parsed
        .get("line_items")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter(|v| v.is_object()).map(parse_item).collect())
        .unwrap_or_default();

    let page_type = parsed
        .get("page_type")
        .and_then(Value::as_str)
        .and_then(PageType::from_tag);

    let notes = parsed
        .get("extraction_notes")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from);

    ExtractionOutcome {
        page_type,
        items,
        notes,
    }
}
