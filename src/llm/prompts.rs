//! Prompt construction for structured extraction.
//!
//! Prompts are pure functions of their inputs so that retries are
//! reproducible given identical text. The guard rails live here as
//! instructions: the model is told exactly which fields to emit, which
//! values (dates, invoice numbers, identifiers) must never appear as item
//! names or amounts, and the exact JSON shape to return.

/// Marker appended when input text is cut at the length bound.
const TRUNCATION_MARKER: &str = "\n...[text truncated]";

/// Maximum characters of a failed completion embedded in a repair prompt.
const MAX_FAILED_OUTPUT_CHARS: usize = 500;

/// System prompt establishing the extraction persona.
pub const SYSTEM_PROMPT: &str = r#"You are an expert in bill and invoice data extraction. You extract structured data from unstructured bill text and return only valid JSON.

You are very careful about:
- NOT treating dates as monetary amounts
- NOT treating invoice numbers, reference codes, or identifiers as monetary amounts
- Proper numeric conversion
- Never emitting the same item twice
- Accuracy over completion: better to skip a value than to guess"#;

/// Truncate text to `max_chars`, cutting at a char boundary and appending a
/// visible marker.
fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.len() <= max_chars {
        return text.to_string();
    }
    let mut end = max_chars;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{}", &text[..end], TRUNCATION_MARKER)
}

/// Build the main extraction prompt for one page's OCR text.
pub fn build_extraction_prompt(text: &str, page_label: &str, max_chars: usize) -> String {
    let text = truncate_text(text, max_chars);
    format!(
        r#"Extract line items from this bill text.

EXTRACT - these ARE line items:
- "Aspirin 500mg - Qty: 2, Rate: 50, Amount: 100"
- "Consultation Fee - 500.00"

NEVER EXTRACT - these are NOT line items:
- "Invoice Date: 2024-01-15" (a date, not an amount)
- "Invoice No: INV-2024-001" (an identifier, not an amount)
- "Reference: REF-123456" (an identifier)
- "Customer ID: CUST-789" (an identifier)
- "Page 1 of 2" (a page marker)
- "Bill Total: 5000" (a total, not a line item)

RULES:
1. Each line item must have: item_name (a product or service name, never a
   date, identifier, or bare number), item_quantity (>= 0), item_rate (>= 0),
   item_amount (>= 0).
2. item_amount must approximately equal item_quantity * item_rate.
3. Never emit the same item twice.
4. Skip any line whose name looks like a date (2024-01-15, 01/15/2024), an
   ID (INV-, REF-, CUST-), or contains only digits.

BILL TEXT (page {page_label}):
{text}

Return ONLY this JSON, with no markdown and no surrounding prose:
{{
  "page_type": "Bill Detail",
  "line_items": [
    {{"item_name": "product name", "item_quantity": 1, "item_rate": 100.0, "item_amount": 100.0}}
  ],
  "extraction_notes": "any issues found"
}}"#
    )
}

/// Build the repair prompt issued after a failed parse.
///
/// Embeds a bounded excerpt of the prior failed output so the model can
/// correct its own format errors.
pub fn build_repair_prompt(text: &str, failed_output: &str, max_chars: usize) -> String {
    let text = truncate_text(text, max_chars);
    let excerpt = truncate_text(failed_output, MAX_FAILED_OUTPUT_CHARS);
    format!(
        r#"Your previous answer could not be parsed as the required JSON. It began:

{excerpt}

Try again. Extract the bill line items from the text below and return ONLY a
JSON object of this exact shape, with no markdown fences and no prose:
{{
  "page_type": "Bill Detail",
  "line_items": [
    {{"item_name": "product name", "item_quantity": 1, "item_rate": 100.0, "item_amount": 100.0}}
  ],
  "extraction_notes": ""
}}

Remember: item names must be products or services, never dates, invoice
numbers, or identifiers. Every quantity, rate, and amount must be a number.

BILL TEXT:
{text}"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_prompt_is_deterministic() {
        let a = build_extraction_prompt("Aspirin 2 x 50 = 100", "1", 8000);
        let b = build_extraction_prompt("Aspirin 2 x 50 = 100", "1", 8000);
        assert_eq!(a, b);
    }

    #[test]
    fn test_extraction_prompt_embeds_text_and_label() {
        let prompt = build_extraction_prompt("Paracetamol 500", "3", 8000);
        assert!(prompt.contains("Paracetamol 500"));
        assert!(prompt.contains("page 3"));
    }

    #[test]
    fn test_extraction_prompt_carries_guard_rails() {
        let prompt = build_extraction_prompt("text", "1", 8000);
        assert!(prompt.contains("2024-01-15"));
        assert!(prompt.contains("INV-"));
        assert!(prompt.contains("item_quantity * item_rate"));
        assert!(prompt.contains("Never emit the same item twice"));
        assert!(prompt.contains("line_items"));
    }

    #[test]
    fn test_truncation_appends_marker() {
        let long_text = "x".repeat(10_000);
        let prompt = build_extraction_prompt(&long_text, "1", 200);
        assert!(prompt.contains(TRUNCATION_MARKER));
        assert!(!prompt.contains(&"x".repeat(300)));
    }

    #[test]
    fn test_truncation_respects_char_boundary() {
        // Multi-byte characters must not be split.
        let text = "₹".repeat(100);
        let truncated = truncate_text(&text, 10);
        assert!(truncated.ends_with(TRUNCATION_MARKER));
        assert!(truncated.starts_with('₹'));
    }

    #[test]
    fn test_short_text_is_not_truncated() {
        assert_eq!(truncate_text("short", 100), "short");
    }

    #[test]
    fn test_repair_prompt_embeds_bounded_failed_output() {
        let failed = "y".repeat(2000);
        let prompt = build_repair_prompt("bill text", &failed, 8000);
        assert!(prompt.contains("could not be parsed"));
        assert!(prompt.contains(&"y".repeat(400)));
        assert!(!prompt.contains(&"y".repeat(600)));
    }
}
