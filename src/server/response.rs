//! Wire-contract response types and assembly.
//!
//! The shapes here are the exact structural contract of the API. A success
//! body is re-checked against that contract immediately before it leaves the
//! pipeline; one that fails the self-check is never returned to the caller.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::pipeline::{BillExtraction, ExtractedPage};

/// Token accounting section of a success response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenUsageBody {
    pub total_tokens: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// One line item on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillItemBody {
    pub item_name: String,
    pub item_amount: f64,
    pub item_rate: f64,
    pub item_quantity: f64,
}

/// One page's worth of line items on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageBody {
    pub page_no: String,
    pub page_type: String,
    pub bill_items: Vec<BillItemBody>,
}

/// Payload section of a success response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionData {
    pub pagewise_line_items: Vec<PageBody>,
    pub total_item_count: u64,
}

/// Success envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessBody {
    pub is_success: bool,
    pub token_usage: TokenUsageBody,
    pub data: ExtractionData,
}

/// Failure envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub is_success: bool,
    pub message: String,
}

/// Collapse runs of whitespace inside an item name.
fn collapse_whitespace(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn page_body(page: &ExtractedPage) -> PageBody {
    PageBody {
        page_no: page.page_no.clone(),
        page_type: page.page_type.as_str().to_string(),
        bill_items: page
            .items
            .iter()
            .map(|item| BillItemBody {
                item_name: collapse_whitespace(&item.name),
                item_amount: item.amount,
                item_rate: item.rate,
                item_quantity: item.quantity,
            })
            .collect(),
    }
}

/// Assemble the success envelope from a finished pipeline run.
///
/// Copies from the extraction; accepted items are never mutated.
pub fn success(extraction: &BillExtraction) -> SuccessBody {
    SuccessBody {
        is_success: true,
        token_usage: TokenUsageBody {
            total_tokens: extraction.usage.total_tokens,
            input_tokens: extraction.usage.input_tokens,
            output_tokens: extraction.usage.output_tokens,
        },
        data: ExtractionData {
            pagewise_line_items: extraction.pages.iter().map(page_body).collect(),
            total_item_count: extraction.total_item_count as u64,
        },
    }
}

/// Assemble the failure envelope.
pub fn error(message: impl Into<String>) -> ErrorBody {
    ErrorBody {
        is_success: false,
        message: message.into(),
    }
}

fn valid_money(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

/// Re-check the full structural contract of a success body.
///
/// Runs immediately before the response leaves the pipeline; a body failing
/// this check is replaced with a generic internal error.
pub fn validate_success(body: &SuccessBody) -> bool {
    if !body.is_success {
        warn!("success body has is_success = false");
        return false;
    }

    let usage = &body.token_usage;
    if usage.total_tokens != usage.input_tokens + usage.output_tokens {
        warn!("token usage totals are inconsistent");
        return false;
    }

    let mut item_count = 0u64;
    for page in &body.data.pagewise_line_items {
        if page.page_no.trim().is_empty() {
            warn!("page_no is empty");
            return false;
        }
        if !matches!(
            page.page_type.as_str(),
            "Bill Detail" | "Final Bill" | "Pharmacy"
        ) {
            warn!("page_type {:?} is outside the contract", page.page_type);
            return false;
        }
        for item in &page.bill_items {
            if item.item_name.trim().is_empty() {
                warn!("item_name is empty");
                return false;
            }
            if !valid_money(item.item_amount)
                || !valid_money(item.item_rate)
                || !valid_money(item.item_quantity)
            {
                warn!("item {:?} has an invalid numeric field", item.item_name);
                return false;
            }
        }
        item_count += page.bill_items.len() as u64;
    }

    if body.data.total_item_count != item_count {
        warn!(
            "total_item_count {} does not match items present {}",
            body.data.total_item_count, item_count
        );
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DuplicateSummary, LineItem, PageType, QualityReport, TokenUsage};

    fn extraction() -> BillExtraction {
        let mut usage = TokenUsage::new();
        usage.record(700, 300);
        BillExtraction {
            pages: vec![ExtractedPage {
                page_no: "1".to_string(),
                page_type: PageType::BillDetail,
                items: vec![LineItem {
                    name: "  Medicine   A  ".to_string(),
                    quantity: 5.0,
                    rate: 50.0,
                    amount: 250.0,
                }],
            }],
            usage,
            quality: QualityReport::default(),
            duplicates: DuplicateSummary::default(),
            reconciliation: None,
            total_item_count: 1,
        }
    }

    #[test]
    fn test_success_round_trip_validates() {
        let body = success(&extraction());
        assert!(validate_success(&body));
        assert_eq!(body.token_usage.total_tokens, 1000);
        assert_eq!(body.data.total_item_count, 1);
    }

    #[test]
    fn test_assembly_does_not_mutate_input() {
        let extraction = extraction();
        let _ = success(&extraction);
        assert_eq!(extraction.pages[0].items[0].name, "  Medicine   A  ");
    }

    #[test]
    fn test_item_name_whitespace_collapsed() {
        let body = success(&extraction());
        assert_eq!(
            body.data.pagewise_line_items[0].bill_items[0].item_name,
            "Medicine A"
        );
    }

    #[test]
    fn test_validate_rejects_negative_amount() {
        let mut body = success(&extraction());
        body.data.pagewise_line_items[0].bill_items[0].item_amount = -1.0;
        assert!(!validate_success(&body));
    }

    #[test]
    fn test_validate_rejects_nan() {
        let mut body = success(&extraction());
        body.data.pagewise_line_items[0].bill_items[0].item_rate = f64::NAN;
        assert!(!validate_success(&body));
    }

    #[test]
    fn test_validate_rejects_unknown_page_type() {
        let mut body = success(&extraction());
        body.data.pagewise_line_items[0].page_type = "Receipt".to_string();
        assert!(!validate_success(&body));
    }

    #[test]
    fn test_validate_rejects_count_mismatch() {
        let mut body = success(&extraction());
        body.data.total_item_count = 7;
        assert!(!validate_success(&body));
    }

    #[test]
    fn test_validate_rejects_inconsistent_token_totals() {
        let mut body = success(&extraction());
        body.token_usage.total_tokens = 1;
        assert!(!validate_success(&body));
    }

    #[test]
    fn test_error_body() {
        let body = error("something went wrong");
        assert!(!body.is_success);
        assert_eq!(body.message, "something went wrong");
    }

    #[test]
    fn test_wire_field_names() {
        let body = success(&extraction());
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["is_success"], true);
        assert!(json["token_usage"]["total_tokens"].is_u64());
        let page = &json["data"]["pagewise_line_items"][0];
        assert_eq!(page["page_no"], "1");
        assert_eq!(page["page_type"], "Bill Detail");
        let item = &page["bill_items"][0];
        assert!(item["item_amount"].is_number());
        assert_eq!(item["item_name"], "Medicine A");
    }
}
