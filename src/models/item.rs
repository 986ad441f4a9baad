//! Line item models.
//!
//! A `RawLineItem` is what the structured-extraction parse step produces:
//! every field is optional because LLM output routinely omits or mangles
//! fields. A `LineItem` is the validated form and is only constructed by the
//! validator; once built it is never mutated.

use serde::{Deserialize, Serialize};

/// Candidate line item from a structured-extraction attempt.
///
/// Numeric fields that could not be coerced to a number are `None`,
/// never zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawLineItem {
    pub name: Option<String>,
    pub quantity: Option<f64>,
    pub rate: Option<f64>,
    pub amount: Option<f64>,
}

impl RawLineItem {
    /// Convenience constructor for a fully-populated candidate.
    pub fn new(name: &str, quantity: f64, rate: f64, amount: f64) -> Self {
        Self {
            name: Some(name.to_string()),
            quantity: Some(quantity),
            rate: Some(rate),
            amount: Some(amount),
        }
    }
}

/// A validated line item on a bill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    pub quantity: f64,
    pub rate: f64,
    pub amount: f64,
}

/// Classification of the bill page the text was extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageType {
    #[default]
    BillDetail,
    FinalBill,
    Pharmacy,
}

impl PageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BillDetail => "Bill Detail",
            Self::FinalBill => "Final Bill",
            Self::Pharmacy => "Pharmacy",
        }
    }

    /// Parse a page type tag case-insensitively.
    pub fn from_tag(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "bill detail" => Some(Self::BillDetail),
            "final bill" => Some(Self::FinalBill),
            "pharmacy" => Some(Self::Pharmacy),
            _ => None,
        }
    }

    /// Keyword fallback when the completion omits or mangles the tag.
    pub fn detect(text: &str) -> Self {
        let lower = text.to_lowercase();
        if ["pharmacy", "medicine", "drug"]
            .iter()
            .any(|w| lower.contains(w))
        {
            Self::Pharmacy
        } else if lower.contains("final") {
            Self::FinalBill
        } else {
            Self::BillDetail
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_type_from_tag() {
        assert_eq!(PageType::from_tag("Bill Detail"), Some(PageType::BillDetail));
        assert_eq!(PageType::from_tag("bill detail"), Some(PageType::BillDetail));
        assert_eq!(PageType::from_tag(" FINAL BILL "), Some(PageType::FinalBill));
        assert_eq!(PageType::from_tag("Pharmacy"), Some(PageType::Pharmacy));
        assert_eq!(PageType::from_tag("Invoice"), None);
    }

    #[test]
    fn test_page_type_detect() {
        assert_eq!(PageType::detect("PHARMACY COUNTER RECEIPT"), PageType::Pharmacy);
        assert_eq!(PageType::detect("Final bill of stay"), PageType::FinalBill);
        assert_eq!(PageType::detect("Consultation charges"), PageType::BillDetail);
    }

    #[test]
    fn test_page_type_round_trip() {
        for pt in [PageType::BillDetail, PageType::FinalBill, PageType::Pharmacy] {
            assert_eq!(PageType::from_tag(pt.as_str()), Some(pt));
        }
    }
}
