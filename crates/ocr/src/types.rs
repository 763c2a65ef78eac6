use basket_core::Money;
use serde::{Deserialize, Serialize};

/// Store name reported when no known chain appears on the receipt.
pub const UNKNOWN_STORE: &str = "Unknown Store";

/// One purchased product reconstructed from a receipt line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub name: String,
    /// Always at least 1.
    pub qty: u32,
    /// `total_price / qty`, rounded to cents.
    pub unit_price: Money,
    /// The amount printed on the line.
    pub total_price: Money,
}

/// The structured result of parsing one receipt's OCR text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedReceipt {
    pub store_name: String,
    pub subtotal: Money,
    /// Not detected yet; always zero.
    pub tax: Money,
    pub total: Money,
    pub items: Vec<LineItem>,
}

impl ParsedReceipt {
    pub fn empty() -> Self {
        Self {
            store_name: UNKNOWN_STORE.to_string(),
            subtotal: Money::zero(),
            tax: Money::zero(),
            total: Money::zero(),
            items: vec![],
        }
    }

    pub fn is_store_known(&self) -> bool {
        self.store_name != UNKNOWN_STORE
    }
}
