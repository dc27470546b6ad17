//! Receipt Scanning
//!
//! Photo of a paper receipt -> vision model -> editable staging copy ->
//! receipt. The model's answer is a guess; every field may be missing.

mod client;
mod extract;
mod image;
mod staging;

use serde::{Deserialize, Serialize};

pub use client::{ScanAdapter, VisionScanClient, RECEIPT_PROMPT};
pub use extract::{extract_json_object, parse_scan_response};
pub use image::{ReceiptImage, MAX_IMAGE_BYTES};
pub use staging::{ScanPhase, ScanWorkflow, StagedReceipt};

/// One line as read by the model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScannedItem {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub unit_price: Option<f64>,
    #[serde(default)]
    pub total_price: Option<f64>,
}

/// Structured receipt as read by the model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScannedReceipt {
    #[serde(default)]
    pub items: Option<Vec<ScannedItem>>,
    #[serde(default)]
    pub total_amount: Option<f64>,
    #[serde(default)]
    pub market: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    /// `YYYY-MM-DD` when the model could read it
    #[serde(default)]
    pub purchase_date: Option<String>,
}

impl ScannedReceipt {
    pub fn item_count(&self) -> usize {
        self.items.as_ref().map_or(0, Vec::len)
    }
}
