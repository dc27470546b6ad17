//! Receipt Entities
//!
//! Immutable snapshots of completed purchases. Line totals are computed on the
//! client before persistence and never re-derived by the backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entity::{Entity, TableName};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(default)]
    pub list_id: Option<Uuid>,
    pub title: String,
    pub total_amount: f64,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub has_discount: bool,
    #[serde(default)]
    pub discount_amount: f64,
    #[serde(default)]
    pub market: Option<String>,
    pub purchase_date: DateTime<Utc>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Entity for Receipt {
    const TABLE: TableName = TableName::Receipts;

    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptItem {
    pub id: Uuid,
    pub receipt_id: Uuid,
    pub name: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub total_price: f64,
}

impl Entity for ReceiptItem {
    const TABLE: TableName = TableName::ReceiptItems;

    fn id(&self) -> Uuid {
        self.id
    }
}

/// A receipt header with its line items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptWithItems {
    pub receipt: Receipt,
    pub items: Vec<ReceiptItem>,
}

/// One line of a receipt about to be written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptLine {
    pub name: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub total_price: f64,
}

impl ReceiptLine {
    /// Line with `total_price = quantity * unit_price`
    pub fn new(name: impl Into<String>, quantity: f64, unit_price: f64) -> Self {
        Self {
            name: name.into(),
            quantity,
            unit_price,
            total_price: quantity * unit_price,
        }
    }
}

/// Everything needed to create a receipt
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiptDraft {
    pub title: String,
    pub total_amount: f64,
    pub payment_method: String,
    pub has_discount: bool,
    pub discount_amount: f64,
    pub market: String,
    pub items: Vec<ReceiptLine>,
    /// Originating list, for checkouts
    pub list_id: Option<Uuid>,
    /// Defaults to now
    pub purchase_date: Option<DateTime<Utc>>,
}

/// Header insert payload
#[derive(Debug, Clone, Serialize)]
pub struct NewReceipt {
    pub user_id: Uuid,
    pub list_id: Option<Uuid>,
    pub title: String,
    pub total_amount: f64,
    pub payment_method: String,
    pub has_discount: bool,
    pub discount_amount: f64,
    pub market: Option<String>,
    pub purchase_date: DateTime<Utc>,
}

/// Line insert payload
#[derive(Debug, Clone, Serialize)]
pub struct NewReceiptItem {
    pub receipt_id: Uuid,
    pub name: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub total_price: f64,
}

impl NewReceiptItem {
    pub fn from_line(receipt_id: Uuid, line: &ReceiptLine) -> Self {
        Self {
            receipt_id,
            name: line.name.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price,
            total_price: line.total_price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_total_is_computed() {
        let line = ReceiptLine::new("Feijão 1kg", 2.0, 8.5);
        assert_eq!(line.total_price, 17.0);
    }

    #[test]
    fn test_from_line_keeps_client_total() {
        let line = ReceiptLine {
            name: "Arroz".to_string(),
            quantity: 1.0,
            unit_price: 25.9,
            total_price: 25.9,
        };
        let row = NewReceiptItem::from_line(Uuid::nil(), &line);
        assert_eq!(row.total_price, 25.9);
        assert_eq!(row.receipt_id, Uuid::nil());
    }
}
