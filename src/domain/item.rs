//! Shopping Item Entity
//!
//! A purchasable entry with quantity and an optional recorded price.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entity::{Entity, TableName};

/// Sort position given to new items so they land at the end of their category
pub const APPEND_SORT_ORDER: i32 = 999;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingItem {
    pub id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub quantity: u32,
    #[serde(default)]
    pub unit_price: Option<f64>,
    #[serde(default)]
    pub market: Option<String>,
    /// Acquired marker
    #[serde(default)]
    pub is_checked: bool,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ShoppingItem {
    /// quantity * unit price, when a price is recorded
    pub fn line_total(&self) -> Option<f64> {
        self.unit_price.map(|price| f64::from(self.quantity) * price)
    }

    /// Whether the item carries a strictly positive price
    pub fn has_price(&self) -> bool {
        matches!(self.unit_price, Some(price) if price > 0.0)
    }
}

impl Entity for ShoppingItem {
    const TABLE: TableName = TableName::ShoppingItems;

    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewItem {
    pub category_id: Uuid,
    pub name: String,
    pub quantity: u32,
    pub sort_order: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(quantity: u32, unit_price: Option<f64>) -> ShoppingItem {
        ShoppingItem {
            id: Uuid::new_v4(),
            category_id: Uuid::new_v4(),
            name: "Leite".to_string(),
            quantity,
            unit_price,
            market: None,
            is_checked: false,
            sort_order: 0,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_line_total() {
        assert_eq!(item(3, Some(2.5)).line_total(), Some(7.5));
        assert_eq!(item(3, None).line_total(), None);
    }

    #[test]
    fn test_zero_price_is_not_priced() {
        assert!(!item(1, Some(0.0)).has_price());
        assert!(!item(1, None).has_price());
        assert!(item(1, Some(0.01)).has_price());
    }

    #[test]
    fn test_missing_optional_fields_deserialize() {
        let json = serde_json::json!({
            "id": Uuid::nil(),
            "category_id": Uuid::nil(),
            "name": "Sal",
            "quantity": 1
        });
        let parsed: ShoppingItem = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.unit_price, None);
        assert!(!parsed.is_checked);
    }
}
