//! Category Entity
//!
//! A named, ordered section of a list.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entity::{Entity, TableName};
use super::item::ShoppingItem;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub list_id: Uuid,
    pub name: String,
    /// User-added section (as opposed to one of the defaults)
    #[serde(default)]
    pub is_custom: bool,
    /// Display order within the list
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Entity for Category {
    const TABLE: TableName = TableName::Categories;

    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewCategory {
    pub list_id: Uuid,
    pub name: String,
    pub is_custom: bool,
    pub sort_order: i32,
}

/// A category together with its items, in display order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryWithItems {
    pub category: Category,
    pub items: Vec<ShoppingItem>,
}

impl CategoryWithItems {
    pub fn id(&self) -> Uuid {
        self.category.id
    }

    pub fn item_ids(&self) -> Vec<Uuid> {
        self.items.iter().map(|item| item.id).collect()
    }
}
