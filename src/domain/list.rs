//! Shopping List Entity
//!
//! A named container of categories. At most one list per user is active.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entity::{Entity, TableName};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingList {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    /// 1-12 for monthly lists, 0 for custom lists
    #[serde(default)]
    pub month: u32,
    #[serde(default)]
    pub year: i32,
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ShoppingList {
    pub fn is_monthly(&self) -> bool {
        self.month != 0
    }
}

impl Entity for ShoppingList {
    const TABLE: TableName = TableName::ShoppingLists;

    fn id(&self) -> Uuid {
        self.id
    }
}

/// Insert payload for a list
#[derive(Debug, Clone, Serialize)]
pub struct NewList {
    pub user_id: Uuid,
    pub name: String,
    pub month: u32,
    pub year: i32,
    pub is_active: bool,
}
