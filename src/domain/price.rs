//! Price History Entity
//!
//! Append-only log of unit prices per item name. Names are matched exactly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entity::{Entity, TableName};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub id: Uuid,
    pub item_name: String,
    pub user_id: Uuid,
    pub unit_price: f64,
    #[serde(default)]
    pub market: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl Entity for PriceRecord {
    const TABLE: TableName = TableName::PriceHistory;

    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewPriceRecord {
    pub item_name: String,
    pub user_id: Uuid,
    pub unit_price: f64,
    pub market: Option<String>,
}
