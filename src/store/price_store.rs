//! Price History Store
//!
//! Read-mostly cache of recorded unit prices. Lookups match item names
//! exactly; "Arroz" and "arroz" are separate histories.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::Session;
use crate::domain::{DomainResult, NewPriceRecord, PriceRecord};
use crate::repository::{Collection, Query};

/// Records kept by `fetch_all`
pub const RECENT_LIMIT: usize = 50;
/// Records returned per item
pub const ITEM_LIMIT: usize = 10;

/// Quick-select entry offered when entering a price
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSuggestion {
    pub unit_price: f64,
    pub market: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

pub struct PriceStore {
    session: Session,
    records: Collection<PriceRecord>,
    recent: Vec<PriceRecord>,
}

impl PriceStore {
    pub fn new(session: Session) -> Self {
        let records = session.collection();
        Self {
            session,
            records,
            recent: Vec::new(),
        }
    }

    /// Cached result of the last `fetch_all`, newest first
    pub fn recent(&self) -> &[PriceRecord] {
        &self.recent
    }

    fn user_query(&self) -> Query {
        Query::new().eq("user_id", self.session.user_id)
    }

    /// Last 50 records for the user, newest first
    pub async fn fetch_all(&mut self) -> DomainResult<&[PriceRecord]> {
        let query = self.user_query().order_desc("recorded_at").limit(RECENT_LIMIT);
        self.recent = self.records.find(&query).await?;
        Ok(&self.recent)
    }

    /// Last 10 records with exactly this item name, newest first
    pub async fn fetch_for_item(&self, name: &str) -> DomainResult<Vec<PriceRecord>> {
        let query = self
            .user_query()
            .eq("item_name", name)
            .order_desc("recorded_at")
            .limit(ITEM_LIMIT);
        self.records.find(&query).await
    }

    /// Append one record
    pub async fn record(&mut self, name: &str, unit_price: f64, market: Option<String>) -> DomainResult<PriceRecord> {
        let created = self
            .records
            .create(&NewPriceRecord {
                item_name: name.to_string(),
                user_id: self.session.user_id,
                unit_price,
                market,
            })
            .await?;

        self.recent.insert(0, created.clone());
        self.recent.truncate(RECENT_LIMIT);
        Ok(created)
    }

    /// Distinct recent (price, market) pairs for an item, newest first
    pub async fn suggestions(&self, name: &str) -> DomainResult<Vec<PriceSuggestion>> {
        let mut suggestions: Vec<PriceSuggestion> = Vec::new();
        for record in self.fetch_for_item(name).await? {
            let seen = suggestions.iter().any(|s| {
                (s.unit_price - record.unit_price).abs() < 0.005 && s.market == record.market
            });
            if !seen {
                suggestions.push(PriceSuggestion {
                    unit_price: record.unit_price,
                    market: record.market,
                    recorded_at: record.recorded_at,
                });
            }
        }
        Ok(suggestions)
    }
}
