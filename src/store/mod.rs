//! State Stores
//!
//! Local caches of backend state. Every mutation writes to the backend first
//! and then reconciles the cache, either by patching it in place or by
//! re-reading everything it depends on.

mod list_store;
mod price_store;
mod receipt_store;
mod reorder;


use std::sync::Arc;

use uuid::Uuid;

use crate::domain::Entity;
use crate::repository::{Collection, RemoteStore};

pub use list_store::ListStore;
pub use price_store::{PriceStore, PriceSuggestion};
pub use receipt_store::ReceiptStore;
pub use reorder::ReorderScope;

/// Authenticated user plus the backend it talks to
#[derive(Clone)]
pub struct Session {
    pub user_id: Uuid,
    pub store: Arc<dyn RemoteStore>,
}

impl Session {
    pub fn new(user_id: Uuid, store: Arc<dyn RemoteStore>) -> Self {
        Self { user_id, store }
    }

    pub fn collection<T: Entity>(&self) -> Collection<T> {
        Collection::new(self.store.clone())
    }
}

/// How a mutation brings the local cache back in line with the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconcile {
    /// Field-level update applied to the cached record(s)
    Patch,
    /// Cache discarded and re-read from the backend
    Resync,
}
