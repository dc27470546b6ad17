//! Reorder Glue
//!
//! Connects a finished drag gesture to the list store: the new order is
//! computed from the cached order at drop time and persisted as one
//! `sort_order` write per entity.

use futures::future::join_all;
use leptos_dragdrop::{DragSession, DropOutcome};
use serde_json::json;
use uuid::Uuid;

use super::ListStore;
use crate::domain::{DomainResult, Entity};
use crate::repository::{Collection, Query};

/// Which sequence a drag gesture reorders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReorderScope {
    Categories,
    /// Items of one category
    Items(Uuid),
}

/// Write each id's index as its sort position, all writes in flight at once.
///
/// Ids that no longer exist are skipped. Writes are independent; the first
/// failure is returned after all of them settle.
pub(super) async fn persist_order<T: Entity>(rows: &Collection<T>, ordered_ids: &[Uuid]) -> DomainResult<()> {
    let writes = ordered_ids.iter().enumerate().map(|(index, id)| {
        let rows = rows.clone();
        let query = Query::by_id(*id);
        async move { rows.update_where(&query, json!({ "sort_order": index })).await }
    });

    let failures: Vec<_> = join_all(writes)
        .await
        .into_iter()
        .filter_map(Result::err)
        .collect();

    match failures.into_iter().next() {
        None => Ok(()),
        Some(first) => {
            log::error!("Reorder of {} only partially persisted: {}", T::TABLE, first);
            Err(first)
        }
    }
}

impl ListStore {
    /// Ids of the sequence as currently displayed
    pub fn current_order(&self, scope: ReorderScope) -> Vec<Uuid> {
        match scope {
            ReorderScope::Categories => self.categories().iter().map(|section| section.id()).collect(),
            ReorderScope::Items(category_id) => self
                .categories()
                .iter()
                .find(|section| section.id() == category_id)
                .map(|section| section.item_ids())
                .unwrap_or_default(),
        }
    }

    /// Release a drag over `scope` and persist the resulting order.
    ///
    /// Returns whether anything was reordered. The session is cleared either way.
    pub async fn drop_dragged(&mut self, scope: ReorderScope, session: &mut DragSession<Uuid>) -> DomainResult<bool> {
        let order = self.current_order(scope);
        let DropOutcome::Reorder(next) = session.finish(&order) else {
            return Ok(false);
        };

        match scope {
            ReorderScope::Categories => self.reorder_categories(&next).await?,
            ReorderScope::Items(category_id) => self.reorder_items(category_id, &next).await?,
        }
        Ok(true)
    }
}
