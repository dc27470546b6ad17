//! List Store
//!
//! The active shopping list with its categories and items. Leaf field updates
//! patch the cached records; structural operations (bootstrap, switch, create,
//! delete list) re-read the whole list.

use std::collections::HashMap;

use chrono::Datelike;
use serde_json::json;
use uuid::Uuid;

use super::price_store::PriceStore;
use super::reorder::persist_order;
use super::{Reconcile, Session};
use crate::domain::seed::{self, CUSTOM_CATEGORY, DEFAULT_CATEGORIES, STARTER_ITEMS};
use crate::domain::{
    require_name, Category, CategoryWithItems, DomainError, DomainResult, NewCategory, NewItem,
    NewList, ShoppingItem, ShoppingList, APPEND_SORT_ORDER,
};
use crate::repository::{Collection, Query};

pub struct ListStore {
    session: Session,
    lists: Collection<ShoppingList>,
    category_rows: Collection<Category>,
    item_rows: Collection<ShoppingItem>,
    prices: PriceStore,
    current: Option<ShoppingList>,
    sections: Vec<CategoryWithItems>,
    last_reconcile: Option<Reconcile>,
}

impl ListStore {
    pub fn new(session: Session) -> Self {
        Self {
            lists: session.collection(),
            category_rows: session.collection(),
            item_rows: session.collection(),
            prices: PriceStore::new(session.clone()),
            session,
            current: None,
            sections: Vec::new(),
            last_reconcile: None,
        }
    }

    pub fn current_list(&self) -> Option<&ShoppingList> {
        self.current.as_ref()
    }

    /// Categories of the active list in display order, each with its items
    pub fn categories(&self) -> &[CategoryWithItems] {
        &self.sections
    }

    pub fn prices(&self) -> &PriceStore {
        &self.prices
    }

    pub fn prices_mut(&mut self) -> &mut PriceStore {
        &mut self.prices
    }

    /// Strategy used by the most recent successful mutation
    pub fn last_reconcile(&self) -> Option<Reconcile> {
        self.last_reconcile
    }

    pub fn find_item(&self, item_id: Uuid) -> Option<&ShoppingItem> {
        self.sections
            .iter()
            .flat_map(|section| section.items.iter())
            .find(|item| item.id == item_id)
    }

    fn item_mut(&mut self, item_id: Uuid) -> Option<&mut ShoppingItem> {
        self.sections
            .iter_mut()
            .flat_map(|section| section.items.iter_mut())
            .find(|item| item.id == item_id)
    }

    fn section_mut(&mut self, category_id: Uuid) -> Option<&mut CategoryWithItems> {
        self.sections.iter_mut().find(|section| section.id() == category_id)
    }

    fn settle(&mut self, how: Reconcile) {
        log::debug!("List state reconciled by {:?}", how);
        self.last_reconcile = Some(how);
    }

    fn user_query(&self) -> Query {
        Query::new().eq("user_id", self.session.user_id)
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Load the active list, creating this month's list when there is none.
    ///
    /// Afterwards exactly one list is active and its categories are loaded.
    pub async fn bootstrap(&mut self) -> DomainResult<ShoppingList> {
        let query = self
            .user_query()
            .eq("is_active", true)
            .order_desc("created_at")
            .limit(1);

        match self.lists.find(&query).await?.into_iter().next() {
            Some(list) => {
                log::info!("Loaded active list {} ({})", list.name, list.id);
                self.resync(list.clone()).await?;
                Ok(list)
            }
            None => {
                let today = chrono::Local::now();
                log::info!("No active list, creating one for {}/{}", today.month(), today.year());
                self.create_default_list(today.month(), today.year()).await
            }
        }
    }

    /// Categories of a list ordered by position, each with its ordered items
    async fn load_sections(&self, list_id: Uuid) -> DomainResult<Vec<CategoryWithItems>> {
        let categories = self
            .category_rows
            .find(&Query::new().eq("list_id", list_id).order_asc("sort_order"))
            .await?;

        let category_ids: Vec<Uuid> = categories.iter().map(|c| c.id).collect();
        let items = self
            .item_rows
            .find(&Query::new().is_in("category_id", &category_ids).order_asc("sort_order"))
            .await?;

        let mut by_category: HashMap<Uuid, Vec<ShoppingItem>> = HashMap::new();
        for item in items {
            by_category.entry(item.category_id).or_default().push(item);
        }

        Ok(categories
            .into_iter()
            .map(|category| {
                let items = by_category.remove(&category.id).unwrap_or_default();
                CategoryWithItems { category, items }
            })
            .collect())
    }

    /// Replace the cached list and its categories with what the backend holds
    async fn resync(&mut self, list: ShoppingList) -> DomainResult<()> {
        let sections = self.load_sections(list.id).await?;
        self.current = Some(list);
        self.sections = sections;
        self.settle(Reconcile::Resync);
        Ok(())
    }

    /// Every list of the user, newest first
    pub async fn all_lists(&self) -> DomainResult<Vec<ShoppingList>> {
        self.lists.find(&self.user_query().order_desc("created_at")).await
    }

    // ========================================================================
    // Item fields
    // ========================================================================

    /// Set an item's quantity. Negative values are ignored.
    pub async fn update_quantity(&mut self, item_id: Uuid, quantity: i64) -> DomainResult<()> {
        if quantity < 0 {
            log::debug!("Ignoring negative quantity {} for item {}", quantity, item_id);
            return Ok(());
        }
        let quantity = u32::try_from(quantity)
            .map_err(|_| DomainError::InvalidInput("Quantidade inválida".to_string()))?;

        self.item_rows
            .update_by_id(item_id, json!({ "quantity": quantity }))
            .await?;

        if let Some(item) = self.item_mut(item_id) {
            item.quantity = quantity;
        }
        self.settle(Reconcile::Patch);
        Ok(())
    }

    /// Record a unit price (and market) on an item and append it to the price history.
    ///
    /// The history entry is tagged with the item's cached name; an item missing
    /// from the cache gets no history entry.
    pub async fn update_price(&mut self, item_id: Uuid, unit_price: f64, market: Option<&str>) -> DomainResult<()> {
        if !unit_price.is_finite() || unit_price < 0.0 {
            return Err(DomainError::InvalidInput("Preço inválido".to_string()));
        }
        let market = market
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string);

        self.item_rows
            .update_by_id(item_id, json!({ "unit_price": unit_price, "market": market }))
            .await?;

        match self.find_item(item_id).map(|item| item.name.clone()) {
            Some(name) => {
                if let Err(e) = self.prices.record(&name, unit_price, market.clone()).await {
                    log::error!("Failed to record price history for {}: {}", name, e);
                }
            }
            None => log::warn!("Item {} not cached, price history skipped", item_id),
        }

        if let Some(item) = self.item_mut(item_id) {
            item.unit_price = Some(unit_price);
            item.market = market;
        }
        self.settle(Reconcile::Patch);
        Ok(())
    }

    /// Flip the acquired marker; unknown items are ignored
    pub async fn toggle_checked(&mut self, item_id: Uuid) -> DomainResult<()> {
        let Some(checked) = self.find_item(item_id).map(|item| !item.is_checked) else {
            return Ok(());
        };

        self.item_rows
            .update_by_id(item_id, json!({ "is_checked": checked }))
            .await?;

        if let Some(item) = self.item_mut(item_id) {
            item.is_checked = checked;
        }
        self.settle(Reconcile::Patch);
        Ok(())
    }

    pub async fn rename_item(&mut self, item_id: Uuid, name: &str) -> DomainResult<()> {
        let name = require_name(name, "Nome do item não pode estar vazio")?;
        self.item_rows.update_by_id(item_id, json!({ "name": name })).await?;

        if let Some(item) = self.item_mut(item_id) {
            item.name = name;
        }
        self.settle(Reconcile::Patch);
        Ok(())
    }

    // ========================================================================
    // Items
    // ========================================================================

    /// Add an item at the end of a category
    pub async fn add_item(&mut self, category_id: Uuid, name: &str, quantity: u32) -> DomainResult<ShoppingItem> {
        let name = require_name(name, "Nome do item não pode estar vazio")?;
        let item = self
            .item_rows
            .create(&NewItem {
                category_id,
                name,
                quantity,
                sort_order: APPEND_SORT_ORDER,
            })
            .await?;

        if let Some(section) = self.section_mut(category_id) {
            section.items.push(item.clone());
        }
        self.settle(Reconcile::Patch);
        Ok(item)
    }

    pub async fn delete_item(&mut self, item_id: Uuid) -> DomainResult<()> {
        self.item_rows.delete_by_id(item_id).await?;

        for section in &mut self.sections {
            section.items.retain(|item| item.id != item_id);
        }
        self.settle(Reconcile::Patch);
        Ok(())
    }

    // ========================================================================
    // Categories
    // ========================================================================

    /// Add a custom category after the last one
    pub async fn add_category(&mut self, name: &str) -> DomainResult<Category> {
        let list_id = self
            .current
            .as_ref()
            .map(|list| list.id)
            .ok_or_else(|| DomainError::InvalidInput("Nenhuma lista ativa".to_string()))?;
        let name = require_name(name, "Nome da categoria não pode estar vazio")?;

        let max_sort_order = self
            .sections
            .iter()
            .map(|section| section.category.sort_order)
            .max()
            .unwrap_or(-1);

        let category = self
            .category_rows
            .create(&NewCategory {
                list_id,
                name,
                is_custom: true,
                sort_order: max_sort_order + 1,
            })
            .await?;

        self.sections.push(CategoryWithItems {
            category: category.clone(),
            items: Vec::new(),
        });
        self.settle(Reconcile::Patch);
        Ok(category)
    }

    pub async fn rename_category(&mut self, category_id: Uuid, name: &str) -> DomainResult<()> {
        let name = require_name(name, "Nome da categoria não pode estar vazio")?;
        self.category_rows
            .update_by_id(category_id, json!({ "name": name }))
            .await?;

        if let Some(section) = self.section_mut(category_id) {
            section.category.name = name;
        }
        self.settle(Reconcile::Patch);
        Ok(())
    }

    /// Delete a category's items, then the category
    pub async fn delete_category(&mut self, category_id: Uuid) -> DomainResult<()> {
        self.item_rows
            .delete_where(&Query::new().eq("category_id", category_id))
            .await?;
        self.category_rows.delete_by_id(category_id).await?;

        self.sections.retain(|section| section.id() != category_id);
        self.settle(Reconcile::Patch);
        Ok(())
    }

    // ========================================================================
    // Ordering
    // ========================================================================

    /// Persist a new item order within one category.
    ///
    /// The cache takes the new order before the writes are issued; a failed
    /// write leaves it ahead of the backend until the next resync.
    pub async fn reorder_items(&mut self, category_id: Uuid, ordered_ids: &[Uuid]) -> DomainResult<()> {
        if let Some(section) = self.section_mut(category_id) {
            let mut reordered: Vec<ShoppingItem> = ordered_ids
                .iter()
                .filter_map(|id| section.items.iter().find(|item| item.id == *id).cloned())
                .collect();
            for (index, item) in reordered.iter_mut().enumerate() {
                item.sort_order = index as i32;
            }
            section.items = reordered;
        }
        self.settle(Reconcile::Patch);

        persist_order(&self.item_rows, ordered_ids).await
    }

    /// Persist a new category order. Same optimistic contract as `reorder_items`.
    pub async fn reorder_categories(&mut self, ordered_ids: &[Uuid]) -> DomainResult<()> {
        let mut reordered: Vec<CategoryWithItems> = ordered_ids
            .iter()
            .filter_map(|id| self.sections.iter().find(|section| section.id() == *id).cloned())
            .collect();
        for (index, section) in reordered.iter_mut().enumerate() {
            section.category.sort_order = index as i32;
        }
        self.sections = reordered;
        self.settle(Reconcile::Patch);

        persist_order(&self.category_rows, ordered_ids).await
    }

    // ========================================================================
    // Lists
    // ========================================================================

    pub async fn rename_list(&mut self, list_id: Uuid, name: &str) -> DomainResult<()> {
        let name = require_name(name, "Nome da lista não pode estar vazio")?;
        self.lists.update_by_id(list_id, json!({ "name": name })).await?;

        if let Some(list) = self.current.as_mut().filter(|list| list.id == list_id) {
            list.name = name;
        }
        self.settle(Reconcile::Patch);
        Ok(())
    }

    /// New active list with the default categories and no items
    pub async fn create_custom_list(&mut self, name: &str) -> DomainResult<ShoppingList> {
        let name = require_name(name, "Nome da lista não pode estar vazio")?;
        let draft = NewList {
            user_id: self.session.user_id,
            name,
            month: 0,
            year: 0,
            is_active: true,
        };
        self.create_list(draft, false).await
    }

    /// New active monthly list with the default categories and the starter items
    pub async fn create_default_list(&mut self, month: u32, year: i32) -> DomainResult<ShoppingList> {
        if !(1..=12).contains(&month) {
            return Err(DomainError::InvalidInput("Mês inválido".to_string()));
        }
        let draft = NewList {
            user_id: self.session.user_id,
            name: seed::monthly_list_name(month, year),
            month,
            year,
            is_active: true,
        };
        self.create_list(draft, true).await
    }

    /// Write a list and its contents as one unit.
    ///
    /// Any failure after the first write undoes what was written, reactivates
    /// the previously active list and leaves the cache untouched.
    async fn create_list(&mut self, draft: NewList, with_starter_items: bool) -> DomainResult<ShoppingList> {
        let previous = self.deactivate_active().await?;

        let list = match self.lists.create(&draft).await {
            Ok(list) => list,
            Err(e) => {
                log::error!("Failed to create list {}: {}", draft.name, e);
                self.reactivate(&previous).await;
                return Err(e);
            }
        };

        if let Err(e) = self.populate(list.id, with_starter_items).await {
            log::error!("Failed to populate list {}, rolling back: {}", list.id, e);
            if let Err(cleanup) = self.purge_list(list.id).await {
                log::error!("Rollback of list {} incomplete: {}", list.id, cleanup);
            }
            self.reactivate(&previous).await;
            return Err(e);
        }

        log::info!("Created list {} ({})", list.name, list.id);
        self.resync(list.clone()).await?;
        Ok(list)
    }

    /// Default categories plus, for monthly lists, the starter items
    async fn populate(&self, list_id: Uuid, with_starter_items: bool) -> DomainResult<()> {
        let drafts: Vec<NewCategory> = DEFAULT_CATEGORIES
            .iter()
            .enumerate()
            .map(|(index, name)| NewCategory {
                list_id,
                name: name.to_string(),
                is_custom: *name == CUSTOM_CATEGORY,
                sort_order: index as i32,
            })
            .collect();
        let categories = self.category_rows.create_many(&drafts).await?;

        if !with_starter_items {
            return Ok(());
        }

        let ids: HashMap<&str, Uuid> = categories.iter().map(|c| (c.name.as_str(), c.id)).collect();
        let items: Vec<NewItem> = STARTER_ITEMS
            .iter()
            .filter_map(|(category, items)| ids.get(category).map(|id| (*id, *items)))
            .flat_map(|(category_id, items)| {
                items.iter().enumerate().map(move |(index, (name, quantity))| NewItem {
                    category_id,
                    name: name.to_string(),
                    quantity: *quantity,
                    sort_order: index as i32,
                })
            })
            .collect();
        self.item_rows.create_many(&items).await?;
        Ok(())
    }

    /// Mark every active list of the user inactive, returning their ids
    async fn deactivate_active(&self) -> DomainResult<Vec<Uuid>> {
        let query = self.user_query().eq("is_active", true);
        let lists = self
            .lists
            .update_where(&query, json!({ "is_active": false }))
            .await?;
        Ok(lists.into_iter().map(|list| list.id).collect())
    }

    async fn reactivate(&self, ids: &[Uuid]) {
        let query = Query::new().is_in("id", ids);
        if let Err(e) = self.lists.update_where(&query, json!({ "is_active": true })).await {
            log::error!("Failed to reactivate lists {:?}: {}", ids, e);
        }
    }

    /// Delete a list's items, categories and the list itself
    async fn purge_list(&self, list_id: Uuid) -> DomainResult<()> {
        let categories = self
            .category_rows
            .find(&Query::new().eq("list_id", list_id))
            .await?;
        let category_ids: Vec<Uuid> = categories.iter().map(|c| c.id).collect();

        self.item_rows
            .delete_where(&Query::new().is_in("category_id", &category_ids))
            .await?;
        self.category_rows
            .delete_where(&Query::new().eq("list_id", list_id))
            .await?;
        self.lists.delete_by_id(list_id).await
    }

    /// Make another list the active one and load it
    pub async fn switch_list(&mut self, list_id: Uuid) -> DomainResult<()> {
        let previous = self.deactivate_active().await?;

        match self.lists.update_by_id(list_id, json!({ "is_active": true })).await {
            Ok(list) => {
                log::info!("Switched to list {} ({})", list.name, list.id);
                self.resync(list).await
            }
            Err(e) => {
                log::error!("Failed to activate list {}: {}", list_id, e);
                self.reactivate(&previous).await;
                Err(e)
            }
        }
    }

    /// Delete a list with everything in it; deleting the active list loads
    /// (or creates) another one.
    pub async fn delete_list(&mut self, list_id: Uuid) -> DomainResult<()> {
        self.purge_list(list_id).await?;
        log::info!("Deleted list {}", list_id);

        if self.current.as_ref().map(|list| list.id) == Some(list_id) {
            self.current = None;
            self.sections.clear();
            self.bootstrap().await?;
        }
        Ok(())
    }

    // ========================================================================
    // Derived values
    // ========================================================================

    /// Sum of quantity * unit price over the priced items
    pub fn calculate_subtotal(&self) -> f64 {
        self.sections
            .iter()
            .flat_map(|section| section.items.iter())
            .filter_map(ShoppingItem::line_total)
            .sum()
    }

    /// Items with a strictly positive unit price
    pub fn items_with_price(&self) -> Vec<ShoppingItem> {
        self.sections
            .iter()
            .flat_map(|section| section.items.iter())
            .filter(|item| item.has_price())
            .cloned()
            .collect()
    }
}
