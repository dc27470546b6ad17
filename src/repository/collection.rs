//! Typed Collection
//!
//! Serde bridge between domain entities and the JSON rows a `RemoteStore`
//! speaks.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use super::query::Query;
use super::traits::RemoteStore;
use crate::domain::{DomainError, DomainResult, Entity};

/// Typed access to the collection of `T`
pub struct Collection<T: Entity> {
    store: Arc<dyn RemoteStore>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self::new(self.store.clone())
    }
}

fn decode<T: Entity>(rows: Vec<Value>) -> DomainResult<Vec<T>> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(DomainError::from))
        .collect()
}

impl<T: Entity> Collection<T> {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self {
            store,
            _entity: PhantomData,
        }
    }

    /// Insert one record
    pub async fn create<D: Serialize + Sync>(&self, draft: &D) -> DomainResult<T> {
        let row = serde_json::to_value(draft)?;
        let mut created = decode::<T>(self.store.insert(T::TABLE, vec![row]).await?)?;
        created
            .pop()
            .ok_or_else(|| DomainError::Remote(format!("insert into {} returned no row", T::TABLE)))
    }

    /// Insert several records in one call
    pub async fn create_many<D: Serialize + Sync>(&self, drafts: &[D]) -> DomainResult<Vec<T>> {
        if drafts.is_empty() {
            return Ok(Vec::new());
        }
        let rows = drafts
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        decode(self.store.insert(T::TABLE, rows).await?)
    }

    pub async fn find(&self, query: &Query) -> DomainResult<Vec<T>> {
        if query.matches_nothing() {
            return Ok(Vec::new());
        }
        decode(self.store.select(T::TABLE, query).await?)
    }

    pub async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<T>> {
        Ok(self.find(&Query::by_id(id)).await?.into_iter().next())
    }

    /// Patch one record; a missing record is `NotFound`
    pub async fn update_by_id(&self, id: Uuid, patch: Value) -> DomainResult<T> {
        self.update_where(&Query::by_id(id), patch)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::NotFound(format!("{} {}", T::TABLE, id)))
    }

    pub async fn update_where(&self, query: &Query, patch: Value) -> DomainResult<Vec<T>> {
        if query.matches_nothing() {
            return Ok(Vec::new());
        }
        decode(self.store.update(T::TABLE, query, patch).await?)
    }

    pub async fn delete_by_id(&self, id: Uuid) -> DomainResult<()> {
        self.store.delete(T::TABLE, &Query::by_id(id)).await
    }

    pub async fn delete_where(&self, query: &Query) -> DomainResult<()> {
        if query.matches_nothing() {
            return Ok(());
        }
        self.store.delete(T::TABLE, query).await
    }
}
