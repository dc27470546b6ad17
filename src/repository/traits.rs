//! Repository Layer - Core Traits
//!
//! Defines the abstract interface to the backend: CRUD over named
//! collections of JSON rows. The backend owns identity generation.

use async_trait::async_trait;
use serde_json::Value;

use super::query::Query;
use crate::domain::{DomainResult, TableName};

/// Generic query client over the backend's record collections
///
/// Writes return the rows as stored (ids and defaults filled in).
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Insert rows, returning them as stored in the same order
    async fn insert(&self, table: TableName, rows: Vec<Value>) -> DomainResult<Vec<Value>>;

    /// Read rows matching the query
    async fn select(&self, table: TableName, query: &Query) -> DomainResult<Vec<Value>>;

    /// Merge `patch` into every matching row, returning the updated rows
    async fn update(&self, table: TableName, query: &Query, patch: Value) -> DomainResult<Vec<Value>>;

    /// Delete every matching row
    async fn delete(&self, table: TableName, query: &Query) -> DomainResult<()>;
}
