//! Repository Layer
//!
//! Data access abstractions and implementations.

mod collection;
mod db;
mod query;
mod rest;
mod traits;

#[cfg(test)]
mod tests;

pub use collection::Collection;
pub use db::SqliteStore;
pub use query::{Filter, Order, Query};
pub use rest::{query_pairs, RestStore};
pub use traits::RemoteStore;
