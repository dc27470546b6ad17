//! Domain Layer
//!
//! Contains all domain entities and core abstractions.
//! This layer has no I/O; it only describes records and their rules.

mod category;
mod entity;
mod item;
mod list;
mod price;
mod receipt;
pub mod seed;

pub use category::{Category, CategoryWithItems, NewCategory};
pub use entity::{require_name, AuthFailure, DomainError, DomainResult, Entity, TableName};
pub use item::{NewItem, ShoppingItem, APPEND_SORT_ORDER};
pub use list::{NewList, ShoppingList};
pub use price::{NewPriceRecord, PriceRecord};
pub use receipt::{
    NewReceipt, NewReceiptItem, Receipt, ReceiptDraft, ReceiptItem, ReceiptLine, ReceiptWithItems,
};
