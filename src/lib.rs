//! Cart Ledger Core
//!
//! Layered architecture:
//! - domain: Entities, seed data and error types
//! - repository: Backend access (SQLite for local mode and tests, REST for the hosted backend)
//! - store: List, price-history and receipt state with their reconciliation rules
//! - scan: Receipt photo -> AI extraction -> editable staging -> receipt
//! - checkout, analytics: Purchase flow and spending views
//! - auth, config, app: Biometric unlock, startup configuration and app state

pub mod analytics;
pub mod app;
pub mod auth;
pub mod checkout;
pub mod config;
pub mod domain;
pub mod repository;
pub mod scan;
pub mod store;

pub use app::AppState;
pub use auth::{Authenticator, BiometricGate, Credential, MemoryVault, SecretVault};
pub use checkout::{checkout, CheckoutForm, PaymentMethod};
pub use config::{AppConfig, BackendConfig, ScanConfig};
pub use domain::{DomainError, DomainResult};
pub use repository::{RemoteStore, RestStore, SqliteStore};
pub use scan::{ScanAdapter, ScanWorkflow, VisionScanClient};
pub use store::{ListStore, PriceStore, Reconcile, ReceiptStore, ReorderScope, Session};
