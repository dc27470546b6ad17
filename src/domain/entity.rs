//! Domain Layer - Core Entity Trait
//!
//! Every record lives in one named remote collection and carries a
//! server-assigned UUID.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Named record collections of the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableName {
    ShoppingLists,
    Categories,
    ShoppingItems,
    PriceHistory,
    Receipts,
    ReceiptItems,
}

impl TableName {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableName::ShoppingLists => "shopping_lists",
            TableName::Categories => "categories",
            TableName::ShoppingItems => "shopping_items",
            TableName::PriceHistory => "price_history",
            TableName::Receipts => "receipts",
            TableName::ReceiptItems => "receipt_items",
        }
    }

    /// Timestamp columns the backend fills in when a row omits them
    pub fn timestamp_columns(&self) -> &'static [&'static str] {
        match self {
            TableName::ShoppingLists | TableName::ShoppingItems => &["created_at", "updated_at"],
            TableName::Categories => &["created_at"],
            TableName::PriceHistory => &["recorded_at"],
            TableName::Receipts => &["created_at", "purchase_date"],
            TableName::ReceiptItems => &[],
        }
    }

    /// Whether updates bump `updated_at`
    pub fn tracks_updates(&self) -> bool {
        matches!(self, TableName::ShoppingLists | TableName::ShoppingItems)
    }
}

impl std::fmt::Display for TableName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Core trait for all domain entities
pub trait Entity: Sized + Send + Sync + Clone + Serialize + DeserializeOwned {
    /// Collection the entity is stored in
    const TABLE: TableName;

    /// Returns the entity's unique identifier
    fn id(&self) -> Uuid;
}

/// Common result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

/// Why a local authenticator refused to release a credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthFailure {
    /// User dismissed the platform prompt
    Cancelled,
    /// No user-verifying platform authenticator on this device
    Unavailable,
    /// Nothing stored to unlock
    NotRegistered,
    Failed(String),
}

impl std::fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthFailure::Cancelled => write!(f, "cancelled by user"),
            AuthFailure::Unavailable => write!(f, "authenticator unavailable"),
            AuthFailure::NotRegistered => write!(f, "no credential registered"),
            AuthFailure::Failed(msg) => write!(f, "{}", msg),
        }
    }
}

/// Domain-level errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Remote store error: {0}")]
    Remote(String),

    #[error("Scan failed: {message}")]
    Scan { message: String, raw: Option<String> },

    #[error("Authentication failed: {0}")]
    Auth(AuthFailure),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn scan(message: impl Into<String>) -> Self {
        DomainError::Scan {
            message: message.into(),
            raw: None,
        }
    }

    pub fn scan_with_raw(message: impl Into<String>, raw: impl Into<String>) -> Self {
        DomainError::Scan {
            message: message.into(),
            raw: Some(raw.into()),
        }
    }

    /// Short notification text shown to the user
    pub fn user_message(&self) -> String {
        match self {
            DomainError::NotFound(_) => "Registro não encontrado".to_string(),
            DomainError::InvalidInput(msg) => msg.clone(),
            DomainError::Remote(_) => "Erro de conexão. Tente novamente.".to_string(),
            DomainError::Scan { .. } => "Erro ao processar imagem. Tente novamente.".to_string(),
            DomainError::Auth(AuthFailure::Cancelled) => "Autenticação cancelada".to_string(),
            DomainError::Auth(AuthFailure::Unavailable) => {
                "Biometria não disponível neste dispositivo".to_string()
            }
            DomainError::Auth(AuthFailure::NotRegistered) => "Biometria não configurada".to_string(),
            DomainError::Auth(AuthFailure::Failed(_)) => "Falha na autenticação".to_string(),
            DomainError::Internal(_) => "Erro inesperado".to_string(),
        }
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::Internal(format!("JSON error: {}", err))
    }
}

impl From<DomainError> for String {
    fn from(err: DomainError) -> String {
        err.to_string()
    }
}

/// Reject empty or whitespace-only names, returning the trimmed name
pub fn require_name(name: &str, message: &str) -> DomainResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(DomainError::InvalidInput(message.to_string()));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_names() {
        assert_eq!(TableName::ShoppingItems.as_str(), "shopping_items");
        assert_eq!(TableName::PriceHistory.to_string(), "price_history");
    }

    #[test]
    fn test_require_name_trims() {
        assert_eq!(require_name("  Arroz ", "vazio").unwrap(), "Arroz");
        assert_eq!(
            require_name("   ", "Nome não pode estar vazio"),
            Err(DomainError::InvalidInput("Nome não pode estar vazio".to_string()))
        );
    }

    #[test]
    fn test_cancelled_auth_message() {
        let err = DomainError::Auth(AuthFailure::Cancelled);
        assert_eq!(err.user_message(), "Autenticação cancelada");
    }
}
