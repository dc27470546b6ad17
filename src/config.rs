//! App Configuration
//!
//! Loaded once at startup, either from `CART_*` environment variables or a
//! JSON file. Secrets never get defaults.

use std::env;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{DomainError, DomainResult};
use crate::scan::MAX_IMAGE_BYTES;

pub const DEFAULT_SCAN_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_SCAN_MODEL: &str = "gpt-4o";

/// Where rows live
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendConfig {
    /// SQLite file, or an in-memory database when no path is given
    Local { path: Option<PathBuf> },
    /// Hosted REST backend
    Remote { url: String, anon_key: String },
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Local { path: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub endpoint: String,
    /// Empty disables scanning
    pub api_key: String,
    pub model: String,
    pub max_image_bytes: usize,
    pub max_tokens: u32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_SCAN_ENDPOINT.to_string(),
            api_key: String::new(),
            model: DEFAULT_SCAN_MODEL.to_string(),
            max_image_bytes: MAX_IMAGE_BYTES,
            max_tokens: 4096,
        }
    }
}

impl ScanConfig {
    pub fn is_enabled(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    /// Owner of rows in local mode
    #[serde(default = "Uuid::nil")]
    pub local_user_id: Uuid,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            scan: ScanConfig::default(),
            log_dir: None,
            local_user_id: Uuid::nil(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> DomainResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> DomainResult<Self> {
        let var = |key: &str| {
            lookup(key).filter(|v| !v.trim().is_empty()).or_else(|| {
                log::warn!("Environment variable {} not found, using default", key);
                None
            })
        };

        let backend = match var("CART_BACKEND").as_deref().unwrap_or("local") {
            "local" => BackendConfig::Local {
                path: var("CART_DB_PATH").map(PathBuf::from),
            },
            "remote" => BackendConfig::Remote {
                url: require(&lookup, "CART_BACKEND_URL")?,
                anon_key: require(&lookup, "CART_BACKEND_ANON_KEY")?,
            },
            other => {
                return Err(DomainError::InvalidInput(format!("Unknown backend '{}'", other)));
            }
        };

        let defaults = ScanConfig::default();
        let scan = ScanConfig {
            endpoint: var("CART_SCAN_ENDPOINT").unwrap_or(defaults.endpoint),
            api_key: var("CART_SCAN_API_KEY").unwrap_or_default(),
            model: var("CART_SCAN_MODEL").unwrap_or(defaults.model),
            max_image_bytes: parse_or(var("CART_SCAN_MAX_IMAGE_BYTES"), defaults.max_image_bytes)?,
            max_tokens: parse_or(var("CART_SCAN_MAX_TOKENS"), defaults.max_tokens)?,
        };

        Ok(Self {
            backend,
            scan,
            log_dir: var("CART_LOG_DIR").map(PathBuf::from),
            local_user_id: parse_or(var("CART_LOCAL_USER_ID"), Uuid::nil())?,
        })
    }

    pub fn from_json_file(path: &Path) -> DomainResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| DomainError::InvalidInput(format!("Cannot read config {}: {}", path.display(), e)))?;
        let config: AppConfig = serde_json::from_str(&text)
            .map_err(|e| DomainError::InvalidInput(format!("Invalid config {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> DomainResult<()> {
        if let BackendConfig::Remote { url, anon_key } = &self.backend {
            if url.trim().is_empty() || anon_key.trim().is_empty() {
                return Err(DomainError::InvalidInput(
                    "Remote backend needs both url and anon_key".to_string(),
                ));
            }
        }
        Ok(())
    }
}

fn require(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> DomainResult<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| DomainError::InvalidInput(format!("{} must be set", key)))
}

fn parse_or<T>(value: Option<String>, default: T) -> DomainResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| DomainError::InvalidInput(format!("Invalid value '{}': {}", raw, e))),
        None => Ok(default),
    }
}
