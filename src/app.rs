//! Application State
//!
//! Wires config, backend, session and stores together at startup.

use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::auth::Credential;
use crate::config::{AppConfig, BackendConfig};
use crate::domain::DomainResult;
use crate::repository::{RemoteStore, RestStore, SqliteStore};
use crate::scan::{ScanWorkflow, VisionScanClient};
use crate::store::{ListStore, ReceiptStore, Session};

const APP_NAME: &str = "CartLedger";

/// State shared by every screen
pub struct AppState {
    pub config: AppConfig,
    pub session: Session,
    pub lists: Mutex<ListStore>,
    pub receipts: Mutex<ReceiptStore>,
    /// None when no scan API key is configured
    pub scanner: Option<Mutex<ScanWorkflow<VisionScanClient>>>,
    /// Kept for sign-out on the hosted backend
    rest: Option<Arc<RestStore>>,
}

impl AppState {
    /// Start without signing in: local mode, or the hosted backend as `local_user_id`
    pub async fn start(config: AppConfig) -> DomainResult<Self> {
        Self::start_with(config, None).await
    }

    /// Start on the hosted backend with a credential (typed in, or released by the biometric gate)
    pub async fn start_signed_in(config: AppConfig, credential: &Credential) -> DomainResult<Self> {
        Self::start_with(config, Some(credential)).await
    }

    async fn start_with(config: AppConfig, credential: Option<&Credential>) -> DomainResult<Self> {
        if let Some(dir) = &config.log_dir {
            if let Err(e) = rolling_logger::init_logger(dir.clone(), APP_NAME) {
                eprintln!("[{}] Logger init failed: {}", chrono::Local::now().format("%H:%M:%S%.3f"), e);
            }
        }

        let (store, user_id, rest) = connect(&config, credential).await?;
        let _ = rolling_logger::info(&format!("Backend connected, user {}", user_id));

        let session = Session::new(user_id, store);
        let mut lists = ListStore::new(session.clone());
        let mut receipts = ReceiptStore::new(session.clone());

        lists.bootstrap().await?;
        if let Err(e) = receipts.fetch().await {
            log::error!("Failed to load receipts at startup: {}", e);
        }
        if let Err(e) = lists.prices_mut().fetch_all().await {
            log::error!("Failed to load price history at startup: {}", e);
        }

        let scanner = if config.scan.is_enabled() {
            Some(Mutex::new(ScanWorkflow::new(VisionScanClient::new(config.scan.clone())?)))
        } else {
            log::info!("Receipt scanning disabled, no API key configured");
            None
        };

        let _ = rolling_logger::info("App state ready");
        Ok(Self {
            config,
            session,
            lists: Mutex::new(lists),
            receipts: Mutex::new(receipts),
            scanner,
            rest,
        })
    }

    pub fn user_id(&self) -> Uuid {
        self.session.user_id
    }

    pub async fn sign_out(&self) {
        if let Some(rest) = &self.rest {
            rest.sign_out().await;
        }
    }
}

type Connected = (Arc<dyn RemoteStore>, Uuid, Option<Arc<RestStore>>);

async fn connect(config: &AppConfig, credential: Option<&Credential>) -> DomainResult<Connected> {
    match &config.backend {
        BackendConfig::Local { path } => {
            let store = match path {
                Some(path) => SqliteStore::open(path)?,
                None => SqliteStore::in_memory()?,
            };
            log::info!("Using local store at {:?}", path);
            Ok((Arc::new(store), config.local_user_id, None))
        }
        BackendConfig::Remote { url, anon_key } => {
            let rest = Arc::new(RestStore::new(url, anon_key)?);
            let user_id = match credential {
                Some(credential) => rest.sign_in(&credential.email, &credential.password).await?,
                None => config.local_user_id,
            };
            log::info!("Using hosted backend at {}", url);
            let store: Arc<dyn RemoteStore> = rest.clone();
            Ok((store, user_id, Some(rest)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScanConfig;

    #[tokio::test]
    async fn test_start_local_bootstraps_list() {
        let state = AppState::start(AppConfig::default()).await.unwrap();

        let lists = state.lists.lock().await;
        assert!(lists.current_list().is_some());
        assert_eq!(lists.categories().len(), 9);
        assert!(state.receipts.lock().await.receipts().is_empty());
        assert!(state.scanner.is_none());
        assert_eq!(state.user_id(), Uuid::nil());
    }

    #[tokio::test]
    async fn test_start_with_scan_key_enables_scanner() {
        let config = AppConfig {
            scan: ScanConfig { api_key: "sk".to_string(), ..ScanConfig::default() },
            ..AppConfig::default()
        };
        let state = AppState::start(config).await.unwrap();
        assert!(state.scanner.is_some());
    }

    #[tokio::test]
    async fn test_start_reuses_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            backend: BackendConfig::Local { path: Some(dir.path().join("cart.db")) },
            ..AppConfig::default()
        };

        let first = {
            let state = AppState::start(config.clone()).await.unwrap();
            let lists = state.lists.lock().await;
            let id = lists.current_list().map(|l| l.id);
            id
        };
        let state = AppState::start(config).await.unwrap();
        let second = state.lists.lock().await.current_list().map(|l| l.id);

        assert_eq!(first, second);
    }
}
