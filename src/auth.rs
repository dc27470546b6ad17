//! Biometric Unlock
//!
//! A local gate in front of a stored sign-in credential. Passing the gate
//! only releases the credential; the caller still signs in with the server
//! (`RestStore::sign_in`), so the gate never stands in for a session.

use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{AuthFailure, DomainError, DomainResult};

/// Email and password sealed behind the gate
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

/// User-verifying platform authenticator (fingerprint, face, device PIN)
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn is_available(&self) -> bool;

    /// Prompt the user; `Err(Cancelled)` when they dismiss it
    async fn verify(&self, email: &str) -> Result<(), AuthFailure>;
}

/// Platform secure storage for the sealed credential
pub trait SecretVault: Send + Sync {
    fn store(&self, credential: &Credential) -> DomainResult<()>;
    fn load(&self) -> DomainResult<Option<Credential>>;
    fn clear(&self) -> DomainResult<()>;
}

/// Vault that forgets everything on exit
#[derive(Default)]
pub struct MemoryVault {
    slot: Mutex<Option<Credential>>,
}

impl MemoryVault {
    fn slot(&self) -> DomainResult<std::sync::MutexGuard<'_, Option<Credential>>> {
        self.slot
            .lock()
            .map_err(|_| DomainError::Internal("vault lock poisoned".to_string()))
    }
}

impl SecretVault for MemoryVault {
    fn store(&self, credential: &Credential) -> DomainResult<()> {
        *self.slot()? = Some(credential.clone());
        Ok(())
    }

    fn load(&self) -> DomainResult<Option<Credential>> {
        Ok(self.slot()?.clone())
    }

    fn clear(&self) -> DomainResult<()> {
        *self.slot()? = None;
        Ok(())
    }
}

pub struct BiometricGate<A: Authenticator, V: SecretVault> {
    authenticator: A,
    vault: V,
}

impl<A: Authenticator, V: SecretVault> BiometricGate<A, V> {
    pub fn new(authenticator: A, vault: V) -> Self {
        Self { authenticator, vault }
    }

    pub async fn is_available(&self) -> bool {
        self.authenticator.is_available().await
    }

    pub fn is_registered(&self) -> bool {
        matches!(self.vault.load(), Ok(Some(_)))
    }

    /// Email of the registered credential, for the sign-in screen
    pub fn registered_email(&self) -> Option<String> {
        self.vault.load().ok().flatten().map(|c| c.email)
    }

    /// Seal the credential after the user proves presence once
    pub async fn register(&self, email: &str, password: &str) -> DomainResult<()> {
        if !self.authenticator.is_available().await {
            return Err(DomainError::Auth(AuthFailure::Unavailable));
        }

        self.authenticator.verify(email).await.map_err(|failure| {
            log::warn!("Biometric registration refused: {}", failure);
            DomainError::Auth(failure)
        })?;

        self.vault.store(&Credential {
            email: email.to_string(),
            password: password.to_string(),
        })?;
        log::info!("Biometric unlock registered for {}", email);
        Ok(())
    }

    /// Verify the user, then hand back the stored credential
    pub async fn unlock(&self) -> DomainResult<Credential> {
        let credential = self
            .vault
            .load()?
            .ok_or(DomainError::Auth(AuthFailure::NotRegistered))?;

        self.authenticator
            .verify(&credential.email)
            .await
            .map_err(DomainError::Auth)?;
        Ok(credential)
    }

    pub fn remove(&self) -> DomainResult<()> {
        self.vault.clear()?;
        log::info!("Biometric unlock removed");
        Ok(())
    }
}
