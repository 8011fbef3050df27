//! API key lookup

use crate::extractor::models::Credential;
use crate::session::storage::KeyValueStore;
use crate::utils::error::{Result, YtSaveError};
use std::sync::Arc;
use tracing::info;

pub const KEY_API_KEY: &str = "apiKey";

/// Reads the API key fresh from storage on every call.
///
/// A key injected through configuration takes precedence over the stored one.
#[derive(Clone)]
pub struct CredentialStore {
    store: Arc<dyn KeyValueStore>,
    injected: Option<Credential>,
}

impl CredentialStore {
    pub fn new(store: Arc<dyn KeyValueStore>, injected: Option<String>) -> Self {
        Self {
            store,
            injected: injected.map(Credential::new),
        }
    }

    pub async fn current(&self) -> Result<Option<Credential>> {
        if let Some(key) = &self.injected {
            return Ok(Some(key.clone()));
        }
        let stored = self.store.get(KEY_API_KEY).await?;
        Ok(stored
            .filter(|k| !k.trim().is_empty())
            .map(Credential::new))
    }

    pub async fn require(&self) -> Result<Credential> {
        self.current().await?.ok_or(YtSaveError::MissingCredential)
    }

    pub async fn save(&self, credential: &Credential) -> Result<()> {
        self.store
            .set(KEY_API_KEY, credential.expose().to_string())
            .await?;
        info!("API key stored");
        Ok(())
    }

    pub async fn clear(&self) -> Result<()> {
        self.store.remove(KEY_API_KEY).await
    }
}
