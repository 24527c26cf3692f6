//! Secure Token Storage
//!
//! Persists the signed-in account's OAuth tokens through the host
//! [`SecureStore`]. Token values never reach the logs.

use crate::error::{AuthError, Result};
use crate::types::OAuthTokens;
use bridge_traits::storage::SecureStore;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Secure store key used when none is configured.
pub const DEFAULT_TOKEN_KEY: &str = "battlenet.oauth.tokens";

/// JSON-serialized [`OAuthTokens`] under a single secure store key.
#[derive(Clone)]
pub struct TokenStore {
    secure_store: Arc<dyn SecureStore>,
    key: String,
}

impl TokenStore {
    pub fn new(secure_store: Arc<dyn SecureStore>) -> Self {
        Self::with_key(secure_store, DEFAULT_TOKEN_KEY)
    }

    pub fn with_key(secure_store: Arc<dyn SecureStore>, key: impl Into<String>) -> Self {
        Self {
            secure_store,
            key: key.into(),
        }
    }

    /// Store tokens, replacing any previous set.
    pub async fn store_tokens(&self, tokens: &OAuthTokens) -> Result<()> {
        let json = serde_json::to_vec(tokens)?;

        self.secure_store
            .set_secret(&self.key, &json)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to store tokens in secure storage");
                AuthError::SecureStorageUnavailable(e.to_string())
            })?;

        info!(
            has_refresh_token = tokens.refresh_token.is_some(),
            expires_at = %tokens.expires_at,
            "Tokens stored securely"
        );
        Ok(())
    }

    /// Load the stored tokens.
    ///
    /// Corrupted entries are deleted and reported as
    /// [`AuthError::TokenCorrupted`].
    pub async fn retrieve_tokens(&self) -> Result<Option<OAuthTokens>> {
        let data = self.secure_store.get_secret(&self.key).await.map_err(|e| {
            warn!(error = %e, "Failed to retrieve tokens from secure storage");
            AuthError::SecureStorageUnavailable(e.to_string())
        })?;

        let Some(data) = data else {
            debug!("No tokens found in storage");
            return Ok(None);
        };

        match serde_json::from_slice::<OAuthTokens>(&data) {
            Ok(tokens) => Ok(Some(tokens)),
            Err(e) => {
                warn!(error = %e, "Stored tokens are corrupted, deleting them");
                if let Err(delete_err) = self.secure_store.delete_secret(&self.key).await {
                    warn!(error = %delete_err, "Failed to delete corrupted token data");
                }
                Err(AuthError::TokenCorrupted(e.to_string()))
            }
        }
    }

    /// Delete the stored tokens. Succeeds when nothing is stored.
    pub async fn delete_tokens(&self) -> Result<()> {
        self.secure_store
            .delete_secret(&self.key)
            .await
            .map_err(|e| AuthError::SecureStorageUnavailable(e.to_string()))?;

        info!("Tokens deleted");
        Ok(())
    }
}
