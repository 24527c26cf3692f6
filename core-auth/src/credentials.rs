//! Access token providers consumed by the fetch layers.

use crate::error::{AuthError, Result};
use crate::oauth::OAuthClient;
use crate::token_store::TokenStore;
use crate::types::OAuthTokens;
use async_trait::async_trait;
use bridge_traits::http::HttpRequest;
use bridge_traits::time::{Clock, SystemClock};
use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

/// Supplies the access token for game data and profile requests.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// A currently valid access token.
    async fn access_token(&self) -> Result<String>;

    /// Append the `access_token` query parameter to `request`'s URL.
    async fn authorize(&self, mut request: HttpRequest) -> Result<HttpRequest> {
        let token = self.access_token().await?;
        let mut url = Url::parse(&request.url)
            .map_err(|e| AuthError::Other(format!("Invalid request URL: {}", e)))?;
        url.query_pairs_mut().append_pair("access_token", &token);
        request.url = url.into();
        Ok(request)
    }
}

/// A fixed token, for hosts that manage refresh themselves.
#[derive(Clone)]
pub struct StaticCredentials {
    token: String,
}

impl StaticCredentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl std::fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn access_token(&self) -> Result<String> {
        if self.token.is_empty() {
            return Err(AuthError::NotAuthenticated);
        }
        Ok(self.token.clone())
    }
}

/// Tokens persisted in secure storage, refreshed when close to expiry.
///
/// The loaded token set is cached in memory; concurrent callers wait on the
/// same refresh instead of racing the token endpoint.
pub struct OAuthCredentialProvider {
    token_store: TokenStore,
    oauth: Option<OAuthClient>,
    clock: Arc<dyn Clock>,
    event_bus: Option<EventBus>,
    current: Mutex<Option<OAuthTokens>>,
}

impl OAuthCredentialProvider {
    pub fn new(token_store: TokenStore) -> Self {
        Self {
            token_store,
            oauth: None,
            clock: Arc::new(SystemClock),
            event_bus: None,
            current: Mutex::new(None),
        }
    }

    /// Enable refresh through the given OAuth client.
    pub fn with_oauth(mut self, oauth: OAuthClient) -> Self {
        self.oauth = Some(oauth);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Persist tokens obtained by the host's sign-in flow.
    pub async fn sign_in(&self, tokens: OAuthTokens) -> Result<()> {
        self.token_store.store_tokens(&tokens).await?;
        *self.current.lock().await = Some(tokens);
        info!("Signed in");
        Ok(())
    }

    pub async fn sign_out(&self) -> Result<()> {
        self.token_store.delete_tokens().await?;
        *self.current.lock().await = None;
        self.emit(AuthEvent::SignedOut);
        info!("Signed out");
        Ok(())
    }

    pub async fn is_signed_in(&self) -> bool {
        if self.current.lock().await.is_some() {
            return true;
        }
        matches!(self.token_store.retrieve_tokens().await, Ok(Some(_)))
    }

    fn emit(&self, event: AuthEvent) {
        if let Some(bus) = &self.event_bus {
            // No subscribers is not an error.
            let _ = bus.emit(CoreEvent::Auth(event));
        }
    }

    fn report(&self, error: &AuthError) {
        self.emit(AuthEvent::AuthError {
            message: error.to_string(),
            recoverable: error.is_recoverable(),
        });
    }

    async fn refresh(&self, tokens: &OAuthTokens) -> Result<OAuthTokens> {
        let (Some(oauth), Some(refresh_token)) = (&self.oauth, tokens.refresh_token.as_deref())
        else {
            return Err(AuthError::TokenExpired);
        };
        if !tokens.can_refresh() {
            return Err(AuthError::TokenExpired);
        }

        self.emit(AuthEvent::TokenRefreshing);
        let refreshed = oauth.refresh_access_token(refresh_token).await?;
        self.token_store.store_tokens(&refreshed).await?;
        self.emit(AuthEvent::TokenRefreshed {
            expires_at: refreshed.expires_at.timestamp(),
        });
        Ok(refreshed)
    }
}

#[async_trait]
impl CredentialProvider for OAuthCredentialProvider {
    async fn access_token(&self) -> Result<String> {
        let mut current = self.current.lock().await;

        if current.is_none() {
            *current = match self.token_store.retrieve_tokens().await {
                Ok(tokens) => tokens,
                Err(e) => {
                    self.report(&e);
                    return Err(e);
                }
            };
        }

        let Some(tokens) = current.as_ref() else {
            debug!("No stored tokens");
            return Err(AuthError::NotAuthenticated);
        };

        if !tokens.is_expired_at(self.clock.now()) {
            return Ok(tokens.access_token.clone());
        }

        debug!(expires_at = %tokens.expires_at, "Access token expired, refreshing");
        match self.refresh(tokens).await {
            Ok(refreshed) => {
                let token = refreshed.access_token.clone();
                *current = Some(refreshed);
                Ok(token)
            }
            Err(e) => {
                warn!(error = %e, "Could not refresh access token");
                self.report(&e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::OAuthConfig;
    use crate::token_store::tests::MemorySecureStore;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::http::{HttpClient, HttpResponse};
    use bytes::Bytes;
    use chrono::{Duration, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TokenEndpoint {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl HttpClient for TokenEndpoint {
        async fn execute(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(HttpResponse::new(
                200,
                Bytes::from_static(br#"{"access_token":"EUrefreshed","expires_in":86399}"#),
            ))
        }
    }

    fn expired_tokens() -> OAuthTokens {
        OAuthTokens {
            access_token: "EUstale".to_string(),
            refresh_token: Some("refresh".to_string()),
            expires_at: Utc::now() - Duration::hours(1),
        }
    }

    #[tokio::test]
    async fn test_static_credentials() {
        assert_eq!(
            StaticCredentials::new("abc").access_token().await.unwrap(),
            "abc"
        );
        assert!(matches!(
            StaticCredentials::new("").access_token().await,
            Err(AuthError::NotAuthenticated)
        ));
    }

    #[tokio::test]
    async fn test_authorize_appends_token_query() {
        let credentials = StaticCredentials::new("EU tok");
        let request = HttpRequest::get(
            "https://eu.api.blizzard.com/data/wow/journal-instance/1200?namespace=static-eu",
        );

        let authorized = credentials.authorize(request).await.unwrap();

        assert_eq!(
            authorized.url,
            "https://eu.api.blizzard.com/data/wow/journal-instance/1200?namespace=static-eu&access_token=EU+tok"
        );
    }

    #[tokio::test]
    async fn test_not_signed_in() {
        let credentials = OAuthCredentialProvider::new(TokenStore::new(Arc::new(MemorySecureStore::default())));
        assert!(matches!(
            credentials.access_token().await,
            Err(AuthError::NotAuthenticated)
        ));
        assert!(!credentials.is_signed_in().await);
    }

    #[tokio::test]
    async fn test_valid_token_is_returned_without_refresh() {
        let store = TokenStore::new(Arc::new(MemorySecureStore::default()));
        store
            .store_tokens(&OAuthTokens::new("EUfresh".to_string(), None, 3600))
            .await
            .unwrap();

        let credentials = OAuthCredentialProvider::new(store);
        assert_eq!(credentials.access_token().await.unwrap(), "EUfresh");
    }

    #[tokio::test]
    async fn test_expired_token_is_refreshed_and_persisted() {
        let secure_store = MemorySecureStore::default();
        let store = TokenStore::new(Arc::new(secure_store.clone()));
        store.store_tokens(&expired_tokens()).await.unwrap();

        let endpoint = Arc::new(TokenEndpoint {
            calls: AtomicUsize::new(0),
        });
        let bus = EventBus::new(16);
        let mut events = bus.subscribe();
        let credentials = OAuthCredentialProvider::new(store.clone())
            .with_oauth(OAuthClient::new(OAuthConfig::new("client"), endpoint.clone()))
            .with_event_bus(bus);

        assert_eq!(credentials.access_token().await.unwrap(), "EUrefreshed");
        assert_eq!(credentials.access_token().await.unwrap(), "EUrefreshed");
        assert_eq!(endpoint.calls.load(Ordering::SeqCst), 1);

        let persisted = store.retrieve_tokens().await.unwrap().unwrap();
        assert_eq!(persisted.access_token, "EUrefreshed");
        assert_eq!(persisted.refresh_token.as_deref(), Some("refresh"));

        assert!(matches!(
            events.recv().await.unwrap(),
            CoreEvent::Auth(AuthEvent::TokenRefreshing)
        ));
        assert!(matches!(
            events.recv().await.unwrap(),
            CoreEvent::Auth(AuthEvent::TokenRefreshed { .. })
        ));
    }

    #[tokio::test]
    async fn test_expired_token_without_oauth_reports_error() {
        let store = TokenStore::new(Arc::new(MemorySecureStore::default()));
        store.store_tokens(&expired_tokens()).await.unwrap();
        let bus = EventBus::new(16);
        let mut events = bus.subscribe();
        let credentials = OAuthCredentialProvider::new(store).with_event_bus(bus);

        assert!(matches!(
            credentials.access_token().await,
            Err(AuthError::TokenExpired)
        ));
        match events.recv().await.unwrap() {
            CoreEvent::Auth(AuthEvent::AuthError { recoverable, .. }) => assert!(!recoverable),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_sign_in_and_sign_out() {
        let credentials = OAuthCredentialProvider::new(TokenStore::new(Arc::new(MemorySecureStore::default())));

        credentials
            .sign_in(OAuthTokens::new("EUnew".to_string(), None, 3600))
            .await
            .unwrap();
        assert!(credentials.is_signed_in().await);
        assert_eq!(credentials.access_token().await.unwrap(), "EUnew");

        credentials.sign_out().await.unwrap();
        assert!(!credentials.is_signed_in().await);
    }
}
