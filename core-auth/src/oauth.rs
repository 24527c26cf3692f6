//! OAuth 2.0 token refresh against the Battle.net token endpoint.
//!
//! The host application performs the interactive sign-in and hands the
//! resulting tokens to the core. The core only keeps them fresh.

use crate::error::{AuthError, Result};
use crate::types::OAuthTokens;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Battle.net token endpoint shared by all regions except China.
pub const DEFAULT_TOKEN_URL: &str = "https://oauth.battle.net/token";

const MAX_RETRIES: u32 = 3;

/// Client registration used for token refresh.
#[derive(Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub token_url: String,
}

impl OAuthConfig {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
            token_url: DEFAULT_TOKEN_URL.to_string(),
        }
    }

    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }
}

impl std::fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "[REDACTED]"))
            .field("token_url", &self.token_url)
            .finish()
    }
}

pub struct OAuthClient {
    config: OAuthConfig,
    http_client: Arc<dyn HttpClient>,
}

impl OAuthClient {
    pub fn new(config: OAuthConfig, http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            config,
            http_client,
        }
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Exchange a refresh token for a new token set.
    ///
    /// Server errors are retried up to three times with exponential backoff
    /// starting at 100ms. Client errors fail immediately. When the endpoint
    /// does not rotate the refresh token, the old one is kept.
    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<OAuthTokens> {
        let mut params = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.config.client_id.as_str()),
        ];
        if let Some(ref client_secret) = self.config.client_secret {
            params.push(("client_secret", client_secret.as_str()));
        }

        debug!("Refreshing access token");

        let encoded_body = serde_urlencoded::to_string(&params)
            .map_err(|e| AuthError::Other(format!("Failed to encode token request: {}", e)))?;

        let mut attempts = 0;

        loop {
            attempts += 1;

            let request = HttpRequest::new(HttpMethod::Post, self.config.token_url.clone())
                .form(encoded_body.clone());

            let response = self
                .http_client
                .execute(request)
                .await
                .map_err(|e| AuthError::TokenRefreshFailed(e.to_string()))?;

            if response.is_success() {
                let token_response: TokenResponse = response.json().map_err(|e| {
                    AuthError::TokenRefreshFailed(format!("Failed to parse token response: {}", e))
                })?;

                info!(
                    expires_in = token_response.expires_in,
                    "Successfully refreshed token"
                );

                return Ok(OAuthTokens::new(
                    token_response.access_token,
                    token_response
                        .refresh_token
                        .or_else(|| Some(refresh_token.to_string())),
                    token_response.expires_in,
                ));
            }

            let status = response.status;
            let error_body = response
                .text()
                .unwrap_or_else(|_| "Unable to read error response".to_string());

            if response.is_client_error() {
                warn!(status, error = %error_body, "Token refresh failed without retry");
                return Err(AuthError::TokenRefreshFailed(format!(
                    "Token endpoint returned {}: {}",
                    status, error_body
                )));
            }

            if attempts >= MAX_RETRIES {
                return Err(AuthError::TokenRefreshFailed(format!(
                    "Token refresh failed after {} attempts. Last error: {} - {}",
                    attempts, status, error_body
                )));
            }

            let delay = Duration::from_millis(100 * 2u64.pow(attempts - 1));
            warn!(
                status,
                attempts,
                delay_ms = delay.as_millis() as u64,
                "Token refresh failed, retrying"
            );
            sleep(delay).await;
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct TokenResponse {
    access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    token_type: Option<String>,
}

fn default_expires_in() -> i64 {
    3600
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::http::HttpResponse;
    use bytes::Bytes;
    use mockall::{mock, predicate::*, Sequence};

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        }
    }

    fn client(mock: MockHttpClient) -> OAuthClient {
        OAuthClient::new(
            OAuthConfig::new("client-123").with_client_secret("shh"),
            Arc::new(mock),
        )
    }

    fn response(status: u16, body: &'static str) -> HttpResponse {
        HttpResponse::new(status, Bytes::from_static(body.as_bytes()))
    }

    #[tokio::test]
    async fn test_refresh_posts_form_and_keeps_old_refresh_token() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .withf(|req| {
                let body = req.body.as_ref().map(|b| b.to_vec()).unwrap_or_default();
                let body = String::from_utf8(body).unwrap();
                req.method == HttpMethod::Post
                    && req.url == DEFAULT_TOKEN_URL
                    && body.contains("grant_type=refresh_token")
                    && body.contains("refresh_token=old-refresh")
                    && body.contains("client_secret=shh")
            })
            .times(1)
            .returning(|_| Ok(response(200, r#"{"access_token":"EUnew","expires_in":86399}"#)));

        let tokens = client(mock).refresh_access_token("old-refresh").await.unwrap();

        assert_eq!(tokens.access_token, "EUnew");
        assert_eq!(tokens.refresh_token.as_deref(), Some("old-refresh"));
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .times(1)
            .returning(|_| Ok(response(400, r#"{"error":"invalid_grant"}"#)));

        let result = client(mock).refresh_access_token("revoked").await;

        match result {
            Err(AuthError::TokenRefreshFailed(message)) => assert!(message.contains("400")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_server_error_retries_then_succeeds() {
        let mut mock = MockHttpClient::new();
        let mut seq = Sequence::new();
        mock.expect_execute()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_| Ok(response(503, "unavailable")));
        mock.expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                Ok(response(
                    200,
                    r#"{"access_token":"EUnew","refresh_token":"rotated","token_type":"bearer"}"#,
                ))
            });

        let tokens = client(mock).refresh_access_token("old").await.unwrap();

        assert_eq!(tokens.refresh_token.as_deref(), Some("rotated"));
    }

    #[tokio::test]
    async fn test_server_error_gives_up_after_max_retries() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .times(MAX_RETRIES as usize)
            .returning(|_| Ok(response(500, "boom")));

        let result = client(mock).refresh_access_token("old").await;
        assert!(matches!(result, Err(AuthError::TokenRefreshFailed(_))));
    }

    #[tokio::test]
    async fn test_transport_error_fails_refresh() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .with(always())
            .returning(|_| Err(BridgeError::Timeout("token endpoint".to_string())));

        let result = client(mock).refresh_access_token("old").await;
        assert!(matches!(result, Err(AuthError::TokenRefreshFailed(_))));
    }

    #[test]
    fn test_config_debug_redacts_secret() {
        let config = OAuthConfig::new("client-123").with_client_secret("very-secret");
        assert!(!format!("{:?}", config).contains("very-secret"));
    }
}
