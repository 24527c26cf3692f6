use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Seconds before expiry at which an access token is treated as expired.
pub const DEFAULT_EXPIRY_BUFFER_SECS: i64 = 300;

/// OAuth 2.0 token set for the signed-in account.
///
/// The `Debug` implementation redacts both tokens.
///
/// # Examples
///
/// ```
/// use core_auth::OAuthTokens;
/// use chrono::{Duration, Utc};
///
/// let tokens = OAuthTokens::new("EUabc".to_string(), None, 86_399);
/// assert!(!tokens.is_expired_at(Utc::now()));
/// assert!(tokens.is_expired_at(Utc::now() + Duration::days(2)));
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl OAuthTokens {
    /// Build a token set expiring `expires_in` seconds from now.
    pub fn new(access_token: String, refresh_token: Option<String>, expires_in: i64) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_at: Utc::now() + Duration::seconds(expires_in),
        }
    }

    /// Whether the access token is expired, or expires within the default
    /// buffer, at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.is_expired_with_buffer(now, DEFAULT_EXPIRY_BUFFER_SECS)
    }

    pub fn is_expired_with_buffer(&self, now: DateTime<Utc>, buffer_seconds: i64) -> bool {
        now >= self.expires_at - Duration::seconds(buffer_seconds)
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

impl fmt::Debug for OAuthTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthTokens")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
