//! Storage Abstractions
//!
//! Platform-agnostic traits for credential storage, key-value settings and
//! the raw API response cache.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};

use crate::error::Result;

/// Secure credential storage trait
///
/// Backed by the Keychain on Apple platforms, the Keystore on Android and the
/// OS secret service on desktop.
///
/// Implementations MUST encrypt data at rest and never log stored values.
#[async_trait]
pub trait SecureStore: Send + Sync {
    /// Store a secret value, replacing any previous value for `key`.
    async fn set_secret(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Retrieve a secret value.
    ///
    /// Returns `Ok(None)` if the key doesn't exist.
    async fn get_secret(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Delete a secret. Deleting a missing key succeeds.
    async fn delete_secret(&self, key: &str) -> Result<()>;

    /// Check if a secret exists without retrieving it
    async fn has_secret(&self, key: &str) -> Result<bool> {
        Ok(self.get_secret(key).await?.is_some())
    }
}

/// Key-value settings storage trait
///
/// Abstracts platform preferences storage (UserDefaults, SharedPreferences,
/// a SQLite table on desktop). Holds the API region, the locale and the
/// per-character display order.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::SettingsStore;
///
/// async fn remember_locale(store: &dyn SettingsStore) -> Result<()> {
///     store.set_string("localeCode", "en_GB").await
/// }
/// ```
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Store a string value
    async fn set_string(&self, key: &str, value: &str) -> Result<()>;

    /// Retrieve a string value
    async fn get_string(&self, key: &str) -> Result<Option<String>>;

    /// Store a boolean value
    async fn set_bool(&self, key: &str, value: bool) -> Result<()>;

    /// Retrieve a boolean value
    async fn get_bool(&self, key: &str) -> Result<Option<bool>>;

    /// Store an integer value
    async fn set_i64(&self, key: &str, value: i64) -> Result<()>;

    /// Retrieve an integer value
    async fn get_i64(&self, key: &str) -> Result<Option<i64>>;

    /// Delete a setting
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check if a setting exists
    async fn has_key(&self, key: &str) -> Result<bool>;

    /// List all setting keys
    async fn list_keys(&self) -> Result<Vec<String>>;
}

/// A response body previously written to the [`ResponseCache`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub body: Bytes,
    pub created_at: DateTime<Utc>,
}

impl CachedResponse {
    pub fn new(body: impl Into<Bytes>, created_at: DateTime<Utc>) -> Self {
        Self {
            body: body.into(),
            created_at,
        }
    }

    /// Whether the entry is strictly younger than `max_age_days` at `now`.
    pub fn is_fresh(&self, now: DateTime<Utc>, max_age_days: u32) -> bool {
        now.signed_duration_since(self.created_at) < Duration::days(i64::from(max_age_days))
    }
}

/// Persistent cache of raw API response bodies keyed by request URL.
///
/// Writes replace the previous entry for the key and reset its creation
/// timestamp. Reads only return entries younger than the requested age.
#[async_trait]
pub trait ResponseCache: Send + Sync {
    /// Fetch the entry for `key` if it was written less than
    /// `max_age_days` ago.
    async fn get(&self, key: &str, max_age_days: u32) -> Result<Option<CachedResponse>>;

    /// Store `body` under `key`, stamped with the current time.
    async fn put(&self, key: &str, body: &[u8]) -> Result<()>;

    /// Remove the entry for `key`, if any.
    async fn remove(&self, key: &str) -> Result<()>;

    /// Drop every entry.
    async fn clear(&self) -> Result<()>;
}
