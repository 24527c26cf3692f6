//! # Core Configuration Module
//!
//! Configuration for the companion core.
//!
//! ## Overview
//!
//! [`CompanionConfig`] holds the host bridges, the game API settings and the
//! sync tuning. It is assembled with [`CompanionConfigBuilder`], which fails
//! fast when a required bridge is missing.
//!
//! ## Required Dependencies
//!
//! - `HttpClient` - game API requests (desktop default: reqwest)
//! - `SettingsStore` - region, locale and character order (desktop default: SQLite)
//! - `SecureStore` - OAuth token persistence (desktop default: OS keyring)
//! - `ResponseCache` - raw API responses (desktop default: SQLite)
//!
//! With the `desktop-shims` feature enabled, missing bridges are replaced by
//! the `bridge-desktop` implementations, stored under `data_dir`.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{ApiRegion, ApiSettings, CompanionConfig};
//!
//! let config = CompanionConfig::builder()
//!     .data_dir("/home/me/.local/share/game-companion")
//!     .api(ApiSettings::for_region(ApiRegion::Europe, "en_GB"))
//!     .build()
//!     .await?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{HttpClient, ResponseCache, SecureStore, SettingsStore};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::events::DEFAULT_EVENT_BUFFER_SIZE;

/// Settings key holding the API host URL.
pub const SETTINGS_KEY_REGION_HOST: &str = "APIRegionHost";
/// Settings key holding the index into [`ApiRegion::ALL`].
pub const SETTINGS_KEY_LOGIN_REGION: &str = "loginRegion";
/// Settings key holding the locale code.
pub const SETTINGS_KEY_LOCALE: &str = "localeCode";

pub const DEFAULT_LOCALE: &str = "en_GB";

// ============================================================================
// API Settings
// ============================================================================

/// Regions served by the game data API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApiRegion {
    Europe,
    Americas,
    Korea,
    Taiwan,
    China,
}

impl ApiRegion {
    /// Login region order. The persisted `loginRegion` integer indexes this.
    pub const ALL: [ApiRegion; 5] = [
        ApiRegion::Europe,
        ApiRegion::Americas,
        ApiRegion::Korea,
        ApiRegion::Taiwan,
        ApiRegion::China,
    ];

    /// Short code used in `static-{code}` / `profile-{code}` namespaces.
    pub fn code(&self) -> &'static str {
        match self {
            ApiRegion::Europe => "eu",
            ApiRegion::Americas => "us",
            ApiRegion::Korea => "kr",
            ApiRegion::Taiwan => "tw",
            ApiRegion::China => "cn",
        }
    }

    pub fn host(&self) -> &'static str {
        match self {
            ApiRegion::Europe => "https://eu.api.blizzard.com",
            ApiRegion::Americas => "https://us.api.blizzard.com",
            ApiRegion::Korea => "https://kr.api.blizzard.com",
            ApiRegion::Taiwan => "https://tw.api.blizzard.com",
            ApiRegion::China => "https://gateway.battlenet.com.cn",
        }
    }

    pub fn from_index(index: i64) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }
}

/// Where and how to query the game API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiSettings {
    /// e.g. `https://eu.api.blizzard.com`, no trailing slash
    pub host: String,
    /// e.g. `eu`
    pub region_code: String,
    /// e.g. `en_GB`
    pub locale: String,
}

impl ApiSettings {
    pub fn for_region(region: ApiRegion, locale: impl Into<String>) -> Self {
        Self {
            host: region.host().to_string(),
            region_code: region.code().to_string(),
            locale: locale.into(),
        }
    }

    /// Read the persisted API settings, falling back to Europe / `en_GB`.
    ///
    /// The host and the region index are stored independently, so a host
    /// from one region combined with another region's namespace is kept as
    /// the user configured it.
    pub async fn load(store: &dyn SettingsStore) -> Result<Self> {
        let host = store
            .get_string(SETTINGS_KEY_REGION_HOST)
            .await?
            .unwrap_or_else(|| ApiRegion::Europe.host().to_string());

        let region_index = store.get_i64(SETTINGS_KEY_LOGIN_REGION).await?.unwrap_or(0);
        let region = ApiRegion::from_index(region_index).ok_or_else(|| Error::InvalidSetting {
            key: SETTINGS_KEY_LOGIN_REGION,
            message: format!("no region at index {}", region_index),
        })?;

        let locale = store
            .get_string(SETTINGS_KEY_LOCALE)
            .await?
            .unwrap_or_else(|| DEFAULT_LOCALE.to_string());

        let settings = Self {
            host: host.trim_end_matches('/').to_string(),
            region_code: region.code().to_string(),
            locale,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// `static-{region}`, the namespace of game reference data.
    pub fn static_namespace(&self) -> String {
        format!("static-{}", self.region_code)
    }

    /// `profile-{region}`, the namespace of account data.
    pub fn profile_namespace(&self) -> String {
        format!("profile-{}", self.region_code)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.host.starts_with("https://") || self.host.starts_with("http://")) {
            return Err(Error::Config(format!(
                "API host must be an http(s) URL, got '{}'",
                self.host
            )));
        }
        if self.region_code.is_empty() {
            return Err(Error::Config("Region code cannot be empty".to_string()));
        }
        if self.locale.is_empty() {
            return Err(Error::Config("Locale cannot be empty".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// Sync Tuning
// ============================================================================

/// Tuning of the game data pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// A stage stalls once either retry counter exceeds this value.
    pub retry_ceiling: u32,
    /// Fixed delay before a stage is retried.
    pub retry_delay: Duration,
    /// Pause before decoding each raid or dungeon payload.
    pub decode_delay: Duration,
    /// Maximum age of a cached expansion index.
    pub index_max_age_days: u32,
    /// Progress denominator used until the real item count is known.
    pub estimated_items_to_download: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            retry_ceiling: 5,
            retry_delay: Duration::from_secs(1),
            decode_delay: Duration::from_millis(100),
            index_max_age_days: 90,
            estimated_items_to_download: 100,
        }
    }
}

impl SyncConfig {
    /// Default tuning with every delay removed.
    pub fn without_delays() -> Self {
        Self {
            retry_delay: Duration::ZERO,
            decode_delay: Duration::ZERO,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.retry_ceiling == 0 {
            return Err(Error::Config(
                "Retry ceiling must be greater than 0".to_string(),
            ));
        }
        if self.index_max_age_days == 0 {
            return Err(Error::Config(
                "Index cache age must be at least one day".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Companion Config
// ============================================================================

/// Everything the companion core needs to start.
#[derive(Clone)]
pub struct CompanionConfig {
    /// Directory holding the desktop databases
    pub data_dir: Option<PathBuf>,
    /// API settings; `None` means read them from the settings store
    pub api: Option<ApiSettings>,
    pub sync: SyncConfig,
    pub event_buffer_size: usize,
    pub http_client: Arc<dyn HttpClient>,
    pub settings_store: Arc<dyn SettingsStore>,
    pub secure_store: Arc<dyn SecureStore>,
    pub response_cache: Arc<dyn ResponseCache>,
}

impl fmt::Debug for CompanionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompanionConfig")
            .field("data_dir", &self.data_dir)
            .field("api", &self.api)
            .field("sync", &self.sync)
            .field("event_buffer_size", &self.event_buffer_size)
            .field("http_client", &"HttpClient { ... }")
            .field("settings_store", &"SettingsStore { ... }")
            .field("secure_store", &"SecureStore { ... }")
            .field("response_cache", &"ResponseCache { ... }")
            .finish()
    }
}

impl CompanionConfig {
    pub fn builder() -> CompanionConfigBuilder {
        CompanionConfigBuilder::default()
    }

    /// Resolve the API settings, reading the settings store when none were
    /// configured explicitly.
    pub async fn resolve_api(&self) -> Result<ApiSettings> {
        match &self.api {
            Some(api) => Ok(api.clone()),
            None => ApiSettings::load(self.settings_store.as_ref()).await,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(api) = &self.api {
            api.validate()?;
        }
        self.sync.validate()?;

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for [`CompanionConfig`].
#[derive(Default)]
pub struct CompanionConfigBuilder {
    data_dir: Option<PathBuf>,
    api: Option<ApiSettings>,
    sync: Option<SyncConfig>,
    event_buffer_size: Option<usize>,
    http_client: Option<Arc<dyn HttpClient>>,
    settings_store: Option<Arc<dyn SettingsStore>>,
    secure_store: Option<Arc<dyn SecureStore>>,
    response_cache: Option<Arc<dyn ResponseCache>>,
}

impl CompanionConfigBuilder {
    /// Directory for the desktop settings and cache databases.
    pub fn data_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.data_dir = Some(path.into());
        self
    }

    /// Fix the API settings instead of reading them from the settings store.
    pub fn api(mut self, api: ApiSettings) -> Self {
        self.api = Some(api);
        self
    }

    pub fn sync(mut self, sync: SyncConfig) -> Self {
        self.sync = Some(sync);
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    pub fn secure_store(mut self, store: Arc<dyn SecureStore>) -> Self {
        self.secure_store = Some(store);
        self
    }

    pub fn response_cache(mut self, cache: Arc<dyn ResponseCache>) -> Self {
        self.response_cache = Some(cache);
        self
    }

    /// Build the configuration, filling missing bridges with the desktop
    /// defaults when the `desktop-shims` feature is enabled.
    ///
    /// # Errors
    ///
    /// - [`Error::CapabilityMissing`] when a bridge is missing and no default exists
    /// - [`Error::Config`] when a value is invalid
    pub async fn build(self) -> Result<CompanionConfig> {
        let data_dir = match self.data_dir {
            Some(dir) => Some(dir),
            None => defaults::data_dir(),
        };

        let http_client = match self.http_client {
            Some(client) => client,
            None => defaults::http_client()?,
        };

        let settings_store = match self.settings_store {
            Some(store) => store,
            None => defaults::settings_store(data_dir.as_ref()).await?,
        };

        let secure_store = match self.secure_store {
            Some(store) => store,
            None => defaults::secure_store()?,
        };

        let response_cache = match self.response_cache {
            Some(cache) => cache,
            None => defaults::response_cache(data_dir.as_ref()).await?,
        };

        let config = CompanionConfig {
            data_dir,
            api: self.api,
            sync: self.sync.unwrap_or_default(),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            http_client,
            settings_store,
            secure_store,
            response_cache,
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(feature = "desktop-shims")]
mod defaults {
    use super::*;
    use bridge_desktop::{
        KeyringSecureStore, ReqwestHttpClient, SqliteResponseCache, SqliteSettingsStore,
    };

    fn require_dir(data_dir: Option<&PathBuf>, what: &str) -> Result<PathBuf> {
        data_dir.cloned().ok_or_else(|| {
            Error::Config(format!(
                "No data directory available for the default {}. Use .data_dir() to set one.",
                what
            ))
        })
    }

    pub(super) fn data_dir() -> Option<PathBuf> {
        bridge_desktop::default_data_dir().ok()
    }

    pub(super) fn http_client() -> Result<Arc<dyn HttpClient>> {
        Ok(Arc::new(ReqwestHttpClient::new()?))
    }

    pub(super) async fn settings_store(data_dir: Option<&PathBuf>) -> Result<Arc<dyn SettingsStore>> {
        let path = require_dir(data_dir, "SettingsStore")?.join("settings.db");
        Ok(Arc::new(SqliteSettingsStore::new(path).await?))
    }

    pub(super) fn secure_store() -> Result<Arc<dyn SecureStore>> {
        Ok(Arc::new(KeyringSecureStore::new()))
    }

    pub(super) async fn response_cache(data_dir: Option<&PathBuf>) -> Result<Arc<dyn ResponseCache>> {
        let path = require_dir(data_dir, "ResponseCache")?.join("cache.db");
        Ok(Arc::new(SqliteResponseCache::new(path).await?))
    }
}

#[cfg(not(feature = "desktop-shims"))]
mod defaults {
    use super::*;

    fn missing(capability: &str, purpose: &str) -> Error {
        Error::CapabilityMissing {
            capability: capability.to_string(),
            message: format!(
                "{} implementation is required for {}. \
                 Desktop: enable the 'desktop-shims' feature. \
                 Mobile: inject the platform-native adapter.",
                capability, purpose
            ),
        }
    }

    pub(super) fn data_dir() -> Option<PathBuf> {
        None
    }

    pub(super) fn http_client() -> Result<Arc<dyn HttpClient>> {
        Err(missing("HttpClient", "game API requests"))
    }

    pub(super) async fn settings_store(_data_dir: Option<&PathBuf>) -> Result<Arc<dyn SettingsStore>> {
        Err(missing("SettingsStore", "region, locale and character order"))
    }

    pub(super) fn secure_store() -> Result<Arc<dyn SecureStore>> {
        Err(missing("SecureStore", "credential persistence"))
    }

    pub(super) async fn response_cache(_data_dir: Option<&PathBuf>) -> Result<Arc<dyn ResponseCache>> {
        Err(missing("ResponseCache", "caching API responses"))
    }
}
