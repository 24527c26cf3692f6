//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! - `HttpClient` using `reqwest`
//! - `SettingsStore` and `ResponseCache` using SQLite through `sqlx`
//! - `SecureStore` using the `keyring` crate
//!
//! ## Feature Flags
//!
//! - `secure-store`: Enable OS keychain integration (default)
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{ReqwestHttpClient, SqliteResponseCache, default_data_dir};
//!
//! let http_client = ReqwestHttpClient::new()?;
//! let cache = SqliteResponseCache::new(default_data_dir()?.join("cache.db")).await?;
//! ```

mod http;
mod response_cache;
mod settings;

#[cfg(feature = "secure-store")]
mod secure_store;

pub use http::ReqwestHttpClient;
pub use response_cache::SqliteResponseCache;
pub use settings::SqliteSettingsStore;

#[cfg(feature = "secure-store")]
pub use secure_store::KeyringSecureStore;

use bridge_traits::error::{BridgeError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Per-user data directory for the desktop companion
/// (`~/.local/share/game-companion` on Linux).
pub fn default_data_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|dir| dir.join("game-companion"))
        .ok_or_else(|| BridgeError::NotAvailable("No user data directory on this system".into()))
}

pub(crate) async fn open_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true);

    let pool = SqlitePool::connect_with(options)
        .await
        .map_err(|e| BridgeError::DatabaseError(format!("Failed to connect to DB: {}", e)))?;

    debug!(path = ?db_path, "Opened SQLite database");
    Ok(pool)
}

pub(crate) async fn open_memory_pool() -> Result<SqlitePool> {
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .map_err(|e| BridgeError::DatabaseError(format!("Failed to connect to DB: {}", e)))
}
