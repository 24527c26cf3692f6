//! Response cache backed by SQLite

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::{CachedResponse, ResponseCache},
    time::{Clock, SystemClock},
};
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePool, Row};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS response_cache (
        key TEXT PRIMARY KEY,
        body BLOB NOT NULL,
        created_at INTEGER NOT NULL
    )
"#;

/// Stores raw API response bodies keyed by request URL.
///
/// `created_at` is kept in milliseconds and compared against the injected
/// [`Clock`] on every read.
pub struct SqliteResponseCache {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl SqliteResponseCache {
    pub async fn new(db_path: PathBuf) -> Result<Self> {
        let pool = crate::open_pool(&db_path).await?;
        Self::init(pool, Arc::new(SystemClock)).await
    }

    /// In-memory cache with an explicit clock (for testing)
    pub async fn in_memory(clock: Arc<dyn Clock>) -> Result<Self> {
        let pool = crate::open_memory_pool().await?;
        Self::init(pool, clock).await
    }

    async fn init(pool: SqlitePool, clock: Arc<dyn Clock>) -> Result<Self> {
        sqlx::query(SCHEMA)
            .execute(&pool)
            .await
            .map_err(|e| BridgeError::DatabaseError(format!("Failed to create table: {}", e)))?;

        Ok(Self { pool, clock })
    }
}

#[async_trait]
impl ResponseCache for SqliteResponseCache {
    async fn get(&self, key: &str, max_age_days: u32) -> Result<Option<CachedResponse>> {
        let row = sqlx::query("SELECT body, created_at FROM response_cache WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| BridgeError::DatabaseError(format!("Failed to read cache: {}", e)))?;

        let Some(row) = row else {
            debug!("Cache miss");
            return Ok(None);
        };

        let body: Vec<u8> = row.get(0);
        let created_millis: i64 = row.get(1);
        let created_at = DateTime::<Utc>::from_timestamp_millis(created_millis).ok_or_else(|| {
            BridgeError::DatabaseError(format!("Invalid cache timestamp: {}", created_millis))
        })?;

        let entry = CachedResponse::new(body, created_at);
        if entry.is_fresh(self.clock.now(), max_age_days) {
            debug!(age_days = (self.clock.now() - created_at).num_days(), "Cache hit");
            Ok(Some(entry))
        } else {
            debug!(max_age_days, "Cache entry expired");
            Ok(None)
        }
    }

    async fn put(&self, key: &str, body: &[u8]) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO response_cache (key, body, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                body = excluded.body,
                created_at = excluded.created_at
            "#,
        )
        .bind(key)
        .bind(body)
        .bind(self.clock.now().timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(|e| BridgeError::DatabaseError(format!("Failed to write cache: {}", e)))?;

        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM response_cache WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| BridgeError::DatabaseError(format!("Failed to delete entry: {}", e)))?;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        sqlx::query("DELETE FROM response_cache")
            .execute(&self.pool)
            .await
            .map_err(|e| BridgeError::DatabaseError(format!("Failed to clear cache: {}", e)))?;

        debug!("Cleared response cache");
        Ok(())
    }
}
