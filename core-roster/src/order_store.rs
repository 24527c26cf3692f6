//! Persisted per-character ordering.

use crate::error::Result;
use async_trait::async_trait;
use bridge_traits::storage::SettingsStore;
use core_journal::Character;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Settings key prefix for character orders.
pub const DEFAULT_ORDER_PREFIX: &str = "characterOrder";

/// Identifies a character across profile downloads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CharacterKey {
    pub name: String,
    pub id: i64,
    pub realm_slug: String,
}

impl CharacterKey {
    pub fn new(name: impl Into<String>, id: i64, realm_slug: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id,
            realm_slug: realm_slug.into(),
        }
    }

    /// `{prefix}{name}{id}{realm_slug}`, the layout existing installs use.
    pub fn storage_key(&self, prefix: &str) -> String {
        format!("{}{}{}{}", prefix, self.name, self.id, self.realm_slug)
    }
}

impl From<&Character> for CharacterKey {
    fn from(character: &Character) -> Self {
        Self::new(&character.name, character.id, &character.realm.slug)
    }
}

impl fmt::Display for CharacterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.name, self.realm_slug)
    }
}

/// Where character orders live. Absent entries read as 0.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn get_order(&self, key: &CharacterKey) -> Result<i64>;

    async fn set_order(&self, key: &CharacterKey, order: i64) -> Result<()>;
}

/// [`OrderStore`] on top of the host settings store.
pub struct SettingsOrderStore {
    settings: Arc<dyn SettingsStore>,
    prefix: String,
}

impl SettingsOrderStore {
    pub fn new(settings: Arc<dyn SettingsStore>) -> Self {
        Self::with_prefix(settings, DEFAULT_ORDER_PREFIX)
    }

    pub fn with_prefix(settings: Arc<dyn SettingsStore>, prefix: impl Into<String>) -> Self {
        Self {
            settings,
            prefix: prefix.into(),
        }
    }
}

#[async_trait]
impl OrderStore for SettingsOrderStore {
    async fn get_order(&self, key: &CharacterKey) -> Result<i64> {
        let order = self
            .settings
            .get_i64(&key.storage_key(&self.prefix))
            .await?;
        Ok(order.unwrap_or(0))
    }

    async fn set_order(&self, key: &CharacterKey, order: i64) -> Result<()> {
        self.settings
            .set_i64(&key.storage_key(&self.prefix), order)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_desktop::SqliteSettingsStore;

    #[test]
    fn test_storage_key_layout() {
        let key = CharacterKey::new("Thrall", 111, "silvermoon");
        assert_eq!(key.storage_key(DEFAULT_ORDER_PREFIX), "characterOrderThrall111silvermoon");
    }

    #[tokio::test]
    async fn test_missing_order_reads_as_zero() {
        let settings = Arc::new(SqliteSettingsStore::in_memory().await.unwrap());
        let store = SettingsOrderStore::new(settings);

        let order = store
            .get_order(&CharacterKey::new("Jaina", 2, "draenor"))
            .await
            .unwrap();
        assert_eq!(order, 0);
    }

    #[tokio::test]
    async fn test_orders_are_written_under_prefixed_key() {
        let settings = Arc::new(SqliteSettingsStore::in_memory().await.unwrap());
        let store = SettingsOrderStore::with_prefix(settings.clone(), "order.");
        let key = CharacterKey::new("Jaina", 2, "draenor");

        store.set_order(&key, 1052).await.unwrap();

        assert_eq!(store.get_order(&key).await.unwrap(), 1052);
        assert_eq!(
            settings.get_i64("order.Jaina2draenor").await.unwrap(),
            Some(1052)
        );
    }
}
