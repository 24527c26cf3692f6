//! Core service façade.
//!
//! [`CompanionCore`] wires a resolved [`CompanionConfig`] and a
//! [`CredentialProvider`] into the game data pipeline, the profile fetcher
//! and the character roster, all publishing on one [`EventBus`].
//!
//! ```no_run
//! # async fn example() -> core_service::Result<()> {
//! use core_runtime::config::CompanionConfig;
//! use core_auth::OAuthConfig;
//! use core_service::CompanionCore;
//!
//! let config = CompanionConfig::builder().build().await?;
//! let core = CompanionCore::with_oauth(config, OAuthConfig::new("my-client-id")).await?;
//!
//! core.sync_game_data().await;
//! let characters = core.load_characters().await?;
//! # Ok(())
//! # }
//! ```

pub mod error;

pub use error::{CoreError, Result};

use chrono::{DateTime, Utc};
use core_auth::{CredentialProvider, OAuthClient, OAuthConfig, OAuthCredentialProvider, TokenStore};
use core_journal::Character;
use core_roster::{CharacterKey, CharacterSuggestion, Roster, RosterEntry, SettingsOrderStore};
use core_runtime::config::{ApiSettings, CompanionConfig};
use core_runtime::events::{EventBus, EventStream};
use core_sync::{GameDataSnapshot, GameDataStore, JournalFetcher, ProfileFetcher, SyncOutcome, SyncPipeline};
use std::sync::Arc;
use tracing::{info, instrument};

/// Primary façade exposed to host applications.
pub struct CompanionCore {
    api: ApiSettings,
    event_bus: EventBus,
    store: Arc<GameDataStore>,
    pipeline: SyncPipeline,
    profile: ProfileFetcher,
    roster: Roster,
}

impl CompanionCore {
    /// Build the core from a validated config and a credential source.
    ///
    /// API settings come from the config when set, otherwise from the
    /// settings store.
    pub async fn new(
        config: CompanionConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self> {
        let event_bus = EventBus::new(config.event_buffer_size);
        Self::with_event_bus(config, credentials, event_bus).await
    }

    /// Build the core with tokens from the secure store, refreshed through
    /// `oauth`.
    pub async fn with_oauth(config: CompanionConfig, oauth: OAuthConfig) -> Result<Self> {
        let event_bus = EventBus::new(config.event_buffer_size);
        let credentials = OAuthCredentialProvider::new(TokenStore::new(config.secure_store.clone()))
            .with_oauth(OAuthClient::new(oauth, config.http_client.clone()))
            .with_event_bus(event_bus.clone());
        Self::with_event_bus(config, Arc::new(credentials), event_bus).await
    }

    async fn with_event_bus(
        config: CompanionConfig,
        credentials: Arc<dyn CredentialProvider>,
        event_bus: EventBus,
    ) -> Result<Self> {
        config.validate()?;
        let api = config.resolve_api().await?;

        let fetcher = JournalFetcher::new(config.http_client.clone(), credentials);
        let store = Arc::new(GameDataStore::new(
            config.sync.estimated_items_to_download,
            event_bus.clone(),
        ));
        let pipeline = SyncPipeline::new(
            fetcher.clone(),
            config.response_cache.clone(),
            api.clone(),
            config.sync.clone(),
            store.clone(),
            event_bus.clone(),
        );
        let profile = ProfileFetcher::new(fetcher, api.clone(), config.sync.clone());
        let roster = Roster::new(
            Arc::new(SettingsOrderStore::new(config.settings_store.clone())),
            event_bus.clone(),
        );

        info!(host = %api.host, region = %api.region_code, locale = %api.locale, "Companion core ready");
        Ok(Self {
            api,
            event_bus,
            store,
            pipeline,
            profile,
            roster,
        })
    }

    pub fn api_settings(&self) -> &ApiSettings {
        &self.api
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn subscribe(&self) -> EventStream {
        EventStream::new(self.event_bus.subscribe())
    }

    pub fn game_data(&self) -> &Arc<GameDataStore> {
        &self.store
    }

    pub async fn snapshot(&self) -> GameDataSnapshot {
        self.store.snapshot().await
    }

    // ------------------------------------------------------------------
    // Game data
    // ------------------------------------------------------------------

    /// Download the game journal unless it is loaded or already loading.
    pub async fn sync_game_data(&self) -> SyncOutcome {
        self.pipeline.run().await
    }

    /// Drop the loaded game data and download it again, starting from a
    /// fresh expansion index.
    ///
    /// Refused with [`SyncOutcome::Skipped`] while a run holds the loading
    /// gate or after a run stalled.
    pub async fn refresh_game_data(&self) -> SyncOutcome {
        self.pipeline.refresh().await
    }

    /// When the saved expansion index was downloaded, if one is still fresh.
    pub async fn last_refreshed(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self.pipeline.last_refreshed().await?)
    }

    // ------------------------------------------------------------------
    // Characters
    // ------------------------------------------------------------------

    /// Fetch the profile and order its characters.
    #[instrument(skip(self))]
    pub async fn load_characters(&self) -> Result<Vec<RosterEntry>> {
        let characters = self.profile.fetch_characters().await?;
        self.roster.apply_order(characters).await?;
        Ok(self.roster.characters().await)
    }

    pub async fn characters(&self) -> Vec<RosterEntry> {
        self.roster.characters().await
    }

    pub async fn ignored_characters(&self) -> Vec<RosterEntry> {
        self.roster.ignored_characters().await
    }

    pub async fn raid_eligible_characters(&self) -> Vec<Character> {
        self.roster.raid_eligible().await
    }

    pub async fn move_characters(&self, sources: &[usize], destination: usize) -> Result<()> {
        Ok(self.roster.move_characters(sources, destination).await?)
    }

    pub async fn ignore_character(&self, index: usize) -> Result<()> {
        Ok(self.roster.ignore_character(index).await?)
    }

    pub async fn restore_character(&self, key: &CharacterKey) -> Result<()> {
        Ok(self.roster.restore_character(key).await?)
    }

    pub async fn character_suggestions(&self, avatar_prefix: &str) -> Vec<CharacterSuggestion> {
        self.roster.character_suggestions(avatar_prefix).await
    }

    /// Suggestions as the JSON payload shared with widgets.
    pub async fn encode_character_suggestions(&self, avatar_prefix: &str) -> Result<Vec<u8>> {
        let suggestions = self.character_suggestions(avatar_prefix).await;
        Ok(core_roster::encode_suggestions(&suggestions)?)
    }
}
