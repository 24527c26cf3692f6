//! End-to-end tests for the companion core façade
//!
//! The core runs against a scripted game API, SQLite stores held in memory
//! and an in-memory secret store.

use async_trait::async_trait;
use bridge_desktop::{SqliteResponseCache, SqliteSettingsStore};
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::storage::{SecureStore, SettingsStore};
use bridge_traits::time::SystemClock;
use bridge_traits::{HttpClient, HttpRequest, HttpResponse};
use bytes::Bytes;
use core_auth::{OAuthConfig, StaticCredentials};
use core_roster::CharacterKey;
use core_runtime::config::{ApiRegion, ApiSettings, CompanionConfig, SyncConfig};
use core_runtime::events::{CoreEvent, SyncEvent};
use core_service::{CompanionCore, CoreError};
use core_sync::{SyncError, SyncOutcome};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const HOST: &str = "https://eu.api.blizzard.com";

// ============================================================================
// Fakes
// ============================================================================

/// Game API answering fixed bodies by URL path.
#[derive(Default)]
struct FakeApi {
    bodies: HashMap<String, String>,
    calls: Mutex<Vec<String>>,
}

impl FakeApi {
    fn journal() -> Self {
        let mut bodies = HashMap::new();
        bodies.insert(
            "/data/wow/journal-expansion/index".to_string(),
            format!(r#"{{"tiers": [{}]}}"#, stub("journal-expansion", 503, "Dragonflight")),
        );
        bodies.insert(
            "/data/wow/journal-expansion/503".to_string(),
            format!(
                r#"{{"id": 503, "name": "Dragonflight", "raids": [{}], "dungeons": [{}]}}"#,
                stub("journal-instance", 1200, "Vault of the Incarnates"),
                stub("journal-instance", 1196, "Brackenhide Hollow"),
            ),
        );
        bodies.insert(
            "/data/wow/journal-instance/1200".to_string(),
            instance(1200, "Vault of the Incarnates", "RAID"),
        );
        bodies.insert(
            "/data/wow/journal-instance/1196".to_string(),
            instance(1196, "Brackenhide Hollow", "DUNGEON"),
        );
        bodies.insert(
            "/profile/user/wow".to_string(),
            r#"{"id": 9, "wow_accounts": [{"id": 1, "characters": [
                {"name": "Thrall", "id": 1, "level": 70, "realm": {"name": "Silvermoon", "id": 3391, "slug": "silvermoon"}, "faction": {"type": "HORDE", "name": "Horde"}},
                {"name": "Jaina", "id": 2, "level": 12, "realm": {"name": "Silvermoon", "id": 3391, "slug": "silvermoon"}},
                {"name": "Anduin", "id": 3, "level": 60, "realm": {"name": "Silvermoon", "id": 3391, "slug": "silvermoon"}}
            ]}]}"#
                .to_string(),
        );
        Self {
            bodies,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn calls_to(&self, path: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|called| called.as_str() == path)
            .count()
    }
}

#[async_trait]
impl HttpClient for FakeApi {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        let path = url::Url::parse(&request.url).unwrap().path().to_string();
        self.calls.lock().unwrap().push(path.clone());

        match self.bodies.get(&path) {
            Some(body) => Ok(HttpResponse::new(200, Bytes::from(body.clone()))),
            None => Ok(HttpResponse::new(404, Bytes::new())),
        }
    }
}

#[derive(Default)]
struct MemorySecureStore {
    secrets: Mutex<HashMap<String, Vec<u8>>>,
}

#[async_trait]
impl SecureStore for MemorySecureStore {
    async fn set_secret(&self, key: &str, value: &[u8]) -> BridgeResult<()> {
        self.secrets
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn get_secret(&self, key: &str) -> BridgeResult<Option<Vec<u8>>> {
        Ok(self.secrets.lock().unwrap().get(key).cloned())
    }

    async fn delete_secret(&self, key: &str) -> BridgeResult<()> {
        self.secrets
            .lock()
            .unwrap()
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| BridgeError::NotAvailable(key.to_string()))
    }
}

// ============================================================================
// Fixtures
// ============================================================================

fn stub(kind: &str, id: i64, name: &str) -> String {
    format!(
        r#"{{"key": {{"href": "{HOST}/data/wow/{kind}/{id}?namespace=static-10.2.0_51825-eu"}}, "name": "{name}", "id": {id}}}"#
    )
}

fn instance(id: i64, name: &str, category: &str) -> String {
    format!(
        r#"{{"id": {id}, "name": "{name}", "encounters": [], "modes": [], "minimum_level": 70, "category": {{"type": "{category}"}}}}"#
    )
}

struct Setup {
    api: Arc<FakeApi>,
    settings: Arc<SqliteSettingsStore>,
    config: CompanionConfig,
}

async fn setup(api: Option<ApiSettings>) -> Setup {
    let api_client = Arc::new(FakeApi::journal());
    let settings = Arc::new(SqliteSettingsStore::in_memory().await.unwrap());
    let cache = Arc::new(SqliteResponseCache::in_memory(Arc::new(SystemClock)).await.unwrap());

    let mut builder = CompanionConfig::builder()
        .sync(SyncConfig::without_delays())
        .http_client(api_client.clone())
        .settings_store(settings.clone())
        .secure_store(Arc::new(MemorySecureStore::default()))
        .response_cache(cache);
    if let Some(api) = api {
        builder = builder.api(api);
    }

    Setup {
        api: api_client,
        settings,
        config: builder.build().await.unwrap(),
    }
}

async fn core(setup: Setup) -> (CompanionCore, Arc<FakeApi>, Arc<SqliteSettingsStore>) {
    let core = CompanionCore::new(setup.config, Arc::new(StaticCredentials::new("test-token")))
        .await
        .unwrap();
    (core, setup.api, setup.settings)
}

fn names(entries: Vec<core_roster::RosterEntry>) -> Vec<String> {
    entries.into_iter().map(|e| e.character.name).collect()
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_api_settings_fall_back_to_europe() {
    let (core, _, _) = core(setup(None).await).await;

    assert_eq!(
        core.api_settings(),
        &ApiSettings::for_region(ApiRegion::Europe, "en_GB")
    );
}

#[tokio::test]
async fn test_api_settings_read_from_settings_store() {
    let setup = setup(None).await;
    setup
        .settings
        .set_string("APIRegionHost", "https://us.api.blizzard.com/")
        .await
        .unwrap();
    setup.settings.set_i64("loginRegion", 1).await.unwrap();
    setup.settings.set_string("localeCode", "en_US").await.unwrap();

    let (core, _, _) = core(setup).await;

    assert_eq!(
        core.api_settings(),
        &ApiSettings::for_region(ApiRegion::Americas, "en_US")
    );
}

#[tokio::test]
async fn test_sync_fills_the_store_once() {
    let (core, api, _) = core(setup(Some(ApiSettings::for_region(ApiRegion::Europe, "en_GB"))).await).await;

    let outcome = core.sync_game_data().await;
    let SyncOutcome::Completed(summary) = outcome else {
        panic!("sync did not complete: {:?}", outcome);
    };
    assert_eq!((summary.expansions, summary.raids, summary.dungeons), (1, 1, 1));

    let snapshot = core.snapshot().await;
    assert_eq!(snapshot.raids[0].name, "Vault of the Incarnates");
    assert_eq!(snapshot.dungeons[0].name, "Brackenhide Hollow");

    let calls = api.calls();
    assert_eq!(core.sync_game_data().await, SyncOutcome::Skipped);
    assert_eq!(api.calls(), calls);
    assert!(core.last_refreshed().await.unwrap().is_some());
}

#[tokio::test]
async fn test_refresh_clears_and_reloads() {
    let (core, api, _) = core(setup(Some(ApiSettings::for_region(ApiRegion::Europe, "en_GB"))).await).await;
    core.sync_game_data().await;
    let first_saved = core.last_refreshed().await.unwrap().unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    let mut events = core.event_bus().subscribe();
    let outcome = core.refresh_game_data().await;

    assert!(matches!(outcome, SyncOutcome::Completed(_)));
    assert_eq!(core.snapshot().await.expansions.len(), 1);
    assert_eq!(api.calls_to("/data/wow/journal-expansion/index"), 2);
    assert!(core.last_refreshed().await.unwrap().unwrap() > first_saved);

    let mut cleared = false;
    while let Ok(event) = events.try_recv() {
        if event == CoreEvent::Sync(SyncEvent::DataCleared) {
            cleared = true;
        }
    }
    assert!(cleared);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_overlapping_refreshes_keep_data_whole() {
    let (core, _, _) = core(setup(Some(ApiSettings::for_region(ApiRegion::Europe, "en_GB"))).await).await;
    let core = Arc::new(core);
    core.sync_game_data().await;

    let refreshes: Vec<_> = (0..4)
        .map(|_| {
            let core = core.clone();
            tokio::spawn(async move { core.refresh_game_data().await })
        })
        .collect();

    let mut completed = 0;
    for refresh in refreshes {
        match refresh.await.unwrap() {
            SyncOutcome::Completed(summary) => {
                assert_eq!((summary.expansions, summary.raids, summary.dungeons), (1, 1, 1));
                completed += 1;
            }
            SyncOutcome::Skipped => {}
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    assert!(completed >= 1);
    let snapshot = core.snapshot().await;
    assert_eq!(
        (snapshot.expansions.len(), snapshot.raids.len(), snapshot.dungeons.len()),
        (1, 1, 1)
    );
    assert!(snapshot.loading_allowed);
}

#[tokio::test]
async fn test_characters_are_ordered_ignored_and_restored() {
    let (core, _, settings) = core(setup(Some(ApiSettings::for_region(ApiRegion::Europe, "en_GB"))).await).await;

    let loaded = core.load_characters().await.unwrap();
    assert_eq!(names(loaded), vec!["Thrall", "Jaina", "Anduin"]);

    core.move_characters(&[2], 0).await.unwrap();
    assert_eq!(names(core.characters().await), vec!["Anduin", "Thrall", "Jaina"]);

    core.ignore_character(1).await.unwrap();
    assert_eq!(names(core.ignored_characters().await), vec!["Thrall"]);
    assert_eq!(
        settings.get_i64("characterOrderThrall1silvermoon").await.unwrap(),
        Some(1051)
    );

    let eligible: Vec<_> = core
        .raid_eligible_characters()
        .await
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(eligible, vec!["Anduin"]);

    core.restore_character(&CharacterKey::new("Thrall", 1, "silvermoon"))
        .await
        .unwrap();
    assert!(core.ignored_characters().await.is_empty());
    assert_eq!(core.characters().await.len(), 3);
}

#[tokio::test]
async fn test_encoded_suggestions_carry_avatar_names() {
    let (core, _, _) = core(setup(Some(ApiSettings::for_region(ApiRegion::Europe, "en_GB"))).await).await;
    core.load_characters().await.unwrap();

    let payload = core
        .encode_character_suggestions("characterAvatar")
        .await
        .unwrap();
    let text = String::from_utf8(payload).unwrap();

    assert!(text.contains("characterAvatar-thrall-silvermoon"));
    assert!(text.contains("HORDE"));
}

#[tokio::test]
async fn test_restore_of_unknown_character_is_an_error() {
    let (core, _, _) = core(setup(Some(ApiSettings::for_region(ApiRegion::Europe, "en_GB"))).await).await;
    core.load_characters().await.unwrap();

    let result = core
        .restore_character(&CharacterKey::new("Garrosh", 7, "silvermoon"))
        .await;

    assert!(matches!(result, Err(CoreError::Roster(_))));
}

#[tokio::test]
async fn test_signed_out_profile_load_gives_up() {
    let setup = setup(Some(ApiSettings::for_region(ApiRegion::Europe, "en_GB"))).await;
    let api = setup.api.clone();
    let core = CompanionCore::with_oauth(setup.config, OAuthConfig::new("client-id"))
        .await
        .unwrap();

    let result = core.load_characters().await;

    assert!(matches!(
        result,
        Err(CoreError::Sync(SyncError::RetryCeiling { attempts: 6, .. }))
    ));
    assert_eq!(api.calls(), 0);
}
