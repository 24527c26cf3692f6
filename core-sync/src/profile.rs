//! Account profile download.

use crate::error::{Result, SyncError};
use crate::fetch::{user_profile_url, JournalFetcher};
use core_journal::{decode, Character, UserProfile};
use core_runtime::config::{ApiSettings, SyncConfig};
use tokio::time::sleep;
use tracing::{info, instrument, warn};

/// Fetches the signed-in account's characters.
///
/// Failed requests are retried with the pipeline's ceiling and delay.
/// Decode errors are returned straight away.
pub struct ProfileFetcher {
    fetcher: JournalFetcher,
    settings: ApiSettings,
    config: SyncConfig,
}

impl ProfileFetcher {
    pub fn new(fetcher: JournalFetcher, settings: ApiSettings, config: SyncConfig) -> Self {
        Self {
            fetcher,
            settings,
            config,
        }
    }

    /// Characters of every account on the profile, in account order.
    #[instrument(skip(self))]
    pub async fn fetch_characters(&self) -> Result<Vec<Character>> {
        let url = user_profile_url(&self.settings)?;
        let mut connection_retries = 0u32;

        let body = loop {
            match self.fetcher.get(&url).await {
                Ok(body) => break body,
                Err(e) => {
                    connection_retries += 1;
                    if connection_retries > self.config.retry_ceiling {
                        return Err(SyncError::RetryCeiling {
                            attempts: connection_retries,
                            last_error: e.to_string(),
                        });
                    }
                    warn!(attempt = connection_retries, error = %e, "Profile fetch failed, retrying");
                    sleep(self.config.retry_delay).await;
                }
            }
        };

        let characters = decode::<UserProfile>(&body)?.into_characters();
        info!(characters = characters.len(), "Loaded user profile");
        Ok(characters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
    use bytes::Bytes;
    use core_auth::StaticCredentials;
    use core_runtime::config::ApiRegion;
    use mockall::{mock, Sequence};
    use std::sync::Arc;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        }
    }

    const PROFILE: &[u8] = br#"{"wow_accounts": [
        {"id": 1, "characters": [{"name": "Thrall", "id": 1, "level": 60, "realm": {"name": "Silvermoon", "id": 3391, "slug": "silvermoon"}}]},
        {"id": 2, "characters": [{"name": "Jaina", "id": 2, "level": 12, "realm": {"name": "Draenor", "id": 1403, "slug": "draenor"}}]}
    ]}"#;

    fn profile_fetcher(http: MockHttpClient) -> ProfileFetcher {
        ProfileFetcher::new(
            JournalFetcher::new(Arc::new(http), Arc::new(StaticCredentials::new("tok"))),
            ApiSettings::for_region(ApiRegion::Europe, "en_GB"),
            SyncConfig::without_delays(),
        )
    }

    #[tokio::test]
    async fn test_fetch_characters_retries_then_flattens() {
        let mut http = MockHttpClient::new();
        let mut seq = Sequence::new();
        http.expect_execute()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_| Err(BridgeError::OperationFailed("offline".to_string())));
        http.expect_execute()
            .withf(|req| req.url.contains("/profile/user/wow?namespace=profile-eu"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(HttpResponse::new(200, Bytes::from_static(PROFILE))));

        let characters = profile_fetcher(http).fetch_characters().await.unwrap();

        let names: Vec<_> = characters.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Thrall", "Jaina"]);
    }

    #[tokio::test]
    async fn test_fetch_characters_gives_up_past_ceiling() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .times(6)
            .returning(|_| Ok(HttpResponse::new(503, Bytes::new())));

        let result = profile_fetcher(http).fetch_characters().await;

        assert!(matches!(
            result,
            Err(SyncError::RetryCeiling { attempts: 6, .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_characters_reports_decode_error() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .times(1)
            .returning(|_| Ok(HttpResponse::new(200, Bytes::from_static(b"[]"))));

        let result = profile_fetcher(http).fetch_characters().await;
        assert!(matches!(result, Err(SyncError::Decode(_))));
    }
}
