//! Request building and execution shared by the pipeline and the profile
//! fetcher.
//!
//! URLs produced here carry the namespace and locale but no access token.
//! They double as response cache keys; the token is appended by the
//! [`CredentialProvider`] right before the request goes out.

use crate::error::FetchError;
use bridge_traits::http::{HttpClient, HttpRequest};
use bytes::Bytes;
use core_auth::CredentialProvider;
use core_journal::Stub;
use core_runtime::config::ApiSettings;
use core_runtime::logging::redact_url;
use std::sync::Arc;
use tracing::debug;
use url::Url;

const EXPANSION_INDEX_PATH: &str = "/data/wow/journal-expansion/index";
const USER_PROFILE_PATH: &str = "/profile/user/wow";

/// `{host}/data/wow/journal-expansion/index?namespace=static-{region}&locale={locale}`
pub fn expansion_index_url(settings: &ApiSettings) -> Result<String, FetchError> {
    let namespace = settings.static_namespace();
    build_url(
        &format!("{}{}", settings.host, EXPANSION_INDEX_PATH),
        &[("namespace", &namespace), ("locale", &settings.locale)],
    )
}

/// `{host}/profile/user/wow?namespace=profile-{region}&locale={locale}`
pub fn user_profile_url(settings: &ApiSettings) -> Result<String, FetchError> {
    let namespace = settings.profile_namespace();
    build_url(
        &format!("{}{}", settings.host, USER_PROFILE_PATH),
        &[("namespace", &namespace), ("locale", &settings.locale)],
    )
}

/// The stub's own href (which already names its namespace) plus the locale.
pub fn detail_url(stub: &Stub, settings: &ApiSettings) -> Result<String, FetchError> {
    build_url(stub.href(), &[("locale", &settings.locale)])
}

fn build_url(base: &str, params: &[(&str, &str)]) -> Result<String, FetchError> {
    let mut url = Url::parse(base).map_err(|e| FetchError::InvalidUrl {
        url: base.to_string(),
        message: e.to_string(),
    })?;
    url.query_pairs_mut().extend_pairs(params.iter().copied());
    Ok(url.into())
}

/// Authorized `GET` requests returning the raw body of 2xx responses.
#[derive(Clone)]
pub struct JournalFetcher {
    http_client: Arc<dyn HttpClient>,
    credentials: Arc<dyn CredentialProvider>,
}

impl JournalFetcher {
    pub fn new(http_client: Arc<dyn HttpClient>, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            http_client,
            credentials,
        }
    }

    pub async fn get(&self, url: &str) -> Result<Bytes, FetchError> {
        let request = self
            .credentials
            .authorize(HttpRequest::get(url).accept_json())
            .await?;
        debug!(url = %redact_url(&request.url), "GET");

        let response = self.http_client.execute(request).await?;
        if !response.is_success() {
            return Err(FetchError::Status {
                status: response.status,
                url: url.to_string(),
            });
        }
        Ok(response.body)
    }
}
