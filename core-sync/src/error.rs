use bridge_traits::error::BridgeError;
use core_auth::AuthError;
use core_journal::JournalError;
use thiserror::Error;

/// Why a single request did not produce a response body.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Credentials unavailable: {0}")]
    Credentials(#[from] AuthError),

    #[error("Transport error: {0}")]
    Transport(#[from] BridgeError),

    #[error("Unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Invalid request URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },
}

#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Decode(#[from] JournalError),

    #[error("Gave up after {attempts} failed attempts: {last_error}")]
    RetryCeiling { attempts: u32, last_error: String },

    #[error("Response cache error: {0}")]
    Cache(#[from] BridgeError),
}

pub type Result<T> = std::result::Result<T, SyncError>;
