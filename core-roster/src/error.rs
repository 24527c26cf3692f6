use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RosterError {
    #[error("Character index {index} out of range ({len} active characters)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Character {name}-{realm_slug} is not ignored")]
    NotIgnored { name: String, realm_slug: String },

    #[error("Order storage failed: {0}")]
    Storage(#[from] BridgeError),

    #[error("Failed to encode suggestions: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RosterError>;
