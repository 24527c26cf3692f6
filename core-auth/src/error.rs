use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Access token expired and no refresh is possible")]
    TokenExpired,

    #[error("Token refresh failed: {0}")]
    TokenRefreshFailed(String),

    #[error("Stored tokens are corrupted: {0}")]
    TokenCorrupted(String),

    #[error("Secure storage unavailable: {0}")]
    SecureStorageUnavailable(String),

    #[error("Serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl AuthError {
    /// Whether trying again later may succeed without user interaction.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AuthError::TokenRefreshFailed(_) | AuthError::SecureStorageUnavailable(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
