//! # Core Auth
//!
//! Battle.net account credentials for the companion core.
//!
//! The host application runs the interactive sign-in and passes the
//! resulting [`OAuthTokens`] to [`OAuthCredentialProvider::sign_in`]. From then on
//! the fetch layers ask a [`CredentialProvider`] for an access token and the
//! provider refreshes it through [`OAuthClient`] when it is about to expire.
//!
//! Tokens live in the host's [`SecureStore`](bridge_traits::storage::SecureStore)
//! and are redacted from `Debug` output and logs.

pub mod credentials;
pub mod error;
pub mod oauth;
pub mod token_store;
pub mod types;

pub use credentials::{CredentialProvider, StaticCredentials, OAuthCredentialProvider};
pub use error::{AuthError, Result};
pub use oauth::{OAuthClient, OAuthConfig, DEFAULT_TOKEN_URL};
pub use token_store::{TokenStore, DEFAULT_TOKEN_KEY};
pub use types::OAuthTokens;
