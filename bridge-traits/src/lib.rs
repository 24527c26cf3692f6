//! # Host Bridge Traits
//!
//! Capabilities the companion core needs from its host platform.
//!
//! ## Traits
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - Single-attempt async HTTP against the game API
//!
//! ### Storage
//! - [`SecureStore`](storage::SecureStore) - OAuth token persistence (Keychain/Keystore)
//! - [`SettingsStore`](storage::SettingsStore) - Region, locale and character order preferences
//! - [`ResponseCache`](storage::ResponseCache) - Raw API responses keyed by request URL
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for cache freshness and token expiry
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate |
//! |----------|---------------------|
//! | Desktop  | `bridge-desktop`    |
//! | iOS      | host-provided       |
//! | Android  | host-provided       |
//!
//! ## Error Handling
//!
//! All bridge traits report failures through [`BridgeError`](error::BridgeError).
//! Implementations convert platform errors and keep the message actionable.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so they can be shared behind `Arc`
//! across async tasks.

pub mod error;
pub mod http;
pub mod storage;
pub mod time;

pub use error::BridgeError;

pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use storage::{CachedResponse, ResponseCache, SecureStore, SettingsStore};
pub use time::{Clock, LogEntry, LogLevel, LoggerSink, SystemClock};
