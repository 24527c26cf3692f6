//! # Event Bus System
//!
//! Typed change notifications for the companion core, carried over
//! `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! The UI layer never polls the pipeline. Instead the data store, the
//! credential provider and the character roster publish events here and any
//! number of subscribers consume them independently:
//!
//! ```text
//! ┌──────────────┐    emit     ┌───────────┐
//! │ core-auth    ├────────────>│           │
//! └──────────────┘             │           │    subscribe    ┌────────────┐
//! ┌──────────────┐    emit     │ EventBus  ├────────────────>│ UI / host  │
//! │ core-sync    ├────────────>│ (broadcast│                 └────────────┘
//! └──────────────┘             │  channel) │    subscribe    ┌────────────┐
//! ┌──────────────┐    emit     │           ├────────────────>│ widgets    │
//! │ core-roster  ├────────────>│           │                 └────────────┘
//! └──────────────┘             └───────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut stream = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Sync(SyncEvent::LoadingGateChanged { allowed: false }))
//!     .ok();
//!
//! let event = stream.recv().await.unwrap();
//! assert!(matches!(event, CoreEvent::Sync(_)));
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events; it can keep
//!   receiving. Progress events are cumulative, so the next one repairs the view.
//! - **`RecvError::Closed`**: every sender was dropped; treat it as shutdown.
//!
//! Emitting with no subscribers returns an error which publishers ignore.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 256;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event published through the [`EventBus`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Credential events
    Auth(AuthEvent),
    /// Game data synchronization events
    Sync(SyncEvent),
    /// Character list events
    Roster(RosterEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Auth(e) => e.description(),
            CoreEvent::Sync(e) => e.description(),
            CoreEvent::Roster(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Auth(AuthEvent::AuthError { .. }) => EventSeverity::Error,
            CoreEvent::Sync(SyncEvent::Stalled { .. }) => EventSeverity::Error,
            CoreEvent::Sync(SyncEvent::Retrying { .. }) => EventSeverity::Warning,
            CoreEvent::Sync(SyncEvent::Completed { .. }) => EventSeverity::Info,
            CoreEvent::Sync(SyncEvent::Started { .. }) => EventSeverity::Info,
            CoreEvent::Roster(RosterEvent::CharactersLoaded { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Authentication Events
// ============================================================================

/// Events emitted by the credential provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum AuthEvent {
    /// Stored tokens were removed.
    SignedOut,
    /// The access token expired and is being refreshed.
    TokenRefreshing,
    /// Token refresh completed.
    TokenRefreshed {
        /// Expiry of the new access token (Unix epoch seconds).
        expires_at: i64,
    },
    /// Credentials could not be produced.
    AuthError {
        message: String,
        /// Whether retrying later may succeed.
        recoverable: bool,
    },
}

impl AuthEvent {
    fn description(&self) -> &str {
        match self {
            AuthEvent::SignedOut => "Signed out",
            AuthEvent::TokenRefreshing => "Refreshing access token",
            AuthEvent::TokenRefreshed { .. } => "Access token refreshed",
            AuthEvent::AuthError { .. } => "Authentication error",
        }
    }
}

// ============================================================================
// Sync Events
// ============================================================================

/// Events emitted by the game data pipeline and its store.
///
/// Stage names are the snake_case labels of the pipeline stages
/// (`fetch_expansion_index`, `fetch_raid_journals`, ...).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SyncEvent {
    /// A pipeline run started.
    Started {
        run_id: String,
        estimated_items: u64,
    },
    /// The pipeline moved to the next stage.
    StageChanged {
        run_id: String,
        from: String,
        to: String,
    },
    /// Download counters changed.
    Progress {
        stage: String,
        downloaded_items: u64,
        /// `max(estimated, actual)` items to download.
        total_items: u64,
        /// 0-100
        percent: u8,
    },
    /// A stage will be retried after the fixed delay.
    Retrying {
        run_id: String,
        stage: String,
        /// `connection` or `data_not_ready`
        kind: String,
        attempt: u32,
    },
    /// A stage stopped permanently. Loading stays disabled.
    Stalled {
        run_id: String,
        stage: String,
        reason: String,
    },
    /// Every stage finished.
    Completed {
        run_id: String,
        expansions: u64,
        raids: u64,
        dungeons: u64,
        duration_secs: u64,
    },
    /// Collections and counters were cleared ahead of a refresh.
    DataCleared,
    /// The "loading allowed" gate flipped.
    LoadingGateChanged { allowed: bool },
}

impl SyncEvent {
    fn description(&self) -> &str {
        match self {
            SyncEvent::Started { .. } => "Game data sync started",
            SyncEvent::StageChanged { .. } => "Sync stage changed",
            SyncEvent::Progress { .. } => "Sync progress",
            SyncEvent::Retrying { .. } => "Sync stage retrying",
            SyncEvent::Stalled { .. } => "Sync stage stalled",
            SyncEvent::Completed { .. } => "Game data sync completed",
            SyncEvent::DataCleared => "Game data cleared",
            SyncEvent::LoadingGateChanged { .. } => "Loading gate changed",
        }
    }
}

// ============================================================================
// Roster Events
// ============================================================================

/// Events emitted when the character list or its ordering changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum RosterEvent {
    /// Characters were loaded and ordered.
    CharactersLoaded { active: usize, ignored: usize },
    /// The active list was reordered and orders were persisted.
    OrderChanged { active: usize },
    /// A character moved to the ignored list.
    CharacterIgnored { name: String, realm_slug: String },
    /// A character moved back to the active list.
    CharacterRestored { name: String, realm_slug: String },
}

impl RosterEvent {
    fn description(&self) -> &str {
        match self {
            RosterEvent::CharactersLoaded { .. } => "Characters loaded",
            RosterEvent::OrderChanged { .. } => "Character order changed",
            RosterEvent::CharacterIgnored { .. } => "Character ignored",
            RosterEvent::CharacterRestored { .. } => "Character restored",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central broadcast channel for [`CoreEvent`]s.
///
/// Cloning the bus clones the sender; all clones publish to the same
/// subscribers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus.
    ///
    /// A subscriber that falls more than `capacity` events behind receives
    /// `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// if nobody is listening.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` with an optional filter.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let event_bus = EventBus::new(16);
/// let sync_only = EventStream::new(event_bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Sync(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// `RecvError::Lagged(n)` if the subscriber fell behind by `n` events,
    /// `RecvError::Closed` once all senders are gone.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without waiting.
    ///
    /// Returns `None` if no matching event is currently buffered.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.accepts(&event) => return Some(Ok(event)),
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn stalled() -> CoreEvent {
        CoreEvent::Sync(SyncEvent::Stalled {
            run_id: "run-1".to_string(),
            stage: "fetch_raid_journals".to_string(),
            reason: "retry ceiling reached".to_string(),
        })
    }

    #[tokio::test]
    async fn test_event_emission_no_subscribers() {
        let bus = EventBus::new(10);
        assert!(bus.emit(stalled()).is_err());
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        assert_eq!(bus.emit(stalled()).unwrap(), 2);
        assert_eq!(first.recv().await.unwrap(), stalled());
        assert_eq!(second.recv().await.unwrap(), stalled());
    }

    #[tokio::test]
    async fn test_event_stream_with_filter() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe())
            .filter(|event| matches!(event, CoreEvent::Roster(_)));

        bus.emit(stalled()).unwrap();
        let loaded = CoreEvent::Roster(RosterEvent::CharactersLoaded {
            active: 3,
            ignored: 1,
        });
        bus.emit(loaded.clone()).unwrap();

        assert_eq!(stream.recv().await.unwrap(), loaded);
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();

        for downloaded in 0..5 {
            bus.emit(CoreEvent::Sync(SyncEvent::Progress {
                stage: "fetch_expansion_journals".to_string(),
                downloaded_items: downloaded,
                total_items: 100,
                percent: downloaded as u8,
            }))
            .ok();
        }

        assert!(matches!(sub.recv().await, Err(RecvError::Lagged(_))));
    }

    #[test]
    fn test_event_severity() {
        assert_eq!(stalled().severity(), EventSeverity::Error);
        assert_eq!(
            CoreEvent::Sync(SyncEvent::LoadingGateChanged { allowed: true }).severity(),
            EventSeverity::Debug
        );
        assert_eq!(
            CoreEvent::Auth(AuthEvent::AuthError {
                message: "invalid_grant".to_string(),
                recoverable: false,
            })
            .severity(),
            EventSeverity::Error
        );
    }

    #[test]
    fn test_event_serialization() {
        let json = serde_json::to_value(stalled()).unwrap();
        assert_eq!(json["type"], "Sync");
        assert_eq!(json["payload"]["event"], "Stalled");
        assert_eq!(json["payload"]["stage"], "fetch_raid_journals");
    }

    #[test]
    fn test_try_recv_empty() {
        let bus = EventBus::default();
        let mut stream = EventStream::new(bus.subscribe());
        assert!(stream.try_recv().is_none());
    }
}
