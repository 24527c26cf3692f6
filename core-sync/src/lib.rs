//! # Core Sync
//!
//! Downloads and publishes the game journal.
//!
//! ## Components
//!
//! - **Stage machine** (`stage`): the ordered pipeline stages and step outcomes
//! - **Counters** (`progress`): download progress and per-stage retry counters
//! - **Store** (`store`): published collections, counters and the loading gate
//! - **Post-processing** (`postprocess`): sorting and dungeon deduplication
//! - **Fetch** (`fetch`): request URLs and authorized `GET`s
//! - **Pipeline** (`pipeline`): drives the stages against the API and cache
//! - **Profile** (`profile`): the account's character list

pub mod error;
pub mod fetch;
pub mod pipeline;
pub mod postprocess;
pub mod profile;
pub mod progress;
pub mod stage;
pub mod store;

pub use core_runtime::config::SyncConfig;
pub use error::{FetchError, Result, SyncError};
pub use fetch::JournalFetcher;
pub use pipeline::{PipelineRun, SyncOutcome, SyncPipeline, SyncSummary};
pub use profile::ProfileFetcher;
pub use progress::{ProgressCounters, RetryCounters};
pub use stage::{StallReason, StepOutcome, SyncStage};
pub use store::{GameDataSnapshot, GameDataStore};
