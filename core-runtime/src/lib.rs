//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the companion core:
//! - Logging and tracing infrastructure
//! - Configuration management (bridges, API region, sync tuning)
//! - Event bus for change notifications
//!
//! Every other crate in the workspace depends on this one for its logging
//! conventions and for publishing events to the UI layer.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
