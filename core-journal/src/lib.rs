//! # Core Journal
//!
//! Typed records for the game data journal API and the user profile, plus
//! the [`decoder`] that turns one response body into one record.
//!
//! Field names follow the API's snake_case JSON. Fields the API omits for
//! some instances (descriptions, media, levels) are optional; unknown fields
//! are ignored.

pub mod decoder;
pub mod error;
pub mod models;

pub use decoder::{decode, JournalRecord};
pub use error::{JournalError, Result};
pub use models::{
    Character, CharacterRealm, ExpansionIndex, ExpansionJournal, InstanceCategory,
    InstanceJournal, InstanceMedia, InstanceMode, Link, ModeKind, NamedType, Stub, UserProfile,
    WowAccount, EVENT_CATEGORY,
};
