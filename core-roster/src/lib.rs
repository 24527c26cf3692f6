//! # Core Roster
//!
//! Orders the account's characters the way the user arranged them.
//!
//! - [`OrderStore`] persists one integer per [`CharacterKey`];
//!   [`SettingsOrderStore`] keeps them in the host settings store.
//! - [`Roster`] applies stored orders to a downloaded character list and
//!   handles reordering, ignoring and restoring characters.
//! - [`CharacterSuggestion`]s feed the widget configuration.

pub mod error;
pub mod order_store;
pub mod roster;
pub mod suggestions;

pub use error::{Result, RosterError};
pub use order_store::{CharacterKey, OrderStore, SettingsOrderStore, DEFAULT_ORDER_PREFIX};
pub use roster::{
    Roster, RosterEntry, IGNORE_OFFSET, IGNORE_THRESHOLD, RAID_MINIMUM_LEVEL, RESTORE_OFFSET,
};
pub use suggestions::{avatar_uri, encode_suggestions, CharacterSuggestion, DEFAULT_AVATAR_PREFIX};
