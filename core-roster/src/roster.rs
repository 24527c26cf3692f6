//! # Character Roster
//!
//! The account's characters split into an **active** list, in the user's
//! manual order, and an **ignored** list, sorted by name.
//!
//! Each character's order is persisted through an [`OrderStore`]. Orders
//! above [`IGNORE_THRESHOLD`] mark a character as ignored. Ignoring adds
//! [`IGNORE_OFFSET`] to the current order and restoring subtracts
//! [`RESTORE_OFFSET`], so a restored character keeps a persisted order 50
//! above where it was ignored from.

use crate::error::{Result, RosterError};
use crate::order_store::{CharacterKey, OrderStore};
use crate::suggestions::{build_suggestions, CharacterSuggestion};
use core_journal::Character;
use core_runtime::events::{CoreEvent, EventBus, RosterEvent};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

/// Orders above this value mean "ignored".
pub const IGNORE_THRESHOLD: i64 = 999;
/// Added to a character's order when it is ignored.
pub const IGNORE_OFFSET: i64 = 1050;
/// Subtracted from a character's order when it is restored.
pub const RESTORE_OFFSET: i64 = 1000;
/// Characters below this level have no raid lockouts worth tracking.
pub const RAID_MINIMUM_LEVEL: u32 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RosterEntry {
    pub character: Character,
    pub order: i64,
}

impl RosterEntry {
    pub fn key(&self) -> CharacterKey {
        CharacterKey::from(&self.character)
    }

    pub fn is_ignored(&self) -> bool {
        self.order > IGNORE_THRESHOLD
    }
}

#[derive(Debug, Default)]
struct RosterState {
    active: Vec<RosterEntry>,
    ignored: Vec<RosterEntry>,
}

pub struct Roster {
    order_store: Arc<dyn OrderStore>,
    event_bus: EventBus,
    state: RwLock<RosterState>,
}

impl Roster {
    pub fn new(order_store: Arc<dyn OrderStore>, event_bus: EventBus) -> Self {
        Self {
            order_store,
            event_bus,
            state: RwLock::new(RosterState::default()),
        }
    }

    /// Replace the roster with freshly downloaded characters.
    ///
    /// Active characters are sorted by persisted order with order 0 ("no
    /// preference") after every explicitly ordered one. Afterwards every
    /// active character past the first that still has order 0 gets its
    /// index as order, and that order is persisted.
    #[instrument(skip_all, fields(characters = characters.len()))]
    pub async fn apply_order(&self, characters: Vec<Character>) -> Result<()> {
        let mut active = Vec::new();
        let mut ignored = Vec::new();

        for character in characters {
            let order = self
                .order_store
                .get_order(&CharacterKey::from(&character))
                .await?;
            let entry = RosterEntry { character, order };
            if entry.is_ignored() {
                ignored.push(entry);
            } else {
                active.push(entry);
            }
        }

        active.sort_by_key(|entry| (entry.order == 0, entry.order));
        ignored.sort_by(|a, b| a.character.name.cmp(&b.character.name));

        for (index, entry) in active.iter_mut().enumerate().skip(1) {
            if entry.order == 0 {
                entry.order = index as i64;
                self.order_store.set_order(&entry.key(), entry.order).await?;
            }
        }

        info!(active = active.len(), ignored = ignored.len(), "Characters ordered");
        self.emit(RosterEvent::CharactersLoaded {
            active: active.len(),
            ignored: ignored.len(),
        });

        let mut state = self.state.write().await;
        state.active = active;
        state.ignored = ignored;
        Ok(())
    }

    pub async fn characters(&self) -> Vec<RosterEntry> {
        self.state.read().await.active.clone()
    }

    pub async fn ignored_characters(&self) -> Vec<RosterEntry> {
        self.state.read().await.ignored.clone()
    }

    /// Active characters at or above [`RAID_MINIMUM_LEVEL`].
    pub async fn raid_eligible(&self) -> Vec<Character> {
        self.state
            .read()
            .await
            .active
            .iter()
            .filter(|entry| entry.character.level >= RAID_MINIMUM_LEVEL)
            .map(|entry| entry.character.clone())
            .collect()
    }

    /// Move the active characters at `sources` so they sit before the
    /// character currently at `destination`, then persist every order.
    ///
    /// `destination` may equal the list length to move to the end.
    pub async fn move_characters(&self, sources: &[usize], destination: usize) -> Result<()> {
        let mut state = self.state.write().await;
        let len = state.active.len();

        if let Some(&index) = sources.iter().find(|&&index| index >= len) {
            return Err(RosterError::IndexOutOfRange { index, len });
        }
        if destination > len {
            return Err(RosterError::IndexOutOfRange {
                index: destination,
                len,
            });
        }

        let mut sources = sources.to_vec();
        sources.sort_unstable();
        sources.dedup();

        let mut moved = Vec::with_capacity(sources.len());
        for &index in sources.iter().rev() {
            moved.push(state.active.remove(index));
        }
        moved.reverse();

        let insert_at = destination - sources.iter().filter(|&&index| index < destination).count();
        for (offset, entry) in moved.into_iter().enumerate() {
            state.active.insert(insert_at + offset, entry);
        }

        self.rewrite_orders(&mut state.active).await?;
        debug!(?sources, destination, "Characters reordered");
        self.emit(RosterEvent::OrderChanged {
            active: state.active.len(),
        });
        Ok(())
    }

    /// Move the active character at `index` to the ignored list.
    #[instrument(skip(self))]
    pub async fn ignore_character(&self, index: usize) -> Result<()> {
        let mut state = self.state.write().await;
        let len = state.active.len();
        if index >= len {
            return Err(RosterError::IndexOutOfRange { index, len });
        }

        let mut entry = state.active.remove(index);
        entry.order += IGNORE_OFFSET;
        self.order_store.set_order(&entry.key(), entry.order).await?;

        let key = entry.key();
        state.ignored.push(entry);
        self.rewrite_orders(&mut state.active).await?;

        info!(character = %key, "Character ignored");
        self.emit(RosterEvent::CharacterIgnored {
            name: key.name,
            realm_slug: key.realm_slug,
        });
        Ok(())
    }

    /// Move an ignored character to the end of the active list.
    ///
    /// The active list is renumbered by index, after which the restored
    /// character's persisted order is overwritten with its ignored order
    /// minus [`RESTORE_OFFSET`].
    #[instrument(skip_all, fields(character = %key))]
    pub async fn restore_character(&self, key: &CharacterKey) -> Result<()> {
        let mut state = self.state.write().await;
        let Some(position) = state.ignored.iter().position(|entry| &entry.key() == key) else {
            return Err(RosterError::NotIgnored {
                name: key.name.clone(),
                realm_slug: key.realm_slug.clone(),
            });
        };

        let mut entry = state.ignored.remove(position);
        let restored_order = entry.order - RESTORE_OFFSET;
        entry.order = restored_order;
        state.active.push(entry);

        self.rewrite_orders(&mut state.active).await?;
        self.order_store.set_order(key, restored_order).await?;

        info!(restored_order, "Character restored");
        self.emit(RosterEvent::CharacterRestored {
            name: key.name.clone(),
            realm_slug: key.realm_slug.clone(),
        });
        Ok(())
    }

    /// Widget suggestions for active, then ignored, characters.
    pub async fn character_suggestions(&self, avatar_prefix: &str) -> Vec<CharacterSuggestion> {
        let state = self.state.read().await;
        build_suggestions(
            state.active.iter().chain(state.ignored.iter()),
            avatar_prefix,
        )
    }

    /// Set every active character's order to its index and persist it.
    async fn rewrite_orders(&self, active: &mut [RosterEntry]) -> Result<()> {
        for (index, entry) in active.iter_mut().enumerate() {
            entry.order = index as i64;
            self.order_store.set_order(&entry.key(), entry.order).await?;
        }
        Ok(())
    }

    fn emit(&self, event: RosterEvent) {
        // No subscribers is not an error.
        let _ = self.event_bus.emit(CoreEvent::Roster(event));
    }
}
