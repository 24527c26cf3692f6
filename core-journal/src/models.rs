//! Journal and profile records
//!
//! Mirrors the JSON returned by the game data and profile APIs when a
//! `locale` is given, so every `name` is a plain string.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Instance category type for holiday event instances.
pub const EVENT_CATEGORY: &str = "EVENT";

// =============================================================================
// Shared pieces
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
}

/// Reference to a detail resource that has not been fetched yet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Stub {
    pub name: String,
    #[serde(default)]
    pub id: Option<i64>,
    pub key: Link,
}

impl Stub {
    pub fn href(&self) -> &str {
        &self.key.href
    }
}

/// `{ "type": "...", "name": "..." }` pairs used for modes and factions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamedType {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
}

// =============================================================================
// Expansions
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpansionIndex {
    pub tiers: Vec<Stub>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExpansionJournal {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub raids: Option<Vec<Stub>>,
    #[serde(default)]
    pub dungeons: Option<Vec<Stub>>,
}

impl ExpansionJournal {
    pub fn raid_stubs(&self) -> &[Stub] {
        self.raids.as_deref().unwrap_or_default()
    }

    pub fn dungeon_stubs(&self) -> &[Stub] {
        self.dungeons.as_deref().unwrap_or_default()
    }
}

// =============================================================================
// Instances (raids and dungeons)
// =============================================================================

pub type ModeKind = NamedType;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceMode {
    pub mode: ModeKind,
    pub players: u32,
    #[serde(default)]
    pub is_tracked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceMedia {
    pub key: Link,
    pub id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceCategory {
    #[serde(rename = "type")]
    pub kind: String,
}

/// Raid or dungeon detail record.
///
/// Equality and hashing cover every field; ordering is by `(id, name)` only,
/// so a stable sort keeps discovery order among instances that share both.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceJournal {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub encounters: Vec<Stub>,
    #[serde(default)]
    pub expansion: Option<Stub>,
    #[serde(default)]
    pub modes: Vec<InstanceMode>,
    #[serde(default)]
    pub media: Option<InstanceMedia>,
    #[serde(default)]
    pub minimum_level: Option<u32>,
    pub category: InstanceCategory,
}

impl InstanceJournal {
    pub fn is_event(&self) -> bool {
        self.category.kind == EVENT_CATEGORY
    }

    /// Sort key used for published raid and dungeon lists.
    pub fn cmp_by_id_and_name(&self, other: &Self) -> Ordering {
        self.id
            .cmp(&other.id)
            .then_with(|| self.name.cmp(&other.name))
    }
}

// =============================================================================
// Profile
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub wow_accounts: Vec<WowAccount>,
}

impl UserProfile {
    /// Characters of every account, in account order.
    pub fn into_characters(self) -> Vec<Character> {
        self.wow_accounts
            .into_iter()
            .flat_map(|account| account.characters)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WowAccount {
    pub id: i64,
    #[serde(default)]
    pub characters: Vec<Character>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CharacterRealm {
    pub name: String,
    pub id: i64,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Character {
    pub name: String,
    pub id: i64,
    pub level: u32,
    pub realm: CharacterRealm,
    #[serde(default)]
    pub playable_class: Option<Stub>,
    #[serde(default)]
    pub playable_race: Option<Stub>,
    #[serde(default)]
    pub faction: Option<NamedType>,
}
