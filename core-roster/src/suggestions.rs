//! Character suggestions for home screen widgets.

use crate::error::Result;
use crate::roster::RosterEntry;
use core_journal::Character;
use serde::{Deserialize, Serialize};

/// Avatar file prefix used when the host does not set one.
pub const DEFAULT_AVATAR_PREFIX: &str = "characterAvatar";

/// A character the widget configuration can offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterSuggestion {
    pub id: i64,
    pub name: String,
    pub level: u32,
    pub realm_slug: String,
    pub realm_name: String,
    /// Name of the locally saved avatar image.
    pub avatar_uri: String,
    /// `HORDE` or `ALLIANCE`, when the profile reports one.
    pub faction: Option<String>,
}

impl CharacterSuggestion {
    pub fn new(character: &Character, avatar_prefix: &str) -> Self {
        Self {
            id: character.id,
            name: character.name.clone(),
            level: character.level,
            realm_slug: character.realm.slug.clone(),
            realm_name: character.realm.name.clone(),
            avatar_uri: avatar_uri(avatar_prefix, character),
            faction: character.faction.as_ref().map(|f| f.kind.clone()),
        }
    }
}

/// `{prefix}-{percent-encoded lowercase name}-{realm_slug}`
pub fn avatar_uri(prefix: &str, character: &Character) -> String {
    let name = character.name.to_lowercase();
    format!(
        "{}-{}-{}",
        prefix,
        urlencoding::encode(&name),
        character.realm.slug
    )
}

pub(crate) fn build_suggestions<'a>(
    entries: impl Iterator<Item = &'a RosterEntry>,
    avatar_prefix: &str,
) -> Vec<CharacterSuggestion> {
    entries
        .map(|entry| CharacterSuggestion::new(&entry.character, avatar_prefix))
        .collect()
}

/// JSON payload shared with the widget extension.
pub fn encode_suggestions(suggestions: &[CharacterSuggestion]) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(suggestions)?)
}
