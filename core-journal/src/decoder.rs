//! Stage decoder
//!
//! Each pipeline stage decodes exactly one record type from one response
//! body.

use crate::error::{JournalError, Result};
use crate::models::{ExpansionIndex, ExpansionJournal, InstanceJournal, UserProfile};
use serde::de::DeserializeOwned;
use tracing::debug;

/// A record the decoder can produce.
pub trait JournalRecord: DeserializeOwned {
    /// Name used in errors and logs.
    const RECORD: &'static str;
}

impl JournalRecord for ExpansionIndex {
    const RECORD: &'static str = "expansion index";
}

impl JournalRecord for ExpansionJournal {
    const RECORD: &'static str = "expansion journal";
}

impl JournalRecord for InstanceJournal {
    const RECORD: &'static str = "instance journal";
}

impl JournalRecord for UserProfile {
    const RECORD: &'static str = "user profile";
}

pub fn decode<T: JournalRecord>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|source| {
        debug!(record = T::RECORD, error = %source, "Decode failed");
        JournalError::Decode {
            record: T::RECORD,
            source,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX: &str = r#"{
        "_links": {"self": {"href": "https://eu.api.blizzard.com/data/wow/journal-expansion/index?namespace=static-10.2.0_51825-eu"}},
        "tiers": [
            {"key": {"href": "https://eu.api.blizzard.com/data/wow/journal-expansion/68?namespace=static-10.2.0_51825-eu"}, "name": "Classic", "id": 68},
            {"key": {"href": "https://eu.api.blizzard.com/data/wow/journal-expansion/70?namespace=static-10.2.0_51825-eu"}, "name": "Burning Crusade", "id": 70}
        ]
    }"#;

    const RAID: &str = r#"{
        "id": 741,
        "name": "Molten Core",
        "map": {"name": "Molten Core", "id": 409},
        "description": "Deep within Blackrock Mountain.",
        "encounters": [
            {"key": {"href": "https://eu.api.blizzard.com/data/wow/journal-encounter/1519?namespace=static-eu"}, "name": "Lucifron", "id": 1519}
        ],
        "expansion": {"key": {"href": "https://eu.api.blizzard.com/data/wow/journal-expansion/68?namespace=static-eu"}, "name": "Classic", "id": 68},
        "modes": [{"mode": {"type": "NORMAL", "name": "Normal"}, "players": 40, "is_tracked": false}],
        "media": {"key": {"href": "https://eu.api.blizzard.com/data/wow/media/journal-instance/741?namespace=static-eu"}, "id": 741},
        "minimum_level": 60,
        "category": {"type": "RAID"},
        "order_index": 0
    }"#;

    const PROFILE: &str = r#"{
        "id": 12345,
        "wow_accounts": [
            {"id": 1, "characters": [
                {"character": {"href": "https://eu.api.blizzard.com/profile/wow/character/silvermoon/thrall"},
                 "name": "Thrall", "id": 111, "level": 60,
                 "realm": {"key": {"href": "x"}, "name": "Silvermoon", "id": 3391, "slug": "silvermoon"},
                 "playable_class": {"key": {"href": "x"}, "name": "Shaman", "id": 7},
                 "playable_race": {"key": {"href": "x"}, "name": "Orc", "id": 2},
                 "gender": {"type": "MALE", "name": "Male"},
                 "faction": {"type": "HORDE", "name": "Horde"}}
            ]},
            {"id": 2, "characters": [
                {"name": "Jaina", "id": 222, "level": 25,
                 "realm": {"name": "Draenor", "id": 1403, "slug": "draenor"}}
            ]}
        ]
    }"#;

    #[test]
    fn test_decode_expansion_index() {
        let index: ExpansionIndex = decode(INDEX.as_bytes()).unwrap();
        assert_eq!(index.tiers.len(), 2);
        assert_eq!(index.tiers[1].id, Some(70));
        assert!(index.tiers[0].href().ends_with("journal-expansion/68?namespace=static-10.2.0_51825-eu"));
    }

    #[test]
    fn test_decode_instance_ignores_unknown_fields() {
        let raid: InstanceJournal = decode(RAID.as_bytes()).unwrap();
        assert_eq!(raid.name, "Molten Core");
        assert_eq!(raid.minimum_level, Some(60));
        assert_eq!(raid.modes[0].players, 40);
        assert_eq!(raid.category.kind, "RAID");
        assert_eq!(raid.expansion.unwrap().name, "Classic");
    }

    #[test]
    fn test_decode_profile_flattens_accounts() {
        let profile: UserProfile = decode(PROFILE.as_bytes()).unwrap();
        let characters = profile.into_characters();

        assert_eq!(characters.len(), 2);
        assert_eq!(characters[0].realm.slug, "silvermoon");
        assert_eq!(characters[0].faction.as_ref().unwrap().kind, "HORDE");
        assert!(characters[1].playable_class.is_none());
    }

    #[test]
    fn test_decode_error_names_record() {
        let err = decode::<ExpansionJournal>(br#"{"name": "missing id"}"#).unwrap_err();
        assert_eq!(err.record(), "expansion journal");
        assert!(err.to_string().starts_with("Failed to decode expansion journal"));
    }
}
