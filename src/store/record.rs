//! Persisted record types
//!
//! Field names and encodings follow the on-disk JSON layout: camelCase keys,
//! snowflakes as strings and the `removed` flag as `0`/`1`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// One add/remove lifecycle record for a user within a guild
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScammerEntry {
    pub id: u64,
    #[serde(with = "snowflake")]
    pub user_id: u64,
    pub username: String,
    pub reason: String,
    pub added_by: String,
    #[serde(with = "snowflake")]
    pub added_by_id: u64,
    #[serde(with = "snowflake")]
    pub guild_id: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(with = "flag")]
    pub removed: bool,
    #[serde(default)]
    pub removed_by: Option<String>,
    #[serde(default, with = "snowflake::option")]
    pub removed_by_id: Option<u64>,
    #[serde(default)]
    pub remove_reason: Option<String>,
    #[serde(default)]
    pub remove_timestamp: Option<DateTime<Utc>>,
}

impl ScammerEntry {
    /// Whether this entry has not been reversed yet
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.removed
    }

    /// Whether this entry is the active one for the given user and guild
    #[must_use]
    pub fn is_active_for(&self, user_id: u64, guild_id: u64) -> bool {
        self.is_active() && self.user_id == user_id && self.guild_id == guild_id
    }

    /// Populate the removal fields. The entry itself is never deleted.
    pub fn mark_removed(&mut self, removal: Removal, at: DateTime<Utc>) {
        self.removed = true;
        self.removed_by = Some(removal.removed_by);
        self.removed_by_id = Some(removal.removed_by_id);
        self.remove_reason = Some(removal.reason);
        self.remove_timestamp = Some(at);
    }
}

impl Display for ScammerEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Entry ID: {}. User: {} ({}). Guild ID: {}. Reason: {}. Added by: {}. Removed: {}.",
            self.id,
            self.username,
            self.user_id,
            self.guild_id,
            self.reason,
            self.added_by,
            self.removed
        )
    }
}

/// Data supplied by the caller when marking a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewScammer {
    pub user_id: u64,
    pub username: String,
    pub reason: String,
    pub added_by: String,
    pub added_by_id: u64,
    pub guild_id: u64,
}

impl NewScammer {
    /// Build the persisted entry with its assigned id and creation time
    #[must_use]
    pub fn into_entry(self, id: u64, timestamp: DateTime<Utc>) -> ScammerEntry {
        ScammerEntry {
            id,
            user_id: self.user_id,
            username: self.username,
            reason: self.reason,
            added_by: self.added_by,
            added_by_id: self.added_by_id,
            guild_id: self.guild_id,
            timestamp,
            removed: false,
            removed_by: None,
            removed_by_id: None,
            remove_reason: None,
            remove_timestamp: None,
        }
    }
}

/// Who reversed an entry and why
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removal {
    pub removed_by: String,
    pub removed_by_id: u64,
    pub reason: String,
}

/// Per-guild configuration written by `/scammer setup`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuildSettings {
    #[serde(with = "snowflake")]
    pub guild_id: u64,
    #[serde(with = "snowflake")]
    pub scammer_role: u64,
    #[serde(with = "snowflake")]
    pub notification_channel: u64,
    #[serde(default, with = "snowflake::option")]
    pub log_channel: Option<u64>,
}

/// Discord ids as decimal strings. Plain JSON integers are accepted on read.
mod snowflake {
    use serde::{Deserialize, Deserializer, Serializer, de};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }

    impl Raw {
        fn into_id<E: de::Error>(self) -> Result<u64, E> {
            match self {
                Self::Text(text) => text.trim().parse().map_err(E::custom),
                Self::Number(id) => Ok(id),
            }
        }
    }

    pub fn serialize<S: Serializer>(id: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(id)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        Raw::deserialize(deserializer)?.into_id()
    }

    pub mod option {
        use super::Raw;
        use serde::{Deserialize, Deserializer, Serializer};

        #[allow(clippy::ref_option)]
        pub fn serialize<S: Serializer>(id: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error> {
            match id {
                Some(id) => serializer.collect_str(id),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<u64>, D::Error> {
            Option::<Raw>::deserialize(deserializer)?
                .map(Raw::into_id)
                .transpose()
        }
    }
}

/// The `removed` flag is stored as 0/1
mod flag {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bool(bool),
        Number(u64),
    }

    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S: Serializer>(removed: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*removed))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Bool(flag) => flag,
            Raw::Number(flag) => flag != 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entry() -> ScammerEntry {
        NewScammer {
            user_id: 123_456_789_012_345_678,
            username: "mallory".to_string(),
            reason: "phishing".to_string(),
            added_by: "alice".to_string(),
            added_by_id: 42,
            guild_id: 987_654_321,
        }
        .into_entry(1, "2024-03-01T12:00:00Z".parse().unwrap())
    }

    #[test]
    fn test_entry_serializes_to_file_layout() {
        let value = serde_json::to_value(sample_entry()).expect("Failed to serialize");

        assert_eq!(value["id"], 1);
        assert_eq!(value["userId"], "123456789012345678");
        assert_eq!(value["addedById"], "42");
        assert_eq!(value["guildId"], "987654321");
        assert_eq!(value["removed"], 0);
        assert!(value["removedBy"].is_null());
        assert!(value["removedById"].is_null());
        assert!(value["removeReason"].is_null());
        assert!(value["removeTimestamp"].is_null());
    }

    #[test]
    fn test_entry_reads_legacy_file_contents() {
        let json = r#"{
            "id": 7,
            "userId": "111",
            "username": "mallory",
            "reason": "fake giveaway",
            "addedBy": "alice",
            "addedById": "222",
            "guildId": "333",
            "timestamp": "2024-03-01T12:00:00.000Z",
            "removed": 1,
            "removedBy": "bob",
            "removedById": "444",
            "removeReason": "appealed",
            "removeTimestamp": "2024-03-02T08:30:00.000Z"
        }"#;

        let entry: ScammerEntry = serde_json::from_str(json).expect("Failed to deserialize");
        assert_eq!(entry.id, 7);
        assert_eq!(entry.user_id, 111);
        assert_eq!(entry.guild_id, 333);
        assert!(entry.removed);
        assert!(!entry.is_active());
        assert_eq!(entry.removed_by_id, Some(444));
        assert_eq!(entry.remove_reason.as_deref(), Some("appealed"));
    }

    #[test]
    fn test_removed_flag_accepts_booleans() {
        let json = r#"{
            "id": 1, "userId": 5, "username": "u", "reason": "r", "addedBy": "a",
            "addedById": "6", "guildId": "7", "timestamp": "2024-01-01T00:00:00Z",
            "removed": false
        }"#;

        let entry: ScammerEntry = serde_json::from_str(json).expect("Failed to deserialize");
        assert!(entry.is_active());
        assert_eq!(entry.user_id, 5);
        assert!(entry.removed_by.is_none());
    }

    #[test]
    fn test_mark_removed() {
        let mut entry = sample_entry();
        assert!(entry.is_active_for(123_456_789_012_345_678, 987_654_321));

        let at: DateTime<Utc> = "2024-03-05T09:00:00Z".parse().unwrap();
        entry.mark_removed(
            Removal {
                removed_by: "bob".to_string(),
                removed_by_id: 99,
                reason: "mistake".to_string(),
            },
            at,
        );

        assert!(entry.removed);
        assert!(!entry.is_active_for(123_456_789_012_345_678, 987_654_321));
        assert_eq!(entry.removed_by.as_deref(), Some("bob"));
        assert_eq!(entry.removed_by_id, Some(99));
        assert_eq!(entry.remove_reason.as_deref(), Some("mistake"));
        assert_eq!(entry.remove_timestamp, Some(at));
        assert_eq!(serde_json::to_value(&entry).unwrap()["removed"], 1);
    }

    #[test]
    fn test_guild_settings_serialization() {
        let settings = GuildSettings {
            guild_id: 12345,
            scammer_role: 67890,
            notification_channel: 54321,
            log_channel: None,
        };

        let value = serde_json::to_value(&settings).expect("Failed to serialize");
        assert_eq!(value["guildId"], "12345");
        assert_eq!(value["scammerRole"], "67890");
        assert_eq!(value["notificationChannel"], "54321");
        assert!(value["logChannel"].is_null());

        let deserialized: GuildSettings =
            serde_json::from_value(value).expect("Failed to deserialize");
        assert_eq!(deserialized, settings);
    }

    #[test]
    fn test_malformed_snowflake_is_rejected() {
        let json = r#"{"guildId": "not-a-number", "scammerRole": "1", "notificationChannel": "2"}"#;
        assert!(serde_json::from_str::<GuildSettings>(json).is_err());
    }
}
