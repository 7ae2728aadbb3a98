//! Core data model shared by the client and the relay.
//!
//! Field names follow the relay's wire format (`chatId`, `userName`). Inbound
//! decoding also accepts the descriptive aliases (`roomKey`, `displayName`).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Key of the shared room every user can see.
pub const GLOBAL_ROOM: &str = "global";

/// Title shown for [`GLOBAL_ROOM`].
pub const GLOBAL_ROOM_TITLE: &str = "General Chat";

/// Separator between the two user ids of a private room key.
pub const PRIVATE_ROOM_SEPARATOR: &str = "_";

/// Display name used when the identity provider has none.
pub const DEFAULT_DISPLAY_NAME: &str = "Anon";

/// Opaque room identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomKey(String);

impl RoomKey {
    /// Wrap an arbitrary key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The shared room.
    pub fn global() -> Self {
        Self(GLOBAL_ROOM.to_string())
    }

    /// Pairwise-private room for two users.
    ///
    /// Sorts the ids before joining, so both participants derive the same key
    /// regardless of who initiates.
    pub fn private(a: &str, b: &str) -> Self {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        Self(format!("{first}{PRIVATE_ROOM_SEPARATOR}{second}"))
    }

    /// Whether this is the shared room.
    pub fn is_global(&self) -> bool {
        self.0 == GLOBAL_ROOM
    }

    /// Key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

/// Identity supplied by the external identity provider.
///
/// Immutable for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    user_id: String,
    display_name: String,
}

impl Identity {
    /// Build an identity. Returns `None` if `user_id` is blank.
    ///
    /// A blank display name falls back to [`DEFAULT_DISPLAY_NAME`].
    pub fn new(user_id: impl Into<String>, display_name: impl Into<String>) -> Option<Self> {
        let user_id = user_id.into().trim().to_string();
        if user_id.is_empty() {
            return None;
        }

        let display_name = display_name.into().trim().to_string();
        let display_name =
            if display_name.is_empty() { DEFAULT_DISPLAY_NAME.to_string() } else { display_name };

        Some(Self { user_id, display_name })
    }

    /// Stable user id.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Human-readable name.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Private room between this user and `peer_id`.
    pub fn private_room_with(&self, peer_id: &str) -> RoomKey {
        RoomKey::private(&self.user_id, peer_id)
    }
}

/// A chat message. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Room the message belongs to. Relays may omit it; such messages are
    /// taken to belong to whichever room the receiver has open.
    #[serde(rename = "chatId", alias = "roomKey", default, skip_serializing_if = "Option::is_none")]
    pub room_key: Option<RoomKey>,
    /// Sender's user id.
    #[serde(rename = "senderId")]
    pub sender_id: String,
    /// Sender's display name at send time.
    #[serde(rename = "userName", alias = "senderName", default)]
    pub sender_name: String,
    /// Message body.
    pub text: String,
    /// Creation time. Relays may omit it for legacy history.
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Message {
    /// Create a message authored by `identity`, stamped with `created_at`.
    pub fn authored(
        identity: &Identity,
        room_key: RoomKey,
        text: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            room_key: Some(room_key),
            sender_id: identity.user_id().to_string(),
            sender_name: identity.display_name().to_string(),
            text: text.into(),
            created_at: Some(created_at),
        }
    }

    /// Whether the message may be shown in `room`. Unkeyed messages match
    /// any room.
    pub fn belongs_to(&self, room: &RoomKey) -> bool {
        self.room_key.as_ref().is_none_or(|key| key == room)
    }
}

/// One connected user, as reported by the relay.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PresenceEntry {
    /// User id.
    #[serde(rename = "userId")]
    pub user_id: String,
    /// Display name.
    #[serde(rename = "userName", alias = "displayName", default)]
    pub display_name: String,
}

impl PresenceEntry {
    /// Create an entry.
    pub fn new(user_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self { user_id: user_id.into(), display_name: display_name.into() }
    }
}

impl From<&Identity> for PresenceEntry {
    fn from(identity: &Identity) -> Self {
        Self::new(identity.user_id(), identity.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_key_is_sorted_and_joined() {
        assert_eq!(RoomKey::private("user_b", "user_a").as_str(), "user_a_user_b");
        assert_eq!(RoomKey::private("u1", "u2"), RoomKey::private("u2", "u1"));
    }

    #[test]
    fn identity_trims_and_falls_back() {
        let identity = Identity::new(" u1 ", "   ").unwrap();
        assert_eq!(identity.user_id(), "u1");
        assert_eq!(identity.display_name(), DEFAULT_DISPLAY_NAME);

        assert!(Identity::new("  ", "Alice").is_none());
    }

    #[test]
    fn message_uses_wire_names() {
        let identity = Identity::new("u1", "Alice").unwrap();
        let at = DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z").unwrap().to_utc();
        let message = Message::authored(&identity, RoomKey::global(), "hi", at);

        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["chatId"], "global");
        assert_eq!(json["senderId"], "u1");
        assert_eq!(json["userName"], "Alice");
        assert_eq!(json["text"], "hi");
        assert!(json["createdAt"].as_str().unwrap().starts_with("2024-05-01T10:00:00"));
    }

    #[test]
    fn message_accepts_aliases_and_missing_timestamp() {
        let json = r#"{"roomKey":"global","senderId":"u2","senderName":"Bob","text":"yo"}"#;
        let message: Message = serde_json::from_str(json).unwrap();

        assert_eq!(message.room_key, Some(RoomKey::global()));
        assert_eq!(message.sender_name, "Bob");
        assert_eq!(message.created_at, None);
    }

    #[test]
    fn message_without_room_matches_any_room() {
        let message: Message = serde_json::from_str(r#"{"senderId":"u2","text":"hi"}"#).unwrap();

        assert_eq!(message.room_key, None);
        assert_eq!(message.sender_name, "");
        assert!(message.belongs_to(&RoomKey::global()));
        assert!(message.belongs_to(&RoomKey::new("u1_u2")));
        assert!(serde_json::to_value(&message).unwrap().get("chatId").is_none());
    }

    #[test]
    fn keyed_message_matches_only_its_room() {
        let identity = Identity::new("u1", "Alice").unwrap();
        let message = Message::authored(&identity, RoomKey::new("u1_u2"), "hi", Utc::now());

        assert!(message.belongs_to(&RoomKey::new("u1_u2")));
        assert!(!message.belongs_to(&RoomKey::global()));
    }

    #[test]
    fn presence_accepts_either_name_field() {
        let a: PresenceEntry = serde_json::from_str(r#"{"userId":"u1","userName":"A"}"#).unwrap();
        let b: PresenceEntry =
            serde_json::from_str(r#"{"userId":"u1","displayName":"A"}"#).unwrap();
        assert_eq!(a, b);

        let bare: PresenceEntry = serde_json::from_str(r#"{"userId":"u2"}"#).unwrap();
        assert_eq!(bare.display_name, "");
    }
}
