//! Observable chat state.
//!
//! [`ChatState`] is the view model of one session: the active conversation,
//! its messages, who is online and who is typing. The session mutates it;
//! everything else reads snapshots.

use ping_proto::{GLOBAL_ROOM_TITLE, Message, PresenceEntry, RoomKey};

/// Connection status as seen by the session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    /// No connection handle exists.
    #[default]
    Offline,
    /// Handle created, first handshake in progress.
    Connecting,
    /// Namespace connected and the session is registered.
    Online {
        /// Namespace session id assigned by the relay.
        sid: String,
    },
    /// Transport dropped; waiting for it to come back.
    Reconnecting,
}

impl ConnectionStatus {
    /// Whether a connection handle exists (online or not).
    pub fn is_attached(&self) -> bool {
        !matches!(self, Self::Offline)
    }

    /// Whether events can reach the relay right now.
    pub fn is_online(&self) -> bool {
        matches!(self, Self::Online { .. })
    }
}

/// Local chat state for one signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatState {
    owner: String,
    room_key: RoomKey,
    room_title: String,
    messages: Vec<Message>,
    presence: Vec<PresenceEntry>,
    typing: Option<String>,
    status: ConnectionStatus,
}

impl ChatState {
    /// Fresh state for `owner`, positioned on the global room.
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            room_key: RoomKey::global(),
            room_title: GLOBAL_ROOM_TITLE.to_string(),
            messages: Vec::new(),
            presence: Vec::new(),
            typing: None,
            status: ConnectionStatus::Offline,
        }
    }

    /// User id of the signed-in user.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Active room key.
    pub fn room_key(&self) -> &RoomKey {
        &self.room_key
    }

    /// Human-readable title of the active room.
    pub fn room_title(&self) -> &str {
        &self.room_title
    }

    /// Messages of the active room, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Last presence list received from the relay.
    pub fn presence(&self) -> &[PresenceEntry] {
        &self.presence
    }

    /// Display name of whoever is typing in the active room.
    pub fn typing(&self) -> Option<&str> {
        self.typing.as_deref()
    }

    /// Connection status.
    pub fn status(&self) -> &ConnectionStatus {
        &self.status
    }

    /// Online users other than the owner, in relay order.
    pub fn peers(&self) -> impl Iterator<Item = &PresenceEntry> {
        self.presence.iter().filter(move |entry| entry.user_id != self.owner)
    }

    /// Look up a peer by user id, or by display name ignoring case.
    pub fn find_peer(&self, query: &str) -> Option<&PresenceEntry> {
        let query = query.trim();
        self.peers()
            .find(|peer| peer.user_id == query)
            .or_else(|| self.peers().find(|peer| peer.display_name.eq_ignore_ascii_case(query)))
    }

    /// Whether the owner sent `message`.
    pub fn is_own(&self, message: &Message) -> bool {
        message.sender_id == self.owner
    }

    /// Point the state at another room. Returns `false` if it already was.
    ///
    /// Messages stay until the relay's history snapshot for the new room
    /// replaces them. The typing indicator belongs to the old room and is
    /// cleared.
    pub(crate) fn switch_room(&mut self, room_key: RoomKey, title: String) -> bool {
        self.room_title = title;
        if self.room_key == room_key {
            return false;
        }
        self.room_key = room_key;
        self.typing = None;
        true
    }

    pub(crate) fn replace_messages(&mut self, messages: Vec<Message>) {
        self.messages = messages;
    }

    pub(crate) fn append_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub(crate) fn replace_presence(&mut self, presence: Vec<PresenceEntry>) {
        self.presence = presence;
    }

    /// Returns whether the indicator changed.
    pub(crate) fn set_typing(&mut self, display_name: String) -> bool {
        if self.typing.as_deref() == Some(display_name.as_str()) {
            return false;
        }
        self.typing = Some(display_name);
        true
    }

    /// Returns whether an indicator was shown.
    pub(crate) fn clear_typing(&mut self) -> bool {
        self.typing.take().is_some()
    }

    pub(crate) fn set_status(&mut self, status: ConnectionStatus) {
        self.status = status;
    }
}
