//! Relay event vocabulary.
//!
//! The relay speaks a fixed set of named events. [`Outbound`] covers what the
//! client emits; [`Inbound`] covers what the relay broadcasts. Both convert
//! to and from the `(name, args)` pair carried by a Socket.IO event packet.
//!
//! # Invariants
//!
//! - Each variant maps to exactly one [`EventName`] (enforced by match
//!   exhaustiveness).
//! - Decoding never panics; shape mismatches return
//!   [`ProtocolError::InvalidPayload`].

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{
    Message, PresenceEntry, RoomKey,
    errors::{ProtocolError, Result},
};

/// Names of every event in the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    /// Announce identity (client → relay).
    RegisterUser,
    /// Subscribe to a room (client → relay).
    JoinChat,
    /// Unsubscribe from a room (client → relay).
    LeaveChat,
    /// Post a message (client → relay).
    SendMessage,
    /// Typing started (both directions).
    Typing,
    /// Typing stopped (both directions).
    StopTyping,
    /// History snapshot (relay → client).
    LoadMessages,
    /// New message (relay → client).
    ReceiveMessage,
    /// Presence snapshot (relay → client).
    OnlineUsers,
}

impl EventName {
    /// All event names.
    pub const ALL: [Self; 9] = [
        Self::RegisterUser,
        Self::JoinChat,
        Self::LeaveChat,
        Self::SendMessage,
        Self::Typing,
        Self::StopTyping,
        Self::LoadMessages,
        Self::ReceiveMessage,
        Self::OnlineUsers,
    ];

    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RegisterUser => "register_user",
            Self::JoinChat => "join_chat",
            Self::LeaveChat => "leave_chat",
            Self::SendMessage => "send_message",
            Self::Typing => "typing",
            Self::StopTyping => "stop_typing",
            Self::LoadMessages => "load_messages",
            Self::ReceiveMessage => "receive_message",
            Self::OnlineUsers => "online_users",
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventName {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| ProtocolError::MalformedEvent(format!("unknown event {s:?}")))
    }
}

/// `register_user` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterUser {
    /// User id.
    #[serde(rename = "userId")]
    pub user_id: String,
    /// Display name.
    #[serde(rename = "userName", alias = "displayName")]
    pub display_name: String,
}

/// Outbound `typing` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingStarted {
    /// Room being typed in.
    #[serde(rename = "chatId", alias = "roomKey")]
    pub room_key: RoomKey,
    /// Name to show to other participants.
    #[serde(rename = "userName", alias = "displayName")]
    pub display_name: String,
}

/// Outbound `stop_typing` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingStopped {
    /// Room that was being typed in.
    #[serde(rename = "chatId", alias = "roomKey")]
    pub room_key: RoomKey,
}

/// Inbound `typing` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct TypingNotice {
    #[serde(rename = "userName", alias = "displayName", default)]
    display_name: Option<String>,
}

/// Events emitted by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Announce identity; sent once per connection.
    RegisterUser(RegisterUser),
    /// Subscribe this connection to a room's broadcasts.
    JoinChat(RoomKey),
    /// Unsubscribe from a room's broadcasts.
    LeaveChat(RoomKey),
    /// Post a message.
    SendMessage(Message),
    /// Local user is typing.
    Typing(TypingStarted),
    /// Local user stopped typing.
    StopTyping(TypingStopped),
}

impl Outbound {
    /// Event name of this variant.
    pub fn name(&self) -> EventName {
        match self {
            Self::RegisterUser(_) => EventName::RegisterUser,
            Self::JoinChat(_) => EventName::JoinChat,
            Self::LeaveChat(_) => EventName::LeaveChat,
            Self::SendMessage(_) => EventName::SendMessage,
            Self::Typing(_) => EventName::Typing,
            Self::StopTyping(_) => EventName::StopTyping,
        }
    }

    /// Encode into Socket.IO event arguments.
    pub fn to_args(&self) -> Result<Vec<Value>> {
        let arg = match self {
            Self::RegisterUser(p) => serde_json::to_value(p)?,
            Self::JoinChat(room) | Self::LeaveChat(room) => Value::String(room.to_string()),
            Self::SendMessage(m) => serde_json::to_value(m)?,
            Self::Typing(p) => serde_json::to_value(p)?,
            Self::StopTyping(p) => serde_json::to_value(p)?,
        };
        Ok(vec![arg])
    }

    /// Decode from Socket.IO event arguments.
    ///
    /// Used by relays (and the simulation harness) to read client traffic.
    pub fn from_args(name: EventName, args: Vec<Value>) -> Result<Self> {
        let arg = first_arg(name, args)?;
        match name {
            EventName::RegisterUser => Ok(Self::RegisterUser(parse(name, arg)?)),
            EventName::JoinChat => Ok(Self::JoinChat(parse(name, arg)?)),
            EventName::LeaveChat => Ok(Self::LeaveChat(parse(name, arg)?)),
            EventName::SendMessage => Ok(Self::SendMessage(parse(name, arg)?)),
            EventName::Typing => Ok(Self::Typing(parse(name, arg)?)),
            EventName::StopTyping => Ok(Self::StopTyping(parse(name, arg)?)),
            EventName::LoadMessages | EventName::ReceiveMessage | EventName::OnlineUsers => {
                Err(ProtocolError::MalformedEvent(format!("{name} is not a client event")))
            },
        }
    }
}

/// Events broadcast by the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// Full history snapshot for the joined room.
    LoadMessages(Vec<Message>),
    /// One new message.
    ReceiveMessage(Message),
    /// Full presence snapshot.
    OnlineUsers(Vec<PresenceEntry>),
    /// Another participant started typing.
    Typing {
        /// Name to display. `None` when the sender has no name, which hides
        /// the indicator.
        display_name: Option<String>,
    },
    /// The typing participant stopped.
    StopTyping,
}

impl Inbound {
    /// Event name of this variant.
    pub fn name(&self) -> EventName {
        match self {
            Self::LoadMessages(_) => EventName::LoadMessages,
            Self::ReceiveMessage(_) => EventName::ReceiveMessage,
            Self::OnlineUsers(_) => EventName::OnlineUsers,
            Self::Typing { .. } => EventName::Typing,
            Self::StopTyping => EventName::StopTyping,
        }
    }

    /// Encode into Socket.IO event arguments.
    pub fn to_args(&self) -> Result<Vec<Value>> {
        let arg = match self {
            Self::LoadMessages(messages) => serde_json::to_value(messages)?,
            Self::ReceiveMessage(message) => serde_json::to_value(message)?,
            Self::OnlineUsers(users) => serde_json::to_value(users)?,
            Self::Typing { display_name } => {
                serde_json::to_value(TypingNotice { display_name: display_name.clone() })?
            },
            Self::StopTyping => return Ok(Vec::new()),
        };
        Ok(vec![arg])
    }

    /// Decode from Socket.IO event arguments.
    ///
    /// `stop_typing` ignores its arguments; the indicator is cleared
    /// unconditionally.
    pub fn from_args(name: EventName, args: Vec<Value>) -> Result<Self> {
        match name {
            EventName::StopTyping => Ok(Self::StopTyping),
            EventName::LoadMessages => Ok(Self::LoadMessages(parse(name, first_arg(name, args)?)?)),
            EventName::ReceiveMessage => {
                Ok(Self::ReceiveMessage(parse(name, first_arg(name, args)?)?))
            },
            EventName::OnlineUsers => Ok(Self::OnlineUsers(parse(name, first_arg(name, args)?)?)),
            EventName::Typing => {
                let notice: TypingNotice = parse(name, first_arg(name, args)?)?;
                let display_name = notice.display_name.filter(|n| !n.is_empty());
                Ok(Self::Typing { display_name })
            },
            EventName::RegisterUser
            | EventName::JoinChat
            | EventName::LeaveChat
            | EventName::SendMessage => {
                Err(ProtocolError::MalformedEvent(format!("{name} is not a relay event")))
            },
        }
    }
}

fn first_arg(name: EventName, args: Vec<Value>) -> Result<Value> {
    args.into_iter().next().ok_or_else(|| ProtocolError::InvalidPayload {
        event: name.as_str(),
        reason: "missing argument".to_string(),
    })
}

fn parse<T: DeserializeOwned>(name: EventName, value: Value) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| ProtocolError::InvalidPayload { event: name.as_str(), reason: e.to_string() })
}
