//! Session events and actions.
//!
//! Inputs to and outputs from the [`Session`](crate::Session) state machine.

use chrono::{DateTime, Utc};
use ping_proto::{Inbound, Outbound, PresenceEntry, RoomKey};

/// Events fed into the session.
///
/// Generic over the instant type so tests can drive the session with
/// hand-built time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent<I> {
    /// A connection handle was created and is handshaking.
    Connecting,

    /// The relay accepted the namespace connect.
    Connected {
        /// Namespace session id.
        sid: String,
    },

    /// The transport dropped; the handle is still alive and reconnecting.
    Disconnected {
        /// Human-readable reason.
        reason: String,
    },

    /// A relay event arrived.
    Received(Inbound),

    /// The user submitted a message in the active room.
    SendMessage {
        /// Raw input text. Blank input is ignored.
        text: String,
        /// Wall-clock time to stamp the message with.
        at: DateTime<Utc>,
    },

    /// The user edited the composer.
    NotifyTyping {
        /// Current time.
        now: I,
    },

    /// Open an arbitrary room.
    SwitchRoom {
        /// Room to open.
        room_key: RoomKey,
        /// Title to show for it.
        title: String,
    },

    /// Open the private conversation with `peer`.
    StartPrivateChat(PresenceEntry),

    /// Return to the global room.
    SelectGeneralChat,

    /// Time has passed; fire expired timers.
    Tick {
        /// Current time.
        now: I,
    },

    /// Sign out and tear the session down.
    Logout,
}

/// Actions produced by the session for the driver to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Send an event to the relay.
    Emit(Outbound),

    /// The observable chat state changed; republish it.
    StateChanged,

    /// Close the connection handle.
    Disconnect,
}
