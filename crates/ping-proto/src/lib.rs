//! Protocol
//!
//! Wire-level vocabulary for the Ping relay: the data model, the named events
//! exchanged with the relay, and the Engine.IO / Socket.IO text framing that
//! carries them.
//!
//! # Components
//!
//! - [`Packet`]: Engine.IO packet with nested [`SocketPacket`]
//! - [`Outbound`] / [`Inbound`]: typed events in each direction
//! - [`Endpoint`]: relay URL and its WebSocket handshake URL
//! - [`Identity`], [`RoomKey`], [`Message`], [`PresenceEntry`]: data model

#![forbid(unsafe_code)]

pub mod endpoint;
pub mod errors;
pub mod event;
pub mod packet;
pub mod types;

pub use endpoint::{DEFAULT_RELAY_URL, Endpoint};
pub use errors::ProtocolError;
pub use event::{EventName, Inbound, Outbound, RegisterUser, TypingStarted, TypingStopped};
pub use packet::{Handshake, Packet, SocketPacket};
pub use types::{
    DEFAULT_DISPLAY_NAME, GLOBAL_ROOM, GLOBAL_ROOM_TITLE, Identity, Message, PRIVATE_ROOM_SEPARATOR,
    PresenceEntry, RoomKey,
};
