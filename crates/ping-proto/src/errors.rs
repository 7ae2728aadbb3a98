//! Protocol error types.
//!
//! Every decoding path in this crate returns [`ProtocolError`] instead of
//! panicking. Inbound data comes from a remote relay and must be treated as
//! untrusted.

use thiserror::Error;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while encoding or decoding relay traffic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Received an empty text frame.
    #[error("empty packet")]
    EmptyPacket,

    /// Leading packet type character is not a known Engine.IO or Socket.IO
    /// type.
    #[error("unknown {layer} packet type {code:?}")]
    UnknownPacketType {
        /// Which framing layer rejected the packet.
        layer: &'static str,
        /// Offending type character.
        code: char,
    },

    /// Packet kind is valid but not supported by this client.
    #[error("unsupported packet: {0}")]
    Unsupported(&'static str),

    /// Packet body is not valid JSON.
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    /// Event packet does not have the `["name", ...args]` shape.
    #[error("malformed event: {0}")]
    MalformedEvent(String),

    /// Event payload does not match the shape expected for its name.
    #[error("invalid payload for {event}: {reason}")]
    InvalidPayload {
        /// Event name.
        event: &'static str,
        /// Deserializer error message.
        reason: String,
    },

    /// Relay endpoint could not be parsed or uses an unsupported scheme.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidJson(err.to_string())
    }
}
