//! Error types for the connection state machine.
//!
//! Strongly-typed errors for protocol violations, timeouts, and invalid state
//! transitions. Callers log and drop most of these; only the connection
//! itself decides when a link is dead.

use std::time::Duration;

use ping_proto::ProtocolError;
use thiserror::Error;

use crate::connection::ConnectionState;

/// Errors that can occur during connection state machine operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// Invalid state transition attempted
    #[error("invalid state transition: cannot {operation} from {state:?}")]
    InvalidState {
        /// Current state when error occurred
        state: ConnectionState,
        /// Operation that was attempted
        operation: &'static str,
    },

    /// Received a packet that is not valid in the current state
    #[error("unexpected {packet} packet in state {state:?}")]
    UnexpectedPacket {
        /// Current state when the packet was received
        state: ConnectionState,
        /// Kind of the unexpected packet
        packet: &'static str,
    },

    /// Engine.IO open or namespace connect did not complete in time
    #[error("handshake timeout after {elapsed:?}")]
    HandshakeTimeout {
        /// How long we waited
        elapsed: Duration,
    },

    /// Server stopped sending pings
    #[error("ping timeout after {elapsed:?}")]
    PingTimeout {
        /// Time since the last ping
        elapsed: Duration,
    },

    /// Server refused the namespace connect
    #[error("connect refused: {0}")]
    Refused(String),

    /// Framing or payload error
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl ConnectionError {
    /// Returns true if this error is transient and may succeed on retry.
    ///
    /// Timeouts are transient; a fresh socket usually recovers. Protocol
    /// violations and refusals indicate a broken or incompatible peer.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::HandshakeTimeout { .. } | Self::PingTimeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_errors_are_transient() {
        assert!(ConnectionError::HandshakeTimeout { elapsed: Duration::from_secs(21) }.is_transient());
        assert!(ConnectionError::PingTimeout { elapsed: Duration::from_secs(46) }.is_transient());
    }

    #[test]
    fn protocol_violations_are_fatal() {
        assert!(
            !ConnectionError::InvalidState {
                state: ConnectionState::Closed,
                operation: "emit",
            }
            .is_transient()
        );
        assert!(
            !ConnectionError::UnexpectedPacket {
                state: ConnectionState::Handshaking,
                packet: "event",
            }
            .is_transient()
        );
        assert!(!ConnectionError::Refused("nope".into()).is_transient());
        assert!(!ConnectionError::Protocol(ProtocolError::EmptyPacket).is_transient());
    }
}
