//! Relay connection state machine.
//!
//! Manages one Engine.IO session and its default Socket.IO namespace:
//! handshake, heartbeats, liveness timeout, and buffering of events emitted
//! before the namespace is connected. Uses the action pattern: methods take
//! time as input and return actions for the driver to execute. No I/O.
//!
//! # State Machine
//!
//! ```text
//! ┌─────────────┐  open   ┌────────────┐  40{sid}  ┌───────────┐
//! │ Handshaking │────────>│ Connecting │──────────>│ Connected │
//! └─────────────┘  (→40)  └────────────┘           └───────────┘
//!        │                      │                        │
//!        │ Timeout              │ Timeout/Refused        │ Ping timeout/Close
//!        ↓                      ↓                        ↓
//!   ┌────────┐             ┌────────┐               ┌────────┐
//!   │ Closed │             │ Closed │               │ Closed │
//!   └────────┘             └────────┘               └────────┘
//! ```
//!
//! A state machine covers one socket. After the transport reconnects, the
//! driver builds a new one.

use std::{collections::VecDeque, time::Duration};

use ping_proto::{EventName, Inbound, Outbound, Packet, SocketPacket};

use crate::{env::MonotonicInstant, error::ConnectionError};

/// Time allowed to receive the open packet and the namespace connect.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(20);

/// Maximum events buffered while not connected.
pub const DEFAULT_MAX_QUEUED: usize = 256;

/// Ping interval assumed until the server's handshake says otherwise.
pub const FALLBACK_PING_INTERVAL: Duration = Duration::from_secs(25);

/// Ping grace period assumed until the server's handshake says otherwise.
pub const FALLBACK_PING_TIMEOUT: Duration = Duration::from_secs(20);

/// Upper bound on the liveness window a relay can advertise. Keeps deadline
/// arithmetic from overflowing the instant type.
pub const MAX_LIVENESS: Duration = Duration::from_secs(24 * 60 * 60);

/// Actions returned by the connection state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionAction {
    /// Write this text frame to the socket.
    SendText(String),

    /// Namespace connected; the session may register.
    Connected {
        /// Namespace session id assigned by the relay.
        sid: String,
    },

    /// Hand a decoded relay event to the application.
    Deliver(Inbound),

    /// The link is dead; the transport should drop and reopen the socket.
    Close {
        /// Reason for closing the connection.
        reason: String,
    },
}

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Socket open, waiting for the Engine.IO open packet
    Handshaking,
    /// Namespace connect sent, waiting for the relay to accept it
    Connecting,
    /// Namespace connected, events flow
    Connected,
    /// Connection closed (graceful or error)
    Closed,
}

/// Connection configuration
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Timeout for completing the open + connect handshake
    pub handshake_timeout: Duration,
    /// Maximum events buffered before the namespace connects
    pub max_queued: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self { handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT, max_queued: DEFAULT_MAX_QUEUED }
    }
}

/// Connection state machine.
///
/// Generic over the instant type to support both real time and virtual time
/// for deterministic testing.
#[derive(Debug, Clone)]
pub struct Connection<I: MonotonicInstant> {
    state: ConnectionState,
    config: ConnectionConfig,
    /// When the socket opened. Handshake timeout counts from here.
    opened_at: I,
    /// Last ping from the server (or connect time).
    last_ping: I,
    /// Ping interval plus ping timeout from the handshake.
    liveness: Duration,
    /// Engine.IO session id.
    engine_sid: Option<String>,
    /// Namespace session id.
    sid: Option<String>,
    /// Events emitted before the namespace connected, oldest first.
    queue: VecDeque<Outbound>,
}

impl<I: MonotonicInstant> Connection<I> {
    /// Create a connection for a freshly opened socket.
    pub fn new(now: I, config: ConnectionConfig) -> Self {
        Self {
            state: ConnectionState::Handshaking,
            config,
            opened_at: now,
            last_ping: now,
            liveness: FALLBACK_PING_INTERVAL + FALLBACK_PING_TIMEOUT,
            engine_sid: None,
            sid: None,
            queue: VecDeque::new(),
        }
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Namespace session id. `None` until connected.
    pub fn sid(&self) -> Option<&str> {
        self.sid.as_deref()
    }

    /// Engine.IO session id. `None` until the open packet arrives.
    pub fn engine_sid(&self) -> Option<&str> {
        self.engine_sid.as_deref()
    }

    /// Number of events waiting for the namespace to connect.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Move pending events into a new connection (after a reconnect).
    pub fn take_queue(&mut self) -> VecDeque<Outbound> {
        std::mem::take(&mut self.queue)
    }

    /// Adopt events left over from a previous connection.
    ///
    /// They are sent ahead of anything emitted later, preserving order.
    pub fn restore_queue(&mut self, mut pending: VecDeque<Outbound>) {
        pending.append(&mut self.queue);
        self.queue = pending;
        self.enforce_queue_limit();
    }

    /// Send everything buffered before the namespace connected.
    ///
    /// Kept separate from the connect transition so the driver can register
    /// the session first. No-op unless connected.
    ///
    /// # Errors
    ///
    /// - `ConnectionError::Protocol` if an event cannot be encoded
    pub fn flush_queue(&mut self) -> Result<Vec<ConnectionAction>, ConnectionError> {
        if self.state != ConnectionState::Connected {
            return Ok(vec![]);
        }
        std::mem::take(&mut self.queue)
            .iter()
            .map(|event| encode(event).map(ConnectionAction::SendText))
            .collect()
    }

    /// Emit an event.
    ///
    /// Sends immediately when connected; otherwise buffers until the
    /// namespace connects. When the buffer is full the oldest event is
    /// dropped.
    ///
    /// # Errors
    ///
    /// - `ConnectionError::InvalidState` if the connection is closed
    /// - `ConnectionError::Protocol` if the event cannot be encoded
    pub fn emit(&mut self, event: Outbound) -> Result<Vec<ConnectionAction>, ConnectionError> {
        match self.state {
            ConnectionState::Closed => {
                Err(ConnectionError::InvalidState { state: self.state, operation: "emit" })
            },
            ConnectionState::Connected => Ok(vec![ConnectionAction::SendText(encode(&event)?)]),
            ConnectionState::Handshaking | ConnectionState::Connecting => {
                self.queue.push_back(event);
                self.enforce_queue_limit();
                Ok(vec![])
            },
        }
    }

    /// Process an incoming text frame.
    ///
    /// # Errors
    ///
    /// - `ConnectionError::Protocol` if the frame or event payload is
    ///   malformed
    /// - `ConnectionError::UnexpectedPacket` if the packet is out of order
    /// - `ConnectionError::InvalidState` if the connection is closed
    pub fn handle_text(
        &mut self,
        text: &str,
        now: I,
    ) -> Result<Vec<ConnectionAction>, ConnectionError> {
        if self.state == ConnectionState::Closed {
            return Err(ConnectionError::InvalidState { state: self.state, operation: "handle_text" });
        }

        match (self.state, Packet::decode(text)?) {
            (ConnectionState::Handshaking, Packet::Open(handshake)) => {
                self.liveness = Duration::from_millis(handshake.ping_interval)
                    .saturating_add(Duration::from_millis(handshake.ping_timeout))
                    .min(MAX_LIVENESS);
                self.engine_sid = Some(handshake.sid);
                self.state = ConnectionState::Connecting;
                self.last_ping = now;

                let connect = Packet::Message(SocketPacket::Connect { sid: None }).encode()?;
                Ok(vec![ConnectionAction::SendText(connect)])
            },

            (ConnectionState::Connecting, Packet::Message(SocketPacket::Connect { sid })) => {
                let sid = sid.unwrap_or_default();
                tracing::debug!(%sid, queued = self.queue.len(), "namespace connected");

                self.state = ConnectionState::Connected;
                self.sid = Some(sid.clone());
                self.last_ping = now;

                Ok(vec![ConnectionAction::Connected { sid }])
            },

            (ConnectionState::Connecting, Packet::Message(SocketPacket::ConnectError { message })) => {
                self.state = ConnectionState::Closed;
                let reason = ConnectionError::Refused(message).to_string();
                Ok(vec![ConnectionAction::Close { reason }])
            },

            (ConnectionState::Connecting | ConnectionState::Connected, Packet::Ping) => {
                self.last_ping = now;
                Ok(vec![ConnectionAction::SendText(Packet::Pong.encode()?)])
            },

            (_, Packet::Pong | Packet::Noop | Packet::Upgrade) => Ok(vec![]),

            (ConnectionState::Connected, Packet::Message(SocketPacket::Event { name, args, .. })) => {
                let Ok(name) = name.parse::<EventName>() else {
                    tracing::debug!(event = %name, "ignoring unknown relay event");
                    return Ok(vec![]);
                };
                let event = Inbound::from_args(name, args)?;
                Ok(vec![ConnectionAction::Deliver(event)])
            },

            (ConnectionState::Connected, Packet::Message(SocketPacket::Ack { id, .. })) => {
                tracing::debug!(id, "ignoring unsolicited ack");
                Ok(vec![])
            },

            (ConnectionState::Connected, Packet::Message(SocketPacket::Disconnect)) => {
                self.state = ConnectionState::Closed;
                Ok(vec![ConnectionAction::Close { reason: "relay disconnected namespace".into() }])
            },

            (_, Packet::Close) => {
                self.state = ConnectionState::Closed;
                Ok(vec![ConnectionAction::Close { reason: "relay closed session".into() }])
            },

            (state, packet) => {
                Err(ConnectionError::UnexpectedPacket { state, packet: packet_kind(&packet) })
            },
        }
    }

    /// Process periodic maintenance (handshake and ping timeouts).
    pub fn tick(&mut self, now: I) -> Vec<ConnectionAction> {
        let error = match self.state {
            ConnectionState::Handshaking | ConnectionState::Connecting => {
                let elapsed = now - self.opened_at;
                (elapsed >= self.config.handshake_timeout)
                    .then_some(ConnectionError::HandshakeTimeout { elapsed })
            },
            ConnectionState::Connected => {
                let elapsed = now - self.last_ping;
                (elapsed >= self.liveness).then_some(ConnectionError::PingTimeout { elapsed })
            },
            ConnectionState::Closed => None,
        };

        match error {
            Some(error) => {
                self.state = ConnectionState::Closed;
                vec![ConnectionAction::Close { reason: error.to_string() }]
            },
            None => vec![],
        }
    }

    /// When [`Self::tick`] next needs to run. `None` once closed.
    pub fn next_deadline(&self) -> Option<I> {
        match self.state {
            ConnectionState::Handshaking | ConnectionState::Connecting => {
                Some(self.opened_at + self.config.handshake_timeout)
            },
            ConnectionState::Connected => Some(self.last_ping + self.liveness),
            ConnectionState::Closed => None,
        }
    }

    /// Close gracefully.
    ///
    /// Returns the namespace disconnect packet when connected.
    pub fn disconnect(&mut self) -> Vec<ConnectionAction> {
        let was_connected = self.state == ConnectionState::Connected;
        self.state = ConnectionState::Closed;
        self.queue.clear();

        if !was_connected {
            return vec![];
        }
        Packet::Message(SocketPacket::Disconnect)
            .encode()
            .map(|text| vec![ConnectionAction::SendText(text)])
            .unwrap_or_default()
    }

    fn enforce_queue_limit(&mut self) {
        while self.queue.len() > self.config.max_queued {
            if let Some(dropped) = self.queue.pop_front() {
                tracing::warn!(event = %dropped.name(), "outbound queue full, dropping oldest event");
            }
        }
    }
}

fn encode(event: &Outbound) -> Result<String, ConnectionError> {
    Ok(Packet::event(event.name().as_str(), event.to_args()?).encode()?)
}

fn packet_kind(packet: &Packet) -> &'static str {
    match packet {
        Packet::Open(_) => "open",
        Packet::Close => "close",
        Packet::Ping => "ping",
        Packet::Pong => "pong",
        Packet::Upgrade => "upgrade",
        Packet::Noop => "noop",
        Packet::Message(SocketPacket::Connect { .. }) => "connect",
        Packet::Message(SocketPacket::Disconnect) => "disconnect",
        Packet::Message(SocketPacket::Event { .. }) => "event",
        Packet::Message(SocketPacket::Ack { .. }) => "ack",
        Packet::Message(SocketPacket::ConnectError { .. }) => "connect_error",
    }
}
