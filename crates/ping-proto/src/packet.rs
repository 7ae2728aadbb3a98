//! Engine.IO v4 / Socket.IO v4 text packet framing.
//!
//! Each WebSocket text frame carries exactly one Engine.IO packet. The first
//! character is the Engine.IO packet type; `message` packets nest a Socket.IO
//! packet whose first character is the Socket.IO packet type.
//!
//! ```text
//! 0{"sid":"..","pingInterval":25000,..}   open
//! 2 / 3                                   ping / pong
//! 40                                      connect default namespace
//! 40{"sid":".."}                          namespace connected
//! 42["receive_message",{..}]              event
//! 41                                      namespace disconnect
//! ```
//!
//! Only the default namespace is used. Binary packets are refused.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{ProtocolError, Result};

/// Contents of the Engine.IO `open` packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    /// Engine.IO session id.
    pub sid: String,
    /// Transports the server offers to upgrade to.
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Server ping interval in milliseconds.
    pub ping_interval: u64,
    /// Grace period after a missed ping, in milliseconds.
    pub ping_timeout: u64,
    /// Maximum accepted payload size in bytes.
    #[serde(default)]
    pub max_payload: u64,
}

/// Socket.IO packet nested in an Engine.IO `message`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketPacket {
    /// Namespace connect. The client sends it bare; the server answers with
    /// its namespace session id.
    Connect {
        /// Namespace session id (server → client only).
        sid: Option<String>,
    },
    /// Namespace disconnect.
    Disconnect,
    /// Named event with JSON arguments.
    Event {
        /// Event name.
        name: String,
        /// Event arguments.
        args: Vec<Value>,
        /// Acknowledgement id, if the sender wants an ack.
        ack: Option<u64>,
    },
    /// Acknowledgement of an earlier event.
    Ack {
        /// Acknowledged id.
        id: u64,
        /// Ack arguments.
        args: Vec<Value>,
    },
    /// Server refused the namespace connect.
    ConnectError {
        /// Server-provided reason.
        message: String,
    },
}

/// Engine.IO packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    /// Session opened.
    Open(Handshake),
    /// Session closed.
    Close,
    /// Heartbeat request (server → client in v4).
    Ping,
    /// Heartbeat response.
    Pong,
    /// Socket.IO payload.
    Message(SocketPacket),
    /// Transport upgrade marker.
    Upgrade,
    /// No-op.
    Noop,
}

impl Packet {
    /// Shorthand for an event packet without ack.
    pub fn event(name: impl Into<String>, args: Vec<Value>) -> Self {
        Self::Message(SocketPacket::Event { name: name.into(), args, ack: None })
    }

    /// Encode to the text frame representation.
    pub fn encode(&self) -> Result<String> {
        Ok(match self {
            Self::Open(handshake) => format!("0{}", serde_json::to_string(handshake)?),
            Self::Close => "1".to_string(),
            Self::Ping => "2".to_string(),
            Self::Pong => "3".to_string(),
            Self::Message(packet) => format!("4{}", encode_socket(packet)?),
            Self::Upgrade => "5".to_string(),
            Self::Noop => "6".to_string(),
        })
    }

    /// Decode a text frame.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::EmptyPacket`] for an empty frame
    /// - [`ProtocolError::UnknownPacketType`] for unknown type characters
    /// - [`ProtocolError::Unsupported`] for binary packets or foreign
    ///   namespaces
    /// - [`ProtocolError::InvalidJson`] / [`ProtocolError::MalformedEvent`]
    ///   for bad bodies
    pub fn decode(text: &str) -> Result<Self> {
        let mut chars = text.chars();
        let code = chars.next().ok_or(ProtocolError::EmptyPacket)?;
        let body = chars.as_str();

        match code {
            '0' => Ok(Self::Open(serde_json::from_str(body)?)),
            '1' => Ok(Self::Close),
            '2' => Ok(Self::Ping),
            '3' => Ok(Self::Pong),
            '4' => Ok(Self::Message(decode_socket(body)?)),
            '5' => Ok(Self::Upgrade),
            '6' => Ok(Self::Noop),
            other => Err(ProtocolError::UnknownPacketType { layer: "engine.io", code: other }),
        }
    }
}

fn encode_socket(packet: &SocketPacket) -> Result<String> {
    Ok(match packet {
        SocketPacket::Connect { sid: None } => "0".to_string(),
        SocketPacket::Connect { sid: Some(sid) } => {
            format!("0{}", serde_json::json!({ "sid": sid }))
        },
        SocketPacket::Disconnect => "1".to_string(),
        SocketPacket::Event { name, args, ack } => {
            let mut array = Vec::with_capacity(args.len() + 1);
            array.push(Value::String(name.clone()));
            array.extend(args.iter().cloned());
            let ack = ack.map(|id| id.to_string()).unwrap_or_default();
            format!("2{ack}{}", serde_json::to_string(&array)?)
        },
        SocketPacket::Ack { id, args } => format!("3{id}{}", serde_json::to_string(args)?),
        SocketPacket::ConnectError { message } => {
            format!("4{}", serde_json::json!({ "message": message }))
        },
    })
}

fn decode_socket(text: &str) -> Result<SocketPacket> {
    let mut chars = text.chars();
    let code = chars.next().ok_or(ProtocolError::EmptyPacket)?;
    let rest = strip_namespace(chars.as_str())?;

    match code {
        '0' => {
            if rest.is_empty() {
                return Ok(SocketPacket::Connect { sid: None });
            }
            let body: Value = serde_json::from_str(rest)?;
            let sid = body.get("sid").and_then(Value::as_str).map(str::to_string);
            Ok(SocketPacket::Connect { sid })
        },
        '1' => Ok(SocketPacket::Disconnect),
        '2' => {
            let (ack, json) = split_ack(rest);
            let (name, args) = split_event(json)?;
            Ok(SocketPacket::Event { name, args, ack })
        },
        '3' => {
            let (id, json) = split_ack(rest);
            let id = id.ok_or_else(|| ProtocolError::MalformedEvent("ack without id".into()))?;
            let args: Vec<Value> = serde_json::from_str(json)?;
            Ok(SocketPacket::Ack { id, args })
        },
        '4' => {
            let message = match serde_json::from_str::<Value>(rest) {
                Ok(Value::Object(map)) => map
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("connect refused")
                    .to_string(),
                Ok(Value::String(s)) => s,
                _ => rest.to_string(),
            };
            Ok(SocketPacket::ConnectError { message })
        },
        '5' | '6' => Err(ProtocolError::Unsupported("binary packets")),
        other => Err(ProtocolError::UnknownPacketType { layer: "socket.io", code: other }),
    }
}

/// Strip a `/namespace,` prefix. Only the default namespace is accepted.
fn strip_namespace(text: &str) -> Result<&str> {
    if !text.starts_with('/') {
        return Ok(text);
    }
    let (namespace, rest) = text.split_once(',').unwrap_or((text, ""));
    if namespace == "/" { Ok(rest) } else { Err(ProtocolError::Unsupported("non-default namespace")) }
}

/// Split a leading decimal ack id from the JSON body.
fn split_ack(text: &str) -> (Option<u64>, &str) {
    let digits = text.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return (None, text);
    }
    let (id, rest) = text.split_at(digits);
    (id.parse().ok(), rest)
}

fn split_event(json: &str) -> Result<(String, Vec<Value>)> {
    let value: Value = serde_json::from_str(json)?;
    let Value::Array(mut items) = value else {
        return Err(ProtocolError::MalformedEvent("event body is not an array".into()));
    };
    if items.is_empty() {
        return Err(ProtocolError::MalformedEvent("event array is empty".into()));
    }
    let Value::String(name) = items.remove(0) else {
        return Err(ProtocolError::MalformedEvent("event name is not a string".into()));
    };
    Ok((name, items))
}
