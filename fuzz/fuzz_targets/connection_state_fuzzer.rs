//! Fuzz target for the relay Connection state machine
//!
//! # Strategy
//!
//! - Frames: well-formed handshake, namespace connect, pings, close, and raw
//!   arbitrary text
//! - Emits interleaved with frames in every state
//! - Time: arbitrary advances, including past every deadline
//!
//! # Invariants
//!
//! - Never panics, whatever the relay sends
//! - The queue never exceeds `max_queued`
//! - Nothing is sent on behalf of the application before the namespace
//!   connects
//! - Once closed, the connection stays closed and reports no deadline

#![no_main]

use std::time::{Duration, Instant};

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use ping_core::{Connection, ConnectionAction, ConnectionConfig, ConnectionState};
use ping_proto::{Outbound, RoomKey};

#[derive(Debug, Clone, Arbitrary)]
enum Op {
    Frame(FrameChoice),
    Emit(u8),
    Flush,
    Advance(u32),
    Tick,
    Disconnect,
}

#[derive(Debug, Clone, Arbitrary)]
enum FrameChoice {
    Open { ping_interval: u64, ping_timeout: u64 },
    Connect,
    ConnectError,
    Ping,
    Close,
    Raw(String),
}

impl FrameChoice {
    fn text(&self) -> String {
        match self {
            Self::Open { ping_interval, ping_timeout } => format!(
                r#"0{{"sid":"e1","upgrades":[],"pingInterval":{ping_interval},"pingTimeout":{ping_timeout}}}"#
            ),
            Self::Connect => r#"40{"sid":"n1"}"#.to_string(),
            Self::ConnectError => r#"44{"message":"nope"}"#.to_string(),
            Self::Ping => "2".to_string(),
            Self::Close => "1".to_string(),
            Self::Raw(text) => text.clone(),
        }
    }
}

const MAX_QUEUED: usize = 8;

fuzz_target!(|ops: Vec<Op>| {
    let mut now = Instant::now();
    let config = ConnectionConfig { max_queued: MAX_QUEUED, ..ConnectionConfig::default() };
    let mut conn = Connection::new(now, config);

    for op in ops {
        let was_connected = conn.state() == ConnectionState::Connected;
        let was_closed = conn.state() == ConnectionState::Closed;

        let actions = match op {
            Op::Frame(frame) => conn.handle_text(&frame.text(), now).unwrap_or_default(),
            Op::Emit(n) => {
                let actions = conn.emit(Outbound::JoinChat(RoomKey::new(format!("r{n}"))));
                let actions = actions.unwrap_or_default();
                if !was_connected {
                    assert!(actions.is_empty(), "emit sent before namespace connect");
                }
                actions
            },
            Op::Flush => {
                let actions = conn.flush_queue().unwrap_or_default();
                if !was_connected {
                    assert!(actions.is_empty(), "flush sent before namespace connect");
                }
                actions
            },
            Op::Advance(ms) => {
                now += Duration::from_millis(u64::from(ms));
                conn.tick(now)
            },
            Op::Tick => conn.tick(now),
            Op::Disconnect => conn.disconnect(),
        };

        assert!(conn.queued() <= MAX_QUEUED, "queue exceeded its limit");

        if actions.iter().any(|a| matches!(a, ConnectionAction::Close { .. })) {
            assert_eq!(conn.state(), ConnectionState::Closed);
        }
        if was_closed {
            assert_eq!(conn.state(), ConnectionState::Closed, "closed connection reopened");
            assert!(actions.is_empty());
        }
        if conn.state() == ConnectionState::Closed {
            assert!(conn.next_deadline().is_none());
        } else if let Some(deadline) = conn.next_deadline() {
            // Deadline arithmetic must not overflow
            let _ = deadline.checked_duration_since(now);
        }
    }
});
