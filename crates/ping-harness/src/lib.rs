//! Test harness for the Ping client.
//!
//! An in-process relay and a memory transport, so that end-to-end tests run
//! the real runtime, connection manager, and session against relay semantics
//! without a network. Combine with `#[tokio::test(start_paused = true)]` for
//! deterministic timers.
//!
//! # Components
//!
//! - [`SimRelay`]: rooms, presence, history, and typing fan-out
//! - [`MemoryTransport`]: [`Transport`](ping_client::Transport) over channels

#![forbid(unsafe_code)]

pub mod memory_transport;
pub mod sim_relay;

pub use memory_transport::{MemoryTransport, MemoryTransportError};
pub use sim_relay::{Received, RelayConfig, SimRelay, SocketId};
