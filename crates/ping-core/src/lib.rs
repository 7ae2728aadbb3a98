//! Core state machines for the Ping client.
//!
//! Pure, I/O-free building blocks shared by the session layer and its
//! drivers. Time is always passed in, never read, so the same code runs
//! against real clocks in production and virtual clocks in tests.
//!
//! # Components
//!
//! - [`connection::Connection`]: one relay socket (handshake, heartbeats,
//!   outbound buffering)
//! - [`debounce::Debouncer`]: single-deadline debounce timer
//! - [`env::Environment`]: clock abstraction

#![forbid(unsafe_code)]

pub mod connection;
pub mod debounce;
pub mod env;
pub mod error;

pub use connection::{Connection, ConnectionAction, ConnectionConfig, ConnectionState};
pub use debounce::Debouncer;
pub use env::{Environment, MonotonicInstant, SystemEnv};
pub use error::ConnectionError;
