//! Client
//!
//! Session state machine and connection manager for the Ping chat client.
//!
//! # Architecture
//!
//! The client follows the same Sans-IO and action-based patterns as
//! [`ping_core`]. The [`Session`] receives [`SessionEvent`]s, updates its
//! [`ChatState`], and returns [`SessionAction`]s. The [`Runtime`] executes
//! those actions against a [`ConnectionManager`], which owns the link to the
//! relay.
//!
//! # Components
//!
//! - [`Session`]: registration, room switching, typing debounce
//! - [`ChatState`]: observable view of the active conversation
//! - [`ConnectionManager`]: idempotent connect, buffered send, subscriptions
//! - [`Runtime`] / [`RuntimeHandle`]: async event loop and its command handle
//! - [`Transport`] / [`Link`]: seam between the manager and socket I/O
//!
//! # Transport (optional)
//!
//! With the `transport` feature enabled, this crate also provides
//! [`transport::WebSocketTransport`], which speaks to a real relay over
//! WebSocket with automatic reconnects.

#![forbid(unsafe_code)]

mod dispatch;
mod event;
mod link;
mod manager;
pub mod reconnect;
mod runtime;
mod session;
mod state;

#[cfg(feature = "transport")]
pub mod transport;

pub use dispatch::Handlers;
pub use event::{SessionAction, SessionEvent};
pub use link::{DEFAULT_LINK_CAPACITY, Link, LinkCommand, LinkEvent, LinkPeer, SHUTDOWN_GRACE, Transport};
pub use manager::{ConnectionManager, ManagerError, ManagerEvent};
pub use ping_core::{ConnectionConfig, Environment, SystemEnv};
pub use reconnect::ReconnectConfig;
pub use runtime::{Command, Runtime, RuntimeConfig, RuntimeError, RuntimeHandle};
pub use session::{DEFAULT_TYPING_TIMEOUT, Session, SessionConfig};
pub use state::{ChatState, ConnectionStatus};
