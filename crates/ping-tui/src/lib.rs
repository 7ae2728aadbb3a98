//! Terminal UI for Ping
//!
//! A thin shell over [`ping_client::Runtime`]. The [`App`] view model and
//! [`InputState`] turn key presses into runtime [`Command`]s; the [`ui`]
//! module renders the latest [`ChatState`] snapshot. All protocol logic lives
//! in the client crates.
//!
//! [`Command`]: ping_client::Command
//! [`ChatState`]: ping_client::ChatState

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod app;
pub mod commands;
pub mod config;
pub mod input;
pub mod runtime;
pub mod terminal;
pub mod ui;

pub use app::{App, AppAction, SidebarEntry};
pub use config::{Config, ConfigError};
pub use input::{InputState, KeyInput};
pub use runtime::{TuiError, run};
pub use terminal::TerminalDriver;
