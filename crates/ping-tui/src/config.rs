//! Command-line configuration and logging setup.

use std::{
    fs::File,
    io,
    path::{Path, PathBuf},
    sync::Mutex,
};

use clap::Parser;
use ping_client::{RuntimeConfig, SessionConfig};
use ping_proto::{Endpoint, Identity, ProtocolError};
use rand::Rng;
use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Prefix of generated guest ids.
pub const GUEST_PREFIX: &str = "guest-";

/// Default log filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Configuration errors. These are fatal at start-up.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The user id was blank.
    #[error("user id must not be blank")]
    BlankUserId,

    /// The relay URL could not be parsed.
    #[error(transparent)]
    Endpoint(#[from] ProtocolError),

    /// The log file could not be created.
    #[error("cannot open log file {path}: {source}")]
    LogFile {
        /// Requested path.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },
}

/// Ping terminal chat client
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "ping-tui")]
#[command(about = "Terminal client for the Ping chat relay")]
#[command(version)]
pub struct Args {
    /// Relay URL (http, https, ws or wss)
    #[arg(long, env = "PING_RELAY_URL")]
    pub relay_url: Option<String>,

    /// Stable user id. A random guest id is generated when omitted.
    #[arg(long, env = "PING_USER_ID")]
    pub user_id: Option<String>,

    /// Display name shown to other users. Defaults to the user id.
    #[arg(long, env = "PING_DISPLAY_NAME")]
    pub name: Option<String>,

    /// Write logs to this file. Logging is off otherwise.
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Send `leave_chat` for the previous room on every switch
    #[arg(long)]
    pub explicit_leave: bool,
}

/// Resolved front-end configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Who we are.
    pub identity: Identity,
    /// Where the relay lives.
    pub endpoint: Endpoint,
    /// Runtime tuning.
    pub runtime: RuntimeConfig,
}

impl Config {
    /// Resolve parsed arguments.
    pub fn from_args(args: Args) -> Result<Self, ConfigError> {
        let user_id = args.user_id.unwrap_or_else(guest_id);
        let name = args.name.unwrap_or_else(|| user_id.clone());
        let identity = Identity::new(user_id, name).ok_or(ConfigError::BlankUserId)?;
        let endpoint = Endpoint::from_config(args.relay_url.as_deref())?;

        let runtime = RuntimeConfig {
            session: SessionConfig { explicit_leave: args.explicit_leave, ..SessionConfig::default() },
            ..RuntimeConfig::default()
        };

        Ok(Self { identity, endpoint, runtime })
    }
}

/// Random `guest-xxxxxxxx` id.
pub fn guest_id() -> String {
    let suffix: u32 = rand::rng().random();
    format!("{GUEST_PREFIX}{suffix:08x}")
}

/// Install the global subscriber, writing to `log_file`.
///
/// Without a file nothing is installed: the terminal belongs to the UI.
pub fn init_logging(log_file: Option<&Path>) -> Result<(), ConfigError> {
    let Some(path) = log_file else {
        return Ok(());
    };
    let file = File::create(path)
        .map_err(|source| ConfigError::LogFile { path: path.to_path_buf(), source })?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::registry()
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        .with(filter)
        .init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use ping_proto::DEFAULT_RELAY_URL;

    use super::*;

    #[test]
    fn defaults_to_guest_on_default_relay() {
        let config = Config::from_args(Args::default()).unwrap();

        let user_id = config.identity.user_id();
        assert!(user_id.starts_with(GUEST_PREFIX));
        assert_eq!(user_id.len(), GUEST_PREFIX.len() + 8);
        assert_eq!(config.identity.display_name(), user_id);
        assert_eq!(config.endpoint, Endpoint::parse(DEFAULT_RELAY_URL).unwrap());
        assert!(!config.runtime.session.explicit_leave);
    }

    #[test]
    fn explicit_identity_and_relay() {
        let args = Args::try_parse_from([
            "ping-tui",
            "--user-id",
            "u1",
            "--name",
            "Alice",
            "--relay-url",
            "http://localhost:3000",
            "--explicit-leave",
        ])
        .unwrap();
        let config = Config::from_args(args).unwrap();

        assert_eq!(config.identity.user_id(), "u1");
        assert_eq!(config.identity.display_name(), "Alice");
        assert_eq!(config.endpoint.base().as_str(), "http://localhost:3000/");
        assert!(config.runtime.session.explicit_leave);
    }

    #[test]
    fn blank_user_id_is_rejected() {
        let args = Args { user_id: Some("  ".into()), ..Args::default() };
        assert!(matches!(Config::from_args(args), Err(ConfigError::BlankUserId)));
    }

    #[test]
    fn bad_relay_url_is_rejected() {
        let args = Args { relay_url: Some("ftp://relay".into()), ..Args::default() };
        assert!(matches!(Config::from_args(args), Err(ConfigError::Endpoint(_))));
    }

    #[test]
    fn guest_ids_differ() {
        assert_ne!(guest_id(), guest_id());
    }
}
