//! Ping terminal client entry point.
//!
//! # Usage
//!
//! ```bash
//! # Join the default relay as a guest
//! ping-tui
//!
//! # Pick an identity and a relay, with logs in a file
//! ping-tui --user-id u1 --name Alice --relay-url http://localhost:3000 --log-file ping.log
//! ```

use clap::Parser;
use ping_tui::{Config, config::Args};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    ping_tui::config::init_logging(args.log_file.as_deref())?;

    let config = Config::from_args(args)?;
    tracing::info!(user_id = config.identity.user_id(), relay = %config.endpoint, "ping-tui starting");

    Ok(ping_tui::run(config).await?)
}
