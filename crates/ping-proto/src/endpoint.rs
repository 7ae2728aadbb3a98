//! Relay endpoint addressing.

use std::fmt;

use url::Url;

use crate::errors::{ProtocolError, Result};

/// Relay used when no endpoint is configured.
pub const DEFAULT_RELAY_URL: &str = "https://chat-backend-s009.onrender.com/";

/// Engine.IO protocol revision spoken by the client.
pub const ENGINE_IO_VERSION: u8 = 4;

const SOCKET_IO_PATH: &str = "/socket.io/";

/// Parsed relay endpoint.
///
/// Accepts `http`, `https`, `ws` and `wss` URLs. HTTP schemes are mapped to
/// their WebSocket equivalents. The path must be `/`: Socket.IO reads a URL
/// path as a namespace, and the client only speaks the default one. The
/// engine path is always `/socket.io/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    base: Url,
}

impl Endpoint {
    /// Parse an endpoint URL.
    pub fn parse(url: &str) -> Result<Self> {
        let base = Url::parse(url.trim())
            .map_err(|e| ProtocolError::InvalidEndpoint(format!("{url}: {e}")))?;

        match base.scheme() {
            "http" | "https" | "ws" | "wss" => {},
            other => {
                return Err(ProtocolError::InvalidEndpoint(format!("unsupported scheme {other}")));
            },
        }
        if base.host_str().is_none() {
            return Err(ProtocolError::InvalidEndpoint(format!("{url}: missing host")));
        }
        if base.path() != "/" {
            return Err(ProtocolError::InvalidEndpoint(format!(
                "{url}: namespace path {} is not supported",
                base.path()
            )));
        }

        Ok(Self { base })
    }

    /// Endpoint from an optional configured value, falling back to
    /// [`DEFAULT_RELAY_URL`] if unset or blank.
    pub fn from_config(url: Option<&str>) -> Result<Self> {
        match url.map(str::trim).filter(|u| !u.is_empty()) {
            Some(url) => Self::parse(url),
            None => Self::parse(DEFAULT_RELAY_URL),
        }
    }

    /// URL as configured.
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// WebSocket URL for the Socket.IO handshake.
    pub fn websocket_url(&self) -> String {
        let mut url = self.base.clone();
        let scheme = match url.scheme() {
            "https" | "wss" => "wss",
            _ => "ws",
        };
        // Only fails for cannot-be-a-base URLs, rejected in `parse`.
        let _ = url.set_scheme(scheme);

        url.set_path(SOCKET_IO_PATH);
        url.set_query(Some(&format!("EIO={ENGINE_IO_VERSION}&transport=websocket")));
        url.set_fragment(None);
        url.to_string()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base)
    }
}
