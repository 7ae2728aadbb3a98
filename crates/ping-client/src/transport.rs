//! WebSocket transport for the client.
//!
//! Provides [`WebSocketTransport`], which runs one background task per link.
//! The task owns the socket, reconnects with exponential backoff, and
//! forwards text frames over the link channels. Protocol logic stays in the
//! Sans-IO [`Connection`](ping_core::Connection).

use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Message, client::IntoClientRequest},
};

use crate::{
    link::{DEFAULT_LINK_CAPACITY, Link, LinkCommand, LinkEvent, LinkPeer, Transport},
    reconnect::{Backoff, ReconnectConfig},
};

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The URL is not a valid WebSocket request target.
    #[error("invalid relay url: {0}")]
    InvalidUrl(String),
}

/// WebSocket transport backed by tokio-tungstenite.
#[derive(Debug, Clone, Default)]
pub struct WebSocketTransport {
    reconnect: ReconnectConfig,
}

impl WebSocketTransport {
    /// Create a transport with the given reconnect policy.
    ///
    /// Installs the ring crypto provider as the process default if none is
    /// installed yet.
    pub fn new(reconnect: ReconnectConfig) -> Self {
        let _ = rustls::crypto::ring::default_provider().install_default();
        Self { reconnect }
    }
}

impl Transport for WebSocketTransport {
    type Error = TransportError;

    async fn open(&mut self, url: &str) -> Result<Link, Self::Error> {
        url.into_client_request().map_err(|e| TransportError::InvalidUrl(format!("{url}: {e}")))?;

        let (link, peer) = Link::pair(DEFAULT_LINK_CAPACITY);
        let task = tokio::spawn(run_link(url.to_string(), self.reconnect.clone(), peer));
        Ok(link.with_task(task))
    }
}

enum SocketEnd {
    /// The client closed the link; stop for good.
    Shutdown,
    /// The socket died or a reconnect was requested.
    Dropped(String),
}

/// Keep a socket open to `url` until the client closes the link.
async fn run_link(url: String, reconnect: ReconnectConfig, mut peer: LinkPeer) {
    let mut backoff = Backoff::new(reconnect);

    loop {
        tokio::select! {
            result = connect_async(url.as_str()) => match result {
                Ok((socket, _response)) => {
                    tracing::info!(%url, "websocket connected");
                    backoff.reset();
                    // Frames written while the socket was down belong to the old session
                    while let Ok(command) = peer.commands.try_recv() {
                        if let LinkCommand::Send(_) = command {
                            tracing::debug!("dropping frame queued for previous socket");
                        }
                    }
                    if peer.events.send(LinkEvent::Opened).await.is_err() {
                        return;
                    }

                    match pump(socket, &mut peer).await {
                        SocketEnd::Shutdown => return,
                        SocketEnd::Dropped(reason) => {
                            tracing::info!(%reason, "websocket closed");
                            if peer.events.send(LinkEvent::Closed { reason }).await.is_err() {
                                return;
                            }
                        },
                    }
                },
                Err(e) => tracing::warn!(%url, error = %e, attempt = backoff.attempts() + 1, "websocket connect failed"),
            },
            () = peer.events.closed() => return,
        }

        let Some(delay) = backoff.next_delay() else {
            tracing::error!(%url, attempts = backoff.attempts(), "giving up on relay");
            return;
        };
        tracing::debug!(?delay, "waiting before reconnect");

        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                () = &mut sleep => break,
                command = peer.commands.recv() => match command {
                    None => return,
                    Some(LinkCommand::Reconnect) => break,
                    Some(LinkCommand::Send(_)) => tracing::debug!("socket down, dropping frame"),
                },
            }
        }
    }
}

/// Shuttle frames between one socket and the link until either side ends.
async fn pump<S>(socket: S, peer: &mut LinkPeer) -> SocketEnd
where
    S: futures::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>>
        + futures::Sink<Message, Error = tokio_tungstenite::tungstenite::Error>
        + Unpin,
{
    let (mut write, mut read) = socket.split();

    loop {
        tokio::select! {
            command = peer.commands.recv() => match command {
                None => {
                    let _ = write.send(Message::Close(None)).await;
                    return SocketEnd::Shutdown;
                },
                Some(LinkCommand::Send(text)) => {
                    if let Err(e) = write.send(Message::Text(text.into())).await {
                        return SocketEnd::Dropped(e.to_string());
                    }
                },
                Some(LinkCommand::Reconnect) => {
                    let _ = write.send(Message::Close(None)).await;
                    return SocketEnd::Dropped("reconnect requested".into());
                },
            },
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    if peer.events.send(LinkEvent::Text(text.to_string())).await.is_err() {
                        return SocketEnd::Shutdown;
                    }
                },
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame.map_or_else(|| "closed by relay".to_string(), |f| f.reason.to_string());
                    return SocketEnd::Dropped(reason);
                },
                Some(Ok(Message::Binary(_))) => tracing::debug!("ignoring binary frame"),
                // Control frames are answered by tungstenite
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {},
                Some(Err(e)) => return SocketEnd::Dropped(e.to_string()),
                None => return SocketEnd::Dropped("stream ended".into()),
            },
        }
    }
}
