//! Memory transport for testing.
//!
//! Each opened link is served by a task that feeds client frames into a
//! [`SimRelay`] and writes its replies back over the link channels.

use ping_client::{DEFAULT_LINK_CAPACITY, Link, LinkCommand, LinkPeer, Transport};
use thiserror::Error;

use crate::sim_relay::{SimRelay, SocketId, deliver};

/// Memory transport errors.
#[derive(Debug, Error)]
pub enum MemoryTransportError {
    /// The relay was shut down.
    #[error("relay is shut down")]
    RelayClosed,
}

/// Transport that connects to an in-process [`SimRelay`].
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    relay: SimRelay,
}

impl MemoryTransport {
    /// Transport for `relay`.
    pub fn new(relay: SimRelay) -> Self {
        Self { relay }
    }
}

impl Transport for MemoryTransport {
    type Error = MemoryTransportError;

    async fn open(&mut self, url: &str) -> Result<Link, Self::Error> {
        if self.relay.is_shut_down() {
            return Err(MemoryTransportError::RelayClosed);
        }
        tracing::debug!(%url, "opening memory link");

        let (link, peer) = Link::pair(DEFAULT_LINK_CAPACITY);
        let LinkPeer { commands, events } = peer;
        let (socket, greeting) = self.relay.attach(events);
        deliver(greeting).await;

        let task = tokio::spawn(serve(self.relay.clone(), socket, commands));
        Ok(link.with_task(task))
    }
}

async fn serve(
    relay: SimRelay,
    socket: SocketId,
    mut commands: tokio::sync::mpsc::UnboundedReceiver<LinkCommand>,
) {
    while let Some(command) = commands.recv().await {
        let outgoing = match command {
            LinkCommand::Send(text) => relay.handle_text(socket, &text),
            LinkCommand::Reconnect => relay.reopen(socket),
        };
        deliver(outgoing).await;
    }
    deliver(relay.detach(socket)).await;
}
