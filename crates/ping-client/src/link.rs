//! Transport seam.
//!
//! A [`Transport`] opens a [`Link`]: a pair of channels to a background task
//! that owns the socket. The task reconnects on its own; the link reports
//! each socket opening and closing so the connection manager can rebuild
//! its protocol state.

use std::{error::Error, future::Future, time::Duration};

use tokio::{sync::mpsc, task::JoinHandle};

/// Capacity of the socket → client event channel.
pub const DEFAULT_LINK_CAPACITY: usize = 64;

/// Grace period for the link task to flush and close on shutdown.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Command from the client to the link task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkCommand {
    /// Write a text frame.
    Send(String),
    /// Drop the current socket and open a new one.
    Reconnect,
}

/// Event from the link task to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// A socket opened; the Engine.IO handshake starts now.
    Opened,
    /// A text frame arrived.
    Text(String),
    /// The socket closed. The task will try to reopen it.
    Closed {
        /// Human-readable reason.
        reason: String,
    },
}

/// Opens links to the relay.
pub trait Transport: Send {
    /// Error opening a link.
    type Error: Error + Send + Sync + 'static;

    /// Start a link task for `url`.
    ///
    /// Success means the task is running, not that a socket is open; watch
    /// for [`LinkEvent::Opened`].
    fn open(&mut self, url: &str) -> impl Future<Output = Result<Link, Self::Error>> + Send;
}

/// Client side of a link.
///
/// Commands are unbounded so that sending never suspends the caller.
#[derive(Debug)]
pub struct Link {
    commands: mpsc::UnboundedSender<LinkCommand>,
    events: mpsc::Receiver<LinkEvent>,
    task: Option<JoinHandle<()>>,
}

/// Task side of a link.
#[derive(Debug)]
pub struct LinkPeer {
    /// Commands from the client. Closed when the client shuts the link down.
    pub commands: mpsc::UnboundedReceiver<LinkCommand>,
    /// Events to the client.
    pub events: mpsc::Sender<LinkEvent>,
}

impl Link {
    /// Create a connected link/peer pair.
    pub fn pair(capacity: usize) -> (Self, LinkPeer) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel(capacity);
        let link = Self { commands: command_tx, events: event_rx, task: None };
        (link, LinkPeer { commands: command_rx, events: event_tx })
    }

    /// Attach the task serving this link, awaited on shutdown.
    #[must_use]
    pub fn with_task(mut self, task: JoinHandle<()>) -> Self {
        self.task = Some(task);
        self
    }

    /// Queue a command. Returns `false` if the task is gone.
    pub fn send(&self, command: LinkCommand) -> bool {
        self.commands.send(command).is_ok()
    }

    /// Next event. `None` once the task has exited.
    ///
    /// Cancel safe.
    pub async fn recv(&mut self) -> Option<LinkEvent> {
        self.events.recv().await
    }

    /// Close both channels and wait up to `grace` for the task to finish,
    /// aborting it after that.
    ///
    /// Commands already queued are still readable by the task; its event
    /// sends fail from here on, so it never blocks on a full channel.
    pub async fn shutdown(self, grace: Duration) {
        let Self { commands, events, task } = self;
        drop(commands);
        drop(events);

        if let Some(mut task) = task
            && tokio::time::timeout(grace, &mut task).await.is_err()
        {
            tracing::debug!("link task did not stop in time, aborting");
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pair_carries_commands_and_events() {
        let (mut link, mut peer) = Link::pair(4);

        assert!(link.send(LinkCommand::Send("40".into())));
        assert_eq!(peer.commands.recv().await, Some(LinkCommand::Send("40".into())));

        peer.events.send(LinkEvent::Opened).await.unwrap();
        assert_eq!(link.recv().await, Some(LinkEvent::Opened));

        drop(peer);
        assert_eq!(link.recv().await, None);
        assert!(!link.send(LinkCommand::Reconnect));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_waits_for_task_then_aborts() {
        let (link, mut peer) = Link::pair(4);
        let task = tokio::spawn(async move {
            // Ignores the closed channel and never exits on its own
            while peer.commands.recv().await.is_some() {}
            std::future::pending::<()>().await;
        });
        let abort = task.abort_handle();

        link.with_task(task).shutdown(SHUTDOWN_GRACE).await;
        for _ in 0..10 {
            if abort.is_finished() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(abort.is_finished());
    }
}
