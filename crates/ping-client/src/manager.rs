//! Connection manager.
//!
//! Owns at most one link to the relay and the protocol state machine for the
//! socket currently behind it. `connect` is idempotent: a second call while a
//! link exists reuses it. Events emitted while the socket is down are
//! buffered and delivered once the relay accepts the next namespace connect.

use std::collections::VecDeque;

use ping_core::{Connection, ConnectionAction, ConnectionConfig, ConnectionState, Environment};
use ping_proto::{Endpoint, EventName, Inbound, Outbound};
use thiserror::Error;

use crate::{
    dispatch::Handlers,
    link::{Link, LinkCommand, LinkEvent, SHUTDOWN_GRACE, Transport},
};

/// Connection manager errors.
#[derive(Debug, Error)]
pub enum ManagerError {
    /// The transport could not start a link.
    #[error("failed to open link: {0}")]
    Open(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// An event could not be encoded.
    #[error("connection error: {0}")]
    Connection(#[from] ping_core::ConnectionError),
}

/// What the manager observed while receiving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagerEvent {
    /// The relay accepted the namespace connect.
    ///
    /// Events buffered while offline are sent on the next call to
    /// [`ConnectionManager::flush`] or [`ConnectionManager::recv`], so the
    /// caller can register first.
    Connected {
        /// Namespace session id.
        sid: String,
    },
    /// A relay event, already passed to registered handlers.
    Inbound(Inbound),
    /// The socket dropped; the link is reconnecting.
    Lost {
        /// Human-readable reason.
        reason: String,
    },
    /// The link task exited. No further events will arrive.
    Closed,
}

struct Active<I: ping_core::MonotonicInstant> {
    link: Link,
    /// Protocol state for the open socket. `None` while the socket is down.
    connection: Option<Connection<I>>,
    /// Events emitted while the socket was down.
    backlog: VecDeque<Outbound>,
    flush_pending: bool,
}

/// Connection manager over a transport `T` and environment `E`.
pub struct ConnectionManager<T: Transport, E: Environment> {
    transport: T,
    env: E,
    config: ConnectionConfig,
    handlers: Handlers,
    active: Option<Active<E::Instant>>,
    pending: VecDeque<ManagerEvent>,
}

impl<T: Transport, E: Environment> ConnectionManager<T, E> {
    /// Create a manager with no connection.
    pub fn new(transport: T, env: E, config: ConnectionConfig) -> Self {
        Self {
            transport,
            env,
            config,
            handlers: Handlers::new(),
            active: None,
            pending: VecDeque::new(),
        }
    }

    /// Whether a link exists.
    pub fn is_open(&self) -> bool {
        self.active.is_some()
    }

    /// Whether the namespace is connected right now.
    pub fn is_connected(&self) -> bool {
        self.connection_state() == Some(ConnectionState::Connected)
    }

    /// State of the current socket's protocol machine, if a socket is up.
    pub fn connection_state(&self) -> Option<ConnectionState> {
        self.active.as_ref().and_then(|a| a.connection.as_ref()).map(Connection::state)
    }

    /// Events waiting for the namespace to connect.
    pub fn queued(&self) -> usize {
        self.active.as_ref().map_or(0, |a| {
            a.backlog.len() + a.connection.as_ref().map_or(0, Connection::queued)
        })
    }

    /// Open a link to `endpoint`, or reuse the existing one.
    ///
    /// Returns `true` if a new link was opened.
    ///
    /// # Errors
    ///
    /// - `ManagerError::Open` if the transport refuses to start a link
    pub async fn connect(&mut self, endpoint: &Endpoint) -> Result<bool, ManagerError> {
        if self.active.is_some() {
            tracing::debug!(%endpoint, "reusing existing relay link");
            return Ok(false);
        }

        let url = endpoint.websocket_url();
        tracing::info!(%url, "opening relay link");
        let link = self.transport.open(&url).await.map_err(|e| ManagerError::Open(Box::new(e)))?;
        self.active =
            Some(Active { link, connection: None, backlog: VecDeque::new(), flush_pending: false });
        Ok(true)
    }

    /// Register a handler for inbound events named `name`.
    pub fn on<F>(&mut self, name: EventName, handler: F)
    where
        F: FnMut(&Inbound) + Send + 'static,
    {
        self.handlers.on(name, handler);
    }

    /// Emit an event to the relay.
    ///
    /// Without a link there is nowhere to send it and the event is dropped.
    /// While the socket is down it is buffered.
    ///
    /// # Errors
    ///
    /// - `ManagerError::Connection` if the event cannot be encoded
    pub fn send(&mut self, event: Outbound) -> Result<(), ManagerError> {
        let max_queued = self.config.max_queued;
        let Some(active) = self.active.as_mut() else {
            tracing::debug!(event = %event.name(), "no relay link, dropping event");
            return Ok(());
        };

        match active.connection.as_mut() {
            Some(connection) if connection.state() != ConnectionState::Closed => {
                let actions = connection.emit(event)?;
                Self::write(&active.link, actions);
            },
            _ => {
                active.backlog.push_back(event);
                while active.backlog.len() > max_queued {
                    if let Some(dropped) = active.backlog.pop_front() {
                        tracing::warn!(event = %dropped.name(), "outbound queue full, dropping oldest event");
                    }
                }
            },
        }
        Ok(())
    }

    /// Send events buffered before the current namespace connect.
    ///
    /// # Errors
    ///
    /// - `ManagerError::Connection` if a buffered event cannot be encoded
    pub fn flush(&mut self) -> Result<(), ManagerError> {
        let Some(active) = self.active.as_mut() else {
            return Ok(());
        };
        if !active.flush_pending {
            return Ok(());
        }
        active.flush_pending = false;

        if let Some(connection) = active.connection.as_mut() {
            let actions = connection.flush_queue()?;
            Self::write(&active.link, actions);
        }
        Ok(())
    }

    /// Wait for the next manager event.
    ///
    /// Returns `None` immediately when no link exists. Cancel safe.
    pub async fn recv(&mut self) -> Option<ManagerEvent> {
        if let Err(e) = self.flush() {
            tracing::warn!(error = %e, "failed to flush queued events");
        }

        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(event);
            }

            let active = self.active.as_mut()?;
            let Some(link_event) = active.link.recv().await else {
                tracing::warn!("relay link task exited");
                self.active = None;
                return Some(ManagerEvent::Closed);
            };
            self.handle_link_event(link_event);
        }
    }

    /// Run connection timers.
    pub fn tick(&mut self) -> Option<ManagerEvent> {
        let now = self.env.now();
        let active = self.active.as_mut()?;
        let actions = active.connection.as_mut()?.tick(now);
        self.execute(actions);
        self.pending.pop_front()
    }

    /// When [`Self::tick`] next needs to run.
    pub fn next_deadline(&self) -> Option<E::Instant> {
        self.active.as_ref()?.connection.as_ref()?.next_deadline()
    }

    /// Close the link and release it.
    ///
    /// Sends the namespace disconnect if connected, then waits briefly for
    /// the link task to finish. Safe to call without a link.
    pub async fn disconnect(&mut self) {
        let Some(mut active) = self.active.take() else {
            return;
        };
        self.pending.clear();

        if let Some(connection) = active.connection.as_mut() {
            Self::write(&active.link, connection.disconnect());
        }
        active.link.shutdown(SHUTDOWN_GRACE).await;
        tracing::info!("relay link closed");
    }

    fn handle_link_event(&mut self, event: LinkEvent) {
        let now = self.env.now();
        let Some(active) = self.active.as_mut() else {
            return;
        };

        match event {
            LinkEvent::Opened => {
                tracing::debug!("socket opened, starting handshake");
                let mut connection = Connection::new(now, self.config.clone());
                if let Some(old) = active.connection.as_mut() {
                    active.backlog.extend(old.take_queue());
                }
                connection.restore_queue(std::mem::take(&mut active.backlog));
                active.connection = Some(connection);
                active.flush_pending = false;
            },
            LinkEvent::Text(text) => {
                let Some(connection) = active.connection.as_mut() else {
                    tracing::debug!("frame before socket open, ignoring");
                    return;
                };
                match connection.handle_text(&text, now) {
                    Ok(actions) => self.execute(actions),
                    Err(e) => tracing::warn!(error = %e, "dropping relay frame"),
                }
            },
            LinkEvent::Closed { reason } => {
                if let Some(mut old) = active.connection.take() {
                    let mut pending = old.take_queue();
                    pending.append(&mut active.backlog);
                    active.backlog = pending;
                    self.pending.push_back(ManagerEvent::Lost { reason });
                }
            },
        }
    }

    fn execute(&mut self, actions: Vec<ConnectionAction>) {
        for action in actions {
            match action {
                ConnectionAction::SendText(text) => {
                    if let Some(active) = self.active.as_ref() {
                        Self::write(&active.link, vec![ConnectionAction::SendText(text)]);
                    }
                },
                ConnectionAction::Connected { sid } => {
                    if let Some(active) = self.active.as_mut() {
                        active.flush_pending = true;
                    }
                    self.pending.push_back(ManagerEvent::Connected { sid });
                },
                ConnectionAction::Deliver(event) => {
                    self.handlers.dispatch(&event);
                    self.pending.push_back(ManagerEvent::Inbound(event));
                },
                ConnectionAction::Close { reason } => {
                    tracing::warn!(%reason, "relay connection dead, reconnecting");
                    if let Some(active) = self.active.as_mut() {
                        if let Some(mut old) = active.connection.take() {
                            let mut pending = old.take_queue();
                            pending.append(&mut active.backlog);
                            active.backlog = pending;
                        }
                        active.link.send(LinkCommand::Reconnect);
                    }
                    self.pending.push_back(ManagerEvent::Lost { reason });
                },
            }
        }
    }

    fn write(link: &Link, actions: Vec<ConnectionAction>) {
        for action in actions {
            if let ConnectionAction::SendText(text) = action
                && !link.send(LinkCommand::Send(text))
            {
                tracing::debug!("link task gone, frame dropped");
            }
        }
    }
}

impl<T: Transport, E: Environment> std::fmt::Debug for ConnectionManager<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("open", &self.is_open())
            .field("state", &self.connection_state())
            .field("queued", &self.queued())
            .field("handlers", &self.handlers)
            .finish_non_exhaustive()
    }
}
