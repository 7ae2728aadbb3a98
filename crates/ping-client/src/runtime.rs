//! Async runtime for a chat session.
//!
//! The runtime drives the session event loop, coordinating between:
//! - [`Session`]: Sans-IO chat state machine
//! - [`ConnectionManager`]: link to the relay
//! - [`RuntimeHandle`]: commands in, state snapshots out
//!
//! It runs until the user logs out or every handle is dropped, then tears the
//! link down.

use std::future::Future;

use ping_core::{ConnectionConfig, Environment};
use ping_proto::{Endpoint, EventName, Identity, Inbound, PresenceEntry, RoomKey};
use thiserror::Error;
use tokio::sync::{mpsc, watch};

use crate::{
    event::{SessionAction, SessionEvent},
    link::Transport,
    manager::{ConnectionManager, ManagerError, ManagerEvent},
    session::{Session, SessionConfig},
    state::ChatState,
};

const COMMAND_CAPACITY: usize = 64;

/// Runtime errors.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The connection manager failed.
    #[error(transparent)]
    Manager(#[from] ManagerError),

    /// The link task exited; the relay is unreachable for good.
    #[error("relay link closed")]
    LinkClosed,

    /// The runtime has stopped and no longer accepts commands.
    #[error("runtime stopped")]
    Stopped,
}

/// User intents accepted by the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Send a message to the active room.
    SendMessage(String),
    /// The composer changed.
    NotifyTyping,
    /// Open an arbitrary room.
    SwitchRoom {
        /// Room to open.
        room_key: RoomKey,
        /// Title to show.
        title: String,
    },
    /// Open the private conversation with a peer.
    StartPrivateChat(PresenceEntry),
    /// Back to the global room.
    SelectGeneralChat,
    /// Sign out and stop the runtime.
    Logout,
}

/// Configuration for a runtime.
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfig {
    /// Session behaviour.
    pub session: SessionConfig,
    /// Connection timeouts and buffering.
    pub connection: ConnectionConfig,
}

/// Cloneable handle to a running session.
#[derive(Debug, Clone)]
pub struct RuntimeHandle {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<ChatState>,
}

impl RuntimeHandle {
    /// Send a command.
    ///
    /// # Errors
    ///
    /// - `RuntimeError::Stopped` if the runtime has exited
    pub async fn send(&self, command: Command) -> Result<(), RuntimeError> {
        self.commands.send(command).await.map_err(|_| RuntimeError::Stopped)
    }

    /// Send a message to the active room.
    ///
    /// # Errors
    ///
    /// - `RuntimeError::Stopped` if the runtime has exited
    pub async fn send_message(&self, text: impl Into<String>) -> Result<(), RuntimeError> {
        self.send(Command::SendMessage(text.into())).await
    }

    /// Report a composer edit.
    ///
    /// # Errors
    ///
    /// - `RuntimeError::Stopped` if the runtime has exited
    pub async fn notify_typing(&self) -> Result<(), RuntimeError> {
        self.send(Command::NotifyTyping).await
    }

    /// Open the private conversation with `peer`.
    ///
    /// # Errors
    ///
    /// - `RuntimeError::Stopped` if the runtime has exited
    pub async fn start_private_chat(&self, peer: PresenceEntry) -> Result<(), RuntimeError> {
        self.send(Command::StartPrivateChat(peer)).await
    }

    /// Return to the global room.
    ///
    /// # Errors
    ///
    /// - `RuntimeError::Stopped` if the runtime has exited
    pub async fn select_general_chat(&self) -> Result<(), RuntimeError> {
        self.send(Command::SelectGeneralChat).await
    }

    /// Sign out. The runtime exits after tearing the link down.
    ///
    /// # Errors
    ///
    /// - `RuntimeError::Stopped` if the runtime has already exited
    pub async fn logout(&self) -> Result<(), RuntimeError> {
        self.send(Command::Logout).await
    }

    /// Latest published state.
    pub fn snapshot(&self) -> ChatState {
        self.state.borrow().clone()
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<ChatState> {
        self.state.clone()
    }
}

/// Session runtime over a transport `T` and environment `E`.
pub struct Runtime<T: Transport, E: Environment> {
    session: Session<E::Instant>,
    manager: ConnectionManager<T, E>,
    env: E,
    endpoint: Endpoint,
    commands: mpsc::Receiver<Command>,
    state: watch::Sender<ChatState>,
}

impl<T: Transport, E: Environment> Runtime<T, E> {
    /// Create a runtime and its handle. Nothing connects until [`Self::run`].
    pub fn new(
        identity: Identity,
        endpoint: Endpoint,
        transport: T,
        env: E,
        config: RuntimeConfig,
    ) -> (Self, RuntimeHandle) {
        let session = Session::new(identity, config.session);
        let manager = ConnectionManager::new(transport, env.clone(), config.connection);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (state_tx, state_rx) = watch::channel(session.state().clone());

        let runtime = Self { session, manager, env, endpoint, commands: command_rx, state: state_tx };
        (runtime, RuntimeHandle { commands: command_tx, state: state_rx })
    }

    /// Register a handler for inbound relay events named `name`.
    ///
    /// Handlers run before the session applies the event.
    pub fn on<F>(&mut self, name: EventName, handler: F)
    where
        F: FnMut(&Inbound) + Send + 'static,
    {
        self.manager.on(name, handler);
    }

    /// Run until logout, handle drop, or link loss.
    ///
    /// # Errors
    ///
    /// - `RuntimeError::Manager` if the link cannot be opened
    /// - `RuntimeError::LinkClosed` if the link task gives up
    pub async fn run(mut self) -> Result<(), RuntimeError> {
        let result = self.event_loop().await;
        self.teardown().await;
        result
    }

    async fn event_loop(&mut self) -> Result<(), RuntimeError> {
        self.connect().await?;

        loop {
            let deadline = earliest(self.session.next_deadline(), self.manager.next_deadline());
            let timer = sleep_until(&self.env, deadline);

            tokio::select! {
                command = self.commands.recv() => match command {
                    None | Some(Command::Logout) => return Ok(()),
                    Some(command) => self.handle_command(command).await,
                },
                Some(event) = self.manager.recv() => self.handle_manager_event(event).await?,
                () = timer => self.handle_tick().await?,
            }
        }
    }

    async fn connect(&mut self) -> Result<(), RuntimeError> {
        if self.manager.connect(&self.endpoint).await? {
            let actions = self.session.handle(SessionEvent::Connecting);
            self.execute(actions).await;
        }
        Ok(())
    }

    async fn handle_command(&mut self, command: Command) {
        let event = match command {
            Command::SendMessage(text) => SessionEvent::SendMessage { text, at: self.env.wall_clock() },
            Command::NotifyTyping => SessionEvent::NotifyTyping { now: self.env.now() },
            Command::SwitchRoom { room_key, title } => SessionEvent::SwitchRoom { room_key, title },
            Command::StartPrivateChat(peer) => SessionEvent::StartPrivateChat(peer),
            Command::SelectGeneralChat => SessionEvent::SelectGeneralChat,
            Command::Logout => SessionEvent::Logout,
        };
        let actions = self.session.handle(event);
        self.execute(actions).await;
    }

    async fn handle_manager_event(&mut self, event: ManagerEvent) -> Result<(), RuntimeError> {
        match event {
            ManagerEvent::Connected { sid } => {
                let actions = self.session.handle(SessionEvent::Connected { sid });
                self.execute(actions).await;
                if let Err(e) = self.manager.flush() {
                    tracing::warn!(error = %e, "failed to flush queued events");
                }
            },
            ManagerEvent::Inbound(event) => {
                let actions = self.session.handle(SessionEvent::Received(event));
                self.execute(actions).await;
            },
            ManagerEvent::Lost { reason } => {
                let actions = self.session.handle(SessionEvent::Disconnected { reason });
                self.execute(actions).await;
            },
            ManagerEvent::Closed => {
                let reason = "relay link closed".to_string();
                let actions = self.session.handle(SessionEvent::Disconnected { reason });
                self.execute(actions).await;
                return Err(RuntimeError::LinkClosed);
            },
        }
        Ok(())
    }

    async fn handle_tick(&mut self) -> Result<(), RuntimeError> {
        let now = self.env.now();
        let actions = self.session.handle(SessionEvent::Tick { now });
        self.execute(actions).await;

        if let Some(event) = self.manager.tick() {
            self.handle_manager_event(event).await?;
        }
        Ok(())
    }

    async fn execute(&mut self, actions: Vec<SessionAction>) {
        for action in actions {
            match action {
                SessionAction::Emit(event) => {
                    if let Err(e) = self.manager.send(event) {
                        tracing::warn!(error = %e, "failed to send event");
                    }
                },
                SessionAction::StateChanged => {
                    self.state.send_replace(self.session.state().clone());
                },
                SessionAction::Disconnect => self.manager.disconnect().await,
            }
        }
    }

    async fn teardown(&mut self) {
        let actions = self.session.handle(SessionEvent::Logout);
        self.execute(actions).await;
        self.manager.disconnect().await;
    }
}

impl<T: Transport, E: Environment> std::fmt::Debug for Runtime<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("endpoint", &self.endpoint)
            .field("status", self.session.state().status())
            .field("manager", &self.manager)
            .finish_non_exhaustive()
    }
}

fn earliest<I: Ord>(a: Option<I>, b: Option<I>) -> Option<I> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

fn sleep_until<E: Environment>(env: &E, deadline: Option<E::Instant>) -> impl Future<Output = ()> + '_ {
    let sleep = deadline.map(|deadline| env.sleep_until(deadline));
    async move {
        match sleep {
            Some(sleep) => sleep.await,
            None => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn earliest_prefers_sooner_deadline() {
        assert_eq!(earliest(Some(3), Some(1)), Some(1));
        assert_eq!(earliest(None, Some(2)), Some(2));
        assert_eq!(earliest::<u32>(None, None), None);
    }
}
