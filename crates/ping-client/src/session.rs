//! Chat session state machine.
//!
//! Sans-IO: the session turns user intents and relay events into
//! [`SessionAction`]s and keeps [`ChatState`] current. It never touches the
//! network or the clock directly; time arrives through events.
//!
//! # Registration
//!
//! Every time the relay accepts a namespace connect the session announces
//! itself (`register_user`) and joins the active room (`join_chat`), in that
//! order. The relay forgets a socket's rooms when it drops, so this runs
//! again after every reconnect.
//!
//! # Typing
//!
//! `typing` goes out on every composer edit while online. A single debounce
//! timer per session sends `stop_typing` once the user has been quiet for
//! [`SessionConfig::typing_timeout`]. Switching rooms flushes a pending stop
//! for the room being left. A pending stop survives a reconnect: emitted
//! while the link is down, it waits in the manager backlog and reaches the
//! relay after re-registration.

use std::time::Duration;

use ping_core::{Debouncer, MonotonicInstant};
use ping_proto::{
    GLOBAL_ROOM_TITLE, Identity, Inbound, Message, Outbound, PresenceEntry, RegisterUser, RoomKey,
    TypingStarted, TypingStopped,
};

use crate::{
    event::{SessionAction, SessionEvent},
    state::{ChatState, ConnectionStatus},
};

/// Quiet period after the last keystroke before `stop_typing` is sent.
pub const DEFAULT_TYPING_TIMEOUT: Duration = Duration::from_millis(1200);

/// Session behaviour switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Quiet period before `stop_typing`.
    pub typing_timeout: Duration,
    /// Send `leave_chat` for the old room before joining a new one.
    ///
    /// Off by default: the stock relay has no `leave_chat` handler and keeps
    /// the socket subscribed to every room it joined.
    pub explicit_leave: bool,
    /// Drop live messages keyed to another room, and history snapshots with
    /// no message for the active room. Unkeyed messages always pass.
    pub filter_foreign_rooms: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { typing_timeout: DEFAULT_TYPING_TIMEOUT, explicit_leave: false, filter_foreign_rooms: true }
    }
}

/// Session state machine for one signed-in user.
#[derive(Debug, Clone)]
pub struct Session<I: MonotonicInstant> {
    identity: Identity,
    config: SessionConfig,
    state: ChatState,
    typing: Debouncer<I>,
    /// Room the pending `stop_typing` belongs to.
    typing_room: Option<RoomKey>,
    /// Whether `register_user` went out on the current connection.
    registered: bool,
}

impl<I: MonotonicInstant> Session<I> {
    /// Create an offline session on the global room.
    pub fn new(identity: Identity, config: SessionConfig) -> Self {
        let state = ChatState::new(identity.user_id());
        let typing = Debouncer::new(config.typing_timeout);
        Self { identity, config, state, typing, typing_room: None, registered: false }
    }

    /// Signed-in identity.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Current chat state.
    pub fn state(&self) -> &ChatState {
        &self.state
    }

    /// When the session next needs a [`SessionEvent::Tick`].
    pub fn next_deadline(&self) -> Option<I> {
        self.typing.deadline()
    }

    /// Process an event, returning actions for the driver.
    pub fn handle(&mut self, event: SessionEvent<I>) -> Vec<SessionAction> {
        match event {
            SessionEvent::Connecting => self.handle_connecting(),
            SessionEvent::Connected { sid } => self.handle_connected(sid),
            SessionEvent::Disconnected { reason } => self.handle_disconnected(&reason),
            SessionEvent::Received(event) => self.handle_inbound(event),
            SessionEvent::SendMessage { text, at } => self.handle_send(&text, at),
            SessionEvent::NotifyTyping { now } => self.handle_typing(now),
            SessionEvent::SwitchRoom { room_key, title } => self.switch_room(room_key, title),
            SessionEvent::StartPrivateChat(peer) => self.start_private_chat(&peer),
            SessionEvent::SelectGeneralChat => {
                self.switch_room(RoomKey::global(), GLOBAL_ROOM_TITLE.to_string())
            },
            SessionEvent::Tick { now } => self.handle_tick(now),
            SessionEvent::Logout => self.handle_logout(),
        }
    }

    fn handle_connecting(&mut self) -> Vec<SessionAction> {
        if self.state.status().is_attached() {
            return vec![];
        }
        self.registered = false;
        self.state.set_status(ConnectionStatus::Connecting);
        vec![SessionAction::StateChanged]
    }

    fn handle_connected(&mut self, sid: String) -> Vec<SessionAction> {
        if !self.state.status().is_attached() {
            tracing::debug!(%sid, "ignoring connect after logout");
            return vec![];
        }

        tracing::info!(%sid, user_id = self.identity.user_id(), room = %self.state.room_key(), "connected to relay");
        self.state.set_status(ConnectionStatus::Online { sid });

        let mut actions = Vec::with_capacity(3);
        if !self.registered {
            self.registered = true;
            actions.push(SessionAction::Emit(Outbound::RegisterUser(RegisterUser {
                user_id: self.identity.user_id().to_string(),
                display_name: self.identity.display_name().to_string(),
            })));
            actions.push(SessionAction::Emit(Outbound::JoinChat(self.state.room_key().clone())));
        }
        actions.push(SessionAction::StateChanged);
        actions
    }

    fn handle_disconnected(&mut self, reason: &str) -> Vec<SessionAction> {
        if !self.state.status().is_attached() {
            return vec![];
        }

        tracing::info!(reason, "relay connection lost, reconnecting");
        self.registered = false;
        self.state.set_status(ConnectionStatus::Reconnecting);
        vec![SessionAction::StateChanged]
    }

    fn handle_inbound(&mut self, event: Inbound) -> Vec<SessionAction> {
        if !self.state.status().is_attached() {
            tracing::debug!(event = %event.name(), "dropping relay event after logout");
            return vec![];
        }

        match event {
            Inbound::LoadMessages(messages) => {
                // A snapshot with no message for the active room answers an
                // earlier join.
                let active = self.state.room_key();
                if self.config.filter_foreign_rooms
                    && !messages.is_empty()
                    && !messages.iter().any(|m| m.belongs_to(active))
                {
                    tracing::debug!(total = messages.len(), "dropping history for another room");
                    return vec![];
                }
                self.state.replace_messages(messages);
                vec![SessionAction::StateChanged]
            },
            Inbound::ReceiveMessage(message) => {
                if self.config.filter_foreign_rooms && !message.belongs_to(self.state.room_key()) {
                    tracing::debug!(room = ?message.room_key, "dropping message for another room");
                    return vec![];
                }
                self.state.append_message(message);
                vec![SessionAction::StateChanged]
            },
            Inbound::OnlineUsers(presence) => {
                self.state.replace_presence(presence);
                vec![SessionAction::StateChanged]
            },
            Inbound::Typing { display_name: Some(display_name) } => {
                if self.state.set_typing(display_name) { vec![SessionAction::StateChanged] } else { vec![] }
            },
            Inbound::Typing { display_name: None } | Inbound::StopTyping => {
                if self.state.clear_typing() { vec![SessionAction::StateChanged] } else { vec![] }
            },
        }
    }

    fn handle_send(&mut self, text: &str, at: chrono::DateTime<chrono::Utc>) -> Vec<SessionAction> {
        let text = text.trim();
        if text.is_empty() {
            tracing::trace!("blank message, not sent");
            return vec![];
        }
        if !self.state.status().is_attached() {
            tracing::trace!("no connection, message not sent");
            return vec![];
        }

        let message = Message::authored(&self.identity, self.state.room_key().clone(), text, at);
        vec![SessionAction::Emit(Outbound::SendMessage(message))]
    }

    fn handle_typing(&mut self, now: I) -> Vec<SessionAction> {
        if !self.state.status().is_online() {
            return vec![];
        }

        let room_key = self.state.room_key().clone();
        self.typing.arm(now);
        self.typing_room = Some(room_key.clone());
        vec![SessionAction::Emit(Outbound::Typing(TypingStarted {
            room_key,
            display_name: self.identity.display_name().to_string(),
        }))]
    }

    fn handle_tick(&mut self, now: I) -> Vec<SessionAction> {
        if !self.typing.fire(now) {
            return vec![];
        }
        match self.typing_room.take() {
            Some(room_key) if self.state.status().is_attached() => {
                vec![SessionAction::Emit(Outbound::StopTyping(TypingStopped { room_key }))]
            },
            _ => vec![],
        }
    }

    fn start_private_chat(&mut self, peer: &PresenceEntry) -> Vec<SessionAction> {
        if peer.user_id == self.identity.user_id() {
            tracing::debug!("ignoring private chat with self");
            return vec![];
        }

        let room_key = self.identity.private_room_with(&peer.user_id);
        let title =
            if peer.display_name.is_empty() { peer.user_id.clone() } else { peer.display_name.clone() };
        self.switch_room(room_key, title)
    }

    fn switch_room(&mut self, room_key: RoomKey, title: String) -> Vec<SessionAction> {
        let previous = self.state.room_key().clone();
        if !self.state.switch_room(room_key, title) {
            return vec![SessionAction::StateChanged];
        }

        let online = self.state.status().is_online();
        let mut actions = Vec::with_capacity(4);

        if self.typing.cancel()
            && let Some(room_key) = self.typing_room.take()
            && self.state.status().is_attached()
        {
            actions.push(SessionAction::Emit(Outbound::StopTyping(TypingStopped { room_key })));
        }
        self.typing_room = None;

        if online {
            if self.config.explicit_leave {
                actions.push(SessionAction::Emit(Outbound::LeaveChat(previous)));
            }
            actions.push(SessionAction::Emit(Outbound::JoinChat(self.state.room_key().clone())));
        }

        tracing::debug!(room = %self.state.room_key(), "switched room");
        actions.push(SessionAction::StateChanged);
        actions
    }

    fn handle_logout(&mut self) -> Vec<SessionAction> {
        let was_attached = self.state.status().is_attached();

        self.typing.cancel();
        self.typing_room = None;
        self.registered = false;
        self.state = ChatState::new(self.identity.user_id());

        if was_attached {
            tracing::info!(user_id = self.identity.user_id(), "logged out");
            vec![SessionAction::Disconnect, SessionAction::StateChanged]
        } else {
            vec![SessionAction::StateChanged]
        }
    }
}
