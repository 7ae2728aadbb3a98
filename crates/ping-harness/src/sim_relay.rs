//! In-process relay for end-to-end tests.
//!
//! `SimRelay` speaks the same Engine.IO / Socket.IO text protocol as the
//! deployed relay, over [`MemoryTransport`](crate::MemoryTransport) links
//! instead of WebSockets. It keeps per-room history, tracks presence, and
//! fans events out the way the relay does:
//!
//! - `register_user` → `online_users` to every connected socket
//! - `join_chat` → subscribe, then `load_messages` to the joiner
//! - `send_message` → store, then `receive_message` to the room
//! - `typing` / `stop_typing` → to the room, excluding the sender
//!
//! Tests drive it explicitly: heartbeats are sent only on
//! [`SimRelay::ping_all`], and socket drops are simulated with
//! [`SimRelay::drop_connections`].

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use ping_client::LinkEvent;
use ping_proto::{
    EventName, Handshake, Inbound, Message, Outbound, Packet, PresenceEntry, RoomKey, SocketPacket,
};
use tokio::sync::mpsc;

/// Relay behaviour knobs.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Advertised ping interval.
    pub ping_interval: Duration,
    /// Advertised ping timeout.
    pub ping_timeout: Duration,
    /// Keep sockets subscribed to every room they joined, like the deployed
    /// relay. When off, a join replaces the previous subscription.
    pub sticky_rooms: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(25),
            ping_timeout: Duration::from_secs(20),
            sticky_rooms: true,
        }
    }
}

/// Socket id assigned by the relay, in attach order.
pub type SocketId = u64;

/// A client event as the relay decoded it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Received {
    /// Socket it arrived on.
    pub socket: SocketId,
    /// Decoded event.
    pub event: Outbound,
}

struct SocketState {
    events: mpsc::Sender<LinkEvent>,
    engine_sid: String,
    connected: bool,
    user: Option<PresenceEntry>,
    rooms: BTreeSet<RoomKey>,
}

/// Frames to deliver once the relay lock is released.
pub(crate) type Outgoing = Vec<(mpsc::Sender<LinkEvent>, LinkEvent)>;

struct RelayState {
    config: RelayConfig,
    sockets: BTreeMap<SocketId, SocketState>,
    history: HashMap<RoomKey, Vec<Message>>,
    next_socket: SocketId,
    next_sid: u64,
    opens: usize,
    shut_down: bool,
    received: Vec<Received>,
    inbox: Option<mpsc::UnboundedSender<Received>>,
}

/// Shared handle to an in-process relay.
#[derive(Clone)]
pub struct SimRelay {
    state: Arc<Mutex<RelayState>>,
}

impl Default for SimRelay {
    fn default() -> Self {
        Self::new(RelayConfig::default())
    }
}

impl SimRelay {
    /// Create a relay with no sockets.
    pub fn new(config: RelayConfig) -> Self {
        let state = RelayState {
            config,
            sockets: BTreeMap::new(),
            history: HashMap::new(),
            next_socket: 1,
            next_sid: 1,
            opens: 0,
            shut_down: false,
            received: Vec::new(),
            inbox: None,
        };
        Self { state: Arc::new(Mutex::new(state)) }
    }

    /// Transport that opens links to this relay.
    pub fn transport(&self) -> crate::MemoryTransport {
        crate::MemoryTransport::new(self.clone())
    }

    /// Stream of every client event the relay decodes from now on.
    ///
    /// Replaces any earlier subscription.
    pub fn inbox(&self) -> mpsc::UnboundedReceiver<Received> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().inbox = Some(tx);
        rx
    }

    /// Every client event decoded so far, in arrival order.
    pub fn received(&self) -> Vec<Received> {
        self.lock().received.clone()
    }

    /// Number of sockets ever opened, including reopens.
    pub fn opens(&self) -> usize {
        self.lock().opens
    }

    /// Number of sockets attached right now.
    pub fn sockets(&self) -> usize {
        self.lock().sockets.len()
    }

    /// Registered users, deduplicated by id, in attach order.
    pub fn online(&self) -> Vec<PresenceEntry> {
        self.lock().presence()
    }

    /// Stored history of `room`.
    pub fn history(&self, room: &RoomKey) -> Vec<Message> {
        self.lock().history.get(room).cloned().unwrap_or_default()
    }

    /// Rooms `socket` is subscribed to.
    pub fn rooms_of(&self, socket: SocketId) -> Vec<RoomKey> {
        self.lock().sockets.get(&socket).map(|s| s.rooms.iter().cloned().collect()).unwrap_or_default()
    }

    /// Seed history for `room`.
    pub fn seed_history(&self, room: RoomKey, messages: Vec<Message>) {
        self.lock().history.insert(room, messages);
    }

    /// Send an Engine.IO ping to every socket.
    pub async fn ping_all(&self) {
        let outgoing = self.lock().broadcast_text(|_| true, "2");
        deliver(outgoing).await;
    }

    /// Send a raw text frame to `socket`.
    pub async fn inject(&self, socket: SocketId, text: &str) {
        let outgoing = self.lock().send_text(socket, text.to_string());
        deliver(outgoing).await;
    }

    /// Drop every socket, as if the network blipped. Each link reports the
    /// close and immediately reopens with a fresh handshake.
    pub async fn drop_connections(&self) {
        let outgoing = {
            let mut state = self.lock();
            let ids: Vec<_> = state.sockets.keys().copied().collect();
            let mut outgoing = Outgoing::new();
            for id in ids {
                outgoing.extend(state.reopen(id, "network blip"));
            }
            outgoing
        };
        deliver(outgoing).await;
    }

    /// Stop the relay. Every link ends and new opens are refused.
    pub fn shutdown(&self) {
        let mut state = self.lock();
        state.shut_down = true;
        state.sockets.clear();
        tracing::info!("sim relay shut down");
    }

    pub(crate) fn is_shut_down(&self) -> bool {
        self.lock().shut_down
    }

    /// Register a new socket and greet it with the open packet.
    pub(crate) fn attach(&self, events: mpsc::Sender<LinkEvent>) -> (SocketId, Outgoing) {
        self.lock().attach(events)
    }

    pub(crate) fn handle_text(&self, socket: SocketId, text: &str) -> Outgoing {
        self.lock().handle_text(socket, text)
    }

    pub(crate) fn reopen(&self, socket: SocketId) -> Outgoing {
        self.lock().reopen(socket, "reconnect requested")
    }

    pub(crate) fn detach(&self, socket: SocketId) -> Outgoing {
        self.lock().detach(socket)
    }

    fn lock(&self) -> MutexGuard<'_, RelayState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for SimRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("SimRelay")
            .field("sockets", &state.sockets.len())
            .field("opens", &state.opens)
            .field("rooms", &state.history.len())
            .finish_non_exhaustive()
    }
}

/// Send frames collected under the lock.
pub(crate) async fn deliver(outgoing: Outgoing) {
    for (tx, event) in outgoing {
        // Closed links are gone for good; nothing to retry.
        let _ = tx.send(event).await;
    }
}

impl RelayState {
    fn attach(&mut self, events: mpsc::Sender<LinkEvent>) -> (SocketId, Outgoing) {
        let id = self.next_socket;
        self.next_socket += 1;
        self.opens += 1;

        let engine_sid = format!("eio-{id}-{}", self.opens);
        let open = self.open_packet(&engine_sid);
        let socket =
            SocketState { events: events.clone(), engine_sid, connected: false, user: None, rooms: BTreeSet::new() };
        self.sockets.insert(id, socket);
        tracing::debug!(socket = id, "socket attached");

        (id, vec![(events.clone(), LinkEvent::Opened), (events, LinkEvent::Text(open))])
    }

    fn reopen(&mut self, id: SocketId, reason: &str) -> Outgoing {
        let Some(socket) = self.sockets.get_mut(&id) else {
            return vec![];
        };
        self.opens += 1;
        let had_user = socket.user.take().is_some();
        socket.connected = false;
        socket.rooms.clear();
        socket.engine_sid = format!("eio-{id}-{}", self.opens);

        let events = socket.events.clone();
        let engine_sid = socket.engine_sid.clone();
        let open = self.open_packet(&engine_sid);

        let mut outgoing = vec![
            (events.clone(), LinkEvent::Closed { reason: reason.to_string() }),
            (events.clone(), LinkEvent::Opened),
            (events, LinkEvent::Text(open)),
        ];
        if had_user {
            outgoing.extend(self.broadcast_presence());
        }
        outgoing
    }

    fn detach(&mut self, id: SocketId) -> Outgoing {
        let Some(socket) = self.sockets.remove(&id) else {
            return vec![];
        };
        tracing::debug!(socket = id, "socket detached");
        if socket.user.is_some() { self.broadcast_presence() } else { vec![] }
    }

    fn handle_text(&mut self, id: SocketId, text: &str) -> Outgoing {
        let packet = match Packet::decode(text) {
            Ok(packet) => packet,
            Err(e) => {
                tracing::warn!(socket = id, error = %e, "relay dropping bad frame");
                return vec![];
            },
        };

        match packet {
            Packet::Pong | Packet::Noop => vec![],
            Packet::Message(SocketPacket::Connect { .. }) => self.connect_namespace(id),
            Packet::Message(SocketPacket::Disconnect) => {
                let had_user = self.sockets.get_mut(&id).is_some_and(|socket| {
                    socket.connected = false;
                    socket.rooms.clear();
                    socket.user.take().is_some()
                });
                if had_user { self.broadcast_presence() } else { vec![] }
            },
            Packet::Message(SocketPacket::Event { name, args, .. }) => {
                let connected = self.sockets.get(&id).is_some_and(|s| s.connected);
                if !connected {
                    tracing::warn!(socket = id, event = %name, "event before namespace connect");
                    return vec![];
                }
                let event = name
                    .parse::<EventName>()
                    .and_then(|name| Outbound::from_args(name, args));
                match event {
                    Ok(event) => self.handle_event(id, event),
                    Err(e) => {
                        tracing::warn!(socket = id, error = %e, "relay dropping bad event");
                        vec![]
                    },
                }
            },
            other => {
                tracing::debug!(socket = id, packet = ?other, "relay ignoring packet");
                vec![]
            },
        }
    }

    fn connect_namespace(&mut self, id: SocketId) -> Outgoing {
        let sid = format!("ns-{}", self.next_sid);
        self.next_sid += 1;
        let Some(socket) = self.sockets.get_mut(&id) else {
            return vec![];
        };
        socket.connected = true;

        let reply = Packet::Message(SocketPacket::Connect { sid: Some(sid) }).encode();
        match reply {
            Ok(text) => vec![(socket.events.clone(), LinkEvent::Text(text))],
            Err(_) => vec![],
        }
    }

    fn handle_event(&mut self, id: SocketId, event: Outbound) -> Outgoing {
        self.record(id, &event);

        match event {
            Outbound::RegisterUser(register) => {
                if let Some(socket) = self.sockets.get_mut(&id) {
                    socket.user = Some(PresenceEntry::new(register.user_id, register.display_name));
                }
                self.broadcast_presence()
            },
            Outbound::JoinChat(room) => {
                let sticky = self.config.sticky_rooms;
                let Some(socket) = self.sockets.get_mut(&id) else {
                    return vec![];
                };
                if !sticky {
                    socket.rooms.clear();
                }
                socket.rooms.insert(room.clone());
                let history = self.history.get(&room).cloned().unwrap_or_default();
                self.send_event(id, &Inbound::LoadMessages(history))
            },
            Outbound::LeaveChat(room) => {
                if let Some(socket) = self.sockets.get_mut(&id) {
                    socket.rooms.remove(&room);
                }
                vec![]
            },
            Outbound::SendMessage(message) => {
                let Some(room) = message.room_key.clone() else {
                    tracing::warn!(socket = id, "message without a room, dropping");
                    return vec![];
                };
                self.history.entry(room.clone()).or_default().push(message.clone());
                self.broadcast_event(|_, s| s.rooms.contains(&room), &Inbound::ReceiveMessage(message))
            },
            Outbound::Typing(typing) => {
                let event = Inbound::Typing { display_name: Some(typing.display_name) };
                self.broadcast_event(|sid, s| sid != id && s.rooms.contains(&typing.room_key), &event)
            },
            Outbound::StopTyping(stop) => {
                self.broadcast_event(|sid, s| sid != id && s.rooms.contains(&stop.room_key), &Inbound::StopTyping)
            },
        }
    }

    fn record(&mut self, socket: SocketId, event: &Outbound) {
        let received = Received { socket, event: event.clone() };
        if let Some(inbox) = &self.inbox {
            let _ = inbox.send(received.clone());
        }
        self.received.push(received);
    }

    fn presence(&self) -> Vec<PresenceEntry> {
        let mut seen = BTreeSet::new();
        self.sockets
            .values()
            .filter_map(|s| s.user.clone())
            .filter(|user| seen.insert(user.user_id.clone()))
            .collect()
    }

    fn broadcast_presence(&self) -> Outgoing {
        let event = Inbound::OnlineUsers(self.presence());
        self.broadcast_event(|_, _| true, &event)
    }

    fn send_event(&self, id: SocketId, event: &Inbound) -> Outgoing {
        self.broadcast_event(|sid, _| sid == id, event)
    }

    fn broadcast_event<F>(&self, mut to: F, event: &Inbound) -> Outgoing
    where
        F: FnMut(SocketId, &SocketState) -> bool,
    {
        let text = match event.to_args().and_then(|args| Packet::event(event.name().as_str(), args).encode()) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "relay failed to encode event");
                return vec![];
            },
        };
        self.sockets
            .iter()
            .filter(|(sid, s)| s.connected && to(**sid, s))
            .map(|(_, s)| (s.events.clone(), LinkEvent::Text(text.clone())))
            .collect()
    }

    fn broadcast_text<F>(&self, mut to: F, text: &str) -> Outgoing
    where
        F: FnMut(&SocketState) -> bool,
    {
        self.sockets
            .values()
            .filter(|s| to(s))
            .map(|s| (s.events.clone(), LinkEvent::Text(text.to_string())))
            .collect()
    }

    fn send_text(&self, id: SocketId, text: String) -> Outgoing {
        self.sockets.get(&id).map(|s| vec![(s.events.clone(), LinkEvent::Text(text))]).unwrap_or_default()
    }

    fn open_packet(&self, engine_sid: &str) -> String {
        let handshake = Handshake {
            sid: engine_sid.to_string(),
            upgrades: vec![],
            ping_interval: u64::try_from(self.config.ping_interval.as_millis()).unwrap_or(u64::MAX),
            ping_timeout: u64::try_from(self.config.ping_timeout.as_millis()).unwrap_or(u64::MAX),
            max_payload: 1_000_000,
        };
        Packet::Open(handshake).encode().unwrap_or_default()
    }
}
