//! Integration tests for the session state machine.
//!
//! # Oracle Pattern
//!
//! Tests end with oracle checks that verify:
//! - The emitted relay events, in order
//! - The chat state the presentation layer would render

use std::time::{Duration, Instant};

use chrono::{TimeZone, Utc};
use ping_client::{
    ConnectionStatus, DEFAULT_TYPING_TIMEOUT, Session, SessionAction, SessionConfig, SessionEvent,
};
use ping_proto::{
    EventName, Identity, Inbound, Message, Outbound, PresenceEntry, RegisterUser, RoomKey,
    TypingStarted, TypingStopped,
};
use serde_json::json;

fn alice() -> Identity {
    Identity::new("u1", "Alice").unwrap()
}

/// Create a registered session on the global room.
fn online_session(config: SessionConfig) -> Session<Instant> {
    let mut session = Session::new(alice(), config);
    session.handle(SessionEvent::Connecting);
    session.handle(SessionEvent::Connected { sid: "s1".into() });
    session
}

fn emitted(actions: &[SessionAction]) -> Vec<Outbound> {
    actions
        .iter()
        .filter_map(|a| match a {
            SessionAction::Emit(event) => Some(event.clone()),
            _ => None,
        })
        .collect()
}

fn message(room: &str, sender: &str, text: &str) -> Message {
    Message {
        room_key: Some(RoomKey::new(room)),
        sender_id: sender.into(),
        sender_name: sender.to_uppercase(),
        text: text.into(),
        created_at: None,
    }
}

fn send(session: &mut Session<Instant>, text: &str) -> Vec<Outbound> {
    let at = Utc.with_ymd_and_hms(2026, 10, 14, 9, 30, 0).unwrap();
    emitted(&session.handle(SessionEvent::SendMessage { text: text.into(), at }))
}

#[test]
fn connect_registers_then_joins_active_room() {
    let mut session = Session::<Instant>::new(alice(), SessionConfig::default());

    let actions = session.handle(SessionEvent::Connecting);
    assert_eq!(actions, vec![SessionAction::StateChanged]);
    assert_eq!(session.state().status(), &ConnectionStatus::Connecting);

    let actions = session.handle(SessionEvent::Connected { sid: "s1".into() });
    assert_eq!(emitted(&actions), vec![
        Outbound::RegisterUser(RegisterUser { user_id: "u1".into(), display_name: "Alice".into() }),
        Outbound::JoinChat(RoomKey::global()),
    ]);
    assert_eq!(session.state().status(), &ConnectionStatus::Online { sid: "s1".into() });
}

#[test]
fn reconnect_registers_again_and_rejoins_current_room() {
    let mut session = online_session(SessionConfig::default());
    let bob = PresenceEntry::new("u2", "Bob");
    session.handle(SessionEvent::StartPrivateChat(bob));

    session.handle(SessionEvent::Disconnected { reason: "ping timeout".into() });
    assert_eq!(session.state().status(), &ConnectionStatus::Reconnecting);

    let actions = session.handle(SessionEvent::Connected { sid: "s2".into() });
    let events = emitted(&actions);
    assert!(matches!(events[0], Outbound::RegisterUser(_)));
    assert_eq!(events[1], Outbound::JoinChat(RoomKey::new("u1_u2")));
    assert_eq!(events.len(), 2);
}

#[test]
fn whitespace_message_is_never_sent() {
    let mut session = online_session(SessionConfig::default());

    assert!(send(&mut session, "").is_empty());
    assert!(send(&mut session, "   \t\n").is_empty());
}

#[test]
fn message_is_trimmed_and_attributed() {
    let mut session = online_session(SessionConfig::default());

    let events = send(&mut session, "  hello  ");
    let [Outbound::SendMessage(sent)] = events.as_slice() else {
        panic!("expected one send_message, got {events:?}");
    };
    assert_eq!(sent.text, "hello");
    assert_eq!(sent.sender_id, "u1");
    assert_eq!(sent.sender_name, "Alice");
    assert_eq!(sent.room_key, Some(RoomKey::global()));
    assert!(sent.created_at.is_some());
    assert!(session.state().is_own(sent));
}

#[test]
fn message_without_connection_is_dropped() {
    let mut session = Session::<Instant>::new(alice(), SessionConfig::default());
    assert!(send(&mut session, "hello").is_empty());
}

#[test]
fn message_while_reconnecting_is_emitted_for_buffering() {
    let mut session = online_session(SessionConfig::default());
    session.handle(SessionEvent::Disconnected { reason: "socket closed".into() });

    assert_eq!(send(&mut session, "still here").len(), 1);
}

#[test]
fn load_messages_replaces_sequence() {
    let mut session = online_session(SessionConfig::default());
    session.handle(SessionEvent::Received(Inbound::ReceiveMessage(message("global", "u9", "old"))));

    let m1 = message("global", "u2", "one");
    let m2 = message("global", "u3", "two");
    session.handle(SessionEvent::Received(Inbound::LoadMessages(vec![m1.clone(), m2.clone()])));

    assert_eq!(session.state().messages(), &[m1, m2]);
}

#[test]
fn receive_message_appends_in_order() {
    let mut session = online_session(SessionConfig::default());
    let m1 = message("global", "u2", "one");
    let m2 = message("global", "u3", "two");
    session.handle(SessionEvent::Received(Inbound::LoadMessages(vec![m1.clone(), m2.clone()])));

    let hi = message("global", "u2", "hi");
    let actions = session.handle(SessionEvent::Received(Inbound::ReceiveMessage(hi.clone())));

    assert_eq!(actions, vec![SessionAction::StateChanged]);
    assert_eq!(session.state().messages(), &[m1, m2, hi]);
}

#[test]
fn foreign_room_message_is_dropped() {
    let mut session = online_session(SessionConfig::default());

    let actions =
        session.handle(SessionEvent::Received(Inbound::ReceiveMessage(message("u2_u3", "u2", "psst"))));

    assert!(actions.is_empty());
    assert!(session.state().messages().is_empty());
}

#[test]
fn foreign_room_message_kept_when_filter_off() {
    let config = SessionConfig { filter_foreign_rooms: false, ..SessionConfig::default() };
    let mut session = online_session(config);

    session.handle(SessionEvent::Received(Inbound::ReceiveMessage(message("u2_u3", "u2", "psst"))));
    assert_eq!(session.state().messages().len(), 1);
}

#[test]
fn stale_history_for_previous_room_is_dropped() {
    let mut session = online_session(SessionConfig::default());
    session.handle(SessionEvent::StartPrivateChat(PresenceEntry::new("u2", "Bob")));

    let stale = vec![message("global", "u3", "late")];
    assert!(session.handle(SessionEvent::Received(Inbound::LoadMessages(stale))).is_empty());
}

#[test]
fn unkeyed_relay_message_is_appended() {
    let mut session = online_session(SessionConfig::default());
    let event =
        Inbound::from_args(EventName::ReceiveMessage, vec![json!({"senderId": "u2", "text": "hi"})])
            .unwrap();

    let actions = session.handle(SessionEvent::Received(event));

    assert_eq!(actions, vec![SessionAction::StateChanged]);
    let [appended] = session.state().messages() else {
        panic!("expected exactly one message");
    };
    assert_eq!(appended.sender_id, "u2");
    assert_eq!(appended.text, "hi");
    assert_eq!(appended.room_key, None);
}

#[test]
fn unkeyed_history_replaces_sequence_in_private_room() {
    let mut session = online_session(SessionConfig::default());
    session.handle(SessionEvent::Received(Inbound::ReceiveMessage(message("global", "u9", "old"))));
    session.handle(SessionEvent::StartPrivateChat(PresenceEntry::new("u2", "Bob")));

    let event = Inbound::from_args(EventName::LoadMessages, vec![json!([
        {"senderId": "u2", "text": "one"},
        {"senderId": "u1", "text": "two"},
    ])])
    .unwrap();
    session.handle(SessionEvent::Received(event));

    let texts: Vec<&str> = session.state().messages().iter().map(|m| m.text.as_str()).collect();
    assert_eq!(texts, vec!["one", "two"]);
}

#[test]
fn history_for_new_room_replaces_sequence_after_switch() {
    let mut session = online_session(SessionConfig::default());
    session.handle(SessionEvent::Received(Inbound::ReceiveMessage(message("global", "u9", "old"))));
    session.handle(SessionEvent::StartPrivateChat(PresenceEntry::new("u2", "Bob")));

    let m1 = message("u1_u2", "u2", "one");
    let m2 = message("u1_u2", "u1", "two");
    session.handle(SessionEvent::Received(Inbound::LoadMessages(vec![m1.clone(), m2.clone()])));

    assert_eq!(session.state().messages(), &[m1, m2]);
}

#[test]
fn online_users_replaces_presence() {
    let mut session = online_session(SessionConfig::default());

    session.handle(SessionEvent::Received(Inbound::OnlineUsers(vec![
        PresenceEntry::new("u1", "Alice"),
        PresenceEntry::new("u2", "Bob"),
    ])));
    session.handle(SessionEvent::Received(Inbound::OnlineUsers(vec![PresenceEntry::new("u2", "Bob")])));

    assert_eq!(session.state().presence(), &[PresenceEntry::new("u2", "Bob")]);
}

#[test]
fn typing_indicator_is_single_valued() {
    let mut session = online_session(SessionConfig::default());

    session.handle(SessionEvent::Received(Inbound::Typing { display_name: Some("Bob".into()) }));
    session.handle(SessionEvent::Received(Inbound::Typing { display_name: Some("Carol".into()) }));
    assert_eq!(session.state().typing(), Some("Carol"));

    session.handle(SessionEvent::Received(Inbound::StopTyping));
    assert_eq!(session.state().typing(), None);

    // Idempotent clear
    assert!(session.handle(SessionEvent::Received(Inbound::StopTyping)).is_empty());
}

#[test]
fn nameless_typing_clears_indicator() {
    let mut session = online_session(SessionConfig::default());
    session.handle(SessionEvent::Received(Inbound::Typing { display_name: Some("Bob".into()) }));

    let event =
        Inbound::from_args(EventName::Typing, vec![json!({"chatId": "global", "userName": null})])
            .unwrap();
    let actions = session.handle(SessionEvent::Received(event));

    assert_eq!(actions, vec![SessionAction::StateChanged]);
    assert_eq!(session.state().typing(), None);
}

#[test]
fn typing_emits_on_every_keystroke() {
    let mut session = online_session(SessionConfig::default());
    let start = Instant::now();

    for offset in [0, 100, 200] {
        let events = emitted(&session.handle(SessionEvent::NotifyTyping {
            now: start + Duration::from_millis(offset),
        }));
        assert_eq!(events, vec![Outbound::Typing(TypingStarted {
            room_key: RoomKey::global(),
            display_name: "Alice".into(),
        })]);
    }
}

#[test]
fn stop_typing_fires_once_after_quiet_period() {
    let mut session = online_session(SessionConfig::default());
    let start = Instant::now();
    session.handle(SessionEvent::NotifyTyping { now: start });

    let early = start + Duration::from_millis(1199);
    assert!(session.handle(SessionEvent::Tick { now: early }).is_empty());

    let due = start + DEFAULT_TYPING_TIMEOUT;
    assert_eq!(session.next_deadline(), Some(due));
    assert_eq!(emitted(&session.handle(SessionEvent::Tick { now: due })), vec![Outbound::StopTyping(
        TypingStopped { room_key: RoomKey::global() }
    )]);

    assert!(session.handle(SessionEvent::Tick { now: due + DEFAULT_TYPING_TIMEOUT }).is_empty());
    assert_eq!(session.next_deadline(), None);
}

#[test]
fn pending_stop_survives_reconnect() {
    let mut session = online_session(SessionConfig::default());
    let start = Instant::now();
    session.handle(SessionEvent::NotifyTyping { now: start });

    session.handle(SessionEvent::Disconnected { reason: "transport close".into() });
    let rejoin = emitted(&session.handle(SessionEvent::Connected { sid: "s2".into() }));
    assert_eq!(rejoin.len(), 2);

    let due = start + DEFAULT_TYPING_TIMEOUT;
    assert_eq!(session.next_deadline(), Some(due));
    assert_eq!(emitted(&session.handle(SessionEvent::Tick { now: due })), vec![Outbound::StopTyping(
        TypingStopped { room_key: RoomKey::global() }
    )]);

    for later in [Duration::from_millis(2400), Duration::from_secs(5), Duration::from_secs(60)] {
        assert!(session.handle(SessionEvent::Tick { now: start + later }).is_empty());
    }
}

#[test]
fn stop_due_while_reconnecting_is_emitted_for_buffering() {
    let mut session = online_session(SessionConfig::default());
    let start = Instant::now();
    session.handle(SessionEvent::NotifyTyping { now: start });
    session.handle(SessionEvent::Disconnected { reason: "ping timeout".into() });

    let due = start + DEFAULT_TYPING_TIMEOUT;
    assert_eq!(emitted(&session.handle(SessionEvent::Tick { now: due })), vec![Outbound::StopTyping(
        TypingStopped { room_key: RoomKey::global() }
    )]);

    // Re-registration after the backlog was filled emits no second stop.
    session.handle(SessionEvent::Connected { sid: "s2".into() });
    assert_eq!(session.next_deadline(), None);
    assert!(session.handle(SessionEvent::Tick { now: due + DEFAULT_TYPING_TIMEOUT }).is_empty());
}

#[test]
fn typing_while_reconnecting_is_not_sent() {
    let mut session = online_session(SessionConfig::default());
    session.handle(SessionEvent::Disconnected { reason: "socket closed".into() });

    assert!(session.handle(SessionEvent::NotifyTyping { now: Instant::now() }).is_empty());
    assert_eq!(session.next_deadline(), None);
}

#[test]
fn sustained_typing_defers_stop() {
    let mut session = online_session(SessionConfig::default());
    let start = Instant::now();

    let mut now = start;
    for _ in 0..10 {
        session.handle(SessionEvent::NotifyTyping { now });
        now += Duration::from_millis(1000);
        assert!(session.handle(SessionEvent::Tick { now }).is_empty());
    }
    let last = now - Duration::from_millis(1000);
    assert_eq!(session.next_deadline(), Some(last + DEFAULT_TYPING_TIMEOUT));
}

#[test]
fn switching_rooms_flushes_pending_stop_for_old_room() {
    let mut session = online_session(SessionConfig::default());
    let start = Instant::now();
    session.handle(SessionEvent::NotifyTyping { now: start });

    let actions = session.handle(SessionEvent::StartPrivateChat(PresenceEntry::new("u2", "Bob")));
    assert_eq!(emitted(&actions), vec![
        Outbound::StopTyping(TypingStopped { room_key: RoomKey::global() }),
        Outbound::JoinChat(RoomKey::new("u1_u2")),
    ]);

    // Timer was cancelled
    assert_eq!(session.next_deadline(), None);
    assert!(session.handle(SessionEvent::Tick { now: start + DEFAULT_TYPING_TIMEOUT }).is_empty());
}

#[test]
fn switch_room_emits_one_join_and_updates_title() {
    let mut session = online_session(SessionConfig::default());

    let actions = session.handle(SessionEvent::SwitchRoom {
        room_key: RoomKey::new("u1_u7"),
        title: "Dana".into(),
    });

    assert_eq!(emitted(&actions), vec![Outbound::JoinChat(RoomKey::new("u1_u7"))]);
    assert_eq!(session.state().room_key(), &RoomKey::new("u1_u7"));
    assert_eq!(session.state().room_title(), "Dana");
}

#[test]
fn switching_to_active_room_emits_nothing() {
    let mut session = online_session(SessionConfig::default());

    let actions = session.handle(SessionEvent::SelectGeneralChat);
    assert!(emitted(&actions).is_empty());
}

#[test]
fn private_chat_key_is_order_independent() {
    let mut session = online_session(SessionConfig::default());
    session.handle(SessionEvent::StartPrivateChat(PresenceEntry::new("a0", "Zed")));

    // "a0" sorts before "u1"
    assert_eq!(session.state().room_key(), &RoomKey::new("a0_u1"));
    assert_eq!(session.state().room_title(), "Zed");
}

#[test]
fn private_chat_with_self_is_ignored() {
    let mut session = online_session(SessionConfig::default());

    let actions = session.handle(SessionEvent::StartPrivateChat(PresenceEntry::new("u1", "Alice")));
    assert!(actions.is_empty());
    assert!(session.state().room_key().is_global());
}

#[test]
fn explicit_leave_precedes_join() {
    let config = SessionConfig { explicit_leave: true, ..SessionConfig::default() };
    let mut session = online_session(config);

    let actions = session.handle(SessionEvent::StartPrivateChat(PresenceEntry::new("u2", "Bob")));
    assert_eq!(emitted(&actions), vec![
        Outbound::LeaveChat(RoomKey::global()),
        Outbound::JoinChat(RoomKey::new("u1_u2")),
    ]);
}

#[test]
fn offline_room_switch_joins_on_connect() {
    let mut session = Session::<Instant>::new(alice(), SessionConfig::default());

    let actions = session.handle(SessionEvent::StartPrivateChat(PresenceEntry::new("u2", "Bob")));
    assert!(emitted(&actions).is_empty());

    session.handle(SessionEvent::Connecting);
    let actions = session.handle(SessionEvent::Connected { sid: "s1".into() });
    assert_eq!(emitted(&actions)[1], Outbound::JoinChat(RoomKey::new("u1_u2")));
}

#[test]
fn logout_resets_and_disconnects() {
    let mut session = online_session(SessionConfig::default());
    session.handle(SessionEvent::NotifyTyping { now: Instant::now() });
    session.handle(SessionEvent::Received(Inbound::OnlineUsers(vec![PresenceEntry::new("u2", "Bob")])));

    let actions = session.handle(SessionEvent::Logout);
    assert_eq!(actions, vec![SessionAction::Disconnect, SessionAction::StateChanged]);
    assert_eq!(session.state().status(), &ConnectionStatus::Offline);
    assert!(session.state().presence().is_empty());
    assert_eq!(session.next_deadline(), None);

    // Late relay traffic after logout is ignored
    assert!(session.handle(SessionEvent::Received(Inbound::StopTyping)).is_empty());
    assert!(session.handle(SessionEvent::Connected { sid: "s9".into() }).is_empty());
}
