//! Property-based tests for the session state machine.
//!
//! Invariants checked under arbitrary event sequences:
//! - `stop_typing` only goes out after a full quiet period
//! - at most one `stop_typing` per burst of typing
//! - the active room is always the one most recently joined

use std::time::{Duration, Instant};

use chrono::Utc;
use ping_client::{DEFAULT_TYPING_TIMEOUT, Session, SessionAction, SessionConfig, SessionEvent};
use ping_proto::{Identity, Inbound, Outbound, PresenceEntry, RoomKey};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Step {
    Type,
    Wait(u64),
    Send(String),
    OpenPeer(u8),
    General,
    Typing(String),
    StopTyping,
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        4 => Just(Step::Type),
        4 => (0u64..2500).prop_map(Step::Wait),
        1 => "[ a-z]{0,6}".prop_map(Step::Send),
        1 => (0u8..4).prop_map(Step::OpenPeer),
        1 => Just(Step::General),
        1 => "[a-z]{1,4}".prop_map(Step::Typing),
        1 => Just(Step::StopTyping),
    ]
}

fn online_session() -> Session<Instant> {
    let identity = Identity::new("u1", "Alice").unwrap();
    let mut session = Session::new(identity, SessionConfig::default());
    session.handle(SessionEvent::Connecting);
    session.handle(SessionEvent::Connected { sid: "s1".into() });
    session
}

fn emits(actions: &[SessionAction]) -> impl Iterator<Item = &Outbound> {
    actions.iter().filter_map(|a| match a {
        SessionAction::Emit(event) => Some(event),
        _ => None,
    })
}

proptest! {
    #[test]
    fn prop_stop_typing_only_after_quiet_period(steps in prop::collection::vec(step_strategy(), 0..60)) {
        let mut session = online_session();
        let mut now = Instant::now();
        let mut last_typing: Option<Instant> = None;
        let mut joined = RoomKey::global();

        for step in steps {
            let event = match step {
                Step::Type => SessionEvent::NotifyTyping { now },
                Step::Wait(ms) => {
                    now += Duration::from_millis(ms);
                    SessionEvent::Tick { now }
                },
                Step::Send(text) => SessionEvent::SendMessage { text, at: Utc::now() },
                Step::OpenPeer(n) => SessionEvent::StartPrivateChat(PresenceEntry::new(format!("p{n}"), format!("Peer {n}"))),
                Step::General => SessionEvent::SelectGeneralChat,
                Step::Typing(name) => SessionEvent::Received(Inbound::Typing { display_name: Some(name) }),
                Step::StopTyping => SessionEvent::Received(Inbound::StopTyping),
            };
            let is_room_switch = matches!(event, SessionEvent::StartPrivateChat(_) | SessionEvent::SelectGeneralChat);
            let actions = session.handle(event);

            for emitted in emits(&actions) {
                match emitted {
                    Outbound::Typing(_) => last_typing = Some(now),
                    Outbound::StopTyping(_) => {
                        let started = last_typing.take();
                        prop_assert!(started.is_some(), "stop_typing without typing");
                        if !is_room_switch {
                            prop_assert!(now - started.unwrap() >= DEFAULT_TYPING_TIMEOUT);
                        }
                    },
                    Outbound::JoinChat(room) => joined = room.clone(),
                    Outbound::SendMessage(message) => {
                        prop_assert!(!message.text.trim().is_empty());
                        prop_assert_eq!(message.room_key.as_ref(), Some(session.state().room_key()));
                    },
                    Outbound::RegisterUser(_) | Outbound::LeaveChat(_) => {},
                }
            }
            if emits(&actions).any(|e| matches!(e, Outbound::JoinChat(_))) {
                // Leaving a room cancels its pending stop
                last_typing = None;
            }

            prop_assert_eq!(&joined, session.state().room_key());
        }
    }

    #[test]
    fn prop_receive_message_appends_exactly_one(count in 0usize..20, text in "[a-z]{1,10}") {
        let mut session = online_session();
        for i in 0..count {
            let message = ping_proto::Message {
                room_key: Some(RoomKey::global()),
                sender_id: format!("u{i}"),
                sender_name: String::new(),
                text: format!("m{i}"),
                created_at: None,
            };
            session.handle(SessionEvent::Received(Inbound::ReceiveMessage(message)));
        }
        let before = session.state().messages().to_vec();

        let incoming = ping_proto::Message {
            room_key: Some(RoomKey::global()),
            sender_id: "u2".into(),
            sender_name: "Bob".into(),
            text,
            created_at: None,
        };
        session.handle(SessionEvent::Received(Inbound::ReceiveMessage(incoming.clone())));

        let after = session.state().messages();
        prop_assert_eq!(after.len(), before.len() + 1);
        prop_assert_eq!(&after[..before.len()], before.as_slice());
        prop_assert_eq!(after.last(), Some(&incoming));
    }
}
