//! Fuzz target for Packet::decode
//!
//! Relay frames are untrusted. This fuzzer feeds arbitrary text through the
//! Engine.IO and Socket.IO decoders and the typed event layer to find:
//! - Parser crashes or panics
//! - Packets that decode but fail to re-encode
//! - Event payloads that bypass validation
//!
//! The fuzzer should NEVER panic. All invalid inputs should return an error.

#![no_main]

use libfuzzer_sys::fuzz_target;
use ping_proto::{Inbound, Packet, SocketPacket};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let Ok(packet) = Packet::decode(text) else {
        return;
    };

    // Anything we accept we must be able to write back out identically
    if let Ok(encoded) = packet.encode() {
        assert_eq!(Packet::decode(&encoded).ok(), Some(packet.clone()));
    }

    if let Packet::Message(SocketPacket::Event { name, args, .. }) = packet {
        if let Ok(name) = name.parse() {
            let _ = Inbound::from_args(name, args);
        }
    }
});
