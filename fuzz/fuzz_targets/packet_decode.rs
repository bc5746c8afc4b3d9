//! Fuzz target for Packet::decode
//!
//! Feeds arbitrary text to the Engine.IO / Socket.IO decoder to find:
//! - Parser panics on truncated or oversized numeric fields
//! - Namespace / ack id splitting bugs
//! - JSON payloads that bypass validation
//!
//! The fuzzer should NEVER panic. All invalid inputs should return an error,
//! and anything that decodes must encode again.

#![no_main]

use annochat_proto::Packet;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(packet) = Packet::decode(text) {
        let _ = packet.encode();
    }
});
