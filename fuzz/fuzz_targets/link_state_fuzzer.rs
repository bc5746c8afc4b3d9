//! Fuzz target for the socket link state machine
//!
//! Drives a `Link` with arbitrary server text frames, emits and clock jumps.
//!
//! # Invariants
//!
//! - NEVER panic, whatever the server sends
//! - Once closed, the link produces no further actions
//! - Events are only delivered while connected

#![no_main]

use std::time::Duration;

use annochat_core::{Link, LinkAction, LinkConfig, LinkState};
use annochat_proto::Packet;
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Step {
    Frame(String),
    Emit { name: String },
    Advance { millis: u16 },
    Disconnect,
}

fuzz_target!(|steps: Vec<Step>| {
    let mut now = Duration::ZERO;
    let mut link = Link::new(now, "/", None, LinkConfig::default());

    for step in steps {
        let was_closed = link.state() == LinkState::Closed;
        let connected = link.state() == LinkState::Connected;

        let actions = match step {
            Step::Frame(text) => match Packet::decode(&text) {
                Ok(packet) => link.handle_packet(packet, now).unwrap_or_default(),
                Err(_) => continue,
            },
            Step::Emit { name } => {
                let _ = link.emit(&name, vec![]);
                continue;
            },
            Step::Advance { millis } => {
                now += Duration::from_millis(u64::from(millis));
                link.tick(now)
            },
            Step::Disconnect => link.disconnect(),
        };

        if was_closed {
            assert!(actions.is_empty(), "closed link produced {actions:?}");
        }
        if !connected {
            assert!(
                !actions.iter().any(|a| matches!(a, LinkAction::Deliver { .. })),
                "delivery before connect"
            );
        }
    }
});
