//! Property-based tests for the socket link.
//!
//! `Duration` stands in for the instant type: it is ordered and subtracts to
//! a `Duration`, which is all the link needs from a clock.

use std::time::Duration;

use annochat_core::{Link, LinkAction, LinkConfig, LinkState};
use annochat_proto::{Handshake, Packet, SocketPacket};
use proptest::prelude::*;
use serde_json::json;

fn open(ping_interval: u64, ping_timeout: u64) -> Packet {
    Packet::Open(Handshake {
        sid: "eio".into(),
        upgrades: vec![],
        ping_interval,
        ping_timeout,
        max_payload: None,
    })
}

fn connected_link(ping_interval: u64, ping_timeout: u64) -> Link<Duration> {
    let mut link = Link::new(Duration::ZERO, "/", Some(json!({"token": "t"})), LinkConfig::default());
    let _ = link.handle_packet(open(ping_interval, ping_timeout), Duration::ZERO);
    let _ = link.handle_packet(
        Packet::Message(SocketPacket::Connect { namespace: "/".into(), data: None }),
        Duration::ZERO,
    );
    link
}

fn inbound_packet() -> impl Strategy<Value = Packet> {
    let namespace = prop_oneof![Just("/".to_string()), Just("/presence".to_string())];
    prop_oneof![
        Just(open(25_000, 20_000)),
        Just(Packet::Close),
        ".{0,8}".prop_map(Packet::Ping),
        ".{0,8}".prop_map(Packet::Pong),
        Just(Packet::Noop),
        namespace.clone().prop_map(|namespace| Packet::Message(SocketPacket::Connect { namespace, data: None })),
        namespace.clone().prop_map(|namespace| Packet::Message(SocketPacket::Disconnect { namespace })),
        namespace.clone().prop_map(|namespace| Packet::Message(SocketPacket::ConnectError {
            namespace,
            data: Some(json!({"message": "no"})),
        })),
        (namespace, "[a-z ]{1,12}")
            .prop_map(|(namespace, name)| Packet::Message(SocketPacket::event(namespace, name, vec![]))),
    ]
}

proptest! {
    #[test]
    fn prop_every_ping_gets_a_pong(data in ".{0,32}") {
        let mut link = connected_link(25_000, 20_000);
        let actions = link.handle_packet(Packet::Ping(data.clone()), Duration::from_secs(1)).unwrap();
        prop_assert_eq!(actions, vec![LinkAction::Send(Packet::Pong(data))]);
        prop_assert_eq!(link.state(), LinkState::Connected);
    }

    #[test]
    fn prop_silence_closes_after_heartbeat_window(
        interval in 1u64..60_000,
        timeout in 1u64..60_000,
        slack in 1u64..10_000,
    ) {
        let mut link = connected_link(interval, timeout);
        let window = Duration::from_millis(interval + timeout);

        prop_assert!(link.tick(window).is_empty());
        prop_assert_eq!(link.state(), LinkState::Connected);

        let actions = link.tick(window + Duration::from_millis(slack));
        prop_assert!(
            matches!(actions.as_slice(), [LinkAction::Close { .. }]),
            "expected a single Close action, got {:?}",
            actions
        );
        prop_assert_eq!(link.state(), LinkState::Closed);
    }

    #[test]
    fn prop_closed_is_terminal(packets in prop::collection::vec(inbound_packet(), 0..32)) {
        let mut link: Link<Duration> =
            Link::new(Duration::ZERO, "/", None, LinkConfig::default());
        let mut closed = false;

        for (i, packet) in packets.into_iter().enumerate() {
            let now = Duration::from_millis(i as u64);
            let result = link.handle_packet(packet, now);
            if closed {
                prop_assert_eq!(result, Ok(vec![]));
            }
            closed = link.state() == LinkState::Closed;
        }
    }

    #[test]
    fn prop_deliveries_only_when_connected(packets in prop::collection::vec(inbound_packet(), 0..32)) {
        let mut link: Link<Duration> =
            Link::new(Duration::ZERO, "/", None, LinkConfig::default());

        for packet in packets {
            let before = link.state();
            if let Ok(actions) = link.handle_packet(packet, Duration::ZERO) {
                for action in actions {
                    if matches!(action, LinkAction::Deliver { .. }) {
                        prop_assert_eq!(before, LinkState::Connected);
                    }
                }
            }
        }
    }
}
