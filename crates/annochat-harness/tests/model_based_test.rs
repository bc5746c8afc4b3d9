//! Model-based property tests.
//!
//! These tests generate random operation sequences and verify that the real
//! runtime behaves identically to the reference model.
//!
//! # Architecture
//!
//! ```text
//! proptest generates: Vec<Operation>
//!                          │
//!           ┌──────────────┼──────────────┐
//!           ▼              ▼              ▼
//!     ModelSession    SimClient       Compare
//!     (reference)   (virtual time)   Observable
//! ```

#![allow(clippy::unwrap_used)]

use annochat_harness::{ModelSession, ObservableState, Operation, SimClient, SmallText};
use proptest::prelude::*;

fn small_text_strategy() -> impl Strategy<Value = SmallText> {
    (any::<u8>(), 0u8..4).prop_map(|(seed, size_class)| SmallText { seed, size_class })
}

fn operation_strategy() -> impl Strategy<Value = Operation> {
    prop_oneof![
        4 => small_text_strategy().prop_map(|text| Operation::TypeText { text }),
        1 => Just(Operation::Backspace),
        3 => Just(Operation::Send),
        1 => Just(Operation::FindNew),
        2 => (0u8..3).prop_map(|room| Operation::Matched { room }),
        3 => small_text_strategy().prop_map(|text| Operation::StrangerMessage { text }),
        2 => any::<bool>().prop_map(|is_typing| Operation::StrangerTyping { is_typing }),
        1 => Just(Operation::StrangerLeft),
        1 => proptest::option::of(small_text_strategy())
            .prop_map(|message| Operation::ServerError { message }),
        1 => Just(Operation::ConnectionLost),
        1 => small_text_strategy().prop_map(|text| Operation::StaleMessage { text }),
        1 => Just(Operation::TokenFailsNext),
        1 => proptest::option::of(small_text_strategy())
            .prop_map(|message| Operation::HandshakeRejectsNext { message }),
        2 => (0u16..4000).prop_map(|millis| Operation::AdvanceTime { millis }),
    ]
}

/// Run `ops` through a simulated client. Returns its final observable state,
/// or the invariant violation that stopped it.
fn run_real(ops: &[Operation]) -> Result<ObservableState, String> {
    let mut client = SimClient::new();
    for op in ops {
        client.driver.extend(op.to_script());
    }

    let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
    rt.block_on(client.run()).map_err(|e| e.to_string())?;
    Ok(ObservableState::from_snapshot(&client.runtime.view().session))
}

fn run_model(ops: &[Operation]) -> ObservableState {
    let mut model = ModelSession::started();
    for op in ops {
        model.apply(op);
    }
    model.quit();
    model.observable_state()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_model_matches_real(ops in prop::collection::vec(operation_strategy(), 0..40)) {
        let real = run_real(&ops);
        prop_assert!(real.is_ok(), "invariant violated: {:?}", real);
        prop_assert_eq!(real.unwrap(), run_model(&ops));
    }

    #[test]
    fn prop_stale_messages_never_show(
        ops in prop::collection::vec(operation_strategy(), 0..20),
        text in small_text_strategy(),
    ) {
        let mut with_stale = ops.clone();
        with_stale.push(Operation::FindNew);
        with_stale.push(Operation::StaleMessage { text });

        let mut without = ops;
        without.push(Operation::FindNew);

        prop_assert_eq!(run_real(&with_stale).unwrap(), run_real(&without).unwrap());
    }

    #[test]
    fn prop_sent_messages_clear_the_draft(text in small_text_strategy(), room in 0u8..3) {
        let ops = vec![
            Operation::Matched { room },
            Operation::TypeText { text: text.clone() },
            Operation::Send,
        ];
        let state = run_real(&ops).unwrap();

        if text.to_text().trim().is_empty() {
            prop_assert!(state.messages.is_empty());
            prop_assert_eq!(state.draft, text.to_text());
        } else {
            prop_assert_eq!(state.messages.len(), 1);
            prop_assert!(state.draft.is_empty());
        }
    }
}

#[test]
fn model_basic_operations() {
    let ops = vec![
        Operation::Matched { room: 1 },
        Operation::StrangerMessage { text: SmallText { seed: 2, size_class: 2 } },
        Operation::TypeText { text: SmallText { seed: 5, size_class: 3 } },
        Operation::Send,
        Operation::StrangerLeft,
    ];
    assert_eq!(run_real(&ops).unwrap(), run_model(&ops));
}

#[test]
fn model_failure_operations() {
    let ops = vec![
        Operation::TokenFailsNext,
        Operation::FindNew,
        Operation::Matched { room: 0 },
        Operation::FindNew,
        Operation::Matched { room: 2 },
        Operation::ConnectionLost,
        Operation::StrangerMessage { text: SmallText { seed: 1, size_class: 2 } },
    ];
    let real = run_real(&ops).unwrap();
    assert_eq!(real.status_text, "Error: connection lost");
    assert_eq!(real, run_model(&ops));
}

#[test]
fn model_rejected_handshake_operations() {
    let ops = vec![
        Operation::Matched { room: 1 },
        Operation::HandshakeRejectsNext { message: Some(SmallText { seed: 3, size_class: 2 }) },
        Operation::FindNew,
        Operation::StrangerMessage { text: SmallText { seed: 1, size_class: 2 } },
        Operation::StaleMessage { text: SmallText { seed: 2, size_class: 2 } },
        Operation::FindNew,
        Operation::Matched { room: 2 },
    ];
    let real = run_real(&ops).unwrap();
    assert_eq!(real.room.as_deref(), Some("room-2"));
    assert_eq!(real, run_model(&ops));
}
