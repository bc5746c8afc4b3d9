//! Fuzz target for the chat runtime
//!
//! Runs arbitrary user, server and network operations through the production
//! runtime on the simulation driver, with the standard invariants checked on
//! every render, and compares the result with the reference model.
//!
//! # Invariants
//!
//! - NEVER panic
//! - No invariant violation (single connection, no emit after close, join
//!   before emit, typing requires connection, log requires room)
//! - Final observable state matches the model

#![no_main]

use annochat_harness::{ModelSession, ObservableState, Operation, SimClient};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|ops: Vec<Operation>| {
    let mut client = SimClient::new();
    let mut model = ModelSession::started();
    for op in &ops {
        client.driver.extend(op.to_script());
        model.apply(op);
    }
    model.quit();

    let Ok(rt) = tokio::runtime::Builder::new_current_thread().build() else {
        return;
    };
    if let Err(e) = rt.block_on(client.run()) {
        panic!("invariant violated: {e}");
    }

    let real = ObservableState::from_snapshot(&client.runtime.view().session);
    assert_eq!(real, model.observable_state());
});
