//! Deterministic simulation harness for AnnoChat.
//!
//! Virtual-time implementations of the Environment, Driver and TokenProvider
//! traits, so the production runtime can be exercised against scripted
//! servers and users without sockets or wall-clock waits.
//!
//! # Model-Based Testing
//!
//! The `model` module provides a reference implementation for model-based
//! testing. Operations are applied to both the model and the real runtime,
//! and their observable states are compared.
//!
//! # Invariant Testing
//!
//! The `invariants` module provides behavioral testing through invariant
//! checks. Use [`InvariantRegistry::standard()`] to have the simulation driver
//! check the connection lifecycle on every render.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod invariants;
pub mod model;
pub mod sim_driver;
pub mod sim_env;
pub mod sim_tokens;

pub use invariants::{
    Invariant, InvariantRegistry, InvariantResult, JoinBeforeEmit, LogRequiresRoom,
    NoEmitAfterClose, Observation, SingleConnection, TypingRequiresConnection, Violation,
};
pub use model::{ModelMessage, ModelSession, ObservableState, Operation, SmallText};
pub use sim_driver::{DriverCall, REJECTED_REASON, Scripted, SimDriver, SimDriverError};
pub use sim_env::{SimEnv, SimInstant};
pub use sim_tokens::{ScriptedTokens, SimTokenError};

use annochat_app::{Runtime, SessionConfig};

/// Runtime wired to simulation parts.
pub type SimRuntime = Runtime<SimDriver, SimEnv, ScriptedTokens>;

/// Simulated client: a runtime plus handles to its driver, clock and tokens.
pub struct SimClient {
    /// Runtime under test.
    pub runtime: SimRuntime,
    /// Shared handle to the runtime's driver.
    pub driver: SimDriver,
    /// Shared virtual clock.
    pub env: SimEnv,
    /// Shared token provider.
    pub tokens: ScriptedTokens,
}

impl SimClient {
    /// Client with default session settings, checking the standard invariants.
    pub fn new() -> Self {
        Self::with_config(SessionConfig::default())
    }

    /// Client with custom session settings, checking the standard invariants.
    pub fn with_config(config: SessionConfig) -> Self {
        let env = SimEnv::new();
        let tokens = ScriptedTokens::new();
        let driver = SimDriver::new(env.clone(), tokens.clone())
            .with_invariants(InvariantRegistry::standard());
        let runtime = Runtime::new(driver.clone(), env.clone(), tokens.clone(), config);
        Self { runtime, driver, env, tokens }
    }

    /// Run until the script is exhausted and no deadline is pending.
    ///
    /// # Errors
    ///
    /// Returns the first invariant violation, if any.
    pub async fn run(&mut self) -> Result<(), SimDriverError> {
        tracing::debug!("running simulated client");
        self.runtime.run().await
    }
}

impl Default for SimClient {
    fn default() -> Self {
        Self::new()
    }
}
