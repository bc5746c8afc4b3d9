//! Scripted token provider.

#![allow(clippy::disallowed_types, reason = "Synchronous locking operations only")]

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use annochat_app::TokenProvider;

/// Token fetch failure in simulation.
#[derive(Debug, Clone)]
pub struct SimTokenError(pub String);

impl std::fmt::Display for SimTokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SimTokenError: {}", self.0)
    }
}

impl std::error::Error for SimTokenError {}

#[derive(Debug, Default)]
struct TokenState {
    fetches: u64,
    pending_failures: u64,
}

/// Issues `token-1`, `token-2`, ... unless told to fail. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTokens {
    state: Arc<Mutex<TokenState>>,
}

impl ScriptedTokens {
    /// Provider that always succeeds until told otherwise.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next fetch fail. Stacks.
    pub fn fail_next(&self) {
        self.lock().pending_failures += 1;
    }

    /// Number of fetches so far, successful or not.
    pub fn fetches(&self) -> u64 {
        self.lock().fetches
    }

    fn lock(&self) -> MutexGuard<'_, TokenState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TokenProvider for ScriptedTokens {
    type Error = SimTokenError;

    async fn fetch_token(&self) -> Result<String, SimTokenError> {
        let mut state = self.lock();
        state.fetches += 1;
        if state.pending_failures > 0 {
            state.pending_failures -= 1;
            return Err(SimTokenError("token endpoint unavailable".into()));
        }
        Ok(format!("token-{}", state.fetches))
    }
}
