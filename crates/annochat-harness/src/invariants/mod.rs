//! Invariant checking for deterministic simulation testing.
//!
//! Invariants are properties that must always hold during execution, whatever
//! order the server, the network and the user produce events in.
//!
//! # Architecture
//!
//! The simulation driver records every operation the runtime performs and
//! builds an [`Observation`] at each render, then runs registered
//! [`Invariant`] checks against it. A violation fails the render, which ends
//! the runtime with an error carrying the violation messages.
//!
//! # Usage
//!
//! ```ignore
//! let driver = SimDriver::new(env, tokens).with_invariants(InvariantRegistry::standard());
//! ```

mod checks;
mod snapshot;

pub use checks::{
    JoinBeforeEmit, LogRequiresRoom, NoEmitAfterClose, SingleConnection, TypingRequiresConnection,
};
pub use snapshot::Observation;

/// Invariant check result.
pub type InvariantResult = Result<(), Violation>;

/// Invariant violation with context.
#[derive(Debug, Clone)]
pub struct Violation {
    /// Name of the violated invariant.
    pub invariant: &'static str,
    /// Description of what went wrong.
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.invariant, self.message)
    }
}

impl std::error::Error for Violation {}

/// An invariant that can be checked against an observation.
pub trait Invariant: Send + Sync {
    /// Invariant name for error reporting.
    fn name(&self) -> &'static str;

    /// Check the invariant.
    ///
    /// Returns `Ok(())` if the invariant holds, or a [`Violation`]
    /// describing what went wrong.
    fn check(&self, state: &Observation) -> InvariantResult;
}

/// Registry of invariants to check.
pub struct InvariantRegistry {
    invariants: Vec<Box<dyn Invariant>>,
}

impl Default for InvariantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InvariantRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { invariants: Vec::new() }
    }

    /// Create a registry with the standard invariants.
    ///
    /// Includes:
    /// - [`SingleConnection`]: never two chat connections at once
    /// - [`NoEmitAfterClose`]: emits only on open connections
    /// - [`JoinBeforeEmit`]: room joined before chatting in it
    /// - [`TypingRequiresConnection`]: peer typing only while live
    /// - [`LogRequiresRoom`]: messages belong to a room
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.add(SingleConnection);
        registry.add(NoEmitAfterClose);
        registry.add(JoinBeforeEmit);
        registry.add(TypingRequiresConnection);
        registry.add(LogRequiresRoom);
        registry
    }

    /// Add an invariant to the registry.
    pub fn add<I: Invariant + 'static>(&mut self, invariant: I) {
        self.invariants.push(Box::new(invariant));
    }

    /// Check all invariants against the given state.
    ///
    /// Returns `Ok(())` if all invariants hold, or all violations found.
    pub fn check_all(&self, state: &Observation) -> Result<(), Vec<Violation>> {
        let violations: Vec<_> =
            self.invariants.iter().filter_map(|inv| inv.check(state).err()).collect();

        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }

    /// Number of registered invariants.
    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_registry_has_invariants() {
        let registry = InvariantRegistry::standard();
        assert!(!registry.is_empty());
        assert_eq!(registry.len(), 5);
    }

    #[test]
    fn empty_observation_passes_invariants() {
        let registry = InvariantRegistry::standard();
        assert!(registry.check_all(&Observation::default()).is_ok());
    }
}
