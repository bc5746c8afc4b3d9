//! Wall-clock environment for the terminal client.
//!
//! Deadlines (typing debounce, heartbeat timeouts) are computed against
//! `std::time::Instant` and waited on with tokio timers. Tests that need
//! reproducible timing use the harness clock instead.

use std::time::{Duration, Instant};

use annochat_core::env::Environment;

/// Real clock backed by `Instant::now` and `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Wall-clock environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = Instant;

    #[allow(clippy::disallowed_methods)]
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}
