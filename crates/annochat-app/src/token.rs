//! Credential source for chat connections.

use std::future::Future;

/// Issues a short-lived token for one connection attempt.
///
/// Called once per attempt. Tokens are never cached or reused across
/// reconnects. A failure ends the current attempt only.
pub trait TokenProvider: Send + Sync {
    /// Provider-specific error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Fetch a fresh token.
    fn fetch_token(&self) -> impl Future<Output = Result<String, Self::Error>> + Send;
}
