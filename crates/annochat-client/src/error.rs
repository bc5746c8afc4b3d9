//! Client I/O errors.

use std::time::Duration;

use thiserror::Error;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Server URL cannot be turned into a WebSocket URL.
    #[error("invalid server url: {0}")]
    InvalidUrl(String),

    /// WebSocket connection failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// WebSocket did not open in time.
    #[error("connection timed out after {0:?}")]
    Timeout(Duration),

    /// Read or write on an open socket failed.
    #[error("stream error: {0}")]
    Stream(String),

    /// Packet could not be encoded.
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Token fetch errors.
#[derive(Debug, Error)]
pub enum TokenError {
    /// HTTP request failed (connect, timeout, body read).
    #[error("token request failed: {0}")]
    Request(String),

    /// Endpoint answered with a non-success status.
    #[error("token endpoint returned status {0}")]
    Status(u16),

    /// Body is not `{ "token": string }`.
    #[error("malformed token response: {0}")]
    Malformed(String),
}
