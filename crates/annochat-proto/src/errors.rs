//! Protocol error types.

use thiserror::Error;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while decoding packets or events.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Packet text does not follow the Engine.IO / Socket.IO framing.
    #[error("malformed packet: {0}")]
    Malformed(String),

    /// Packet type is valid but not supported by this client.
    #[error("unsupported packet type: {0}")]
    UnsupportedPacket(char),

    /// Embedded JSON failed to parse.
    #[error("invalid json: {0}")]
    Json(String),

    /// Event name is not one the client understands.
    #[error("unknown event: {0}")]
    UnknownEvent(String),

    /// Known event with a payload of the wrong shape.
    #[error("invalid payload for event {event}: {reason}")]
    InvalidEvent {
        /// Event name.
        event: &'static str,
        /// What was wrong with the payload.
        reason: String,
    },
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}
