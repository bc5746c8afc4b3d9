//! Error types for the socket link.

use std::time::Duration;

use annochat_proto::ProtocolError;
use thiserror::Error;

use crate::connection::LinkState;

/// Errors raised by the [`crate::Link`] state machine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// Operation not allowed in the current state.
    #[error("invalid state: cannot {operation} while {state:?}")]
    InvalidState {
        /// State when the operation was attempted.
        state: LinkState,
        /// Operation that was attempted.
        operation: &'static str,
    },

    /// Packet that makes no sense in the current state.
    #[error("unexpected {packet} packet while {state:?}")]
    UnexpectedPacket {
        /// State when the packet arrived.
        state: LinkState,
        /// Packet kind.
        packet: &'static str,
    },

    /// Handshake did not complete in time.
    #[error("handshake timeout after {elapsed:?}")]
    HandshakeTimeout {
        /// How long we waited.
        elapsed: Duration,
    },

    /// Server stopped pinging.
    #[error("heartbeat timeout after {elapsed:?}")]
    HeartbeatTimeout {
        /// Time since the last inbound packet.
        elapsed: Duration,
    },

    /// Wire format error.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}
