//! Side effects requested by the state machines.

use annochat_proto::ClientEvent;

use crate::ConnectionId;

/// Actions produced by the [`crate::ChatSession`] state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Fetch a fresh token for this attempt.
    FetchToken {
        /// Attempt the token is for.
        conn: ConnectionId,
    },

    /// Open the chat socket with the token as credential.
    OpenConnection {
        /// Attempt to open.
        conn: ConnectionId,
        /// Credential sent in the namespace handshake.
        token: String,
    },

    /// Detach listeners and close the connection. Idempotent.
    Teardown {
        /// Connection to close.
        conn: ConnectionId,
    },

    /// Emit an event on the chat connection.
    Emit {
        /// Connection to emit on.
        conn: ConnectionId,
        /// Event to send.
        event: ClientEvent,
    },

    /// State changed, render.
    Render,
}

/// Actions produced by the [`crate::PresenceChannel`] state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceAction {
    /// Open the presence socket.
    Open,
    /// Close the presence socket.
    Close,
    /// State changed, render.
    Render,
}
