//! Application input events.
//!
//! Events originate from three sources:
//! - User intents (keys, find new, send) and timer ticks.
//! - The chat connection, tagged with the [`ConnectionId`] it was opened
//!   under.
//! - The presence connection.

use std::fmt;

use annochat_proto::ServerEvent;

use crate::KeyInput;

/// Generation-tagged handle for one chat connection attempt.
///
/// The session owns a single slot. Every restart moves to a new generation,
/// and events carrying an older id are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Id for the given generation.
    pub const fn new(generation: u64) -> Self {
        Self(generation)
    }

    /// Generation number.
    pub const fn generation(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

/// Events processed by the [`crate::ChatSession`] state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent<I> {
    /// First activation.
    Start,

    /// User asked for a new match.
    FindNew,

    /// User submitted the input.
    SendMessage {
        /// Submitted text, possibly blank.
        text: String,
    },

    /// Input text changed.
    InputChanged {
        /// Full input text after the change.
        text: String,
    },

    /// Token provider returned a credential.
    TokenFetched {
        /// Attempt the token was fetched for.
        conn: ConnectionId,
        /// Short-lived credential.
        token: String,
    },

    /// Token provider failed.
    TokenFailed {
        /// Attempt the token was fetched for.
        conn: ConnectionId,
        /// Failure description (logged, not displayed).
        reason: String,
    },

    /// Chat socket open and the namespace accepted the token.
    TransportOpened {
        /// Connection that opened.
        conn: ConnectionId,
    },

    /// Chat socket lost without a server error event.
    TransportClosed {
        /// Connection that closed.
        conn: ConnectionId,
        /// Close reason.
        reason: String,
    },

    /// Event from the matchmaking server.
    Server {
        /// Connection that delivered it.
        conn: ConnectionId,
        /// Decoded event.
        event: ServerEvent,
    },

    /// Timer tick. Delivered at or after [`crate::ChatSession::next_deadline`].
    Tick {
        /// Current time.
        now: I,
    },
}

/// Events on the presence connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceEvent {
    /// Presence namespace connected.
    Opened,
    /// New online-user count.
    OnlineUsers(u64),
    /// Presence socket lost.
    Closed {
        /// Close reason.
        reason: String,
    },
}

/// Events the [`crate::Runtime`] receives from its driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent<I> {
    /// Keyboard input.
    Key(KeyInput),

    /// Chat session event.
    Session(SessionEvent<I>),

    /// Presence event.
    Presence(PresenceEvent),

    /// Periodic or deadline tick.
    Tick,

    /// Terminal resize (columns, rows).
    Resize(u16, u16),

    /// Shut down.
    Quit,
}
