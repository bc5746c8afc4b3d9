//! Observable application state types.
//!
//! These are the "View Model" of the client: owned, read-only copies of what
//! the session and presence state machines know, handed to presenters and
//! published to subscribers after every change.

use std::fmt;

use annochat_proto::RoomId;
use serde::Serialize;

/// Lifecycle phase of the chat session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum SessionPhase {
    /// Fetching a token or opening the socket.
    #[default]
    Connecting,
    /// Socket open, waiting for the server to pair us.
    WaitingForMatch,
    /// Paired with a stranger.
    Matched,
    /// Stranger left. History stays visible until the next match request.
    Ended,
    /// Token fetch failed or the server reported an error.
    Errored,
}

/// Display status.
///
/// Exactly one is active at a time. Only the session changes it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub enum SessionStatus {
    /// Initial status.
    #[default]
    Idle,
    /// New match requested.
    Searching,
    /// Paired.
    Matched,
    /// Stranger left.
    PeerDisconnected,
    /// Token fetch failed.
    AuthError,
    /// Server error or lost connection, with its message.
    ConnectionError(String),
}

impl SessionStatus {
    /// Whether this is the matched status (presenters highlight it).
    pub fn is_matched(&self) -> bool {
        matches!(self, Self::Matched)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("Press \"Find\" to start chatting"),
            Self::Searching => f.write_str("Searching for a match..."),
            Self::Matched => f.write_str("Matched! Say hello to your stranger."),
            Self::PeerDisconnected => {
                f.write_str("Stranger disconnected. Press \"Find\" to start again.")
            },
            Self::AuthError => f.write_str("Error: Could not get auth token"),
            Self::ConnectionError(message) => write!(f, "Error: {message}"),
        }
    }
}

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Sender {
    /// Local user.
    You,
    /// Matched peer.
    Stranger,
}

/// A message in the session log. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    /// Message text, verbatim.
    pub text: String,
    /// Who wrote it.
    pub sender: Sender,
}

impl Message {
    /// Message written locally.
    pub fn you(text: impl Into<String>) -> Self {
        Self { text: text.into(), sender: Sender::You }
    }

    /// Message received from the stranger.
    pub fn stranger(text: impl Into<String>) -> Self {
        Self { text: text.into(), sender: Sender::Stranger }
    }
}

/// Read-only view of a [`crate::ChatSession`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    /// Lifecycle phase.
    pub phase: SessionPhase,
    /// Display status.
    pub status: SessionStatus,
    /// Display text for `status`.
    pub status_text: String,
    /// Message log, oldest first.
    pub messages: Vec<Message>,
    /// Current room. `None` before matching and after a new match request.
    pub room: Option<RoomId>,
    /// Matched and the connection is live.
    pub connected: bool,
    /// Stranger is composing.
    pub peer_typing: bool,
    /// Local input text.
    pub draft: String,
}

impl Default for SessionSnapshot {
    /// A session that has not started.
    fn default() -> Self {
        let status = SessionStatus::default();
        Self {
            phase: SessionPhase::default(),
            status_text: status.to_string(),
            status,
            messages: Vec::new(),
            room: None,
            connected: false,
            peer_typing: false,
            draft: String::new(),
        }
    }
}

/// Presence connection state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum PresenceState {
    /// Not connected.
    #[default]
    Disconnected,
    /// Socket opening.
    Connecting,
    /// Receiving counts.
    Connected,
}

/// Everything a presenter renders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AppView {
    /// Chat session.
    pub session: SessionSnapshot,
    /// Last online-user count from the presence feed.
    pub online_users: u64,
    /// Presence connection state.
    pub presence: PresenceState,
}
