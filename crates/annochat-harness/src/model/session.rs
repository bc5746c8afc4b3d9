//! Model chat session.
//!
//! Tracks what the user should see, with none of the connection plumbing:
//! one flag says whether a chat socket is up, a counter holds pending
//! token failures, and a slot holds the next handshake rejection.

use annochat_app::{Sender, SessionSnapshot};

use super::operation::{CONNECTION_LOST, Operation};
use crate::{REJECTED_REASON, SmallText};

const IDLE: &str = "Press \"Find\" to start chatting";
const SEARCHING: &str = "Searching for a match...";
const MATCHED: &str = "Matched! Say hello to your stranger.";
const PEER_LEFT: &str = "Stranger disconnected. Press \"Find\" to start again.";
const AUTH_ERROR: &str = "Error: Could not get auth token";

/// Message in the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelMessage {
    /// Whether the stranger wrote it.
    pub from_stranger: bool,
    /// Message text.
    pub text: String,
}

/// User-visible state compared between model and real system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservableState {
    /// Status line.
    pub status_text: String,
    /// Message log.
    pub messages: Vec<ModelMessage>,
    /// Current room id.
    pub room: Option<String>,
    /// Whether the chat is live.
    pub connected: bool,
    /// Whether the stranger is shown typing.
    pub peer_typing: bool,
    /// Input line.
    pub draft: String,
}

impl ObservableState {
    /// Observable part of a real session snapshot.
    pub fn from_snapshot(snapshot: &SessionSnapshot) -> Self {
        Self {
            status_text: snapshot.status_text.clone(),
            messages: snapshot
                .messages
                .iter()
                .map(|m| ModelMessage {
                    from_stranger: m.sender == Sender::Stranger,
                    text: m.text.clone(),
                })
                .collect(),
            room: snapshot.room.as_ref().map(|room| room.as_str().to_owned()),
            connected: snapshot.connected,
            peer_typing: snapshot.peer_typing,
            draft: snapshot.draft.clone(),
        }
    }
}

/// Model session.
#[derive(Debug, Clone)]
pub struct ModelSession {
    status_text: String,
    messages: Vec<ModelMessage>,
    room: Option<String>,
    connected: bool,
    peer_typing: bool,
    draft: String,
    socket_open: bool,
    token_failures: u32,
    rejection: Option<Option<String>>,
}

impl ModelSession {
    /// Session right after startup: socket open, waiting for a match.
    pub fn started() -> Self {
        Self {
            status_text: IDLE.into(),
            messages: Vec::new(),
            room: None,
            connected: false,
            peer_typing: false,
            draft: String::new(),
            socket_open: true,
            token_failures: 0,
            rejection: None,
        }
    }

    /// Apply an operation.
    pub fn apply(&mut self, op: &Operation) {
        match op {
            Operation::TypeText { text } => self.draft.push_str(&text.to_text()),
            Operation::Backspace => {
                self.draft.pop();
            },
            Operation::Send => {
                if self.socket_open
                    && self.connected
                    && self.room.is_some()
                    && !self.draft.trim().is_empty()
                {
                    let text = std::mem::take(&mut self.draft);
                    self.messages.push(ModelMessage { from_stranger: false, text });
                    self.peer_typing = false;
                }
            },
            Operation::FindNew => {
                self.messages.clear();
                self.room = None;
                self.connected = false;
                self.peer_typing = false;
                if self.token_failures > 0 {
                    self.token_failures -= 1;
                    self.socket_open = false;
                    self.status_text = AUTH_ERROR.into();
                } else if let Some(message) = self.rejection.take() {
                    self.fail(message.as_deref().unwrap_or(REJECTED_REASON));
                } else {
                    self.socket_open = true;
                    self.status_text = SEARCHING.into();
                }
            },
            Operation::Matched { room } if self.socket_open => {
                self.room = Some(format!("room-{room}"));
                self.connected = true;
                self.status_text = MATCHED.into();
            },
            Operation::StrangerMessage { text }
                if self.socket_open && self.connected && self.room.is_some() =>
            {
                self.messages.push(ModelMessage { from_stranger: true, text: text.to_text() });
            },
            Operation::StrangerTyping { is_typing } if self.socket_open && self.connected => {
                self.peer_typing = *is_typing;
            },
            Operation::StrangerLeft if self.socket_open => {
                self.connected = false;
                self.peer_typing = false;
                self.status_text = PEER_LEFT.into();
            },
            Operation::ServerError { message: Some(message) } if self.socket_open => {
                self.fail(&message.to_text());
            },
            Operation::ConnectionLost if self.socket_open => self.fail(CONNECTION_LOST),
            Operation::TokenFailsNext => self.token_failures += 1,
            Operation::HandshakeRejectsNext { message } => {
                self.rejection = Some(message.as_ref().map(SmallText::to_text));
            },
            _ => {},
        }
    }

    /// The user quit: the chat is torn down.
    pub fn quit(&mut self) {
        self.socket_open = false;
        self.connected = false;
        self.peer_typing = false;
    }

    /// Observable state.
    pub fn observable_state(&self) -> ObservableState {
        ObservableState {
            status_text: self.status_text.clone(),
            messages: self.messages.clone(),
            room: self.room.clone(),
            connected: self.connected,
            peer_typing: self.peer_typing,
            draft: self.draft.clone(),
        }
    }

    fn fail(&mut self, message: &str) {
        self.socket_open = false;
        self.connected = false;
        self.peer_typing = false;
        self.status_text = format!("Error: {message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(seed: u8) -> SmallText {
        SmallText { seed, size_class: 2 }
    }

    #[test]
    fn chat_after_match() {
        let mut model = ModelSession::started();
        model.apply(&Operation::Matched { room: 1 });
        model.apply(&Operation::TypeText { text: word(0) });
        model.apply(&Operation::Send);
        model.apply(&Operation::StrangerMessage { text: word(3) });

        let state = model.observable_state();
        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.room.as_deref(), Some("room-1"));
        assert!(state.draft.is_empty());
    }

    #[test]
    fn token_failure_on_find_new() {
        let mut model = ModelSession::started();
        model.apply(&Operation::TokenFailsNext);
        model.apply(&Operation::FindNew);
        model.apply(&Operation::Matched { room: 2 });

        let state = model.observable_state();
        assert_eq!(state.status_text, AUTH_ERROR);
        assert_eq!(state.room, None);
    }

    #[test]
    fn rejected_handshake_reports_server_message() {
        let mut model = ModelSession::started();
        model.apply(&Operation::HandshakeRejectsNext { message: Some(word(4)) });
        model.apply(&Operation::FindNew);
        model.apply(&Operation::Matched { room: 1 });

        let state = model.observable_state();
        assert_eq!(state.status_text, "Error: efg");
        assert_eq!(state.room, None);

        model.apply(&Operation::HandshakeRejectsNext { message: None });
        model.apply(&Operation::FindNew);
        assert_eq!(model.observable_state().status_text, format!("Error: {REJECTED_REASON}"));
    }

    #[test]
    fn error_without_message_is_ignored() {
        let mut model = ModelSession::started();
        model.apply(&Operation::Matched { room: 0 });
        model.apply(&Operation::ServerError { message: None });
        assert!(model.observable_state().connected);
    }
}
