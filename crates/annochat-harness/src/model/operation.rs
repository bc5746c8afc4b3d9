//! Operations for model-based testing.
//!
//! Operations cover everything that can happen to a running client: the user
//! typing and sending, the server pairing and relaying, the socket failing,
//! and time passing. They are generated randomly by proptest or the fuzzer.

use std::time::Duration;

use annochat_app::{AppEvent, KeyInput};
use annochat_proto::ServerEvent;
use arbitrary::Arbitrary;
use serde_json::json;

use crate::Scripted;

/// Close reason used for [`Operation::ConnectionLost`].
pub const CONNECTION_LOST: &str = "connection lost";

/// Operations that can be applied to the system.
#[derive(Debug, Clone, Arbitrary)]
pub enum Operation {
    /// User types text, one key per character.
    TypeText {
        /// Typed text.
        text: SmallText,
    },

    /// User deletes the last character.
    Backspace,

    /// User presses Enter.
    Send,

    /// User asks for a new stranger.
    FindNew,

    /// Server pairs us into a room.
    Matched {
        /// Room number (mapped to `room-N`).
        room: u8,
    },

    /// Stranger sends a message.
    StrangerMessage {
        /// Message content.
        text: SmallText,
    },

    /// Stranger starts or stops typing.
    StrangerTyping {
        /// Whether the stranger is typing.
        is_typing: bool,
    },

    /// Stranger leaves.
    StrangerLeft,

    /// Server reports an error.
    ServerError {
        /// Error message, if the payload carried one.
        message: Option<SmallText>,
    },

    /// Chat socket drops.
    ConnectionLost,

    /// A message arrives on a connection already torn down.
    StaleMessage {
        /// Message content.
        text: SmallText,
    },

    /// The next token fetch fails.
    TokenFailsNext,

    /// The server refuses the next chat handshake.
    HandshakeRejectsNext {
        /// Rejection message, if the payload carried one.
        message: Option<SmallText>,
    },

    /// Advance simulation time.
    AdvanceTime {
        /// Milliseconds to advance.
        millis: u16,
    },
}

impl Operation {
    /// Simulation script steps that perform this operation.
    pub fn to_script(&self) -> Vec<Scripted> {
        let key = |key| Scripted::App(AppEvent::Key(key));
        match self {
            Self::TypeText { text } => {
                text.to_text().chars().map(|c| key(KeyInput::Char(c))).collect()
            },
            Self::Backspace => vec![key(KeyInput::Backspace)],
            Self::Send => vec![key(KeyInput::Enter)],
            Self::FindNew => vec![key(KeyInput::FindNew)],
            Self::Matched { room } => {
                vec![Scripted::Server(ServerEvent::Matched { room_id: format!("room-{room}").into() })]
            },
            Self::StrangerMessage { text } => {
                vec![Scripted::Server(ServerEvent::ChatMessage { msg: text.to_text() })]
            },
            Self::StrangerTyping { is_typing } => {
                vec![Scripted::Server(ServerEvent::Typing { is_typing: *is_typing })]
            },
            Self::StrangerLeft => vec![Scripted::Server(ServerEvent::UserDisconnected)],
            Self::ServerError { message } => vec![Scripted::Server(ServerEvent::Error {
                message: message.as_ref().map(SmallText::to_text),
            })],
            Self::ConnectionLost => vec![Scripted::ChatClosed(CONNECTION_LOST.into())],
            Self::StaleMessage { text } => {
                vec![Scripted::StaleServer(ServerEvent::ChatMessage { msg: text.to_text() })]
            },
            Self::TokenFailsNext => vec![Scripted::FailNextToken],
            Self::HandshakeRejectsNext { message } => {
                let data = message.as_ref().map(|text| json!({ "message": text.to_text() }));
                vec![Scripted::RejectNextChat(data)]
            },
            Self::AdvanceTime { millis } => {
                vec![Scripted::Advance(Duration::from_millis(u64::from(*millis)))]
            },
        }
    }
}

/// Small text content for testing.
///
/// Compact representation that still covers empty and whitespace-only
/// input. The content is deterministic from the seed.
#[derive(Debug, Clone, Arbitrary)]
pub struct SmallText {
    /// Text seed.
    pub seed: u8,
    /// Shape hint (0-3 maps to empty/blank/word/sentence).
    pub size_class: u8,
}

impl SmallText {
    /// Expand to the actual text.
    pub fn to_text(&self) -> String {
        match self.size_class % 4 {
            0 => String::new(),
            1 => "  ".into(),
            2 => word(self.seed, 3),
            _ => format!("{} {}", word(self.seed, 4), word(self.seed.wrapping_add(7), 5)),
        }
    }
}

fn word(seed: u8, len: u8) -> String {
    (0..len).map(|i| char::from(b'a' + seed.wrapping_add(i) % 26)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_text_shapes() {
        let text = |size_class| SmallText { seed: 0, size_class }.to_text();
        assert_eq!(text(0), "");
        assert!(text(1).trim().is_empty());
        assert_eq!(text(2), "abc");
        assert_eq!(text(3), "abcd hijkl");
    }

    #[test]
    fn typing_is_one_key_per_character() {
        let op = Operation::TypeText { text: SmallText { seed: 1, size_class: 2 } };
        assert_eq!(op.to_script().len(), 3);
    }
}
