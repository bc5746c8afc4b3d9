//! Terminal-agnostic keyboard input.

use crate::SessionEvent;

/// Keyboard input abstraction.
///
/// Decouples application logic from terminal libraries, so simulations can
/// type into the session the same way a user does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    /// Printable character.
    Char(char),
    /// Enter/Return key (send).
    Enter,
    /// Backspace key (delete last character).
    Backspace,
    /// New match request (Ctrl-N / F2).
    FindNew,
    /// Escape key (quit).
    Esc,
}

impl KeyInput {
    /// Session event this key produces, given the current draft.
    ///
    /// `None` for keys that do not touch the session.
    pub fn to_session_event<I>(self, draft: &str) -> Option<SessionEvent<I>> {
        match self {
            Self::Char(c) => {
                let mut text = draft.to_owned();
                text.push(c);
                Some(SessionEvent::InputChanged { text })
            },
            Self::Backspace => {
                let mut text = draft.to_owned();
                text.pop()?;
                Some(SessionEvent::InputChanged { text })
            },
            Self::Enter => Some(SessionEvent::SendMessage { text: draft.to_owned() }),
            Self::FindNew => Some(SessionEvent::FindNew),
            Self::Esc => None,
        }
    }
}
