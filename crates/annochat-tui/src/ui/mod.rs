//! UI rendering
//!
//! Rendering functions that convert an [`AppView`] into terminal output using
//! ratatui widgets. All functions are pure (no I/O), taking state and
//! returning widget trees.

mod chat;
mod header;
mod input;
mod status;

use annochat_app::AppView;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout},
};

pub use chat::message_line;
pub use header::header_line;
pub use status::status_style;

/// Render the entire UI.
pub fn render(frame: &mut Frame, view: &AppView) {
    const HEADER_HEIGHT: u16 = 1;
    const STATUS_HEIGHT: u16 = 1;
    const CHAT_AREA_MIN_HEIGHT: u16 = 3;
    const TYPING_HEIGHT: u16 = 1;
    const INPUT_HEIGHT: u16 = 3;
    const HELP_HEIGHT: u16 = 1;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(HEADER_HEIGHT),
            Constraint::Length(STATUS_HEIGHT),
            Constraint::Min(CHAT_AREA_MIN_HEIGHT),
            Constraint::Length(TYPING_HEIGHT),
            Constraint::Length(INPUT_HEIGHT),
            Constraint::Length(HELP_HEIGHT),
        ])
        .split(frame.area());

    let [header_area, status_area, chat_area, typing_area, input_area, help_area] = chunks.as_ref()
    else {
        return;
    };

    header::render(frame, view, *header_area);
    status::render(frame, &view.session, *status_area);
    chat::render(frame, &view.session, *chat_area);
    chat::render_typing(frame, &view.session, *typing_area);
    input::render(frame, &view.session, *input_area);
    status::render_help(frame, *help_area);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use annochat_app::{Message, PresenceState, SessionPhase, SessionSnapshot, SessionStatus};
    use ratatui::{Terminal, backend::TestBackend};

    use super::*;

    fn screen(view: &AppView) -> String {
        let mut terminal = Terminal::new(TestBackend::new(60, 16)).unwrap();
        terminal.draw(|frame| render(frame, view)).unwrap();

        let buffer = terminal.backend().buffer();
        let width = usize::from(buffer.area.width);
        buffer
            .content
            .chunks(width)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn matched_view() -> AppView {
        AppView {
            session: SessionSnapshot {
                phase: SessionPhase::Matched,
                status: SessionStatus::Matched,
                status_text: SessionStatus::Matched.to_string(),
                messages: vec![Message::stranger("hey"), Message::you("hi there")],
                room: Some("r1".into()),
                connected: true,
                peer_typing: false,
                draft: "typing".into(),
            },
            online_users: 42,
            presence: PresenceState::Connected,
        }
    }

    #[test]
    fn matched_screen_shows_conversation() {
        let screen = screen(&matched_view());
        assert!(screen.contains("42 online"));
        assert!(screen.contains("Matched! Say hello to your stranger."));
        assert!(screen.contains("Stranger> hey"));
        assert!(screen.contains("hi there <You"));
        assert!(screen.contains("> typing"));
        assert!(!screen.contains("Stranger is typing"));
    }

    #[test]
    fn peer_typing_indicator() {
        let mut view = matched_view();
        view.session.peer_typing = true;
        assert!(screen(&view).contains("Stranger is typing…"));
    }

    #[test]
    fn input_is_disabled_while_disconnected() {
        let view = AppView::default();
        let screen = screen(&view);
        assert!(screen.contains("Press \"Find\" to start chatting"));
        assert!(screen.contains("Waiting for a stranger"));
        assert!(screen.contains("0 online"));
    }

    #[test]
    fn tiny_terminal_does_not_panic() {
        let mut terminal = Terminal::new(TestBackend::new(8, 3)).unwrap();
        terminal.draw(|frame| render(frame, &matched_view())).unwrap();
    }
}
