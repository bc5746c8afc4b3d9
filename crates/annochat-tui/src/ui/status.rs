//! Status and help lines

use annochat_app::{SessionSnapshot, SessionStatus};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};

/// Key bindings shown at the bottom.
const HELP: &str = " Enter send · Ctrl-N / F2 new stranger · Esc quit";

/// Style of the status line. Green when matched, red on errors.
pub fn status_style(status: &SessionStatus) -> Style {
    match status {
        SessionStatus::Matched => Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        SessionStatus::AuthError | SessionStatus::ConnectionError(_) => {
            Style::default().fg(Color::Red)
        },
        SessionStatus::Searching => Style::default().fg(Color::Yellow),
        SessionStatus::Idle | SessionStatus::PeerDisconnected => Style::default().fg(Color::Gray),
    }
}

/// Render the status line.
pub fn render(frame: &mut Frame, session: &SessionSnapshot, area: Rect) {
    let line = Line::from(vec![
        Span::raw(" "),
        Span::styled(session.status_text.as_str(), status_style(&session.status)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

/// Render the key help line.
pub fn render_help(frame: &mut Frame, area: Rect) {
    let paragraph = Paragraph::new(HELP).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, area);
}
