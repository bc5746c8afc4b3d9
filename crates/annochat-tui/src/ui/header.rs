//! Header bar
//!
//! App name and the online-user count from the presence feed.

use annochat_app::{AppView, PresenceState};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};

/// Header text for `view`.
pub fn header_line(view: &AppView) -> Line<'static> {
    let count_style = match view.presence {
        PresenceState::Connected => Style::default().fg(Color::Green),
        PresenceState::Connecting => Style::default().fg(Color::Yellow),
        PresenceState::Disconnected => Style::default().fg(Color::Gray),
    };

    Line::from(vec![
        Span::styled(" AnnoChat", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" │ "),
        Span::styled(format!("{} online", view.online_users), count_style),
    ])
}

/// Render the header bar.
pub fn render(frame: &mut Frame, view: &AppView, area: Rect) {
    let paragraph = Paragraph::new(header_line(view))
        .style(Style::default().bg(Color::DarkGray).fg(Color::White));
    frame.render_widget(paragraph, area);
}
