//! Chat area
//!
//! Displays the message log and the typing indicator.

use annochat_app::{Message, Sender, SessionSnapshot};
use ratatui::{
    Frame,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
};

const BORDER_SIZE: u16 = 2;

/// One message. Own messages are right-aligned, the stranger's left.
pub fn message_line(message: &Message) -> Line<'_> {
    match message.sender {
        Sender::You => Line::from(vec![
            Span::raw(message.text.as_str()),
            Span::raw(" "),
            Span::styled("<You", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        ])
        .alignment(Alignment::Right),
        Sender::Stranger => Line::from(vec![
            Span::styled(
                "Stranger>",
                Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
            ),
            Span::raw(" "),
            Span::raw(message.text.as_str()),
        ]),
    }
}

/// Render the message log.
pub fn render(frame: &mut Frame, session: &SessionSnapshot, area: Rect) {
    let title = if session.room.is_some() { " Stranger " } else { " Chat " };
    let block = Block::default().borders(Borders::ALL).title(title);

    let items: Vec<ListItem> = if session.messages.is_empty() {
        vec![ListItem::new(Line::from(Span::styled(
            "No messages yet",
            Style::default().fg(Color::DarkGray),
        )))]
    } else {
        session.messages.iter().map(|m| ListItem::new(message_line(m))).collect()
    };

    let visible_height = usize::from(area.height.saturating_sub(BORDER_SIZE));
    let skip = items.len().saturating_sub(visible_height);
    let visible_items: Vec<_> = items.into_iter().skip(skip).collect();

    frame.render_widget(List::new(visible_items).block(block), area);
}

/// Render the "stranger is typing" indicator (blank when not typing).
pub fn render_typing(frame: &mut Frame, session: &SessionSnapshot, area: Rect) {
    if !session.peer_typing {
        return;
    }
    let indicator = Paragraph::new(" Stranger is typing…")
        .style(Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC));
    frame.render_widget(indicator, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_lines() {
        let log = [Message::stranger("hey"), Message::you("hi"), Message::stranger("how are you")];
        let text: Vec<String> = log.iter().map(|m| message_line(m).to_string()).collect();
        insta::assert_snapshot!(text.join("\n"), @r"
        Stranger> hey
        hi <You
        Stranger> how are you
        ");
    }

    #[test]
    fn own_messages_are_right_aligned() {
        assert_eq!(message_line(&Message::you("x")).alignment, Some(Alignment::Right));
        assert_eq!(message_line(&Message::stranger("x")).alignment, None);
    }
}
