//! Input line
//!
//! Shows the draft with a cursor while matched; dimmed and cursorless
//! otherwise.

use annochat_app::SessionSnapshot;
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Style},
    widgets::{Block, Borders, Paragraph},
};

const PROMPT_WIDTH: u16 = 2; // "> "
const INPUT_LINE_OFFSET_Y: u16 = 1; // inside top border
const BORDER_WIDTH: u16 = 1;

/// Render the input line.
pub fn render(frame: &mut Frame, session: &SessionSnapshot, area: Rect) {
    if !session.connected {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Waiting for a stranger ")
            .border_style(Style::default().fg(Color::DarkGray));
        let paragraph = Paragraph::new(format!("> {}", session.draft))
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    let block = Block::default().borders(Borders::ALL).title(" Message ");
    let paragraph = Paragraph::new(format!("> {}", session.draft))
        .style(Style::default().fg(Color::White))
        .block(block);
    frame.render_widget(paragraph, area);

    let draft_width = u16::try_from(session.draft.chars().count()).unwrap_or(u16::MAX);
    let cursor_x = area
        .x
        .saturating_add(BORDER_WIDTH)
        .saturating_add(PROMPT_WIDTH)
        .saturating_add(draft_width);
    let max_x = area.x.saturating_add(area.width).saturating_sub(BORDER_WIDTH + 1);
    let cursor_y = area.y.saturating_add(INPUT_LINE_OFFSET_Y);

    frame.set_cursor_position((cursor_x.min(max_x), cursor_y));
}
