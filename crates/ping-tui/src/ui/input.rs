//! Composer box
//!
//! Shows the draft behind a `> ` prompt. Long drafts scroll horizontally so
//! the cursor column stays inside the box.

use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use crate::InputState;

const PROMPT: &str = "> ";
const PROMPT_WIDTH: u16 = 2;
const HINT: &str = "Type a message, /dm <name> or /general";

/// Render the composer and place the terminal cursor.
pub fn render(frame: &mut Frame, input: &InputState, area: Rect) {
    let inner = Block::default().borders(Borders::ALL).inner(area);
    let columns = usize::from(inner.width.saturating_sub(PROMPT_WIDTH).max(1));

    // First visible char, chosen so the cursor lands on the last column at most.
    let skip = input.cursor().saturating_sub(columns - 1);
    let visible: String = input.buffer().chars().skip(skip).take(columns).collect();

    let draft = if input.buffer().is_empty() {
        Span::styled(HINT, Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC))
    } else {
        Span::styled(visible, Style::default().fg(Color::White))
    };
    let line = Line::from(vec![Span::styled(PROMPT, Style::default().fg(Color::Cyan)), draft]);
    frame.render_widget(Paragraph::new(line).block(Block::default().borders(Borders::ALL)), area);

    if inner.width == 0 || inner.height == 0 {
        return;
    }
    let column = u16::try_from(input.cursor() - skip).unwrap_or(u16::MAX);
    let x = inner.x.saturating_add(PROMPT_WIDTH).saturating_add(column);
    let last_x = inner.right().saturating_sub(1);
    frame.set_cursor_position((x.min(last_x), inner.y));
}
