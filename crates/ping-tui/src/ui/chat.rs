//! Chat area
//!
//! Displays messages in the active room and the typing line below it.

use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
};

use crate::App;

const BORDER_SIZE: u16 = 2;

/// Render the chat area.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let state = app.state();
    let block = Block::default().borders(Borders::ALL).title(format!(" {} ", state.room_title()));

    let items: Vec<ListItem> = if state.messages().is_empty() {
        vec![ListItem::new(Line::from(Span::styled(
            "No messages yet",
            Style::default().fg(Color::DarkGray),
        )))]
    } else {
        state
            .messages()
            .iter()
            .map(|msg| {
                let color = if state.is_own(msg) { Color::Cyan } else { Color::Green };
                let name = if msg.sender_name.is_empty() { &msg.sender_id } else { &msg.sender_name };

                let mut spans = Vec::with_capacity(4);
                if let Some(at) = msg.created_at {
                    spans.push(Span::styled(
                        at.format("%H:%M ").to_string(),
                        Style::default().fg(Color::DarkGray),
                    ));
                }
                spans.push(Span::styled(
                    format!("<{name}>"),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ));
                spans.push(Span::raw(" "));
                spans.push(Span::raw(msg.text.clone()));
                ListItem::new(Line::from(spans))
            })
            .collect()
    };

    let visible_height = area.height.saturating_sub(BORDER_SIZE) as usize;
    let skip = items.len().saturating_sub(visible_height);
    let visible_items: Vec<_> = items.into_iter().skip(skip).collect();

    frame.render_widget(List::new(visible_items).block(block), area);
}

/// Render the typing line.
pub fn render_typing(frame: &mut Frame, app: &App, area: Rect) {
    let Some(name) = app.state().typing() else {
        return;
    };

    let line = Span::styled(
        format!(" {name} is typing..."),
        Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
    );
    frame.render_widget(Paragraph::new(line), area);
}
