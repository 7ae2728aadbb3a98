//! Users sidebar
//!
//! "General" plus every online peer. The selected row is marked, the open
//! conversation is highlighted.

use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
};

use crate::App;

const SELECTED_PREFIX: &str = "> ";
const UNSELECTED_PREFIX: &str = "  ";

/// Render the users sidebar.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .sidebar()
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let prefix = if index == app.selected() { SELECTED_PREFIX } else { UNSELECTED_PREFIX };
            let style = if app.is_active(entry) {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };

            ListItem::new(Line::from(vec![
                Span::raw(prefix),
                Span::styled(entry.label().to_string(), style),
            ]))
        })
        .collect();

    let title = format!(" Online ({}) ", app.state().presence().len());
    let list = List::new(items).block(Block::default().borders(Borders::ALL).title(title));

    frame.render_widget(list, area);
}
