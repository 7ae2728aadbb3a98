//! Status bar
//!
//! Displays connection status, identity, room information and the latest
//! notice.

use ping_client::ConnectionStatus;
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};

use crate::App;

/// Render the status bar.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let state = app.state();
    let connection_status = match state.status() {
        ConnectionStatus::Offline => Span::styled("Offline", Style::default().fg(Color::Red)),
        ConnectionStatus::Connecting => {
            Span::styled("Connecting...", Style::default().fg(Color::Yellow))
        },
        ConnectionStatus::Reconnecting => {
            Span::styled("Reconnecting...", Style::default().fg(Color::Yellow))
        },
        ConnectionStatus::Online { sid } => Span::styled(
            format!("Online ({sid})"),
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ),
    };

    let room_info = format!(
        " | {} | Room: {} | Messages: {}",
        state.owner(),
        state.room_title(),
        state.messages().len()
    );

    let mut spans =
        vec![Span::raw(" "), connection_status, Span::styled(room_info, Style::default().fg(Color::Gray))];
    if let Some(notice) = app.notice() {
        spans.push(Span::styled(format!(" | {notice}"), Style::default().fg(Color::Yellow)));
    }

    let paragraph =
        Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray).fg(Color::White));

    frame.render_widget(paragraph, area);
}
