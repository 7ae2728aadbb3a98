//! UI rendering
//!
//! Rendering functions that convert the [`App`] view into terminal output
//! using ratatui widgets. All functions are pure (no I/O).

mod chat;
mod input;
mod status;
mod users;

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
};

use crate::{App, InputState};

/// Render the entire UI.
pub fn render(frame: &mut Frame, app: &App, input: &InputState) {
    const MAIN_AREA_MIN_HEIGHT: u16 = 3;
    const TYPING_HEIGHT: u16 = 1;
    const INPUT_HEIGHT: u16 = 3;
    const STATUS_HEIGHT: u16 = 1;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(MAIN_AREA_MIN_HEIGHT),
            Constraint::Length(TYPING_HEIGHT),
            Constraint::Length(INPUT_HEIGHT),
            Constraint::Length(STATUS_HEIGHT),
        ])
        .split(frame.area());

    let [main_area, typing_area, input_area, status_area] = chunks.as_ref() else {
        return;
    };

    render_main_area(frame, app, *main_area);
    chat::render_typing(frame, app, *typing_area);
    input::render(frame, input, *input_area);
    status::render(frame, app, *status_area);
}

/// Render the main area (users sidebar + chat).
fn render_main_area(frame: &mut Frame, app: &App, area: Rect) {
    const USER_SIDEBAR_WIDTH: u16 = 20;
    const CHAT_AREA_MIN_WIDTH: u16 = 20;

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(USER_SIDEBAR_WIDTH), Constraint::Min(CHAT_AREA_MIN_WIDTH)])
        .split(area);

    let [users_area, chat_area] = chunks.as_ref() else {
        return;
    };

    users::render(frame, app, *users_area);
    chat::render(frame, app, *chat_area);
}
