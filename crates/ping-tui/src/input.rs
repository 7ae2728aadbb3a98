//! Input state and key handling for the TUI.
//!
//! This module owns all text input state (buffer, cursor) and handles
//! character-level key events. Command parsing happens here on Enter.

use ping_client::Command;

use crate::{
    App, AppAction,
    commands::{self, InputCommand},
};

/// Key input events from the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    /// Character input.
    Char(char),
    /// Enter/Return key.
    Enter,
    /// Backspace key.
    Backspace,
    /// Delete key.
    Delete,
    /// Tab key (open the selected conversation).
    Tab,
    /// Escape key (quit).
    Esc,
    /// Left arrow.
    Left,
    /// Right arrow.
    Right,
    /// Up arrow (sidebar selection).
    Up,
    /// Down arrow (sidebar selection).
    Down,
    /// Home key.
    Home,
    /// End key.
    End,
}

/// Input state for the TUI.
///
/// Manages the text input buffer and cursor position.
/// Handles all character-level key events.
#[derive(Debug, Default)]
pub struct InputState {
    /// Text buffer for user input.
    buffer: String,
    /// Cursor position, in characters.
    cursor: usize,
}

impl InputState {
    /// Create a new empty input state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current text in the input buffer.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Current cursor position.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Handle a key input event.
    ///
    /// Edits that change the buffer also notify the runtime that the user
    /// is typing; the runtime debounces the matching stop.
    pub fn handle_key(&mut self, key: KeyInput, app: &mut App) -> Vec<AppAction> {
        match key {
            KeyInput::Char(c) => {
                let at = self.byte_offset(self.cursor);
                self.buffer.insert(at, c);
                self.cursor = self.cursor.saturating_add(1);
                Self::edited()
            },
            KeyInput::Backspace => {
                if self.cursor == 0 {
                    return vec![];
                }
                self.cursor = self.cursor.saturating_sub(1);
                let at = self.byte_offset(self.cursor);
                self.buffer.remove(at);
                Self::edited()
            },
            KeyInput::Delete => {
                if self.cursor >= self.len() {
                    return vec![];
                }
                let at = self.byte_offset(self.cursor);
                self.buffer.remove(at);
                Self::edited()
            },
            KeyInput::Left => {
                self.cursor = self.cursor.saturating_sub(1);
                vec![AppAction::Render]
            },
            KeyInput::Right => {
                if self.cursor < self.len() {
                    self.cursor = self.cursor.saturating_add(1);
                }
                vec![AppAction::Render]
            },
            KeyInput::Home => {
                self.cursor = 0;
                vec![AppAction::Render]
            },
            KeyInput::End => {
                self.cursor = self.len();
                vec![AppAction::Render]
            },
            KeyInput::Up => {
                app.select_prev();
                vec![AppAction::Render]
            },
            KeyInput::Down => {
                app.select_next();
                vec![AppAction::Render]
            },
            KeyInput::Tab => match app.selected_entry() {
                Some(entry) => {
                    app.clear_notice();
                    vec![AppAction::Command(entry.open()), AppAction::Render]
                },
                None => vec![],
            },
            KeyInput::Enter => self.handle_enter(app),
            KeyInput::Esc => vec![AppAction::Quit],
        }
    }

    /// Handle Enter key - parse command and map it to runtime commands.
    fn handle_enter(&mut self, app: &mut App) -> Vec<AppAction> {
        let text = std::mem::take(&mut self.buffer);
        self.cursor = 0;

        if text.trim().is_empty() {
            return vec![AppAction::Render];
        }

        let command = match commands::parse(&text) {
            InputCommand::Message(text) => Command::SendMessage(text),
            InputCommand::General => Command::SelectGeneralChat,
            InputCommand::Dm { query } => match app.state().find_peer(&query) {
                Some(peer) => Command::StartPrivateChat(peer.clone()),
                None => {
                    app.set_notice(format!("No online user matches {query}"));
                    return vec![AppAction::Render];
                },
            },
            InputCommand::Quit => return vec![AppAction::Quit],
            InputCommand::Unknown { input } => {
                app.set_notice(format!("Unknown command: {input}"));
                return vec![AppAction::Render];
            },
            InputCommand::InvalidArgs { command, error } => {
                app.set_notice(format!("/{command}: {error}"));
                return vec![AppAction::Render];
            },
        };

        app.clear_notice();
        vec![AppAction::Command(command), AppAction::Render]
    }

    fn edited() -> Vec<AppAction> {
        vec![AppAction::Command(Command::NotifyTyping), AppAction::Render]
    }

    fn len(&self) -> usize {
        self.buffer.chars().count()
    }

    fn byte_offset(&self, chars: usize) -> usize {
        self.buffer.char_indices().nth(chars).map_or(self.buffer.len(), |(i, _)| i)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use ping_client::{Session, SessionConfig, SessionEvent};
    use ping_proto::{Identity, Inbound, PresenceEntry};

    use super::*;

    fn app() -> App {
        let mut session: Session<Instant> =
            Session::new(Identity::new("u1", "Alice").unwrap(), SessionConfig::default());
        session.handle(SessionEvent::Connecting);
        session.handle(SessionEvent::Connected { sid: "s1".into() });
        session.handle(SessionEvent::Received(Inbound::OnlineUsers(vec![
            PresenceEntry::new("u1", "Alice"),
            PresenceEntry::new("u2", "Bob"),
        ])));
        App::new(session.state().clone())
    }

    fn type_text(input: &mut InputState, app: &mut App, text: &str) {
        for c in text.chars() {
            input.handle_key(KeyInput::Char(c), app);
        }
    }

    fn commands(actions: &[AppAction]) -> Vec<Command> {
        actions
            .iter()
            .filter_map(|a| match a {
                AppAction::Command(c) => Some(c.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn char_input_adds_to_buffer_and_notifies_typing() {
        let mut input = InputState::new();
        let mut app = app();

        let actions = input.handle_key(KeyInput::Char('h'), &mut app);
        input.handle_key(KeyInput::Char('i'), &mut app);

        assert_eq!(input.buffer(), "hi");
        assert_eq!(input.cursor(), 2);
        assert_eq!(commands(&actions), [Command::NotifyTyping]);
    }

    #[test]
    fn backspace_removes_char() {
        let mut input = InputState::new();
        let mut app = app();

        type_text(&mut input, &mut app, "ab");
        input.handle_key(KeyInput::Backspace, &mut app);

        assert_eq!(input.buffer(), "a");
        assert_eq!(input.cursor(), 1);
    }

    #[test]
    fn backspace_on_empty_buffer_is_not_typing() {
        let mut input = InputState::new();
        let mut app = app();

        assert!(input.handle_key(KeyInput::Backspace, &mut app).is_empty());
    }

    #[test]
    fn multibyte_editing() {
        let mut input = InputState::new();
        let mut app = app();

        type_text(&mut input, &mut app, "héllo");
        input.handle_key(KeyInput::Home, &mut app);
        input.handle_key(KeyInput::Right, &mut app);
        input.handle_key(KeyInput::Delete, &mut app);

        assert_eq!(input.buffer(), "hllo");
        assert_eq!(input.cursor(), 1);
    }

    #[test]
    fn enter_sends_and_clears_buffer() {
        let mut input = InputState::new();
        let mut app = app();

        type_text(&mut input, &mut app, "test");
        let actions = input.handle_key(KeyInput::Enter, &mut app);

        assert!(input.buffer().is_empty());
        assert_eq!(input.cursor(), 0);
        assert_eq!(commands(&actions), [Command::SendMessage("test".into())]);
    }

    #[test]
    fn enter_on_blank_line_sends_nothing() {
        let mut input = InputState::new();
        let mut app = app();

        type_text(&mut input, &mut app, "   ");
        let actions = input.handle_key(KeyInput::Enter, &mut app);
        assert!(commands(&actions).is_empty());
    }

    #[test]
    fn cursor_movement() {
        let mut input = InputState::new();
        let mut app = app();

        type_text(&mut input, &mut app, "abc");

        input.handle_key(KeyInput::Home, &mut app);
        assert_eq!(input.cursor(), 0);

        input.handle_key(KeyInput::End, &mut app);
        assert_eq!(input.cursor(), 3);

        input.handle_key(KeyInput::Left, &mut app);
        assert_eq!(input.cursor(), 2);

        input.handle_key(KeyInput::Right, &mut app);
        assert_eq!(input.cursor(), 3);
    }

    #[test]
    fn dm_by_name_opens_private_chat() {
        let mut input = InputState::new();
        let mut app = app();

        type_text(&mut input, &mut app, "/dm bob");
        let actions = input.handle_key(KeyInput::Enter, &mut app);

        assert_eq!(commands(&actions), [Command::StartPrivateChat(PresenceEntry::new("u2", "Bob"))]);
    }

    #[test]
    fn dm_to_offline_user_sets_notice() {
        let mut input = InputState::new();
        let mut app = app();

        type_text(&mut input, &mut app, "/dm zoe");
        let actions = input.handle_key(KeyInput::Enter, &mut app);

        assert!(commands(&actions).is_empty());
        assert_eq!(app.notice(), Some("No online user matches zoe"));
    }

    #[test]
    fn arrows_and_tab_open_selected_conversation() {
        let mut input = InputState::new();
        let mut app = app();

        input.handle_key(KeyInput::Down, &mut app);
        let actions = input.handle_key(KeyInput::Tab, &mut app);
        assert_eq!(commands(&actions), [Command::StartPrivateChat(PresenceEntry::new("u2", "Bob"))]);

        input.handle_key(KeyInput::Up, &mut app);
        let actions = input.handle_key(KeyInput::Tab, &mut app);
        assert_eq!(commands(&actions), [Command::SelectGeneralChat]);
    }

    #[test]
    fn quit_via_command_or_escape() {
        let mut input = InputState::new();
        let mut app = app();

        assert_eq!(input.handle_key(KeyInput::Esc, &mut app), [AppAction::Quit]);

        type_text(&mut input, &mut app, "/quit");
        assert_eq!(input.handle_key(KeyInput::Enter, &mut app), [AppAction::Quit]);
    }

    #[test]
    fn unknown_command_is_not_sent() {
        let mut input = InputState::new();
        let mut app = app();

        type_text(&mut input, &mut app, "/nick x");
        let actions = input.handle_key(KeyInput::Enter, &mut app);

        assert!(commands(&actions).is_empty());
        assert_eq!(app.notice(), Some("Unknown command: /nick x"));
    }
}
