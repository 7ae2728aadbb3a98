//! Terminal driver for the TUI.
//!
//! Owns the crossterm event stream and the ratatui terminal. Raw mode and
//! the alternate screen are entered on construction and restored on drop.

use std::io::{self, Stdout, stdout};

use crossterm::{
    ExecutableCommand,
    event::{Event, EventStream, KeyCode, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use ratatui::{Terminal, backend::CrosstermBackend};

use crate::{App, InputState, KeyInput, ui};

/// Input from the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalInput {
    /// A key press.
    Key(KeyInput),
    /// The terminal was resized.
    Resize,
}

/// Terminal driver.
pub struct TerminalDriver {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    event_stream: EventStream,
}

impl TerminalDriver {
    /// Take over the terminal.
    pub fn new() -> io::Result<Self> {
        enable_raw_mode()?;
        stdout().execute(EnterAlternateScreen)?;

        let terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
        Ok(Self { terminal, event_stream: EventStream::new() })
    }

    /// Convert crossterm `KeyCode` to `KeyInput`.
    pub fn convert_key(code: KeyCode) -> Option<KeyInput> {
        match code {
            KeyCode::Char(c) => Some(KeyInput::Char(c)),
            KeyCode::Enter => Some(KeyInput::Enter),
            KeyCode::Backspace => Some(KeyInput::Backspace),
            KeyCode::Delete => Some(KeyInput::Delete),
            KeyCode::Tab => Some(KeyInput::Tab),
            KeyCode::Esc => Some(KeyInput::Esc),
            KeyCode::Left => Some(KeyInput::Left),
            KeyCode::Right => Some(KeyInput::Right),
            KeyCode::Up => Some(KeyInput::Up),
            KeyCode::Down => Some(KeyInput::Down),
            KeyCode::Home => Some(KeyInput::Home),
            KeyCode::End => Some(KeyInput::End),
            _ => None,
        }
    }

    /// Next relevant terminal input. `None` once the event stream ends.
    ///
    /// Cancel-safe: an event is only consumed when it is returned.
    pub async fn next_input(&mut self) -> io::Result<Option<TerminalInput>> {
        while let Some(event) = self.event_stream.next().await {
            match event? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if let Some(key) = Self::convert_key(key.code) {
                        return Ok(Some(TerminalInput::Key(key)));
                    }
                },
                Event::Resize(..) => return Ok(Some(TerminalInput::Resize)),
                _ => {},
            }
        }
        Ok(None)
    }

    /// Draw the whole UI.
    pub fn render(&mut self, app: &App, input: &InputState) -> io::Result<()> {
        self.terminal.draw(|frame| ui::render(frame, app, input))?;
        Ok(())
    }
}

impl Drop for TerminalDriver {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = stdout().execute(LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}
