//! Async runtime
//!
//! Event loop that drives terminal I/O and the chat [`Runtime`]. Key presses
//! become runtime commands; every published [`ChatState`] snapshot triggers
//! a redraw.
//!
//! [`ChatState`]: ping_client::ChatState

use std::io;

use ping_client::{
    ReconnectConfig, Runtime, RuntimeError, RuntimeHandle, SHUTDOWN_GRACE, SystemEnv,
    transport::WebSocketTransport,
};
use thiserror::Error;
use tokio::task::JoinError;

use crate::{App, AppAction, Config, InputState, TerminalDriver, terminal::TerminalInput};

/// Front-end errors.
#[derive(Debug, Error)]
pub enum TuiError {
    /// I/O error from terminal operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The chat runtime failed.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// The chat runtime task panicked or was cancelled.
    #[error("chat runtime task failed: {0}")]
    Join(#[from] JoinError),
}

/// Run the terminal client until the user quits or the relay link closes.
pub async fn run(config: Config) -> Result<(), TuiError> {
    let Config { identity, endpoint, runtime } = config;
    let transport = WebSocketTransport::new(ReconnectConfig::default());
    let (chat, handle) = Runtime::new(identity, endpoint, transport, SystemEnv::new(), runtime);
    let mut chat_task = tokio::spawn(chat.run());
    let mut states = handle.subscribe();

    let mut driver = TerminalDriver::new()?;
    let mut app = App::new(states.borrow_and_update().clone());
    let mut input = InputState::new();
    driver.render(&app, &input)?;

    loop {
        tokio::select! {
            next = driver.next_input() => {
                let actions = match next? {
                    Some(TerminalInput::Key(key)) => input.handle_key(key, &mut app),
                    Some(TerminalInput::Resize) => vec![AppAction::Render],
                    None => vec![AppAction::Quit],
                };
                if !execute(actions, &handle, &mut driver, &app, &input).await? {
                    break;
                }
            },

            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                app.update(states.borrow_and_update().clone());
                driver.render(&app, &input)?;
            },

            result = &mut chat_task => {
                drop(driver);
                tracing::warn!("chat runtime exited");
                return Ok(result??);
            },
        }
    }

    drop(driver);
    tracing::info!("logging out");
    if let Err(e) = handle.logout().await {
        tracing::debug!(error = %e, "runtime already stopped");
    }

    match tokio::time::timeout(SHUTDOWN_GRACE * 2, &mut chat_task).await {
        Ok(result) => Ok(result??),
        Err(_) => {
            tracing::warn!("chat runtime did not stop in time, aborting");
            chat_task.abort();
            Ok(())
        },
    }
}

/// Execute app actions. Returns `false` when the loop should stop.
async fn execute(
    actions: Vec<AppAction>,
    handle: &RuntimeHandle,
    driver: &mut TerminalDriver,
    app: &App,
    input: &InputState,
) -> Result<bool, TuiError> {
    for action in actions {
        match action {
            AppAction::Render => driver.render(app, input)?,
            AppAction::Command(command) => {
                if handle.send(command).await.is_err() {
                    return Ok(false);
                }
            },
            AppAction::Quit => return Ok(false),
        }
    }
    Ok(true)
}
