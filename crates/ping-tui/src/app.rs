//! View model
//!
//! Wraps the latest [`ChatState`] snapshot with UI-only state: the sidebar
//! selection and a one-line notice. Pure and testable; the terminal runtime
//! feeds it snapshots and executes the [`AppAction`]s it returns.

use ping_client::{ChatState, Command};
use ping_proto::{GLOBAL_ROOM_TITLE, PresenceEntry, RoomKey};

/// Actions for the terminal runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    /// Redraw the screen.
    Render,
    /// Forward a command to the chat runtime.
    Command(Command),
    /// Log out and exit.
    Quit,
}

/// One row of the sidebar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SidebarEntry {
    /// The shared room.
    General,
    /// An online peer.
    Peer(PresenceEntry),
}

impl SidebarEntry {
    /// Label to display.
    pub fn label(&self) -> &str {
        match self {
            Self::General => GLOBAL_ROOM_TITLE,
            Self::Peer(peer) if peer.display_name.is_empty() => &peer.user_id,
            Self::Peer(peer) => &peer.display_name,
        }
    }

    /// Command that opens this conversation.
    pub fn open(&self) -> Command {
        match self {
            Self::General => Command::SelectGeneralChat,
            Self::Peer(peer) => Command::StartPrivateChat(peer.clone()),
        }
    }
}

/// UI state around a chat snapshot.
#[derive(Debug, Clone)]
pub struct App {
    state: ChatState,
    /// Index into [`App::sidebar`].
    selected: usize,
    notice: Option<String>,
}

impl App {
    /// View over an initial snapshot.
    pub fn new(state: ChatState) -> Self {
        Self { state, selected: 0, notice: None }
    }

    /// Latest snapshot.
    pub fn state(&self) -> &ChatState {
        &self.state
    }

    /// Replace the snapshot, keeping the selection on the same entry if it
    /// is still listed.
    pub fn update(&mut self, state: ChatState) {
        let selected = self.selected_entry();
        self.state = state;

        let sidebar = self.sidebar();
        self.selected = selected
            .and_then(|entry| sidebar.iter().position(|e| *e == entry))
            .unwrap_or_else(|| self.selected.min(sidebar.len().saturating_sub(1)));
    }

    /// "General" followed by every online peer.
    pub fn sidebar(&self) -> Vec<SidebarEntry> {
        std::iter::once(SidebarEntry::General)
            .chain(self.state.peers().cloned().map(SidebarEntry::Peer))
            .collect()
    }

    /// Selected sidebar row.
    pub fn selected(&self) -> usize {
        self.selected
    }

    /// Selected sidebar entry.
    pub fn selected_entry(&self) -> Option<SidebarEntry> {
        self.sidebar().into_iter().nth(self.selected)
    }

    /// Move the selection down, wrapping around.
    pub fn select_next(&mut self) {
        let len = self.sidebar().len();
        self.selected = if self.selected + 1 >= len { 0 } else { self.selected + 1 };
    }

    /// Move the selection up, wrapping around.
    pub fn select_prev(&mut self) {
        let len = self.sidebar().len();
        self.selected = if self.selected == 0 { len.saturating_sub(1) } else { self.selected - 1 };
    }

    /// Whether `entry` is the conversation on screen.
    pub fn is_active(&self, entry: &SidebarEntry) -> bool {
        match entry {
            SidebarEntry::General => self.state.room_key().is_global(),
            SidebarEntry::Peer(peer) => {
                *self.state.room_key() == RoomKey::private(self.state.owner(), &peer.user_id)
            },
        }
    }

    /// One-line notice for the status bar.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Show a notice until the next one.
    pub fn set_notice(&mut self, notice: impl Into<String>) {
        self.notice = Some(notice.into());
    }

    /// Clear the notice.
    pub fn clear_notice(&mut self) {
        self.notice = None;
    }
}
