//! Navigation state machine.
//!
//! [`App`] is the single serialization point: button edges, peer status
//! polls and system info polls all funnel through [`App::handle_event`] on
//! one thread, so a button press can never race a concurrent poll update.
//! All displayed state lives here; workers only hand in immutable snapshots.

use crate::buttons::ButtonId;
use crate::config::{Favorite, MAX_FAVORITES};
use crate::control::{ControlLink, PeerStatus};
use crate::sysinfo::SystemInfo;
use crate::view::{self, ViewModel};

/// Which entity list the selection index addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    /// IP, uptime, Favourites entry, connected peers
    Main,
    /// Favorite entries plus the trailing Exit entry
    Favorites,
}

/// Inputs funnelled into the state machine.
#[derive(Debug)]
pub enum Event {
    /// Debounced press edge
    Button(ButtonId),
    /// Fresh peer status snapshot
    PeerStatus(PeerStatus),
    /// Fresh host info snapshot
    SystemInfo(SystemInfo),
    /// Interrupt received; leave the event loop
    Shutdown,
}

/// What the event loop should do after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// State unchanged, keep the current frame
    Idle,
    /// State changed, redraw
    Redraw,
    /// Clean shutdown requested
    Shutdown,
}

/// Main application state
pub struct App {
    /// Current menu mode
    pub mode: DisplayMode,
    /// Selection index within the active mode's list
    pub selection: usize,
    /// Last command failure, shown as the trailing red line
    pub error_message: Option<String>,
    /// Last peer status snapshot
    pub peer_status: PeerStatus,
    /// Last host info snapshot
    pub system_info: SystemInfo,
    /// Quick-connect entries, immutable after startup
    pub favorites: Vec<Favorite>,
    /// This node's AllStarLink number
    node_number: String,
    /// Radio-control backend
    control: Box<dyn ControlLink>,
}

impl App {
    pub fn new(
        node_number: String,
        mut favorites: Vec<Favorite>,
        system_info: SystemInfo,
        control: Box<dyn ControlLink>,
    ) -> Self {
        favorites.truncate(MAX_FAVORITES);
        Self {
            mode: DisplayMode::Main,
            selection: 0,
            error_message: None,
            peer_status: PeerStatus::Linked(Vec::new()),
            system_info,
            favorites,
            node_number,
            control,
        }
    }

    /// Apply one event; the caller redraws when told to.
    pub fn handle_event(&mut self, event: Event) -> Step {
        match event {
            Event::Button(ButtonId::A) => {
                self.cycle();
                Step::Redraw
            }
            Event::Button(ButtonId::B) => {
                self.confirm();
                Step::Redraw
            }
            Event::PeerStatus(status) => {
                // Redraw only when the snapshot actually changed
                if status == self.peer_status {
                    return Step::Idle;
                }
                self.peer_status = status;
                self.clamp_selection();
                Step::Redraw
            }
            Event::SystemInfo(info) => {
                self.system_info = info;
                Step::Redraw
            }
            Event::Shutdown => Step::Shutdown,
        }
    }

    /// Build the frame for the current state.
    pub fn view(&self) -> ViewModel {
        view::build(self)
    }

    /// Friendly name for a connected peer, if it is a favorite.
    pub fn favorite_name(&self, peer_id: &str) -> Option<&str> {
        self.favorites
            .iter()
            .find(|f| f.peer_id == peer_id)
            .map(|f| f.name.as_str())
    }

    /// Length of the list the selection index currently addresses.
    fn list_len(&self) -> usize {
        match self.mode {
            DisplayMode::Main => 1 + self.peer_status.peers().len(),
            DisplayMode::Favorites => self.favorites.len() + 1,
        }
    }

    /// Button A: advance the selection, wrapping at the list end.
    fn cycle(&mut self) {
        let len = self.list_len();
        self.selection = if len == 0 { 0 } else { (self.selection + 1) % len };
        tracing::debug!("Selection index {}", self.selection);
    }

    /// Button B: confirm the selected entry.
    fn confirm(&mut self) {
        match self.mode {
            DisplayMode::Main => {
                if self.selection == 0 {
                    self.mode = DisplayMode::Favorites;
                    self.selection = 0;
                    tracing::debug!("Entered favorites mode");
                } else if let Some(peer) =
                    self.peer_status.peers().get(self.selection - 1).cloned()
                {
                    self.disconnect(&peer);
                }
            }
            DisplayMode::Favorites => {
                if self.selection == self.favorites.len() {
                    // Exit entry
                    self.mode = DisplayMode::Main;
                    self.selection = 0;
                    self.error_message = None;
                    tracing::debug!("Exited to main mode");
                } else if let Some(peer) = self
                    .favorites
                    .get(self.selection)
                    .map(|f| f.peer_id.clone())
                {
                    if self.connect(&peer) {
                        self.mode = DisplayMode::Main;
                        self.selection = 0;
                    }
                }
            }
        }
    }

    /// Issue a disconnect; mode and index stay put either way.
    fn disconnect(&mut self, peer: &str) {
        // A new attempt supersedes the previous failure message
        self.error_message = None;
        match self.control.disconnect(&self.node_number, peer) {
            Ok(ack) => tracing::info!("Disconnected {}: {}", peer, ack),
            Err(e) => {
                tracing::warn!("Disconnect {} failed: {}", peer, e);
                self.error_message = Some("Disconnect failed".to_string());
            }
        }
    }

    /// Issue a connect; true on success.
    fn connect(&mut self, peer: &str) -> bool {
        self.error_message = None;
        match self.control.connect(&self.node_number, peer) {
            Ok(ack) => {
                tracing::info!("Connected {}: {}", peer, ack);
                true
            }
            Err(e) => {
                tracing::warn!("Connect {} failed: {}", peer, e);
                self.error_message = Some("Connect failed".to_string());
                false
            }
        }
    }

    /// Keep the selection valid when the peer list shrinks under it.
    fn clamp_selection(&mut self) {
        if self.mode == DisplayMode::Main {
            let last = self.list_len().saturating_sub(1);
            if self.selection > last {
                self.selection = last;
            }
        }
    }
}
