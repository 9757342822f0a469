//! Renderable view of the panel state.
//!
//! [`build`] is a pure function of the state machine's fields: identical
//! state always yields an identical [`ViewModel`], so the renderer never
//! needs hidden drawing state.

use crate::app::{App, DisplayMode};
use crate::control::PeerStatus;

/// Peer rows shown in Main mode; the selection index still covers all
/// connected peers, not just the displayed ones.
pub const MAX_PEER_ROWS: usize = 3;

/// Text color of one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineColor {
    White,
    Blue,
    Yellow,
    Green,
    Red,
}

/// One rendered line of the frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub text: String,
    pub color: LineColor,
    pub is_error: bool,
}

impl Line {
    fn plain(text: impl Into<String>, color: LineColor) -> Self {
        Self {
            text: text.into(),
            color,
            is_error: false,
        }
    }

    fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            color: LineColor::Red,
            is_error: true,
        }
    }
}

/// Ordered frame description consumed by the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ViewModel {
    pub lines: Vec<Line>,
}

/// Build the frame for the current state.
pub fn build(app: &App) -> ViewModel {
    let mut lines = match app.mode {
        DisplayMode::Main => main_lines(app),
        DisplayMode::Favorites => favorites_lines(app),
    };
    if let Some(message) = &app.error_message {
        lines.push(Line::error(message.clone()));
    }
    ViewModel { lines }
}

fn main_lines(app: &App) -> Vec<Line> {
    let mut lines = vec![
        Line::plain(format!("IP: {}", app.system_info.ip), LineColor::White),
        Line::plain(format!("Uptime: {}", app.system_info.uptime), LineColor::Blue),
        Line::plain(cursor_label(app.selection == 0, "Favourites"), LineColor::Yellow),
    ];

    match &app.peer_status {
        PeerStatus::Linked(peers) if !peers.is_empty() => {
            for (i, peer) in peers.iter().take(MAX_PEER_ROWS).enumerate() {
                let text = format!("{}: {}", app.favorite_name(peer).unwrap_or("Node"), peer);
                lines.push(Line::plain(
                    cursor_label(app.selection == i + 1, &text),
                    LineColor::Green,
                ));
            }
        }
        PeerStatus::Linked(_) => {
            lines.push(Line::plain(cursor_label(false, "Nodes: None"), LineColor::Green));
        }
        PeerStatus::ControlError => {
            lines.push(Line::plain(cursor_label(false, "Nodes: Err"), LineColor::Green));
        }
        PeerStatus::Unavailable => {
            lines.push(Line::plain(
                cursor_label(false, "Nodes: No Asterisk"),
                LineColor::Green,
            ));
        }
    }

    lines
}

fn favorites_lines(app: &App) -> Vec<Line> {
    let mut lines = Vec::with_capacity(app.favorites.len() + 1);
    for (i, favorite) in app.favorites.iter().enumerate() {
        let text = format!("{}: {}", favorite.name, favorite.peer_id);
        lines.push(Line::plain(
            cursor_label(app.selection == i, &text),
            LineColor::Green,
        ));
    }
    lines.push(Line::plain(
        cursor_label(app.selection == app.favorites.len(), "Exit"),
        LineColor::Yellow,
    ));
    lines
}

fn cursor_label(selected: bool, text: &str) -> String {
    if selected {
        format!("> {text}")
    } else {
        format!("  {text}")
    }
}
