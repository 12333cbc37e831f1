// Screen layout: panel arrangement and sizing.
//
// +--------------------------------------------------+
// | Status Bar (1 row)                                |
// +-------------------------+------------------------+
// | Board (65%)              | Players (60%)          |
// |                          +------------------------+
// |                          | Tabs (40%)             |
// +-------------------------+------------------------+
// | Chat (8 rows)                                     |
// +--------------------------------------------------+
// | Help Bar (1 row)                                  |
// +--------------------------------------------------+

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Resolved screen areas for each zone.
#[derive(Debug, Clone)]
pub struct AppLayout {
    /// Connection, game id, phase, animation step, last sound cue.
    pub status_bar: Rect,
    /// Sentence, board cards, and the viewer's hand.
    pub board: Rect,
    /// Seats with pick/vote markers, results, and level progress.
    pub players: Rect,
    /// The player's open games.
    pub tabs: Rect,
    pub chat: Rect,
    /// Key hints, or the compose prompt while typing.
    pub help_bar: Rect,
}

pub fn build_layout(area: Rect) -> AppLayout {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // status bar
            Constraint::Min(8),    // board + sidebar
            Constraint::Length(8), // chat
            Constraint::Length(1), // help bar
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(vertical[1]);

    let sidebar = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(horizontal[1]);

    AppLayout {
        status_bar: vertical[0],
        board: horizontal[0],
        players: sidebar[0],
        tabs: sidebar[1],
        chat: vertical[2],
        help_bar: vertical[3],
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
