// Players widget: one row per seat with pick and vote markers, results once
// the game is complete, and the viewer's level progress as a gauge.

use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, List, ListItem, Paragraph};
use ratatui::Frame;

use cardstories_app::ui::GameSnapshot;
use cardstories_core::game::{GamePhase, Score, Seat};

use crate::tui::ViewState;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let Some(game) = &state.game else {
        let paragraph = Paragraph::new("")
            .block(Block::default().borders(Borders::ALL).title("Players"));
        frame.render_widget(paragraph, area);
        return;
    };

    let viewer_score = game
        .viewer
        .and_then(|id| game.state.seat(id))
        .and_then(|seat| seat.score);

    let (list_area, gauge_area) = match viewer_score {
        Some(_) if area.height > 6 => {
            let parts = Layout::vertical([Constraint::Min(3), Constraint::Length(3)]).split(area);
            (parts[0], Some(parts[1]))
        }
        _ => (area, None),
    };

    let items: Vec<ListItem> = game
        .state
        .players
        .iter()
        .map(|seat| ListItem::new(seat_line(seat, game)))
        .collect();
    let title = format!("Players ({})", game.state.players.len());
    let list = List::new(items).block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(list, list_area);

    if let (Some(score), Some(gauge_area)) = (viewer_score, gauge_area) {
        frame.render_widget(level_gauge(&score), gauge_area);
    }
}

pub fn seat_line(seat: &Seat, game: &GameSnapshot) -> Line<'static> {
    let is_viewer = game.viewer == Some(seat.player_id);
    let name_style = if is_viewer {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::White)
    };

    let mut spans = vec![
        Span::styled(format!(" {:<12}", seat.display_name()), name_style),
        marker(seat.picked(), "picked"),
        Span::raw(" "),
        marker(seat.voted(), "voted"),
    ];

    if game.state.state == GamePhase::Complete {
        match seat.win {
            Some(true) => spans.push(Span::styled(" won", Style::default().fg(Color::Green))),
            Some(false) => spans.push(Span::styled(" lost", Style::default().fg(Color::Red))),
            None => {}
        }
        if let Some(score) = seat.score {
            spans.push(Span::styled(
                format!(" +{} (lvl {})", score.earned, score.level),
                Style::default().fg(Color::Yellow),
            ));
        }
    }
    Line::from(spans)
}

fn marker(done: bool, label: &'static str) -> Span<'static> {
    if done {
        Span::styled(label, Style::default().fg(Color::Green))
    } else {
        Span::styled(label, Style::default().fg(Color::DarkGray))
    }
}

pub fn level_gauge(score: &Score) -> Gauge<'static> {
    Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(format!("Level {}", score.level)))
        .gauge_style(Style::default().fg(Color::Yellow).bg(Color::Black))
        .ratio(score.progress())
        .label(format!("{}/{}", score.points, score.level_ceiling))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
