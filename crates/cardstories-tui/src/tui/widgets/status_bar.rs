// Status bar widget: connection, game and phase, countdown, animation step,
// last sound cue.

use chrono::{DateTime, Utc};
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use cardstories_app::ui::{ConnectionStatus, GameSnapshot};

use crate::tui::{AnimationView, ViewState};

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let mut spans = Vec::new();

    let (dot, dot_color, label) = connection_indicator(state.connection);
    spans.push(Span::styled(format!(" {} ", dot), Style::default().fg(dot_color)));
    spans.push(Span::styled(label, Style::default().fg(Color::Gray)));
    spans.push(separator());

    match &state.game {
        Some(game) => {
            spans.push(Span::styled(
                format!("Game #{}", game.state.id),
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            ));
            spans.push(Span::raw(" "));
            spans.push(Span::styled(
                game.state.state.label(),
                Style::default().fg(Color::Cyan),
            ));
            if let Some(left) = countdown_text(game, Utc::now()) {
                spans.push(separator());
                spans.push(Span::styled(left, Style::default().fg(Color::Yellow)));
            }
        }
        None => spans.push(Span::styled("Lobby", Style::default().fg(Color::White))),
    }

    if let Some(animation) = &state.animation {
        spans.push(separator());
        spans.push(Span::styled(
            animation_text(animation),
            Style::default().fg(Color::Magenta),
        ));
    }

    if let Some(cue) = state.last_sound {
        spans.push(separator());
        spans.push(Span::styled(
            format!("♪ {}", cue.label()),
            Style::default().fg(Color::DarkGray),
        ));
    }

    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
    frame.render_widget(paragraph, area);
}

fn separator() -> Span<'static> {
    Span::styled(" | ", Style::default().fg(Color::Gray))
}

/// Dot, dot color, and label for the poll state.
pub fn connection_indicator(status: ConnectionStatus) -> (&'static str, Color, &'static str) {
    match status {
        ConnectionStatus::Polling => ("●", Color::Green, "live"),
        ConnectionStatus::Retrying => ("●", Color::Yellow, "retrying"),
        ConnectionStatus::Idle => ("●", Color::DarkGray, "idle"),
    }
}

/// "1:05 left", or `None` when no countdown runs.
pub fn countdown_text(game: &GameSnapshot, now: DateTime<Utc>) -> Option<String> {
    let left = game.state.countdown_remaining(now)?;
    let secs = left.num_seconds();
    Some(format!("{}:{:02} left", secs / 60, secs % 60))
}

pub fn animation_text(animation: &AnimationView) -> String {
    format!(
        "{} {}/{}: {}",
        animation.plan,
        animation.index + 1,
        animation.total,
        animation.step.replace('_', " ")
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::tests::game;
    use cardstories_core::game::GamePhase;
    use chrono::TimeZone;

    #[test]
    fn connection_indicator_colors() {
        assert_eq!(connection_indicator(ConnectionStatus::Polling).1, Color::Green);
        assert_eq!(connection_indicator(ConnectionStatus::Retrying).1, Color::Yellow);
        assert_eq!(connection_indicator(ConnectionStatus::Idle).2, "idle");
    }

    #[test]
    fn countdown_formats_minutes_and_seconds() {
        let now = Utc.timestamp_millis_opt(1_000_000).unwrap();
        let mut snapshot = game(GamePhase::Invitation, 2);
        assert_eq!(countdown_text(&snapshot, now), None);

        snapshot.state.countdown_finish = Some(1_000_000 + 65_000);
        assert_eq!(countdown_text(&snapshot, now).as_deref(), Some("1:05 left"));

        snapshot.state.countdown_finish = Some(0);
        assert_eq!(countdown_text(&snapshot, now).as_deref(), Some("0:00 left"));
    }

    #[test]
    fn animation_text_is_one_based() {
        let view = AnimationView {
            plan: "complete",
            step: "tally_scores",
            index: 2,
            total: 4,
        };
        assert_eq!(animation_text(&view), "complete 3/4: tally scores");
    }

    #[test]
    fn render_does_not_panic_with_defaults() {
        let backend = ratatui::backend::TestBackend::new(80, 1);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();
        let state = ViewState::default();
        terminal
            .draw(|frame| render(frame, frame.area(), &state))
            .unwrap();
    }
}
