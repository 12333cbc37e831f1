// Board widget: the sentence, the cards on the table, and the viewer's hand.
//
// The card under the cursor is highlighted; cards the viewer cannot choose
// right now are dimmed. In results the author's card is marked.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

use cardstories_app::ui::GameSnapshot;
use cardstories_core::game::{Card, GamePhase, Role};

use crate::tui::ViewState;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let Some(game) = &state.game else {
        let hint = if state.subject.player_id.is_some() {
            "  No game open. g: new game, o: open by id"
        } else {
            "  No game open. o: open by id"
        };
        let paragraph = Paragraph::new(hint)
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL).title("Board"));
        frame.render_widget(paragraph, area);
        return;
    };

    let lines = build_board_lines(game, state.selected());
    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Board: {}", role_label(game.role))),
        )
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn build_board_lines(game: &GameSnapshot, selected: Option<Card>) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    let sentence = game
        .state
        .sentence
        .clone()
        .unwrap_or_else(|| "(the storyteller is still writing)".to_string());
    lines.push(Line::from(vec![
        Span::styled(" “", Style::default().fg(Color::Gray)),
        Span::styled(
            sentence,
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD | Modifier::ITALIC),
        ),
        Span::styled("”", Style::default().fg(Color::Gray)),
    ]));
    lines.push(Line::raw(""));

    if !game.state.board.is_empty() {
        let winner = (game.state.state == GamePhase::Complete)
            .then_some(game.state.winner_card)
            .flatten();
        let mut spans = vec![Span::styled(" Table: ", Style::default().fg(Color::Gray))];
        spans.extend(card_spans(&game.state.board, game, selected, winner));
        lines.push(Line::from(spans));
    }

    if let Some(hand) = &game.state.hand {
        if !hand.cards.is_empty() {
            let mut spans = vec![Span::styled(" Hand:  ", Style::default().fg(Color::Gray))];
            spans.extend(card_spans(&hand.cards, game, selected, None));
            lines.push(Line::from(spans));
        }
    }

    lines.push(Line::raw(""));
    lines.push(progress_line(game));

    if !game.actions.is_empty() {
        let labels: Vec<&str> = game.actions.iter().map(|a| a.label()).collect();
        lines.push(Line::from(vec![
            Span::styled(" You can: ", Style::default().fg(Color::Gray)),
            Span::styled(labels.join(", "), Style::default().fg(Color::Green)),
        ]));
    }

    if game.level_up {
        lines.push(Line::from(Span::styled(
            " Level up!",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )));
    }

    lines
}

/// One span per card, with a space between cards.
pub fn card_spans(
    cards: &[Card],
    game: &GameSnapshot,
    selected: Option<Card>,
    winner: Option<Card>,
) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    for &card in cards {
        let style = if Some(card) == winner {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else if Some(card) == selected && game.selectable.contains(&card) {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else if game.selectable.contains(&card) {
            Style::default().fg(Color::White)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(format_card(card), style));
        spans.push(Span::raw(" "));
    }
    spans
}

pub fn format_card(card: Card) -> String {
    format!("[{:02}]", card)
}

/// Pick or vote counts for the current phase.
fn progress_line(game: &GameSnapshot) -> Line<'static> {
    let seated = game.state.players.len();
    let text = match game.state.state {
        GamePhase::Create => " Waiting for the storyteller".to_string(),
        GamePhase::Invitation => format!(" {}/{} cards picked", game.state.picked_count(), seated),
        GamePhase::Vote => format!(" {}/{} votes in", game.state.voted_count(), seated),
        GamePhase::Complete => " Results are in".to_string(),
        GamePhase::Canceled => " This game was canceled".to_string(),
    };
    Line::from(Span::styled(text, Style::default().fg(Color::Cyan)))
}

pub fn role_label(role: Role) -> &'static str {
    match role {
        Role::Author => "Storyteller",
        Role::Player => "Player",
        Role::Spectator => "Spectator",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
