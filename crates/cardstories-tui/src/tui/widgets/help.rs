// Help bar and help overlay.
//
// The bar shows the keys that do something right now, or the compose
// prompt while text is being typed.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;

use cardstories_core::game::ActionKind;

use crate::tui::{Compose, ViewState};

use super::dialog::centered_rect;

const KEYS: &[(&str, &str)] = &[
    ("←/→", "choose a card"),
    ("Enter", "play the chosen card"),
    ("s", "write the sentence"),
    ("i", "invite players by id"),
    ("t", "start the countdown"),
    ("v", "open the vote"),
    ("x", "publish results"),
    ("p", "join the game"),
    ("c", "chat"),
    ("b", "toggle the bot"),
    ("n", "next game"),
    ("g", "new game"),
    ("o", "open a game by id"),
    ("Tab/↑/↓", "move in the games list"),
    ("w / d", "open / close that game"),
    ("r", "reload"),
    ("q", "quit"),
];

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let line = match &state.compose {
        Some(compose) => compose_line(compose),
        None => Line::from(Span::styled(
            hint_text(state),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::DIM),
        )),
    };
    let paragraph = Paragraph::new(line).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(paragraph, area);
}

pub fn compose_line(compose: &Compose) -> Line<'static> {
    let mut spans = vec![
        Span::styled(
            format!(" {}> ", compose.target.prompt()),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("{}_", compose.buffer),
            Style::default().fg(Color::White),
        ),
    ];
    if let Some(error) = &compose.error {
        spans.push(Span::styled(
            format!("  {error}"),
            Style::default().fg(Color::Red),
        ));
    }
    Line::from(spans)
}

/// Key hints for what the viewer can do right now.
pub fn hint_text(state: &ViewState) -> String {
    let mut hints = Vec::new();
    if let Some(game) = &state.game {
        if !game.selectable.is_empty() {
            hints.push("←/→:Card");
        }
        for action in &game.actions {
            hints.push(match action {
                ActionKind::SetCard | ActionKind::Pick | ActionKind::Vote => "Enter:Play",
                ActionKind::SetSentence => "s:Sentence",
                ActionKind::Invite => "i:Invite",
                ActionKind::Participate => "p:Join",
                ActionKind::Voting => "v:Vote",
                ActionKind::Complete => "x:Results",
                ActionKind::NextGame => "n:Next",
            });
        }
        hints.push("c:Chat");
    }
    hints.extend(["o:Open", "r:Reload", "?:Help", "q:Quit"]);
    hints.dedup();
    format!(" {}", hints.join(" | "))
}

/// Full key list, centered over the screen.
pub fn render_overlay(frame: &mut Frame, area: Rect) {
    let height = KEYS.len() as u16 + 2;
    let dialog_area = centered_rect(44, height, area);
    frame.render_widget(Clear, dialog_area);

    let lines: Vec<Line> = KEYS
        .iter()
        .map(|(key, what)| {
            Line::from(vec![
                Span::styled(
                    format!(" {:<9}", key),
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw(*what),
            ])
        })
        .collect();

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Keys (any key closes) "),
        )
        .style(Style::default().bg(Color::Black));
    frame.render_widget(paragraph, dialog_area);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
