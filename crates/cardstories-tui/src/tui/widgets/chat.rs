// Chat widget: the most recent messages that fit, oldest at the top.

use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph};
use ratatui::Frame;

use cardstories_app::ui::{ChatMessage, GameSnapshot};

use crate::tui::ViewState;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let block = Block::default().borders(Borders::ALL).title("Chat");

    if state.chat.is_empty() {
        let hint = if state.subject.game_id.is_some() {
            "  No messages. c: say something"
        } else {
            ""
        };
        let paragraph = Paragraph::new(hint)
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    let visible_rows = (area.height as usize).saturating_sub(2).max(1);
    let skip = state.chat.len().saturating_sub(visible_rows);
    let items: Vec<ListItem> = state
        .chat
        .iter()
        .skip(skip)
        .map(|message| {
            let own = state.subject.player_id == Some(message.player_id);
            ListItem::new(message_line(message, state.game.as_ref(), own))
        })
        .collect();

    frame.render_widget(List::new(items).block(block), area);
}

/// "12:04 alice: hello". The name comes from the game's seats when known.
pub fn message_line(
    message: &ChatMessage,
    game: Option<&GameSnapshot>,
    own: bool,
) -> Line<'static> {
    let author = author_name(message, game);
    let author_color = if own { Color::Cyan } else { Color::Yellow };

    let mut spans = Vec::new();
    if let Some(created) = message.created {
        spans.push(Span::styled(
            format!(" {} ", created.format("%H:%M")),
            Style::default().fg(Color::DarkGray),
        ));
    } else {
        spans.push(Span::raw(" "));
    }
    spans.push(Span::styled(
        format!("{}: ", author),
        Style::default().fg(author_color),
    ));
    spans.push(Span::styled(
        message.text.clone(),
        Style::default().fg(Color::White),
    ));
    Line::from(spans)
}

fn author_name(message: &ChatMessage, game: Option<&GameSnapshot>) -> String {
    let Some(game) = game else {
        return format!("player {}", message.player_id);
    };
    if message.player_id == game.state.owner_id {
        return "storyteller".to_string();
    }
    game.state
        .seat(message.player_id)
        .map(|seat| seat.display_name())
        .unwrap_or_else(|| format!("player {}", message.player_id))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
