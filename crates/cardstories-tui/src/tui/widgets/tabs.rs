// Tabs widget: the player's open games, with the cursor and the game on
// screen marked.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph};
use ratatui::Frame;

use cardstories_app::ui::TabEntry;
use cardstories_core::protocol::GameId;

use crate::tui::ViewState;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let block = Block::default().borders(Borders::ALL).title("Games");

    if state.tabs.is_empty() {
        let paragraph = Paragraph::new("  No open games.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    let items: Vec<ListItem> = state
        .tabs
        .iter()
        .enumerate()
        .map(|(i, tab)| {
            ListItem::new(tab_line(
                tab,
                i == state.selected_tab,
                state.subject.game_id,
            ))
        })
        .collect();
    frame.render_widget(List::new(items).block(block), area);
}

pub fn tab_line(tab: &TabEntry, selected: bool, current: Option<GameId>) -> Line<'static> {
    let style = if selected {
        Style::default()
            .fg(Color::Black)
            .bg(Color::White)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::White)
    };
    let marker = if current == Some(tab.game_id) { "▶" } else { " " };
    let phase = tab.state.map(|s| s.label()).unwrap_or("");

    let mut spans = vec![
        Span::styled(format!("{marker}#{}", tab.game_id), style),
        Span::styled(format!(" {phase}"), Style::default().fg(Color::Cyan)),
    ];
    if let Some(sentence) = &tab.sentence {
        spans.push(Span::styled(
            format!(" {sentence}"),
            Style::default().fg(Color::DarkGray),
        ));
    }
    Line::from(spans)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use cardstories_core::game::GamePhase;

    fn entry(game_id: GameId) -> TabEntry {
        TabEntry {
            game_id,
            state: Some(GamePhase::Vote),
            sentence: Some("moonlight".into()),
        }
    }

    #[test]
    fn current_game_is_marked() {
        let line = tab_line(&entry(5), false, Some(5));
        assert_eq!(line.spans[0].content, "▶#5");
        let line = tab_line(&entry(6), false, Some(5));
        assert_eq!(line.spans[0].content, " #6");
    }

    #[test]
    fn selected_tab_is_highlighted() {
        let line = tab_line(&entry(5), true, None);
        assert_eq!(line.spans[0].style.bg, Some(Color::White));
        assert_eq!(line.spans[1].content, " Voting");
        assert_eq!(line.spans[2].content, " moonlight");
    }

    #[test]
    fn render_does_not_panic() {
        let backend = ratatui::backend::TestBackend::new(30, 6);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();
        let mut state = ViewState::default();
        terminal
            .draw(|frame| render(frame, frame.area(), &state))
            .unwrap();
        state.tabs = vec![entry(1), entry(2)];
        terminal
            .draw(|frame| render(frame, frame.area(), &state))
            .unwrap();
    }
}
