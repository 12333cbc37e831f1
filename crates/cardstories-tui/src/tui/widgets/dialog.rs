// Modal overlays: the fatal error notice and the quit confirmation.
//
// Both render centered on top of the main layout. The fatal notice takes
// precedence; while it is up only reload and quit are accepted.

use ratatui::layout::{Constraint, Flex, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

use cardstories_app::ui::{FatalKind, FatalNotice};

const QUIT_WIDTH: u16 = 28;
const QUIT_HEIGHT: u16 = 5;
const FATAL_WIDTH: u16 = 56;
const FATAL_HEIGHT: u16 = 9;

pub fn render_quit(frame: &mut Frame, area: Rect) {
    let dialog_area = centered_rect(QUIT_WIDTH, QUIT_HEIGHT, area);
    frame.render_widget(Clear, dialog_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(Span::styled(
            " Quit? ",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ));

    let text = Line::from(vec![
        Span::raw("  Really quit? ("),
        Span::styled("y", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
        Span::raw("/"),
        Span::styled("n", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
        Span::raw(")"),
    ]);

    let paragraph = Paragraph::new(text)
        .block(block)
        .style(Style::default().bg(Color::Black));
    frame.render_widget(paragraph, dialog_area);
}

pub fn render_fatal(frame: &mut Frame, area: Rect, notice: &FatalNotice) {
    let dialog_area = centered_rect(FATAL_WIDTH, FATAL_HEIGHT, area);
    frame.render_widget(Clear, dialog_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .title(Span::styled(
            fatal_title(notice.kind),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ));

    let mut lines = vec![Line::raw(""), Line::raw(format!(" {}", notice.message))];
    if let Some(code) = &notice.code {
        lines.push(Line::from(Span::styled(
            format!(" ({code})"),
            Style::default().fg(Color::DarkGray),
        )));
    }
    lines.push(Line::raw(""));
    lines.push(Line::from(vec![
        Span::raw(" Press "),
        Span::styled(
            "Enter",
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" to reload, "),
        Span::styled("q", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
        Span::raw(" to quit"),
    ]));

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .style(Style::default().bg(Color::Black));
    frame.render_widget(paragraph, dialog_area);
}

pub fn fatal_title(kind: FatalKind) -> &'static str {
    match kind {
        FatalKind::StaleState => " The game moved on ",
        FatalKind::Generic => " Something went wrong ",
    }
}

/// Compute a centered rectangle of the given size within `area`, clamped
/// to the available space.
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let clamped_width = width.min(area.width);
    let clamped_height = height.min(area.height);

    let vertical = Layout::vertical([Constraint::Length(clamped_height)])
        .flex(Flex::Center)
        .split(area);

    let horizontal = Layout::horizontal([Constraint::Length(clamped_width)])
        .flex(Flex::Center)
        .split(vertical[0]);

    horizontal[0]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer_text(terminal: &ratatui::Terminal<ratatui::backend::TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn centered_rect_is_centered() {
        let area = Rect::new(0, 0, 80, 24);
        let result = centered_rect(QUIT_WIDTH, QUIT_HEIGHT, area);
        assert_eq!(result.width, QUIT_WIDTH);
        assert_eq!(result.height, QUIT_HEIGHT);
        let result_center_x = result.x + result.width / 2;
        let result_center_y = result.y + result.height / 2;
        assert!((result_center_x as i32 - 40).unsigned_abs() <= 1);
        assert!((result_center_y as i32 - 12).unsigned_abs() <= 1);
    }

    #[test]
    fn centered_rect_clamps_to_small_area() {
        let area = Rect::new(0, 0, 10, 3);
        let result = centered_rect(FATAL_WIDTH, FATAL_HEIGHT, area);
        assert!(result.width <= area.width);
        assert!(result.height <= area.height);
    }

    #[test]
    fn fatal_notice_shows_message_and_code() {
        let backend = ratatui::backend::TestBackend::new(80, 24);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();
        let notice = FatalNotice {
            kind: FatalKind::StaleState,
            code: Some("WRONG_STATE_FOR_VOTE".into()),
            message: "Reload to catch up.".into(),
        };
        terminal
            .draw(|frame| render_fatal(frame, frame.area(), &notice))
            .unwrap();
        let text = buffer_text(&terminal);
        assert!(text.contains("The game moved on"));
        assert!(text.contains("Reload to catch up."));
        assert!(text.contains("WRONG_STATE_FOR_VOTE"));
    }

    #[test]
    fn quit_render_does_not_panic() {
        let backend = ratatui::backend::TestBackend::new(80, 24);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();
        terminal
            .draw(|frame| render_quit(frame, frame.area()))
            .unwrap();
        assert!(buffer_text(&terminal).contains("Really quit?"));
    }
}
