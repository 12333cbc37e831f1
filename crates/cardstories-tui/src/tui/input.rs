// Keyboard input handling and command dispatch.
//
// Translates crossterm key events into UserCommand messages for the
// controller, or into local ViewState changes (card cursor, tab cursor,
// compose buffer, overlays).

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use cardstories_app::ui::UserCommand;
use cardstories_core::game::{ActionKind, GamePhase, Role};
use cardstories_core::protocol::PlayerId;

use super::{Compose, ComposeTarget, ViewState};

/// Handle a keyboard event.
///
/// Returns `Some(UserCommand)` when the key press should be forwarded to the
/// controller. Returns `None` when it was handled locally.
pub fn handle_key(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    // Windows reports both press and release.
    if key_event.kind != KeyEventKind::Press {
        return None;
    }

    if key_event.modifiers.contains(KeyModifiers::CONTROL) && key_event.code == KeyCode::Char('c')
    {
        return Some(UserCommand::Quit);
    }

    if view_state.confirm_quit {
        return handle_confirm_quit(key_event, view_state);
    }

    if view_state.fatal.is_some() {
        return handle_fatal(key_event, view_state);
    }

    if view_state.compose.is_some() {
        return handle_compose(key_event, view_state);
    }

    if view_state.show_help {
        view_state.show_help = false;
        return None;
    }

    match key_event.code {
        // Card cursor
        KeyCode::Left | KeyCode::Char('h') => {
            view_state.selected_card = view_state.selected_card.saturating_sub(1);
            None
        }
        KeyCode::Right | KeyCode::Char('l') => {
            let cards = view_state.game.as_ref().map_or(0, |g| g.selectable.len());
            if view_state.selected_card + 1 < cards {
                view_state.selected_card += 1;
            }
            None
        }
        KeyCode::Enter => card_action(view_state),

        // Tab cursor
        KeyCode::Tab | KeyCode::Down | KeyCode::Char('j') => {
            if view_state.selected_tab + 1 < view_state.tabs.len() {
                view_state.selected_tab += 1;
            }
            None
        }
        KeyCode::BackTab | KeyCode::Up | KeyCode::Char('k') => {
            view_state.selected_tab = view_state.selected_tab.saturating_sub(1);
            None
        }
        KeyCode::Char('w') => view_state
            .tabs
            .get(view_state.selected_tab)
            .map(|tab| UserCommand::Open { game_id: tab.game_id }),
        KeyCode::Char('d') => view_state
            .tabs
            .get(view_state.selected_tab)
            .map(|tab| UserCommand::CloseTab { game_id: tab.game_id }),

        // Typed input
        KeyCode::Char('s') if can(view_state, ActionKind::SetSentence) => {
            start_compose(view_state, ComposeTarget::Sentence)
        }
        KeyCode::Char('c') if view_state.subject.game_id.is_some() => {
            start_compose(view_state, ComposeTarget::Chat)
        }
        KeyCode::Char('i') if can(view_state, ActionKind::Invite) => {
            start_compose(view_state, ComposeTarget::Invite)
        }
        KeyCode::Char('t') if countdown_allowed(view_state) => {
            start_compose(view_state, ComposeTarget::Countdown)
        }
        KeyCode::Char('o') => start_compose(view_state, ComposeTarget::OpenGame),

        // Game actions
        KeyCode::Char('p') if can(view_state, ActionKind::Participate) => {
            Some(UserCommand::Participate)
        }
        KeyCode::Char('v') if can(view_state, ActionKind::Voting) => Some(UserCommand::Voting),
        KeyCode::Char('x') if can(view_state, ActionKind::Complete) => {
            Some(UserCommand::Complete)
        }
        KeyCode::Char('n') if can(view_state, ActionKind::NextGame) => {
            Some(UserCommand::NextGame)
        }
        KeyCode::Char('b') if view_state.game.is_some() => Some(UserCommand::SetBot {
            enable: !view_state.bot_enabled,
        }),
        KeyCode::Char('g') if view_state.subject.player_id.is_some() => Some(UserCommand::Create),

        KeyCode::Char('r') => Some(UserCommand::Reload),
        KeyCode::Char('?') => {
            view_state.show_help = true;
            None
        }
        KeyCode::Char('q') => {
            view_state.confirm_quit = true;
            None
        }

        _ => None,
    }
}

fn can(view_state: &ViewState, action: ActionKind) -> bool {
    view_state.game.as_ref().is_some_and(|game| game.can(action))
}

/// The author can run the clock while players are picking or voting.
fn countdown_allowed(view_state: &ViewState) -> bool {
    view_state.game.as_ref().is_some_and(|game| {
        game.role == Role::Author
            && matches!(game.state.state, GamePhase::Invitation | GamePhase::Vote)
    })
}

fn start_compose(view_state: &mut ViewState, target: ComposeTarget) -> Option<UserCommand> {
    view_state.compose = Some(Compose::new(target));
    None
}

/// Enter outside of compose: act on the selected card.
fn card_action(view_state: &ViewState) -> Option<UserCommand> {
    let card = view_state.selected()?;
    if can(view_state, ActionKind::SetCard) {
        Some(UserCommand::SetCard { card })
    } else if can(view_state, ActionKind::Pick) {
        Some(UserCommand::Pick { card })
    } else if can(view_state, ActionKind::Vote) {
        Some(UserCommand::Vote { card })
    } else {
        None
    }
}

/// `y`/`q` confirm, `n`/Esc cancel, everything else is blocked.
fn handle_confirm_quit(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Char('q') | KeyCode::Char('Q') => {
            Some(UserCommand::Quit)
        }
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
            view_state.confirm_quit = false;
            None
        }
        _ => None,
    }
}

/// Enter or `r` acknowledges the notice and reloads; `q` still quits.
fn handle_fatal(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Enter | KeyCode::Char('r') => {
            view_state.fatal = None;
            Some(UserCommand::Reload)
        }
        KeyCode::Char('q') => {
            view_state.confirm_quit = true;
            None
        }
        _ => None,
    }
}

fn handle_compose(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    let compose = view_state.compose.as_mut()?;
    match key_event.code {
        KeyCode::Esc => {
            view_state.compose = None;
            None
        }
        KeyCode::Backspace => {
            compose.buffer.pop();
            compose.error = None;
            None
        }
        KeyCode::Char(c) => {
            compose.buffer.push(c);
            compose.error = None;
            None
        }
        KeyCode::Enter => match submit(compose.target, &compose.buffer) {
            Ok(command) => {
                view_state.compose = None;
                Some(command)
            }
            Err(message) => {
                compose.error = Some(message);
                None
            }
        },
        _ => None,
    }
}

/// Turn a finished compose buffer into its command.
pub fn submit(target: ComposeTarget, buffer: &str) -> Result<UserCommand, String> {
    let text = buffer.trim();
    if text.is_empty() {
        return Err("nothing typed".into());
    }
    match target {
        ComposeTarget::Sentence => Ok(UserCommand::SetSentence {
            sentence: text.to_string(),
        }),
        ComposeTarget::Chat => Ok(UserCommand::SendChat {
            text: text.to_string(),
        }),
        ComposeTarget::Invite => parse_player_ids(text).map(|players| UserCommand::Invite { players }),
        ComposeTarget::OpenGame => text
            .parse()
            .map(|game_id| UserCommand::Open { game_id })
            .map_err(|_| format!("`{text}` is not a game id")),
        ComposeTarget::Countdown => match text.parse::<u32>() {
            Ok(seconds) if seconds > 0 => Ok(UserCommand::SetCountdown { seconds }),
            _ => Err(format!("`{text}` is not a number of seconds")),
        },
    }
}

fn parse_player_ids(text: &str) -> Result<Vec<PlayerId>, String> {
    text.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse()
                .map_err(|_| format!("`{part}` is not a player id"))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
