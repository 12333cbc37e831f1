// TUI: view state, layout, input handling, and widget rendering.
//
// The TUI owns a `ViewState` that mirrors what the controller has told it.
// The controller pushes `UiUpdate` messages over an mpsc channel; the TUI
// applies them to `ViewState` and re-renders at ~30 fps. Key presses become
// `UserCommand`s sent back over a second channel.

pub mod input;
pub mod layout;
pub mod widgets;

use std::time::Duration;

use crossterm::event::{Event, EventStream};
use futures_util::StreamExt;
use ratatui::Frame;
use tokio::sync::mpsc;
use tracing::debug;

use cardstories_app::plugins::audio::SoundCue;
use cardstories_app::ui::{
    ChatMessage, ConnectionStatus, FatalNotice, GameSnapshot, NextGame, TabEntry, UiUpdate,
    UserCommand,
};
use cardstories_core::game::Card;
use cardstories_core::protocol::Subject;

use layout::build_layout;

// ---------------------------------------------------------------------------
// Compose input
// ---------------------------------------------------------------------------

/// What a line of typed text is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeTarget {
    Sentence,
    Chat,
    /// Comma or space separated player ids.
    Invite,
    OpenGame,
    Countdown,
}

impl ComposeTarget {
    pub fn prompt(self) -> &'static str {
        match self {
            ComposeTarget::Sentence => "Sentence",
            ComposeTarget::Chat => "Say",
            ComposeTarget::Invite => "Invite ids",
            ComposeTarget::OpenGame => "Open game",
            ComposeTarget::Countdown => "Countdown (s)",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compose {
    pub target: ComposeTarget,
    pub buffer: String,
    /// Why the last submit was refused.
    pub error: Option<String>,
}

impl Compose {
    pub fn new(target: ComposeTarget) -> Self {
        Self {
            target,
            buffer: String::new(),
            error: None,
        }
    }
}

/// The step of the animation currently on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationView {
    pub plan: &'static str,
    pub step: &'static str,
    pub index: usize,
    pub total: usize,
}

// ---------------------------------------------------------------------------
// ViewState
// ---------------------------------------------------------------------------

/// TUI-local state that mirrors the controller's updates for rendering.
pub struct ViewState {
    pub subject: Subject,
    pub game: Option<GameSnapshot>,
    pub chat: Vec<ChatMessage>,
    pub bot_enabled: bool,
    pub tabs: Vec<TabEntry>,
    pub next_game: NextGame,
    pub animation: Option<AnimationView>,
    pub connection: ConnectionStatus,
    pub last_sound: Option<SoundCue>,
    /// Blocking notice; every key but reload and quit is ignored while set.
    pub fatal: Option<FatalNotice>,
    /// Index into the game's selectable cards.
    pub selected_card: usize,
    /// Index into `tabs`.
    pub selected_tab: usize,
    pub compose: Option<Compose>,
    pub confirm_quit: bool,
    pub show_help: bool,
}

impl Default for ViewState {
    fn default() -> Self {
        ViewState {
            subject: Subject::default(),
            game: None,
            chat: Vec::new(),
            bot_enabled: false,
            tabs: Vec::new(),
            next_game: NextGame::default(),
            animation: None,
            connection: ConnectionStatus::Idle,
            last_sound: None,
            fatal: None,
            selected_card: 0,
            selected_tab: 0,
            compose: None,
            confirm_quit: false,
            show_help: false,
        }
    }
}

impl ViewState {
    /// The card under the cursor, if the viewer can choose one.
    pub fn selected(&self) -> Option<Card> {
        self.game
            .as_ref()
            .and_then(|game| game.selectable.get(self.selected_card).copied())
    }

    fn clamp_selection(&mut self) {
        let cards = self.game.as_ref().map_or(0, |game| game.selectable.len());
        self.selected_card = self.selected_card.min(cards.saturating_sub(1));
        self.selected_tab = self.selected_tab.min(self.tabs.len().saturating_sub(1));
    }
}

// ---------------------------------------------------------------------------
// UiUpdate processing
// ---------------------------------------------------------------------------

/// Apply a single UiUpdate to the ViewState.
pub fn apply_ui_update(state: &mut ViewState, update: UiUpdate) {
    match update {
        UiUpdate::Root(subject) => {
            state.subject = subject;
        }
        UiUpdate::Game(snapshot) => {
            state.game = Some(*snapshot);
            state.clamp_selection();
        }
        UiUpdate::GameCleared => {
            state.game = None;
            state.chat.clear();
            state.bot_enabled = false;
            state.next_game = NextGame::default();
            state.animation = None;
            state.fatal = None;
            state.last_sound = None;
            state.compose = None;
            state.selected_card = 0;
        }
        UiUpdate::Chat(messages) => {
            state.chat = messages;
        }
        UiUpdate::Bot { enabled } => {
            state.bot_enabled = enabled;
        }
        UiUpdate::Tabs(tabs) => {
            state.tabs = tabs;
            state.clamp_selection();
        }
        UiUpdate::NextGame(next) => {
            state.next_game = next;
        }
        UiUpdate::AnimationStep {
            plan,
            step,
            index,
            total,
        } => {
            state.animation = Some(AnimationView {
                plan,
                step,
                index,
                total,
            });
        }
        UiUpdate::AnimationDone { plan } => {
            if state.animation.is_some_and(|a| a.plan == plan) {
                state.animation = None;
            }
        }
        UiUpdate::Sound(cue) => {
            state.last_sound = Some(cue);
        }
        UiUpdate::Connection(status) => {
            state.connection = status;
        }
        UiUpdate::Fatal(notice) => {
            state.compose = None;
            state.fatal = Some(notice);
        }
    }
}

// ---------------------------------------------------------------------------
// Render frame
// ---------------------------------------------------------------------------

/// Render the complete frame: panels first, then any overlay.
pub fn render_frame(frame: &mut Frame, state: &ViewState) {
    let layout = build_layout(frame.area());

    widgets::status_bar::render(frame, layout.status_bar, state);
    widgets::board::render(frame, layout.board, state);
    widgets::players::render(frame, layout.players, state);
    widgets::tabs::render(frame, layout.tabs, state);
    widgets::chat::render(frame, layout.chat, state);
    widgets::help::render(frame, layout.help_bar, state);

    if let Some(notice) = &state.fatal {
        widgets::dialog::render_fatal(frame, frame.area(), notice);
    } else if state.confirm_quit {
        widgets::dialog::render_quit(frame, frame.area());
    } else if state.show_help {
        widgets::help::render_overlay(frame, frame.area());
    }
}

// ---------------------------------------------------------------------------
// Main TUI loop
// ---------------------------------------------------------------------------

/// Run the TUI event loop until the user quits or the controller hangs up.
pub async fn run(
    mut ui_rx: mpsc::Receiver<UiUpdate>,
    cmd_tx: mpsc::Sender<UserCommand>,
) -> anyhow::Result<()> {
    let mut terminal = ratatui::init();

    // Restore the terminal before the default hook prints the panic.
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        ratatui::restore();
        original_hook(panic_info);
    }));

    let mut view_state = ViewState::default();
    let mut event_stream = EventStream::new();

    let mut render_tick = tokio::time::interval(Duration::from_millis(33));
    render_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            update = ui_rx.recv() => {
                match update {
                    Some(ui_update) => apply_ui_update(&mut view_state, ui_update),
                    None => break,
                }
            }

            maybe_event = event_stream.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key_event))) => {
                        if let Some(command) = input::handle_key(key_event, &mut view_state) {
                            debug!(?command, "sending command");
                            let quit = command == UserCommand::Quit;
                            let _ = cmd_tx.send(command).await;
                            if quit {
                                break;
                            }
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(_)) | None => break,
                }
            }

            _ = render_tick.tick() => {
                terminal.draw(|frame| render_frame(frame, &view_state))?;
            }
        }
    }

    ratatui::restore();
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use cardstories_app::ui::{FatalKind, NextGame};
    use cardstories_core::game::{GamePhase, GameState, OwnHand, Score, Seat};

    pub(crate) fn seat(player_id: u64, picked: bool) -> Seat {
        Seat {
            player_id,
            name: Some(format!("p{player_id}")),
            picked: None,
            has_picked: picked,
            vote: None,
            has_voted: false,
            win: None,
            score: Some(Score {
                level: 2,
                points: 150,
                level_floor: 100,
                level_ceiling: 200,
                earned: 0,
            }),
        }
    }

    pub(crate) fn game(phase: GamePhase, viewer: u64) -> GameSnapshot {
        let state = GameState {
            id: 7,
            modified: 100,
            state: phase,
            owner_id: 1,
            sentence: Some("a quiet storm".into()),
            winner_card: Some(12),
            board: vec![3, 12, 27],
            players: vec![seat(2, true), seat(3, true)],
            invited: Vec::new(),
            ready: false,
            countdown_finish: None,
            hand: Some(OwnHand {
                cards: vec![3, 5, 8, 13, 21, 34],
                picked: Some(3),
                vote: None,
            }),
        };
        GameSnapshot::new(state, Some(viewer))
    }

    pub(crate) fn render_to_text(state: &ViewState, width: u16, height: u16) -> String {
        let backend = ratatui::backend::TestBackend::new(width, height);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();
        terminal.draw(|frame| render_frame(frame, state)).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn view_state_default_is_sensible() {
        let state = ViewState::default();
        assert!(state.game.is_none());
        assert!(state.chat.is_empty());
        assert!(state.tabs.is_empty());
        assert_eq!(state.connection, ConnectionStatus::Idle);
        assert!(state.fatal.is_none());
        assert!(state.compose.is_none());
        assert!(!state.confirm_quit);
        assert_eq!(state.selected(), None);
    }

    #[test]
    fn game_update_clamps_card_selection() {
        let mut state = ViewState::default();
        state.selected_card = 40;
        apply_ui_update(&mut state, UiUpdate::Game(Box::new(game(GamePhase::Vote, 2))));
        // Vote for player 2 hides their own pick (3) from the board.
        assert_eq!(state.game.as_ref().unwrap().selectable, vec![12, 27]);
        assert_eq!(state.selected_card, 1);
        assert_eq!(state.selected(), Some(27));
    }

    #[test]
    fn game_cleared_drops_per_game_state() {
        let mut state = ViewState::default();
        apply_ui_update(&mut state, UiUpdate::Game(Box::new(game(GamePhase::Invitation, 2))));
        apply_ui_update(
            &mut state,
            UiUpdate::Chat(vec![ChatMessage {
                player_id: 2,
                text: "hi".into(),
                created: None,
            }]),
        );
        apply_ui_update(&mut state, UiUpdate::Bot { enabled: true });
        apply_ui_update(
            &mut state,
            UiUpdate::Tabs(vec![TabEntry {
                game_id: 7,
                state: Some(GamePhase::Invitation),
                sentence: None,
            }]),
        );
        apply_ui_update(
            &mut state,
            UiUpdate::NextGame(NextGame {
                game_id: Some(8),
                owner_id: Some(3),
            }),
        );

        apply_ui_update(&mut state, UiUpdate::Sound(SoundCue::LevelUp));
        state.compose = Some(Compose::new(ComposeTarget::Sentence));

        apply_ui_update(&mut state, UiUpdate::GameCleared);
        assert!(state.game.is_none());
        assert!(state.chat.is_empty());
        assert!(!state.bot_enabled);
        assert_eq!(state.next_game, NextGame::default());
        assert_eq!(state.last_sound, None);
        assert!(state.compose.is_none());
        // Tabs belong to the player, not the game.
        assert_eq!(state.tabs.len(), 1);
    }

    #[test]
    fn animation_done_only_clears_matching_plan() {
        let mut state = ViewState::default();
        apply_ui_update(
            &mut state,
            UiUpdate::AnimationStep {
                plan: "vote",
                step: "shuffle_board",
                index: 1,
                total: 3,
            },
        );
        apply_ui_update(&mut state, UiUpdate::AnimationDone { plan: "complete" });
        assert_eq!(state.animation.map(|a| a.step), Some("shuffle_board"));
        apply_ui_update(&mut state, UiUpdate::AnimationDone { plan: "vote" });
        assert!(state.animation.is_none());
    }

    #[test]
    fn fatal_notice_closes_compose() {
        let mut state = ViewState::default();
        state.compose = Some(Compose::new(ComposeTarget::Chat));
        apply_ui_update(
            &mut state,
            UiUpdate::Fatal(FatalNotice {
                kind: FatalKind::StaleState,
                code: Some("WRONG_STATE".into()),
                message: "moved on".into(),
            }),
        );
        assert!(state.compose.is_none());
        assert!(state.fatal.is_some());
    }

    #[test]
    fn render_frame_with_defaults() {
        let text = render_to_text(&ViewState::default(), 100, 30);
        assert!(text.contains("No game"));
    }

    #[test]
    fn render_frame_shows_sentence_and_fatal() {
        let mut state = ViewState::default();
        apply_ui_update(&mut state, UiUpdate::Game(Box::new(game(GamePhase::Invitation, 2))));
        let text = render_to_text(&state, 120, 40);
        assert!(text.contains("a quiet storm"));

        apply_ui_update(
            &mut state,
            UiUpdate::Fatal(FatalNotice {
                kind: FatalKind::Generic,
                code: None,
                message: "boom".into(),
            }),
        );
        let text = render_to_text(&state, 120, 40);
        assert!(text.contains("boom"));
    }

    #[test]
    fn render_frame_tiny_terminal_does_not_panic() {
        let mut state = ViewState::default();
        apply_ui_update(&mut state, UiUpdate::Game(Box::new(game(GamePhase::Complete, 2))));
        state.confirm_quit = true;
        render_to_text(&state, 20, 6);
    }
}
