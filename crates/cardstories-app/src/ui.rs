// Messages between the controller and the view.
//
// `UiUpdate` flows controller -> view, `UserCommand` flows view ->
// controller. Both travel over tokio mpsc channels.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cardstories_core::game::{ActionKind, Card, GamePhase, GameState, Role};
use cardstories_core::protocol::{GameId, PlayerId, Subject};

use crate::plugins::audio::SoundCue;

// ---------------------------------------------------------------------------
// View payloads
// ---------------------------------------------------------------------------

/// Everything the view needs to draw the current game.
#[derive(Debug, Clone, PartialEq)]
pub struct GameSnapshot {
    pub state: GameState,
    pub viewer: Option<PlayerId>,
    pub role: Role,
    pub actions: Vec<ActionKind>,
    /// Cards the viewer may choose from right now.
    pub selectable: Vec<Card>,
    /// The viewer reached a new level in this game.
    pub level_up: bool,
}

impl GameSnapshot {
    pub fn new(state: GameState, viewer: Option<PlayerId>) -> Self {
        let role = state.role(viewer);
        let actions = state.allowed_actions(viewer);
        let selectable = state.selectable_cards(viewer);
        let level_up = state.state == GamePhase::Complete
            && viewer
                .and_then(|id| state.seat(id))
                .and_then(|seat| seat.score)
                .is_some_and(|score| score.leveled_up());
        Self {
            state,
            viewer,
            role,
            actions,
            selectable,
            level_up,
        }
    }

    pub fn can(&self, action: ActionKind) -> bool {
        self.actions.contains(&action)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub player_id: PlayerId,
    pub text: String,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
}

/// One of the player's open games.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabEntry {
    #[serde(rename = "id")]
    pub game_id: GameId,
    #[serde(default)]
    pub state: Option<GamePhase>,
    #[serde(default)]
    pub sentence: Option<String>,
}

/// The game that follows the current one at the same table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NextGame {
    #[serde(default, rename = "next_game_id")]
    pub game_id: Option<GameId>,
    #[serde(default, rename = "next_owner_id")]
    pub owner_id: Option<PlayerId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Idle,
    Polling,
    /// Waiting to retry after a network failure.
    Retrying,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatalKind {
    Generic,
    /// The player acted on a phase the game has already left.
    StaleState,
}

/// Blocking error notice. Acknowledging it reloads the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FatalNotice {
    pub kind: FatalKind,
    pub code: Option<String>,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Channel messages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum UiUpdate {
    /// The root was (re)bootstrapped for this subject.
    Root(Subject),
    Game(Box<GameSnapshot>),
    /// Navigation away from the current game; drop all per-game view state.
    GameCleared,
    Chat(Vec<ChatMessage>),
    Bot { enabled: bool },
    Tabs(Vec<TabEntry>),
    NextGame(NextGame),
    AnimationStep {
        plan: &'static str,
        step: &'static str,
        index: usize,
        total: usize,
    },
    AnimationDone { plan: &'static str },
    Sound(SoundCue),
    Connection(ConnectionStatus),
    Fatal(FatalNotice),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    Open { game_id: GameId },
    Create,
    SetCard { card: Card },
    SetSentence { sentence: String },
    Invite { players: Vec<PlayerId> },
    Participate,
    Pick { card: Card },
    Voting,
    Vote { card: Card },
    Complete,
    SetCountdown { seconds: u32 },
    SendChat { text: String },
    SetBot { enable: bool },
    CloseTab { game_id: GameId },
    NextGame,
    /// Acknowledge a fatal notice: tear down and bootstrap again.
    Reload,
    Quit,
}
