// Game payload model: phases, seats, roles, allowed actions, phase
// transitions, score progress, and countdowns.
//
// The server owns the game rules. Everything here is derived from the
// payload of a `game` update item and only decides what the viewer may
// attempt and how the view should change.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::protocol::{GameId, PlayerId};

pub type Card = u8;

/// Players (besides the author) that must have picked before the author
/// can open the vote.
pub const MIN_PICKS_FOR_VOTING: usize = 2;

/// Players that must have voted before the author can publish results.
pub const MIN_VOTES_FOR_COMPLETE: usize = 2;

// ---------------------------------------------------------------------------
// Payload types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GamePhase {
    /// The author is choosing a card and writing the sentence.
    Create,
    /// Players join and pick cards matching the sentence.
    Invitation,
    /// Players vote for the card they think is the author's.
    Vote,
    /// Results are published.
    Complete,
    Canceled,
}

impl GamePhase {
    pub fn label(self) -> &'static str {
        match self {
            GamePhase::Create => "Writing the story",
            GamePhase::Invitation => "Picking cards",
            GamePhase::Vote => "Voting",
            GamePhase::Complete => "Results",
            GamePhase::Canceled => "Canceled",
        }
    }

    pub fn is_over(self) -> bool {
        matches!(self, GamePhase::Complete | GamePhase::Canceled)
    }
}

/// Score and level of one player, as shown on the results screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Score {
    pub level: u32,
    pub points: u64,
    /// Points at which the current level started.
    pub level_floor: u64,
    /// Points needed for the next level.
    pub level_ceiling: u64,
    /// Points earned in this game.
    #[serde(default)]
    pub earned: u64,
}

impl Score {
    /// Progress through the current level in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        if self.level_ceiling <= self.level_floor {
            return 1.0;
        }
        let span = (self.level_ceiling - self.level_floor) as f64;
        let into = self.points.saturating_sub(self.level_floor) as f64;
        (into / span).clamp(0.0, 1.0)
    }

    /// Whether this game's points carried the player over a level boundary.
    pub fn leveled_up(&self) -> bool {
        self.earned > 0 && self.points.saturating_sub(self.earned) < self.level_floor
    }
}

/// One seat at the table. The author is not seated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Seat {
    pub player_id: PlayerId,
    #[serde(default)]
    pub name: Option<String>,
    /// Card put on the board. Other players' picks stay hidden (`None`)
    /// until results.
    #[serde(default)]
    pub picked: Option<Card>,
    /// Whether the player has picked, even when the card itself is hidden.
    #[serde(default)]
    pub has_picked: bool,
    #[serde(default)]
    pub vote: Option<Card>,
    #[serde(default)]
    pub has_voted: bool,
    #[serde(default)]
    pub win: Option<bool>,
    #[serde(default)]
    pub score: Option<Score>,
}

impl Seat {
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("player {}", self.player_id))
    }

    pub fn picked(&self) -> bool {
        self.has_picked || self.picked.is_some()
    }

    pub fn voted(&self) -> bool {
        self.has_voted || self.vote.is_some()
    }
}

/// The viewer's private hand, only present when the viewer plays.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OwnHand {
    #[serde(default)]
    pub cards: Vec<Card>,
    #[serde(default)]
    pub picked: Option<Card>,
    #[serde(default)]
    pub vote: Option<Card>,
}

/// Payload of a `game` update item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub id: GameId,
    #[serde(default)]
    pub modified: u64,
    pub state: GamePhase,
    pub owner_id: PlayerId,
    #[serde(default)]
    pub sentence: Option<String>,
    /// The author's card. Visible to the author at all times, to everyone
    /// once results are out.
    #[serde(default)]
    pub winner_card: Option<Card>,
    #[serde(default)]
    pub board: Vec<Card>,
    #[serde(default)]
    pub players: Vec<Seat>,
    #[serde(default)]
    pub invited: Vec<PlayerId>,
    /// Whether enough players picked for the author to open the vote.
    #[serde(default)]
    pub ready: bool,
    /// Epoch milliseconds at which the current phase's countdown ends.
    #[serde(default)]
    pub countdown_finish: Option<i64>,
    #[serde(default, rename = "self")]
    pub hand: Option<OwnHand>,
}

// ---------------------------------------------------------------------------
// Derived view
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Author,
    Player,
    Spectator,
}

/// What the viewer can attempt right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    SetCard,
    SetSentence,
    Invite,
    Participate,
    Pick,
    Voting,
    Vote,
    Complete,
    NextGame,
}

impl ActionKind {
    pub fn label(self) -> &'static str {
        match self {
            ActionKind::SetCard => "choose your card",
            ActionKind::SetSentence => "write the sentence",
            ActionKind::Invite => "invite players",
            ActionKind::Participate => "join the game",
            ActionKind::Pick => "pick a card",
            ActionKind::Voting => "open the vote",
            ActionKind::Vote => "vote",
            ActionKind::Complete => "publish results",
            ActionKind::NextGame => "next game",
        }
    }
}

impl GameState {
    pub fn role(&self, viewer: Option<PlayerId>) -> Role {
        match viewer {
            Some(id) if id == self.owner_id => Role::Author,
            Some(id) if self.seat(id).is_some() => Role::Player,
            _ => Role::Spectator,
        }
    }

    pub fn seat(&self, player_id: PlayerId) -> Option<&Seat> {
        self.players.iter().find(|seat| seat.player_id == player_id)
    }

    pub fn picked_count(&self) -> usize {
        self.players.iter().filter(|seat| seat.picked()).count()
    }

    pub fn voted_count(&self) -> usize {
        self.players.iter().filter(|seat| seat.voted()).count()
    }

    /// The cards the viewer chooses from in the current phase: the hand
    /// while creating or picking, the board while voting.
    pub fn selectable_cards(&self, viewer: Option<PlayerId>) -> Vec<Card> {
        match (self.state, self.role(viewer)) {
            (GamePhase::Vote, Role::Player) => {
                let own = self.hand.as_ref().and_then(|hand| hand.picked);
                self.board
                    .iter()
                    .copied()
                    .filter(|card| Some(*card) != own)
                    .collect()
            }
            (GamePhase::Create | GamePhase::Invitation, Role::Author | Role::Player) => self
                .hand
                .as_ref()
                .map(|hand| hand.cards.clone())
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    pub fn allowed_actions(&self, viewer: Option<PlayerId>) -> Vec<ActionKind> {
        let role = self.role(viewer);
        let seat = viewer.and_then(|id| self.seat(id));
        let mut actions = Vec::new();

        match (self.state, role) {
            (GamePhase::Create, Role::Author) => {
                if self.winner_card.is_none() {
                    actions.push(ActionKind::SetCard);
                } else {
                    actions.push(ActionKind::SetSentence);
                }
            }
            (GamePhase::Invitation, Role::Author) => {
                actions.push(ActionKind::Invite);
                if self.ready || self.picked_count() >= MIN_PICKS_FOR_VOTING {
                    actions.push(ActionKind::Voting);
                }
            }
            (GamePhase::Invitation, Role::Spectator) if viewer.is_some() => {
                actions.push(ActionKind::Participate);
            }
            (GamePhase::Invitation, Role::Player) => {
                if seat.is_some_and(|s| !s.picked()) {
                    actions.push(ActionKind::Pick);
                }
            }
            (GamePhase::Vote, Role::Player) => {
                if seat.is_some_and(|s| s.picked() && !s.voted()) {
                    actions.push(ActionKind::Vote);
                }
            }
            (GamePhase::Vote, Role::Author) => {
                if self.voted_count() >= MIN_VOTES_FOR_COMPLETE {
                    actions.push(ActionKind::Complete);
                }
            }
            (phase, _) if phase.is_over() => actions.push(ActionKind::NextGame),
            _ => {}
        }
        actions
    }

    /// Time left on the countdown, never negative.
    pub fn countdown_remaining(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        let finish = Utc.timestamp_millis_opt(self.countdown_finish?).single()?;
        let left = finish - now;
        Some(left.max(chrono::Duration::zero()))
    }
}

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

/// A phase change between two successive states of the same game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTransition {
    /// `None` when the game is shown for the first time.
    pub from: Option<GamePhase>,
    pub to: GamePhase,
}

/// Detect a phase change. A different game id counts as a first showing.
pub fn detect_transition(previous: Option<&GameState>, next: &GameState) -> Option<PhaseTransition> {
    match previous {
        Some(prev) if prev.id == next.id && prev.state == next.state => None,
        Some(prev) if prev.id == next.id => Some(PhaseTransition {
            from: Some(prev.state),
            to: next.state,
        }),
        _ => Some(PhaseTransition {
            from: None,
            to: next.state,
        }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
