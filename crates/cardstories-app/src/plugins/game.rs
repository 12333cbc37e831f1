// Game state handler: builds the view snapshot, detects phase changes, and
// asks for the matching animation and sound.

use tracing::info;

use cardstories_core::game::{detect_transition, GamePhase, GameState};
use cardstories_core::protocol::{ProtocolError, Subject, UpdateItem, UpdateKind};

use crate::animation::AnimationPlan;
use crate::dispatch::{Effect, UpdateHandler};
use crate::plugins::audio::{cue_for_transition, SoundCue};
use crate::ui::{GameSnapshot, UiUpdate};

#[derive(Debug, Default)]
pub struct GamePlugin {
    /// Last state shown, to detect transitions.
    current: Option<GameState>,
}

impl GamePlugin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&GameState> {
        self.current.as_ref()
    }
}

impl UpdateHandler for GamePlugin {
    fn kind(&self) -> UpdateKind {
        UpdateKind::Game
    }

    fn subscribed(&self, subject: &Subject) -> bool {
        subject.game_id.is_some()
    }

    fn apply(&mut self, item: &UpdateItem, subject: &Subject) -> Result<Vec<Effect>, ProtocolError> {
        let state: GameState = item.payload()?;
        let transition = detect_transition(self.current.as_ref(), &state);
        let snapshot = GameSnapshot::new(state.clone(), subject.player_id);

        let mut effects = Vec::new();
        let level_up = snapshot.level_up;
        effects.push(Effect::Ui(UiUpdate::Game(Box::new(snapshot))));

        if let Some(transition) = transition {
            info!(
                game_id = state.id,
                from = ?transition.from,
                to = ?transition.to,
                "game phase changed"
            );
            if let Some(plan) = AnimationPlan::for_transition(transition) {
                effects.push(Effect::Animate(plan));
            }
            if let Some(cue) = cue_for_transition(transition) {
                effects.push(Effect::Sound(cue));
            }
            if level_up && transition.to == GamePhase::Complete {
                effects.push(Effect::Sound(SoundCue::LevelUp));
            }
        }

        self.current = Some(state);
        Ok(effects)
    }

    fn reset(&mut self) {
        self.current = None;
    }
}
