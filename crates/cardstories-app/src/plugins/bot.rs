// Mirrors whether bots fill empty seats in the current game.

use serde::Deserialize;

use cardstories_core::protocol::{ProtocolError, Subject, UpdateItem, UpdateKind};

use crate::dispatch::{Effect, UpdateHandler};
use crate::ui::UiUpdate;

#[derive(Debug, Deserialize)]
struct BotPayload {
    enabled: bool,
}

#[derive(Debug, Default)]
pub struct BotPlugin {
    enabled: Option<bool>,
}

impl BotPlugin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UpdateHandler for BotPlugin {
    fn kind(&self) -> UpdateKind {
        UpdateKind::Bot
    }

    fn subscribed(&self, subject: &Subject) -> bool {
        subject.game_id.is_some() && subject.player_id.is_some()
    }

    fn apply(&mut self, item: &UpdateItem, _subject: &Subject) -> Result<Vec<Effect>, ProtocolError> {
        let payload: BotPayload = item.payload()?;
        if self.enabled == Some(payload.enabled) {
            return Ok(Vec::new());
        }
        self.enabled = Some(payload.enabled);
        Ok(vec![Effect::Ui(UiUpdate::Bot {
            enabled: payload.enabled,
        })])
    }

    fn reset(&mut self) {
        self.enabled = None;
    }
}
