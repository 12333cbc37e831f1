// Mirrors the player's list of open games.

use serde::Deserialize;

use cardstories_core::protocol::{ProtocolError, Subject, UpdateItem, UpdateKind};

use crate::dispatch::{Effect, UpdateHandler};
use crate::ui::{TabEntry, UiUpdate};

#[derive(Debug, Deserialize)]
struct TabsPayload {
    #[serde(default)]
    games: Vec<TabEntry>,
}

#[derive(Debug, Default)]
pub struct TabsPlugin {
    tabs: Vec<TabEntry>,
}

impl TabsPlugin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UpdateHandler for TabsPlugin {
    fn kind(&self) -> UpdateKind {
        UpdateKind::Tabs
    }

    fn subscribed(&self, subject: &Subject) -> bool {
        subject.player_id.is_some()
    }

    fn apply(&mut self, item: &UpdateItem, _subject: &Subject) -> Result<Vec<Effect>, ProtocolError> {
        let payload: TabsPayload = item.payload()?;
        self.tabs = payload.games;
        Ok(vec![Effect::Ui(UiUpdate::Tabs(self.tabs.clone()))])
    }

    // Tabs belong to the player, not the game; they survive navigation.
}
