// Tracks the next game at the current table.

use cardstories_core::protocol::{ProtocolError, Subject, UpdateItem, UpdateKind};

use crate::dispatch::{Effect, UpdateHandler};
use crate::ui::{NextGame, UiUpdate};

#[derive(Debug, Default)]
pub struct TablePlugin {
    next: Option<NextGame>,
}

impl TablePlugin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UpdateHandler for TablePlugin {
    fn kind(&self) -> UpdateKind {
        UpdateKind::Table
    }

    fn subscribed(&self, subject: &Subject) -> bool {
        subject.game_id.is_some()
    }

    fn apply(&mut self, item: &UpdateItem, _subject: &Subject) -> Result<Vec<Effect>, ProtocolError> {
        let next: NextGame = item.payload()?;
        if self.next == Some(next) {
            return Ok(Vec::new());
        }
        self.next = Some(next);
        Ok(vec![Effect::Ui(UiUpdate::NextGame(next))])
    }

    fn reset(&mut self) {
        self.next = None;
    }
}
