// Chat history for the current game, bounded to the configured length.

use std::collections::VecDeque;

use serde::Deserialize;

use cardstories_core::protocol::{ProtocolError, Subject, UpdateItem, UpdateKind};

use crate::dispatch::{Effect, UpdateHandler};
use crate::plugins::audio::SoundCue;
use crate::ui::{ChatMessage, UiUpdate};

#[derive(Debug, Deserialize)]
struct ChatPayload {
    #[serde(default)]
    messages: Vec<ChatMessage>,
}

#[derive(Debug)]
pub struct ChatPlugin {
    history: VecDeque<ChatMessage>,
    capacity: usize,
}

impl ChatPlugin {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            history: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    fn push(&mut self, message: ChatMessage) {
        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(message);
    }

    fn effects(&self, from_others: bool) -> Vec<Effect> {
        let mut effects = vec![Effect::Ui(UiUpdate::Chat(self.history.iter().cloned().collect()))];
        if from_others {
            effects.push(Effect::Sound(SoundCue::Chat));
        }
        effects
    }
}

impl UpdateHandler for ChatPlugin {
    fn kind(&self) -> UpdateKind {
        UpdateKind::Chat
    }

    fn subscribed(&self, subject: &Subject) -> bool {
        subject.game_id.is_some()
    }

    fn apply(&mut self, item: &UpdateItem, subject: &Subject) -> Result<Vec<Effect>, ProtocolError> {
        let payload: ChatPayload = item.payload()?;
        if payload.messages.is_empty() {
            return Ok(Vec::new());
        }

        let from_others = payload
            .messages
            .iter()
            .any(|message| Some(message.player_id) != subject.player_id);
        for message in payload.messages {
            self.push(message);
        }

        Ok(self.effects(from_others))
    }

    /// A load carries the whole log. The history is replaced and only the
    /// messages after the last one already held count as new.
    fn load(&mut self, item: &UpdateItem, subject: &Subject) -> Result<Vec<Effect>, ProtocolError> {
        let payload: ChatPayload = item.payload()?;
        let messages = payload.messages;

        let fresh = match self
            .history
            .back()
            .and_then(|last| messages.iter().rposition(|message| message == last))
        {
            Some(last) => &messages[last + 1..],
            None => &messages[..],
        };
        let from_others = fresh
            .iter()
            .any(|message| Some(message.player_id) != subject.player_id);

        let skip = messages.len().saturating_sub(self.capacity);
        let history: VecDeque<ChatMessage> = messages.into_iter().skip(skip).collect();
        if history == self.history {
            return Ok(Vec::new());
        }
        self.history = history;
        Ok(self.effects(from_others))
    }

    fn reset(&mut self) {
        self.history.clear();
    }
}
