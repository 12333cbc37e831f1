// Update handlers and the registry that routes update items to them.
//
// Each handler owns one update kind. Registration rejects a second handler
// for a kind that is already taken, so routing is unambiguous.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;
use tracing::{debug, warn};

use cardstories_core::config::UiConfig;
use cardstories_core::protocol::{ProtocolError, Subject, UpdateItem, UpdateKind};

use crate::animation::AnimationPlan;
use crate::plugins::audio::SoundCue;
use crate::plugins::{BotPlugin, ChatPlugin, GamePlugin, TablePlugin, TabsPlugin};
use crate::ui::UiUpdate;

/// Where a batch of update items came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// A delivered poll: changes since the last `modified`.
    Poll,
    /// A `state` load: the full current state of each kind.
    State,
}

/// What applying an update item asks the controller to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Ui(UiUpdate),
    Animate(AnimationPlan),
    Sound(SoundCue),
}

pub trait UpdateHandler: Send {
    fn kind(&self) -> UpdateKind;

    /// Whether polls for `subject` should ask for this handler's kind.
    fn subscribed(&self, subject: &Subject) -> bool;

    fn apply(&mut self, item: &UpdateItem, subject: &Subject) -> Result<Vec<Effect>, ProtocolError>;

    /// Apply an item from a `state` load. Unlike a poll, a load carries the
    /// kind's whole current state, not what changed since the last poll.
    fn load(&mut self, item: &UpdateItem, subject: &Subject) -> Result<Vec<Effect>, ProtocolError> {
        self.apply(item, subject)
    }

    /// Forget per-game state when the root is torn down.
    fn reset(&mut self) {}
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("a handler for `{kind}` updates is already registered")]
    Duplicate { kind: UpdateKind },
}

#[derive(Default)]
pub struct HandlerRegistry {
    handlers: BTreeMap<UpdateKind, Box<dyn UpdateHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in game, chat, bot, tabs, and table handlers.
    pub fn with_default_plugins(ui: &UiConfig) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        registry.register(Box::new(GamePlugin::new()))?;
        registry.register(Box::new(ChatPlugin::new(ui.chat_history)))?;
        registry.register(Box::new(BotPlugin::new()))?;
        registry.register(Box::new(TabsPlugin::new()))?;
        registry.register(Box::new(TablePlugin::new()))?;
        Ok(registry)
    }

    pub fn register(&mut self, handler: Box<dyn UpdateHandler>) -> Result<(), RegistryError> {
        let kind = handler.kind();
        if self.handlers.contains_key(&kind) {
            return Err(RegistryError::Duplicate { kind });
        }
        self.handlers.insert(kind, handler);
        Ok(())
    }

    pub fn kinds_for(&self, subject: &Subject) -> BTreeSet<UpdateKind> {
        self.handlers
            .iter()
            .filter(|(_, handler)| handler.subscribed(subject))
            .map(|(kind, _)| *kind)
            .collect()
    }

    /// Route polled `items` in order. Unknown or unhandled kinds are
    /// skipped; a payload a handler cannot read stops dispatch.
    pub fn dispatch(
        &mut self,
        items: &[UpdateItem],
        subject: &Subject,
    ) -> Result<Vec<Effect>, ProtocolError> {
        self.route(items, subject, Origin::Poll)
    }

    /// Route `items` that came from `origin`.
    pub fn route(
        &mut self,
        items: &[UpdateItem],
        subject: &Subject,
        origin: Origin,
    ) -> Result<Vec<Effect>, ProtocolError> {
        let mut effects = Vec::new();
        for item in items {
            let Some(kind) = item.update_kind() else {
                warn!(kind = %item.kind, "skipping update of unknown kind");
                continue;
            };
            let Some(handler) = self.handlers.get_mut(&kind) else {
                debug!(%kind, "no handler registered, skipping update");
                continue;
            };
            let applied = match origin {
                Origin::Poll => handler.apply(item, subject)?,
                Origin::State => handler.load(item, subject)?,
            };
            effects.extend(applied);
        }
        Ok(effects)
    }

    pub fn reset_all(&mut self) {
        for handler in self.handlers.values_mut() {
            handler.reset();
        }
    }
}
