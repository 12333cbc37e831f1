// Root controller and its event loop.
//
// `RootContext` owns everything that belongs to one game view: the
// subject, the poller, the handler registry, the action client, the
// animation scheduler, and the error surface. The event loop serializes
// poll events and user commands, handling one at a time.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use cardstories_core::config::Config;
use cardstories_core::protocol::{Action, GameId, Subject, UpdateItem};
use cardstories_core::session::{NotStarted, PollPhase};

use crate::actions::ActionClient;
use crate::animation::AnimationScheduler;
use crate::dispatch::{Effect, HandlerRegistry, Origin, RegistryError};
use crate::error::ClientError;
use crate::panic::ErrorSurface;
use crate::poller::{PollEvent, PollOutcome, Poller};
use crate::transport::Transport;
use crate::ui::{ConnectionStatus, UiUpdate, UserCommand};

/// Capacity of the channel spawned poll tasks report on.
const POLL_EVENT_BUFFER: usize = 16;

// ---------------------------------------------------------------------------
// RootContext
// ---------------------------------------------------------------------------

pub struct RootContext {
    config: Config,
    subject: Subject,
    poller: Poller,
    registry: HandlerRegistry,
    actions: ActionClient,
    animations: AnimationScheduler,
    errors: ErrorSurface,
    ui_tx: mpsc::Sender<UiUpdate>,
    /// Game that follows this one at the table, as last reported.
    next_game: Option<GameId>,
    /// Last status sent to the view.
    connection: Option<ConnectionStatus>,
}

impl RootContext {
    /// Context with the built-in plugins. Also returns the receiver the
    /// event loop must read poll events from.
    pub fn new(
        config: Config,
        subject: Subject,
        transport: Arc<dyn Transport>,
        ui_tx: mpsc::Sender<UiUpdate>,
    ) -> Result<(Self, mpsc::Receiver<PollEvent>), RegistryError> {
        let registry = HandlerRegistry::with_default_plugins(&config.ui)?;
        Ok(Self::with_registry(config, subject, transport, registry, ui_tx))
    }

    pub fn with_registry(
        config: Config,
        subject: Subject,
        transport: Arc<dyn Transport>,
        registry: HandlerRegistry,
        ui_tx: mpsc::Sender<UiUpdate>,
    ) -> (Self, mpsc::Receiver<PollEvent>) {
        let (poll_tx, poll_rx) = mpsc::channel(POLL_EVENT_BUFFER);
        let context = Self {
            poller: Poller::new(Arc::clone(&transport), config.retry_delay(), poll_tx),
            actions: ActionClient::new(transport),
            animations: AnimationScheduler::new(ui_tx.clone()),
            errors: ErrorSurface::new(),
            config,
            subject,
            registry,
            ui_tx,
            next_game: None,
            connection: None,
        };
        (context, poll_rx)
    }

    pub fn subject(&self) -> Subject {
        self.subject
    }

    pub fn poller(&self) -> &Poller {
        &self.poller
    }

    pub fn animations(&self) -> &AnimationScheduler {
        &self.animations
    }

    /// Load state for the subject, dispatch it, then start polling.
    pub async fn bootstrap(&mut self) {
        info!(subject = ?self.subject, "bootstrapping root");
        self.errors.resume();
        let _ = self.ui_tx.send(UiUpdate::Root(self.subject)).await;
        self.refresh().await;
    }

    /// Tear the root down and bootstrap it again for `game_id`.
    pub async fn navigate(&mut self, game_id: Option<GameId>) {
        info!(from = ?self.subject.game_id, to = ?game_id, "navigating");
        self.animations.cancel();
        self.poller.reset();
        self.registry.reset_all();
        self.next_game = None;
        self.subject.game_id = game_id;
        let _ = self.ui_tx.send(UiUpdate::GameCleared).await;
        self.bootstrap().await;
    }

    /// Same subject, fresh start. Used to acknowledge a fatal notice.
    pub async fn reload(&mut self) {
        self.navigate(self.subject.game_id).await;
    }

    /// Stop everything. Errors from here on are only logged.
    pub async fn teardown(&mut self) {
        info!("tearing down root");
        self.errors.suppress();
        self.poller.discard();
        self.animations.cancel();
        self.sync_connection().await;
    }

    pub async fn handle_poll_event(&mut self, event: PollEvent) {
        match self.poller.handle_event(event) {
            PollOutcome::Delivered { items, .. } => {
                if self.dispatch(&items, Origin::Poll).await {
                    self.arm().await;
                }
            }
            PollOutcome::Failed(failure) => self.surface(failure.into()).await,
            PollOutcome::Pending => {}
        }
        self.sync_connection().await;
    }

    pub async fn handle_command(&mut self, command: UserCommand) {
        debug!(?command, "user command");
        let action = match command {
            UserCommand::Open { game_id } => return self.navigate(Some(game_id)).await,
            UserCommand::Reload => return self.reload().await,
            UserCommand::NextGame => match self.next_game {
                Some(game_id) => return self.navigate(Some(game_id)).await,
                None => Action::Create,
            },
            UserCommand::Quit => return self.teardown().await,
            UserCommand::Create => Action::Create,
            UserCommand::SetCard { card } => Action::SetCard { card },
            UserCommand::SetSentence { sentence } => Action::SetSentence { sentence },
            UserCommand::Invite { players } => Action::Invite { invited: players },
            UserCommand::Participate => Action::Participate,
            UserCommand::Pick { card } => Action::Pick { card },
            UserCommand::Voting => Action::Voting,
            UserCommand::Vote { card } => Action::Vote { card },
            UserCommand::Complete => Action::Complete,
            UserCommand::SetCountdown { seconds } => Action::SetCountdown { seconds },
            UserCommand::SendChat { text } => Action::Message { text },
            UserCommand::SetBot { enable } => Action::Bot { enable },
            UserCommand::CloseTab { game_id } => Action::RemoveTab { game_id },
        };
        self.perform(action).await;
    }

    /// Run a one-shot action, awaited inline. Mutating actions discard the
    /// outstanding poll first; on success state is reloaded and the poll
    /// re-armed, except for `create`, which navigates to the new game.
    pub async fn perform(&mut self, action: Action) {
        if action.mutates() {
            self.poller.discard();
            self.sync_connection().await;
        }
        info!(action = action.name(), "performing action");

        if matches!(action, Action::Create) {
            match self.actions.create(&self.subject).await {
                Ok(game_id) => self.navigate(Some(game_id)).await,
                Err(e) => self.surface(e).await,
            }
            return;
        }

        match self.actions.send(&self.subject, &action).await {
            Ok(_) => self.refresh().await,
            Err(e) => self.surface(e).await,
        }
    }

    /// Load state for the subscribed kinds, dispatch it, and re-arm.
    async fn refresh(&mut self) {
        let kinds = self.registry.kinds_for(&self.subject);
        if kinds.is_empty() {
            info!("nothing to load for this subject");
            self.sync_connection().await;
            return;
        }
        match self.actions.load_state(&self.subject, kinds).await {
            Ok(items) => {
                self.poller.observe(&items);
                if self.dispatch(&items, Origin::State).await {
                    self.arm().await;
                }
            }
            Err(e) => self.surface(e).await,
        }
        self.sync_connection().await;
    }

    async fn arm(&mut self) {
        let kinds = self.registry.kinds_for(&self.subject);
        match self.poller.start(self.subject, kinds) {
            Ok(generation) => debug!(generation, "poll armed"),
            Err(NotStarted::InFlight) => debug!("poll already in flight"),
            Err(NotStarted::NothingToRequest) => debug!("no kinds to poll for"),
        }
    }

    /// Route items through the registry and carry out the effects. Returns
    /// false when a payload could not be read.
    async fn dispatch(&mut self, items: &[UpdateItem], origin: Origin) -> bool {
        match self.registry.route(items, &self.subject, origin) {
            Ok(effects) => {
                for effect in effects {
                    self.apply(effect).await;
                }
                true
            }
            Err(e) => {
                self.surface(e.into()).await;
                false
            }
        }
    }

    async fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::Ui(update) => {
                if let UiUpdate::NextGame(next) = &update {
                    self.next_game = next.game_id;
                }
                let _ = self.ui_tx.send(update).await;
            }
            Effect::Animate(plan) => {
                self.animations
                    .play(plan.scaled(self.config.ui.animation_speed));
            }
            Effect::Sound(cue) => {
                if self.config.ui.sound {
                    let _ = self.ui_tx.send(UiUpdate::Sound(cue)).await;
                }
            }
        }
    }

    async fn surface(&mut self, err: ClientError) {
        if let Some(notice) = self.errors.report(&err) {
            self.animations.cancel();
            let _ = self.ui_tx.send(UiUpdate::Fatal(notice)).await;
        }
    }

    async fn sync_connection(&mut self) {
        let status = match self.poller.phase() {
            PollPhase::Idle => ConnectionStatus::Idle,
            PollPhase::Polling => ConnectionStatus::Polling,
            PollPhase::RetryPending => ConnectionStatus::Retrying,
        };
        if self.connection != Some(status) {
            self.connection = Some(status);
            let _ = self.ui_tx.send(UiUpdate::Connection(status)).await;
        }
    }
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

/// Run the controller until the view quits or hangs up.
///
/// Listens on two channels using `tokio::select!`:
/// 1. Poll events from the poller's spawned tasks
/// 2. User commands from the TUI
pub async fn run(
    mut cmd_rx: mpsc::Receiver<UserCommand>,
    mut poll_rx: mpsc::Receiver<PollEvent>,
    mut context: RootContext,
) -> anyhow::Result<()> {
    info!("Controller event loop started");
    context.bootstrap().await;

    loop {
        tokio::select! {
            event = poll_rx.recv() => {
                match event {
                    Some(event) => context.handle_poll_event(event).await,
                    None => {
                        info!("Poll channel closed, shutting down");
                        break;
                    }
                }
            }

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UserCommand::Quit) => {
                        info!("Quit command received, shutting down");
                        break;
                    }
                    Some(cmd) => context.handle_command(cmd).await,
                    None => {
                        info!("Command channel closed, shutting down");
                        break;
                    }
                }
            }
        }
    }

    context.teardown().await;
    info!("Controller event loop exiting");
    Ok(())
}
