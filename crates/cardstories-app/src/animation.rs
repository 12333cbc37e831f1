// Animation plans and the scheduler that plays them.
//
// A plan is a finite, named list of steps. The scheduler announces each
// step to the view in order, waits the step's duration, and finishes with
// a completion notice. Only one plan runs per root; starting a plan or
// cancelling stops the running one before it announces anything else.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use cardstories_core::game::{GamePhase, PhaseTransition};

use crate::ui::UiUpdate;

// ---------------------------------------------------------------------------
// Plans
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationStep {
    pub name: &'static str,
    pub duration: Duration,
}

const fn step(name: &'static str, millis: u64) -> AnimationStep {
    AnimationStep {
        name,
        duration: Duration::from_millis(millis),
    }
}

const INVITATION_STEPS: &[AnimationStep] = &[step("show_sentence", 600), step("deal_hand", 900)];

const VOTE_STEPS: &[AnimationStep] = &[
    step("collect_cards", 500),
    step("shuffle_board", 700),
    step("reveal_board", 600),
];

const COMPLETE_STEPS: &[AnimationStep] = &[
    step("reveal_votes", 800),
    step("reveal_author_card", 800),
    step("tally_scores", 1000),
    step("show_progress", 1200),
];

const CANCELED_STEPS: &[AnimationStep] = &[step("fold_table", 500)];

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationPlan {
    pub name: &'static str,
    pub steps: Vec<AnimationStep>,
}

impl AnimationPlan {
    /// The plan for entering `transition.to`. Games shown for the first
    /// time are drawn as they are, without animation.
    pub fn for_transition(transition: PhaseTransition) -> Option<Self> {
        transition.from?;
        let (name, steps) = match transition.to {
            GamePhase::Create => return None,
            GamePhase::Invitation => ("invitation", INVITATION_STEPS),
            GamePhase::Vote => ("vote", VOTE_STEPS),
            GamePhase::Complete => ("complete", COMPLETE_STEPS),
            GamePhase::Canceled => ("canceled", CANCELED_STEPS),
        };
        Some(Self {
            name,
            steps: steps.to_vec(),
        })
    }

    /// Divide every duration by `speed`. Non-positive speeds are ignored.
    pub fn scaled(mut self, speed: f64) -> Self {
        if speed.is_finite() && speed > 0.0 {
            for step in &mut self.steps {
                step.duration = step.duration.div_f64(speed);
            }
        }
        self
    }

    pub fn total_duration(&self) -> Duration {
        self.steps.iter().map(|step| step.duration).sum()
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

pub struct AnimationScheduler {
    ui_tx: mpsc::Sender<UiUpdate>,
    task: Option<JoinHandle<()>>,
    /// Identifies the plan allowed to announce steps.
    current: Arc<AtomicU64>,
}

impl AnimationScheduler {
    pub fn new(ui_tx: mpsc::Sender<UiUpdate>) -> Self {
        Self {
            ui_tx,
            task: None,
            current: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Play `plan`, cancelling whatever is running.
    pub fn play(&mut self, plan: AnimationPlan) {
        self.cancel();
        let run = self.current.load(Ordering::SeqCst);
        let current = Arc::clone(&self.current);
        let tx = self.ui_tx.clone();
        debug!(plan = plan.name, steps = plan.steps.len(), "playing animation");

        self.task = Some(tokio::spawn(async move {
            let total = plan.steps.len();
            for (index, step) in plan.steps.iter().enumerate() {
                if current.load(Ordering::SeqCst) != run {
                    return;
                }
                let update = UiUpdate::AnimationStep {
                    plan: plan.name,
                    step: step.name,
                    index,
                    total,
                };
                if tx.send(update).await.is_err() {
                    return;
                }
                tokio::time::sleep(step.duration).await;
            }
            if current.load(Ordering::SeqCst) == run {
                let _ = tx.send(UiUpdate::AnimationDone { plan: plan.name }).await;
            }
        }));
    }

    /// Stop the running plan. Returns whether one was running.
    pub fn cancel(&mut self) -> bool {
        self.current.fetch_add(1, Ordering::SeqCst);
        match self.task.take() {
            Some(handle) => {
                let running = !handle.is_finished();
                handle.abort();
                if running {
                    debug!("cancelled animation");
                }
                running
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for AnimationScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn entering(to: GamePhase) -> PhaseTransition {
        PhaseTransition {
            from: Some(GamePhase::Invitation),
            to,
        }
    }

    fn step_names(plan: &AnimationPlan) -> Vec<&'static str> {
        plan.steps.iter().map(|s| s.name).collect()
    }

    #[test]
    fn plans_per_phase() {
        let vote = AnimationPlan::for_transition(entering(GamePhase::Vote)).unwrap();
        assert_eq!(vote.name, "vote");
        assert_eq!(
            step_names(&vote),
            vec!["collect_cards", "shuffle_board", "reveal_board"]
        );

        let complete = AnimationPlan::for_transition(entering(GamePhase::Complete)).unwrap();
        assert_eq!(
            step_names(&complete),
            vec![
                "reveal_votes",
                "reveal_author_card",
                "tally_scores",
                "show_progress"
            ]
        );

        let canceled = AnimationPlan::for_transition(entering(GamePhase::Canceled)).unwrap();
        assert_eq!(step_names(&canceled), vec!["fold_table"]);

        let invitation = AnimationPlan::for_transition(PhaseTransition {
            from: Some(GamePhase::Create),
            to: GamePhase::Invitation,
        })
        .unwrap();
        assert_eq!(step_names(&invitation), vec!["show_sentence", "deal_hand"]);
    }

    #[test]
    fn first_showing_has_no_plan() {
        let t = PhaseTransition {
            from: None,
            to: GamePhase::Vote,
        };
        assert_eq!(AnimationPlan::for_transition(t), None);
    }

    #[test]
    fn scaling_divides_durations() {
        let plan = AnimationPlan::for_transition(entering(GamePhase::Vote)).unwrap();
        let total = plan.total_duration();
        assert_eq!(total, Duration::from_millis(1800));

        let fast = plan.clone().scaled(2.0);
        assert_eq!(fast.total_duration(), Duration::from_millis(900));

        let unchanged = plan.scaled(0.0);
        assert_eq!(unchanged.total_duration(), total);
    }

    #[tokio::test]
    async fn announces_steps_in_order_then_done() {
        tokio::time::pause();
        let (tx, mut rx) = mpsc::channel(16);
        let mut scheduler = AnimationScheduler::new(tx);
        let plan = AnimationPlan::for_transition(entering(GamePhase::Vote)).unwrap();

        scheduler.play(plan);
        let mut steps = Vec::new();
        loop {
            match rx.recv().await.unwrap() {
                UiUpdate::AnimationStep { step, index, total, .. } => {
                    assert_eq!(total, 3);
                    assert_eq!(index, steps.len());
                    steps.push(step);
                }
                UiUpdate::AnimationDone { plan } => {
                    assert_eq!(plan, "vote");
                    break;
                }
                other => panic!("unexpected update {other:?}"),
            }
        }
        assert_eq!(steps, vec!["collect_cards", "shuffle_board", "reveal_board"]);
    }

    #[tokio::test]
    async fn cancelled_plan_announces_nothing_more() {
        tokio::time::pause();
        let (tx, mut rx) = mpsc::channel(16);
        let mut scheduler = AnimationScheduler::new(tx);
        let plan = AnimationPlan::for_transition(entering(GamePhase::Complete)).unwrap();

        scheduler.play(plan);
        let first = rx.recv().await.unwrap();
        assert!(matches!(first, UiUpdate::AnimationStep { index: 0, .. }));
        assert!(scheduler.is_running());

        assert!(scheduler.cancel());
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(rx.try_recv().is_err());
        assert!(!scheduler.is_running());
    }

    #[tokio::test]
    async fn new_plan_replaces_running_one() {
        tokio::time::pause();
        let (tx, mut rx) = mpsc::channel(16);
        let mut scheduler = AnimationScheduler::new(tx);

        scheduler.play(AnimationPlan::for_transition(entering(GamePhase::Vote)).unwrap());
        let first = rx.recv().await.unwrap();
        assert!(matches!(first, UiUpdate::AnimationStep { plan: "vote", .. }));

        scheduler.play(AnimationPlan::for_transition(entering(GamePhase::Canceled)).unwrap());
        let mut seen = Vec::new();
        while let Some(update) = rx.recv().await {
            let done = matches!(update, UiUpdate::AnimationDone { .. });
            seen.push(update);
            if done {
                break;
            }
        }
        assert_eq!(
            seen,
            vec![
                UiUpdate::AnimationStep {
                    plan: "canceled",
                    step: "fold_table",
                    index: 0,
                    total: 1
                },
                UiUpdate::AnimationDone { plan: "canceled" },
            ]
        );
    }
}
