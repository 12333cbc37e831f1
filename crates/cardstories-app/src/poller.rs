// Long-poll driver.
//
// Runs the `PollSession` against a `Transport`. Requests and retry timers
// live in spawned tokio tasks that report back over an mpsc channel,
// tagged with the generation they were started for. The controller feeds
// those events into `handle_event` from its own event loop, so the session
// is only ever touched by one task.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use cardstories_core::protocol::{parse_poll_response, Subject, UpdateItem, UpdateKind};
use cardstories_core::session::{
    NotStarted, PollDirective, PollFailure, PollPhase, PollSession, PollTicket, TransportFailure,
};

use crate::transport::{Transport, TransportError};

/// Reports from spawned poll tasks.
#[derive(Debug)]
pub enum PollEvent {
    Response {
        generation: u64,
        result: Result<Value, TransportError>,
    },
    RetryDue {
        generation: u64,
    },
}

/// What the controller has to act on after an event.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// New items. The session is Idle and waits to be re-armed.
    Delivered {
        items: Vec<UpdateItem>,
        last_modified: u64,
    },
    /// Terminal failure for the current view.
    Failed(PollFailure),
    /// Nothing for the controller: reissued, retry scheduled, or stale.
    Pending,
}

pub struct Poller {
    session: PollSession,
    transport: Arc<dyn Transport>,
    events_tx: mpsc::Sender<PollEvent>,
    /// The one request or retry timer task of this root.
    task: Option<JoinHandle<()>>,
}

impl Poller {
    pub fn new(
        transport: Arc<dyn Transport>,
        retry_delay: Duration,
        events_tx: mpsc::Sender<PollEvent>,
    ) -> Self {
        Self {
            session: PollSession::new(retry_delay),
            transport,
            events_tx,
            task: None,
        }
    }

    pub fn session(&self) -> &PollSession {
        &self.session
    }

    pub fn phase(&self) -> PollPhase {
        self.session.phase()
    }

    /// Start polling for `kinds`. Returns the generation of the new poll.
    pub fn start(
        &mut self,
        subject: Subject,
        kinds: BTreeSet<UpdateKind>,
    ) -> Result<u64, NotStarted> {
        let ticket = self.session.begin(subject, kinds)?;
        let generation = ticket.generation;
        debug!(generation, modified = ticket.request.modified, "starting poll");
        self.spawn_request(ticket);
        Ok(generation)
    }

    pub fn handle_event(&mut self, event: PollEvent) -> PollOutcome {
        let directive = match event {
            PollEvent::Response {
                generation,
                result: Ok(body),
            } => self
                .session
                .on_response(generation, parse_poll_response(body)),
            PollEvent::Response {
                generation,
                result: Err(e),
            } => {
                if e.failure() == TransportFailure::Failed {
                    warn!(generation, "poll request failed: {e}");
                }
                self.session.on_transport_error(generation, e.failure())
            }
            PollEvent::RetryDue { generation } => {
                if let Some(ticket) = self.session.retry_due(generation) {
                    info!(generation, "retrying poll");
                    self.spawn_request(ticket);
                }
                return PollOutcome::Pending;
            }
        };

        match directive {
            PollDirective::Deliver {
                items,
                last_modified,
            } => {
                self.task = None;
                debug!(count = items.len(), last_modified, "poll delivered");
                PollOutcome::Delivered {
                    items,
                    last_modified,
                }
            }
            PollDirective::Reissue(ticket) => {
                debug!(generation = ticket.generation, "poll timed out, reissuing");
                self.spawn_request(ticket);
                PollOutcome::Pending
            }
            PollDirective::RetryAfter { delay, ticket } => {
                self.spawn_retry_timer(delay, ticket.generation);
                PollOutcome::Pending
            }
            PollDirective::Fail(failure) => {
                self.task = None;
                PollOutcome::Failed(failure)
            }
            PollDirective::Ignore => PollOutcome::Pending,
        }
    }

    /// Advance `last_modified` with items obtained outside the poll.
    pub fn observe(&mut self, items: &[UpdateItem]) -> u64 {
        self.session.observe(items)
    }

    /// Cancel the in-flight request or retry timer. No-op while Idle.
    pub fn discard(&mut self) -> bool {
        self.abort_task();
        let discarded = self.session.discard();
        if discarded {
            debug!("discarded in-flight poll");
        }
        discarded
    }

    /// Discard and forget `last_modified`, for a different game.
    pub fn reset(&mut self) {
        self.abort_task();
        self.session.reset();
    }

    fn abort_task(&mut self) {
        if let Some(handle) = self.task.take() {
            handle.abort();
        }
    }

    fn spawn_request(&mut self, ticket: PollTicket) {
        let transport = Arc::clone(&self.transport);
        let tx = self.events_tx.clone();
        let generation = ticket.generation;
        let params = ticket.request.query();
        self.task = Some(tokio::spawn(async move {
            let result = transport.request(params).await;
            let _ = tx.send(PollEvent::Response { generation, result }).await;
        }));
    }

    fn spawn_retry_timer(&mut self, delay: Duration, generation: u64) {
        let tx = self.events_tx.clone();
        debug!(generation, ?delay, "poll retry scheduled");
        self.task = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(PollEvent::RetryDue { generation }).await;
        }));
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.abort_task();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cardstories_core::protocol::QueryParams;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Answers from a script; hangs forever once the script runs out.
    struct ScriptedTransport {
        script: Mutex<VecDeque<Result<Value, TransportError>>>,
        requests: Mutex<Vec<QueryParams>>,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Result<Value, TransportError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<QueryParams> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn request(&self, params: QueryParams) -> Result<Value, TransportError> {
            self.requests.lock().unwrap().push(params);
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(answer) => answer,
                None => std::future::pending().await,
            }
        }
    }

    fn param(params: &QueryParams, key: &str) -> Vec<String> {
        params
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .collect()
    }

    fn game_kinds() -> BTreeSet<UpdateKind> {
        [UpdateKind::Game].into_iter().collect()
    }

    fn subject() -> Subject {
        Subject::new(Some(7), Some(42))
    }

    fn poller(
        transport: Arc<ScriptedTransport>,
    ) -> (Poller, mpsc::Receiver<PollEvent>) {
        let (tx, rx) = mpsc::channel(16);
        (Poller::new(transport, Duration::from_secs(1), tx), rx)
    }

    #[tokio::test]
    async fn delivers_items_and_advances_modified() {
        let transport = ScriptedTransport::new(vec![Ok(json!([
            {"type": "game", "modified": 150},
            {"type": "chat", "modified": 120}
        ]))]);
        let (mut poller, mut rx) = poller(transport.clone());

        poller.start(subject(), game_kinds()).unwrap();
        let event = rx.recv().await.unwrap();
        match poller.handle_event(event) {
            PollOutcome::Delivered { items, last_modified } => {
                assert_eq!(items.len(), 2);
                assert_eq!(last_modified, 150);
            }
            other => panic!("expected Delivered, got {other:?}"),
        }
        assert_eq!(poller.phase(), PollPhase::Idle);

        poller.start(subject(), game_kinds()).unwrap();
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(param(&requests[0], "modified"), vec!["0"]);
        assert_eq!(param(&requests[1], "modified"), vec!["150"]);
    }

    #[tokio::test]
    async fn timeout_reissues_the_same_request_once() {
        let transport = ScriptedTransport::new(vec![Ok(json!({"timeout": true}))]);
        let (mut poller, mut rx) = poller(transport.clone());

        poller.start(subject(), game_kinds()).unwrap();
        let event = rx.recv().await.unwrap();
        assert_eq!(poller.handle_event(event), PollOutcome::Pending);
        assert_eq!(poller.phase(), PollPhase::Polling);

        // Let the reissued request reach the transport (which now hangs).
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0], requests[1]);
    }

    #[tokio::test]
    async fn network_failure_retries_after_delay() {
        tokio::time::pause();
        let transport = ScriptedTransport::new(vec![
            Err(TransportError::Network("connection reset".into())),
            Ok(json!([{"type": "game", "modified": 3}])),
        ]);
        let (mut poller, mut rx) = poller(transport.clone());

        poller.start(subject(), game_kinds()).unwrap();
        let failed = rx.recv().await.unwrap();
        assert_eq!(poller.handle_event(failed), PollOutcome::Pending);
        assert_eq!(poller.phase(), PollPhase::RetryPending);
        assert!(poller.session().in_flight());

        let waited_from = Instant::now();
        let due = rx.recv().await.unwrap();
        assert!(matches!(due, PollEvent::RetryDue { .. }));
        assert!(waited_from.elapsed() >= Duration::from_secs(1));
        assert_eq!(poller.handle_event(due), PollOutcome::Pending);
        assert_eq!(poller.phase(), PollPhase::Polling);

        let delivered = rx.recv().await.unwrap();
        assert!(matches!(
            poller.handle_event(delivered),
            PollOutcome::Delivered { last_modified: 3, .. }
        ));

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0], requests[1]);
    }

    #[tokio::test]
    async fn abort_is_silent() {
        let transport = ScriptedTransport::new(vec![Err(TransportError::Aborted)]);
        let (mut poller, mut rx) = poller(transport.clone());

        poller.start(subject(), game_kinds()).unwrap();
        let event = rx.recv().await.unwrap();
        assert_eq!(poller.handle_event(event), PollOutcome::Pending);
        assert_eq!(poller.phase(), PollPhase::Idle);
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn service_error_fails_without_retry() {
        let transport = ScriptedTransport::new(vec![Ok(json!({
            "error": {"code": "GAME_DOES_NOT_EXIST"}
        }))]);
        let (mut poller, mut rx) = poller(transport.clone());

        poller.start(subject(), game_kinds()).unwrap();
        let event = rx.recv().await.unwrap();
        match poller.handle_event(event) {
            PollOutcome::Failed(PollFailure::Service(envelope)) => {
                assert_eq!(envelope.code, "GAME_DOES_NOT_EXIST");
            }
            other => panic!("expected Failed, got {other:?}"),
        }
        assert_eq!(poller.phase(), PollPhase::Idle);
    }

    #[tokio::test]
    async fn start_while_in_flight_keeps_existing_request() {
        let transport = ScriptedTransport::new(vec![]);
        let (mut poller, _rx) = poller(transport.clone());

        let generation = poller.start(subject(), game_kinds()).unwrap();
        assert_eq!(
            poller.start(subject(), game_kinds()),
            Err(NotStarted::InFlight)
        );
        assert_eq!(poller.session().generation(), generation);
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn discard_cancels_and_late_reports_are_ignored() {
        let transport = ScriptedTransport::new(vec![]);
        let (mut poller, _rx) = poller(transport.clone());

        let generation = poller.start(subject(), game_kinds()).unwrap();
        assert!(poller.discard());
        assert_eq!(poller.phase(), PollPhase::Idle);
        assert!(!poller.discard());

        let late = PollEvent::Response {
            generation,
            result: Ok(json!([{"type": "game", "modified": 99}])),
        };
        assert_eq!(poller.handle_event(late), PollOutcome::Pending);
        assert_eq!(poller.session().last_modified(), 0);
    }

    #[tokio::test]
    async fn discard_stops_a_pending_retry() {
        tokio::time::pause();
        let transport =
            ScriptedTransport::new(vec![Err(TransportError::Status(502))]);
        let (mut poller, mut rx) = poller(transport.clone());

        poller.start(subject(), game_kinds()).unwrap();
        let failed = rx.recv().await.unwrap();
        poller.handle_event(failed);
        assert_eq!(poller.phase(), PollPhase::RetryPending);

        poller.discard();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
        assert_eq!(transport.requests().len(), 1);
    }
}
