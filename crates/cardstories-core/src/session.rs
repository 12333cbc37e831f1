// Poll session: the sans-IO bookkeeping behind the long-poll loop.
//
// The session never performs a request itself. It hands out `PollTicket`s
// and turns every response or transport failure into a `PollDirective`
// the driver acts on. Tickets carry the generation they were issued for;
// anything reported for an older generation is stale and ignored.

use std::collections::BTreeSet;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::protocol::{
    max_modified, ErrorEnvelope, PollRequest, PollResponse, ProtocolError, Subject, UpdateItem,
    UpdateKind,
};

/// Delay before a poll that failed at the transport level is retried.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    Idle,
    /// A request is outstanding.
    Polling,
    /// The last request failed; a retry timer is running.
    RetryPending,
}

/// Permission to send one poll request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollTicket {
    pub generation: u64,
    pub request: PollRequest,
}

/// Why `begin` did not start a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NotStarted {
    #[error("a poll is already in flight")]
    InFlight,
    #[error("no update kinds to poll for")]
    NothingToRequest,
}

/// Transport-level failure of a poll request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportFailure {
    /// The request was cancelled on purpose.
    Aborted,
    /// Network error, bad status, or undecodable body.
    Failed,
}

/// Terminal poll failures. Both go to the error surface and are not retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PollFailure {
    #[error(transparent)]
    Service(ErrorEnvelope),
    #[error("malformed poll response: {0}")]
    Malformed(ProtocolError),
}

/// What the driver must do next.
#[derive(Debug, Clone, PartialEq)]
pub enum PollDirective {
    /// Dispatch the items. The session is Idle; the caller re-arms.
    Deliver {
        items: Vec<UpdateItem>,
        last_modified: u64,
    },
    /// Server timeout: send the same request again right away.
    Reissue(PollTicket),
    /// Transport failure: call `retry_due` for this generation after `delay`.
    RetryAfter { delay: Duration, ticket: PollTicket },
    /// Surface the failure. The session is Idle.
    Fail(PollFailure),
    /// Stale or cancelled. Nothing to do.
    Ignore,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct PollSession {
    phase: PollPhase,
    last_modified: u64,
    generation: u64,
    pending: Option<PollRequest>,
    retry_delay: Duration,
}

impl Default for PollSession {
    fn default() -> Self {
        Self::new(DEFAULT_RETRY_DELAY)
    }
}

impl PollSession {
    pub fn new(retry_delay: Duration) -> Self {
        Self {
            phase: PollPhase::Idle,
            last_modified: 0,
            generation: 0,
            pending: None,
            retry_delay,
        }
    }

    pub fn phase(&self) -> PollPhase {
        self.phase
    }

    /// True from the moment a request is issued until its outcome is
    /// handled, retry backoff included.
    pub fn in_flight(&self) -> bool {
        self.phase != PollPhase::Idle
    }

    pub fn last_modified(&self) -> u64 {
        self.last_modified
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The request currently outstanding or awaiting retry.
    pub fn pending(&self) -> Option<&PollRequest> {
        self.pending.as_ref()
    }

    /// Start a poll for `kinds` newer than `last_modified`.
    ///
    /// Refuses while a poll is in flight (the existing request is left
    /// untouched) and when there is nothing to ask for.
    pub fn begin(
        &mut self,
        subject: Subject,
        kinds: BTreeSet<UpdateKind>,
    ) -> Result<PollTicket, NotStarted> {
        if self.in_flight() {
            return Err(NotStarted::InFlight);
        }
        if kinds.is_empty() {
            return Err(NotStarted::NothingToRequest);
        }

        self.generation += 1;
        let request = PollRequest {
            subject,
            kinds,
            modified: self.last_modified,
        };
        self.pending = Some(request.clone());
        self.phase = PollPhase::Polling;
        Ok(PollTicket {
            generation: self.generation,
            request,
        })
    }

    /// Handle a decoded (or undecodable) response for `generation`.
    pub fn on_response(
        &mut self,
        generation: u64,
        response: Result<PollResponse, ProtocolError>,
    ) -> PollDirective {
        if generation != self.generation || self.phase != PollPhase::Polling {
            debug!(generation, current = self.generation, "ignoring stale poll response");
            return PollDirective::Ignore;
        }

        match response {
            Ok(PollResponse::Timeout) => match self.current_ticket() {
                Some(ticket) => PollDirective::Reissue(ticket),
                None => PollDirective::Ignore,
            },
            Ok(PollResponse::Updates(items)) => {
                self.settle();
                let last_modified = self.observe(&items);
                PollDirective::Deliver {
                    items,
                    last_modified,
                }
            }
            Ok(PollResponse::Error(envelope)) => {
                self.settle();
                PollDirective::Fail(PollFailure::Service(envelope))
            }
            Err(e) => {
                self.settle();
                PollDirective::Fail(PollFailure::Malformed(e))
            }
        }
    }

    /// Handle a transport failure for `generation`.
    pub fn on_transport_error(
        &mut self,
        generation: u64,
        failure: TransportFailure,
    ) -> PollDirective {
        if generation != self.generation {
            debug!(generation, current = self.generation, "ignoring stale transport failure");
            return PollDirective::Ignore;
        }

        match failure {
            TransportFailure::Aborted => {
                if self.in_flight() {
                    self.settle();
                }
                PollDirective::Ignore
            }
            TransportFailure::Failed => {
                if self.phase != PollPhase::Polling {
                    return PollDirective::Ignore;
                }
                let Some(ticket) = self.current_ticket() else {
                    return PollDirective::Ignore;
                };
                self.phase = PollPhase::RetryPending;
                PollDirective::RetryAfter {
                    delay: self.retry_delay,
                    ticket,
                }
            }
        }
    }

    /// The retry timer for `generation` fired. Returns the unchanged request
    /// to send again, or `None` if the retry was discarded meanwhile.
    pub fn retry_due(&mut self, generation: u64) -> Option<PollTicket> {
        if generation != self.generation || self.phase != PollPhase::RetryPending {
            return None;
        }
        let ticket = self.current_ticket()?;
        self.phase = PollPhase::Polling;
        Some(ticket)
    }

    /// Advance `last_modified` over `items`. Never goes backwards.
    pub fn observe(&mut self, items: &[UpdateItem]) -> u64 {
        if let Some(newest) = max_modified(items) {
            self.last_modified = self.last_modified.max(newest);
        }
        self.last_modified
    }

    /// Cancel the outstanding request or retry timer. Returns whether there
    /// was anything to cancel; a no-op while Idle.
    pub fn discard(&mut self) -> bool {
        if !self.in_flight() {
            return false;
        }
        self.generation += 1;
        self.settle();
        true
    }

    /// Discard and forget everything seen so far, for a different game.
    pub fn reset(&mut self) {
        self.discard();
        self.last_modified = 0;
    }

    fn current_ticket(&self) -> Option<PollTicket> {
        self.pending.clone().map(|request| PollTicket {
            generation: self.generation,
            request,
        })
    }

    fn settle(&mut self) {
        self.phase = PollPhase::Idle;
        self.pending = None;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn kinds(list: &[UpdateKind]) -> BTreeSet<UpdateKind> {
        list.iter().copied().collect()
    }

    fn subject() -> Subject {
        Subject::new(Some(7), Some(42))
    }

    fn item(kind: UpdateKind, modified: Option<u64>) -> UpdateItem {
        UpdateItem::new(kind, modified, json!({"type": kind.as_str()}))
    }

    fn updates(items: Vec<UpdateItem>) -> Result<PollResponse, ProtocolError> {
        Ok(PollResponse::Updates(items))
    }

    #[test]
    fn begin_marks_in_flight_and_uses_last_modified() {
        let mut session = PollSession::default();
        assert!(!session.in_flight());

        let ticket = session.begin(subject(), kinds(&[UpdateKind::Game])).unwrap();
        assert!(session.in_flight());
        assert_eq!(session.phase(), PollPhase::Polling);
        assert_eq!(ticket.request.modified, 0);
        assert_eq!(ticket.generation, session.generation());
        assert_eq!(session.pending(), Some(&ticket.request));
    }

    #[test]
    fn begin_while_in_flight_is_refused_and_changes_nothing() {
        let mut session = PollSession::default();
        let ticket = session.begin(subject(), kinds(&[UpdateKind::Game])).unwrap();
        let generation = session.generation();

        let err = session
            .begin(subject(), kinds(&[UpdateKind::Chat]))
            .unwrap_err();
        assert_eq!(err, NotStarted::InFlight);
        assert!(session.in_flight());
        assert_eq!(session.generation(), generation);
        assert_eq!(session.pending(), Some(&ticket.request));

        // The original request still completes normally.
        let directive = session.on_response(ticket.generation, updates(vec![]));
        assert!(matches!(directive, PollDirective::Deliver { .. }));
    }

    #[test]
    fn begin_with_no_kinds_is_refused() {
        let mut session = PollSession::default();
        let err = session.begin(subject(), BTreeSet::new()).unwrap_err();
        assert_eq!(err, NotStarted::NothingToRequest);
        assert!(!session.in_flight());
    }

    #[test]
    fn data_advances_last_modified_to_max_item() {
        let mut session = PollSession::default();
        session.observe(&[item(UpdateKind::Game, Some(100))]);

        let ticket = session.begin(subject(), kinds(&[UpdateKind::Game])).unwrap();
        assert_eq!(ticket.request.modified, 100);

        let directive = session.on_response(
            ticket.generation,
            updates(vec![
                item(UpdateKind::Game, Some(150)),
                item(UpdateKind::Chat, Some(120)),
            ]),
        );
        match directive {
            PollDirective::Deliver {
                items,
                last_modified,
            } => {
                assert_eq!(items.len(), 2);
                assert_eq!(last_modified, 150);
            }
            other => panic!("expected Deliver, got {other:?}"),
        }
        assert!(!session.in_flight());

        let next = session.begin(subject(), kinds(&[UpdateKind::Game])).unwrap();
        assert_eq!(next.request.modified, 150);
    }

    #[test]
    fn last_modified_never_regresses() {
        let mut session = PollSession::default();
        let batches: &[&[Option<u64>]] = &[
            &[Some(10), Some(30)],
            &[Some(20)],
            &[],
            &[None, Some(5)],
            &[Some(31), None, Some(29)],
            &[Some(31)],
        ];

        let mut seen_max = 0;
        for batch in batches {
            let items = batch
                .iter()
                .map(|m| item(UpdateKind::Game, *m))
                .collect::<Vec<_>>();
            let before = session.last_modified();
            let ticket = session.begin(subject(), kinds(&[UpdateKind::Game])).unwrap();
            session.on_response(ticket.generation, updates(items));

            seen_max = batch.iter().flatten().fold(seen_max, |acc, m| acc.max(*m));
            assert!(session.last_modified() >= before);
            assert_eq!(session.last_modified(), seen_max);
        }
        assert_eq!(session.last_modified(), 31);
    }

    #[test]
    fn empty_update_list_is_delivered() {
        let mut session = PollSession::default();
        let ticket = session.begin(subject(), kinds(&[UpdateKind::Chat])).unwrap();
        let directive = session.on_response(ticket.generation, updates(vec![]));
        assert_eq!(
            directive,
            PollDirective::Deliver {
                items: vec![],
                last_modified: 0
            }
        );
        assert!(!session.in_flight());
    }

    #[test]
    fn timeout_reissues_identical_request() {
        let mut session = PollSession::default();
        session.observe(&[item(UpdateKind::Game, Some(100))]);
        let ticket = session
            .begin(subject(), kinds(&[UpdateKind::Game, UpdateKind::Chat]))
            .unwrap();

        let directive = session.on_response(ticket.generation, Ok(PollResponse::Timeout));
        match directive {
            PollDirective::Reissue(again) => {
                assert_eq!(again, ticket);
                assert_eq!(again.request.query(), ticket.request.query());
                assert_eq!(again.request.modified, 100);
            }
            other => panic!("expected Reissue, got {other:?}"),
        }
        assert_eq!(session.phase(), PollPhase::Polling);
    }

    #[test]
    fn service_error_is_terminal() {
        let mut session = PollSession::default();
        let ticket = session.begin(subject(), kinds(&[UpdateKind::Game])).unwrap();

        let directive = session.on_response(
            ticket.generation,
            Ok(PollResponse::Error(ErrorEnvelope::new("PANIC"))),
        );
        assert_eq!(
            directive,
            PollDirective::Fail(PollFailure::Service(ErrorEnvelope::new("PANIC")))
        );
        assert!(!session.in_flight());
        assert_eq!(session.pending(), None);
    }

    #[test]
    fn malformed_response_is_terminal() {
        let mut session = PollSession::default();
        let ticket = session.begin(subject(), kinds(&[UpdateKind::Game])).unwrap();

        let directive = session.on_response(
            ticket.generation,
            Err(ProtocolError::MissingType { index: 0 }),
        );
        assert!(matches!(
            directive,
            PollDirective::Fail(PollFailure::Malformed(_))
        ));
        assert!(!session.in_flight());
    }

    #[test]
    fn transport_failure_schedules_one_retry_with_same_request() {
        let mut session = PollSession::new(Duration::from_millis(250));
        let ticket = session.begin(subject(), kinds(&[UpdateKind::Game])).unwrap();

        let directive = session.on_transport_error(ticket.generation, TransportFailure::Failed);
        match directive {
            PollDirective::RetryAfter { delay, ticket: t } => {
                assert_eq!(delay, Duration::from_millis(250));
                assert_eq!(t, ticket);
            }
            other => panic!("expected RetryAfter, got {other:?}"),
        }
        assert_eq!(session.phase(), PollPhase::RetryPending);
        assert!(session.in_flight());

        // A second failure report for the same request does not stack retries.
        assert_eq!(
            session.on_transport_error(ticket.generation, TransportFailure::Failed),
            PollDirective::Ignore
        );

        let retry = session.retry_due(ticket.generation).unwrap();
        assert_eq!(retry, ticket);
        assert_eq!(session.phase(), PollPhase::Polling);

        // The timer only fires once.
        assert_eq!(session.retry_due(ticket.generation), None);
    }

    #[test]
    fn begin_during_retry_backoff_is_refused() {
        let mut session = PollSession::default();
        let ticket = session.begin(subject(), kinds(&[UpdateKind::Game])).unwrap();
        session.on_transport_error(ticket.generation, TransportFailure::Failed);
        assert_eq!(
            session.begin(subject(), kinds(&[UpdateKind::Game])),
            Err(NotStarted::InFlight)
        );
    }

    #[test]
    fn abort_is_neither_retried_nor_surfaced() {
        let mut session = PollSession::default();
        let ticket = session.begin(subject(), kinds(&[UpdateKind::Game])).unwrap();

        let directive = session.on_transport_error(ticket.generation, TransportFailure::Aborted);
        assert_eq!(directive, PollDirective::Ignore);
        assert!(!session.in_flight());
        assert_eq!(session.retry_due(ticket.generation), None);
    }

    #[test]
    fn abort_after_discard_is_stale() {
        let mut session = PollSession::default();
        let first = session.begin(subject(), kinds(&[UpdateKind::Game])).unwrap();
        assert!(session.discard());

        // A new poll is already running when the old abort arrives.
        let second = session.begin(subject(), kinds(&[UpdateKind::Game])).unwrap();
        let directive = session.on_transport_error(first.generation, TransportFailure::Aborted);
        assert_eq!(directive, PollDirective::Ignore);
        assert!(session.in_flight());
        assert_eq!(session.generation(), second.generation);
    }

    #[test]
    fn discard_while_idle_is_a_no_op() {
        let mut session = PollSession::default();
        session.observe(&[item(UpdateKind::Game, Some(9))]);
        let generation = session.generation();

        assert!(!session.discard());
        assert_eq!(session.generation(), generation);
        assert_eq!(session.last_modified(), 9);
        assert_eq!(session.phase(), PollPhase::Idle);
    }

    #[test]
    fn discard_cancels_polling_and_ignores_late_response() {
        let mut session = PollSession::default();
        let ticket = session.begin(subject(), kinds(&[UpdateKind::Game])).unwrap();

        assert!(session.discard());
        assert!(!session.in_flight());
        assert_eq!(session.pending(), None);

        let directive = session.on_response(
            ticket.generation,
            updates(vec![item(UpdateKind::Game, Some(500))]),
        );
        assert_eq!(directive, PollDirective::Ignore);
        assert_eq!(session.last_modified(), 0);
    }

    #[test]
    fn discard_cancels_pending_retry() {
        let mut session = PollSession::default();
        let ticket = session.begin(subject(), kinds(&[UpdateKind::Game])).unwrap();
        session.on_transport_error(ticket.generation, TransportFailure::Failed);

        assert!(session.discard());
        assert_eq!(session.retry_due(ticket.generation), None);
        assert!(!session.in_flight());
    }

    #[test]
    fn reset_forgets_last_modified() {
        let mut session = PollSession::default();
        let ticket = session.begin(subject(), kinds(&[UpdateKind::Game])).unwrap();
        session.on_response(
            ticket.generation,
            updates(vec![item(UpdateKind::Game, Some(77))]),
        );
        session.begin(subject(), kinds(&[UpdateKind::Game])).unwrap();

        session.reset();
        assert!(!session.in_flight());
        assert_eq!(session.last_modified(), 0);

        let fresh = session
            .begin(Subject::new(Some(7), Some(43)), kinds(&[UpdateKind::Game]))
            .unwrap();
        assert_eq!(fresh.request.modified, 0);
    }
}
