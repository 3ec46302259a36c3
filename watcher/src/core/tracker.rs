//! Request lifecycle tracking: pending requests, completion ledger, timeouts.
//!
//! The tracker decides; the engine acts. `issue` and `sweep_timeouts` report
//! which identifiers must be sent, and the caller performs the actual
//! transport send. This keeps the tracker free of I/O while preserving the
//! contract that a send happens exactly when the tracker accepts an issue or
//! instructs a retry.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use crate::core::types::{IssueError, LobbyId, SweepOutcome};

/// One outstanding detail request.
#[derive(Debug, Clone, Copy)]
struct PendingRequest {
    issued_at: Instant,
    retries: u32,
}

/// Tracks in-flight detail requests and the set of completed lobbies.
///
/// Invariants:
/// - at most one pending entry per lobby id,
/// - a lobby is never both pending and completed once a sweep or completion
///   has run,
/// - `retries` only increases and never exceeds the configured maximum;
///   exhausting it removes the entry (terminal condition, not a state).
#[derive(Debug, Default)]
pub struct RequestTracker {
    pending: HashMap<LobbyId, PendingRequest>,
    completed: HashSet<LobbyId>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new detail request for `id`.
    ///
    /// Fails with [`IssueError::NotReady`] when the session is down and with
    /// [`IssueError::AlreadyHandled`] when `id` is completed or already
    /// pending. On success the caller must perform the transport send.
    pub fn issue(
        &mut self,
        id: LobbyId,
        now: Instant,
        session_ready: bool,
    ) -> Result<(), IssueError> {
        if !session_ready {
            return Err(IssueError::NotReady);
        }
        if self.completed.contains(&id) || self.pending.contains_key(&id) {
            return Err(IssueError::AlreadyHandled);
        }
        self.pending.insert(
            id,
            PendingRequest {
                issued_at: now,
                retries: 0,
            },
        );
        Ok(())
    }

    /// Mark `id` completed: drop any pending entry and record it in the
    /// dedup ledger. Idempotent. Returns whether `id` was newly completed.
    pub fn complete(&mut self, id: LobbyId) -> bool {
        self.pending.remove(&id);
        self.completed.insert(id)
    }

    /// Sweep pending entries older than `timeout`.
    ///
    /// While the session is down this is a no-op: pending entries stay queued
    /// and keep aging, so they retry (or exhaust) once the session returns.
    /// Timed-out entries are processed in ascending issue-time order, ties
    /// broken by id. The caller must re-send every id in
    /// [`SweepOutcome::retried`].
    pub fn sweep_timeouts(
        &mut self,
        now: Instant,
        timeout: Duration,
        max_retries: u32,
        session_ready: bool,
    ) -> SweepOutcome {
        let mut outcome = SweepOutcome::default();
        if !session_ready || self.pending.is_empty() {
            return outcome;
        }

        let mut timed_out: Vec<(Instant, LobbyId)> = self
            .pending
            .iter()
            .filter(|(_, request)| now.duration_since(request.issued_at) > timeout)
            .map(|(id, request)| (request.issued_at, *id))
            .collect();
        timed_out.sort();

        for (_, id) in timed_out {
            if self.completed.contains(&id) {
                // Response arrived but bookkeeping lagged: not a retry.
                self.pending.remove(&id);
                outcome.dropped.push(id);
                continue;
            }
            let Some(request) = self.pending.get_mut(&id) else {
                continue;
            };
            if request.retries < max_retries {
                request.retries += 1;
                request.issued_at = now;
                outcome.retried.push(id);
            } else {
                self.pending.remove(&id);
                outcome.exhausted.push(id);
            }
        }
        outcome
    }

    pub fn is_pending(&self, id: LobbyId) -> bool {
        self.pending.contains_key(&id)
    }

    pub fn is_completed(&self, id: LobbyId) -> bool {
        self.completed.contains(&id)
    }

    /// Retry count consumed so far for a pending `id`.
    pub fn retries(&self, id: LobbyId) -> Option<u32> {
        self.pending.get(&id).map(|request| request.retries)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(3);
    const MAX_RETRIES: u32 = 2;

    #[test]
    fn issue_rejects_when_session_not_ready() {
        let mut tracker = RequestTracker::new();
        let err = tracker.issue(1, Instant::now(), false).unwrap_err();
        assert_eq!(err, IssueError::NotReady);
        assert!(!tracker.is_pending(1));
    }

    #[test]
    fn issue_dedups_completed_and_pending_ids() {
        let mut tracker = RequestTracker::new();
        let now = Instant::now();

        tracker.issue(1, now, true).expect("first issue");
        assert_eq!(tracker.issue(1, now, true), Err(IssueError::AlreadyHandled));

        tracker.complete(2);
        assert_eq!(tracker.issue(2, now, true), Err(IssueError::AlreadyHandled));
    }

    #[test]
    fn at_most_one_pending_entry_per_id() {
        let mut tracker = RequestTracker::new();
        let now = Instant::now();
        tracker.issue(7, now, true).expect("issue");
        let _ = tracker.issue(7, now, true);
        let _ = tracker.issue(7, now + Duration::from_secs(1), true);
        assert_eq!(tracker.pending_len(), 1);
    }

    #[test]
    fn complete_removes_pending_and_is_idempotent() {
        let mut tracker = RequestTracker::new();
        tracker.issue(5, Instant::now(), true).expect("issue");

        assert!(tracker.complete(5));
        assert!(!tracker.is_pending(5));
        assert!(tracker.is_completed(5));
        // Second completion is a no-op beyond the set membership.
        assert!(!tracker.complete(5));
    }

    #[test]
    fn sweep_is_noop_before_timeout() {
        let mut tracker = RequestTracker::new();
        let base = Instant::now();
        tracker.issue(1, base, true).expect("issue");

        let outcome = tracker.sweep_timeouts(base + TIMEOUT, TIMEOUT, MAX_RETRIES, true);
        assert!(outcome.is_empty());
        assert_eq!(tracker.retries(1), Some(0));
    }

    #[test]
    fn sweep_is_noop_while_session_down() {
        let mut tracker = RequestTracker::new();
        let base = Instant::now();
        tracker.issue(1, base, true).expect("issue");

        let outcome = tracker.sweep_timeouts(
            base + Duration::from_secs(60),
            TIMEOUT,
            MAX_RETRIES,
            false,
        );
        assert!(outcome.is_empty());
        // The entry stays queued and retries once the session returns.
        let outcome =
            tracker.sweep_timeouts(base + Duration::from_secs(61), TIMEOUT, MAX_RETRIES, true);
        assert_eq!(outcome.retried, vec![1]);
    }

    #[test]
    fn retry_bound_exhausts_exactly_once() {
        let mut tracker = RequestTracker::new();
        let base = Instant::now();
        tracker.issue(999, base, true).expect("issue");
        // Send count: 1 (initial issue).

        let t1 = base + Duration::from_millis(3100);
        let outcome = tracker.sweep_timeouts(t1, TIMEOUT, MAX_RETRIES, true);
        assert_eq!(outcome.retried, vec![999]);
        assert_eq!(tracker.retries(999), Some(1));

        let t2 = t1 + Duration::from_millis(3100);
        let outcome = tracker.sweep_timeouts(t2, TIMEOUT, MAX_RETRIES, true);
        assert_eq!(outcome.retried, vec![999]);
        assert_eq!(tracker.retries(999), Some(2));

        let t3 = t2 + Duration::from_millis(3100);
        let outcome = tracker.sweep_timeouts(t3, TIMEOUT, MAX_RETRIES, true);
        assert_eq!(outcome.exhausted, vec![999]);
        assert!(!tracker.is_pending(999));

        // No further sweeps can touch the id: total sends = max_retries + 1.
        let t4 = t3 + Duration::from_millis(3100);
        let outcome = tracker.sweep_timeouts(t4, TIMEOUT, MAX_RETRIES, true);
        assert!(outcome.is_empty());
    }

    #[test]
    fn sweep_drops_completed_entry_without_retry() {
        let mut tracker = RequestTracker::new();
        let base = Instant::now();
        tracker.issue(555, base, true).expect("issue");
        // Response arrives while the pending entry lingers.
        tracker.completed.insert(555);

        let outcome = tracker.sweep_timeouts(
            base + Duration::from_millis(3100),
            TIMEOUT,
            MAX_RETRIES,
            true,
        );
        assert_eq!(outcome.dropped, vec![555]);
        assert!(outcome.retried.is_empty());
        assert!(!tracker.is_pending(555));
        assert!(tracker.is_completed(555));
    }

    #[test]
    fn sweep_order_is_ascending_by_issue_time_then_id() {
        let mut tracker = RequestTracker::new();
        let base = Instant::now();
        tracker.issue(30, base + Duration::from_millis(2), true).expect("issue");
        tracker.issue(20, base, true).expect("issue");
        tracker.issue(10, base, true).expect("issue");

        let outcome = tracker.sweep_timeouts(
            base + Duration::from_secs(10),
            TIMEOUT,
            MAX_RETRIES,
            true,
        );
        assert_eq!(outcome.retried, vec![10, 20, 30]);
    }

    #[test]
    fn completed_id_never_pending_after_reconciliation() {
        let mut tracker = RequestTracker::new();
        let base = Instant::now();
        tracker.issue(42, base, true).expect("issue");
        tracker.complete(42);
        assert!(!tracker.is_pending(42));

        let outcome = tracker.sweep_timeouts(
            base + Duration::from_secs(10),
            TIMEOUT,
            MAX_RETRIES,
            true,
        );
        assert!(outcome.is_empty());
    }
}
