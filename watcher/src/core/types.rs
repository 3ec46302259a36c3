//! Shared deterministic types for the reconciliation core.
//!
//! These types define stable contracts between the tracker, the engine, and
//! the transport. They must remain deterministic across runs and carry no
//! I/O handles.

use serde::{Deserialize, Serialize};

/// Numeric handle naming one remote game session, extracted from log output.
pub type LobbyId = u64;

/// Why [`RequestTracker::issue`](crate::core::tracker::RequestTracker::issue)
/// declined to accept an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueError {
    /// The coordinator session is not established. The identifier stays
    /// unhandled; the next tick retries issuance.
    NotReady,
    /// The identifier is already completed or already pending.
    AlreadyHandled,
}

/// Result of one timeout sweep.
///
/// Lists are recorded in deterministic order (ascending issue time, ties
/// broken by lobby id) to keep behavior reproducible under test.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Entries re-sent with an incremented retry count.
    pub retried: Vec<LobbyId>,
    /// Stale entries dropped because the lobby completed while bookkeeping
    /// lagged. Not retries.
    pub dropped: Vec<LobbyId>,
    /// Entries whose retries are exhausted — the engine's single fatal
    /// condition.
    pub exhausted: Vec<LobbyId>,
}

impl SweepOutcome {
    /// Whether the sweep produced no actions at all.
    pub fn is_empty(&self) -> bool {
        self.retried.is_empty() && self.dropped.is_empty() && self.exhausted.is_empty()
    }
}

/// One player slot in a lobby detail response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyPlayer {
    pub account_id: u32,
}

/// Session details resolved by the coordinator for one lobby.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyDetails {
    pub lobby_id: LobbyId,
    pub match_id: u64,
    /// Seconds of game time elapsed when the response was produced.
    pub game_time_secs: u32,
    pub average_mmr: u32,
    #[serde(default)]
    pub players: Vec<LobbyPlayer>,
}

/// Asynchronous inputs merged into the engine's single serialized queue.
///
/// The engine never blocks on these: the periodic tick alone is sufficient
/// for correctness, events only shorten detection latency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// The coordinator session became ready; issuance is re-enabled and the
    /// log is force-polled to catch identifiers that appeared earlier.
    SessionReady,
    /// The coordinator session was lost; new issuance is suspended while
    /// pending entries keep aging toward their timeout.
    SessionLost,
    /// Lobby detail responses delivered by the transport.
    Responses(Vec<LobbyDetails>),
    /// The watched log file changed; equivalent to a non-forced poll.
    LogChanged,
    /// Clean stop requested.
    Shutdown,
}
