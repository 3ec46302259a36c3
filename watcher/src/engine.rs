//! The reconciliation loop: ties the log tailer, the request tracker, and
//! the transport together.
//!
//! The engine is tick-structured: every unit of work happens inside
//! [`Engine::tick`] or [`Engine::handle_event`], both driven from one thread,
//! so the tracker's state never needs locking. [`Engine::run`] merges timer
//! ticks and asynchronous events through a single `recv_timeout` queue.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::core::tracker::RequestTracker;
use crate::core::types::{EngineEvent, IssueError, LobbyDetails, LobbyId};
use crate::io::config::WatcherConfig;
use crate::io::tailer::LogTailer;
use crate::io::transport::Transport;
use crate::report;

/// Why the engine stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStop {
    /// Retries for a lobby are exhausted. The supervisor must tear the whole
    /// session down and rebuild it; in-memory state does not survive.
    RetriesExhausted { lobby_id: LobbyId },
    /// Clean shutdown was requested.
    Shutdown,
}

/// One reconciliation engine run.
///
/// The most recently seen log identifier is authoritative: a new observation
/// overwrites the current one even while an earlier request is still pending
/// (the orphaned entry is resolved only by completion or the timeout sweep).
pub struct Engine<T: Transport> {
    tailer: LogTailer,
    tracker: RequestTracker,
    transport: T,
    /// Most recent identifier seen in the log.
    current: Option<LobbyId>,
    /// Last identifier fed to the tracker. Left unchanged on `NotReady` so
    /// the next tick retries issuance.
    last_issued: Option<LobbyId>,
    poll_interval: Duration,
    request_timeout: Duration,
    max_retries: u32,
    friends: BTreeMap<String, String>,
}

impl<T: Transport> Engine<T> {
    pub fn new(config: &WatcherConfig, transport: T) -> Result<Self> {
        let tailer = LogTailer::new(&config.log_path, config.pattern()?);
        Ok(Self {
            tailer,
            tracker: RequestTracker::new(),
            transport,
            current: None,
            last_issued: None,
            poll_interval: config.poll_interval(),
            request_timeout: config.request_timeout(),
            max_retries: config.max_retries,
            friends: config.friends.clone(),
        })
    }

    /// Drive ticks at the poll cadence, merging in asynchronous events, until
    /// a stop condition or the shutdown flag is raised.
    pub fn run(&mut self, events: &Receiver<EngineEvent>, shutdown: &AtomicBool) -> EngineStop {
        loop {
            if shutdown.load(Ordering::Relaxed) {
                return EngineStop::Shutdown;
            }
            let stop = match events.recv_timeout(self.poll_interval) {
                Ok(event) => self.handle_event(event, Instant::now()),
                Err(RecvTimeoutError::Timeout) => self.tick(Instant::now(), false),
                Err(RecvTimeoutError::Disconnected) => return EngineStop::Shutdown,
            };
            if let Some(stop) = stop {
                return stop;
            }
        }
    }

    /// One reconciliation cycle: poll the log, issue for a new identifier,
    /// sweep timeouts. No suspension mid-tick.
    pub fn tick(&mut self, now: Instant, force_poll: bool) -> Option<EngineStop> {
        if let Some(id) = self.tailer.poll(force_poll) {
            if self.current != Some(id) {
                info!(lobby_id = id, "detected new lobby id");
                self.current = Some(id);
            }
        }
        if let Some(id) = self.current {
            if self.last_issued != Some(id) {
                self.try_issue(id, now);
            }
        }
        self.sweep(now)
    }

    /// Process one asynchronous event on the engine thread.
    pub fn handle_event(&mut self, event: EngineEvent, now: Instant) -> Option<EngineStop> {
        match event {
            EngineEvent::SessionReady => {
                info!("session ready, force-reading console log");
                self.tick(now, true)
            }
            EngineEvent::SessionLost => {
                info!("session lost, suspending issuance until it returns");
                None
            }
            EngineEvent::Responses(games) => {
                self.handle_responses(&games);
                None
            }
            EngineEvent::LogChanged => self.tick(now, false),
            EngineEvent::Shutdown => Some(EngineStop::Shutdown),
        }
    }

    fn try_issue(&mut self, id: LobbyId, now: Instant) {
        match self.tracker.issue(id, now, self.transport.session_ready()) {
            Ok(()) => {
                info!(lobby_id = id, "requesting lobby details");
                self.send(id);
                self.last_issued = Some(id);
            }
            Err(IssueError::AlreadyHandled) => {
                debug!(lobby_id = id, "lobby already handled, skipping request");
                self.last_issued = Some(id);
            }
            Err(IssueError::NotReady) => {
                debug!(lobby_id = id, "coordinator not ready, retrying next tick");
            }
        }
    }

    fn send(&self, id: LobbyId) {
        if let Err(err) = self.transport.send_find_lobbies(&[id]) {
            // The pending entry stays tracked; the timeout sweep retries.
            warn!(lobby_id = id, error = %err, "could not send lobby request");
        }
    }

    fn sweep(&mut self, now: Instant) -> Option<EngineStop> {
        let outcome = self.tracker.sweep_timeouts(
            now,
            self.request_timeout,
            self.max_retries,
            self.transport.session_ready(),
        );
        for &id in &outcome.retried {
            info!(
                lobby_id = id,
                attempt = self.tracker.retries(id).unwrap_or(0),
                max_retries = self.max_retries,
                "lobby request timed out, retrying"
            );
            self.send(id);
        }
        for &id in &outcome.dropped {
            debug!(lobby_id = id, "dropping stale pending entry, already completed");
        }
        if let Some(&id) = outcome.exhausted.first() {
            warn!(
                lobby_id = id,
                max_retries = self.max_retries,
                "max retries exceeded, session restart required"
            );
            return Some(EngineStop::RetriesExhausted { lobby_id: id });
        }
        None
    }

    fn handle_responses(&mut self, games: &[LobbyDetails]) {
        if games.is_empty() {
            debug!("received empty lobby response");
            return;
        }
        for game in games {
            if self.tracker.complete(game.lobby_id) {
                println!("{}", report::render(game, &self.friends));
            } else {
                debug!(lobby_id = game.lobby_id, "duplicate lobby response ignored");
            }
        }
    }

    #[cfg(any(test, feature = "test-support"))]
    pub fn tracker(&self) -> &RequestTracker {
        &self.tracker
    }
}
