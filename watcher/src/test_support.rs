//! Test-only scripted doubles and log fixtures.

use std::cell::{Cell, RefCell};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result};
use tempfile::TempDir;

use crate::core::types::{LobbyDetails, LobbyId};
use crate::io::transport::Transport;

/// Transport double that records every send and exposes a toggle for session
/// readiness. Clones share state, so tests keep a handle while the engine
/// owns another.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    inner: Rc<ScriptedState>,
}

#[derive(Default)]
struct ScriptedState {
    ready: Cell<bool>,
    sends: RefCell<Vec<Vec<LobbyId>>>,
}

impl ScriptedTransport {
    pub fn new(ready: bool) -> Self {
        let transport = Self::default();
        transport.inner.ready.set(ready);
        transport
    }

    pub fn set_ready(&self, ready: bool) {
        self.inner.ready.set(ready);
    }

    /// Every send so far, in order.
    pub fn sends(&self) -> Vec<Vec<LobbyId>> {
        self.inner.sends.borrow().clone()
    }

    pub fn send_count(&self) -> usize {
        self.inner.sends.borrow().len()
    }
}

impl Transport for ScriptedTransport {
    fn session_ready(&self) -> bool {
        self.inner.ready.get()
    }

    fn send_find_lobbies(&self, lobby_ids: &[LobbyId]) -> Result<()> {
        self.inner.sends.borrow_mut().push(lobby_ids.to_vec());
        Ok(())
    }
}

/// A temp-dir-backed console log with append/truncate helpers.
pub struct TempLog {
    pub path: PathBuf,
    _dir: TempDir,
}

impl TempLog {
    /// Create an empty log file in a fresh temp directory.
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("create tempdir")?;
        let path = dir.path().join("console.log");
        fs::write(&path, "").context("create log file")?;
        Ok(Self { path, _dir: dir })
    }

    pub fn append(&self, text: &str) {
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .expect("open log for append");
        file.write_all(text.as_bytes()).expect("append log");
    }

    /// Append one line carrying the default lobby marker for `id`.
    pub fn append_marker(&self, id: LobbyId) {
        self.append(&format!("[Client] LOBBY STATE RUN: lobby {id} members 10\n"));
    }

    /// Simulate log rotation: drop all content.
    pub fn truncate(&self) {
        fs::write(&self.path, "").expect("truncate log");
    }
}

/// Deterministic lobby details for response fixtures.
pub fn details(lobby_id: LobbyId) -> LobbyDetails {
    LobbyDetails {
        lobby_id,
        match_id: lobby_id + 1_000_000,
        game_time_secs: 120,
        average_mmr: 4321,
        players: Vec::new(),
    }
}
