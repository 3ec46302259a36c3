//! Transport seam between the reconciliation engine and the coordinator.
//!
//! The [`Transport`] trait decouples the engine from the actual coordinator
//! connection (currently [`CoordinatorClient`](crate::io::coordinator::CoordinatorClient)).
//! Tests use a scripted transport that records sends without a network.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::core::types::{LobbyDetails, LobbyId};

/// Capability the engine needs from the coordinator session.
pub trait Transport {
    /// Whether the coordinator session is established and requests may be
    /// issued.
    fn session_ready(&self) -> bool;

    /// Fire-and-forget lobby detail request. The outcome of the exchange is
    /// observed later via an inbound response or a timeout, never here; an
    /// `Err` only means the frame could not be written.
    fn send_find_lobbies(&self, lobby_ids: &[LobbyId]) -> Result<()>;
}

/// Client → coordinator frames, one JSON object per line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Authentication handshake sent immediately after connecting.
    Hello { username: String, password: String },
    /// Detail request for one or more lobbies.
    FindLobbies { lobby_ids: Vec<LobbyId> },
}

/// Coordinator → client frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Handshake accepted; the session is ready.
    Welcome { version: u32 },
    /// The coordinator ended the session; the connection may stay open.
    LoggedOff { reason: String },
    /// Lobby detail response. `specific` is false for broadcast lists that
    /// did not answer a direct request.
    Lobbies {
        specific: bool,
        games: Vec<LobbyDetails>,
    },
}
