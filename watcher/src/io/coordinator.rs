//! Coordinator session client: connect, authenticate, dispatch, reconnect.
//!
//! A background reader thread owns the connection lifecycle: connect, send
//! the hello handshake, then dispatch inbound frames into the engine's event
//! channel. On disconnect it clears readiness, reports the loss, waits the
//! reconnect delay, and starts over. Requests are written through a
//! mutex-guarded stream handle so the engine thread never blocks on the
//! reader.

use std::env;
use std::io::{BufRead, BufReader, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info, warn};

use crate::core::types::{EngineEvent, LobbyId};
use crate::io::transport::{ClientMsg, ServerMsg, Transport};

/// Coordinator login credentials.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub const USERNAME_VAR: &'static str = "LOBBYWATCH_USERNAME";
    pub const PASSWORD_VAR: &'static str = "LOBBYWATCH_PASSWORD";

    /// Read credentials from the environment. Both variables must be set.
    pub fn from_env() -> Result<Self> {
        let username = env::var(Self::USERNAME_VAR)
            .map_err(|_| anyhow!("{} is not set", Self::USERNAME_VAR))?;
        let password = env::var(Self::PASSWORD_VAR)
            .map_err(|_| anyhow!("{} is not set", Self::PASSWORD_VAR))?;
        if username.is_empty() || password.is_empty() {
            return Err(anyhow!(
                "{} and {} must be non-empty",
                Self::USERNAME_VAR,
                Self::PASSWORD_VAR
            ));
        }
        Ok(Self { username, password })
    }
}

struct Shared {
    addr: String,
    reconnect_delay: Duration,
    ready: AtomicBool,
    shutdown: AtomicBool,
    stream: Mutex<Option<TcpStream>>,
}

/// Live coordinator session. Dropping the client tears the connection down
/// and joins the reader thread.
pub struct CoordinatorClient {
    shared: Arc<Shared>,
    reader: Option<JoinHandle<()>>,
}

impl CoordinatorClient {
    /// Start the session: spawns the reader thread, which connects and keeps
    /// reconnecting until the client is dropped. Session readiness is
    /// reported through `events`, not through this constructor.
    pub fn connect(
        addr: &str,
        reconnect_delay: Duration,
        credentials: Credentials,
        events: Sender<EngineEvent>,
    ) -> Result<Self> {
        let shared = Arc::new(Shared {
            addr: addr.to_string(),
            reconnect_delay,
            ready: AtomicBool::new(false),
            shutdown: AtomicBool::new(false),
            stream: Mutex::new(None),
        });
        let thread_shared = Arc::clone(&shared);
        let reader = thread::Builder::new()
            .name("coordinator-reader".to_string())
            .spawn(move || session_loop(&thread_shared, &credentials, &events))
            .context("spawn coordinator reader thread")?;
        Ok(Self {
            shared,
            reader: Some(reader),
        })
    }
}

impl Transport for CoordinatorClient {
    fn session_ready(&self) -> bool {
        self.shared.ready.load(Ordering::Relaxed)
    }

    fn send_find_lobbies(&self, lobby_ids: &[LobbyId]) -> Result<()> {
        send_line(
            &self.shared,
            &ClientMsg::FindLobbies {
                lobby_ids: lobby_ids.to_vec(),
            },
        )
    }
}

impl Drop for CoordinatorClient {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::Relaxed);
        if let Ok(mut guard) = self.shared.stream.lock() {
            if let Some(stream) = guard.take() {
                let _ = stream.shutdown(Shutdown::Both);
            }
        }
        if let Some(handle) = self.reader.take() {
            let _ = handle.join();
        }
    }
}

fn session_loop(shared: &Shared, credentials: &Credentials, events: &Sender<EngineEvent>) {
    while !shared.shutdown.load(Ordering::Relaxed) {
        match run_session(shared, credentials, events) {
            Ok(()) => debug!("coordinator connection closed"),
            Err(err) => warn!(error = %err, "coordinator session failed"),
        }

        let was_ready = shared.ready.swap(false, Ordering::Relaxed);
        if let Ok(mut guard) = shared.stream.lock() {
            *guard = None;
        }
        if shared.shutdown.load(Ordering::Relaxed) {
            break;
        }
        if was_ready {
            let _ = events.send(EngineEvent::SessionLost);
        }
        info!(
            delay_secs = shared.reconnect_delay.as_secs_f32(),
            "reconnecting to coordinator"
        );
        sleep_unless_shutdown(&shared.shutdown, shared.reconnect_delay);
    }
}

/// One connection's lifetime: connect, hello, then read frames until the
/// stream closes or fails.
fn run_session(
    shared: &Shared,
    credentials: &Credentials,
    events: &Sender<EngineEvent>,
) -> Result<()> {
    info!(addr = %shared.addr, "connecting to coordinator");
    let stream =
        TcpStream::connect(&shared.addr).with_context(|| format!("connect {}", shared.addr))?;
    let reader = BufReader::new(stream.try_clone().context("clone coordinator stream")?);
    {
        let mut guard = shared
            .stream
            .lock()
            .map_err(|_| anyhow!("stream lock poisoned"))?;
        *guard = Some(stream);
    }

    send_line(
        shared,
        &ClientMsg::Hello {
            username: credentials.username.clone(),
            password: credentials.password.clone(),
        },
    )
    .context("send hello")?;

    for line in reader.lines() {
        if shared.shutdown.load(Ordering::Relaxed) {
            return Ok(());
        }
        let line = line.context("read coordinator frame")?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<ServerMsg>(&line) {
            Ok(msg) => dispatch(shared, events, msg),
            Err(err) => warn!(error = %err, "unparseable coordinator frame"),
        }
    }
    Ok(())
}

fn dispatch(shared: &Shared, events: &Sender<EngineEvent>, msg: ServerMsg) {
    match msg {
        ServerMsg::Welcome { version } => {
            info!(version, "coordinator session ready");
            shared.ready.store(true, Ordering::Relaxed);
            let _ = events.send(EngineEvent::SessionReady);
        }
        ServerMsg::LoggedOff { reason } => {
            warn!(reason = %reason, "logged off by coordinator");
            if shared.ready.swap(false, Ordering::Relaxed) {
                let _ = events.send(EngineEvent::SessionLost);
            }
        }
        ServerMsg::Lobbies { specific, games } => {
            if !specific || games.is_empty() {
                debug!(
                    specific,
                    count = games.len(),
                    "ignoring non-specific or empty lobby response"
                );
                return;
            }
            let _ = events.send(EngineEvent::Responses(games));
        }
    }
}

fn send_line(shared: &Shared, msg: &ClientMsg) -> Result<()> {
    let mut guard = shared
        .stream
        .lock()
        .map_err(|_| anyhow!("stream lock poisoned"))?;
    let stream = guard
        .as_mut()
        .ok_or_else(|| anyhow!("not connected to coordinator"))?;
    let mut line = serde_json::to_string(msg).context("serialize frame")?;
    line.push('\n');
    stream.write_all(line.as_bytes()).context("write frame")?;
    stream.flush().context("flush frame")?;
    Ok(())
}

/// Sleep in small slices so a concurrent shutdown never waits out the full
/// delay.
pub(crate) fn sleep_unless_shutdown(shutdown: &AtomicBool, total: Duration) {
    let slice = Duration::from_millis(100);
    let mut remaining = total;
    while !shutdown.load(Ordering::Relaxed) && remaining > Duration::ZERO {
        let step = remaining.min(slice);
        thread::sleep(step);
        remaining = remaining.saturating_sub(step);
    }
}
