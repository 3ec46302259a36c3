//! Supervising loop around the engine and its coordinator session.
//!
//! Exhausted retries are the engine's single fatal condition. Instead of the
//! engine restarting itself, this loop tears the whole session down (socket,
//! reader thread, log watch, all in-memory tracking) and reconstructs it
//! from scratch after a delay. A restart never inherits state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::engine::{Engine, EngineStop};
use crate::io::config::WatcherConfig;
use crate::io::coordinator::{CoordinatorClient, Credentials, sleep_unless_shutdown};
use crate::io::watch::watch_log;

/// Run engine sessions until shutdown is requested.
pub fn run_supervised(
    config: &WatcherConfig,
    credentials: &Credentials,
    shutdown: &Arc<AtomicBool>,
) -> Result<()> {
    loop {
        if shutdown.load(Ordering::Relaxed) {
            info!("shutdown requested");
            return Ok(());
        }

        let (events_tx, events_rx) = mpsc::channel();
        let client = CoordinatorClient::connect(
            &config.coordinator_addr,
            config.reconnect_delay(),
            credentials.clone(),
            events_tx.clone(),
        )
        .context("start coordinator client")?;
        // Advisory change signal; periodic polling stays authoritative.
        let log_watch = match watch_log(&config.log_path, events_tx) {
            Ok(watch) => Some(watch),
            Err(err) => {
                warn!(error = %err, "log watch unavailable, relying on periodic polls");
                None
            }
        };
        let mut engine = Engine::new(config, client)?;

        match engine.run(&events_rx, shutdown) {
            EngineStop::Shutdown => {
                info!("engine stopped, shutting down");
                return Ok(());
            }
            EngineStop::RetriesExhausted { lobby_id } => {
                warn!(
                    lobby_id,
                    delay_secs = config.restart_delay_secs,
                    "restarting session after exhausted retries"
                );
            }
        }

        // Release the socket, reader thread, and log watch before the delay
        // so the rebuilt session re-acquires them cleanly.
        drop(engine);
        drop(log_watch);
        sleep_unless_shutdown(shutdown, config.restart_delay());
    }
}
