//! File-change signal for the watched log.
//!
//! Advisory only: the engine's periodic poll alone is sufficient for
//! correctness, a change event merely shortens detection latency. The watch
//! targets the log's parent directory so a log created after startup is
//! still picked up.

use std::path::Path;
use std::sync::mpsc::Sender;
use std::time::Duration;

use anyhow::{Context, Result};
use notify::{Event as NotifyEvent, EventKind, PollWatcher, RecursiveMode, Watcher};
use tracing::info;

use crate::core::types::EngineEvent;

/// Keeps the underlying watcher alive; dropping it releases the watch.
pub struct LogWatch {
    _watcher: PollWatcher,
}

/// Watch the directory containing `log_path` and send
/// [`EngineEvent::LogChanged`] whenever the log file is created or modified.
pub fn watch_log(log_path: &Path, events: Sender<EngineEvent>) -> Result<LogWatch> {
    let file_name = log_path
        .file_name()
        .with_context(|| format!("log path {} has no file name", log_path.display()))?
        .to_os_string();
    let dir = match log_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => Path::new(".").to_path_buf(),
    };

    let mut watcher = PollWatcher::new(
        move |res: Result<NotifyEvent, notify::Error>| {
            let Ok(event) = res else { return };
            if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                return;
            }
            if event
                .paths
                .iter()
                .any(|path| path.file_name() == Some(file_name.as_os_str()))
            {
                let _ = events.send(EngineEvent::LogChanged);
            }
        },
        notify::Config::default().with_poll_interval(Duration::from_millis(250)),
    )
    .context("create log watcher")?;

    watcher
        .watch(&dir, RecursiveMode::NonRecursive)
        .with_context(|| format!("watch {}", dir.display()))?;
    info!(path = %log_path.display(), "watching console log");

    Ok(LogWatch { _watcher: watcher })
}
