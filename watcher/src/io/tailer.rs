//! Incremental, fault-tolerant tailing of the console log.

use std::fs;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{debug, info, warn};

use crate::core::types::LobbyId;

/// Tails an append-only log file and extracts the most recent lobby marker
/// from newly appended bytes.
///
/// The cursor starts at the file's current length, so content written before
/// the watcher started is only scanned by a forced poll. The cursor is
/// monotonically non-decreasing except on truncation, where it resets to the
/// new (smaller) length — stale content is never re-scanned.
#[derive(Debug)]
pub struct LogTailer {
    path: PathBuf,
    pattern: Regex,
    cursor: u64,
}

impl LogTailer {
    /// Create a tailer positioned at the current end of `path`.
    ///
    /// A missing file is not an error; the cursor starts at zero and the
    /// file is picked up once it appears.
    pub fn new(path: &Path, pattern: Regex) -> Self {
        let cursor = fs::metadata(path).map(|meta| meta.len()).unwrap_or(0);
        Self {
            path: path.to_path_buf(),
            pattern,
            cursor,
        }
    }

    /// Inspect the file and return the id from the last marker occurrence in
    /// newly appended bytes (or the whole file when `force` is set).
    ///
    /// Returns `None` when the file is missing, has not grown, shrank
    /// (cursor resets to the new length), or a transient read error occurred
    /// (cursor unchanged, the next poll retries naturally).
    pub fn poll(&mut self, force: bool) -> Option<LobbyId> {
        let len = match fs::metadata(&self.path) {
            Ok(meta) => meta.len(),
            Err(err) => {
                debug!(path = %self.path.display(), error = %err, "log file not readable yet");
                return None;
            }
        };

        if len < self.cursor {
            info!(
                path = %self.path.display(),
                old = self.cursor,
                new = len,
                "log file shrank, resetting cursor"
            );
            self.cursor = len;
            return None;
        }
        if len == self.cursor && !force {
            return None;
        }

        let start = if force { 0 } else { self.cursor };
        match self.read_from(start) {
            Ok(text) => {
                self.cursor = len;
                self.last_marker(&text)
            }
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "could not read log file");
                None
            }
        }
    }

    fn read_from(&self, offset: u64) -> io::Result<String> {
        let mut file = fs::File::open(&self.path)?;
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Last marker occurrence wins: a new observation overwrites any earlier
    /// id in the same read.
    fn last_marker(&self, text: &str) -> Option<LobbyId> {
        self.pattern
            .captures_iter(text)
            .filter_map(|caps| caps.get(1)?.as_str().parse::<LobbyId>().ok())
            .last()
    }

    #[cfg(test)]
    fn cursor(&self) -> u64 {
        self.cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TempLog;

    fn tailer(log: &TempLog) -> LogTailer {
        let pattern = Regex::new(r"LOBBY STATE RUN: lobby (\d+)").expect("pattern");
        LogTailer::new(&log.path, pattern)
    }

    #[test]
    fn missing_file_polls_none() {
        let temp = tempfile::tempdir().expect("tempdir");
        let pattern = Regex::new(r"lobby (\d+)").expect("pattern");
        let mut tailer = LogTailer::new(&temp.path().join("absent.log"), pattern);
        assert_eq!(tailer.poll(false), None);
        assert_eq!(tailer.poll(true), None);
    }

    #[test]
    fn content_before_startup_is_not_scanned() {
        let log = TempLog::new().expect("log");
        log.append_marker(111);
        let mut tailer = tailer(&log);
        assert_eq!(tailer.poll(false), None);
    }

    #[test]
    fn forced_poll_scans_from_start() {
        let log = TempLog::new().expect("log");
        log.append_marker(111);
        let mut tailer = tailer(&log);
        assert_eq!(tailer.poll(true), Some(111));
    }

    #[test]
    fn growth_yields_last_marker_only() {
        let log = TempLog::new().expect("log");
        let mut tailer = tailer(&log);

        log.append("noise line\n");
        log.append_marker(111);
        log.append_marker(222);
        assert_eq!(tailer.poll(false), Some(222));
    }

    #[test]
    fn polls_never_rescan_consumed_bytes() {
        let log = TempLog::new().expect("log");
        let mut tailer = tailer(&log);

        log.append_marker(111);
        assert_eq!(tailer.poll(false), Some(111));
        let cursor = tailer.cursor();

        // No growth: nothing to read, cursor untouched.
        assert_eq!(tailer.poll(false), None);
        assert_eq!(tailer.cursor(), cursor);

        // New content only: the old marker is not seen again.
        log.append("irrelevant line\n");
        assert_eq!(tailer.poll(false), None);
        assert!(tailer.cursor() > cursor);
    }

    #[test]
    fn truncation_resets_cursor_without_rescanning() {
        let log = TempLog::new().expect("log");
        let mut tailer = tailer(&log);

        log.append_marker(111);
        assert_eq!(tailer.poll(false), Some(111));

        log.truncate();
        assert_eq!(tailer.poll(false), None);
        assert_eq!(tailer.cursor(), 0);

        // Only growth after the truncation is observed.
        log.append_marker(333);
        assert_eq!(tailer.poll(false), Some(333));
    }

    #[test]
    fn non_numeric_capture_is_skipped() {
        let log = TempLog::new().expect("log");
        let pattern = Regex::new(r"lobby (\w+)").expect("pattern");
        let mut tailer = LogTailer::new(&log.path, pattern);

        log.append("lobby abc\n");
        log.append("lobby 444\n");
        log.append("lobby xyz\n");
        assert_eq!(tailer.poll(false), Some(444));
    }
}
