//! Watcher configuration (TOML).

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Watcher configuration.
///
/// This file is intended to be edited by humans and must remain stable and
/// automatable. Missing fields default to the product's fixed timing
/// parameters (poll 1s, request timeout 3s, 2 retries).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WatcherConfig {
    /// Path of the append-only console log to tail. The file may not exist
    /// at startup; it is picked up once it appears.
    pub log_path: PathBuf,

    /// Marker pattern extracting one numeric lobby id per match (capture
    /// group 1).
    pub lobby_pattern: String,

    /// Cadence of the reconciliation tick. Bounds worst-case detection
    /// latency for new identifiers and timeouts.
    pub poll_interval_secs: u64,

    /// Age after which an unanswered detail request is retried.
    pub request_timeout_secs: u64,

    /// Retries consumed per lobby before the run is declared failed and the
    /// whole session restarts.
    pub max_retries: u32,

    /// Delay between tearing a failed session down and rebuilding it.
    pub restart_delay_secs: u64,

    /// Delay before the coordinator client reconnects after a disconnect.
    pub reconnect_delay_secs: u64,

    /// Coordinator address (`host:port`).
    pub coordinator_addr: String,

    /// Known players to call out in lobby reports: account id (as a string
    /// key, TOML restriction) to display name.
    pub friends: BTreeMap<String, String>,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from("console.log"),
            lobby_pattern: r"LOBBY STATE RUN: lobby (\d+)".to_string(),
            poll_interval_secs: 1,
            request_timeout_secs: 3,
            max_retries: 2,
            restart_delay_secs: 3,
            reconnect_delay_secs: 5,
            coordinator_addr: "127.0.0.1:7355".to_string(),
            friends: BTreeMap::new(),
        }
    }
}

impl WatcherConfig {
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_secs == 0 {
            return Err(anyhow!("poll_interval_secs must be > 0"));
        }
        if self.request_timeout_secs == 0 {
            return Err(anyhow!("request_timeout_secs must be > 0"));
        }
        if self.restart_delay_secs == 0 {
            return Err(anyhow!("restart_delay_secs must be > 0"));
        }
        if self.coordinator_addr.trim().is_empty() {
            return Err(anyhow!("coordinator_addr must not be empty"));
        }
        let pattern = Regex::new(&self.lobby_pattern)
            .with_context(|| format!("invalid lobby_pattern {:?}", self.lobby_pattern))?;
        if pattern.captures_len() < 2 {
            return Err(anyhow!(
                "lobby_pattern must contain one capture group for the numeric id"
            ));
        }
        for key in self.friends.keys() {
            key.parse::<u32>()
                .map_err(|_| anyhow!("friends key {key:?} is not a numeric account id"))?;
        }
        Ok(())
    }

    /// Compiled marker pattern. `validate` must have accepted the config.
    pub fn pattern(&self) -> Result<Regex> {
        Regex::new(&self.lobby_pattern)
            .with_context(|| format!("compile lobby_pattern {:?}", self.lobby_pattern))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn restart_delay(&self) -> Duration {
        Duration::from_secs(self.restart_delay_secs)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `WatcherConfig::default()`.
pub fn load_config(path: &Path) -> Result<WatcherConfig> {
    if !path.exists() {
        let cfg = WatcherConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: WatcherConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &WatcherConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    if !parent.as_os_str().is_empty() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, WatcherConfig::default());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("lobbywatch.toml");
        let mut cfg = WatcherConfig::default();
        cfg.friends.insert("12345".to_string(), "alice".to_string());
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn default_carries_fixed_timing_parameters() {
        let cfg = WatcherConfig::default();
        assert_eq!(cfg.poll_interval_secs, 1);
        assert_eq!(cfg.request_timeout_secs, 3);
        assert_eq!(cfg.max_retries, 2);
    }

    #[test]
    fn validate_rejects_bad_pattern() {
        let cfg = WatcherConfig {
            lobby_pattern: "lobby [".to_string(),
            ..WatcherConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = WatcherConfig {
            lobby_pattern: r"lobby \d+".to_string(),
            ..WatcherConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("capture group"));
    }

    #[test]
    fn validate_rejects_zero_intervals() {
        let cfg = WatcherConfig {
            poll_interval_secs: 0,
            ..WatcherConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = WatcherConfig {
            request_timeout_secs: 0,
            ..WatcherConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_non_numeric_friend_keys() {
        let mut cfg = WatcherConfig::default();
        cfg.friends.insert("not-a-number".to_string(), "bob".to_string());
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("account id"));
    }
}
