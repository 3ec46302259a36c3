//! Stable exit codes for lobbywatch CLI commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Command failed due to invalid config, missing credentials, or other errors.
pub const INVALID: i32 = 1;
/// `lobbywatch scan` found no lobby marker in the log.
pub const NO_MARKER: i32 = 2;
