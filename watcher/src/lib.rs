//! Lobby discovery and request reconciliation watcher.
//!
//! This crate tails a game console log for lobby identifiers and, for each
//! newly observed identifier, drives an exactly-once detail request against a
//! remote coordinator with bounded retries. The architecture enforces a strict
//! separation:
//!
//! - **[`core`]**: Pure, deterministic logic (request tracking, timeout
//!   sweeps). No I/O, time is always passed in, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (log tailing, configuration, the
//!   coordinator transport, file-change signals). Isolated to enable scripted
//!   doubles in tests.
//!
//! Orchestration modules ([`engine`], [`supervisor`]) coordinate core logic
//! with I/O: the engine runs the per-tick reconciliation loop, the supervisor
//! tears it down and rebuilds it when retries are exhausted.

pub mod core;
pub mod engine;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod report;
pub mod supervisor;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
