//! Side-effecting operations: configuration, log tailing, the coordinator
//! transport, and file-change signals.

pub mod config;
pub mod coordinator;
pub mod tailer;
pub mod transport;
pub mod watch;
