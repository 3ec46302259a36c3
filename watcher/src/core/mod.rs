//! Pure, deterministic reconciliation logic.
//!
//! Nothing in this module performs I/O or reads the clock; callers pass
//! `Instant`s in, which keeps timeout behavior reproducible under test.

pub mod tracker;
pub mod types;
