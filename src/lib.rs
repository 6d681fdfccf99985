//! playctl - local coordination for a publishing platform CLI
//!
//! Keeps concurrent invocations on one machine (and on machines sharing a
//! data directory) from trampling each other: advisory package locks,
//! persisted edit transactions, a content-addressed artifact cache and an
//! idempotency ledger for retry-safe uploads and commits.

pub mod artifact;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod edit;
pub mod error;
pub mod idempotency;
pub mod lock;
pub mod storage;
pub mod sweep;
pub mod ui;

pub use coordinator::Coordinator;
pub use error::{PlayctlError, PlayctlResult};
