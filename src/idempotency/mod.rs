//! Idempotency ledger for side-effecting remote operations

pub mod key;
pub mod store;

pub use key::{commit_key, derive_key, upload_key, KEY_LENGTH, OP_COMMIT, OP_UPLOAD};
pub use store::{IdempotencyEntry, IdempotencyStore, Lookup, IDEMPOTENCY_TTL_HOURS};
