//! Idempotency key derivation
//!
//! A key is the truncated SHA-256 of the operation, the package and one
//! identifying string, in that order. Field order matters: callers must
//! pass the same fields in the same positions for the same logical
//! operation or the keys will never match.

use sha2::{Digest, Sha256};

/// Length of a derived key in hex characters
pub const KEY_LENGTH: usize = 32;

/// Operation name for artifact uploads
pub const OP_UPLOAD: &str = "upload";

/// Operation name for edit commits
pub const OP_COMMIT: &str = "commit";

/// Derive the ledger key for `operation` on `package` identified by `identifier`
pub fn derive_key(operation: &str, package: &str, identifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(operation.as_bytes());
    hasher.update(b":");
    hasher.update(package.as_bytes());
    hasher.update(b":");
    hasher.update(identifier.as_bytes());

    let mut key = hex::encode(hasher.finalize());
    key.truncate(KEY_LENGTH);
    key
}

/// Key for uploading content with hash `content_hash`
pub fn upload_key(package: &str, content_hash: &str) -> String {
    derive_key(OP_UPLOAD, package, content_hash)
}

/// Key for committing edit `edit_id` carrying `content_id`.
///
/// The edit id is length-prefixed so ids containing `:` cannot collide.
pub fn commit_key(package: &str, edit_id: &str, content_id: &str) -> String {
    let identifier = format!("{}:{}:{}", edit_id.len(), edit_id, content_id);
    derive_key(OP_COMMIT, package, &identifier)
}

/// Whether `key` may be used as a ledger file name
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= 128
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
}
