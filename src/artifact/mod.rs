//! Artifact hashing and caching
//!
//! Uploads are keyed by content: the same bundle hashed twice within the
//! cache TTL is recognized without re-reading it, and the same bytes
//! always map to the same entry.

pub mod cache;
pub mod hash;

pub use cache::{ArtifactCache, CacheEntry, CACHE_TTL_HOURS};
pub use hash::{hash_file, is_sha256_hex, sha256_hex, HashProgress, HASH_BLOCK_SIZE, PROGRESS_THRESHOLD};
