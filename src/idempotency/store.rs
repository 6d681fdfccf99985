//! Idempotency ledger
//!
//! Before a side-effecting remote call, callers check the ledger for its
//! key; after the call succeeds they record its result. A retry of the
//! same operation with the same inputs then finds the record and reuses
//! the result instead of repeating the call.

use crate::error::{PlayctlError, PlayctlResult};
use crate::idempotency::key::{commit_key, is_valid_key, upload_key, OP_COMMIT, OP_UPLOAD};
use crate::storage::{list_records, read_record, remove_record, write_record};
use crate::sweep::{remove_if_expired, sweep_paths, SweepReport};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Default lifetime of a ledger entry
pub const IDEMPOTENCY_TTL_HOURS: i64 = 24;

/// Proof that an operation with specific inputs completed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdempotencyEntry {
    pub key: String,

    /// Operation kind, e.g. `upload` or `commit`
    pub operation: String,

    pub package_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,

    /// Result of the original operation
    pub data: Value,

    pub timestamp: DateTime<Utc>,

    pub expires_at: DateTime<Utc>,
}

impl IdempotencyEntry {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Result of a ledger lookup
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Lookup {
    /// A live entry exists
    pub found: bool,

    /// Result recorded by the original operation
    pub data: Option<Value>,

    /// When the original operation completed
    pub timestamp: Option<DateTime<Utc>>,

    /// An entry existed but had expired (and was removed)
    pub expired: bool,
}

/// File-backed idempotency ledger
pub struct IdempotencyStore {
    dir: PathBuf,
    ttl: Duration,
    workers: usize,
}

impl IdempotencyStore {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration, workers: usize) -> Self {
        Self {
            dir: dir.into(),
            ttl,
            workers,
        }
    }

    fn entry_path(&self, key: &str) -> PlayctlResult<PathBuf> {
        if !is_valid_key(key) {
            return Err(PlayctlError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }

    /// Whether a live entry exists for `key`
    pub async fn check(&self, key: &str) -> PlayctlResult<bool> {
        Ok(self.get(key).await?.found)
    }

    /// Look up `key`, removing the entry if it has expired
    pub async fn get(&self, key: &str) -> PlayctlResult<Lookup> {
        let path = self.entry_path(key)?;
        let Some(entry) = read_record::<IdempotencyEntry>(&path).await? else {
            return Ok(Lookup::default());
        };

        if entry.key != key {
            debug!("Ledger entry {} has mismatched key, ignoring", path.display());
            return Ok(Lookup::default());
        }

        if entry.is_expired(Utc::now()) {
            debug!("Ledger entry {} expired at {}", key, entry.expires_at);
            remove_record(&path).await?;
            return Ok(Lookup {
                expired: true,
                ..Lookup::default()
            });
        }

        Ok(Lookup {
            found: true,
            data: Some(entry.data),
            timestamp: Some(entry.timestamp),
            expired: false,
        })
    }

    /// Record completion of an operation known only by its key
    pub async fn record(&self, key: &str, data: Value) -> PlayctlResult<IdempotencyEntry> {
        self.record_with_meta(key, "", "", None, data).await
    }

    /// Record completion of `operation` on `package`
    pub async fn record_with_meta(
        &self,
        key: &str,
        operation: &str,
        package: &str,
        content_hash: Option<&str>,
        data: Value,
    ) -> PlayctlResult<IdempotencyEntry> {
        let path = self.entry_path(key)?;
        let now = Utc::now();
        let entry = IdempotencyEntry {
            key: key.to_string(),
            operation: operation.to_string(),
            package_name: package.to_string(),
            content_hash: content_hash.map(str::to_string),
            data,
            timestamp: now,
            expires_at: now
                .checked_add_signed(self.ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        };
        write_record(&path, &entry).await?;

        debug!("Recorded {} for {} under {}", operation, package, key);
        Ok(entry)
    }

    /// Forget `key`, returning whether an entry existed
    pub async fn clear(&self, key: &str) -> PlayctlResult<bool> {
        let path = self.entry_path(key)?;
        remove_record(&path).await
    }

    /// Delete every expired entry
    pub async fn clean_expired(&self, cancel: &CancellationToken) -> PlayctlResult<SweepReport> {
        let paths = list_records(&self.dir).await?;
        let report = sweep_paths(paths, self.workers, cancel, |path| async move {
            remove_if_expired(&path, |entry: &IdempotencyEntry| entry.expires_at).await
        })
        .await?;

        info!(
            "Idempotency sweep: {} removed, {} kept, {} skipped",
            report.removed, report.kept, report.skipped
        );
        Ok(report)
    }

    /// Result of an earlier upload of the same content, if any
    pub async fn check_upload(&self, package: &str, content_hash: &str) -> PlayctlResult<Option<Value>> {
        Ok(self.get(&upload_key(package, content_hash)).await?.data)
    }

    /// Record a completed upload
    pub async fn record_upload(
        &self,
        package: &str,
        content_hash: &str,
        data: Value,
    ) -> PlayctlResult<IdempotencyEntry> {
        let key = upload_key(package, content_hash);
        self.record_with_meta(&key, OP_UPLOAD, package, Some(content_hash), data)
            .await
    }

    /// Result of an earlier commit of the same edit and content, if any
    pub async fn check_commit(
        &self,
        package: &str,
        edit_id: &str,
        content_id: &str,
    ) -> PlayctlResult<Option<Value>> {
        Ok(self
            .get(&commit_key(package, edit_id, content_id))
            .await?
            .data)
    }

    /// Record a completed commit
    pub async fn record_commit(
        &self,
        package: &str,
        edit_id: &str,
        content_id: &str,
        data: Value,
    ) -> PlayctlResult<IdempotencyEntry> {
        let key = commit_key(package, edit_id, content_id);
        self.record_with_meta(&key, OP_COMMIT, package, Some(content_id), data)
            .await
    }
}
