//! Content-addressed artifact cache with TTL invalidation

use crate::artifact::hash::is_sha256_hex;
use crate::error::{PlayctlError, PlayctlResult};
use crate::lock::validate_package_name;
use crate::storage::{list_records, read_record, remove_record, write_record};
use crate::sweep::{remove_if_expired, sweep_paths, SweepReport};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Default lifetime of a cache entry
pub const CACHE_TTL_HOURS: i64 = 24;

/// Metadata about an artifact that was already hashed or uploaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// SHA-256 of the artifact contents
    pub sha256: String,

    /// Last known location of the artifact
    pub path: PathBuf,

    /// Size in bytes
    pub size: u64,

    pub cached_at: DateTime<Utc>,

    pub expires_at: DateTime<Utc>,

    /// Version the artifact was produced for, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_hint: Option<String>,
}

impl CacheEntry {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Artifact cache rooted at one directory, one subdirectory per package
pub struct ArtifactCache {
    dir: PathBuf,
    ttl: Duration,
    workers: usize,
}

impl ArtifactCache {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration, workers: usize) -> Self {
        Self {
            dir: dir.into(),
            ttl,
            workers,
        }
    }

    fn entry_path(&self, package: &str, hash: &str) -> PlayctlResult<PathBuf> {
        validate_package_name(package)?;
        if !is_sha256_hex(hash) {
            return Err(PlayctlError::InvalidHash(hash.to_string()));
        }
        Ok(self.dir.join(package).join(format!("{}.json", hash)))
    }

    /// Look up an artifact by content hash.
    ///
    /// Expired entries are deleted on sight and reported as absent.
    pub async fn get_by_hash(&self, package: &str, hash: &str) -> PlayctlResult<Option<CacheEntry>> {
        let path = self.entry_path(package, hash)?;
        let Some(entry) = read_record::<CacheEntry>(&path).await? else {
            return Ok(None);
        };

        if entry.sha256 != hash {
            debug!("Cache entry {} does not match its key, ignoring", path.display());
            return Ok(None);
        }

        if entry.is_expired(Utc::now()) {
            debug!("Cache entry {} for {} is expired", hash, package);
            remove_record(&path).await?;
            return Ok(None);
        }

        debug!("Cache hit for {} in {}", hash, package);
        Ok(Some(entry))
    }

    /// Record that the artifact at `path` has content hash `hash`
    pub async fn cache_with_hash(
        &self,
        package: &str,
        path: &Path,
        hash: &str,
        version_hint: Option<&str>,
    ) -> PlayctlResult<CacheEntry> {
        let entry_path = self.entry_path(package, hash)?;
        let metadata = fs::metadata(path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => PlayctlError::PathNotFound(path.to_path_buf()),
            _ => PlayctlError::io(format!("reading metadata of {}", path.display()), e),
        })?;

        let now = Utc::now();
        let entry = CacheEntry {
            sha256: hash.to_string(),
            path: path.to_path_buf(),
            size: metadata.len(),
            cached_at: now,
            expires_at: now
                .checked_add_signed(self.ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            version_hint: version_hint.map(str::to_string),
        };
        write_record(&entry_path, &entry).await?;

        debug!("Cached {} for {} until {}", hash, package, entry.expires_at);
        Ok(entry)
    }

    /// Drop a cache entry, returning whether it existed
    pub async fn remove(&self, package: &str, hash: &str) -> PlayctlResult<bool> {
        let path = self.entry_path(package, hash)?;
        remove_record(&path).await
    }

    /// Delete every expired entry across all packages
    pub async fn clean_expired(&self, cancel: &CancellationToken) -> PlayctlResult<SweepReport> {
        let mut paths = vec![];
        for package_dir in package_dirs(&self.dir).await? {
            paths.extend(list_records(&package_dir).await?);
        }

        let report = sweep_paths(paths, self.workers, cancel, |path| async move {
            remove_if_expired(&path, |entry: &CacheEntry| entry.expires_at).await
        })
        .await?;

        info!(
            "Artifact cache sweep: {} removed, {} kept, {} skipped",
            report.removed, report.kept, report.skipped
        );
        Ok(report)
    }
}

async fn package_dirs(root: &Path) -> PlayctlResult<Vec<PathBuf>> {
    let mut entries = match fs::read_dir(root).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(vec![]),
        Err(e) => {
            return Err(PlayctlError::io(format!("reading directory {}", root.display()), e));
        }
    };

    let mut dirs = vec![];
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| PlayctlError::io("reading cache entry", e))?
    {
        let is_dir = entry
            .file_type()
            .await
            .map_err(|e| PlayctlError::io("reading cache entry type", e))?
            .is_dir();
        if is_dir {
            dirs.push(entry.path());
        }
    }
    Ok(dirs)
}
