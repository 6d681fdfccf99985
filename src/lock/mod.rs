//! Advisory cross-process package locks
//!
//! One lock file per package under the data directory. The lock file is
//! the only source of truth: it is created with `O_CREAT | O_EXCL`, so of
//! any number of racing acquirers exactly one creates it. Reading an
//! existing lock and judging it stale only decides whether to delete it
//! before the next create attempt; a racer that loses the create simply
//! polls again.
//!
//! Deleting a stale lock is itself guarded: the file is first renamed to
//! a private tombstone, and only deleted if the tombstone still holds the
//! record that was judged stale. Otherwise a newer holder's lock was
//! caught and is linked back into place.
//!
//! The in-memory map of held locks is bookkeeping for this process
//! (heartbeats, `release_all`) and is never consulted to grant a lock.

mod probe;
mod record;

pub use probe::{current_command, current_hostname, is_process_alive};
pub use record::{LockFile, LockHealth};

use crate::config::schema::LockConfig;
use crate::error::{PlayctlError, PlayctlResult};
use crate::storage::{ensure_private_dir, private_open_options, remove_record, write_record};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Check that a package name is safe to embed in a file name.
///
/// Accepts ASCII alphanumerics plus `.`, `_` and `-`, which covers
/// application ids like `com.example.app`.
pub fn validate_package_name(package: &str) -> PlayctlResult<()> {
    let valid = !package.is_empty()
        && !package.starts_with('.')
        && package
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if valid {
        Ok(())
    } else {
        Err(PlayctlError::InvalidPackageName(package.to_string()))
    }
}

/// Lock file as observed on disk
#[derive(Debug, PartialEq)]
enum Observed {
    Absent,
    Record(LockFile),
    /// Present but undecodable, e.g. caught between another acquirer's
    /// create and write
    Unreadable { modified: Option<DateTime<Utc>> },
}

/// Current state of a package lock, for diagnostics
#[derive(Debug, Clone)]
pub struct LockStatus {
    pub path: PathBuf,
    pub record: Option<LockFile>,
    pub health: LockHealth,
    pub held_by_us: bool,
}

/// Result of [`LockManager::break_lock`]
#[derive(Debug, Clone)]
pub enum BreakOutcome {
    /// No lock file existed
    Unlocked,
    /// Left in place: the holder looks alive and removal was not forced
    Live(LockStatus),
    /// Lock file removed
    Broken(LockStatus),
    /// The lock changed hands while being removed and was left to its new holder
    Replaced,
}

#[derive(Debug, Clone)]
struct HeldLock {
    acquired_at: DateTime<Utc>,
}

/// Acquires and releases package locks
pub struct LockManager {
    dir: PathBuf,
    timeout: Duration,
    poll_interval: Duration,
    stale_after: chrono::Duration,
    hostname: String,
    pid: u32,
    probe: fn(u32) -> bool,
    held: RwLock<HashMap<String, HeldLock>>,
}

impl LockManager {
    /// Create a lock manager storing lock files in `dir`
    pub fn new(dir: impl Into<PathBuf>, config: &LockConfig) -> Self {
        Self {
            dir: dir.into(),
            timeout: config.timeout(),
            poll_interval: config.poll_interval(),
            stale_after: config.stale_after(),
            hostname: current_hostname(),
            pid: std::process::id(),
            probe: is_process_alive,
            held: RwLock::new(HashMap::new()),
        }
    }

    /// Override the hostname written to and compared against lock files
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    /// Override the process liveness probe
    pub fn with_probe(mut self, probe: fn(u32) -> bool) -> Self {
        self.probe = probe;
        self
    }

    /// Path of the lock file for `package`
    pub fn lock_path(&self, package: &str) -> PathBuf {
        self.dir.join(format!("{}.lock", package))
    }

    /// Acquire the lock for `package`, waiting up to the configured timeout
    pub async fn acquire(&self, cancel: &CancellationToken, package: &str) -> PlayctlResult<()> {
        self.acquire_with_timeout(cancel, package, self.timeout)
            .await
    }

    /// Acquire the lock for `package`, waiting up to `timeout`.
    ///
    /// Not reentrant: a second acquire of a lock this process already
    /// holds waits out the timeout like any other contender.
    pub async fn acquire_with_timeout(
        &self,
        cancel: &CancellationToken,
        package: &str,
        timeout: Duration,
    ) -> PlayctlResult<()> {
        validate_package_name(package)?;
        ensure_private_dir(&self.dir).await?;

        if self.held.read().await.contains_key(package) {
            warn!("Lock on {} is already held by this process; waiting anyway", package);
        }

        let path = self.lock_path(package);
        let started = Instant::now();
        // None when the timeout is too large to represent: wait forever
        let deadline = started.checked_add(timeout);

        loop {
            if cancel.is_cancelled() {
                return Err(PlayctlError::Cancelled);
            }

            if self.try_acquire(package, &path).await? {
                info!("Acquired lock on {}", package);
                return Ok(());
            }

            let now = Instant::now();
            let wait = match deadline {
                Some(deadline) if now >= deadline => {
                    return Err(PlayctlError::LockTimeout {
                        package: package.to_string(),
                        waited: now - started,
                    });
                }
                Some(deadline) => self.poll_interval.min(deadline - now),
                None => self.poll_interval,
            };
            tokio::select! {
                _ = cancel.cancelled() => return Err(PlayctlError::Cancelled),
                _ = tokio::time::sleep(wait) => {}
            }
        }
    }

    /// One acquisition attempt. Returns false if the lock is held elsewhere.
    async fn try_acquire(&self, package: &str, path: &Path) -> PlayctlResult<bool> {
        // Serializes the stale decision and the create within this process
        let mut held = self.held.write().await;

        let observed = observe(path).await?;
        match &observed {
            Observed::Absent => {}
            Observed::Record(existing) => {
                let health = existing.health(&self.hostname, Utc::now(), self.stale_after, self.probe);
                if !health.is_stale() {
                    debug!(
                        "Lock on {} held by pid {} on {}",
                        package, existing.pid, existing.hostname
                    );
                    return Ok(false);
                }
                warn!(
                    "Reclaiming {} lock on {} from pid {} on {}",
                    health, package, existing.pid, existing.hostname
                );
                if !reclaim(path, &observed).await? {
                    return Ok(false);
                }
            }
            Observed::Unreadable { modified } => {
                let old = modified.is_some_and(|m| Utc::now() - m > self.stale_after);
                if !old {
                    debug!("Lock on {} is unreadable, treating as held", package);
                    return Ok(false);
                }
                warn!("Reclaiming unreadable lock on {}", package);
                if !reclaim(path, &observed).await? {
                    return Ok(false);
                }
            }
        }

        let record = LockFile::new(self.pid, self.hostname.clone(), current_command());
        if !create_lock_file(path, &record).await? {
            debug!("Lost race for lock on {}", package);
            return Ok(false);
        }

        held.insert(
            package.to_string(),
            HeldLock {
                acquired_at: record.created_at,
            },
        );
        Ok(true)
    }

    /// Release the lock for `package`.
    ///
    /// Removes the lock file whoever created it; no ownership check.
    pub async fn release(&self, package: &str) -> PlayctlResult<()> {
        validate_package_name(package)?;
        let mut held = self.held.write().await;

        let path = self.lock_path(package);
        if remove_record(&path).await? {
            info!("Released lock on {}", package);
        } else {
            debug!("No lock file for {} to release", package);
        }

        if let Some(lock) = held.remove(package) {
            debug!(
                "Lock on {} was held for {}s",
                package,
                (Utc::now() - lock.acquired_at).num_seconds()
            );
        }
        Ok(())
    }

    /// Refresh the heartbeat of a lock held by this process
    pub async fn heartbeat(&self, package: &str) -> PlayctlResult<()> {
        validate_package_name(package)?;
        let held = self.held.write().await;
        if !held.contains_key(package) {
            return Err(PlayctlError::LockNotHeld(package.to_string()));
        }

        let path = self.lock_path(package);
        let mut record = match observe(&path).await? {
            Observed::Record(record) if record.pid == self.pid && record.hostname == self.hostname => {
                record
            }
            _ => return Err(PlayctlError::LockNotHeld(package.to_string())),
        };

        record.heartbeat = Some(Utc::now());
        write_record(&path, &record).await?;
        debug!("Heartbeat for lock on {}", package);
        Ok(())
    }

    /// Inspect the lock for `package` without touching it
    pub async fn inspect(&self, package: &str) -> PlayctlResult<Option<LockStatus>> {
        validate_package_name(package)?;
        let held_by_us = self.held.read().await.contains_key(package);
        let path = self.lock_path(package);
        let observed = observe(&path).await?;
        Ok(self.status(path, &observed, held_by_us))
    }

    /// Remove the lock for `package` on behalf of an operator.
    ///
    /// A lock that looks live and is not held here is left alone unless
    /// `force` is set. Removal goes through the same tombstone check as
    /// stale reclaim, so a lock that changes hands after being judged is
    /// never deleted.
    pub async fn break_lock(&self, package: &str, force: bool) -> PlayctlResult<BreakOutcome> {
        validate_package_name(package)?;
        let mut held = self.held.write().await;
        let path = self.lock_path(package);
        let observed = observe(&path).await?;

        let Some(status) = self.status(path.clone(), &observed, held.contains_key(package)) else {
            return Ok(BreakOutcome::Unlocked);
        };
        if !force && !status.held_by_us && !status.health.is_stale() {
            return Ok(BreakOutcome::Live(status));
        }

        if !reclaim(&path, &observed).await? {
            info!("Lock on {} changed hands, leaving it", package);
            return Ok(BreakOutcome::Replaced);
        }
        held.remove(package);
        warn!("Broke {} lock on {}", status.health, package);
        Ok(BreakOutcome::Broken(status))
    }

    fn status(&self, path: PathBuf, observed: &Observed, held_by_us: bool) -> Option<LockStatus> {
        match observed {
            Observed::Absent => None,
            Observed::Record(record) => Some(LockStatus {
                health: record.health(&self.hostname, Utc::now(), self.stale_after, self.probe),
                record: Some(record.clone()),
                path,
                held_by_us,
            }),
            Observed::Unreadable { .. } => Some(LockStatus {
                path,
                record: None,
                health: LockHealth::Live,
                held_by_us,
            }),
        }
    }

    /// Packages whose locks this process holds
    pub async fn held(&self) -> Vec<String> {
        let mut packages: Vec<_> = self.held.read().await.keys().cloned().collect();
        packages.sort();
        packages
    }

    /// Release every lock this process holds
    pub async fn release_all(&self) -> PlayctlResult<()> {
        for package in self.held().await {
            self.release(&package).await?;
        }
        Ok(())
    }
}

async fn observe(path: &Path) -> PlayctlResult<Observed> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Observed::Absent),
        Err(e) => {
            return Err(PlayctlError::io(format!("reading lock {}", path.display()), e));
        }
    };

    if let Ok(record) = serde_json::from_slice::<LockFile>(&bytes) {
        return Ok(Observed::Record(record));
    }

    let modified = fs::metadata(path)
        .await
        .ok()
        .and_then(|m| m.modified().ok())
        .map(DateTime::<Utc>::from);
    Ok(Observed::Unreadable { modified })
}

/// Delete the lock file at `path` if it still matches `judged`.
///
/// The file is renamed to a unique tombstone first, which only one racer
/// can do. If the tombstone no longer matches what was judged, it is
/// linked back under `path` and false is returned.
async fn reclaim(path: &Path, judged: &Observed) -> PlayctlResult<bool> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tombstone = path.with_file_name(format!(".{}.{}.stale", name, Uuid::new_v4()));

    match fs::rename(path, &tombstone).await {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
        Err(e) => {
            return Err(PlayctlError::io(format!("moving aside lock {}", path.display()), e));
        }
    }

    let moved = observe(&tombstone).await;
    if matches!(moved, Ok(ref moved) if moved == judged) {
        remove_record(&tombstone).await?;
        return Ok(true);
    }

    match fs::hard_link(&tombstone, path).await {
        Ok(()) => debug!("Restored lock {} taken after it was judged", path.display()),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            warn!("Lock {} was replaced while being restored", path.display());
        }
        Err(e) => {
            return Err(PlayctlError::io(format!("restoring lock {}", path.display()), e));
        }
    }
    remove_record(&tombstone).await?;
    Ok(false)
}

/// Create the lock file only if absent. Returns false if it already exists.
async fn create_lock_file(path: &Path, record: &LockFile) -> PlayctlResult<bool> {
    let content = serde_json::to_vec_pretty(record).map_err(|e| {
        PlayctlError::io(
            format!("encoding lock {}", path.display()),
            std::io::Error::new(ErrorKind::InvalidData, e),
        )
    })?;

    let mut file = match private_open_options()
        .write(true)
        .create_new(true)
        .open(path)
        .await
    {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => {
            return Err(PlayctlError::io(format!("creating lock {}", path.display()), e));
        }
    };

    let written = async {
        file.write_all(&content).await?;
        file.sync_all().await
    }
    .await;

    if let Err(e) = written {
        // Do not leave a half-written lock behind to block everyone else
        let _ = fs::remove_file(path).await;
        return Err(PlayctlError::io(format!("writing lock {}", path.display()), e));
    }
    Ok(true)
}
