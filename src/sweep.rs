//! Bounded-concurrency expiry sweeps
//!
//! Shared by the artifact cache and the idempotency ledger. Each file is
//! visited independently with up to K in flight; a failure on one file is
//! counted and skipped so a single unreadable record never blocks cleanup
//! of the rest.

use crate::error::{PlayctlError, PlayctlResult};
use crate::storage::remove_record;
use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Upper bound on concurrent sweep workers
pub const MAX_SWEEP_WORKERS: usize = 4;

/// Outcome of visiting a single file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepAction {
    /// The record was expired and deleted
    Removed,
    /// The record is still live (or already gone)
    Kept,
}

/// Totals for one sweep pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    pub removed: usize,
    pub kept: usize,
    pub skipped: usize,
}

impl SweepReport {
    /// Combine two reports (e.g. cache + ledger)
    pub fn merge(self, other: SweepReport) -> SweepReport {
        SweepReport {
            scanned: self.scanned + other.scanned,
            removed: self.removed + other.removed,
            kept: self.kept + other.kept,
            skipped: self.skipped + other.skipped,
        }
    }
}

/// Default worker count: `min(available_parallelism, MAX_SWEEP_WORKERS)`
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .clamp(1, MAX_SWEEP_WORKERS)
}

/// Resolve a configured worker count, where 0 means auto.
///
/// Explicit counts are capped at `MAX_SWEEP_WORKERS`.
pub fn resolve_workers(configured: usize) -> usize {
    if configured == 0 {
        default_workers()
    } else {
        configured.min(MAX_SWEEP_WORKERS)
    }
}

/// Visit every path with at most `workers` visits in flight.
///
/// Errors from `visit` are logged and counted as skipped. Once `cancel`
/// fires, remaining paths are left untouched and `Cancelled` is returned;
/// whatever was already removed stays removed.
pub async fn sweep_paths<F, Fut>(
    paths: Vec<PathBuf>,
    workers: usize,
    cancel: &CancellationToken,
    visit: F,
) -> PlayctlResult<SweepReport>
where
    F: Fn(PathBuf) -> Fut,
    Fut: Future<Output = PlayctlResult<SweepAction>>,
{
    let scanned = paths.len();
    let removed = AtomicUsize::new(0);
    let kept = AtomicUsize::new(0);
    let skipped = AtomicUsize::new(0);

    let visit = &visit;
    let (removed_ref, kept_ref, skipped_ref) = (&removed, &kept, &skipped);

    stream::iter(paths)
        .for_each_concurrent(workers.max(1), move |path| async move {
            if cancel.is_cancelled() {
                return;
            }
            match visit(path.clone()).await {
                Ok(SweepAction::Removed) => {
                    removed_ref.fetch_add(1, Ordering::Relaxed);
                }
                Ok(SweepAction::Kept) => {
                    kept_ref.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    warn!("Skipping {} during sweep: {}", path.display(), e);
                    skipped_ref.fetch_add(1, Ordering::Relaxed);
                }
            }
        })
        .await;

    if cancel.is_cancelled() {
        debug!(
            "Sweep cancelled after removing {} of {} files",
            removed.load(Ordering::Relaxed),
            scanned
        );
        return Err(PlayctlError::Cancelled);
    }

    Ok(SweepReport {
        scanned,
        removed: removed.into_inner(),
        kept: kept.into_inner(),
        skipped: skipped.into_inner(),
    })
}

/// Delete the record at `path` if it has expired by now.
///
/// A record that vanished concurrently counts as kept. One that fails to
/// decode is an error, so the sweep counts it as skipped and leaves it.
pub async fn remove_if_expired<T, E>(path: &Path, expires_at: E) -> PlayctlResult<SweepAction>
where
    T: DeserializeOwned,
    E: Fn(&T) -> DateTime<Utc>,
{
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(SweepAction::Kept),
        Err(e) => return Err(PlayctlError::io(format!("reading {}", path.display()), e)),
    };
    let record: T = serde_json::from_slice(&bytes)?;

    if Utc::now() < expires_at(&record) {
        return Ok(SweepAction::Kept);
    }
    if remove_record(path).await? {
        debug!("Removed expired {}", path.display());
        Ok(SweepAction::Removed)
    } else {
        Ok(SweepAction::Kept)
    }
}
