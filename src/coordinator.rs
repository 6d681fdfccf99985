//! Single root for the local coordination components
//!
//! Built once per process from the configuration and passed to whatever
//! needs it. Tests build independent coordinators over temp directories.

use crate::artifact::ArtifactCache;
use crate::config::{Config, ConfigManager};
use crate::edit::{EditExpiry, EditStore};
use crate::error::PlayctlResult;
use crate::idempotency::IdempotencyStore;
use crate::lock::LockManager;
use crate::storage::StateDirs;
use crate::sweep::{resolve_workers, SweepReport};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Lock manager, edit store, artifact cache and idempotency ledger over
/// one data directory
pub struct Coordinator {
    dirs: StateDirs,
    locks: LockManager,
    edits: EditStore,
    artifacts: ArtifactCache,
    ledger: IdempotencyStore,
}

impl Coordinator {
    /// Build a coordinator rooted at `dirs`, creating its directories
    pub async fn open(dirs: StateDirs, config: &Config) -> PlayctlResult<Self> {
        dirs.ensure().await?;
        debug!("Using data directory {}", dirs.root().display());

        let workers = resolve_workers(config.idempotency.sweep_workers);
        let expiry = EditExpiry {
            max_age: config.edits.max_age(),
            idle_timeout: config.edits.idle_timeout(),
        };

        Ok(Self {
            locks: LockManager::new(dirs.locks_dir(), &config.lock),
            edits: EditStore::new(dirs.edits_dir(), expiry),
            artifacts: ArtifactCache::new(
                dirs.cache_dir(),
                config.cache.ttl(),
                workers,
            ),
            ledger: IdempotencyStore::new(
                dirs.idempotency_dir(),
                config.idempotency.ttl(),
                workers,
            ),
            dirs,
        })
    }

    /// Build a coordinator over the configured data directory
    pub async fn from_config(config: &Config) -> PlayctlResult<Self> {
        Self::open(StateDirs::new(ConfigManager::data_dir(config)), config).await
    }

    pub fn dirs(&self) -> &StateDirs {
        &self.dirs
    }

    pub fn locks(&self) -> &LockManager {
        &self.locks
    }

    pub fn edits(&self) -> &EditStore {
        &self.edits
    }

    pub fn artifacts(&self) -> &ArtifactCache {
        &self.artifacts
    }

    pub fn ledger(&self) -> &IdempotencyStore {
        &self.ledger
    }

    /// Sweep expired artifact cache and ledger entries
    pub async fn clean_expired(&self, cancel: &CancellationToken) -> PlayctlResult<SweepReport> {
        let cache = self.artifacts.clean_expired(cancel).await?;
        let ledger = self.ledger.clean_expired(cancel).await?;
        Ok(cache.merge(ledger))
    }
}
