//! On-disk layout and JSON record persistence
//!
//! Every component stores small JSON records under one per-user data
//! directory. Records are written through a temp file plus rename so a
//! concurrent reader sees either the old record or the new one, never a
//! torn write. Reads are lenient: a record that fails to decode is
//! reported as absent rather than as an error.

use crate::error::{PlayctlError, PlayctlResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Extension used by every persisted record
pub const RECORD_EXT: &str = "json";

/// Directory layout rooted at the local data directory
#[derive(Debug, Clone)]
pub struct StateDirs {
    root: PathBuf,
}

impl StateDirs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lock files, one per package
    pub fn locks_dir(&self) -> PathBuf {
        self.root.join("locks")
    }

    /// Edit records, one per (package, handle)
    pub fn edits_dir(&self) -> PathBuf {
        self.root.join("edits")
    }

    /// Artifact cache root, one subdirectory per package
    pub fn cache_dir(&self) -> PathBuf {
        self.root.join("cache")
    }

    /// Idempotency ledger, one file per key
    pub fn idempotency_dir(&self) -> PathBuf {
        self.root.join("idempotency")
    }

    /// Create every state directory with owner-only permissions
    pub async fn ensure(&self) -> PlayctlResult<()> {
        for dir in [
            self.root.clone(),
            self.locks_dir(),
            self.edits_dir(),
            self.cache_dir(),
            self.idempotency_dir(),
        ] {
            ensure_private_dir(&dir).await?;
        }
        Ok(())
    }
}

/// Create a directory (and parents) restricted to the owning user
pub async fn ensure_private_dir(dir: &Path) -> PlayctlResult<()> {
    fs::create_dir_all(dir)
        .await
        .map_err(|e| PlayctlError::io(format!("creating directory {}", dir.display()), e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o700);
        fs::set_permissions(dir, perms).await.map_err(|e| {
            PlayctlError::io(format!("setting permissions on {}", dir.display()), e)
        })?;
    }

    Ok(())
}

/// Options for files that only the owning user may read
pub fn private_open_options() -> fs::OpenOptions {
    let mut options = fs::OpenOptions::new();
    #[cfg(unix)]
    options.mode(0o600);
    options
}

/// Read and decode a JSON record.
///
/// Returns `Ok(None)` if the file does not exist or does not decode.
/// Any other filesystem error is returned.
pub async fn read_record<T: DeserializeOwned>(path: &Path) -> PlayctlResult<Option<T>> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(PlayctlError::io(format!("reading {}", path.display()), e));
        }
    };

    match serde_json::from_slice(&bytes) {
        Ok(record) => Ok(Some(record)),
        Err(e) => {
            warn!("Ignoring malformed record {}: {}", path.display(), e);
            Ok(None)
        }
    }
}

/// Encode and atomically write a JSON record with owner-only permissions.
///
/// Creates the parent directory if needed.
pub async fn write_record<T: Serialize>(path: &Path, record: &T) -> PlayctlResult<()> {
    let content = serde_json::to_vec_pretty(record).map_err(|e| {
        PlayctlError::io(
            format!("encoding {}", path.display()),
            std::io::Error::new(ErrorKind::InvalidData, e),
        )
    })?;

    let parent = path
        .parent()
        .ok_or_else(|| PlayctlError::Internal(format!("{} has no parent", path.display())))?;
    ensure_private_dir(parent).await?;

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| PlayctlError::Internal(format!("{} has no file name", path.display())))?;
    let tmp = parent.join(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4().simple()));

    if let Err(e) = write_new_file(&tmp, &content).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(PlayctlError::io(format!("writing {}", tmp.display()), e));
    }

    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(PlayctlError::io(format!("replacing {}", path.display()), e));
    }

    debug!("Wrote {}", path.display());
    Ok(())
}

/// Create `path` exclusively and fill it with `content`.
///
/// Fails with `AlreadyExists` if the file is present.
pub async fn write_new_file(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut file = private_open_options()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    file.write_all(content).await?;
    file.sync_all().await?;
    Ok(())
}

/// Remove a record, returning whether it existed
pub async fn remove_record(path: &Path) -> PlayctlResult<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(PlayctlError::io(format!("removing {}", path.display()), e)),
    }
}

/// List record files directly inside `dir`, or nothing if `dir` is missing
pub async fn list_records(dir: &Path) -> PlayctlResult<Vec<PathBuf>> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(vec![]),
        Err(e) => {
            return Err(PlayctlError::io(format!("reading directory {}", dir.display()), e));
        }
    };

    let mut paths = vec![];
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| PlayctlError::io(format!("reading entry in {}", dir.display()), e))?
    {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == RECORD_EXT) {
            paths.push(path);
        }
    }

    Ok(paths)
}
