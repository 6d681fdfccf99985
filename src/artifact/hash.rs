//! Content hashing for artifacts
//!
//! Files are streamed through SHA-256 in fixed-size blocks so that
//! multi-gigabyte bundles never sit in memory. Only small files are read
//! in one go.

use crate::error::{PlayctlError, PlayctlResult};
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncReadExt;

/// Block size used when streaming a file through the hasher
pub const HASH_BLOCK_SIZE: usize = 64 * 1024;

/// Files above this size report progress while hashing
pub const PROGRESS_THRESHOLD: u64 = 100 * 1024 * 1024;

/// Files up to this size are hashed from a single read
const WHOLE_FILE_LIMIT: u64 = 1024 * 1024;

/// Progress callback: `(bytes_hashed, total_bytes)`
pub type HashProgress<'a> = &'a (dyn Fn(u64, u64) + Send + Sync);

/// Hex-encoded SHA-256 of `bytes`
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Check that `hash` looks like a hex SHA-256 digest
pub fn is_sha256_hex(hash: &str) -> bool {
    hash.len() == 64 && hash.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Hash a file's contents with SHA-256, returning 64 lowercase hex chars.
///
/// `progress` is called after every block for files larger than
/// [`PROGRESS_THRESHOLD`], with the cumulative byte count.
pub async fn hash_file(path: &Path, progress: Option<HashProgress<'_>>) -> PlayctlResult<String> {
    let metadata = fs::metadata(path).await.map_err(|e| match e.kind() {
        ErrorKind::NotFound => PlayctlError::PathNotFound(path.to_path_buf()),
        _ => PlayctlError::io(format!("reading metadata of {}", path.display()), e),
    })?;
    let size = metadata.len();

    if size <= WHOLE_FILE_LIMIT {
        let contents = fs::read(path)
            .await
            .map_err(|e| PlayctlError::io(format!("reading {}", path.display()), e))?;
        return Ok(sha256_hex(&contents));
    }

    let progress = progress.filter(|_| size > PROGRESS_THRESHOLD);
    let mut file = fs::File::open(path)
        .await
        .map_err(|e| PlayctlError::io(format!("opening {}", path.display()), e))?;

    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; HASH_BLOCK_SIZE];
    let mut done: u64 = 0;

    loop {
        let n = file
            .read(&mut buf)
            .await
            .map_err(|e| PlayctlError::io(format!("reading {}", path.display()), e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        done += n as u64;
        if let Some(report) = progress {
            report(done, size);
        }
    }

    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[test]
    fn sha256_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn hex_validation() {
        assert!(is_sha256_hex(&sha256_hex(b"x")));
        assert!(!is_sha256_hex("abc"));
        assert!(!is_sha256_hex(&"G".repeat(64)));
        assert!(!is_sha256_hex(&"A".repeat(64)));
        assert!(!is_sha256_hex(&format!("{}/", "a".repeat(63))));
    }

    #[tokio::test]
    async fn hash_deterministic() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.aab");
        fs::write(&path, b"test content").await.unwrap();

        let hash1 = hash_file(&path, None).await.unwrap();
        let hash2 = hash_file(&path, None).await.unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1, sha256_hex(b"test content"));
    }

    #[tokio::test]
    async fn streamed_hash_matches_one_shot() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("big.apk");
        let content: Vec<u8> = (0..3 * 1024 * 1024 + 17).map(|i| (i % 251) as u8).collect();
        fs::write(&path, &content).await.unwrap();

        let calls = Mutex::new(0u32);
        let on_progress = |_: u64, _: u64| *calls.lock().unwrap() += 1;
        let hash = hash_file(&path, Some(&on_progress)).await.unwrap();

        assert_eq!(hash, sha256_hex(&content));
        // Below the progress threshold nothing is reported
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn missing_file_is_path_not_found() {
        let dir = TempDir::new().unwrap();
        let err = hash_file(&dir.path().join("gone.aab"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, PlayctlError::PathNotFound(_)));
    }
}
