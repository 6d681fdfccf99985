//! Integration tests for playctl

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use playctl::config::schema::LockConfig;
    use playctl::edit::{Edit, EditExpiry, EditStore};
    use playctl::lock::LockManager;
    use playctl::storage::StateDirs;
    use predicates::prelude::*;
    use std::path::Path;
    use tempfile::TempDir;
    use tokio_util::sync::CancellationToken;

    const HELLO_SHA256: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    /// Command isolated from the user's config and data directories
    fn playctl(temp: &Path) -> Command {
        let mut cmd = cargo_bin_cmd!("playctl");
        cmd.env_remove("PLAYCTL_CONFIG")
            .env_remove("PLAYCTL_DATA_DIR")
            .arg("--config")
            .arg(temp.join("config.toml"))
            .arg("--data-dir")
            .arg(temp.join("data"));
        cmd
    }

    #[test]
    fn help_displays() {
        cargo_bin_cmd!("playctl")
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("edit"))
            .stdout(predicate::str::contains("lock"));
    }

    #[test]
    fn version_displays() {
        cargo_bin_cmd!("playctl")
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("playctl"));
    }

    #[test]
    fn config_path() {
        let temp = TempDir::new().unwrap();
        playctl(temp.path())
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let temp = TempDir::new().unwrap();
        playctl(temp.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[general]"))
            .stdout(predicate::str::contains("[lock]"));
    }

    #[test]
    fn config_init_writes_file() {
        let temp = TempDir::new().unwrap();
        playctl(temp.path())
            .args(["config", "init"])
            .assert()
            .success();
        assert!(temp.path().join("config.toml").exists());

        playctl(temp.path())
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("already exists"));
    }

    #[test]
    fn edit_list_empty() {
        let temp = TempDir::new().unwrap();
        playctl(temp.path())
            .args(["edit", "list", "com.example.app"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No edits"));

        playctl(temp.path())
            .args(["edit", "list", "com.example.app", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[]"));
    }

    #[test]
    fn edit_show_missing() {
        let temp = TempDir::new().unwrap();
        playctl(temp.path())
            .args(["edit", "show", "com.example.app", "rel1"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Edit not found"));
    }

    #[test]
    fn edit_delete_missing() {
        let temp = TempDir::new().unwrap();
        playctl(temp.path())
            .args(["edit", "delete", "com.example.app", "rel1", "--yes"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Edit not found"));
    }

    #[test]
    fn invalid_package_name_rejected() {
        let temp = TempDir::new().unwrap();
        playctl(temp.path())
            .args(["edit", "list", "../escape"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid package name"));
    }

    #[tokio::test]
    async fn edit_list_and_delete_seeded() {
        let temp = TempDir::new().unwrap();
        let dirs = StateDirs::new(temp.path().join("data"));
        let store = EditStore::new(dirs.edits_dir(), EditExpiry::default());
        store
            .save(&Edit::new("com.example.app", "rel1", "server-1"))
            .await
            .unwrap();

        playctl(temp.path())
            .args(["edit", "list", "com.example.app", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("rel1"));

        playctl(temp.path())
            .args(["edit", "show", "com.example.app", "rel1"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"serverId\": \"server-1\""));

        // Without a terminal or --yes the prompt defaults to no
        playctl(temp.path())
            .args(["edit", "delete", "com.example.app", "rel1"])
            .assert()
            .success()
            .stdout(predicate::str::contains("not deleted"));
        assert!(store.load("com.example.app", "rel1").await.unwrap().is_some());

        playctl(temp.path())
            .args(["edit", "delete", "com.example.app", "rel1", "--yes"])
            .assert()
            .success();
        assert!(store.load("com.example.app", "rel1").await.unwrap().is_none());
    }

    #[test]
    fn lock_status_unlocked() {
        let temp = TempDir::new().unwrap();
        playctl(temp.path())
            .args(["lock", "status", "com.example.app"])
            .assert()
            .success()
            .stdout(predicate::str::contains("not locked"));
    }

    #[tokio::test]
    async fn lock_release_requires_force_for_live_lock() {
        let temp = TempDir::new().unwrap();
        let dirs = StateDirs::new(temp.path().join("data"));
        let locks = LockManager::new(dirs.locks_dir(), &LockConfig::default());
        locks
            .acquire(&CancellationToken::new(), "com.example.app")
            .await
            .unwrap();

        playctl(temp.path())
            .args(["lock", "status", "com.example.app", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("live"));

        playctl(temp.path())
            .args(["lock", "release", "com.example.app"])
            .assert()
            .success()
            .stdout(predicate::str::contains("looks live"));
        assert!(locks.lock_path("com.example.app").exists());

        playctl(temp.path())
            .args(["lock", "release", "com.example.app", "--force"])
            .assert()
            .success();
        assert!(!locks.lock_path("com.example.app").exists());
    }

    #[test]
    fn hash_prints_digest() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("hello.txt");
        std::fs::write(&file, "hello").unwrap();

        playctl(temp.path())
            .arg("hash")
            .arg(&file)
            .assert()
            .success()
            .stdout(predicate::str::contains(HELLO_SHA256));
    }

    #[test]
    fn hash_with_package_caches_once() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("app.aab");
        std::fs::write(&file, "hello").unwrap();

        playctl(temp.path())
            .arg("hash")
            .arg(&file)
            .args(["--package", "com.example.app", "--version-hint", "42"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Cached for com.example.app"));

        let entry = temp
            .path()
            .join("data")
            .join("cache")
            .join("com.example.app")
            .join(format!("{}.json", HELLO_SHA256));
        assert!(entry.exists());

        playctl(temp.path())
            .arg("hash")
            .arg(&file)
            .args(["--package", "com.example.app"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Already cached"));
    }

    #[test]
    fn hash_missing_file() {
        let temp = TempDir::new().unwrap();
        playctl(temp.path())
            .arg("hash")
            .arg(temp.path().join("missing.aab"))
            .assert()
            .failure()
            .stderr(predicate::str::contains("Path not found"));
    }

    #[test]
    fn gc_on_empty_data_dir() {
        let temp = TempDir::new().unwrap();
        playctl(temp.path())
            .arg("gc")
            .assert()
            .success()
            .stdout(predicate::str::contains("Removed 0 of 0"));
    }
}

mod coordination_tests {
    use chrono::Duration;
    use playctl::artifact::{hash_file, HashProgress};
    use playctl::config::Config;
    use playctl::edit::EditState;
    use playctl::idempotency::{upload_key, IdempotencyStore};
    use playctl::storage::StateDirs;
    use playctl::{Coordinator, PlayctlError};
    use serde_json::json;
    use sha2::{Digest, Sha256};
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::TempDir;
    use tokio_util::sync::CancellationToken;

    async fn coordinator(temp: &TempDir) -> Coordinator {
        Coordinator::open(StateDirs::new(temp.path()), &Config::default())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn locked_edit_lifecycle() {
        let temp = TempDir::new().unwrap();
        let coordinator = coordinator(&temp).await;
        let cancel = CancellationToken::new();
        let package = "com.example.app";

        coordinator.locks().acquire(&cancel, package).await.unwrap();

        let edit = coordinator
            .edits()
            .load_or_create(package, "rel1", "server-1")
            .await
            .unwrap();
        assert_eq!(edit.state, EditState::Draft);

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        coordinator
            .edits()
            .update_state(package, "rel1", EditState::Committed)
            .await
            .unwrap();

        let loaded = coordinator
            .edits()
            .load(package, "rel1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.state, EditState::Committed);
        assert_eq!(loaded.server_id, "server-1");
        assert!(loaded.last_used_at > edit.last_used_at);

        coordinator.locks().release(package).await.unwrap();
        assert!(coordinator.locks().inspect(package).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn second_coordinator_waits_for_lock() {
        let temp = TempDir::new().unwrap();
        let first = coordinator(&temp).await;
        let second = coordinator(&temp).await;
        let cancel = CancellationToken::new();

        first.locks().acquire(&cancel, "com.example.app").await.unwrap();

        let err = second
            .locks()
            .acquire_with_timeout(
                &cancel,
                "com.example.app",
                std::time::Duration::from_millis(250),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PlayctlError::LockTimeout { .. }));
        assert!(err.is_retryable());

        first.locks().release("com.example.app").await.unwrap();
        second
            .locks()
            .acquire_with_timeout(
                &cancel,
                "com.example.app",
                std::time::Duration::from_secs(2),
            )
            .await
            .unwrap();
        second.locks().release_all().await.unwrap();
    }

    #[tokio::test]
    async fn upload_recorded_once_across_instances() {
        let temp = TempDir::new().unwrap();
        let first = coordinator(&temp).await;
        let second = coordinator(&temp).await;
        let hash = "ab".repeat(32);

        assert!(first
            .ledger()
            .check_upload("com.example.app", &hash)
            .await
            .unwrap()
            .is_none());
        first
            .ledger()
            .record_upload("com.example.app", &hash, json!({ "versionCode": 42 }))
            .await
            .unwrap();

        let data = second
            .ledger()
            .check_upload("com.example.app", &hash)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(data["versionCode"], 42);
        assert!(second
            .ledger()
            .check(&upload_key("com.example.app", &hash))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn large_file_hash_reports_progress() {
        const SIZE: usize = 200 * 1024 * 1024;
        const CHUNK: usize = 1024 * 1024;

        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bundle.aab");
        let mut reference = Sha256::new();
        {
            let mut file = std::fs::File::create(&path).unwrap();
            let mut chunk = vec![0u8; CHUNK];
            for i in 0..SIZE / CHUNK {
                chunk.iter_mut().enumerate().for_each(|(j, b)| *b = (i + j) as u8);
                reference.update(&chunk);
                file.write_all(&chunk).unwrap();
            }
        }

        let seen = Mutex::new(Vec::new());
        let on_progress = |done: u64, total: u64| {
            assert_eq!(total, SIZE as u64);
            seen.lock().unwrap().push(done);
        };
        let progress: HashProgress<'_> = &on_progress;

        let hash = hash_file(&path, Some(progress)).await.unwrap();
        assert_eq!(hash, hex::encode(reference.finalize()));

        let seen = seen.into_inner().unwrap();
        assert!(!seen.is_empty());
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(seen.last().copied(), Some(SIZE as u64));
    }

    async fn sweep_mixed_ledger(workers: usize) {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("idempotency");
        let live = IdempotencyStore::new(&dir, Duration::hours(24), workers);
        let lapsed = IdempotencyStore::new(&dir, Duration::hours(-1), workers);

        for i in 0..1000 {
            let key = format!("key-{:04}", i);
            let store = if i % 3 == 0 { &lapsed } else { &live };
            store.record(&key, json!(i)).await.unwrap();
        }

        let report = live
            .clean_expired(&CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.scanned, 1000);
        assert_eq!(report.removed, 334);
        assert_eq!(report.kept, 666);
        assert_eq!(report.skipped, 0);

        for i in 0..1000 {
            let key = format!("key-{:04}", i);
            let present = dir.join(format!("{}.json", key)).exists();
            assert_eq!(present, i % 3 != 0, "unexpected state for {}", key);
        }
    }

    #[tokio::test]
    async fn ledger_sweep_single_worker() {
        sweep_mixed_ledger(1).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn ledger_sweep_four_workers() {
        sweep_mixed_ledger(4).await;
    }

    #[tokio::test]
    async fn gc_sweeps_cache_and_ledger() {
        let temp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.cache.ttl_hours = 0;
        config.idempotency.ttl_hours = 0;
        let coordinator = Coordinator::open(StateDirs::new(temp.path()), &config)
            .await
            .unwrap();

        let artifact = temp.path().join("app.aab");
        std::fs::write(&artifact, "hello").unwrap();
        let hash = hash_file(&artifact, None).await.unwrap();
        coordinator
            .artifacts()
            .cache_with_hash("com.example.app", &artifact, &hash, None)
            .await
            .unwrap();
        coordinator
            .ledger()
            .record_upload("com.example.app", &hash, json!({}))
            .await
            .unwrap();

        let report = coordinator
            .clean_expired(&CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.scanned, 2);
        assert_eq!(report.removed, 2);
    }
}
