//! Configuration for playctl
//!
//! One TOML file, by default under the user's config directory. Every
//! field has a default, so a missing file or section is not an error.

pub mod schema;

pub use schema::Config;

use crate::error::{PlayctlError, PlayctlResult};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Locates, reads and writes the config file
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Use `path` instead of the per-user location
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// `<config dir>/playctl/config.toml`
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("playctl")
            .join("config.toml")
    }

    /// `<local data dir>/playctl`, falling back to the state dir
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .or_else(dirs::state_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("playctl")
    }

    /// Root for locks, edits, cache and ledger under `config`
    pub fn data_dir(config: &Config) -> PathBuf {
        config
            .general
            .data_dir
            .clone()
            .unwrap_or_else(Self::default_data_dir)
    }

    /// Read the config file; a missing file yields defaults
    pub async fn load(&self) -> PlayctlResult<Config> {
        match fs::read_to_string(&self.config_path).await {
            Ok(content) => self.parse(&self.config_path, &content),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No config at {}, using defaults", self.config_path.display());
                Ok(Config::default())
            }
            Err(e) => Err(PlayctlError::io(
                format!("reading config from {}", self.config_path.display()),
                e,
            )),
        }
    }

    fn parse(&self, path: &Path, content: &str) -> PlayctlResult<Config> {
        let invalid = |reason: String| PlayctlError::ConfigInvalid {
            path: path.to_path_buf(),
            reason,
        };
        let config: Config = toml::from_str(content).map_err(|e| invalid(e.to_string()))?;
        config.validate().map_err(invalid)?;
        Ok(config)
    }

    /// Write `config`, replacing the file in one rename
    pub async fn save(&self, config: &Config) -> PlayctlResult<()> {
        let content = toml::to_string_pretty(config)?;

        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| PlayctlError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }

        let staged = self.config_path.with_extension("toml.tmp");
        let written = async {
            fs::write(&staged, content).await?;
            fs::rename(&staged, &self.config_path).await
        }
        .await;
        if let Err(e) = written {
            let _ = fs::remove_file(&staged).await;
            return Err(PlayctlError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            ));
        }

        info!("Wrote {}", self.config_path.display());
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_default_when_missing() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nonexistent.toml");
        let manager = ConfigManager::with_path(path);

        let config = manager.load().await.unwrap();
        assert_eq!(config.lock.timeout_secs, 30);
    }

    #[tokio::test]
    async fn save_and_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");
        let manager = ConfigManager::with_path(path);

        let mut config = Config::default();
        config.lock.stale_after_hours = 8;
        config.general.data_dir = Some(temp.path().join("data"));

        manager.save(&config).await.unwrap();
        let loaded = manager.load().await.unwrap();

        assert_eq!(loaded.lock.stale_after_hours, 8);
        assert_eq!(ConfigManager::data_dir(&loaded), temp.path().join("data"));
    }

    #[tokio::test]
    async fn invalid_config_reports_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[lock]\ntimeout_secs = \"soon\"\n").await.unwrap();

        let err = ConfigManager::with_path(path.clone()).load().await.unwrap_err();
        assert!(matches!(err, PlayctlError::ConfigInvalid { path: p, .. } if p == path));
    }

    #[tokio::test]
    async fn out_of_range_window_is_invalid() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[lock]\nstale_after_hours = 18446744073709551615\n")
            .await
            .unwrap();

        let err = ConfigManager::with_path(path).load().await.unwrap_err();
        match err {
            PlayctlError::ConfigInvalid { reason, .. } => {
                assert!(reason.contains("stale_after_hours"))
            }
            other => panic!("expected ConfigInvalid, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn save_leaves_no_staging_file() {
        let temp = TempDir::new().unwrap();
        let manager = ConfigManager::with_path(temp.path().join("config.toml"));
        manager.save(&Config::default()).await.unwrap();
        manager.save(&Config::default()).await.unwrap();

        let names: Vec<_> = std::fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("config.toml")]);
    }

    #[cfg(target_os = "linux")]
    #[test]
    #[serial_test::serial]
    fn default_paths_follow_xdg() {
        let temp = TempDir::new().unwrap();
        let saved: Vec<_> = ["XDG_CONFIG_HOME", "XDG_DATA_HOME"]
            .iter()
            .map(|var| (*var, std::env::var_os(var)))
            .collect();
        std::env::set_var("XDG_CONFIG_HOME", temp.path().join("cfg"));
        std::env::set_var("XDG_DATA_HOME", temp.path().join("share"));

        let config_path = ConfigManager::default_config_path();
        let data_dir = ConfigManager::default_data_dir();
        let resolved = ConfigManager::data_dir(&Config::default());

        for (var, value) in saved {
            match value {
                Some(value) => std::env::set_var(var, value),
                None => std::env::remove_var(var),
            }
        }

        assert_eq!(config_path, temp.path().join("cfg/playctl/config.toml"));
        assert_eq!(data_dir, temp.path().join("share/playctl"));
        assert_eq!(resolved, data_dir);
    }
}
