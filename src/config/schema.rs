//! Configuration schema for playctl
//!
//! Configuration is stored at `~/.config/playctl/config.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Package lock settings
    pub lock: LockConfig,

    /// Edit transaction expiry
    pub edits: EditsConfig,

    /// Artifact cache settings
    pub cache: CacheConfig,

    /// Idempotency ledger settings
    pub idempotency: IdempotencyConfig,
}

/// Longest retention or staleness window accepted, about a century
pub const MAX_WINDOW_HOURS: u64 = 100 * 365 * 24;

impl Config {
    /// Reject windows too large to add to a timestamp
    pub fn validate(&self) -> Result<(), String> {
        let windows = [
            ("lock.stale_after_hours", self.lock.stale_after_hours),
            ("edits.max_age_hours", self.edits.max_age_hours.into()),
            ("cache.ttl_hours", self.cache.ttl_hours.into()),
            ("idempotency.ttl_hours", self.idempotency.ttl_hours.into()),
        ];
        for (key, hours) in windows {
            if hours > MAX_WINDOW_HOURS {
                return Err(format!("{} must be at most {}", key, MAX_WINDOW_HOURS));
            }
        }
        if u64::from(self.edits.idle_timeout_minutes) > MAX_WINDOW_HOURS * 60 {
            return Err(format!(
                "edits.idle_timeout_minutes must be at most {}",
                MAX_WINDOW_HOURS * 60
            ));
        }
        Ok(())
    }
}

fn bounded_hours(hours: u64) -> chrono::Duration {
    chrono::Duration::hours(hours.min(MAX_WINDOW_HOURS) as i64)
}

fn bounded_minutes(minutes: u64) -> chrono::Duration {
    chrono::Duration::minutes(minutes.min(MAX_WINDOW_HOURS * 60) as i64)
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,

    /// Override for the local data directory
    pub data_dir: Option<PathBuf>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
            data_dir: None,
        }
    }
}

/// Package lock settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// How long `acquire` waits before giving up
    pub timeout_secs: u64,

    /// Delay between acquisition attempts
    pub poll_interval_ms: u64,

    /// Age after which a lock from another host may be reclaimed
    pub stale_after_hours: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            poll_interval_ms: 100,
            stale_after_hours: 4,
        }
    }
}

impl LockConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn stale_after(&self) -> chrono::Duration {
        bounded_hours(self.stale_after_hours)
    }
}

/// Edit expiry settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditsConfig {
    /// Maximum edit lifetime since creation
    pub max_age_hours: u32,

    /// Maximum idle time since last use
    pub idle_timeout_minutes: u32,
}

impl EditsConfig {
    pub fn max_age(&self) -> chrono::Duration {
        bounded_hours(self.max_age_hours.into())
    }

    pub fn idle_timeout(&self) -> chrono::Duration {
        bounded_minutes(self.idle_timeout_minutes.into())
    }
}

impl Default for EditsConfig {
    fn default() -> Self {
        Self {
            max_age_hours: 7 * 24,
            idle_timeout_minutes: 60,
        }
    }
}

/// Artifact cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Lifetime of a cached artifact entry
    pub ttl_hours: u32,
}

impl CacheConfig {
    pub fn ttl(&self) -> chrono::Duration {
        bounded_hours(self.ttl_hours.into())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_hours: 24 }
    }
}

/// Idempotency ledger settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdempotencyConfig {
    /// Lifetime of a ledger entry
    pub ttl_hours: u32,

    /// Concurrent workers for expiry sweeps (0 = auto)
    pub sweep_workers: usize,
}

impl IdempotencyConfig {
    pub fn ttl(&self) -> chrono::Duration {
        bounded_hours(self.ttl_hours.into())
    }
}

impl Default for IdempotencyConfig {
    fn default() -> Self {
        Self {
            ttl_hours: 24,
            sweep_workers: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[general]"));
        assert!(toml.contains("[lock]"));
        assert!(toml.contains("timeout_secs = 30"));
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config: Config = toml::from_str("[lock]\ntimeout_secs = 5\n").unwrap();
        assert_eq!(config.lock.timeout_secs, 5);
        assert_eq!(config.lock.poll_interval_ms, 100);
        assert_eq!(config.edits.max_age_hours, 168);
        assert_eq!(config.idempotency.ttl_hours, 24);
    }

    #[test]
    fn lock_durations() {
        let lock = LockConfig::default();
        assert_eq!(lock.timeout(), Duration::from_secs(30));
        assert_eq!(lock.poll_interval(), Duration::from_millis(100));
        assert_eq!(lock.stale_after(), chrono::Duration::hours(4));
    }

    #[test]
    fn huge_windows_saturate() {
        let lock = LockConfig {
            stale_after_hours: u64::MAX,
            ..LockConfig::default()
        };
        assert_eq!(lock.stale_after(), chrono::Duration::hours(MAX_WINDOW_HOURS as i64));

        let cache = CacheConfig { ttl_hours: u32::MAX };
        let expires = chrono::Utc::now().checked_add_signed(cache.ttl());
        assert!(expires.is_some());
    }

    #[test]
    fn validate_rejects_out_of_range_windows() {
        assert!(Config::default().validate().is_ok());

        let mut config = Config::default();
        config.lock.stale_after_hours = u64::MAX;
        let reason = config.validate().unwrap_err();
        assert!(reason.contains("lock.stale_after_hours"));

        let mut config = Config::default();
        config.edits.idle_timeout_minutes = u32::MAX;
        assert!(config.validate().is_err());
    }
}
