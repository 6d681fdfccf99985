//! Lock file contents and staleness rules

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Contents of a package lock file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockFile {
    /// Process that created the lock
    pub pid: u32,

    /// Host the process runs on
    pub hostname: String,

    /// When the lock was acquired
    pub created_at: DateTime<Utc>,

    /// Command line of the holder, for diagnostics
    pub command: String,

    /// Last liveness refresh from a long-running holder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heartbeat: Option<DateTime<Utc>>,
}

/// Whether an existing lock may be reclaimed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockHealth {
    /// Holder may still be making progress
    Live,
    /// Held from another host and silent past the stale age
    StaleForeignHost,
    /// Held by a process on this host that no longer exists
    StaleDeadProcess,
}

impl LockHealth {
    pub fn is_stale(&self) -> bool {
        !matches!(self, Self::Live)
    }
}

impl fmt::Display for LockHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Live => "live",
            Self::StaleForeignHost => "stale (foreign host)",
            Self::StaleDeadProcess => "stale (dead process)",
        };
        write!(f, "{}", s)
    }
}

impl LockFile {
    pub fn new(pid: u32, hostname: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            pid,
            hostname: hostname.into(),
            created_at: Utc::now(),
            command: command.into(),
            heartbeat: None,
        }
    }

    /// Most recent sign of life from the holder
    pub fn last_activity(&self) -> DateTime<Utc> {
        match self.heartbeat {
            Some(beat) if beat > self.created_at => beat,
            _ => self.created_at,
        }
    }

    /// Judge the lock from the point of view of `current_host`.
    ///
    /// A foreign host cannot be probed, so its lock only goes stale with
    /// age. A local lock goes stale as soon as its process is gone, and
    /// never by age alone.
    pub fn health(
        &self,
        current_host: &str,
        now: DateTime<Utc>,
        stale_after: Duration,
        is_alive: impl Fn(u32) -> bool,
    ) -> LockHealth {
        if self.hostname != current_host {
            if now - self.last_activity() > stale_after {
                LockHealth::StaleForeignHost
            } else {
                LockHealth::Live
            }
        } else if is_alive(self.pid) {
            LockHealth::Live
        } else {
            LockHealth::StaleDeadProcess
        }
    }
}
