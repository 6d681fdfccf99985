//! Edit transaction records

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle used when the caller does not name the edit
pub const DEFAULT_HANDLE: &str = "default";

/// Maximum lifetime of an edit since creation
pub const EDIT_MAX_AGE_HOURS: i64 = 7 * 24;

/// Maximum idle time of an edit since it was last used
pub const EDIT_IDLE_TIMEOUT_MINUTES: i64 = 60;

/// Lifecycle state of an edit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditState {
    Draft,
    Validating,
    Committed,
    Aborted,
}

impl EditState {
    /// Committed and aborted edits accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Committed | Self::Aborted)
    }

    /// Whether an edit in this state may move to `next`
    pub fn can_transition_to(&self, next: EditState) -> bool {
        use EditState::*;
        match (self, next) {
            (from, to) if *from == to => !from.is_terminal(),
            (Draft, Validating | Committed | Aborted) => true,
            (Validating, Draft | Committed | Aborted) => true,
            _ => false,
        }
    }
}

impl fmt::Display for EditState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Draft => "draft",
            Self::Validating => "validating",
            Self::Committed => "committed",
            Self::Aborted => "aborted",
        };
        write!(f, "{}", s)
    }
}

/// Expiry clocks for edits
#[derive(Debug, Clone, Copy)]
pub struct EditExpiry {
    pub max_age: Duration,
    pub idle_timeout: Duration,
}

impl Default for EditExpiry {
    fn default() -> Self {
        Self {
            max_age: Duration::hours(EDIT_MAX_AGE_HOURS),
            idle_timeout: Duration::minutes(EDIT_IDLE_TIMEOUT_MINUTES),
        }
    }
}

/// Local record of an in-progress remote edit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edit {
    /// Caller-chosen local name
    pub handle: String,

    /// Remote transaction id
    pub server_id: String,

    /// Package the edit belongs to
    pub package_name: String,

    /// When the edit was started
    pub created_at: DateTime<Utc>,

    /// When the edit was last touched
    pub last_used_at: DateTime<Utc>,

    /// Current lifecycle state
    pub state: EditState,
}

impl Edit {
    /// Create a new draft edit
    pub fn new(
        package_name: impl Into<String>,
        handle: impl Into<String>,
        server_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        let handle = handle.into();
        Self {
            handle: if handle.is_empty() {
                DEFAULT_HANDLE.to_string()
            } else {
                handle
            },
            server_id: server_id.into(),
            package_name: package_name.into(),
            created_at: now,
            last_used_at: now,
            state: EditState::Draft,
        }
    }

    /// Mark the edit as used now
    pub fn touch(&mut self) {
        self.last_used_at = Utc::now().max(self.created_at);
    }

    /// Check expiry against the default clocks
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.is_expired_with(now, &EditExpiry::default())
    }

    /// Expired once older than `max_age` or idle longer than
    /// `idle_timeout`. Exactly at either limit is still live.
    pub fn is_expired_with(&self, now: DateTime<Utc>, expiry: &EditExpiry) -> bool {
        now - self.created_at > expiry.max_age || now - self.last_used_at > expiry.idle_timeout
    }
}
