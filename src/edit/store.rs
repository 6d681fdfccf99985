//! Edit record persistence
//!
//! One JSON file per `(package, handle)` named `<package>~<handle>.json`.
//! Package names are validated rather than sanitized, and the handle is
//! sanitized so that neither path separators nor the `~` separator can
//! appear in it. The name therefore splits back into exactly one pair.

use crate::edit::state::{Edit, EditExpiry, EditState, DEFAULT_HANDLE};
use crate::error::{PlayctlError, PlayctlResult};
use crate::lock::validate_package_name;
use crate::storage::{list_records, read_record, remove_record, write_record};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tracing::{debug, info};

const SEPARATOR: char = '~';

/// Make a handle safe to embed in a file name
pub fn sanitize_handle(handle: &str) -> String {
    if handle.is_empty() {
        return DEFAULT_HANDLE.to_string();
    }
    handle
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | SEPARATOR | '\0' => '_',
            c => c,
        })
        .collect()
}

/// Stores edit records under a single directory
pub struct EditStore {
    dir: PathBuf,
    expiry: EditExpiry,
}

impl EditStore {
    pub fn new(dir: impl Into<PathBuf>, expiry: EditExpiry) -> Self {
        Self {
            dir: dir.into(),
            expiry,
        }
    }

    /// Expiry clocks applied by this store
    pub fn expiry(&self) -> &EditExpiry {
        &self.expiry
    }

    /// File holding the record for `(package, handle)`
    pub fn record_path(&self, package: &str, handle: &str) -> PlayctlResult<PathBuf> {
        validate_package_name(package)?;
        Ok(self.dir.join(format!(
            "{}{}{}.json",
            package,
            SEPARATOR,
            sanitize_handle(handle)
        )))
    }

    /// Persist an edit, replacing any previous record
    pub async fn save(&self, edit: &Edit) -> PlayctlResult<()> {
        if edit.last_used_at < edit.created_at {
            return Err(PlayctlError::Internal(format!(
                "edit {} last used before it was created",
                edit.handle
            )));
        }
        let path = self.record_path(&edit.package_name, &edit.handle)?;
        write_record(&path, edit).await?;
        debug!("Saved edit {}/{} ({})", edit.package_name, edit.handle, edit.state);
        Ok(())
    }

    /// Load an edit. Absent or unreadable records yield `None`.
    pub async fn load(&self, package: &str, handle: &str) -> PlayctlResult<Option<Edit>> {
        let path = self.record_path(package, handle)?;
        read_record(&path).await
    }

    /// Delete an edit record
    pub async fn delete(&self, package: &str, handle: &str) -> PlayctlResult<()> {
        let path = self.record_path(package, handle)?;
        if !remove_record(&path).await? {
            return Err(PlayctlError::edit_not_found(package, handle));
        }
        info!("Deleted edit {}/{}", package, handle);
        Ok(())
    }

    /// All edits recorded for `package`, newest first
    pub async fn list(&self, package: &str) -> PlayctlResult<Vec<Edit>> {
        validate_package_name(package)?;
        let prefix = format!("{}{}", package, SEPARATOR);

        let mut edits = vec![];
        for path in list_records(&self.dir).await? {
            let matches = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(&prefix));
            if !matches {
                continue;
            }
            if let Some(edit) = read_record::<Edit>(&path).await? {
                edits.push(edit);
            }
        }

        edits.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(edits)
    }

    /// Move an edit to a new state, touching it
    pub async fn update_state(
        &self,
        package: &str,
        handle: &str,
        state: EditState,
    ) -> PlayctlResult<Edit> {
        let mut edit = self
            .load(package, handle)
            .await?
            .ok_or_else(|| PlayctlError::edit_not_found(package, handle))?;

        if !edit.state.can_transition_to(state) {
            return Err(PlayctlError::InvalidTransition {
                handle: edit.handle,
                from: edit.state.to_string(),
                to: state.to_string(),
            });
        }

        edit.state = state;
        edit.touch();
        self.save(&edit).await?;

        debug!("Updated edit {}/{} state to {}", package, handle, state);
        Ok(edit)
    }

    /// Mark an edit as used now
    pub async fn touch(&self, package: &str, handle: &str) -> PlayctlResult<Edit> {
        let mut edit = self
            .load(package, handle)
            .await?
            .ok_or_else(|| PlayctlError::edit_not_found(package, handle))?;

        edit.touch();
        self.save(&edit).await?;
        Ok(edit)
    }

    /// Whether `edit` has expired under this store's clocks
    pub fn is_expired(&self, edit: &Edit, now: DateTime<Utc>) -> bool {
        edit.is_expired_with(now, &self.expiry)
    }

    /// Resume a live edit or start a new one.
    ///
    /// An existing record that is neither expired nor terminal is touched
    /// and returned as is; `server_id` is only used for a new record.
    pub async fn load_or_create(
        &self,
        package: &str,
        handle: &str,
        server_id: &str,
    ) -> PlayctlResult<Edit> {
        if let Some(mut edit) = self.load(package, handle).await? {
            if !edit.state.is_terminal() && !self.is_expired(&edit, Utc::now()) {
                edit.touch();
                self.save(&edit).await?;
                debug!("Resuming edit {}/{}", package, edit.handle);
                return Ok(edit);
            }
            debug!(
                "Replacing {} edit {}/{}",
                if edit.state.is_terminal() { "finished" } else { "expired" },
                package,
                edit.handle
            );
        }

        let edit = Edit::new(package, handle, server_id);
        self.save(&edit).await?;
        info!("Started edit {}/{}", package, edit.handle);
        Ok(edit)
    }

    /// Delete every expired edit of `package`, returning their handles
    pub async fn prune_expired(
        &self,
        package: &str,
        now: DateTime<Utc>,
    ) -> PlayctlResult<Vec<String>> {
        let mut removed = vec![];
        for edit in self.list(package).await? {
            if !self.is_expired(&edit, now) {
                continue;
            }
            let path = self.record_path(package, &edit.handle)?;
            if remove_record(&path).await? {
                info!("Pruned expired edit {}/{}", package, edit.handle);
                removed.push(edit.handle);
            }
        }
        Ok(removed)
    }
}
