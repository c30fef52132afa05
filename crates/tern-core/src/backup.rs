//! Content snapshots of unit definitions.
//!
//! Every successful apply or rollback copies the live definition into the
//! backup directory as `<timestamp><identifier>.<ext>`. The ledger refers to
//! snapshots by file name only.

use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};

/// Timestamp format stored in the ledger
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Format a ledger timestamp (second resolution, UTC)
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Current time as a ledger timestamp
pub fn timestamp_now() -> String {
    format_timestamp(Utc::now())
}

/// Snapshot storage rooted at the backup directory
#[derive(Debug, Clone)]
pub struct BackupStore {
    dir: PathBuf,
}

impl BackupStore {
    /// Create a store for `dir`; the directory is created lazily
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The backup directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Absolute path of a snapshot
    pub fn path_of(&self, backup: &str) -> PathBuf {
        self.dir.join(backup)
    }

    /// Whether a snapshot exists on disk
    pub fn exists(&self, backup: &str) -> bool {
        self.path_of(backup).is_file()
    }

    /// Copy `live` into the store and return the generated file name.
    ///
    /// `timestamp` is the ledger timestamp of the version being recorded;
    /// colons are stripped so the name is filesystem-safe. If a snapshot with
    /// the same name already exists, a `-<n>` suffix keeps both.
    pub fn snapshot(&self, live: &Path, file_name: &str, timestamp: &str) -> CoreResult<String> {
        fs::create_dir_all(&self.dir).map_err(|e| CoreError::BackupWriteFailure {
            path: self.dir.display().to_string(),
            source: e,
        })?;

        let base = format!("{}{}", timestamp.replace(':', ""), file_name);
        let name = self.unused_name(&base);
        let target = self.path_of(&name);

        fs::copy(live, &target).map_err(|e| CoreError::BackupWriteFailure {
            path: target.display().to_string(),
            source: e,
        })?;
        log::debug!("Snapshot {} -> {}", live.display(), target.display());
        Ok(name)
    }

    fn unused_name(&self, base: &str) -> String {
        if !self.path_of(base).exists() {
            return base.to_string();
        }
        let (stem, ext) = match base.rfind('.') {
            Some(pos) => (&base[..pos], &base[pos..]),
            None => (base, ""),
        };
        let mut n = 1;
        loop {
            let candidate = format!("{stem}-{n}{ext}");
            if !self.path_of(&candidate).exists() {
                return candidate;
            }
            n += 1;
        }
    }

    /// Copy a snapshot back over the live definition
    pub fn restore(&self, backup: &str, live: &Path) -> CoreResult<()> {
        let source = self.path_of(backup);
        if !source.is_file() {
            return Err(CoreError::BackupMissing {
                path: source.display().to_string(),
            });
        }
        fs::copy(&source, live).map_err(|e| CoreError::BackupWriteFailure {
            path: live.display().to_string(),
            source: e,
        })?;
        log::debug!("Restored {} -> {}", source.display(), live.display());
        Ok(())
    }

    /// Delete a snapshot. A missing file is not an error.
    ///
    /// Returns `false` only when the file exists but could not be removed.
    pub fn discard(&self, backup: &str) -> bool {
        match fs::remove_file(self.path_of(backup)) {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => {
                log::warn!("Failed to remove backup {backup}: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
#[path = "backup_test.rs"]
mod tests;
