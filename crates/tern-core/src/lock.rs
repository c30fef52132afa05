//! Advisory guard file around ledger read-modify-write.
//!
//! `<ledger>.guard` is created exclusively and holds the PID of the owner.
//! It is removed when the guard is dropped. A guard whose owner is no longer
//! running is cleared on the next acquire.

use crate::error::{CoreError, CoreResult};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Held while a ledger is being read and rewritten
#[derive(Debug)]
pub struct LedgerLock {
    path: PathBuf,
}

impl LedgerLock {
    /// Path of the guard file for a ledger document
    pub fn guard_path(ledger: &Path) -> PathBuf {
        let mut name = ledger
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".guard");
        ledger.with_file_name(name)
    }

    /// Acquire the guard for `ledger`, failing if a live holder exists
    pub fn acquire(ledger: &Path) -> CoreResult<Self> {
        let path = Self::guard_path(ledger);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| CoreError::BackupWriteFailure {
                path: parent.display().to_string(),
                source: e,
            })?;
        }

        match Self::create(&path)? {
            Some(lock) => Ok(lock),
            None => {
                let holder = read_holder(&path);
                match holder {
                    Some(pid) if !is_process_running(pid) => {
                        log::warn!(
                            "Removing stale ledger guard {} left by PID {}",
                            path.display(),
                            pid
                        );
                        fs::remove_file(&path).map_err(|e| CoreError::BackupWriteFailure {
                            path: path.display().to_string(),
                            source: e,
                        })?;
                        Self::create(&path)?.ok_or_else(|| busy(&path, holder))
                    }
                    _ => Err(busy(&path, holder)),
                }
            }
        }
    }

    /// Create the guard file; `None` when it already exists
    fn create(path: &Path) -> CoreResult<Option<Self>> {
        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(None),
            Err(e) => {
                return Err(CoreError::BackupWriteFailure {
                    path: path.display().to_string(),
                    source: e,
                })
            }
        };
        writeln!(file, "{}", std::process::id()).map_err(|e| CoreError::BackupWriteFailure {
            path: path.display().to_string(),
            source: e,
        })?;
        log::debug!("Acquired ledger guard {}", path.display());
        Ok(Some(Self {
            path: path.to_path_buf(),
        }))
    }
}

impl Drop for LedgerLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            log::warn!("Failed to release ledger guard {}: {e}", self.path.display());
        }
    }
}

fn busy(path: &Path, holder: Option<u32>) -> CoreError {
    CoreError::LedgerBusy {
        path: path.display().to_string(),
        holder: holder.map_or_else(|| "an unknown process".to_string(), |pid| format!("PID {pid}")),
    }
}

/// PID recorded in a guard file, if readable
fn read_holder(path: &Path) -> Option<u32> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

/// Whether a process with the given PID is running
#[cfg(unix)]
fn is_process_running(pid: u32) -> bool {
    let Ok(pid) = i32::try_from(pid) else {
        return false;
    };
    // kill(pid, 0) sends no signal; EPERM means it exists under another user
    if unsafe { libc::kill(pid, 0) } == 0 {
        return true;
    }
    std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

#[cfg(not(unix))]
fn is_process_running(_pid: u32) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_guard_is_exclusive_and_released() {
        let dir = tempdir().unwrap();
        let ledger = dir.path().join("migrations.lock");
        let guard_path = LedgerLock::guard_path(&ledger);
        assert_eq!(guard_path, dir.path().join("migrations.lock.guard"));

        let held = LedgerLock::acquire(&ledger).unwrap();
        assert!(guard_path.exists());
        let err = LedgerLock::acquire(&ledger).unwrap_err();
        match err {
            CoreError::LedgerBusy { holder, .. } => {
                assert_eq!(holder, format!("PID {}", std::process::id()))
            }
            other => panic!("unexpected error: {other}"),
        }

        drop(held);
        assert!(!guard_path.exists());
        assert!(LedgerLock::acquire(&ledger).is_ok());
    }

    #[test]
    fn test_unreadable_guard_is_busy() {
        let dir = tempdir().unwrap();
        let ledger = dir.path().join("seeders.lock");
        fs::write(LedgerLock::guard_path(&ledger), "").unwrap();

        let err = LedgerLock::acquire(&ledger).unwrap_err();
        assert!(err.to_string().contains("an unknown process"));
    }

    #[cfg(unix)]
    #[test]
    fn test_stale_guard_is_cleared() {
        let dir = tempdir().unwrap();
        let ledger = dir.path().join("migrations.lock");
        let guard_path = LedgerLock::guard_path(&ledger);

        // A child that has been reaped leaves its PID unused
        let mut child = std::process::Command::new("true").spawn().unwrap();
        let pid = child.id();
        child.wait().unwrap();
        fs::write(&guard_path, format!("{pid}\n")).unwrap();

        let held = LedgerLock::acquire(&ledger).unwrap();
        assert_eq!(
            fs::read_to_string(&guard_path).unwrap().trim(),
            std::process::id().to_string()
        );
        drop(held);
    }
}
