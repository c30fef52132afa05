//! Version guard: skip units whose definition has not changed since the
//! recorded version was taken.

use crate::backup::BackupStore;
use crate::checksum::compute_file_checksum;
use crate::ledger::Ledger;
use std::path::Path;

/// Outcome of a guard check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Definition changed or has no history; execute it
    Proceed,
    /// Definition matches the recorded snapshot; skip it
    Skip,
}

impl GuardDecision {
    /// Whether execution should be skipped
    pub fn is_skip(self) -> bool {
        self == GuardDecision::Skip
    }
}

/// Whether `live` differs from `backup`.
///
/// A missing or unreadable file on either side counts as changed.
pub fn has_changed(live: &Path, backup: &Path) -> bool {
    match (compute_file_checksum(live), compute_file_checksum(backup)) {
        (Ok(a), Ok(b)) => a != b,
        _ => true,
    }
}

/// Decide whether `name` must run, comparing `live` with the snapshot of
/// `version` (or of `latestVersion` when `version` is `None`).
pub fn guard_version(
    ledger: &Ledger,
    name: &str,
    live: &Path,
    store: &BackupStore,
    version: Option<u32>,
) -> GuardDecision {
    let Some(entry) = ledger.get(name) else {
        return GuardDecision::Proceed;
    };
    let row = match version {
        Some(v) => entry.version(v),
        None => entry.latest(),
    };
    let Some(row) = row else {
        return GuardDecision::Proceed;
    };

    if has_changed(live, &store.path_of(&row.backup)) {
        GuardDecision::Proceed
    } else {
        GuardDecision::Skip
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_has_changed() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.sql");
        let b = dir.path().join("b.sql");
        fs::write(&a, "CREATE TABLE t (id INT);").unwrap();
        fs::write(&b, "CREATE TABLE t (id INT);").unwrap();
        assert!(!has_changed(&a, &b));

        fs::write(&b, "CREATE TABLE t (id BIGINT);").unwrap();
        assert!(has_changed(&a, &b));

        assert!(has_changed(&a, &dir.path().join("missing.sql")));
        assert!(has_changed(&dir.path().join("missing.sql"), &a));
    }

    #[test]
    fn test_guard_version() {
        let dir = tempdir().unwrap();
        let live = dir.path().join("users.sql");
        fs::write(&live, "v1").unwrap();
        let store = BackupStore::new(dir.path().join("backup"));

        let mut ledger = Ledger::new();
        assert_eq!(
            guard_version(&ledger, "users", &live, &store, None),
            GuardDecision::Proceed
        );

        let backup = store.snapshot(&live, "users.sql", "2026-01-01T00:00:00").unwrap();
        ledger.record("users", "users", &backup, "2026-01-01T00:00:00");
        assert!(guard_version(&ledger, "users", &live, &store, None).is_skip());
        assert!(guard_version(&ledger, "users", &live, &store, Some(1)).is_skip());

        // Unknown version row is not guarded
        assert_eq!(
            guard_version(&ledger, "users", &live, &store, Some(7)),
            GuardDecision::Proceed
        );

        fs::write(&live, "v2").unwrap();
        assert_eq!(
            guard_version(&ledger, "users", &live, &store, None),
            GuardDecision::Proceed
        );
    }
}
