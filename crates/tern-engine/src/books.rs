//! Ledger and snapshot bookkeeping shared by both engines

use crate::error::{EngineError, EngineResult};
use std::fs;
use std::path::{Path, PathBuf};
use tern_core::{
    guard_version, timestamp_now, BackupStore, Config, CoreError, GuardDecision, Ledger,
    LedgerLock, PacingConfig, UnitFile, UnitKind,
};

/// Where an engine finds its units and keeps its bookkeeping
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Unit kind handled by the engine
    pub kind: UnitKind,
    /// Directory scanned for unit files
    pub unit_dir: PathBuf,
    /// Namespace prefix for qualified names
    pub namespace: String,
    /// Directory holding definition snapshots
    pub backup_dir: PathBuf,
    /// Delays between phases and units
    pub pacing: PacingConfig,
    /// Hold a guard file while the engine runs
    pub advisory_lock: bool,
}

impl EngineSettings {
    /// Resolve settings for `kind` from a project config rooted at `root`
    pub fn from_config(config: &Config, root: &Path, kind: UnitKind) -> Self {
        Self {
            kind,
            unit_dir: config.unit_path_absolute(root, kind),
            namespace: config.unit_dir(kind).namespace.clone(),
            backup_dir: config.backup_path_absolute(root),
            pacing: config.pacing,
            advisory_lock: config.advisory_lock,
        }
    }

    /// Path of the ledger document
    pub fn ledger_path(&self) -> PathBuf {
        self.backup_dir.join(self.kind.ledger_file_name())
    }
}

/// Ledger operations bound to one engine's settings
#[derive(Debug)]
pub(crate) struct Books {
    ledger_path: PathBuf,
    store: BackupStore,
    advisory_lock: bool,
}

impl Books {
    pub(crate) fn new(settings: &EngineSettings) -> Self {
        Self {
            ledger_path: settings.ledger_path(),
            store: BackupStore::new(settings.backup_dir.clone()),
            advisory_lock: settings.advisory_lock,
        }
    }

    pub(crate) fn store(&self) -> &BackupStore {
        &self.store
    }

    /// Take the guard file, when enabled
    pub(crate) fn lock(&self) -> EngineResult<Option<LedgerLock>> {
        if !self.advisory_lock {
            return Ok(None);
        }
        Ok(Some(LedgerLock::acquire(&self.ledger_path)?))
    }

    pub(crate) fn load(&self) -> EngineResult<Ledger> {
        Ok(Ledger::load(&self.ledger_path)?)
    }

    /// Compare a unit against its latest (or a given) snapshot
    pub(crate) fn guard(&self, unit: &UnitFile, version: Option<u32>) -> EngineResult<GuardDecision> {
        let ledger = self.load()?;
        Ok(guard_version(
            &ledger,
            unit.name.as_str(),
            &unit.path,
            &self.store,
            version,
        ))
    }

    /// Snapshot the live definition and append a version for it
    pub(crate) fn record(&self, unit: &UnitFile) -> EngineResult<u32> {
        let timestamp = timestamp_now();
        let backup = self.store.snapshot(&unit.path, &unit.file_name(), &timestamp)?;

        let mut ledger = self.load()?;
        let version = ledger.record(unit.name.as_str(), &unit.namespace, &backup, &timestamp);
        self.persist_or_discard(&ledger, &backup)?;

        log::debug!("Recorded {} version {} ({})", unit.name, version, backup);
        Ok(version)
    }

    /// Remove the newest version of a unit
    pub(crate) fn record_drop(&self, name: &str) -> EngineResult<Option<u32>> {
        let mut ledger = self.load()?;
        let dropped = ledger.record_drop(name, &self.store);
        if dropped.is_some() {
            ledger.persist(&self.ledger_path)?;
        }
        Ok(dropped)
    }

    /// Supersede `target` and newer versions with a snapshot of the restored definition
    pub(crate) fn rewrite(&self, unit: &UnitFile, target: u32) -> EngineResult<u32> {
        let timestamp = timestamp_now();
        let backup = self.store.snapshot(&unit.path, &unit.file_name(), &timestamp)?;

        let mut ledger = self.load()?;
        let version = ledger.rewrite(
            unit.name.as_str(),
            target,
            &unit.namespace,
            &backup,
            &timestamp,
            &self.store,
        )?;
        self.persist_or_discard(&ledger, &backup)?;
        Ok(version)
    }

    /// Forget one unit, or every unit when `name` is `None`
    pub(crate) fn clear(&self, name: Option<&str>) -> EngineResult<usize> {
        let mut ledger = self.load()?;
        let cleared = match name {
            Some(name) => {
                if !ledger.clear(name, &self.store) {
                    return Err(EngineError::NoLockFound {
                        name: name.to_string(),
                    });
                }
                1
            }
            None => ledger.clear_all(&self.store),
        };
        ledger.persist(&self.ledger_path)?;
        Ok(cleared)
    }

    /// Current content of a unit file
    pub(crate) fn read_definition(&self, unit: &UnitFile) -> EngineResult<Vec<u8>> {
        fs::read(&unit.path).map_err(|e| {
            CoreError::IoWithPath {
                path: unit.path.display().to_string(),
                source: e,
            }
            .into()
        })
    }

    /// Overwrite a unit file with content taken by [`Books::read_definition`]
    pub(crate) fn put_back(&self, unit: &UnitFile, content: &[u8]) -> EngineResult<()> {
        fs::write(&unit.path, content).map_err(|e| EngineError::BackupWriteFailure {
            path: unit.path.display().to_string(),
            source: e,
        })
    }

    fn persist_or_discard(&self, ledger: &Ledger, backup: &str) -> EngineResult<()> {
        if let Err(e) = ledger.persist(&self.ledger_path) {
            self.store.discard(backup);
            return Err(e.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn settings(dir: &TempDir) -> EngineSettings {
        EngineSettings {
            kind: UnitKind::Migration,
            unit_dir: dir.path().join("migrations"),
            namespace: "App\\Database\\Migrations".to_string(),
            backup_dir: dir.path().join("backup"),
            pacing: PacingConfig::none(),
            advisory_lock: true,
        }
    }

    fn unit(dir: &TempDir, content: &str) -> UnitFile {
        let migrations = dir.path().join("migrations");
        std::fs::create_dir_all(&migrations).unwrap();
        let path = migrations.join("users.sql");
        std::fs::write(&path, content).unwrap();
        UnitFile::from_path(path, "App\\Database\\Migrations").unwrap()
    }

    #[test]
    fn test_record_and_guard() {
        let dir = TempDir::new().unwrap();
        let books = Books::new(&settings(&dir));
        let unit = unit(&dir, "-- up\nCREATE TABLE users (id INT);\n");

        assert_eq!(books.guard(&unit, None).unwrap(), GuardDecision::Proceed);
        assert_eq!(books.record(&unit).unwrap(), 1);
        assert!(books.guard(&unit, None).unwrap().is_skip());

        std::fs::write(&unit.path, "-- up\nCREATE TABLE users (id BIGINT);\n").unwrap();
        assert_eq!(books.guard(&unit, None).unwrap(), GuardDecision::Proceed);
        assert_eq!(books.record(&unit).unwrap(), 2);

        let ledger = books.load().unwrap();
        let entry = ledger.get("users").unwrap();
        assert_eq!(entry.latest_version, 2);
        assert_eq!(entry.last_version, 1);
        assert_eq!(entry.namespace, "App\\Database\\Migrations\\users");
    }

    #[test]
    fn test_clear_unknown_unit() {
        let dir = TempDir::new().unwrap();
        let books = Books::new(&settings(&dir));
        assert!(matches!(
            books.clear(Some("users")),
            Err(EngineError::NoLockFound { .. })
        ));
        assert_eq!(books.clear(None).unwrap(), 0);
    }

    #[test]
    fn test_lock_is_exclusive() {
        let dir = TempDir::new().unwrap();
        let books = Books::new(&settings(&dir));

        let guard = books.lock().unwrap();
        assert!(guard.is_some());
        assert!(matches!(books.lock(), Err(EngineError::LedgerBusy { .. })));
        drop(guard);
        assert!(books.lock().unwrap().is_some());
    }

    #[test]
    fn test_put_back_definition() {
        let dir = TempDir::new().unwrap();
        let books = Books::new(&settings(&dir));
        let unit = unit(&dir, "-- up\nCREATE TABLE users (id INT);\n");

        let held = books.read_definition(&unit).unwrap();
        std::fs::write(&unit.path, "-- up\n").unwrap();
        books.put_back(&unit, &held).unwrap();
        assert_eq!(
            std::fs::read_to_string(&unit.path).unwrap(),
            "-- up\nCREATE TABLE users (id INT);\n"
        );
    }

    #[test]
    fn test_lock_disabled() {
        let dir = TempDir::new().unwrap();
        let mut settings = settings(&dir);
        settings.advisory_lock = false;
        let books = Books::new(&settings);
        let _a = books.lock().unwrap();
        assert!(books.lock().unwrap().is_none());
    }
}
