//! Lock ledger: the persisted version history of one unit context.
//!
//! The document is a JSON object keyed by unit identifier:
//!
//! ```json
//! {
//!     "UserTable": {
//!         "namespace": "App\\Database\\Migrations\\UserTable",
//!         "lastVersion": 0,
//!         "latestVersion": 1,
//!         "metadata": {
//!             "1": {
//!                 "backup": "2026-03-04T050607UserTable.sql",
//!                 "timestamp": "2026-03-04T05:06:07",
//!                 "version": 1
//!             }
//!         }
//!     }
//! }
//! ```
//!
//! `latestVersion` is always the highest key of `metadata`; an entry whose
//! metadata becomes empty is removed.

use crate::backup::BackupStore;
use crate::error::{CoreError, CoreResult};
use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

/// Version history for every unit of one context
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledger {
    entries: BTreeMap<String, LedgerEntry>,
}

/// Version history of a single unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    /// Fully-qualified logical path of the unit
    pub namespace: String,

    /// Version that was active before the most recent change (0 if none)
    #[serde(default)]
    pub last_version: u32,

    /// Highest recorded version
    pub latest_version: u32,

    /// Recorded versions, ordered by version number
    #[serde(default, deserialize_with = "deserialize_metadata")]
    pub metadata: BTreeMap<u32, VersionRecord>,
}

/// One recorded execution of a unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    /// Snapshot file name inside the backup directory
    pub backup: String,

    /// When the version was recorded (`%Y-%m-%dT%H:%M:%S`)
    pub timestamp: String,

    /// Version number (mirrors the metadata key)
    pub version: u32,
}

/// Ledgers written by older tooling encode a dense history as a JSON array
/// instead of an object; accept both.
fn deserialize_metadata<'de, D>(deserializer: D) -> Result<BTreeMap<u32, VersionRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    struct MetadataVisitor;

    impl<'de> Visitor<'de> for MetadataVisitor {
        type Value = BTreeMap<u32, VersionRecord>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of version rows or a list of version rows")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut rows = BTreeMap::new();
            while let Some((key, row)) = map.next_entry::<String, VersionRecord>()? {
                let version = key.parse::<u32>().map_err(de::Error::custom)?;
                rows.insert(version, row);
            }
            Ok(rows)
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: SeqAccess<'de>,
        {
            let mut rows = BTreeMap::new();
            while let Some(row) = seq.next_element::<VersionRecord>()? {
                rows.insert(row.version, row);
            }
            Ok(rows)
        }
    }

    deserializer.deserialize_any(MetadataVisitor)
}

impl LedgerEntry {
    /// Metadata row for a version
    pub fn version(&self, version: u32) -> Option<&VersionRecord> {
        self.metadata.get(&version)
    }

    /// Metadata row of `latestVersion`
    pub fn latest(&self) -> Option<&VersionRecord> {
        self.metadata.get(&self.latest_version)
    }

    /// Re-derive `latestVersion` from the metadata keys
    fn sync_latest(&mut self) {
        self.latest_version = self.metadata.keys().next_back().copied().unwrap_or(0);
    }
}

impl Ledger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a ledger document.
    ///
    /// A missing, empty or unparsable file yields an empty ledger; only
    /// genuine read failures are errors.
    pub fn load(path: &Path) -> CoreResult<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => {
                return Err(CoreError::IoWithPath {
                    path: path.display().to_string(),
                    source: e,
                })
            }
        };

        if content.trim().is_empty() {
            return Ok(Self::new());
        }

        match serde_json::from_str::<Ledger>(&content) {
            Ok(ledger) => Ok(ledger),
            Err(e) => {
                log::warn!(
                    "Ledger {} is not valid ({e}); starting from an empty history",
                    path.display()
                );
                Ok(Self::new())
            }
        }
    }

    /// Serialize the ledger as pretty JSON with four-space indentation
    pub fn to_json(&self) -> CoreResult<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        // serde_json only ever emits UTF-8
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Save the ledger atomically
    ///
    /// Uses write-to-temp-then-rename pattern to prevent corruption.
    /// Temp file includes PID to avoid races from concurrent processes.
    pub fn persist(&self, path: &Path) -> CoreResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| CoreError::BackupWriteFailure {
                path: parent.display().to_string(),
                source: e,
            })?;
        }

        let json = self.to_json()?;
        let temp_path = path.with_extension(format!("lock.{}.tmp", std::process::id()));
        fs::write(&temp_path, json).map_err(|e| CoreError::BackupWriteFailure {
            path: temp_path.display().to_string(),
            source: e,
        })?;
        fs::rename(&temp_path, path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            CoreError::BackupWriteFailure {
                path: path.display().to_string(),
                source: e,
            }
        })?;
        Ok(())
    }

    /// Entry for a unit
    pub fn get(&self, name: &str) -> Option<&LedgerEntry> {
        self.entries.get(name)
    }

    /// Whether the ledger holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterate entries in identifier order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &LedgerEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Append a new version for `name` and return its number.
    ///
    /// The first version of a unit is 1 with `lastVersion = 0`; later
    /// versions increment `latestVersion` and remember the previous one.
    pub fn record(&mut self, name: &str, namespace: &str, backup: &str, timestamp: &str) -> u32 {
        let entry = self
            .entries
            .entry(name.to_string())
            .or_insert_with(|| LedgerEntry {
                namespace: namespace.to_string(),
                last_version: 0,
                latest_version: 0,
                metadata: BTreeMap::new(),
            });

        let version = entry.latest_version + 1;
        entry.last_version = entry.latest_version;
        entry.latest_version = version;
        entry.namespace = namespace.to_string();
        entry.metadata.insert(
            version,
            VersionRecord {
                backup: backup.to_string(),
                timestamp: timestamp.to_string(),
                version,
            },
        );
        version
    }

    /// Remove the highest version of `name` and discard its snapshot.
    ///
    /// Returns the removed version, or `None` when the unit has no history.
    pub fn record_drop(&mut self, name: &str, store: &BackupStore) -> Option<u32> {
        let entry = self.entries.get_mut(name)?;
        let Some((top, row)) = entry.metadata.pop_last() else {
            self.entries.remove(name);
            return None;
        };
        store.discard(&row.backup);

        if entry.metadata.is_empty() {
            self.entries.remove(name);
        } else {
            entry.sync_latest();
            entry.last_version = entry
                .metadata
                .range(..entry.latest_version)
                .next_back()
                .map(|(&v, _)| v)
                .unwrap_or(0);
        }
        Some(top)
    }

    /// Record the result of rolling `name` back to `target`.
    ///
    /// A new version pointing at `backup` (a fresh snapshot of the restored
    /// definition) is appended. The target row and every row newer than it
    /// are superseded and removed together with their snapshots.
    pub fn rewrite(
        &mut self,
        name: &str,
        target: u32,
        namespace: &str,
        backup: &str,
        timestamp: &str,
        store: &BackupStore,
    ) -> CoreResult<u32> {
        let entry = self
            .entries
            .get_mut(name)
            .ok_or_else(|| CoreError::NoLedgerEntry {
                name: name.to_string(),
            })?;

        let new_version = entry.latest_version + 1;
        let superseded: Vec<u32> = entry.metadata.range(target..).map(|(&v, _)| v).collect();
        for version in superseded {
            if let Some(row) = entry.metadata.remove(&version) {
                if row.backup != backup {
                    store.discard(&row.backup);
                }
            }
        }

        entry.metadata.insert(
            new_version,
            VersionRecord {
                backup: backup.to_string(),
                timestamp: timestamp.to_string(),
                version: new_version,
            },
        );
        entry.namespace = namespace.to_string();
        entry.last_version = target;
        entry.sync_latest();
        Ok(new_version)
    }

    /// Forget `name` entirely, discarding all of its snapshots
    pub fn clear(&mut self, name: &str, store: &BackupStore) -> bool {
        match self.entries.remove(name) {
            Some(entry) => {
                for row in entry.metadata.values() {
                    store.discard(&row.backup);
                }
                true
            }
            None => false,
        }
    }

    /// Forget every unit, discarding all snapshots; returns the entry count
    pub fn clear_all(&mut self, store: &BackupStore) -> usize {
        let names: Vec<String> = self.entries.keys().cloned().collect();
        for name in &names {
            self.clear(name, store);
        }
        names.len()
    }

    /// Metadata rows whose snapshot file is missing: `(name, version, backup)`
    pub fn missing_backups(&self, store: &BackupStore) -> Vec<(String, u32, String)> {
        self.entries
            .iter()
            .flat_map(|(name, entry)| {
                entry
                    .metadata
                    .values()
                    .filter(|row| !store.exists(&row.backup))
                    .map(move |row| (name.clone(), row.version, row.backup.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "ledger_test.rs"]
mod tests;
