//! Unit discovery: resolve the files of a unit directory to identifiers.
//!
//! Discovery is repeated on every engine invocation; nothing is cached
//! between runs.

use crate::error::{CoreError, CoreResult};
use crate::unit_name::UnitName;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A unit definition found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitFile {
    /// Identifier (file stem)
    pub name: UnitName,

    /// Fully-qualified logical path recorded in the ledger
    pub namespace: String,

    /// Live definition path
    pub path: PathBuf,

    /// File extension without the dot (may be empty)
    pub extension: String,
}

impl UnitFile {
    /// Build a unit from a file path under a namespace prefix
    pub fn from_path(path: PathBuf, namespace_prefix: &str) -> CoreResult<Self> {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| CoreError::InvalidUnitName {
                name: path.display().to_string(),
                reason: "file name is not valid UTF-8".to_string(),
            })?;
        let name = UnitName::parse(stem)?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_string();

        Ok(Self {
            namespace: qualify(namespace_prefix, &name),
            name,
            path,
            extension,
        })
    }

    /// File name used for snapshots of this unit (`<identifier>.<ext>`)
    pub fn file_name(&self) -> String {
        if self.extension.is_empty() {
            self.name.to_string()
        } else {
            format!("{}.{}", self.name, self.extension)
        }
    }
}

/// Join a namespace prefix and an identifier
pub fn qualify(prefix: &str, name: &str) -> String {
    let prefix = prefix.trim_end_matches('\\');
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}\\{}", prefix, name)
    }
}

/// Discover all unit files in `dir`, sorted by identifier.
///
/// The scan is not recursive. Hidden files and sub-directories are ignored.
/// A missing directory yields no units.
pub fn discover_units(dir: &Path, namespace_prefix: &str) -> CoreResult<Vec<UnitFile>> {
    if !dir.exists() {
        log::debug!("Unit directory {} does not exist", dir.display());
        return Ok(Vec::new());
    }
    if !dir.is_dir() {
        return Err(CoreError::UnitDirectoryNotFound {
            path: dir.display().to_string(),
        });
    }

    let entries = std::fs::read_dir(dir).map_err(|e| CoreError::IoWithPath {
        path: dir.display().to_string(),
        source: e,
    })?;

    let mut units: Vec<UnitFile> = Vec::new();
    let mut seen: HashMap<UnitName, PathBuf> = HashMap::new();

    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let hidden = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with('.'));
        if hidden {
            continue;
        }

        let unit = match UnitFile::from_path(path, namespace_prefix) {
            Ok(unit) => unit,
            Err(e) => {
                log::warn!("Skipping unit file: {e}");
                continue;
            }
        };

        if let Some(existing) = seen.get(&unit.name) {
            return Err(CoreError::DuplicateUnit {
                name: unit.name.to_string(),
                path1: existing.display().to_string(),
                path2: unit.path.display().to_string(),
            });
        }
        seen.insert(unit.name.clone(), unit.path.clone());
        units.push(unit);
    }

    // Lexical order keeps re-runs deterministic
    units.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(units)
}

/// Find a single unit by identifier
pub fn find_unit(dir: &Path, namespace_prefix: &str, name: &str) -> CoreResult<Option<UnitFile>> {
    Ok(discover_units(dir, namespace_prefix)?
        .into_iter()
        .find(|u| u.name == name))
}

#[cfg(test)]
#[path = "discovery_test.rs"]
mod tests;
