//! Configuration types and parsing for tern.yml

use crate::error::{CoreError, CoreResult};
use crate::kind::UnitKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main project configuration from tern.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Migration unit directory and namespace
    #[serde(default = "default_migrations")]
    pub migrations: UnitDirConfig,

    /// Seed unit directory and namespace
    #[serde(default = "default_seeds")]
    pub seeds: UnitDirConfig,

    /// Directory holding ledger documents and definition snapshots
    #[serde(default = "default_backup_path")]
    pub backup_path: String,

    /// Database connection configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Pauses inserted between phases and between units
    #[serde(default)]
    pub pacing: PacingConfig,

    /// Hold `<ledger>.guard` while reading and writing a ledger
    #[serde(default = "default_true")]
    pub advisory_lock: bool,
}

/// Location and logical namespace of a unit directory
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnitDirConfig {
    /// Directory containing unit definition files
    pub path: String,

    /// Namespace prefix recorded in the ledger (`<namespace>\<identifier>`)
    #[serde(default)]
    pub namespace: String,
}

/// Database connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Database path (DuckDB file or :memory:)
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Throughput throttles between destructive and additive phases and units.
///
/// Both may be zero; they never affect ledger correctness.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PacingConfig {
    /// Pause between `down()` and `up()` of one migration
    #[serde(default = "default_phase_delay_ms")]
    pub phase_delay_ms: u64,

    /// Pause between two consecutive units
    #[serde(default = "default_unit_delay_ms")]
    pub unit_delay_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            phase_delay_ms: default_phase_delay_ms(),
            unit_delay_ms: default_unit_delay_ms(),
        }
    }
}

impl PacingConfig {
    /// No pauses at all
    pub fn none() -> Self {
        Self {
            phase_delay_ms: 0,
            unit_delay_ms: 0,
        }
    }

    /// Pause between phases as a `Duration`
    pub fn phase_delay(&self) -> Duration {
        Duration::from_millis(self.phase_delay_ms)
    }

    /// Pause between units as a `Duration`
    pub fn unit_delay(&self) -> Duration {
        Duration::from_millis(self.unit_delay_ms)
    }
}

fn default_migrations() -> UnitDirConfig {
    UnitDirConfig {
        path: "database/migrations".to_string(),
        namespace: "App\\Database\\Migrations".to_string(),
    }
}

fn default_seeds() -> UnitDirConfig {
    UnitDirConfig {
        path: "database/seeds".to_string(),
        namespace: "App\\Database\\Seeds".to_string(),
    }
}

fn default_backup_path() -> String {
    "database/backup".to_string()
}

fn default_db_path() -> String {
    "tern.duckdb".to_string()
}

fn default_phase_delay_ms() -> u64 {
    250
}

fn default_unit_delay_ms() -> u64 {
    100
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            migrations: default_migrations(),
            seeds: default_seeds(),
            backup_path: default_backup_path(),
            database: DatabaseConfig::default(),
            pacing: PacingConfig::default(),
            advisory_lock: true,
        }
    }
}

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from YAML text
    pub fn parse(content: &str) -> CoreResult<Self> {
        // An empty file means "all defaults"
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config =
            serde_yaml::from_str(content).map_err(|e| CoreError::ConfigParseError {
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a project directory
    ///
    /// Looks for tern.yml or tern.yaml
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        let yml_path = dir.join("tern.yml");
        let yaml_path = dir.join("tern.yaml");

        if yml_path.exists() {
            Self::load(&yml_path)
        } else if yaml_path.exists() {
            Self::load(&yaml_path)
        } else {
            Err(CoreError::ConfigNotFound {
                path: yml_path.display().to_string(),
            })
        }
    }

    /// Validate configuration values
    fn validate(&self) -> CoreResult<()> {
        for (label, dir) in [("migrations", &self.migrations), ("seeds", &self.seeds)] {
            if dir.path.trim().is_empty() {
                return Err(CoreError::ConfigInvalid {
                    message: format!("{label}.path must not be empty"),
                });
            }
        }
        if self.backup_path.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "backup_path must not be empty".to_string(),
            });
        }
        if self.migrations.path == self.backup_path || self.seeds.path == self.backup_path {
            return Err(CoreError::ConfigInvalid {
                message: "backup_path must differ from the unit directories".to_string(),
            });
        }
        Ok(())
    }

    /// Unit directory configuration for a context
    pub fn unit_dir(&self, kind: UnitKind) -> &UnitDirConfig {
        match kind {
            UnitKind::Migration => &self.migrations,
            UnitKind::Seed => &self.seeds,
        }
    }

    /// Absolute unit directory for a context
    pub fn unit_path_absolute(&self, root: &Path, kind: UnitKind) -> PathBuf {
        resolve(root, &self.unit_dir(kind).path)
    }

    /// Absolute backup directory
    pub fn backup_path_absolute(&self, root: &Path) -> PathBuf {
        resolve(root, &self.backup_path)
    }

    /// Absolute path of the ledger document for a context
    pub fn ledger_path_absolute(&self, root: &Path, kind: UnitKind) -> PathBuf {
        self.backup_path_absolute(root).join(kind.ledger_file_name())
    }
}

fn resolve(root: &Path, path: &str) -> PathBuf {
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        root.join(p)
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
