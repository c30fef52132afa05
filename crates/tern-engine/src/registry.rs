//! Unit registry: resolves discovered files into unit instances
//!
//! Constructors are registered per identifier or per file extension. An
//! identifier constructor takes precedence. Every instantiation reads the
//! file afresh, so a unit always reflects its current definition.

use crate::error::{EngineError, EngineResult};
use crate::sql::{CsvSeed, SqlMigration, SqlSeed};
use crate::unit::{Migration, Seed, UnitError};
use std::collections::HashMap;
use std::sync::Arc;
use tern_core::{UnitFile, UnitKind};

/// Source handed to a constructor
pub struct UnitSource<'a> {
    /// The discovered file
    pub file: &'a UnitFile,
}

impl UnitSource<'_> {
    /// Read the unit file's current content
    pub fn read(&self) -> Result<String, UnitError> {
        std::fs::read_to_string(&self.file.path).map_err(|e| {
            UnitError::Failed(format!("cannot read {}: {}", self.file.path.display(), e))
        })
    }
}

type Constructor<T> = Arc<dyn Fn(&UnitSource<'_>) -> Result<Box<T>, UnitError> + Send + Sync>;

/// Registry of unit constructors
pub struct UnitRegistry<T: ?Sized> {
    kind: UnitKind,
    by_name: HashMap<String, Constructor<T>>,
    by_extension: HashMap<String, Constructor<T>>,
}

/// Registry of migration constructors
pub type MigrationRegistry = UnitRegistry<dyn Migration>;

/// Registry of seed constructors
pub type SeedRegistry = UnitRegistry<dyn Seed>;

impl<T: ?Sized> UnitRegistry<T> {
    /// Create an empty registry
    pub fn new(kind: UnitKind) -> Self {
        Self {
            kind,
            by_name: HashMap::new(),
            by_extension: HashMap::new(),
        }
    }

    /// Register a constructor for one identifier
    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F)
    where
        F: Fn(&UnitSource<'_>) -> Result<Box<T>, UnitError> + Send + Sync + 'static,
    {
        self.by_name.insert(name.into(), Arc::new(constructor));
    }

    /// Register a constructor for every file with an extension
    pub fn register_extension<F>(&mut self, extension: impl Into<String>, constructor: F)
    where
        F: Fn(&UnitSource<'_>) -> Result<Box<T>, UnitError> + Send + Sync + 'static,
    {
        self.by_extension
            .insert(extension.into().to_lowercase(), Arc::new(constructor));
    }

    /// Whether a file can be instantiated
    pub fn supports(&self, file: &UnitFile) -> bool {
        self.constructor(file).is_some()
    }

    fn constructor(&self, file: &UnitFile) -> Option<&Constructor<T>> {
        self.by_name
            .get(file.name.as_str())
            .or_else(|| self.by_extension.get(&file.extension.to_lowercase()))
    }

    /// Instantiate the unit defined by a file
    pub fn instantiate(&self, file: &UnitFile) -> EngineResult<Box<T>> {
        if !file.path.is_file() {
            return Err(EngineError::UnitNotFound {
                name: file.name.to_string(),
            });
        }
        let constructor = self
            .constructor(file)
            .ok_or_else(|| EngineError::InvalidBaseType {
                name: file.name.to_string(),
                kind: self.kind,
                reason: format!("no constructor for '.{}' files", file.extension),
            })?;

        constructor(&UnitSource { file }).map_err(|e| match e {
            UnitError::Db(db) => EngineError::Db(db),
            other => EngineError::InvalidBaseType {
                name: file.name.to_string(),
                kind: self.kind,
                reason: other.to_string(),
            },
        })
    }
}

fn sql_migration(source: &UnitSource<'_>) -> Result<Box<dyn Migration>, UnitError> {
    Ok(Box::new(SqlMigration::parse(&source.read()?)))
}

fn sql_seed(source: &UnitSource<'_>) -> Result<Box<dyn Seed>, UnitError> {
    Ok(Box::new(SqlSeed::parse(&source.read()?)))
}

fn csv_seed(source: &UnitSource<'_>) -> Result<Box<dyn Seed>, UnitError> {
    Ok(Box::new(CsvSeed::new(
        source.file.name.as_str(),
        source.file.path.clone(),
    )))
}

impl MigrationRegistry {
    /// Registry with the built-in `.sql` migration constructor
    pub fn with_defaults() -> Self {
        let mut registry = Self::new(UnitKind::Migration);
        registry.register_extension("sql", sql_migration);
        registry
    }
}

impl SeedRegistry {
    /// Registry with the built-in `.sql` and `.csv` seed constructors
    pub fn with_defaults() -> Self {
        let mut registry = Self::new(UnitKind::Seed);
        registry.register_extension("sql", sql_seed);
        registry.register_extension("csv", csv_seed);
        registry
    }
}
