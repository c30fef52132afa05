//! Unit contexts: every context has its own ledger file and unit directory.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which family of units an engine operates on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    /// Schema-change units with up/down/alter phases
    Migration,
    /// Data-seeding units with a single run phase
    Seed,
}

impl UnitKind {
    /// File name of the ledger document for this context
    pub fn ledger_file_name(self) -> &'static str {
        match self {
            UnitKind::Migration => "migrations.lock",
            UnitKind::Seed => "seeders.lock",
        }
    }

    /// Plural label used in log and terminal output
    pub fn plural(self) -> &'static str {
        match self {
            UnitKind::Migration => "migrations",
            UnitKind::Seed => "seeds",
        }
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitKind::Migration => write!(f, "migration"),
            UnitKind::Seed => write!(f, "seed"),
        }
    }
}
