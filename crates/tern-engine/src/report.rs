//! Per-unit results collected by the engines

use crate::error::EngineError;
use serde::Serialize;

/// What happened to one unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    /// Executed and recorded as a new version
    Applied,
    /// Definition unchanged since the latest version
    Skipped,
    /// Executed but reported nothing to do; not recorded
    NoOp,
    /// Reverted and its newest version removed
    Dropped,
    /// Dry run; statements were only planned
    Planned,
    /// Restored to an older version and re-applied
    RolledBack,
    /// Already at the requested version
    AlreadyApplied,
    /// Raised an error
    Failed,
}

impl UnitStatus {
    /// Lowercase label for console output
    pub fn as_str(self) -> &'static str {
        match self {
            UnitStatus::Applied => "applied",
            UnitStatus::Skipped => "skipped",
            UnitStatus::NoOp => "no-op",
            UnitStatus::Dropped => "dropped",
            UnitStatus::Planned => "planned",
            UnitStatus::RolledBack => "rolled back",
            UnitStatus::AlreadyApplied => "already applied",
            UnitStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of processing one unit
#[derive(Debug, Clone, Serialize)]
pub struct UnitReport {
    pub name: String,
    pub status: UnitStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub statements: Vec<String>,
    #[serde(skip)]
    pub exit_code: i32,
}

impl UnitReport {
    pub fn new(name: impl Into<String>, status: UnitStatus) -> Self {
        Self {
            name: name.into(),
            status,
            version: None,
            message: None,
            code: None,
            statements: Vec::new(),
            exit_code: 0,
        }
    }

    /// Report for a unit that raised `error`
    pub fn failed(name: impl Into<String>, error: &EngineError) -> Self {
        Self {
            message: Some(error.to_string()),
            code: Some(error.code()),
            exit_code: error.exit_code(),
            ..Self::new(name, UnitStatus::Failed)
        }
    }

    pub fn with_version(mut self, version: Option<u32>) -> Self {
        self.version = version;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_statements(mut self, statements: Vec<String>) -> Self {
        self.statements = statements;
        self
    }

    /// Whether the unit changed the database
    pub fn executed(&self) -> bool {
        matches!(
            self.status,
            UnitStatus::Applied | UnitStatus::Dropped | UnitStatus::RolledBack
        )
    }
}

/// Reports of a bulk or cascading run, in processing order
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub reports: Vec<UnitReport>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, report: UnitReport) {
        self.reports.push(report);
    }

    /// Number of units with a status
    pub fn count(&self, status: UnitStatus) -> usize {
        self.reports.iter().filter(|r| r.status == status).count()
    }

    /// Failed units
    pub fn failures(&self) -> impl Iterator<Item = &UnitReport> {
        self.reports
            .iter()
            .filter(|r| r.status == UnitStatus::Failed)
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }

    /// Whether at least one unit executed or was already at its target
    pub fn any_succeeded(&self) -> bool {
        self.reports
            .iter()
            .any(|r| r.executed() || r.status == UnitStatus::AlreadyApplied)
    }

    /// Report of a unit by name
    pub fn get(&self, name: &str) -> Option<&UnitReport> {
        self.reports.iter().find(|r| r.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }
}

/// Ledger state of a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitState {
    /// Never recorded
    Pending,
    /// Definition matches the latest version
    Current,
    /// Definition differs from the latest version
    Changed,
    /// Recorded, but the unit file is gone
    Orphaned,
}

impl std::fmt::Display for UnitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            UnitState::Pending => "pending",
            UnitState::Current => "current",
            UnitState::Changed => "changed",
            UnitState::Orphaned => "orphaned",
        };
        f.write_str(label)
    }
}

/// One line of `status` output
#[derive(Debug, Clone, Serialize)]
pub struct StatusRow {
    pub name: String,
    pub state: UnitState,
    pub latest_version: Option<u32>,
    pub versions: usize,
    pub backup_missing: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts() {
        let mut summary = RunSummary::new();
        summary.push(UnitReport::new("a", UnitStatus::Applied).with_version(Some(1)));
        summary.push(UnitReport::new("b", UnitStatus::Skipped));
        summary.push(UnitReport::failed(
            "c",
            &EngineError::UnitNotFound {
                name: "c".to_string(),
            },
        ));

        assert_eq!(summary.count(UnitStatus::Applied), 1);
        assert!(summary.has_failures());
        assert!(summary.any_succeeded());
        assert_eq!(summary.get("c").unwrap().exit_code, 10);
        assert_eq!(summary.get("c").unwrap().code, Some("T001"));
    }

    #[test]
    fn test_report_serializes_snake_case() {
        let report = UnitReport::new("users", UnitStatus::RolledBack).with_version(Some(3));
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"status\":\"rolled_back\""));
        assert!(json.contains("\"version\":3"));
        assert!(!json.contains("statements"));
        assert!(!json.contains("exit_code"));
    }
}
