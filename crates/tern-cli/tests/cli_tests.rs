//! End-to-end tests for the `tern` binary
//!
//! Each test builds a throwaway project with a file-backed DuckDB database
//! so state survives between invocations.

use serde_json::Value;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;
use tern_core::Ledger;

/// Path to the compiled tern binary
fn tern_bin() -> String {
    env!("CARGO_BIN_EXE_tern").to_string()
}

struct TestProject {
    dir: TempDir,
}

impl TestProject {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("tern.yml"),
            "database:\n  path: test.duckdb\npacing:\n  phase_delay_ms: 0\n  unit_delay_ms: 0\n",
        )
        .unwrap();
        fs::create_dir_all(dir.path().join("database/migrations")).unwrap();
        fs::create_dir_all(dir.path().join("database/seeds")).unwrap();
        Self { dir }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn write_migration(&self, file: &str, content: &str) {
        fs::write(self.root().join("database/migrations").join(file), content).unwrap();
    }

    fn write_seed(&self, file: &str, content: &str) {
        fs::write(self.root().join("database/seeds").join(file), content).unwrap();
    }

    /// Run tern in the project; returns (stdout, stderr, exit code)
    fn run(&self, args: &[&str]) -> (String, String, i32) {
        let output = Command::new(tern_bin())
            .arg("--project-dir")
            .arg(self.root())
            .args(args)
            .env("RUST_LOG", "warn")
            .output()
            .unwrap_or_else(|e| panic!("Failed to execute tern with args {:?}: {}", args, e));
        (
            String::from_utf8_lossy(&output.stdout).to_string(),
            String::from_utf8_lossy(&output.stderr).to_string(),
            output.status.code().unwrap_or(-1),
        )
    }

    fn run_json(&self, args: &[&str]) -> (Value, i32) {
        let mut full = vec!["--output", "json"];
        full.extend_from_slice(args);
        let (stdout, stderr, code) = self.run(&full);
        let value = serde_json::from_str(&stdout)
            .unwrap_or_else(|e| panic!("invalid JSON ({}): {}\nstderr: {}", e, stdout, stderr));
        (value, code)
    }

    fn migrations_ledger(&self) -> Ledger {
        Ledger::load(&self.root().join("database/backup/migrations.lock")).unwrap()
    }
}

const USER_TABLE_V1: &str = "-- up\nCREATE TABLE IF NOT EXISTS users (id INT);\n-- down\nDROP TABLE IF EXISTS users;\n";
const USER_TABLE_V2: &str = "-- up\nCREATE TABLE IF NOT EXISTS users (id INT, name VARCHAR);\n-- down\nDROP TABLE IF EXISTS users;\n";

#[test]
fn test_migrate_records_and_skips() {
    let p = TestProject::new();
    p.write_migration("UserTable.sql", USER_TABLE_V1);

    let (json, code) = p.run_json(&["migrate"]);
    assert_eq!(code, 0);
    assert_eq!(json["reports"][0]["name"], "UserTable");
    assert_eq!(json["reports"][0]["status"], "applied");
    assert_eq!(json["reports"][0]["version"], 1);

    let (json, code) = p.run_json(&["migrate"]);
    assert_eq!(code, 0);
    assert_eq!(json["reports"][0]["status"], "skipped");

    let ledger = p.migrations_ledger();
    let entry = ledger.get("UserTable").unwrap();
    assert_eq!(entry.latest_version, 1);
    assert_eq!(entry.namespace, "App\\Database\\Migrations\\UserTable");
}

#[test]
fn test_text_output() {
    let p = TestProject::new();
    p.write_migration("UserTable.sql", USER_TABLE_V1);

    let (stdout, _, code) = p.run(&["migrate", "UserTable"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("✓ UserTable applied (version 1)"), "{}", stdout);
    assert!(stdout.contains("1 executed"), "{}", stdout);
}

#[test]
fn test_unknown_unit_exit_code() {
    let p = TestProject::new();
    let (stdout, stderr, code) = p.run(&["migrate", "Missing"]);
    assert_eq!(code, 10);
    assert!(stdout.is_empty());
    assert!(stderr.contains("[T001] Unit not found: Missing"), "{}", stderr);
}

#[test]
fn test_bulk_failure_exit_code() {
    let p = TestProject::new();
    p.write_migration("AGood.sql", USER_TABLE_V1);
    p.write_migration("BBad.sql", "-- up\nINSERT INTO nowhere VALUES (1);\n");

    let (json, code) = p.run_json(&["migrate"]);
    assert_eq!(code, 4);
    assert_eq!(json["reports"][0]["status"], "applied");
    assert_eq!(json["reports"][1]["status"], "failed");
    assert_eq!(json["reports"][1]["code"], "T010");
    assert!(p.migrations_ledger().get("BBad").is_none());
}

#[test]
fn test_rollback_rewrites_history() {
    let p = TestProject::new();
    p.write_migration("UserTable.sql", USER_TABLE_V1);
    p.run_json(&["migrate"]);
    p.write_migration("UserTable.sql", USER_TABLE_V2);
    p.run_json(&["migrate"]);

    let (json, code) = p.run_json(&["rollback", "UserTable", "--to", "1"]);
    assert_eq!(code, 0, "{}", json);
    assert_eq!(json["reports"][0]["status"], "rolled_back");

    let ledger = p.migrations_ledger();
    let entry = ledger.get("UserTable").unwrap();
    assert_eq!(entry.latest_version, 3);
    assert_eq!(entry.last_version, 1);
    assert_eq!(entry.metadata.len(), 1);

    let live = fs::read_to_string(p.root().join("database/migrations/UserTable.sql")).unwrap();
    assert_eq!(live, USER_TABLE_V1);
}

#[test]
fn test_rollback_errors() {
    let p = TestProject::new();
    p.write_migration("UserTable.sql", USER_TABLE_V1);

    let (_, stderr, code) = p.run(&["rollback", "UserTable", "--to", "1"]);
    assert_eq!(code, 12);
    assert!(stderr.contains("[T003]"), "{}", stderr);

    p.run_json(&["migrate"]);
    let (_, _, code) = p.run(&["rollback", "UserTable", "--to", "1"]);
    assert_eq!(code, 14);
    let (_, _, code) = p.run(&["rollback", "UserTable", "--to", "7"]);
    assert_eq!(code, 15);
}

#[test]
fn test_alter_dry_run_lists_statements() {
    let p = TestProject::new();
    p.write_migration(
        "UserTable.sql",
        "-- up\nCREATE TABLE IF NOT EXISTS users (id INT);\n-- down\nDROP TABLE IF EXISTS users;\n-- alter\nALTER TABLE users ADD COLUMN email VARCHAR;\n",
    );
    p.run_json(&["migrate"]);

    let (json, code) = p.run_json(&["alter", "UserTable", "--dry-run"]);
    assert_eq!(code, 0);
    assert_eq!(json["reports"][0]["status"], "planned");
    let statements = json["reports"][0]["statements"].as_array().unwrap();
    assert!(statements
        .iter()
        .any(|s| s.as_str().unwrap().contains("ADD COLUMN email")));
    assert_eq!(p.migrations_ledger().get("UserTable").unwrap().latest_version, 1);
}

#[test]
fn test_drop_removes_newest_version() {
    let p = TestProject::new();
    p.write_migration("UserTable.sql", USER_TABLE_V1);
    p.run_json(&["migrate"]);

    let (json, code) = p.run_json(&["drop", "UserTable"]);
    assert_eq!(code, 0);
    assert_eq!(json["reports"][0]["status"], "dropped");
    assert!(p.migrations_ledger().get("UserTable").is_none());
}

#[test]
fn test_seed_run_and_safe_rollback() {
    let p = TestProject::new();
    p.write_migration(
        "UserTable.sql",
        "-- up\nCREATE TABLE IF NOT EXISTS users (id INT, name VARCHAR);\n-- down\nDROP TABLE IF EXISTS users;\n",
    );
    p.run_json(&["migrate"]);

    p.write_seed(
        "UserSeeder.sql",
        "-- table: users\nINSERT INTO users VALUES (1, 'ada');\n",
    );
    let (json, code) = p.run_json(&["seed", "run"]);
    assert_eq!(code, 0);
    assert_eq!(json["reports"][0]["status"], "applied");

    p.write_seed(
        "UserSeeder.sql",
        "-- table: users\nINSERT INTO users VALUES (2, 'grace');\n",
    );
    p.run_json(&["seed", "run", "UserSeeder"]);

    let (json, code) = p.run_json(&[
        "seed",
        "rollback",
        "UserSeeder",
        "--to",
        "1",
        "--truncate",
        "safe",
    ]);
    assert_eq!(code, 0, "{}", json);
    assert_eq!(json["reports"][0]["version"], 3);
    assert!(p.root().join("database/backup/seeders.lock").is_file());
}

#[test]
fn test_restore_table_without_copy_fails() {
    let p = TestProject::new();
    let (_, stderr, code) = p.run(&["seed", "restore-table", "users"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("users_tern_backup"), "{}", stderr);
}

#[test]
fn test_clear_lock_and_status() {
    let p = TestProject::new();
    p.write_migration("UserTable.sql", USER_TABLE_V1);
    p.write_migration("RoleTable.sql", "-- up\nCREATE TABLE IF NOT EXISTS roles (id INT);\n-- down\nDROP TABLE IF EXISTS roles;\n");
    p.run_json(&["migrate", "UserTable"]);

    let (json, code) = p.run_json(&["status", "migrations"]);
    assert_eq!(code, 0);
    let rows = json["migrations"].as_array().unwrap();
    let state_of = |name: &str| {
        rows.iter()
            .find(|r| r["name"] == name)
            .map(|r| r["state"].as_str().unwrap().to_string())
    };
    assert_eq!(state_of("UserTable").as_deref(), Some("current"));
    assert_eq!(state_of("RoleTable").as_deref(), Some("pending"));
    assert!(json.get("seeds").is_none());

    let (json, code) = p.run_json(&["clear-lock", "migrations"]);
    assert_eq!(code, 0);
    assert_eq!(json["removed"], 1);
    assert!(p.migrations_ledger().is_empty());
}

#[test]
fn test_missing_config() {
    let dir = TempDir::new().unwrap();
    let output = Command::new(tern_bin())
        .arg("--project-dir")
        .arg(dir.path())
        .arg("status")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to load configuration"), "{}", stderr);
}
