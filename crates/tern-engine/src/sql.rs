//! Built-in units backed by `.sql` and `.csv` files
//!
//! A SQL migration file is split into sections by marker comments:
//!
//! ```sql
//! -- invokes: create_roles_table
//! -- up
//! CREATE TABLE IF NOT EXISTS users (id INT, name VARCHAR);
//! -- down
//! DROP TABLE IF EXISTS users;
//! -- alter
//! ALTER TABLE users ADD COLUMN IF NOT EXISTS email VARCHAR;
//! -- alter drop
//! ALTER TABLE users DROP COLUMN IF EXISTS legacy;
//! ```
//!
//! `alter` runs `up` before the alter section, so `up` should tolerate an
//! existing schema.
//!
//! Seed files hold their statements directly (or under `-- run`) and may
//! declare `-- table: name` so rollback can truncate before re-seeding.
//! A `.csv` seed loads its rows into the table named after the file.

use crate::context::ExecutionContext;
use crate::unit::{AlterOptions, Migration, Seed, UnitError, UnitOutcome, UnitResult};
use async_trait::async_trait;
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use std::collections::HashMap;
use std::path::PathBuf;

const MIGRATION_SECTIONS: &[&str] = &["up", "down", "alter", "alter drop"];
const SEED_SECTIONS: &[&str] = &["run"];

/// Split a SQL script into individual statements
///
/// Falls back to splitting on `;` when the script uses syntax the generic
/// dialect cannot parse.
pub fn split_statements(sql: &str) -> Vec<String> {
    match Parser::parse_sql(&GenericDialect {}, sql) {
        Ok(statements) => statements.iter().map(|s| s.to_string()).collect(),
        Err(e) => {
            log::debug!("Falling back to naive statement split: {}", e);
            sql.split(';')
                .map(str::trim)
                .filter(|chunk| !is_comment_only(chunk))
                .map(str::to_string)
                .collect()
        }
    }
}

fn is_comment_only(chunk: &str) -> bool {
    chunk
        .lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with("--"))
}

/// Sections and header directives of a SQL unit file
#[derive(Debug, Default)]
struct SqlDocument {
    sections: HashMap<&'static str, String>,
    invokes: Vec<String>,
    table: Option<String>,
}

impl SqlDocument {
    fn parse(content: &str, known: &[&'static str], initial: Option<&'static str>) -> Self {
        let mut doc = SqlDocument::default();
        let mut current = initial;

        for line in content.lines() {
            let trimmed = line.trim();
            if let Some(comment) = trimmed.strip_prefix("--") {
                let comment = comment.trim_start_matches('-').trim();
                let lowered = comment.to_lowercase();

                if let Some(section) = known.iter().find(|s| **s == lowered) {
                    current = Some(*section);
                    doc.sections.entry(*section).or_default();
                    continue;
                }
                if let Some((key, value)) = comment.split_once(':') {
                    match key.trim().to_lowercase().as_str() {
                        "invokes" => {
                            doc.invokes.extend(
                                value
                                    .split(',')
                                    .map(str::trim)
                                    .filter(|s| !s.is_empty())
                                    .map(str::to_string),
                            );
                            continue;
                        }
                        "table" => {
                            let table = value.trim();
                            if !table.is_empty() {
                                doc.table = Some(table.to_string());
                            }
                            continue;
                        }
                        _ => {}
                    }
                }
            }

            if let Some(section) = current {
                let body = doc.sections.entry(section).or_default();
                body.push_str(line);
                body.push('\n');
            }
        }

        doc
    }

    fn section(&self, name: &str) -> Option<&str> {
        self.sections.get(name).map(String::as_str)
    }
}

fn has_statements(sql: &str) -> bool {
    !split_statements(sql).is_empty()
}

/// Migration defined by a `.sql` file
#[derive(Debug, Clone, Default)]
pub struct SqlMigration {
    up: String,
    down: String,
    alter: Option<String>,
    alter_drop: Option<String>,
    invokes: Vec<String>,
}

impl SqlMigration {
    /// Parse migration file content
    pub fn parse(content: &str) -> Self {
        let doc = SqlDocument::parse(content, MIGRATION_SECTIONS, None);
        Self {
            up: doc.section("up").unwrap_or_default().to_string(),
            down: doc.section("down").unwrap_or_default().to_string(),
            alter: doc.section("alter").map(str::to_string),
            alter_drop: doc.section("alter drop").map(str::to_string),
            invokes: doc.invokes,
        }
    }

    /// Whether the file defines an alter section
    pub fn supports_alter(&self) -> bool {
        self.alter.is_some() || self.alter_drop.is_some()
    }
}

async fn run_section(ctx: &mut ExecutionContext, sql: &str, section: &str) -> UnitResult {
    if !has_statements(sql) {
        return Ok(UnitOutcome::noop(format!("no {} statements", section)));
    }
    ctx.execute_script(sql).await?;
    Ok(UnitOutcome::Applied)
}

#[async_trait]
impl Migration for SqlMigration {
    async fn up(&self, ctx: &mut ExecutionContext) -> UnitResult {
        run_section(ctx, &self.up, "up").await
    }

    async fn down(&self, ctx: &mut ExecutionContext) -> UnitResult {
        run_section(ctx, &self.down, "down").await
    }

    async fn alter(&self, ctx: &mut ExecutionContext, options: AlterOptions) -> UnitResult {
        if !self.supports_alter() {
            return Err(UnitError::Unsupported { operation: "alter" });
        }

        let mut outcome = UnitOutcome::noop("no alter statements");
        if let Some(sql) = &self.alter {
            if run_section(ctx, sql, "alter").await?.is_applied() {
                outcome = UnitOutcome::Applied;
            }
        }
        if options.drop_extra_columns {
            if let Some(sql) = &self.alter_drop {
                if run_section(ctx, sql, "alter drop").await?.is_applied() {
                    outcome = UnitOutcome::Applied;
                }
            }
        }
        Ok(outcome)
    }

    fn invokes(&self) -> Vec<String> {
        self.invokes.clone()
    }
}

/// Seed defined by a `.sql` file
#[derive(Debug, Clone, Default)]
pub struct SqlSeed {
    body: String,
    invokes: Vec<String>,
    table: Option<String>,
}

impl SqlSeed {
    /// Parse seed file content
    pub fn parse(content: &str) -> Self {
        let doc = SqlDocument::parse(content, SEED_SECTIONS, Some("run"));
        Self {
            body: doc.section("run").unwrap_or_default().to_string(),
            invokes: doc.invokes,
            table: doc.table,
        }
    }
}

#[async_trait]
impl Seed for SqlSeed {
    async fn run(&self, ctx: &mut ExecutionContext) -> UnitResult {
        run_section(ctx, &self.body, "seed").await
    }

    fn invokes(&self) -> Vec<String> {
        self.invokes.clone()
    }

    fn table(&self) -> Option<String> {
        self.table.clone()
    }
}

/// Seed that loads a `.csv` file into the table of the same name
#[derive(Debug, Clone)]
pub struct CsvSeed {
    table: String,
    path: PathBuf,
}

impl CsvSeed {
    /// Seed loading `path` into `table`
    pub fn new(table: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            table: table.into(),
            path: path.into(),
        }
    }
}

#[async_trait]
impl Seed for CsvSeed {
    async fn run(&self, ctx: &mut ExecutionContext) -> UnitResult {
        let path = self.path.display().to_string();
        ctx.append_csv(&self.table, &path).await?;
        Ok(UnitOutcome::Applied)
    }

    fn table(&self) -> Option<String> {
        Some(self.table.clone())
    }
}

#[cfg(test)]
#[path = "sql_test.rs"]
mod tests;
