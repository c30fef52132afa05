//! DuckDB database backend implementation

use crate::error::{DbError, DbResult};
use crate::sql_utils::{quote_literal, quote_qualified, split_qualified_name};
use crate::traits::Database;
use async_trait::async_trait;
use duckdb::Connection;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

/// DuckDB database backend
pub struct DuckDbBackend {
    conn: Mutex<Connection>,
    in_tx: AtomicBool,
}

impl DuckDbBackend {
    /// Create a new in-memory DuckDB connection
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self::with_connection(conn))
    }

    /// Create a new DuckDB connection from a file path
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path).map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self::with_connection(conn))
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if path == ":memory:" {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    fn with_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            in_tx: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))
    }

    /// Execute SQL synchronously
    fn execute_sync(&self, sql: &str) -> DbResult<usize> {
        let conn = self.lock()?;
        conn.execute(sql, []).map_err(|e| match DbError::from(e) {
            DbError::ExecutionError(msg) => DbError::ExecutionError(format!("{}: {}", msg, sql)),
            other => other,
        })
    }

    /// Execute batch SQL synchronously
    fn execute_batch_sync(&self, sql: &str) -> DbResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(sql).map_err(DbError::from)
    }

    /// Run a transaction control statement
    fn transaction_sync(&self, sql: &str) -> DbResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(sql)
            .map_err(|e| DbError::TransactionError(format!("{}: {}", sql, e)))
    }

    /// Query count synchronously
    fn query_count_sync(&self, sql: &str) -> DbResult<usize> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM ({})", sql), [], |row| {
                row.get(0)
            })
            .map_err(DbError::from)?;
        Ok(count as usize)
    }

    /// Check if relation exists synchronously
    fn relation_exists_sync(&self, name: &str) -> DbResult<bool> {
        let conn = self.lock()?;

        let (schema, table) = split_qualified_name(name);

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = ? AND table_name = ?",
                duckdb::params![schema, table],
                |row| row.get(0),
            )
            .map_err(|e| DbError::ExecutionError(e.to_string()))?;

        Ok(count > 0)
    }
}

#[async_trait]
impl Database for DuckDbBackend {
    async fn execute(&self, sql: &str) -> DbResult<usize> {
        self.execute_sync(sql)
    }

    async fn execute_batch(&self, sql: &str) -> DbResult<()> {
        self.execute_batch_sync(sql)
    }

    async fn begin(&self) -> DbResult<()> {
        if self.in_tx.load(Ordering::SeqCst) {
            return Err(DbError::TransactionError(
                "a transaction is already open".to_string(),
            ));
        }
        self.transaction_sync("BEGIN TRANSACTION")?;
        self.in_tx.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn commit(&self) -> DbResult<()> {
        if !self.in_tx.load(Ordering::SeqCst) {
            return Err(DbError::TransactionError(
                "no transaction to commit".to_string(),
            ));
        }
        // Once COMMIT has been issued the transaction is gone either way
        self.in_tx.store(false, Ordering::SeqCst);
        self.transaction_sync("COMMIT")
    }

    async fn rollback(&self) -> DbResult<()> {
        if !self.in_tx.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.in_tx.store(false, Ordering::SeqCst);
        self.transaction_sync("ROLLBACK")
    }

    fn in_transaction(&self) -> bool {
        self.in_tx.load(Ordering::SeqCst)
    }

    async fn truncate(&self, table: &str) -> DbResult<()> {
        if !self.relation_exists_sync(table)? {
            return Err(DbError::TableNotFound(table.to_string()));
        }
        self.execute_sync(&format!("DELETE FROM {}", quote_qualified(table)))?;
        Ok(())
    }

    async fn create_table_as(&self, name: &str, select: &str, replace: bool) -> DbResult<()> {
        let name = quote_qualified(name);
        let sql = if replace {
            format!("CREATE OR REPLACE TABLE {} AS {}", name, select)
        } else {
            format!("CREATE TABLE {} AS {}", name, select)
        };
        self.execute_sync(&sql)?;
        Ok(())
    }

    async fn copy_rows(&self, from: &str, to: &str) -> DbResult<usize> {
        if !self.relation_exists_sync(from)? {
            return Err(DbError::TableNotFound(from.to_string()));
        }
        self.execute_sync(&format!(
            "INSERT INTO {} SELECT * FROM {}",
            quote_qualified(to),
            quote_qualified(from)
        ))
    }

    async fn relation_exists(&self, name: &str) -> DbResult<bool> {
        self.relation_exists_sync(name)
    }

    async fn query_count(&self, sql: &str) -> DbResult<usize> {
        self.query_count_sync(sql)
    }

    async fn append_csv(&self, table: &str, path: &str) -> DbResult<()> {
        let source = format!("SELECT * FROM read_csv_auto({})", quote_literal(path));
        let sql = if self.relation_exists_sync(table)? {
            format!("INSERT INTO {} {}", quote_qualified(table), source)
        } else {
            format!("CREATE TABLE {} AS {}", quote_qualified(table), source)
        };
        self.execute_sync(&sql)
            .map_err(|e| DbError::CsvError(format!("{}: {}", path, e)))?;
        Ok(())
    }

    async fn drop_if_exists(&self, name: &str) -> DbResult<()> {
        let name = quote_qualified(name);
        // DROP VIEW fails when the name belongs to a table
        let _ = self.execute_sync(&format!("DROP VIEW IF EXISTS {}", name));
        self.execute_sync(&format!("DROP TABLE IF EXISTS {}", name))?;
        Ok(())
    }

    fn db_type(&self) -> &'static str {
        "duckdb"
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
