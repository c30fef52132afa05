//! tern-db - Data access layer for tern
//!
//! This crate provides the `Database` trait the engines execute units
//! through, and its DuckDB implementation.

pub mod duckdb;
pub mod error;
pub mod sql_utils;
pub mod traits;

pub use duckdb::DuckDbBackend;
pub use error::{DbError, DbResult};
pub use sql_utils::{quote_ident, quote_qualified};
pub use traits::Database;
