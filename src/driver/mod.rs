//! Database Driver Seam
//!
//! The query engine behind Conflux is an external collaborator: the core
//! only needs to open a connection to a file, run a statement, and walk the
//! catalog. These traits are that boundary. They are object-safe so the
//! executor can hold a `&dyn Driver` and tests can substitute a scripted
//! driver.
//!
//! # Stateless Design
//! Connections are opened per invocation and dropped on every exit path;
//! nothing in the core caches or pools them. The optional timeout is passed
//! through to the connection open.

use serde::Serialize;

use std::path::Path;

use crate::error::Result;

pub mod sqlite;

/// Column description from catalog introspection
#[derive(Debug, Clone, Serialize)]
pub struct ColumnInfo {
    /// Column name
    pub name: String,

    /// Engine-specific data type name
    pub data_type: String,

    /// Whether the column allows NULL values
    pub nullable: bool,
}

/// Foreign key description from catalog introspection
#[derive(Debug, Clone, Serialize)]
pub struct ForeignKeyInfo {
    /// Column names in the referencing table
    pub columns: Vec<String>,

    /// Referenced table name
    pub referenced_table: String,

    /// Referenced column names
    pub referenced_columns: Vec<String>,
}

/// Rows returned by one statement execution
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResultSet {
    /// Column names, in select-list order
    pub columns: Vec<String>,

    /// Rows; each value is already JSON-safe
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl ResultSet {
    /// Number of rows in the result
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Factory for connections to file databases
pub trait Driver: Send + Sync {
    /// Open a connection to the database file at `path`.
    ///
    /// `timeout_ms`, when given, bounds how long the open (and subsequent
    /// statements, where the engine supports it) may wait on a busy file.
    fn connect(&self, path: &Path, timeout_ms: Option<u64>) -> Result<Box<dyn Connection>>;
}

/// One open connection: statement execution plus catalog introspection
pub trait Connection {
    /// Execute a statement and collect its result rows
    fn execute(&self, sql: &str) -> Result<ResultSet>;

    /// Names of user tables, sorted
    fn tables(&self) -> Result<Vec<String>>;

    /// Columns of one table
    fn columns(&self, table: &str) -> Result<Vec<ColumnInfo>>;

    /// Primary key column names of one table (empty when none declared)
    fn primary_key(&self, table: &str) -> Result<Vec<String>>;

    /// Foreign keys declared on one table
    fn foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyInfo>>;

    /// Number of rows in one table
    fn row_count(&self, table: &str) -> Result<u64>;

    /// Up to `limit` rows of one table, for schema samples
    fn sample_rows(&self, table: &str, limit: usize) -> Result<ResultSet>;
}

impl std::fmt::Debug for dyn Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Connection")
    }
}
