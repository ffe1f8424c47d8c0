//! File Database Driver over `rusqlite`
//!
//! The shipped implementation of the [`Driver`] seam. It opens the registry's
//! database files directly and serves both statement execution and catalog
//! introspection (via `sqlite_master` and PRAGMAs).
//!
//! # Implementation Notes
//! - Files are opened read-write without CREATE: the registry has already
//!   verified existence, and silently creating an empty database on a typo'd
//!   path would mask the configuration error.
//! - Timeouts are enforced via `busy_timeout` at open.
//! - BLOB data is Base64-encoded for JSON safety.

use rusqlite::{OpenFlags, Row};

use std::path::Path;

use crate::driver::{ColumnInfo, Connection, Driver, ForeignKeyInfo, ResultSet};
use crate::error::{ConfluxError, Result};

/// Driver over local database files
#[derive(Debug, Default)]
pub struct FileDriver;

impl Driver for FileDriver {
    fn connect(&self, path: &Path, timeout_ms: Option<u64>) -> Result<Box<dyn Connection>> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE;
        let conn = rusqlite::Connection::open_with_flags(path, flags).map_err(|e| {
            ConfluxError::driver(format!("Failed to open database {}: {e}", path.display()))
        })?;

        if let Some(timeout_ms) = timeout_ms {
            conn.busy_timeout(std::time::Duration::from_millis(timeout_ms))
                .map_err(|e| ConfluxError::driver(format!("Failed to set timeout: {e}")))?;
        }

        Ok(Box::new(FileConnection { conn }))
    }
}

/// One open file connection
pub struct FileConnection {
    conn: rusqlite::Connection,
}

impl Connection for FileConnection {
    fn execute(&self, sql: &str) -> Result<ResultSet> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| ConfluxError::driver(format!("Failed to prepare query: {e}")))?;

        let columns: Vec<String> = stmt.column_names().iter().map(|s| (*s).to_string()).collect();

        if columns.is_empty() {
            // Statement without a result set (DML/DDL); run it and report
            // the affected-row count as a single synthetic row.
            stmt.execute([])
                .map_err(|e| ConfluxError::driver(format!("Failed to execute query: {e}")))?;
            return Ok(ResultSet {
                columns: vec!["rows_affected".into()],
                rows: vec![vec![serde_json::Value::from(self.conn.changes())]],
            });
        }

        let mut rows = Vec::new();
        let mut raw = stmt
            .query([])
            .map_err(|e| ConfluxError::driver(format!("Failed to execute query: {e}")))?;
        while let Some(row) = raw
            .next()
            .map_err(|e| ConfluxError::driver(format!("Failed to fetch row: {e}")))?
        {
            rows.push(row_to_json(&columns, row)?);
        }

        Ok(ResultSet { columns, rows })
    }

    fn tables(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT name FROM sqlite_master
                 WHERE type = 'table'
                 AND name NOT LIKE 'sqlite_%'
                 ORDER BY name",
            )
            .map_err(|e| ConfluxError::driver(format!("Failed to query tables: {e}")))?;

        let result = stmt
            .query_map([], |row| row.get(0))
            .map_err(|e| ConfluxError::driver(format!("Failed to fetch table names: {e}")))?
            .collect::<std::result::Result<Vec<String>, _>>()
            .map_err(|e| ConfluxError::driver(format!("Failed to collect table names: {e}")));
        result
    }

    fn columns(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info({table})"))
            .map_err(|e| {
                ConfluxError::driver(format!("Failed to prepare table_info for {table}: {e}"))
            })?;

        let result = stmt
            .query_map([], |row| {
                Ok(ColumnInfo {
                    name: row.get::<_, String>(1)?,
                    data_type: row.get::<_, String>(2)?,
                    nullable: row.get::<_, i32>(3)? == 0, // notnull: 0 = nullable
                })
            })
            .map_err(|e| ConfluxError::driver(format!("Failed to query columns for {table}: {e}")))?
            .collect::<std::result::Result<Vec<ColumnInfo>, _>>()
            .map_err(|e| {
                ConfluxError::driver(format!("Failed to collect columns for {table}: {e}"))
            });
        result
    }

    fn primary_key(&self, table: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info({table})"))
            .map_err(|e| {
                ConfluxError::driver(format!("Failed to prepare pk query for {table}: {e}"))
            })?;

        let key_columns = stmt
            .query_map([], |row| {
                let pk: i32 = row.get(5)?; // pk ordinal: >0 means part of the key
                let name: String = row.get(1)?;
                Ok((pk, name))
            })
            .map_err(|e| {
                ConfluxError::driver(format!("Failed to query primary key for {table}: {e}"))
            })?
            .filter_map(std::result::Result::ok)
            .filter(|(pk, _)| *pk > 0)
            .map(|(_, name)| name)
            .collect();

        Ok(key_columns)
    }

    fn foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyInfo>> {
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA foreign_key_list({table})"))
            .map_err(|e| {
                ConfluxError::driver(format!(
                    "Failed to prepare foreign_key_list for {table}: {e}"
                ))
            })?;

        // Rows arrive one per column pair; group by constraint id.
        let mut grouped: Vec<(i32, ForeignKeyInfo)> = Vec::new();
        let pairs = stmt
            .query_map([], |row| {
                let id: i32 = row.get(0)?;
                let referenced_table: String = row.get(2)?;
                let from_col: String = row.get(3)?;
                let to_col: String = row.get(4)?;
                Ok((id, referenced_table, from_col, to_col))
            })
            .map_err(|e| {
                ConfluxError::driver(format!("Failed to query foreign keys for {table}: {e}"))
            })?;

        for pair in pairs {
            let (id, referenced_table, from_col, to_col) = pair.map_err(|e| {
                ConfluxError::driver(format!("Failed to fetch foreign key for {table}: {e}"))
            })?;
            match grouped.iter_mut().find(|(gid, _)| *gid == id) {
                Some((_, fk)) => {
                    fk.columns.push(from_col);
                    fk.referenced_columns.push(to_col);
                }
                None => grouped.push((
                    id,
                    ForeignKeyInfo {
                        columns: vec![from_col],
                        referenced_table,
                        referenced_columns: vec![to_col],
                    },
                )),
            }
        }

        Ok(grouped.into_iter().map(|(_, fk)| fk).collect())
    }

    fn row_count(&self, table: &str) -> Result<u64> {
        self.conn
            .query_row(&format!("SELECT COUNT(*) FROM [{table}]"), [], |row| row.get(0))
            .map_err(|e| ConfluxError::driver(format!("Failed to count rows in {table}: {e}")))
    }

    fn sample_rows(&self, table: &str, limit: usize) -> Result<ResultSet> {
        // Driver-internal statement: the engine's own dialect applies here,
        // not the caller-facing one.
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT * FROM [{table}] LIMIT {limit}"))
            .map_err(|e| ConfluxError::driver(format!("Failed to sample {table}: {e}")))?;

        let columns: Vec<String> = stmt.column_names().iter().map(|s| (*s).to_string()).collect();

        let mut rows = Vec::new();
        let mut raw = stmt
            .query([])
            .map_err(|e| ConfluxError::driver(format!("Failed to sample {table}: {e}")))?;
        while let Some(row) = raw
            .next()
            .map_err(|e| ConfluxError::driver(format!("Failed to fetch sample row: {e}")))?
        {
            rows.push(row_to_json(&columns, row)?);
        }

        Ok(ResultSet { columns, rows })
    }
}

/// Convert one row to JSON-safe values
fn row_to_json(columns: &[String], row: &Row) -> Result<Vec<serde_json::Value>> {
    let mut values = Vec::with_capacity(columns.len());
    for idx in 0..columns.len() {
        values.push(value_to_json(row, idx)?);
    }
    Ok(values)
}

/// Convert one engine value to a JSON value
fn value_to_json(row: &Row, idx: usize) -> Result<serde_json::Value> {
    use rusqlite::types::ValueRef;

    let value_ref = row
        .get_ref(idx)
        .map_err(|e| ConfluxError::driver(format!("Failed to read column {idx}: {e}")))?;

    Ok(match value_ref {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => serde_json::Value::Number(i.into()),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map_or(serde_json::Value::Null, serde_json::Value::Number), // NaN/Infinity as null
        ValueRef::Text(s) => {
            let text = std::str::from_utf8(s).map_err(|e| {
                ConfluxError::driver(format!("Invalid UTF-8 in column {idx}: {e}"))
            })?;
            serde_json::Value::String(text.to_string())
        }
        ValueRef::Blob(b) => {
            // Base64 for JSON safety
            use base64::Engine;
            let encoded = base64::engine::general_purpose::STANDARD.encode(b);
            serde_json::Value::String(encoded)
        }
    })
}
