//! Schema Description
//!
//! Builds a description of one registered database from the driver's catalog
//! calls: tables, columns, primary and foreign keys, row counts, and
//! (optionally) a few sample rows per table. Rendered as text for humans or
//! serialized as JSON for programmatic callers.

use serde::Serialize;

use crate::driver::{ColumnInfo, Connection, Driver, ForeignKeyInfo, ResultSet};
use crate::error::Result;
use crate::registry::Registry;

/// Rows included per table when samples are requested
const SAMPLE_ROWS: usize = 3;

/// Description of one table
#[derive(Debug, Clone, Serialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
    pub primary_key: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub foreign_keys: Vec<ForeignKeyInfo>,
    pub row_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub samples: Option<ResultSet>,
}

/// Description of one registered database
#[derive(Debug, Clone, Serialize)]
pub struct DatabaseSchema {
    pub database: String,
    pub path: String,
    pub description: String,
    pub tables: Vec<TableSchema>,
}

/// Describe a registered database by walking the driver's catalog.
///
/// `database: None` describes the primary. Opens one connection for the
/// whole walk and drops it before returning.
pub fn describe(
    registry: &Registry,
    driver: &dyn Driver,
    database: Option<&str>,
    include_samples: bool,
) -> Result<DatabaseSchema> {
    let (key, path) = registry.resolve(database)?;
    let entry = registry.get(key).ok_or_else(|| {
        crate::error::ConfluxError::config(format!("Registry entry vanished for '{key}'"))
    })?;

    let conn = driver.connect(path, None)?;

    let mut tables = Vec::new();
    for table_name in conn.tables()? {
        tables.push(describe_table(conn.as_ref(), &table_name, include_samples)?);
    }

    Ok(DatabaseSchema {
        database: key.to_string(),
        path: path.display().to_string(),
        description: entry.description.clone(),
        tables,
    })
}

fn describe_table(
    conn: &dyn Connection,
    table: &str,
    include_samples: bool,
) -> Result<TableSchema> {
    let samples =
        if include_samples { Some(conn.sample_rows(table, SAMPLE_ROWS)?) } else { None };

    Ok(TableSchema {
        name: table.to_string(),
        columns: conn.columns(table)?,
        primary_key: conn.primary_key(table)?,
        foreign_keys: conn.foreign_keys(table)?,
        row_count: conn.row_count(table)?,
        samples,
    })
}

/// Render a schema as the text format
#[must_use]
pub fn render_text(schema: &DatabaseSchema) -> String {
    let mut lines = vec![
        format!("Database: {} ({})", schema.database, schema.path),
        format!("Description: {}", schema.description),
        "=".repeat(50),
    ];

    for table in &schema.tables {
        lines.push(String::new());
        lines.push(format!("Table: {} ({} rows)", table.name, table.row_count));
        for column in &table.columns {
            let nullable = if column.nullable { "NULL" } else { "NOT NULL" };
            lines.push(format!(
                "  - Column: {}, Type: {}, {nullable}",
                column.name, column.data_type
            ));
        }
        if !table.primary_key.is_empty() {
            lines.push(format!("  Primary key: {}", table.primary_key.join(", ")));
        }
        for fk in &table.foreign_keys {
            lines.push(format!(
                "  Foreign key: {} -> {}({})",
                fk.columns.join(", "),
                fk.referenced_table,
                fk.referenced_columns.join(", ")
            ));
        }
        if let Some(samples) = &table.samples {
            lines.push(format!("  Sample rows ({}):", samples.row_count()));
            for row in &samples.rows {
                let rendered: Vec<String> = row
                    .iter()
                    .map(|v| match v {
                        serde_json::Value::Null => "NULL".to_string(),
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect();
                lines.push(format!("    {}", rendered.join(" | ")));
            }
        }
    }

    lines.join("\n")
}

/// Render a schema as pretty-printed JSON
pub fn render_json(schema: &DatabaseSchema) -> Result<String> {
    serde_json::to_string_pretty(schema).map_err(|e| {
        crate::error::ConfluxError::invalid_input(format!("Failed to serialize schema: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::sqlite::FileDriver;
    use crate::registry::Registry;
    use std::path::PathBuf;

    fn create_db(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("conflux_schema_{name}.db"));
        let _ = std::fs::remove_file(&path);
        let conn = rusqlite::Connection::open(&path).expect("create db");
        conn.execute(
            "CREATE TABLE Customers (ID INTEGER PRIMARY KEY, Name TEXT NOT NULL, Email TEXT)",
            [],
        )
        .expect("create");
        conn.execute(
            "CREATE TABLE Orders (
                ID INTEGER PRIMARY KEY,
                CustomerID INTEGER,
                FOREIGN KEY (CustomerID) REFERENCES Customers(ID)
            )",
            [],
        )
        .expect("create");
        conn.execute("INSERT INTO Customers (Name, Email) VALUES ('Alice', NULL)", [])
            .expect("insert");
        path
    }

    #[test]
    fn test_describe_walks_all_tables() {
        let path = create_db("walk");
        let mut registry = Registry::new();
        registry
            .register(&path, Some("sales".into()), Some("Sales data".into()))
            .expect("register");
        let driver = FileDriver;

        let schema = describe(&registry, &driver, None, false).expect("describe");
        assert_eq!(schema.database, "sales");
        assert_eq!(schema.tables.len(), 2);

        let customers =
            schema.tables.iter().find(|t| t.name == "Customers").expect("Customers table");
        assert_eq!(customers.columns.len(), 3);
        assert_eq!(customers.primary_key, vec!["ID"]);
        assert_eq!(customers.row_count, 1);
        assert!(customers.samples.is_none());

        let orders = schema.tables.iter().find(|t| t.name == "Orders").expect("Orders table");
        assert_eq!(orders.foreign_keys.len(), 1);
        assert_eq!(orders.foreign_keys[0].referenced_table, "Customers");

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_describe_with_samples() {
        let path = create_db("samples");
        let mut registry = Registry::new();
        registry.register(&path, Some("sales".into()), None).expect("register");
        let driver = FileDriver;

        let schema = describe(&registry, &driver, None, true).expect("describe");
        let customers =
            schema.tables.iter().find(|t| t.name == "Customers").expect("Customers table");
        let samples = customers.samples.as_ref().expect("samples requested");
        assert_eq!(samples.row_count(), 1);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_text_rendering_format() {
        let path = create_db("text");
        let mut registry = Registry::new();
        registry
            .register(&path, Some("sales".into()), Some("Sales data".into()))
            .expect("register");
        let driver = FileDriver;

        let schema = describe(&registry, &driver, None, false).expect("describe");
        let text = render_text(&schema);
        assert!(text.starts_with("Database: sales ("));
        assert!(text.contains("Description: Sales data"));
        assert!(text.contains("Table: Customers (1 rows)"));
        assert!(text.contains("  - Column: Name, Type: TEXT, NOT NULL"));
        assert!(text.contains("  Primary key: ID"));
        assert!(text.contains("  Foreign key: CustomerID -> Customers(ID)"));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_json_rendering_round_trips() {
        let path = create_db("json");
        let mut registry = Registry::new();
        registry.register(&path, Some("sales".into()), None).expect("register");
        let driver = FileDriver;

        let schema = describe(&registry, &driver, None, false).expect("describe");
        let json = render_json(&schema).expect("render json");
        let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
        assert_eq!(value["database"], "sales");
        assert!(value["tables"].as_array().expect("tables array").len() == 2);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_describe_unknown_database_fails() {
        let path = create_db("unknown");
        let mut registry = Registry::new();
        registry.register(&path, Some("sales".into()), None).expect("register");
        let driver = FileDriver;

        let result = describe(&registry, &driver, Some("ghost"), false);
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().error_code(), "UNKNOWN_DATABASE");

        let _ = std::fs::remove_file(&path);
    }
}
