//! Query Executor
//!
//! Thin orchestration over the core: validate, rewrite, execute, report.
//! Per invocation the pipeline is
//!
//! `Received -> Validated | Rejected -> Rewritten -> Executed | Failed -> Reported`
//!
//! `Rejected` returns the validator's first error without any driver I/O.
//! `Failed` returns the raw driver error plus classifier guidance, the
//! original and rewritten SQL, and a path existence report. There are no
//! retries; a transient failure is surfaced once and the caller may
//! resubmit. Nothing in this module panics past its boundary: every outcome
//! becomes result text.

use crate::diagnose::{self, DiagnosticGuidance};
use crate::driver::{Driver, ResultSet};
use crate::registry::Registry;
use crate::rewrite::rewrite;
use crate::validate::{validate, ValidationReport};

/// Terminal state of one query invocation
#[derive(Debug)]
pub enum QueryOutcome {
    /// Validation produced at least one error; nothing was executed
    Rejected(ValidationReport),

    /// The rewritten statement ran against the primary database
    Executed { database: String, rewritten: String, result: ResultSet },

    /// The driver reported an error during connect or execute
    Failed {
        database: String,
        original: String,
        rewritten: String,
        error: String,
        guidance: DiagnosticGuidance,
    },
}

/// Orchestrates one rewrite/validate/execute pipeline over a shared
/// read-only registry and a driver
pub struct Executor<'a> {
    registry: &'a Registry,
    driver: &'a dyn Driver,
    timeout_ms: Option<u64>,
}

impl<'a> Executor<'a> {
    /// Create an executor over a registry and driver
    #[must_use]
    pub fn new(registry: &'a Registry, driver: &'a dyn Driver) -> Self {
        Self { registry, driver, timeout_ms: None }
    }

    /// Bound the connection open with a busy timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// Run one query through the full pipeline.
    ///
    /// Never panics and never returns an `Err`: every failure mode is a
    /// `QueryOutcome` variant carrying its own diagnostics.
    pub fn run(&self, sql: &str) -> QueryOutcome {
        let report = validate(sql, self.registry);
        if !report.passed() {
            return QueryOutcome::Rejected(report);
        }

        let rewritten = rewrite(sql, self.registry);

        let (key, path) = match self.registry.resolve(None) {
            Ok(resolved) => resolved,
            Err(e) => {
                return self.failed(String::new(), sql, &rewritten, e.message());
            }
        };
        let key = key.to_string();

        let conn = match self.driver.connect(path, self.timeout_ms) {
            Ok(conn) => conn,
            Err(e) => return self.failed(key, sql, &rewritten, e.message()),
        };

        match conn.execute(&rewritten) {
            Ok(result) => QueryOutcome::Executed { database: key, rewritten, result },
            Err(e) => self.failed(key, sql, &rewritten, e.message()),
        }
    }

    /// Run a query and render the outcome as caller-facing text
    pub fn run_to_text(&self, sql: &str) -> String {
        let outcome = self.run(sql);
        self.render(&outcome)
    }

    fn failed(
        &self,
        database: String,
        original: &str,
        rewritten: &str,
        error: String,
    ) -> QueryOutcome {
        let guidance = diagnose::classify(&error, original);
        QueryOutcome::Failed {
            database,
            original: original.to_string(),
            rewritten: rewritten.to_string(),
            error,
            guidance,
        }
    }

    /// Render an outcome as the text returned to the caller
    #[must_use]
    pub fn render(&self, outcome: &QueryOutcome) -> String {
        match outcome {
            QueryOutcome::Rejected(report) => {
                let first = report
                    .first_error()
                    .map_or_else(|| "rejected".to_string(), |f| f.message.clone());
                format!("Query rejected: {first}")
            }
            QueryOutcome::Executed { database, result, .. } => {
                let mut lines = vec![
                    format!("Query executed on database: {database}"),
                    "-".repeat(40),
                ];
                if !result.columns.is_empty() {
                    lines.push(result.columns.join(" | "));
                }
                for row in &result.rows {
                    lines.push(
                        row.iter().map(value_to_text).collect::<Vec<_>>().join(" | "),
                    );
                }
                lines.push(format!("({} rows)", result.row_count()));
                lines.join("\n")
            }
            QueryOutcome::Failed { database, original, rewritten, error, guidance } => {
                let mut lines = Vec::new();
                if database.is_empty() {
                    lines.push(format!("Error executing query: {error}"));
                } else {
                    lines.push(format!("Error executing query on database '{database}': {error}"));
                }
                lines.push(String::new());
                lines.push(format!("Diagnosis: {}", guidance.category));
                for tip in &guidance.remediation {
                    lines.push(format!("  - {tip}"));
                }
                lines.push(String::new());
                lines.push(format!("Original SQL:  {original}"));
                lines.push(format!("Rewritten SQL: {rewritten}"));
                lines.push("Paths checked:".to_string());
                lines.push(diagnose::path_report(self.registry));
                lines.join("\n")
            }
        }
    }
}

/// Render one result value for the text output
fn value_to_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "NULL".to_string(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::sqlite::FileDriver;
    use crate::registry::Registry;
    use std::path::PathBuf;

    fn create_db(name: &str, setup: &[&str]) -> PathBuf {
        let path = std::env::temp_dir().join(format!("conflux_executor_{name}.db"));
        let _ = std::fs::remove_file(&path);
        let conn = rusqlite::Connection::open(&path).expect("create db");
        for sql in setup {
            conn.execute(sql, []).expect("setup");
        }
        path
    }

    fn sales_registry(name: &str) -> (Registry, PathBuf) {
        let path = create_db(
            name,
            &[
                "CREATE TABLE Customers (ID INTEGER PRIMARY KEY, Name TEXT)",
                "INSERT INTO Customers (Name) VALUES ('Alice')",
                "INSERT INTO Customers (Name) VALUES ('Bob')",
            ],
        );
        let mut registry = Registry::new();
        registry.register(&path, Some("sales".into()), None).expect("register");
        (registry, path)
    }

    #[test]
    fn test_rejected_query_never_reaches_driver() {
        let (registry, path) = sales_registry("rejected");
        let driver = FileDriver;
        let executor = Executor::new(&registry, &driver);

        let text = executor.run_to_text("SELECT * FROM Customers");
        assert!(text.starts_with("Query rejected:"));
        assert!(text.contains("[<database>].[<table>]"));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_executed_query_prefixed_with_database_key() {
        let (registry, path) = sales_registry("executed");
        let driver = FileDriver;
        let executor = Executor::new(&registry, &driver);

        let text = executor.run_to_text("SELECT [Name] FROM [sales].[Customers] WHERE [ID] = 1");
        assert!(text.starts_with("Query executed on database: sales"));
        assert!(text.contains("Alice"));
        assert!(text.contains("(1 rows)"));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_failed_query_reports_both_sql_forms_and_paths() {
        let (registry, path) = sales_registry("failed");
        let driver = FileDriver;
        let executor = Executor::new(&registry, &driver);

        let original = "SELECT [Nope] FROM [sales].[Missing] WHERE [ID] = 1";
        let outcome = executor.run(original);
        assert!(matches!(outcome, QueryOutcome::Failed { .. }));

        let text = executor.render(&outcome);
        assert!(text.contains("Original SQL:"));
        assert!(text.contains(original));
        assert!(text.contains("Rewritten SQL:"));
        assert!(text.contains("SELECT [Nope] FROM [Missing]"));
        assert!(text.contains("Paths checked:"));
        assert!(text.contains("sales"));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_run_never_panics_on_empty_registry() {
        let registry = Registry::new();
        let driver = FileDriver;
        let executor = Executor::new(&registry, &driver);

        // Empty registry: the prefix rule rejects before any resolution.
        let outcome = executor.run("SELECT 1");
        assert!(matches!(outcome, QueryOutcome::Rejected(_)));
    }
}
