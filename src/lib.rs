//! Conflux - Cross-Database SQL Access Server
//!
//! Conflux exposes one or more file-based relational databases, each
//! addressable by a short name, to tool-calling clients through a fixed set
//! of named operations. The underlying single-file query engine cannot join
//! across independently opened database files; the core of this crate is the
//! text-transformation layer that lets a caller write one SQL statement
//! referencing multiple databases as `[database].[table]` and rewrites it
//! into a statement the engine can execute against the primary connection.
//!
//! # Pipeline
//! Caller submits SQL -> validator checks the dialect rules and the required
//! database prefix -> rewriter transforms `[db].[table]` tokens -> executor
//! runs the rewritten statement on the primary database -> rows are rendered
//! as text, or a failure is classified into remediation guidance.
//!
//! # Module Organization
//! - [`error`] - Error types with stable codes
//! - [`registry`] - Ordered database registry; first entry is primary
//! - [`rewrite`] - The `[db].[table]` reference rewriter
//! - [`validate`] - Rule-based syntax validator
//! - [`diagnose`] - Driver-error classifier and remediation guidance
//! - [`driver`] - Driver seam and the file-backed implementation
//! - [`executor`] - Validate -> rewrite -> execute -> report orchestration
//! - [`schema`] - Catalog-driven schema description (text or JSON)
//! - [`help`] - Static help and quick-reference text
//! - [`mcp`] - JSON-RPC 2.0 stdio server exposing the tool surface
//!
//! # Concurrency
//! Rewrite, validation, and classification are synchronous pure functions
//! over an immutable [`registry::Registry`]; concurrent invocations need no
//! coordination. Connections are opened per invocation and dropped on every
//! exit path.

pub mod diagnose;
pub mod driver;
pub mod error;
pub mod executor;
pub mod help;
pub mod mcp;
pub mod registry;
pub mod rewrite;
pub mod schema;
pub mod validate;

// Re-export commonly used types for convenience
pub use diagnose::{classify, DiagnosticGuidance, ErrorCategory};
pub use driver::{ColumnInfo, Connection, Driver, ForeignKeyInfo, ResultSet};
pub use error::{ConfluxError, Result};
pub use executor::{Executor, QueryOutcome};
pub use registry::{DatabaseEntry, Registry};
pub use rewrite::rewrite;
pub use validate::{validate, Finding, RuleCategory, ValidationReport};
