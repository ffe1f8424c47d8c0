//! Error Handling Infrastructure
//!
//! This module defines all error types used throughout Conflux.
//! All errors are structured and map to stable error codes for output.
//!
//! # Error Categories
//! - `Config`: Registry construction problems (missing file, no databases)
//! - `DuplicateKey`: A database name collides with an existing registry key
//! - `UnknownDatabase`: A request named a database that is not registered
//! - `InvalidInput`: Malformed tool arguments or missing required parameters
//! - `Driver`: Errors reported by the underlying database driver
//!
//! Only `Config` and `DuplicateKey` errors may terminate the process, and
//! only at startup. Everything else is converted to result text at the
//! executor or tool boundary.

use thiserror::Error;

/// Main error type for Conflux operations
#[derive(Error, Debug)]
pub enum ConfluxError {
    /// Registry construction failed (fatal at startup)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database name collides with an existing registry key (fatal at startup)
    #[error("Duplicate database key: '{0}'")]
    DuplicateKey(String),

    /// Request named a database that is not registered
    #[error("Database '{name}' not found. Available databases: {available:?}")]
    UnknownDatabase { name: String, available: Vec<String> },

    /// Malformed tool arguments or missing required parameters
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Error reported by the underlying database driver
    #[error("Driver error: {0}")]
    Driver(String),
}

impl ConfluxError {
    /// Convert error to a stable code string suitable for programmatic
    /// handling by agents.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::DuplicateKey(_) => "DUPLICATE_KEY",
            Self::UnknownDatabase { .. } => "UNKNOWN_DATABASE",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::Driver(_) => "DRIVER_ERROR",
        }
    }

    /// Get the human-readable error message
    #[must_use]
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an unknown-database error listing the registered keys
    pub fn unknown_database(name: impl Into<String>, available: Vec<String>) -> Self {
        Self::UnknownDatabase { name: name.into(), available }
    }

    /// Create an invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create a driver error
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver(message.into())
    }
}

/// Result type alias for Conflux operations
pub type Result<T> = std::result::Result<T, ConfluxError>;
