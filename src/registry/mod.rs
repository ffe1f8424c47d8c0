//! Database Registry
//!
//! An ordered mapping from a short database key to a file path and a
//! human-readable description. The first entry registered is the **primary**
//! database: the one the underlying connection is physically opened against,
//! and the one unqualified table references resolve to.
//!
//! The registry is built once at startup from command-line triples and is
//! read-only for the remainder of the process. There are no mutation or
//! deletion operations after construction, so shared references are safe
//! across any number of concurrent invocations without locking.

use std::path::{Path, PathBuf};

use crate::error::{ConfluxError, Result};

/// A single registered database
#[derive(Debug, Clone)]
pub struct DatabaseEntry {
    /// Unique short key used in `[key].[table]` references
    pub key: String,

    /// Filesystem path to the database file
    pub path: PathBuf,

    /// Human-readable description shown in listings
    pub description: String,
}

/// Ordered collection of database entries; the first entry is primary
#[derive(Debug, Default)]
pub struct Registry {
    entries: Vec<DatabaseEntry>,
}

impl Registry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a database.
    ///
    /// A missing `name` yields the positional key `db_<n>` (1-based); a
    /// missing `description` yields `Database <key>`. Registration verifies
    /// that the path exists on the filesystem; a missing file is a fatal
    /// configuration error at startup, not a runtime error. This is the
    /// registry's only I/O.
    pub fn register(
        &mut self,
        path: impl Into<PathBuf>,
        name: Option<String>,
        description: Option<String>,
    ) -> Result<&DatabaseEntry> {
        let path = path.into();
        if !path.exists() {
            return Err(ConfluxError::config(format!(
                "Database file not found at {}",
                path.display()
            )));
        }

        let key = name.unwrap_or_else(|| format!("db_{}", self.entries.len() + 1));
        if self.entries.iter().any(|e| e.key == key) {
            return Err(ConfluxError::DuplicateKey(key));
        }

        let description = description.unwrap_or_else(|| format!("Database {key}"));
        self.entries.push(DatabaseEntry { key, path, description });
        Ok(self.entries.last().expect("entry just pushed"))
    }

    /// Resolve a database name to its `(key, path)` pair.
    ///
    /// `None` resolves to the primary entry. A supplied name that is not
    /// registered fails with `UnknownDatabase`, listing the available keys.
    pub fn resolve(&self, name: Option<&str>) -> Result<(&str, &Path)> {
        match name {
            None => {
                let primary = self.entries.first().ok_or_else(|| {
                    ConfluxError::config("No databases registered")
                })?;
                Ok((primary.key.as_str(), primary.path.as_path()))
            }
            Some(name) => self
                .entries
                .iter()
                .find(|e| e.key == name)
                .map(|e| (e.key.as_str(), e.path.as_path()))
                .ok_or_else(|| {
                    ConfluxError::unknown_database(
                        name,
                        self.entries.iter().map(|e| e.key.clone()).collect(),
                    )
                }),
        }
    }

    /// Key of the primary database (the first registered entry)
    #[must_use]
    pub fn primary_key(&self) -> Option<&str> {
        self.entries.first().map(|e| e.key.as_str())
    }

    /// Look up an entry by key
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&DatabaseEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    /// All entries in registration order
    #[must_use]
    pub fn all(&self) -> &[DatabaseEntry] {
        &self.entries
    }

    /// Number of registered databases
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry has no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::path::PathBuf;

    fn temp_db_file(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("conflux_registry_{name}.db"));
        File::create(&path).expect("Failed to create temp file");
        path
    }

    #[test]
    fn test_register_with_explicit_name_and_description() {
        let path = temp_db_file("explicit");
        let mut registry = Registry::new();
        let entry = registry
            .register(&path, Some("sales".into()), Some("Sales data".into()))
            .expect("register should succeed");
        assert_eq!(entry.key, "sales");
        assert_eq!(entry.description, "Sales data");
    }

    #[test]
    fn test_register_defaults() {
        let path = temp_db_file("defaults");
        let mut registry = Registry::new();
        registry.register(&path, None, None).expect("register should succeed");
        registry.register(&path, None, None).expect("register should succeed");

        let entries = registry.all();
        assert_eq!(entries[0].key, "db_1");
        assert_eq!(entries[0].description, "Database db_1");
        assert_eq!(entries[1].key, "db_2");
    }

    #[test]
    fn test_register_missing_file_is_config_error() {
        let mut registry = Registry::new();
        let result = registry.register("/nonexistent/path/to.db", None, None);
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().error_code(), "CONFIG_ERROR");
    }

    #[test]
    fn test_register_duplicate_key_rejected() {
        let path = temp_db_file("dup");
        let mut registry = Registry::new();
        registry.register(&path, Some("sales".into()), None).expect("first register");
        let result = registry.register(&path, Some("sales".into()), None);
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().error_code(), "DUPLICATE_KEY");
    }

    #[test]
    fn test_first_entry_is_primary() {
        let path = temp_db_file("primary");
        let mut registry = Registry::new();
        registry.register(&path, Some("sales".into()), None).expect("register");
        registry.register(&path, Some("orders".into()), None).expect("register");

        assert_eq!(registry.primary_key(), Some("sales"));
        let (key, _) = registry.resolve(None).expect("resolve primary");
        assert_eq!(key, "sales");
    }

    #[test]
    fn test_resolve_unknown_lists_available() {
        let path = temp_db_file("unknown");
        let mut registry = Registry::new();
        registry.register(&path, Some("sales".into()), None).expect("register");

        let err = registry.resolve(Some("staging")).unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_DATABASE");
        assert!(err.message().contains("sales"));
    }

    #[test]
    fn test_resolve_on_empty_registry_fails() {
        let registry = Registry::new();
        assert!(registry.resolve(None).is_err());
    }
}
