//! Cross-Database Reference Rewriter
//!
//! The underlying single-file query engine has no native concept of joining
//! across independently opened database files. This module is the text
//! transform that bridges the gap: callers write one SQL statement
//! addressing several logical databases via `[database].[table]` tokens, and
//! the rewriter turns each token into a form the engine executes against the
//! primary connection.
//!
//! Per token:
//! - primary key        -> `[table]` (bare local reference)
//! - other registered   -> `[table] IN '<path>'` (external-table qualifier)
//! - unregistered       -> left untouched (aliases like `[c].[Name]` rely on this)
//!
//! The transform is purely textual and single-pass. It has no awareness of
//! SQL grammar, so a `[x].[y]` substring inside a string literal or comment
//! is rewritten like any other. Known limitation; callers were warned.

use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::registry::Registry;

/// The `[identifier].[identifier]` bracket-pair pattern. Identifiers may
/// contain anything but `]`, which matches the engine's own quoting rule.
fn bracket_pair() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[([^\]]+)\]\.\[([^\]]+)\]").expect("bracket-pair pattern"))
}

/// Rewrite every `[db].[table]` token in `sql` against the registry.
///
/// Surrounding text is preserved byte-for-byte; only matched tokens are
/// replaced. Applying the rewrite to its own output is a no-op, because
/// neither `[table]` nor `[table] IN '<path>'` matches the trigger pattern.
#[must_use]
pub fn rewrite(sql: &str, registry: &Registry) -> String {
    bracket_pair()
        .replace_all(sql, |caps: &Captures| {
            let db = &caps[1];
            let table = &caps[2];

            if Some(db) == registry.primary_key() {
                return format!("[{table}]");
            }
            match registry.get(db) {
                Some(entry) => {
                    format!("[{table}] IN '{}'", path_literal(&entry.path.display().to_string()))
                }
                // Not a registered key: literal pass-through, deliberately
                // unverified. See the validator's prefix rule for the gate.
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Escape a path for insertion into a single-quoted SQL string literal.
/// Doubling embedded quotes is the only escaping the literal requires.
fn path_literal(path: &str) -> String {
    path.replace('\'', "''")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;
    use pretty_assertions::assert_eq;
    use std::fs::File;
    use std::path::PathBuf;

    fn temp_db_file(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("conflux_rewrite_{name}.db"));
        File::create(&path).expect("Failed to create temp file");
        path
    }

    fn two_db_registry() -> (Registry, String) {
        let sales = temp_db_file("sales");
        let orders = temp_db_file("orders");
        let mut registry = Registry::new();
        registry.register(&sales, Some("sales".into()), None).expect("register sales");
        registry.register(&orders, Some("orders".into()), None).expect("register orders");
        (registry, orders.display().to_string())
    }

    #[test]
    fn test_primary_reference_collapses_to_bare_table() {
        let (registry, _) = two_db_registry();
        let out = rewrite("SELECT * FROM [sales].[Customers]", &registry);
        assert_eq!(out, "SELECT * FROM [Customers]");
    }

    #[test]
    fn test_secondary_reference_gets_path_qualifier() {
        let (registry, orders_path) = two_db_registry();
        let out = rewrite("SELECT * FROM [orders].[Orders]", &registry);
        assert_eq!(out, format!("SELECT * FROM [Orders] IN '{orders_path}'"));
    }

    #[test]
    fn test_unregistered_prefix_left_untouched() {
        let (registry, _) = two_db_registry();
        let sql = "SELECT [c].[Name] FROM [sales].[Customers] AS [c]";
        let out = rewrite(sql, &registry);
        assert_eq!(out, "SELECT [c].[Name] FROM [Customers] AS [c]");
    }

    #[test]
    fn test_surrounding_text_preserved_byte_for_byte() {
        let (registry, orders_path) = two_db_registry();
        let sql = "SELECT [c].[Name] FROM [sales].[Customers] AS [c], [orders].[Orders] AS [o] \
                   WHERE [c].[ID]=[o].[CustomerID]";
        let expected = format!(
            "SELECT [c].[Name] FROM [Customers] AS [c], [Orders] AS [o] IN '{orders_path}' \
             WHERE [c].[ID]=[o].[CustomerID]"
        );
        assert_eq!(rewrite(sql, &registry), expected);
    }

    #[test]
    fn test_rewrite_is_idempotent_on_its_own_output() {
        let (registry, _) = two_db_registry();
        let sql = "SELECT * FROM [sales].[Customers], [orders].[Orders], [ghost].[Phantom]";
        let once = rewrite(sql, &registry);
        let twice = rewrite(&once, &registry);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_tokens_inside_string_literals_are_rewritten_too() {
        // No grammar awareness: the token in the literal is transformed like
        // any other. This pins the documented limitation.
        let (registry, _) = two_db_registry();
        let out = rewrite("SELECT '[sales].[Customers]' FROM [sales].[Customers]", &registry);
        assert_eq!(out, "SELECT '[Customers]' FROM [Customers]");
    }

    #[test]
    fn test_path_with_embedded_quote_is_doubled() {
        let dir = std::env::temp_dir().join("conflux o'brien");
        std::fs::create_dir_all(&dir).expect("Failed to create temp dir");
        let db = dir.join("archive.db");
        File::create(&db).expect("Failed to create temp file");

        let primary = temp_db_file("quoting_primary");
        let mut registry = Registry::new();
        registry.register(&primary, Some("main".into()), None).expect("register main");
        registry.register(&db, Some("archive".into()), None).expect("register archive");

        let out = rewrite("SELECT * FROM [archive].[Log]", &registry);
        let expected_path = db.display().to_string().replace('\'', "''");
        assert_eq!(out, format!("SELECT * FROM [Log] IN '{expected_path}'"));
        assert!(out.contains("''"));
    }

    #[test]
    fn test_empty_registry_passes_everything_through() {
        let registry = Registry::new();
        let sql = "SELECT * FROM [sales].[Customers]";
        assert_eq!(rewrite(sql, &registry), sql);
    }
}
