//! Driver Error Classifier
//!
//! Maps a raw driver error string to one of a fixed set of diagnostic
//! categories and produces remediation guidance. Classification is a
//! prioritized list of (substring, category) pairs evaluated in order;
//! matching is case-sensitive and the first hit wins. Anything unmatched
//! falls back to `Unclassified`, which carries no specific remediation.
//!
//! Independently of the matched category, the original query is re-scanned
//! for the same dialect anti-patterns the validator checks, and matching
//! tips are appended cumulatively. `classify` is pure with respect to its
//! two string inputs; the filesystem existence report is a separate,
//! optional diagnostic.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::registry::Registry;
use crate::validate;

/// Fixed diagnostic categories, in classification priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    FromClauseSyntax,
    MissingParameterOrField,
    PermissionDenied,
    EngineInternalLimit,
    TypeMismatch,
    Unclassified,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::FromClauseSyntax => "FROM clause syntax",
            Self::MissingParameterOrField => "missing parameter or field",
            Self::PermissionDenied => "permission denied",
            Self::EngineInternalLimit => "engine internal limit",
            Self::TypeMismatch => "type mismatch",
            Self::Unclassified => "unclassified",
        };
        f.write_str(name)
    }
}

/// Guidance derived from one failed execution
#[derive(Debug, Clone)]
pub struct DiagnosticGuidance {
    pub category: ErrorCategory,
    pub remediation: Vec<String>,
}

/// Prioritized (substring, category) pairs; first match wins.
const CLASSIFIERS: &[(&str, ErrorCategory)] = &[
    ("Syntax error in FROM clause", ErrorCategory::FromClauseSyntax),
    ("Too few parameters", ErrorCategory::MissingParameterOrField),
    ("no such column", ErrorCategory::MissingParameterOrField),
    ("Permission denied", ErrorCategory::PermissionDenied),
    ("it is already opened exclusively", ErrorCategory::PermissionDenied),
    ("System resource exceeded", ErrorCategory::EngineInternalLimit),
    ("Query is too complex", ErrorCategory::EngineInternalLimit),
    ("Data type mismatch", ErrorCategory::TypeMismatch),
];

fn category_remediation(category: ErrorCategory) -> Vec<String> {
    let lines: &[&str] = match category {
        ErrorCategory::FromClauseSyntax => &[
            "The engine could not parse the FROM clause.",
            "Check that every table reference is written as [<database>].[<table>], \
             or as a bare [<table>] on the primary database.",
            "Introduce aliases with AS: FROM [db].[Table] AS [t].",
        ],
        ErrorCategory::MissingParameterOrField => &[
            "A referenced column, table, or parameter does not exist.",
            "Names are matched exactly; verify spelling against get_schema output.",
            "Names containing spaces must be bracketed: [Order Details].",
        ],
        ErrorCategory::PermissionDenied => &[
            "The database file could not be opened for this operation.",
            "Close any application holding the file exclusively and check \
             filesystem permissions on the file and its directory.",
        ],
        ErrorCategory::EngineInternalLimit => &[
            "The engine exhausted an internal resource while executing.",
            "Reduce the number of referenced tables, or add TOP N and a WHERE \
             restriction to shrink intermediate results.",
        ],
        ErrorCategory::TypeMismatch => &[
            "A comparison or expression mixes incompatible types.",
            "Align both sides with conversion functions (CInt, CDbl, CStr, CDate); \
             use #...# for dates and 1/0 for booleans.",
        ],
        ErrorCategory::Unclassified => &[],
    };
    lines.iter().map(|s| (*s).to_string()).collect()
}

/// Classify a raw driver error and derive remediation guidance.
///
/// Pure over its two inputs: the raw error text selects the category, the
/// original SQL contributes cumulative dialect tips and the cross-database
/// join warning.
#[must_use]
pub fn classify(raw_error: &str, original_sql: &str) -> DiagnosticGuidance {
    let category = CLASSIFIERS
        .iter()
        .find(|(needle, _)| raw_error.contains(needle))
        .map_or(ErrorCategory::Unclassified, |(_, category)| *category);

    let mut remediation = category_remediation(category);

    // Cumulative dialect tips: appended whenever the pattern is present,
    // regardless of which category matched.
    if validate::has_cast(original_sql) {
        remediation.push(
            "The query uses CAST(...); the engine only understands its own \
             conversion functions (CInt, CLng, CDbl, CStr, CDate)."
                .into(),
        );
    }
    if validate::has_limit(original_sql) {
        remediation
            .push("The query uses LIMIT; the engine expects TOP N after SELECT.".into());
    }
    if validate::has_plus_concat(original_sql) {
        remediation.push(
            "The query concatenates strings with '+'; the engine's operator is &.".into(),
        );
    }
    if validate::has_boolean_literal(original_sql) {
        remediation
            .push("The query compares against True/False; the engine expects 1/0.".into());
    }

    if category == ErrorCategory::FromClauseSyntax
        && validate::has_join(original_sql)
        && distinct_prefix_count(original_sql) > 1
    {
        remediation.push(
            "The query joins tables from more than one database. The external-table \
             mechanism handles this unreliably: list the tables in FROM and express \
             the join as a WHERE equi-condition, e.g. \
             WHERE [a].[Key] = [b].[Key], or UNION per-database queries."
                .into(),
        );
    }

    DiagnosticGuidance { category, remediation }
}

/// Count distinct first identifiers among `[x].[y]` tokens.
///
/// Purely syntactic: table aliases count too, since the classifier sees only
/// the query text. Over-reporting here is preferred to missing the warning.
fn distinct_prefix_count(sql: &str) -> usize {
    static RE: OnceLock<Regex> = OnceLock::new();
    let pattern =
        RE.get_or_init(|| Regex::new(r"\[([^\]]+)\]\.\[[^\]]+\]").expect("prefix pattern"));

    let mut seen: Vec<&str> = Vec::new();
    for caps in pattern.captures_iter(sql) {
        if let Some(m) = caps.get(1) {
            if !seen.contains(&m.as_str()) {
                seen.push(m.as_str());
            }
        }
    }
    seen.len()
}

/// Filesystem existence report for every registered path.
///
/// Optional diagnostic, separate from `classify`: the executor appends it to
/// failure reports so a caller can spot a moved or deleted file immediately.
#[must_use]
pub fn path_report(registry: &Registry) -> String {
    let mut lines = Vec::with_capacity(registry.len());
    for entry in registry.all() {
        let status = if entry.path.exists() { "exists" } else { "MISSING" };
        lines.push(format!("  {}: {} ({status})", entry.key, entry.path.display()));
    }
    lines.join("\n")
}
