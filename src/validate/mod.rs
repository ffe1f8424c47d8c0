//! Query Syntax Validator
//!
//! Rule-based lint pass evaluated before any driver I/O. Two kinds of rules:
//!
//! - **Errors** reject the query at the executor boundary. The load-bearing
//!   gate is the required-prefix rule: a query must reference at least one
//!   registered database as `[key].` somewhere in its text. The remaining
//!   error rules catch constructs common SQL dialects accept but the target
//!   engine spells differently (LIMIT, CAST, ISO date literals, True/False,
//!   CASE).
//! - **Warnings** are advisory and never block execution.
//!
//! Every rule is evaluated on every call; the report lists findings in
//! declaration order so output is reproducible. Validation never executes
//! the query and is a pure function of the input string and the registry.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::registry::Registry;

/// Category of a validation finding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleCategory {
    MissingDatabasePrefix,
    UnsupportedLimit,
    UnsupportedCast,
    IsoDateLiteral,
    BooleanLiteral,
    UnsupportedCase,
    StringConcatenation,
    UnboundedScan,
    CrossDatabaseJoin,
}

impl fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MissingDatabasePrefix => "MissingDatabasePrefix",
            Self::UnsupportedLimit => "UnsupportedLimit",
            Self::UnsupportedCast => "UnsupportedCast",
            Self::IsoDateLiteral => "IsoDateLiteral",
            Self::BooleanLiteral => "BooleanLiteral",
            Self::UnsupportedCase => "UnsupportedCase",
            Self::StringConcatenation => "StringConcatenation",
            Self::UnboundedScan => "UnboundedScan",
            Self::CrossDatabaseJoin => "CrossDatabaseJoin",
        };
        f.write_str(name)
    }
}

/// One validation finding: a category plus a message
#[derive(Debug, Clone)]
pub struct Finding {
    pub category: RuleCategory,
    pub message: String,
}

/// Aggregated result of one validation pass
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub errors: Vec<Finding>,
    pub warnings: Vec<Finding>,
}

impl ValidationReport {
    /// Whether the query passed validation (warnings do not fail a query)
    #[must_use]
    pub fn passed(&self) -> bool {
        self.errors.is_empty()
    }

    /// First error in declaration order, if any
    #[must_use]
    pub fn first_error(&self) -> Option<&Finding> {
        self.errors.first()
    }
}

struct DialectPatterns {
    limit: Regex,
    cast: Regex,
    iso_date: Regex,
    boolean: Regex,
    case_expr: Regex,
    concat: Regex,
    top: Regex,
    where_clause: Regex,
    join: Regex,
}

fn patterns() -> &'static DialectPatterns {
    static PATTERNS: OnceLock<DialectPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| DialectPatterns {
        limit: Regex::new(r"(?i)\bLIMIT\s").expect("limit pattern"),
        cast: Regex::new(r"(?i)\bCAST\s*\(").expect("cast pattern"),
        iso_date: Regex::new(r"'\d{4}-\d{2}-\d{2}'").expect("iso date pattern"),
        // The dialect's own spelling; deliberately case-sensitive.
        boolean: Regex::new(r"\b(True|False)\b").expect("boolean pattern"),
        case_expr: Regex::new(r"(?i)\bCASE\s").expect("case pattern"),
        concat: Regex::new(r"'\s*\+|\+\s*'").expect("concat pattern"),
        top: Regex::new(r"(?i)\bTOP\b").expect("top pattern"),
        where_clause: Regex::new(r"(?i)\bWHERE\b").expect("where pattern"),
        join: Regex::new(r"(?i)\bJOIN\b").expect("join pattern"),
    })
}

/// Validate a SQL string against the dialect rules and the registry.
pub fn validate(sql: &str, registry: &Registry) -> ValidationReport {
    let mut report = ValidationReport::default();

    // Required-prefix rule: the query must mention at least one registered
    // database as [key]. somewhere in its text.
    if !has_registered_prefix(sql, registry) {
        let keys: Vec<&str> = registry.all().iter().map(|e| e.key.as_str()).collect();
        report.errors.push(Finding {
            category: RuleCategory::MissingDatabasePrefix,
            message: format!(
                "No registered database prefix found. Reference tables as \
                 [<database>].[<table>]; registered databases: {}",
                keys.join(", ")
            ),
        });
    }

    if has_limit(sql) {
        report.errors.push(Finding {
            category: RuleCategory::UnsupportedLimit,
            message: "LIMIT is not supported by the target dialect; \
                      use TOP N immediately after SELECT"
                .into(),
        });
    }

    if has_cast(sql) {
        report.errors.push(Finding {
            category: RuleCategory::UnsupportedCast,
            message: "CAST(...) is not supported; use the explicit conversion \
                      functions (CInt, CLng, CDbl, CStr, CDate)"
                .into(),
        });
    }

    if patterns().iso_date.is_match(sql) {
        report.errors.push(Finding {
            category: RuleCategory::IsoDateLiteral,
            message: "Quoted ISO date literals are not supported; use \
                      delimiter-bracketed date literals like #2024-01-31#"
                .into(),
        });
    }

    if has_boolean_literal(sql) {
        report.errors.push(Finding {
            category: RuleCategory::BooleanLiteral,
            message: "True/False literals are unreliable in comparisons; use 1/0".into(),
        });
    }

    if patterns().case_expr.is_match(sql) {
        report.errors.push(Finding {
            category: RuleCategory::UnsupportedCase,
            message: "CASE expressions are not supported; use the inline \
                      conditional IIf(condition, then, else)"
                .into(),
        });
    }

    // Warnings, in declaration order.
    if has_plus_concat(sql) {
        report.warnings.push(Finding {
            category: RuleCategory::StringConcatenation,
            message: "String concatenation with '+' propagates NULLs; \
                      prefer the & operator"
                .into(),
        });
    }

    if !patterns().top.is_match(sql) && !patterns().where_clause.is_match(sql) {
        report.warnings.push(Finding {
            category: RuleCategory::UnboundedScan,
            message: "Query has neither a TOP clause nor a WHERE filter; \
                      large tables will be returned in full"
                .into(),
        });
    }

    if registered_prefix_count(sql, registry) > 1 && has_join(sql) {
        report.warnings.push(Finding {
            category: RuleCategory::CrossDatabaseJoin,
            message: "JOIN across multiple registered databases is unreliable; \
                      prefer a WHERE equi-condition or a UNION of per-database \
                      queries"
                .into(),
        });
    }

    report
}

/// Whether any registered key occurs as a `[key].` prefix in the text
fn has_registered_prefix(sql: &str, registry: &Registry) -> bool {
    registry.all().iter().any(|e| sql.contains(&format!("[{}].", e.key)))
}

/// Number of distinct registered keys occurring as `[key].` prefixes
pub(crate) fn registered_prefix_count(sql: &str, registry: &Registry) -> usize {
    registry.all().iter().filter(|e| sql.contains(&format!("[{}].", e.key))).count()
}

// Shared dialect predicates. The error classifier re-scans failed queries
// with the same patterns, so these are crate-visible.

pub(crate) fn has_limit(sql: &str) -> bool {
    patterns().limit.is_match(sql)
}

pub(crate) fn has_cast(sql: &str) -> bool {
    patterns().cast.is_match(sql)
}

pub(crate) fn has_boolean_literal(sql: &str) -> bool {
    patterns().boolean.is_match(sql)
}

pub(crate) fn has_plus_concat(sql: &str) -> bool {
    patterns().concat.is_match(sql)
}

pub(crate) fn has_join(sql: &str) -> bool {
    patterns().join.is_match(sql)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;
    use std::fs::File;
    use std::path::PathBuf;

    fn temp_db_file(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("conflux_validate_{name}.db"));
        File::create(&path).expect("Failed to create temp file");
        path
    }

    fn registry() -> Registry {
        let sales = temp_db_file("sales");
        let orders = temp_db_file("orders");
        let mut registry = Registry::new();
        registry.register(&sales, Some("sales".into()), None).expect("register sales");
        registry.register(&orders, Some("orders".into()), None).expect("register orders");
        registry
    }

    fn error_categories(report: &ValidationReport) -> Vec<RuleCategory> {
        report.errors.iter().map(|f| f.category).collect()
    }

    #[test]
    fn test_missing_prefix_is_the_only_error_for_plain_sql() {
        let report = validate("SELECT * FROM Customers WHERE ID = 1", &registry());
        assert_eq!(error_categories(&report), vec![RuleCategory::MissingDatabasePrefix]);
    }

    #[test]
    fn test_prefix_rule_accepts_any_registered_key() {
        // The non-primary key alone satisfies the gate.
        let report = validate("SELECT * FROM [orders].[Orders] WHERE [ID] = 1", &registry());
        assert!(report.passed());
    }

    #[test]
    fn test_limit_recommends_top() {
        let report = validate("SELECT * FROM [sales].[Customers] LIMIT 10", &registry());
        assert!(error_categories(&report).contains(&RuleCategory::UnsupportedLimit));
        let finding = report
            .errors
            .iter()
            .find(|f| f.category == RuleCategory::UnsupportedLimit)
            .expect("limit finding");
        assert!(finding.message.contains("TOP N"));
    }

    #[test]
    fn test_limit_is_case_insensitive_and_token_bounded() {
        let report = validate("select * from [sales].[T] limit 5", &registry());
        assert!(error_categories(&report).contains(&RuleCategory::UnsupportedLimit));

        // A column merely containing the letters should not trip the rule.
        let report = validate("SELECT [RateLimit] FROM [sales].[T] WHERE [ID]=1", &registry());
        assert!(!error_categories(&report).contains(&RuleCategory::UnsupportedLimit));
    }

    #[test]
    fn test_cast_recommends_conversion_functions() {
        let report =
            validate("SELECT CAST([Age] AS INT) FROM [sales].[Customers] WHERE 1=1", &registry());
        assert!(error_categories(&report).contains(&RuleCategory::UnsupportedCast));
    }

    #[test]
    fn test_iso_date_literal_rejected() {
        let report = validate(
            "SELECT * FROM [sales].[Orders] WHERE [Placed] > '2024-01-31'",
            &registry(),
        );
        assert!(error_categories(&report).contains(&RuleCategory::IsoDateLiteral));
    }

    #[test]
    fn test_boolean_literal_recommends_numeric() {
        let report =
            validate("SELECT * FROM [sales].[Customers] WHERE [Active] = True", &registry());
        let finding = report
            .errors
            .iter()
            .find(|f| f.category == RuleCategory::BooleanLiteral)
            .expect("boolean finding");
        assert!(finding.message.contains("1/0"));
    }

    #[test]
    fn test_case_expression_recommends_iif() {
        let report = validate(
            "SELECT CASE WHEN [A]=1 THEN 'x' ELSE 'y' END FROM [sales].[T] WHERE 1=1",
            &registry(),
        );
        let finding = report
            .errors
            .iter()
            .find(|f| f.category == RuleCategory::UnsupportedCase)
            .expect("case finding");
        assert!(finding.message.contains("IIf"));
    }

    #[test]
    fn test_plus_concat_warns() {
        let report = validate(
            "SELECT [First] + ' ' FROM [sales].[Customers] WHERE 1=1",
            &registry(),
        );
        assert!(report
            .warnings
            .iter()
            .any(|f| f.category == RuleCategory::StringConcatenation));
        assert!(report.passed());
    }

    #[test]
    fn test_unbounded_scan_warns_without_top_or_where() {
        let report = validate("SELECT * FROM [sales].[Customers]", &registry());
        assert!(report.warnings.iter().any(|f| f.category == RuleCategory::UnboundedScan));

        let filtered = validate("SELECT * FROM [sales].[Customers] WHERE [ID]=1", &registry());
        assert!(!filtered.warnings.iter().any(|f| f.category == RuleCategory::UnboundedScan));

        let limited = validate("SELECT TOP 5 * FROM [sales].[Customers]", &registry());
        assert!(!limited.warnings.iter().any(|f| f.category == RuleCategory::UnboundedScan));
    }

    #[test]
    fn test_cross_database_join_warns() {
        let report = validate(
            "SELECT * FROM [sales].[Customers] INNER JOIN [orders].[Orders] \
             ON [sales].[Customers].[ID] = [orders].[Orders].[CustomerID]",
            &registry(),
        );
        let finding = report
            .warnings
            .iter()
            .find(|f| f.category == RuleCategory::CrossDatabaseJoin)
            .expect("cross-db join finding");
        assert!(finding.message.contains("WHERE"));
    }

    #[test]
    fn test_single_database_join_does_not_warn() {
        let report = validate(
            "SELECT * FROM [sales].[Customers] INNER JOIN [sales].[Orders] \
             ON [Customers].[ID] = [Orders].[CustomerID]",
            &registry(),
        );
        assert!(!report.warnings.iter().any(|f| f.category == RuleCategory::CrossDatabaseJoin));
    }

    #[test]
    fn test_all_rules_evaluated_in_declaration_order() {
        let report = validate(
            "SELECT CAST([A] AS INT) FROM Customers LIMIT 3 WHERE [B] = True",
            &registry(),
        );
        assert_eq!(
            error_categories(&report),
            vec![
                RuleCategory::MissingDatabasePrefix,
                RuleCategory::UnsupportedLimit,
                RuleCategory::UnsupportedCast,
                RuleCategory::BooleanLiteral,
            ]
        );
    }

    #[test]
    fn test_validate_is_deterministic() {
        let sql = "SELECT * FROM [sales].[Customers] LIMIT 10";
        let registry = registry();
        let a = validate(sql, &registry);
        let b = validate(sql, &registry);
        assert_eq!(error_categories(&a), error_categories(&b));
        assert_eq!(a.warnings.len(), b.warnings.len());
    }
}
