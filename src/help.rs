//! Static Help Text
//!
//! The `get_help` tool returns [`help_text`]; the validator appends
//! [`quick_reference`] to every syntax report. Both are fixed strings so the
//! guidance callers see is identical from run to run.

/// Full help text returned by the `get_help` tool
#[must_use]
pub const fn help_text() -> &'static str {
    "\
Conflux exposes one or more file databases through a single SQL surface.

Addressing
  Reference tables as [<database>].[<table>]. Database keys come from the
  server configuration; list them with the list_databases tool. References
  to the primary (first-registered) database collapse to a bare [<table>];
  references to any other registered database are rewritten to the engine's
  external-table form [<table>] IN '<file path>'. Unregistered prefixes,
  including table aliases like [c].[Name], pass through untouched.

Dialect notes
  - Row limits:      SELECT TOP 10 ... (LIMIT is not supported)
  - Conversions:     CInt, CLng, CDbl, CStr, CDate (CAST is not supported)
  - Date literals:   #2024-01-31# (quoted ISO dates are not supported)
  - Booleans:        use 1/0 in comparisons, not True/False
  - Conditionals:    IIf(condition, then, else) instead of CASE
  - Concatenation:   & joins strings; '+' propagates NULLs

Cross-database queries
  Queries may reference several databases at once, but JOIN across
  databases is unreliable in the external-table mechanism. Prefer listing
  tables in FROM with a WHERE equi-condition, or UNION per-database
  queries.

Tools
  list_databases              registered databases, paths, default marker
  get_schema                  tables, columns, keys, row counts, samples
  query_data                  execute one SQL statement
  validate_query_syntax       static checks without executing
  test_cross_db_connectivity  per-database status plus a live smoke test
  get_help                    this text"
}

/// Quick-reference block appended to validation reports
#[must_use]
pub const fn quick_reference() -> &'static str {
    "\
Quick reference:
  [<database>].[<table>]   cross-database table reference (required)
  SELECT TOP 10 ...        row limiting (not LIMIT)
  IIf(cond, a, b)          inline conditional (not CASE)
  #2024-01-31#             date literal (not '2024-01-31')
  CInt/CDbl/CStr/CDate     conversions (not CAST)
  &                        string concatenation (not +)
  1/0                      boolean comparisons (not True/False)"
}
