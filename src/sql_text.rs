//! Small SQL text-building helpers.
//!
//! The store assembles DDL/DML as plain SQL strings rather than through a
//! query-builder crate — there is no SQLAlchemy-equivalent dependency in the
//! corpus, so this mirrors the `format!` + identifier-quoting style the
//! `lix_engine` teacher itself uses for dynamically-built statements (see
//! its `materialization::apply` module). Unlike that teacher code, row
//! *values* here are always passed as bind parameters through
//! [`crate::backend::Connection`], never interpolated into the SQL text —
//! only identifiers (table/column/index names, which SQL has no bind-param
//! syntax for) go through [`quote_ident`].

use crate::backend::SqlDialect;

/// Double-quote a SQL identifier, escaping embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Dialect-appropriate bind-parameter placeholder for the `index`-th
/// parameter (0-based) in a statement.
pub fn placeholder(dialect: SqlDialect, index: usize) -> String {
    match dialect {
        SqlDialect::Sqlite => "?".to_string(),
        SqlDialect::Postgres => format!("${}", index + 1),
    }
}

/// Render a comma-joined list of placeholders starting at parameter index 0.
pub fn placeholders(dialect: SqlDialect, count: usize) -> String {
    (0..count)
        .map(|i| placeholder(dialect, i))
        .collect::<Vec<_>>()
        .join(", ")
}
