//! SQLite backend, via `rusqlite`.
//!
//! `SqliteConnection` wraps a caller-owned `rusqlite::Connection` (typically
//! a `rusqlite::Transaction`, which derefs to `Connection`) — it never opens
//! or closes a transaction itself, per spec.md §5.

use rusqlite::types::{Value as SqliteValue, ValueRef};

use crate::backend::{Connection, SqlDialect};
use crate::error::{StoreError, StoreResult};
use crate::value::{QueryResult, Value};

pub struct SqliteConnection<'conn> {
    conn: &'conn rusqlite::Connection,
}

impl<'conn> SqliteConnection<'conn> {
    pub fn new(conn: &'conn rusqlite::Connection) -> Self {
        Self { conn }
    }
}

impl<'conn> Connection for SqliteConnection<'conn> {
    fn dialect(&self) -> SqlDialect {
        SqlDialect::Sqlite
    }

    fn execute(&mut self, sql: &str, params: &[Value]) -> StoreResult<QueryResult> {
        tracing::debug!(sql, "sqlite: executing statement");
        let bound: Vec<SqliteValue> = params.iter().map(to_sqlite_value).collect();

        if is_select(sql) {
            let mut stmt = self
                .conn
                .prepare(sql)
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            let col_count = stmt.column_count();
            let rows = stmt
                .query_map(rusqlite::params_from_iter(bound.iter()), |row| {
                    let mut out = Vec::with_capacity(col_count);
                    for idx in 0..col_count {
                        out.push(from_sqlite_value(row.get_ref(idx)?));
                    }
                    Ok(out)
                })
                .map_err(|e| StoreError::Backend(e.to_string()))?
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            Ok(QueryResult {
                rows,
                rows_affected: 0,
            })
        } else {
            let affected = self
                .conn
                .execute(sql, rusqlite::params_from_iter(bound.iter()))
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            Ok(QueryResult {
                rows: Vec::new(),
                rows_affected: affected as u64,
            })
        }
    }
}

fn is_select(sql: &str) -> bool {
    sql.trim_start()
        .get(..6)
        .map(|prefix| prefix.eq_ignore_ascii_case("select"))
        .unwrap_or(false)
}

fn to_sqlite_value(value: &Value) -> SqliteValue {
    match value {
        Value::Null => SqliteValue::Null,
        Value::Integer(i) => SqliteValue::Integer(*i),
        Value::Real(r) => SqliteValue::Real(*r),
        Value::Text(s) => SqliteValue::Text(s.clone()),
        Value::Blob(b) => SqliteValue::Blob(b.clone()),
        Value::Vector(v) => SqliteValue::Blob(vector_to_bytes(v)),
    }
}

fn from_sqlite_value(value_ref: ValueRef<'_>) -> Value {
    match value_ref {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(r) => Value::Real(r),
        ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Blob(b.to_vec()),
    }
}

/// Little-endian `f32` packing, used to persist embedding vectors as BLOBs.
pub fn vector_to_bytes(v: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(v.len() * 4);
    for value in v {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}
