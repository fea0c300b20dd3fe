//! PostgreSQL backend, via the sync `postgres` crate.
//!
//! As with [`crate::backends::sqlite`], `PostgresConnection` only ever
//! executes statements against a transaction the caller already opened; it
//! never calls `BEGIN`/`COMMIT`/`ROLLBACK`.

use postgres::types::ToSql;

use crate::backend::{Connection, SqlDialect};
use crate::error::{StoreError, StoreResult};
use crate::value::{QueryResult, Value};

pub struct PostgresConnection<'a, 'b> {
    tx: &'a mut postgres::Transaction<'b>,
}

impl<'a, 'b> PostgresConnection<'a, 'b> {
    pub fn new(tx: &'a mut postgres::Transaction<'b>) -> Self {
        Self { tx }
    }
}

impl<'a, 'b> Connection for PostgresConnection<'a, 'b> {
    fn dialect(&self) -> SqlDialect {
        SqlDialect::Postgres
    }

    fn execute(&mut self, sql: &str, params: &[Value]) -> StoreResult<QueryResult> {
        tracing::debug!(sql, "postgres: executing statement");
        let boxed: Vec<Box<dyn ToSql + Sync>> = params.iter().map(to_postgres_value).collect();
        let refs: Vec<&(dyn ToSql + Sync)> = boxed.iter().map(|b| b.as_ref()).collect();

        if is_select(sql) {
            let rows = self
                .tx
                .query(sql, &refs)
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            let converted = rows.iter().map(row_to_values).collect::<Vec<_>>();
            Ok(QueryResult {
                rows: converted,
                rows_affected: 0,
            })
        } else {
            let affected = self
                .tx
                .execute(sql, &refs)
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            Ok(QueryResult {
                rows: Vec::new(),
                rows_affected: affected,
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

fn to_postgres_value(value: &Value) -> Box<dyn ToSql + Sync> {
    match value {
        Value::Null => Box::new(Option::<i64>::None),
        Value::Integer(i) => Box::new(*i),
        Value::Real(r) => Box::new(*r),
        Value::Text(s) => Box::new(s.clone()),
        Value::Blob(b) => Box::new(b.clone()),
        Value::Vector(v) => Box::new(crate::backends::sqlite::vector_to_bytes(v)),
    }
}

fn row_to_values(row: &postgres::Row) -> Vec<Value> {
    (0..row.len())
        .map(|idx| {
            if let Ok(v) = row.try_get::<_, Option<i64>>(idx) {
                return v.map(Value::Integer).unwrap_or(Value::Null);
            }
            if let Ok(v) = row.try_get::<_, Option<f64>>(idx) {
                return v.map(Value::Real).unwrap_or(Value::Null);
            }
            if let Ok(v) = row.try_get::<_, Option<String>>(idx) {
                return v.map(Value::Text).unwrap_or(Value::Null);
            }
            if let Ok(v) = row.try_get::<_, Option<Vec<u8>>>(idx) {
                return v.map(Value::Blob).unwrap_or(Value::Null);
            }
            Value::Null
        })
        .collect()
}
