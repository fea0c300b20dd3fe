//! Computed-column loader (spec.md §4.4).
//!
//! Walks an [`ExecutionPlan`] that yields one slot per row — either the
//! computed value, an embedding vector, or a captured exception — and writes
//! it into the already-existing backing column for rows addressed by their
//! full primary key.

use crate::backend::Connection;
use crate::catalog::{Column, ColumnLike};
use crate::error::StoreResult;
use crate::exec_plan::{truncate_error_message, ExecutionPlan, PlanGuard, SlotValue};
use crate::progress::LazyProgress;
use crate::sql_text::{placeholder, quote_ident};
use crate::value::Value;

use super::Store;

impl Store {
    /// Load a single column's values from `plan` (spec.md §4.4).
    ///
    /// For a computed column, an exception in a row's slot is recovered:
    /// the value column is set to NULL and `errortype`/`errormsg` record the
    /// failure (spec.md §3's value/exception channel exclusivity). For an
    /// indexed (embedding) column, a slot exception is an invariant
    /// violation — `store.py` never computes embeddings lazily with
    /// recoverable failure, so this panics rather than silently storing
    /// nothing when `config.strict_embedding_errors` is set (its only
    /// supported value today).
    pub fn load_column(
        &self,
        col: &Column,
        plan: &mut dyn ExecutionPlan,
        conn: &mut dyn Connection,
    ) -> StoreResult<usize> {
        let mut guard = PlanGuard::open(plan)?;
        let mut rows_loaded = 0usize;
        let mut progress = LazyProgress::new("loading column");
        let storage_name = self.storage_name();
        let pk_columns = self.pk_columns();
        let handles = col.handles();

        while let Some(batch) = guard.next_batch()? {
            for row in batch {
                let mut set_cols: Vec<&str> = Vec::new();
                let mut params: Vec<Value> = Vec::new();

                match &row.slots.get(0) {
                    Some(SlotValue::Value(value)) if col.is_indexed() => {
                        let idx_col = handles
                            .idx
                            .as_ref()
                            .expect("is_indexed column always allocates an idx handle");
                        set_cols.push(idx_col);
                        params.push(value.clone());
                    }
                    Some(SlotValue::Value(value)) => {
                        set_cols.push(&handles.value);
                        params.push(value.clone());
                        if let Some(errormsg) = &handles.errormsg {
                            set_cols.push(errormsg);
                            params.push(Value::Null);
                        }
                        if let Some(errortype) = &handles.errortype {
                            set_cols.push(errortype);
                            params.push(Value::Null);
                        }
                    }
                    Some(SlotValue::Exception(exc)) if col.is_indexed() => {
                        panic!(
                            "embedding computation raised for column '{}': {}",
                            col.name(),
                            exc.message
                        );
                    }
                    Some(SlotValue::Exception(exc)) => {
                        set_cols.push(&handles.value);
                        params.push(Value::Null);
                        if let Some(errormsg) = &handles.errormsg {
                            set_cols.push(errormsg);
                            params.push(Value::Text(truncate_error_message(
                                &exc.message,
                                self.config.max_error_message_bytes,
                            )));
                        }
                        if let Some(errortype) = &handles.errortype {
                            set_cols.push(errortype);
                            params.push(Value::Text(exc.type_name.clone()));
                        }
                    }
                    None => continue,
                }

                for pk_value in &row.pk {
                    params.push(pk_value.clone());
                }

                let dialect = self.dialect();
                let mut next_param = 0usize;
                let set_clause = set_cols
                    .iter()
                    .map(|c| {
                        let ph = placeholder(dialect, next_param);
                        next_param += 1;
                        format!("{} = {}", quote_ident(c), ph)
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                let where_clause = pk_columns
                    .iter()
                    .map(|c| {
                        let ph = placeholder(dialect, next_param);
                        next_param += 1;
                        format!("{} = {}", quote_ident(c), ph)
                    })
                    .collect::<Vec<_>>()
                    .join(" AND ");

                let sql = format!(
                    "UPDATE {} SET {} WHERE {}",
                    quote_ident(&storage_name),
                    set_clause,
                    where_clause
                );
                let result = conn.execute(&sql, &params)?;
                rows_loaded += result.rows_affected as usize;
                progress.tick();
            }
        }

        drop(guard);
        progress.finish();
        Ok(rows_loaded)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::backend::SqlDialect;
    use crate::catalog::{Column, ColumnType, TableVersion};
    use crate::config::StoreConfig;
    use crate::exec_plan::{Row, RowException, VecExecutionPlan};
    use crate::ids::{ColumnId, TableId};

    fn table_id(n: u128) -> TableId {
        TableId(uuid::Uuid::from_u128(n))
    }

    fn setup() -> (Rc<RefCell<TableVersion>>, Store, rusqlite::Connection) {
        let cols = vec![Column::new(ColumnId(0), "derived", ColumnType::Int).computed()];
        let tbl = Rc::new(RefCell::new(TableVersion::new_table(table_id(1), 0, cols)));
        let store = Store::new_table(tbl.clone(), SqlDialect::Sqlite, StoreConfig::default());
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch(&format!(
            "CREATE TABLE {} (rowid BIGINT, v_min BIGINT, v_max BIGINT, col_0 BIGINT, col_0_errormsg TEXT, col_0_errortype TEXT)",
            store.storage_name()
        ))
        .unwrap();
        conn.execute(
            &format!(
                "INSERT INTO {} (rowid, v_min, v_max) VALUES (1, 0, 9223372036854775807)",
                store.storage_name()
            ),
            [],
        )
        .unwrap();
        (tbl, store, conn)
    }

    #[test]
    fn successful_value_clears_error_columns() {
        let (tbl, store, conn) = setup();
        let mut sqlite_conn = crate::backends::sqlite::SqliteConnection::new(&conn);
        let tbl_ref = tbl.borrow();
        let col = tbl_ref.col_by_name("derived").unwrap();

        let mut plan = VecExecutionPlan::new(vec![vec![Row {
            pk: vec![Value::Integer(1), Value::Integer(0)],
            slots: vec![SlotValue::Value(Value::Integer(99))],
        }]]);
        let loaded = store.load_column(col, &mut plan, &mut sqlite_conn).unwrap();
        assert_eq!(loaded, 1);

        let result = sqlite_conn
            .execute(&format!("SELECT col_0, col_0_errormsg FROM {}", store.storage_name()), &[])
            .unwrap();
        assert_eq!(result.rows, vec![vec![Value::Integer(99), Value::Null]]);
    }

    #[test]
    fn exception_populates_error_channel_and_nulls_value() {
        let (tbl, store, conn) = setup();
        let mut sqlite_conn = crate::backends::sqlite::SqliteConnection::new(&conn);
        let tbl_ref = tbl.borrow();
        let col = tbl_ref.col_by_name("derived").unwrap();

        let mut plan = VecExecutionPlan::new(vec![vec![Row {
            pk: vec![Value::Integer(1), Value::Integer(0)],
            slots: vec![SlotValue::Exception(RowException::new("ValueError", "boom"))],
        }]]);
        store.load_column(col, &mut plan, &mut sqlite_conn).unwrap();

        let result = sqlite_conn
            .execute(
                &format!("SELECT col_0, col_0_errortype, col_0_errormsg FROM {}", store.storage_name()),
                &[],
            )
            .unwrap();
        assert_eq!(
            result.rows,
            vec![vec![Value::Null, Value::Text("ValueError".to_string()), Value::Text("boom".to_string())]]
        );
    }

    #[test]
    #[should_panic(expected = "embedding computation raised")]
    fn exception_on_indexed_column_is_invariant_violation() {
        let cols = vec![Column::new(ColumnId(0), "emb", ColumnType::Embedding { dims: 3 }).indexed()];
        let tbl = Rc::new(RefCell::new(TableVersion::new_table(table_id(2), 0, cols)));
        let store = Store::new_table(tbl.clone(), SqlDialect::Sqlite, StoreConfig::default());
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch(&format!(
            "CREATE TABLE {} (rowid BIGINT, v_min BIGINT, v_max BIGINT, col_0_idx BLOB)",
            store.storage_name()
        ))
        .unwrap();
        let mut sqlite_conn = crate::backends::sqlite::SqliteConnection::new(&conn);
        let tbl_ref = tbl.borrow();
        let col = tbl_ref.col_by_name("emb").unwrap();

        let mut plan = VecExecutionPlan::new(vec![vec![Row {
            pk: vec![Value::Integer(1), Value::Integer(0)],
            slots: vec![SlotValue::Exception(RowException::new("RuntimeError", "model failed"))],
        }]]);
        let _ = store.load_column(col, &mut plan, &mut sqlite_conn);
    }

    /// Records every statement handed to it instead of executing it, so the
    /// placeholder style a dialect produces can be inspected without a real
    /// PostgreSQL connection.
    struct RecordingConnection {
        dialect: SqlDialect,
        statements: Vec<String>,
    }

    impl Connection for RecordingConnection {
        fn dialect(&self) -> SqlDialect {
            self.dialect
        }

        fn execute(&mut self, sql: &str, _params: &[Value]) -> StoreResult<crate::value::QueryResult> {
            self.statements.push(sql.to_string());
            Ok(crate::value::QueryResult {
                rows: Vec::new(),
                rows_affected: 1,
            })
        }
    }

    #[test]
    fn postgres_dialect_emits_dollar_placeholders_not_question_marks() {
        let cols = vec![Column::new(ColumnId(0), "derived", ColumnType::Int).computed()];
        let tbl = Rc::new(RefCell::new(TableVersion::new_table(table_id(3), 0, cols)));
        let store = Store::new_table(tbl.clone(), SqlDialect::Postgres, StoreConfig::default());
        let tbl_ref = tbl.borrow();
        let col = tbl_ref.col_by_name("derived").unwrap();

        let mut conn = RecordingConnection {
            dialect: SqlDialect::Postgres,
            statements: Vec::new(),
        };
        let mut plan = VecExecutionPlan::new(vec![vec![Row {
            pk: vec![Value::Integer(1), Value::Integer(0)],
            slots: vec![SlotValue::Value(Value::Integer(99))],
        }]]);
        store.load_column(col, &mut plan, &mut conn).unwrap();

        let sql = &conn.statements[0];
        assert!(sql.contains('$'), "expected $-style placeholders in: {sql}");
        assert!(!sql.contains('?'), "postgres statement must not contain ?-style placeholders: {sql}");
        assert!(sql.contains("$1"));
        assert!(sql.contains("$4"), "expected the pk WHERE clause to continue numbering: {sql}");
    }
}
