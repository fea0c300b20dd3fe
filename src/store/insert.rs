//! Insert pipeline (spec.md §4.3).

use std::collections::BTreeSet;

use crate::backend::Connection;
use crate::error::StoreResult;
use crate::exec_plan::{ExecutionPlan, PlanGuard, RowBuilder};
use crate::ids::{ColumnId, MAX_VERSION};
use crate::progress::LazyProgress;
use crate::sql_text::quote_ident;
use crate::value::Value;

use super::Store;

impl Store {
    /// Pull rows from `plan`, write them in sub-batches of
    /// `config.batch_size`, and return `(num_rows, num_excs, cols_with_excs)`
    /// (spec.md §4.3): `num_rows` is the count of rows consumed from the
    /// plan, `num_excs` is the total count of per-slot exceptions across all
    /// rows (each slot error counts once, spec.md §4.3/§7; `store.py`'s
    /// `insert_rows` does `num_excs += num_row_exc`, not a per-row tally).
    ///
    /// `v_min_override` pins every inserted row's `v_min` to a fixed version
    /// rather than the builder-supplied primary key slot — used when
    /// backfilling rows created before the table existed (spec.md §4.3).
    pub fn insert_rows(
        &self,
        plan: &mut dyn ExecutionPlan,
        builder: &dyn RowBuilder,
        conn: &mut dyn Connection,
        v_min_override: Option<i64>,
    ) -> StoreResult<(usize, usize, BTreeSet<ColumnId>)> {
        let mut guard = PlanGuard::open(plan)?;
        let mut num_rows = 0usize;
        let mut num_excs = 0usize;
        let mut cols_with_excs = BTreeSet::new();
        let mut progress = LazyProgress::new("inserting rows");

        let storage_name = self.storage_name();
        let pk_columns = self.pk_columns();

        while let Some(batch) = guard.next_batch()? {
            for sub_batch in batch.chunks(self.config.batch_size.max(1)) {
                let mut column_order: Option<Vec<String>> = None;
                let mut all_values: Vec<Vec<Value>> = Vec::with_capacity(sub_batch.len());

                for row in sub_batch {
                    let mut per_row_excs = BTreeSet::new();
                    let (mut table_row, row_num_excs) = builder.create_table_row(row, &mut per_row_excs);
                    cols_with_excs.extend(per_row_excs);
                    num_excs += row_num_excs;
                    num_rows += 1;

                    for (i, pk_col) in pk_columns.iter().enumerate() {
                        let value = if pk_col == "v_min" {
                            Value::Integer(v_min_override.unwrap_or_else(|| pk_integer(&row.pk, i)))
                        } else {
                            row.pk.get(i).cloned().unwrap_or(Value::Null)
                        };
                        table_row.insert(pk_col.clone(), value);
                    }
                    table_row.insert("v_max".to_string(), Value::Integer(MAX_VERSION));

                    let order = column_order.get_or_insert_with(|| {
                        let mut cols: Vec<String> = table_row.keys().cloned().collect();
                        cols.sort();
                        cols
                    });
                    all_values.push(order.iter().map(|c| table_row.remove(c).unwrap_or(Value::Null)).collect());
                    progress.tick();
                }

                let Some(columns) = column_order else { continue };
                if all_values.is_empty() {
                    continue;
                }

                let col_list = columns.iter().map(|c| quote_ident(c)).collect::<Vec<_>>().join(", ");
                let mut flat_params = Vec::with_capacity(all_values.len() * columns.len());
                let mut value_tuples = Vec::with_capacity(all_values.len());
                let mut next_param = 0usize;
                for row_values in all_values.iter() {
                    let ph = placeholders_from(self.dialect, next_param, row_values.len());
                    next_param += row_values.len();
                    value_tuples.push(format!("({ph})"));
                    flat_params.extend(row_values.iter().cloned());
                }

                let sql = format!(
                    "INSERT INTO {} ({}) VALUES {}",
                    quote_ident(&storage_name),
                    col_list,
                    value_tuples.join(", ")
                );
                conn.execute(&sql, &flat_params)?;
            }
        }

        drop(guard);
        progress.finish();
        Ok((num_rows, num_excs, cols_with_excs))
    }
}

fn pk_integer(pk: &[Value], idx: usize) -> i64 {
    match pk.get(idx) {
        Some(Value::Integer(i)) => *i,
        _ => panic!("primary key slot {idx} is not an integer"),
    }
}

fn placeholders_from(dialect: crate::backend::SqlDialect, start: usize, count: usize) -> String {
    (0..count)
        .map(|i| crate::sql_text::placeholder(dialect, start + i))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::backend::SqlDialect;
    use crate::catalog::{Column, ColumnType, TableVersion};
    use crate::config::StoreConfig;
    use crate::exec_plan::{ColumnRowBuilder, Row, SlotValue, VecExecutionPlan};

    fn table_id(n: u128) -> crate::ids::TableId {
        crate::ids::TableId(uuid::Uuid::from_u128(n))
    }

    #[test]
    fn insert_rows_writes_one_statement_per_sub_batch() {
        let cols = vec![Column::new(ColumnId(0), "a", ColumnType::Int)];
        let tbl = Rc::new(RefCell::new(TableVersion::new_table(table_id(1), 0, cols)));
        let store = Store::new_table(tbl.clone(), SqlDialect::Sqlite, StoreConfig::default());

        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch(&format!(
            "CREATE TABLE {} (rowid BIGINT, v_min BIGINT, v_max BIGINT, col_0 BIGINT)",
            store.storage_name()
        ))
        .unwrap();
        let mut sqlite_conn = crate::backends::sqlite::SqliteConnection::new(&conn);

        let rows = vec![
            Row {
                pk: vec![Value::Integer(1), Value::Integer(0)],
                slots: vec![SlotValue::Value(Value::Integer(42))],
            },
            Row {
                pk: vec![Value::Integer(2), Value::Integer(0)],
                slots: vec![SlotValue::Value(Value::Integer(43))],
            },
        ];
        let mut plan = VecExecutionPlan::new(vec![rows]);
        let tbl_ref = tbl.borrow();
        let builder = ColumnRowBuilder::new(&tbl_ref.cols, 65536);

        let (inserted, num_excs, cols_with_excs) = store
            .insert_rows(&mut plan, &builder, &mut sqlite_conn, None)
            .unwrap();
        assert_eq!(inserted, 2);
        assert_eq!(num_excs, 0);
        assert!(cols_with_excs.is_empty());
    }

    #[test]
    fn insert_rows_counts_every_failing_slot_not_every_failing_row() {
        let cols = vec![
            Column::new(ColumnId(0), "a", ColumnType::Int).computed(),
            Column::new(ColumnId(1), "b", ColumnType::Int).computed(),
        ];
        let tbl = Rc::new(RefCell::new(TableVersion::new_table(table_id(3), 0, cols)));
        let store = Store::new_table(tbl.clone(), SqlDialect::Sqlite, StoreConfig::default());

        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch(&format!(
            "CREATE TABLE {} (rowid BIGINT, v_min BIGINT, v_max BIGINT, \
             col_0 BIGINT, col_0_errormsg TEXT, col_0_errortype TEXT, \
             col_1 BIGINT, col_1_errormsg TEXT, col_1_errortype TEXT)",
            store.storage_name()
        ))
        .unwrap();
        let mut sqlite_conn = crate::backends::sqlite::SqliteConnection::new(&conn);

        use crate::exec_plan::RowException;
        let rows = vec![
            Row {
                pk: vec![Value::Integer(1), Value::Integer(0)],
                slots: vec![
                    SlotValue::Exception(RowException::new("ValueError", "bad a")),
                    SlotValue::Exception(RowException::new("ValueError", "bad b")),
                ],
            },
            Row {
                pk: vec![Value::Integer(2), Value::Integer(0)],
                slots: vec![
                    SlotValue::Value(Value::Integer(1)),
                    SlotValue::Value(Value::Integer(2)),
                ],
            },
        ];
        let mut plan = VecExecutionPlan::new(vec![rows]);
        let tbl_ref = tbl.borrow();
        let builder = ColumnRowBuilder::new(&tbl_ref.cols, 65536);

        let (inserted, num_excs, cols_with_excs) = store
            .insert_rows(&mut plan, &builder, &mut sqlite_conn, None)
            .unwrap();
        assert_eq!(inserted, 2);
        // Both slots in row 1 failed: two exceptions, not one row.
        assert_eq!(num_excs, 2);
        assert_eq!(cols_with_excs, [ColumnId(0), ColumnId(1)].into_iter().collect());
    }

    #[test]
    fn insert_rows_honors_v_min_override() {
        let cols = vec![Column::new(ColumnId(0), "a", ColumnType::Int)];
        let tbl = Rc::new(RefCell::new(TableVersion::new_table(table_id(2), 0, cols)));
        let store = Store::new_table(tbl.clone(), SqlDialect::Sqlite, StoreConfig::default());

        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch(&format!(
            "CREATE TABLE {} (rowid BIGINT, v_min BIGINT, v_max BIGINT, col_0 BIGINT)",
            store.storage_name()
        ))
        .unwrap();
        let mut sqlite_conn = crate::backends::sqlite::SqliteConnection::new(&conn);

        let rows = vec![Row {
            pk: vec![Value::Integer(1), Value::Integer(0)],
            slots: vec![SlotValue::Value(Value::Integer(42))],
        }];
        let mut plan = VecExecutionPlan::new(vec![rows]);
        let tbl_ref = tbl.borrow();
        let builder = ColumnRowBuilder::new(&tbl_ref.cols, 65536);

        store
            .insert_rows(&mut plan, &builder, &mut sqlite_conn, Some(7))
            .unwrap();

        let result = sqlite_conn
            .execute(&format!("SELECT v_min FROM {}", store.storage_name()), &[])
            .unwrap();
        assert_eq!(result.rows, vec![vec![Value::Integer(7)]]);
    }
}
