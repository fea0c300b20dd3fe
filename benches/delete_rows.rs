//! Delete/visibility-engine microbenchmarks.

use std::cell::RefCell;
use std::rc::Rc;

use catalog_store::{
    Column, ColumnRowBuilder, ColumnType, Row, SlotValue, SqlDialect, SqliteConnection, Store,
    StoreConfig, TableId, TableVersion, VecExecutionPlan, Value,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

fn populated_store(n: u64) -> (Rc<RefCell<TableVersion>>, Store, rusqlite::Connection) {
    let cols = vec![Column::new(catalog_store::ColumnId(0), "a", ColumnType::Int)];
    let tbl = Rc::new(RefCell::new(TableVersion::new_table(
        TableId(uuid::Uuid::from_u128(1)),
        0,
        cols,
    )));
    let store = Store::new_table(tbl.clone(), SqlDialect::Sqlite, StoreConfig::default());
    let conn = rusqlite::Connection::open_in_memory().unwrap();
    {
        let mut sqlite_conn = SqliteConnection::new(&conn);
        store.create(&mut sqlite_conn).unwrap();

        let rows: Vec<Row> = (0..n)
            .map(|i| Row {
                pk: vec![Value::Integer(i as i64), Value::Integer(0)],
                slots: vec![SlotValue::Value(Value::Integer(i as i64))],
            })
            .collect();
        let mut plan = VecExecutionPlan::new(vec![rows]);
        let tbl_ref = tbl.borrow();
        let builder = ColumnRowBuilder::new(&tbl_ref.cols, 65536);
        store
            .insert_rows(&mut plan, &builder, &mut sqlite_conn, None)
            .unwrap();
    }
    (tbl, store, conn)
}

fn bench_delete_rows(c: &mut Criterion) {
    let mut group = c.benchmark_group("delete_rows");

    for count in [100u64, 1_000, 10_000] {
        group.throughput(Throughput::Elements(count));
        group.bench_with_input(BenchmarkId::new("half_of_table", count), &count, |b, &n| {
            b.iter(|| {
                let (_tbl, store, conn) = populated_store(n);
                let mut sqlite_conn = SqliteConnection::new(&conn);
                black_box(
                    store
                        .delete_rows(1, Some("rowid % 2 = 0"), &mut sqlite_conn)
                        .unwrap(),
                );
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_delete_rows);
criterion_main!(benches);
