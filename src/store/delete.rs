//! Delete propagation & visibility predicates (spec.md §4.5, §4.6).
//!
//! Deletes are logical: `v_max` is set to the deleting transaction's
//! version, the row itself is never removed. A view never eagerly mirrors a
//! base delete into its own storage; calling `delete_rows` on the view finds
//! rows whose base was deleted in the base's *current* version and marks
//! only those. This ties view visibility to the base's live `v_max` rather
//! than a copy, so reviving the base row later revives the view row too.

use crate::backend::Connection;
use crate::error::StoreResult;
use crate::sql_text::quote_ident;

use super::{Kind, Store};

/// Visibility predicate for "alive at `version`", scoped to `alias`
/// (spec.md §3: `v_min <= version AND v_max = MAX_VERSION`).
pub fn delete_visibility_predicate(alias: &str, version_param: &str) -> String {
    format!(
        "{alias}.{} <= {version_param} AND {alias}.{} = {}",
        quote_ident("v_min"),
        quote_ident("v_max"),
        crate::ids::MAX_VERSION
    )
}

/// Predicate for "the base row was deleted exactly in its own current
/// version" (spec.md §4.5: `base.v_max = base.version`). Deliberately not
/// `base_alive_predicate` — a view row is visible here *because* its base
/// row just transitioned to deleted, not because the base row is still
/// live.
fn base_deleted_at_current_version_predicate(alias: &str, base_version: i64) -> String {
    format!("{alias}.{} = {base_version}", quote_ident("v_max"))
}

impl Store {
    /// Set `v_max = version` on every row visible at `version` that also
    /// matches `where_clause` (spec.md §4.5).
    ///
    /// For a view or component view, a row is only eligible when its base
    /// row was *deleted in the base's current version*
    /// (`base.v_max = base.version`) — propagation only follows deletes that
    /// just happened in the base's latest version, not ones from a prior
    /// version (spec.md §9 open question, left as specified). This means a
    /// view row revives on its own once the base row is live again at a
    /// later `v_min`, without any write to the view's own storage.
    pub fn delete_rows(
        &self,
        version: i64,
        where_clause: Option<&str>,
        conn: &mut dyn Connection,
    ) -> StoreResult<u64> {
        let storage_name = self.storage_name();
        let self_alias = "t";

        let sql = match &self.kind {
            Kind::Table => {
                let predicate = delete_visibility_predicate(self_alias, &version.to_string());
                let mut sql = format!(
                    "UPDATE {} AS {self_alias} SET {} = {version} WHERE {predicate}",
                    quote_ident(&storage_name),
                    quote_ident("v_max"),
                );
                if let Some(extra) = where_clause {
                    sql.push_str(&format!(" AND ({extra})"));
                }
                sql
            }
            Kind::View { base } | Kind::ComponentView { base } => {
                let base_alias = "b";
                let base_storage = base.storage_name();
                let base_version = base.tbl.borrow().version;

                let join_predicate = self
                    .rowid_columns()
                    .iter()
                    .zip(base.rowid_columns().iter())
                    .map(|(own, base_col)| {
                        format!(
                            "{self_alias}.{} = {base_alias}.{}",
                            quote_ident(own),
                            quote_ident(base_col)
                        )
                    })
                    .collect::<Vec<_>>()
                    .join(" AND ");

                let base_visibility = base_deleted_at_current_version_predicate(base_alias, base_version);
                let own_visibility = delete_visibility_predicate(self_alias, &version.to_string());

                let mut sql = format!(
                    "UPDATE {} AS {self_alias} SET {} = {version} \
                     FROM {} AS {base_alias} \
                     WHERE {join_predicate} AND {base_visibility} AND {own_visibility}",
                    quote_ident(&storage_name),
                    quote_ident("v_max"),
                    quote_ident(&base_storage),
                );
                if let Some(extra) = where_clause {
                    sql.push_str(&format!(" AND ({extra})"));
                }
                sql
            }
        };

        let result = conn.execute(&sql, &[])?;
        Ok(result.rows_affected)
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
    use crate::ids::{ColumnId, TableId, MAX_VERSION};
    use crate::value::Value;

    fn table_id(n: u128) -> TableId {
        TableId(uuid::Uuid::from_u128(n))
    }

    #[test]
    fn plain_table_delete_sets_v_max_for_live_rows_only() {
        let cols = vec![Column::new(ColumnId(0), "a", ColumnType::Int)];
        let tbl = Rc::new(RefCell::new(TableVersion::new_table(table_id(1), 0, cols)));
        let store = Store::new_table(tbl, SqlDialect::Sqlite, StoreConfig::default());

        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch(&format!(
            "CREATE TABLE {} (rowid BIGINT, v_min BIGINT, v_max BIGINT, col_0 BIGINT)",
            store.storage_name()
        ))
        .unwrap();
        conn.execute_batch(&format!(
            "INSERT INTO {} VALUES (1, 0, {}, 10), (2, 0, 5, 20)",
            store.storage_name(),
            MAX_VERSION
        ))
        .unwrap();
        let mut sqlite_conn = crate::backends::sqlite::SqliteConnection::new(&conn);

        let affected = store.delete_rows(3, None, &mut sqlite_conn).unwrap();
        assert_eq!(affected, 1);

        let result = sqlite_conn
            .execute(&format!("SELECT rowid, v_max FROM {} ORDER BY rowid", store.storage_name()), &[])
            .unwrap();
        assert_eq!(
            result.rows,
            vec![
                vec![Value::Integer(1), Value::Integer(3)],
                vec![Value::Integer(2), Value::Integer(5)],
            ]
        );
    }

    #[test]
    fn delete_with_extra_where_clause_narrows_affected_rows() {
        let cols = vec![Column::new(ColumnId(0), "a", ColumnType::Int)];
        let tbl = Rc::new(RefCell::new(TableVersion::new_table(table_id(2), 0, cols)));
        let store = Store::new_table(tbl, SqlDialect::Sqlite, StoreConfig::default());

        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch(&format!(
            "CREATE TABLE {} (rowid BIGINT, v_min BIGINT, v_max BIGINT, col_0 BIGINT)",
            store.storage_name()
        ))
        .unwrap();
        conn.execute_batch(&format!(
            "INSERT INTO {} VALUES (1, 0, {max}, 10), (2, 0, {max}, 20)",
            store.storage_name(),
            max = MAX_VERSION
        ))
        .unwrap();
        let mut sqlite_conn = crate::backends::sqlite::SqliteConnection::new(&conn);

        let affected = store.delete_rows(3, Some("col_0 = 20"), &mut sqlite_conn).unwrap();
        assert_eq!(affected, 1);
    }
}
