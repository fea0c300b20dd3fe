//! Schema constants & identifier derivation (spec.md §4.1, §6.4).
//!
//! All naming is deterministic and injective over `(table_id, column_id)`
//! pairs within one process: the column id is unique within its table, and
//! each derived name reserves a suffix (`_errormsg`, `_errortype`, `_idx`)
//! that user columns may not claim — enforcement of that reservation is the
//! catalog's job, not the store's.

use uuid::Uuid;

/// Sentinel meaning "still live" for `v_max` (spec.md §6.4: `2^63 - 1`).
pub const MAX_VERSION: i64 = i64::MAX;

/// Opaque table identifier (spec.md §3: "identified by a 128-bit id").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableId(pub Uuid);

impl TableId {
    /// 32-char lowercase hex, no hyphens (spec.md §6.4).
    pub fn hex(&self) -> String {
        self.0.simple().to_string()
    }
}

/// Small integer column identifier (spec.md §3: "identified by a small
/// integer id").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnId(pub i32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Table,
    View,
    ComponentView,
}

/// Backing relation name: `tbl_<hex>` for a plain table, `view_<hex>` for a
/// view or component view (spec.md §3, §4.1).
pub fn table_storage_name(id: TableId, kind: TableKind) -> String {
    match kind {
        TableKind::Table => format!("tbl_{}", id.hex()),
        TableKind::View | TableKind::ComponentView => format!("view_{}", id.hex()),
    }
}

pub fn column_storage_name(col_id: ColumnId) -> String {
    format!("col_{}", col_id.0)
}

pub fn errormsg_storage_name(col_id: ColumnId) -> String {
    format!("col_{}_errormsg", col_id.0)
}

pub fn errortype_storage_name(col_id: ColumnId) -> String {
    format!("col_{}_errortype", col_id.0)
}

pub fn index_column_name(col_id: ColumnId) -> String {
    format!("col_{}_idx", col_id.0)
}

/// `idx_<col_id>_<tbl_hex>` (spec.md §4.2).
pub fn per_column_index_name(col_id: ColumnId, tbl_id: TableId) -> String {
    format!("idx_{}_{}", col_id.0, tbl_id.hex())
}

/// `sys_cols_idx_<tbl_hex>` (spec.md §4.2).
pub fn system_columns_index_name(tbl_id: TableId) -> String {
    format!("sys_cols_idx_{}", tbl_id.hex())
}

/// `vmin_idx_<tbl_hex>` / `vmax_idx_<tbl_hex>` (spec.md §4.2).
pub fn vmin_index_name(tbl_id: TableId) -> String {
    format!("vmin_idx_{}", tbl_id.hex())
}

pub fn vmax_index_name(tbl_id: TableId) -> String {
    format!("vmax_idx_{}", tbl_id.hex())
}

/// Positional-suffix column for a component view at the given chain depth
/// (spec.md §4.6: `pos_<depth>`, "avoids name collisions when a component
/// view is stacked on another component view").
pub fn component_pos_column_name(depth: usize) -> String {
    format!("pos_{depth}")
}
