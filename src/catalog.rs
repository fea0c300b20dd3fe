//! Catalog contracts (spec.md §2.2, §6.1).
//!
//! These traits describe the capabilities the store requires from an
//! external catalog without prescribing how the catalog is implemented.
//! [`TableVersion`] and [`Column`] are a concrete, in-memory reference
//! implementation — useful standalone and for the test suite — built as an
//! arena (`Catalog`) that owns nodes by id, per the redesign note in
//! spec.md §9: the store never holds a strong reference back into the
//! catalog, only ids, which breaks the `TableVersion`/`Column`/store
//! reference cycle the original implementation relied on a GC for.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::backend::SqlDialect;
use crate::ids::{self, ColumnId, TableId, TableKind};

/// Logical column type, reduced to exactly the predicates the store's
/// indexing and DDL-generation logic needs (spec.md §6.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Int,
    Float,
    Bool,
    String,
    Json,
    Image,
    Video,
    /// Fixed-width embedding vector, written only through an index column.
    Embedding { dims: usize },
}

impl ColumnType {
    pub fn is_scalar_type(&self) -> bool {
        matches!(
            self,
            ColumnType::Int | ColumnType::Float | ColumnType::Bool | ColumnType::String | ColumnType::Json
        )
    }

    pub fn is_video_type(&self) -> bool {
        matches!(self, ColumnType::Video)
    }

    pub fn is_image_type(&self) -> bool {
        matches!(self, ColumnType::Image)
    }

    pub fn to_sql(&self, dialect: SqlDialect) -> &'static str {
        match (self, dialect) {
            (ColumnType::Int, _) => "BIGINT",
            (ColumnType::Float, _) => "DOUBLE PRECISION",
            (ColumnType::Bool, SqlDialect::Postgres) => "BOOLEAN",
            (ColumnType::Bool, SqlDialect::Sqlite) => "INTEGER",
            (ColumnType::String | ColumnType::Json | ColumnType::Image | ColumnType::Video, _) => "TEXT",
            (ColumnType::Embedding { .. }, SqlDialect::Postgres) => "BYTEA",
            (ColumnType::Embedding { .. }, SqlDialect::Sqlite) => "BLOB",
        }
    }
}

/// The storage-column handles a [`Column`] allocates on demand
/// (spec.md §6.1: `sa_col`, `sa_errormsg_col`, `sa_errortype_col`,
/// `sa_idx_col`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnHandles {
    pub value: String,
    pub errormsg: Option<String>,
    pub errortype: Option<String>,
    pub idx: Option<String>,
}

/// Capabilities a column must expose to the store (spec.md §6.1).
pub trait ColumnLike {
    fn id(&self) -> ColumnId;
    fn name(&self) -> &str;
    fn col_type(&self) -> ColumnType;
    fn is_stored(&self) -> bool;
    fn is_computed(&self) -> bool;
    fn is_indexed(&self) -> bool;

    /// Allocate (or return the already-allocated) backing storage-column
    /// handles. Called once per relation-descriptor generation
    /// (spec.md §9's "explicit generation counter" redesign note).
    fn create_backing_columns(&self) -> ColumnHandles {
        ColumnHandles {
            value: ids::column_storage_name(self.id()),
            errormsg: self.is_computed().then(|| ids::errormsg_storage_name(self.id())),
            errortype: self.is_computed().then(|| ids::errortype_storage_name(self.id())),
            idx: self.is_indexed().then(|| ids::index_column_name(self.id())),
        }
    }
}

/// Reference column implementation.
#[derive(Debug, Clone)]
pub struct Column {
    pub id: ColumnId,
    pub name: String,
    pub col_type: ColumnType,
    pub is_stored: bool,
    pub is_computed: bool,
    pub is_indexed: bool,
    /// Generation at which `handles` was last populated; bumped by
    /// `rebuild_handles`. Exists purely so a descriptor rebuild (schema
    /// evolution) is observable, matching the design note's "generation
    /// counter" replacing the Python original's "bound to the last mutable
    /// table" quirk.
    generation: RefCell<u64>,
    handles: RefCell<Option<ColumnHandles>>,
}

impl Column {
    pub fn new(id: ColumnId, name: impl Into<String>, col_type: ColumnType) -> Self {
        Self {
            id,
            name: name.into(),
            col_type,
            is_stored: true,
            is_computed: false,
            is_indexed: false,
            generation: RefCell::new(0),
            handles: RefCell::new(None),
        }
    }

    pub fn computed(mut self) -> Self {
        self.is_computed = true;
        self
    }

    pub fn indexed(mut self) -> Self {
        self.is_indexed = true;
        self
    }

    pub fn not_stored(mut self) -> Self {
        self.is_stored = false;
        self
    }

    /// Rebind this column's storage handles for a new relation-descriptor
    /// generation, re-deriving them from the generic `col_<id>` formula.
    pub fn rebuild_handles(&self) {
        *self.generation.borrow_mut() += 1;
        *self.handles.borrow_mut() = Some(ColumnLike::create_backing_columns(self));
    }

    pub fn handles(&self) -> ColumnHandles {
        if self.handles.borrow().is_none() {
            self.rebuild_handles();
        }
        self.handles.borrow().clone().expect("handles populated above")
    }

    /// Bind this column's storage handle directly to `name`, bypassing the
    /// generic `col_<id>` derivation entirely. The only user is the
    /// component view's `pos` column (spec.md §4.6), whose storage name is
    /// computed from view depth rather than column id.
    pub fn bind_value_storage_name(&self, name: String) {
        *self.generation.borrow_mut() += 1;
        *self.handles.borrow_mut() = Some(ColumnHandles {
            value: name,
            errormsg: None,
            errortype: None,
            idx: None,
        });
    }
}

impl ColumnLike for Column {
    fn id(&self) -> ColumnId {
        self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn col_type(&self) -> ColumnType {
        self.col_type
    }
    fn is_stored(&self) -> bool {
        self.is_stored
    }
    fn is_computed(&self) -> bool {
        self.is_computed
    }
    fn is_indexed(&self) -> bool {
        self.is_indexed
    }
}

/// Reference table-version implementation.
///
/// `base_id` is a parent *id*, never a strong reference to another
/// `TableVersion` — callers resolve it through a [`Catalog`].
#[derive(Debug, Clone)]
pub struct TableVersion {
    pub id: TableId,
    pub version: i64,
    pub kind: TableKind,
    pub base_id: Option<TableId>,
    /// Depth in the view chain; 0 for a plain table or a view directly over
    /// one, used to name a component view's positional column
    /// (spec.md §4.6).
    pub depth: usize,
    pub cols: Vec<Column>,
}

impl TableVersion {
    pub fn new_table(id: TableId, version: i64, cols: Vec<Column>) -> Self {
        Self {
            id,
            version,
            kind: TableKind::Table,
            base_id: None,
            depth: 0,
            cols,
        }
    }

    pub fn new_view(id: TableId, version: i64, base_id: TableId, depth: usize, cols: Vec<Column>) -> Self {
        Self {
            id,
            version,
            kind: TableKind::View,
            base_id: Some(base_id),
            depth,
            cols,
        }
    }

    pub fn new_component_view(
        id: TableId,
        version: i64,
        base_id: TableId,
        depth: usize,
        cols: Vec<Column>,
    ) -> Self {
        Self {
            id,
            version,
            kind: TableKind::ComponentView,
            base_id: Some(base_id),
            depth,
            cols,
        }
    }

    pub fn is_view(&self) -> bool {
        !matches!(self.kind, TableKind::Table)
    }

    pub fn is_component_view(&self) -> bool {
        matches!(self.kind, TableKind::ComponentView)
    }

    pub fn cols_by_name(&self) -> HashMap<&str, &Column> {
        self.cols.iter().map(|c| (c.name.as_str(), c)).collect()
    }

    pub fn col_by_name(&self, name: &str) -> Option<&Column> {
        self.cols.iter().find(|c| c.name == name)
    }

    /// Rebind the catalog's `pos` column entry onto the given storage name
    /// (spec.md §4.6); a no-op if there is no `pos` column. `Store::new_component_view`
    /// is the only caller — it derives the name from view chain depth.
    pub fn rebind_pos_column(&self, storage_name: String) {
        if let Some(col) = self.col_by_name("pos") {
            col.bind_value_storage_name(storage_name);
        }
    }
}

/// Owns `TableVersion` nodes by id; the store resolves a view's base
/// through this arena rather than via a strong reference (spec.md §9).
#[derive(Debug, Default)]
pub struct Catalog {
    tables: HashMap<TableId, TableVersion>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tv: TableVersion) {
        self.tables.insert(tv.id, tv);
    }

    pub fn get(&self, id: TableId) -> Option<&TableVersion> {
        self.tables.get(&id)
    }

    pub fn get_mut(&mut self, id: TableId) -> Option<&mut TableVersion> {
        self.tables.get_mut(&id)
    }

    pub fn base_of(&self, tv: &TableVersion) -> Option<&TableVersion> {
        tv.base_id.and_then(|id| self.get(id))
    }
}
