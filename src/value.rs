//! Backend-agnostic value and result types exchanged with the relational
//! backing store.

use serde::{Deserialize, Serialize};

/// A single storage-column value.
///
/// `Vector` is used only for embedding-index columns (spec.md §4.4): the
/// store passes the raw N-D numeric array through untouched, it never
/// interprets its contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    Vector(Vec<f32>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

/// Result of executing one statement against a [`crate::backend::Connection`].
///
/// `rows` is populated for `SELECT`-shaped statements; `rows_affected` is
/// populated for `INSERT`/`UPDATE`/`DELETE`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub rows: Vec<Vec<Value>>,
    pub rows_affected: u64,
}

impl QueryResult {
    pub fn empty() -> Self {
        Self::default()
    }
}
