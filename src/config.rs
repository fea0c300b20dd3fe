//! Store configuration (spec.md §9 design notes).
//!
//! Passed in at construction; the store never reads a global or an
//! environment variable for any of this.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VminIndexKind {
    Brin,
    Btree,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Rows per `INSERT` sub-batch (spec.md §4.3).
    pub batch_size: usize,
    /// Index method requested for `v_min`/`v_max` on backends that support a
    /// block-range method; SQLite always falls back to a B-tree regardless
    /// of this setting, since it has no BRIN equivalent.
    pub vmin_index_kind: VminIndexKind,
    /// Upper bound, in bytes, on a stored `errormsg` (spec.md §3 invariants).
    pub max_error_message_bytes: usize,
    /// If true, an exception observed in an embedding slot during
    /// `load_column` is an invariant violation (panic); if false it is
    /// silently treated as an invariant violation too — spec.md §4.4 does
    /// not offer a non-strict mode, so this flag exists for forward
    /// compatibility with a future lenient mode and currently has one
    /// meaningful value.
    pub strict_embedding_errors: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            batch_size: 16,
            vmin_index_kind: VminIndexKind::Brin,
            max_error_message_bytes: 65536,
            strict_embedding_errors: true,
        }
    }
}
