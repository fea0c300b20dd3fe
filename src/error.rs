//! Error taxonomy (spec.md §7).
//!
//! Row-level compute failures (`RowComputeError`) are deliberately not part
//! of this enum: they are recovered into storage (see [`crate::exec_plan`])
//! and never abort an insert or a column load. What remains here are the two
//! kinds of errors that *do* propagate to the caller: backend failures and
//! schema-evolution failures. Internal invariant violations (e.g. a
//! primary-key arity mismatch) are modeled as Rust panics, not `Result`s,
//! matching `store.py`'s own use of `assert` for the same cases.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A DDL/DML statement failed in the backend. Propagates unchanged; the
    /// caller must roll back its transaction.
    #[error("storage backend error: {0}")]
    Backend(String),

    /// `add_column`/`drop_column` could not be applied to the backing
    /// relation (e.g. a derived storage name collided with an existing
    /// column).
    #[error("schema evolution error: {0}")]
    SchemaEvolution(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
