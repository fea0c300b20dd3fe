//! Ambient backend abstraction.
//!
//! The store never speaks to a driver directly — every DDL/DML statement
//! goes through this trait, the same split the `lix_engine` teacher uses for
//! `LixBackend`/`SqlDialect`. Unlike the teacher, `Connection` is
//! synchronous: spec.md §5 mandates blocking operations on an
//! already-open, already-transactional connection that the store never
//! commits or rolls back itself.

use crate::error::StoreResult;
use crate::value::{QueryResult, Value};

/// Which relational backend a [`Connection`] talks to.
///
/// The store's SQL generation branches on this in exactly one place: the
/// choice between a BRIN and a B-tree index for `v_min`/`v_max`
/// (spec.md §4.2's index policy; BRIN is a PostgreSQL-only access method).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlDialect {
    Sqlite,
    Postgres,
}

/// A single already-open connection, already inside a transaction the caller
/// controls.
///
/// Implementations must not start, commit, or roll back a transaction on the
/// caller's behalf — see spec.md §5 ("the store performs no implicit
/// commits").
pub trait Connection {
    fn dialect(&self) -> SqlDialect;

    /// Execute one statement. For `SELECT`, returns the fetched rows in
    /// `QueryResult::rows`; for `INSERT`/`UPDATE`/`DELETE`, returns the
    /// affected-row count in `QueryResult::rows_affected`.
    fn execute(&mut self, sql: &str, params: &[Value]) -> StoreResult<QueryResult>;
}
