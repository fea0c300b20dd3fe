//! Row builder & execution-plan contract (spec.md §2.3, §6.2).
//!
//! An execution plan is a restartable, finite, lazy sequence of row
//! batches. The insert pipeline and the computed-column loader both pull
//! from one; neither cares where its rows came from.

use std::collections::{BTreeSet, HashMap};

use crate::catalog::Column;
use crate::catalog::ColumnLike;
use crate::error::StoreResult;
use crate::ids::ColumnId;
use crate::value::Value;

/// A per-row, per-column compute failure (spec.md §7: `RowComputeError`).
///
/// This is data, not a Rust error: it is folded into the `errortype`/
/// `errormsg` storage columns and never aborts the surrounding insert or
/// load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowException {
    pub type_name: String,
    pub message: String,
}

impl RowException {
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SlotValue {
    Value(Value),
    Exception(RowException),
}

/// One row produced by an [`ExecutionPlan`]: a primary-key tuple plus one
/// slot per column the plan was asked to materialize.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub pk: Vec<Value>,
    pub slots: Vec<SlotValue>,
}

impl Row {
    pub fn has_exc(&self, slot: usize) -> bool {
        matches!(self.slots[slot], SlotValue::Exception(_))
    }

    pub fn get_exc(&self, slot: usize) -> Option<&RowException> {
        match &self.slots[slot] {
            SlotValue::Exception(exc) => Some(exc),
            SlotValue::Value(_) => None,
        }
    }

    pub fn get_stored_val(&self, slot: usize) -> Option<&Value> {
        match &self.slots[slot] {
            SlotValue::Value(v) => Some(v),
            SlotValue::Exception(_) => None,
        }
    }
}

/// Truncation marker appended to an oversize `errormsg` (spec.md §3
/// invariants; SPEC_FULL.md §4.4 supplement — `store.py` itself does not
/// truncate, this is a genuine addition).
pub const TRUNCATION_MARKER: &str = "...[truncated]";

pub fn truncate_error_message(message: &str, max_bytes: usize) -> String {
    if message.len() <= max_bytes {
        return message.to_string();
    }
    let mut end = max_bytes;
    while end > 0 && !message.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{}", &message[..end], TRUNCATION_MARKER)
}

/// Converts slot values into storage-column values, recording per-row
/// exceptions into `cols_with_excs` (spec.md §6.2, §4.3).
pub trait RowBuilder {
    /// Returns the complete table row (storage column name -> value) and
    /// the number of slot exceptions encountered for this row.
    fn create_table_row(
        &self,
        row: &Row,
        cols_with_excs: &mut BTreeSet<ColumnId>,
    ) -> (HashMap<String, Value>, usize);
}

/// Reference row builder: slot `i` backs `columns[i]`, in order.
pub struct ColumnRowBuilder<'a> {
    columns: &'a [Column],
    max_error_message_bytes: usize,
}

impl<'a> ColumnRowBuilder<'a> {
    pub fn new(columns: &'a [Column], max_error_message_bytes: usize) -> Self {
        Self {
            columns,
            max_error_message_bytes,
        }
    }
}

impl<'a> RowBuilder for ColumnRowBuilder<'a> {
    fn create_table_row(
        &self,
        row: &Row,
        cols_with_excs: &mut BTreeSet<ColumnId>,
    ) -> (HashMap<String, Value>, usize) {
        let mut table_row = HashMap::new();
        let mut num_excs = 0;

        for (slot_idx, col) in self.columns.iter().enumerate() {
            let handles = col.handles();
            match row.slots.get(slot_idx) {
                Some(SlotValue::Value(value)) => {
                    table_row.insert(handles.value.clone(), value.clone());
                    if let Some(errormsg_col) = &handles.errormsg {
                        table_row.insert(errormsg_col.clone(), Value::Null);
                    }
                    if let Some(errortype_col) = &handles.errortype {
                        table_row.insert(errortype_col.clone(), Value::Null);
                    }
                }
                Some(SlotValue::Exception(exc)) => {
                    num_excs += 1;
                    cols_with_excs.insert(col.id());
                    table_row.insert(handles.value.clone(), Value::Null);
                    if let Some(errormsg_col) = &handles.errormsg {
                        table_row.insert(
                            errormsg_col.clone(),
                            Value::Text(truncate_error_message(
                                &exc.message,
                                self.max_error_message_bytes,
                            )),
                        );
                    }
                    if let Some(errortype_col) = &handles.errortype {
                        table_row.insert(errortype_col.clone(), Value::Text(exc.type_name.clone()));
                    }
                }
                None => {}
            }
        }

        (table_row, num_excs)
    }
}

/// A restartable, finite, lazy batch producer (spec.md §6.2).
pub trait ExecutionPlan {
    fn open(&mut self) -> StoreResult<()>;

    /// Returns the next batch, or `None` once the plan is exhausted.
    fn next_batch(&mut self) -> StoreResult<Option<Vec<Row>>>;

    fn close(&mut self);
}

/// Scoped acquisition of a plan: `open`s on construction, `close`s on drop
/// on every exit path, including early return or panic unwind
/// (spec.md §5: "scoped acquisition of the plan guarantees close").
pub struct PlanGuard<'a, P: ExecutionPlan + ?Sized> {
    plan: &'a mut P,
}

impl<'a, P: ExecutionPlan + ?Sized> PlanGuard<'a, P> {
    pub fn open(plan: &'a mut P) -> StoreResult<Self> {
        plan.open()?;
        Ok(Self { plan })
    }

    pub fn next_batch(&mut self) -> StoreResult<Option<Vec<Row>>> {
        self.plan.next_batch()
    }
}

impl<'a, P: ExecutionPlan + ?Sized> Drop for PlanGuard<'a, P> {
    fn drop(&mut self) {
        self.plan.close();
    }
}

/// Reference execution plan backed by an in-memory vector of batches —
/// used by the test suite and by any caller that already has rows in hand.
pub struct VecExecutionPlan {
    batches: std::vec::IntoIter<Vec<Row>>,
    opened: bool,
    closed: bool,
}

impl VecExecutionPlan {
    pub fn new(batches: Vec<Vec<Row>>) -> Self {
        Self {
            batches: batches.into_iter(),
            opened: false,
            closed: false,
        }
    }
}

impl ExecutionPlan for VecExecutionPlan {
    fn open(&mut self) -> StoreResult<()> {
        self.opened = true;
        Ok(())
    }

    fn next_batch(&mut self) -> StoreResult<Option<Vec<Row>>> {
        Ok(self.batches.next())
    }

    fn close(&mut self) {
        self.closed = true;
    }
}
