mod backend;
mod backends;
mod catalog;
mod config;
mod error;
mod exec_plan;
mod ids;
mod progress;
mod sql_text;
mod store;
mod value;

pub use backend::{Connection, SqlDialect};
pub use backends::postgres::PostgresConnection;
pub use backends::sqlite::SqliteConnection;
pub use catalog::{Catalog, Column, ColumnHandles, ColumnLike, ColumnType, TableVersion};
pub use config::{StoreConfig, VminIndexKind};
pub use error::{StoreError, StoreResult};
pub use exec_plan::{
    ColumnRowBuilder, ExecutionPlan, PlanGuard, Row, RowBuilder, RowException, SlotValue,
    VecExecutionPlan, TRUNCATION_MARKER,
};
pub use ids::{
    component_pos_column_name, table_storage_name, ColumnId, TableId, TableKind, MAX_VERSION,
};
pub use store::Store;
pub use value::{QueryResult, Value};
