//! # fastquery: batched relation prefetching
//!
//! Loads a base set of rows together with their related rows using one
//! backend fetch per relation and nesting level, however many parent rows
//! there are. Related rows are attached to their parents in memory.
//!
//! ```ignore
//! let mut query = FastQuery::new(backend, schema, QuerySpec::all("users"))
//!     .prefetch("location")?
//!     .prefetch("groups")?;
//! for user in query.iter().await? {
//!     println!("{}", user.to_json());
//! }
//! ```

pub mod error;
pub mod config;
pub mod row;
pub mod query;
pub mod relationships;
pub mod loading;
pub mod backends;

pub use error::*;
pub use config::PrefetchConfig;
pub use row::{RelationValue, ResultRow, RowKey};
pub use query::{OrderDirection, QueryOperator, QuerySpec, Slice, WhereCondition};
pub use relationships::{
    RelationDescriptor, RelationKind, RelationshipRegistry, Schema, ThroughTable,
};
pub use loading::{ExecutionStats, FastQuery, Prefetch, PrefetchSet, PrefetchTarget};
pub use backends::{Backend, MemoryBackend, PostgresBackend};
