//! Database Backend Abstraction
//!
//! The prefetch executor only ever talks to a `Backend`. Each call to
//! `fetch` is one round trip; the executor's job is to keep that number
//! independent of how many parent rows there are.

use async_trait::async_trait;

use crate::query::QuerySpec;
use crate::row::ResultRow;

pub mod memory;
pub mod postgres;

pub use memory::MemoryBackend;
pub use postgres::PostgresBackend;

/// Storage capability consumed by `FastQuery`
#[async_trait]
pub trait Backend: Send + Sync {
    /// Execute one filtered, ordered, bounded read and return its rows in order
    async fn fetch(&self, query: &QuerySpec) -> anyhow::Result<Vec<ResultRow>>;
}
