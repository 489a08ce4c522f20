//! Loading modules: prefetch descriptors, batched execution and the
//! `FastQuery` orchestrator

pub mod prefetch;
pub mod collector;
pub mod stitcher;
pub mod executor;
pub mod fast_query;

pub use prefetch::{Prefetch, PrefetchSet, PrefetchTarget, DEFAULT_SEPARATOR};
pub use collector::IdentifierCollector;
pub use stitcher::{FetchedRelation, RelationStitcher};
pub use executor::{ExecutionStats, PrefetchExecutor};
pub use fast_query::FastQuery;
