//! The `FastQuery` orchestrator
//!
//! Wraps a base query and a set of prefetch descriptors. Nothing touches the
//! backend until the result is first needed; the full result is then cached
//! so repeated iteration does not fetch again.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value as JsonValue;

use crate::backends::Backend;
use crate::config::PrefetchConfig;
use crate::error::{OrmError, OrmResult};
use crate::query::{QuerySpec, Slice};
use crate::relationships::Schema;
use crate::row::ResultRow;

use super::executor::{ExecutionStats, PrefetchExecutor};
use super::prefetch::{PrefetchSet, PrefetchTarget};

/// A base query plus the relations to load alongside it
pub struct FastQuery {
    backend: Arc<dyn Backend>,
    schema: Arc<dyn Schema>,
    base: QuerySpec,
    prefetches: PrefetchSet,
    config: PrefetchConfig,
    result: Option<Vec<ResultRow>>,
    stats: Option<ExecutionStats>,
}

impl FastQuery {
    pub fn new(backend: Arc<dyn Backend>, schema: Arc<dyn Schema>, base: QuerySpec) -> Self {
        Self {
            backend,
            schema,
            base,
            prefetches: PrefetchSet::new(),
            config: PrefetchConfig::default(),
            result: None,
            stats: None,
        }
    }

    /// Replace the configuration
    ///
    /// Descriptors already registered keep the shape they were parsed with.
    pub fn with_config(mut self, config: PrefetchConfig) -> OrmResult<Self> {
        config.validate()?;
        self.config = config;
        self.reset();
        Ok(self)
    }

    /// Builder form of [`FastQuery::add_prefetch`]
    pub fn prefetch(mut self, target: impl Into<PrefetchTarget>) -> OrmResult<Self> {
        self.add_prefetch(target)?;
        Ok(self)
    }

    /// Register a relation to load, given as a dotted path or a `Prefetch`
    ///
    /// A relation registered twice is merged with the earlier registration.
    /// Any cached result is dropped.
    pub fn add_prefetch(&mut self, target: impl Into<PrefetchTarget>) -> OrmResult<&mut Self> {
        let prefetch = target.into().into_prefetch(&self.config.path_separator)?;
        if prefetch.depth() > self.config.max_depth {
            return Err(OrmError::malformed_path(
                prefetch.relation(),
                format!("nesting exceeds maximum depth of {}", self.config.max_depth),
            ));
        }

        tracing::trace!(
            "Registering prefetch '{}' on '{}'",
            prefetch.relation(),
            self.base.entity()
        );
        self.prefetches.insert(prefetch);
        self.reset();
        Ok(self)
    }

    /// Run the base query and every prefetch, once
    pub async fn execute(&mut self) -> OrmResult<&[ResultRow]> {
        if self.result.is_none() {
            let (rows, stats) = self.run(&self.base).await?;
            self.result = Some(rows);
            self.stats = Some(stats);
        }
        Ok(self.result.as_deref().unwrap_or_default())
    }

    pub async fn iter(&mut self) -> OrmResult<std::slice::Iter<'_, ResultRow>> {
        Ok(self.execute().await?.iter())
    }

    /// Rows `[start:stop]` of the result, each with its relations loaded
    ///
    /// On an executed query the window is served from the cached result.
    /// Otherwise the window is pushed into the base query as an offset and
    /// limit, so only the rows in the window are prefetched for; that result
    /// is not cached.
    pub async fn slice(&mut self, slice: impl Into<Slice>) -> OrmResult<Vec<ResultRow>> {
        let slice = slice.into();
        slice.validate()?;

        if let Some(rows) = &self.result {
            return Ok(slice.apply_to_slice(rows)?.to_vec());
        }
        if slice.is_empty() {
            return Ok(Vec::new());
        }

        let query = slice.apply_to(self.base.clone())?;
        let (rows, stats) = self.run(&query).await?;
        self.stats = Some(stats);
        Ok(rows)
    }

    /// One-element result holding row `index`
    pub async fn get(&mut self, index: usize) -> OrmResult<Vec<ResultRow>> {
        if index.checked_add(1).is_none() {
            return Err(OrmError::IndexOutOfRange { index });
        }
        let rows = self.slice(Slice::single(index)).await?;
        if rows.is_empty() {
            return Err(OrmError::IndexOutOfRange { index });
        }
        Ok(rows)
    }

    pub async fn into_rows(mut self) -> OrmResult<Vec<ResultRow>> {
        self.execute().await?;
        Ok(self.result.take().unwrap_or_default())
    }

    /// The result as a JSON array of row objects
    pub async fn to_json(&mut self) -> OrmResult<JsonValue> {
        let rows = self.execute().await?;
        Ok(JsonValue::Array(rows.iter().map(ResultRow::to_json).collect()))
    }

    pub fn is_executed(&self) -> bool {
        self.result.is_some()
    }

    /// Statistics of the most recent successful execution
    pub fn stats(&self) -> Option<&ExecutionStats> {
        self.stats.as_ref()
    }

    pub fn prefetches(&self) -> &PrefetchSet {
        &self.prefetches
    }

    pub fn base_query(&self) -> &QuerySpec {
        &self.base
    }

    pub fn config(&self) -> &PrefetchConfig {
        &self.config
    }

    fn reset(&mut self) {
        self.result = None;
        self.stats = None;
    }

    async fn run(&self, query: &QuerySpec) -> OrmResult<(Vec<ResultRow>, ExecutionStats)> {
        let started = Instant::now();
        let mut executor =
            PrefetchExecutor::new(self.backend.as_ref(), self.schema.as_ref(), &self.config);

        let mut rows = if self.config.skip_empty_fetches && query.is_empty_set() {
            tracing::debug!(
                "Base query on '{}' cannot match any row, skipping fetch",
                query.entity()
            );
            Vec::new()
        } else {
            executor.fetch(query).await?
        };

        executor
            .prefetch_level(query.entity(), &mut rows, self.prefetches.as_slice(), 1)
            .await?;

        let mut stats = executor.into_stats();
        stats.elapsed = started.elapsed();
        tracing::debug!(
            "Loaded {} '{}' rows with {} fetches in {:?}",
            rows.len(),
            query.entity(),
            stats.fetch_count,
            stats.elapsed
        );

        Ok((rows, stats))
    }
}
