//! Prefetch execution
//!
//! Walks a tree of `Prefetch` descriptors level by level. For each relation
//! at a level the executor collects linking keys from the rows it already
//! has, issues one batched fetch (two for many-to-many: links, then targets),
//! recurses into nested descriptors using the fetched rows, and finally
//! stitches the fetched rows onto their parents.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::backends::Backend;
use crate::config::PrefetchConfig;
use crate::error::{OrmError, OrmResult};
use crate::query::QuerySpec;
use crate::relationships::{RelationDescriptor, RelationKind, Schema};
use crate::row::ResultRow;

use super::collector::IdentifierCollector;
use super::prefetch::Prefetch;
use super::stitcher::{FetchedRelation, RelationStitcher};

/// Statistics about one execution
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionStats {
    /// Number of backend round trips
    pub fetch_count: usize,
    /// Total rows returned by the backend
    pub rows_fetched: usize,
    /// Deepest relation level loaded (0 when only the base query ran)
    pub max_depth: usize,
    pub elapsed: Duration,
}

/// Executes prefetch trees against a backend
pub struct PrefetchExecutor<'a> {
    backend: &'a dyn Backend,
    schema: &'a dyn Schema,
    config: &'a PrefetchConfig,
    /// Descriptors resolved during this execution, keyed by (entity, relation)
    descriptors: HashMap<(String, String), RelationDescriptor>,
    stats: ExecutionStats,
}

impl<'a> PrefetchExecutor<'a> {
    pub fn new(
        backend: &'a dyn Backend,
        schema: &'a dyn Schema,
        config: &'a PrefetchConfig,
    ) -> Self {
        Self {
            backend,
            schema,
            config,
            descriptors: HashMap::new(),
            stats: ExecutionStats::default(),
        }
    }

    /// One round trip to the backend
    pub async fn fetch(&mut self, query: &QuerySpec) -> OrmResult<Vec<ResultRow>> {
        let rows = self
            .backend
            .fetch(query)
            .await
            .map_err(|e| OrmError::backend(query.entity(), e))?;

        self.stats.fetch_count += 1;
        self.stats.rows_fetched += rows.len();
        tracing::debug!(
            "Fetched {} rows from '{}' ({} conditions)",
            rows.len(),
            query.entity(),
            query.conditions().len()
        );

        Ok(rows)
    }

    /// Resolve a relation once per execution
    pub fn resolve(&mut self, entity: &str, relation: &str) -> OrmResult<RelationDescriptor> {
        let cache_key = (entity.to_string(), relation.to_string());
        if let Some(descriptor) = self.descriptors.get(&cache_key) {
            tracing::trace!("Relation {}.{} resolved from cache", entity, relation);
            return Ok(descriptor.clone());
        }

        let descriptor = self.schema.describe_relation(entity, relation)?;
        self.descriptors.insert(cache_key, descriptor.clone());
        Ok(descriptor)
    }

    /// Load `prefetches` onto `rows`, which are rows of `entity` at `depth - 1`
    pub fn prefetch_level<'b>(
        &'b mut self,
        entity: &'b str,
        rows: &'b mut [ResultRow],
        prefetches: &'b [Prefetch],
        depth: usize,
    ) -> Pin<Box<dyn Future<Output = OrmResult<()>> + Send + 'b>>
    where
        'a: 'b,
    {
        Box::pin(async move {
            if prefetches.is_empty() {
                return Ok(());
            }
            if depth > self.config.max_depth {
                return Err(OrmError::malformed_path(
                    prefetches[0].relation(),
                    format!("nesting exceeds maximum depth of {}", self.config.max_depth),
                ));
            }
            self.stats.max_depth = self.stats.max_depth.max(depth);

            for prefetch in prefetches {
                let descriptor = self.resolve(entity, prefetch.relation())?;
                let mut fetched = self.load_relation(&descriptor, prefetch, rows).await?;

                if !prefetch.children().is_empty() {
                    let children = prefetch.children();
                    self.prefetch_level(&descriptor.target, &mut fetched.rows, children, depth + 1)
                        .await?;
                }

                RelationStitcher::stitch(rows, &descriptor, fetched);
            }

            Ok(())
        })
    }

    /// Fetch the related rows for every parent in `rows` at once
    async fn load_relation(
        &mut self,
        descriptor: &RelationDescriptor,
        prefetch: &Prefetch,
        rows: &[ResultRow],
    ) -> OrmResult<FetchedRelation> {
        let base = relation_query(descriptor, prefetch)?;
        let keys = IdentifierCollector::for_relation(rows, descriptor);

        if keys.is_empty() && self.config.skip_empty_fetches {
            tracing::debug!("No keys for relation '{}', skipping fetch", descriptor.name);
            return Ok(FetchedRelation::default());
        }

        if descriptor.kind != RelationKind::ManyToMany {
            let query = base.where_in(&descriptor.remote_key, keys);
            return Ok(FetchedRelation::direct(self.fetch(&query).await?));
        }

        let through = descriptor.through.as_ref().ok_or_else(|| {
            OrmError::Configuration(format!(
                "Relation '{}' is many-to-many but has no through table",
                descriptor.name
            ))
        })?;

        let link_query = QuerySpec::all(through.table.as_str()).where_in(&through.source_key, keys);
        let links = self.fetch(&link_query).await?;

        let target_keys = IdentifierCollector::collect(&links, &through.target_key);
        if target_keys.is_empty() && self.config.skip_empty_fetches {
            tracing::debug!("Relation '{}' has no linked targets, skipping fetch", descriptor.name);
            return Ok(FetchedRelation {
                rows: Vec::new(),
                links,
            });
        }

        let query = base.where_in(&descriptor.remote_key, target_keys);
        let rows = self.fetch(&query).await?;
        Ok(FetchedRelation { rows, links })
    }

    pub fn into_stats(self) -> ExecutionStats {
        self.stats
    }
}

/// Base query for a relation: the caller's override, or every target row
fn relation_query(descriptor: &RelationDescriptor, prefetch: &Prefetch) -> OrmResult<QuerySpec> {
    match prefetch.query() {
        Some(query) if query.entity() != descriptor.target => Err(OrmError::Query(format!(
            "Prefetch of '{}' queries '{}' but the relation targets '{}'",
            descriptor.name,
            query.entity(),
            descriptor.target
        ))),
        Some(query) => Ok(query.clone()),
        None => Ok(QuerySpec::all(descriptor.target.as_str())),
    }
}
