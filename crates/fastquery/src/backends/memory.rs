//! In-memory backend
//!
//! Evaluates a `QuerySpec` against rows held in process and records every
//! fetch it serves, which makes round trips observable.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::Backend;
use crate::query::{OrderDirection, QuerySpec};
use crate::row::ResultRow;

/// Tables of rows keyed by entity name
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    tables: Arc<RwLock<HashMap<String, Vec<ResultRow>>>>,
    fetch_log: Arc<RwLock<Vec<QuerySpec>>>,
    failing: Arc<RwLock<HashSet<String>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or replace a table
    pub async fn insert_table(&self, entity: &str, rows: Vec<ResultRow>) {
        self.tables.write().await.insert(entity.to_string(), rows);
    }

    /// Append one row to a table, creating it if needed
    pub async fn insert(&self, entity: &str, row: ResultRow) {
        self.tables
            .write()
            .await
            .entry(entity.to_string())
            .or_default()
            .push(row);
    }

    /// Make every fetch of `entity` fail until `recover` is called
    pub async fn fail_on(&self, entity: &str) {
        self.failing.write().await.insert(entity.to_string());
    }

    pub async fn recover(&self, entity: &str) {
        self.failing.write().await.remove(entity);
    }

    /// Number of fetches served so far
    pub async fn fetch_count(&self) -> usize {
        self.fetch_log.read().await.len()
    }

    /// Entities fetched so far, in call order
    pub async fn fetched_entities(&self) -> Vec<String> {
        self.fetch_log
            .read()
            .await
            .iter()
            .map(|query| query.entity().to_string())
            .collect()
    }

    /// Every query served so far, in call order
    pub async fn fetch_log(&self) -> Vec<QuerySpec> {
        self.fetch_log.read().await.clone()
    }

    pub async fn reset_log(&self) {
        self.fetch_log.write().await.clear();
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn fetch(&self, query: &QuerySpec) -> anyhow::Result<Vec<ResultRow>> {
        self.fetch_log.write().await.push(query.clone());

        if self.failing.read().await.contains(query.entity()) {
            anyhow::bail!("fetch of '{}' failed", query.entity());
        }

        let tables = self.tables.read().await;
        let table = tables
            .get(query.entity())
            .ok_or_else(|| anyhow::anyhow!("table '{}' does not exist", query.entity()))?;

        let mut rows: Vec<ResultRow> = table
            .iter()
            .filter(|row| {
                query
                    .conditions()
                    .iter()
                    .all(|condition| condition.matches(row.get(&condition.column)))
            })
            .cloned()
            .collect();

        if !query.ordering().is_empty() {
            rows.sort_by(|a, b| {
                for (column, direction) in query.ordering() {
                    let ordering = compare_values(a.get(column), b.get(column));
                    let ordering = match direction {
                        OrderDirection::Asc => ordering,
                        OrderDirection::Desc => ordering.reverse(),
                    };
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                Ordering::Equal
            });
        }

        let offset = query.offset_value().unwrap_or(0);
        let limit = query.limit_value().unwrap_or(usize::MAX);
        Ok(rows.into_iter().skip(offset).take(limit).collect())
    }
}

/// Nulls and missing fields sort first, then booleans, numbers, strings
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(_) => 4,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            match (x.as_i64(), y.as_i64()) {
                (Some(x), Some(y)) => x.cmp(&y),
                _ => {
                    let x = x.as_f64().unwrap_or(0.0);
                    let y = y.as_f64().unwrap_or(0.0);
                    x.partial_cmp(&y).unwrap_or(Ordering::Equal)
                }
            }
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}
