//! Identifier collection for batched relation fetches

use std::collections::HashSet;

use serde_json::Value as JsonValue;

use crate::relationships::RelationDescriptor;
use crate::row::{ResultRow, RowKey};

/// Extracts the distinct linking keys needed to fetch a relation
pub struct IdentifierCollector;

impl IdentifierCollector {
    /// Distinct non-null values of `field` across `rows`, in first-seen order
    pub fn collect(rows: &[ResultRow], field: &str) -> Vec<JsonValue> {
        let mut seen = HashSet::new();
        let mut values = Vec::new();

        for row in rows {
            let Some(value) = row.get(field) else {
                continue;
            };
            if let Some(key) = RowKey::from_json(value) {
                if seen.insert(key) {
                    values.push(value.clone());
                }
            }
        }

        values
    }

    /// Keys on the parent side of `descriptor`
    ///
    /// For every relation kind this is the parent's `local_key`: the foreign
    /// key for to-one relations and the primary key for the others.
    pub fn for_relation(rows: &[ResultRow], descriptor: &RelationDescriptor) -> Vec<JsonValue> {
        Self::collect(rows, &descriptor.local_key)
    }
}
