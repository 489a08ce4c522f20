//! Relation stitching
//!
//! Attaches fetched related rows to their parents in memory. Every parent
//! receives the relation slot, even when nothing matched: `null` for
//! single-valued relations and `[]` for collections.

use std::collections::{HashMap, HashSet};

use crate::relationships::{RelationDescriptor, RelationKind};
use crate::row::{RelationValue, ResultRow, RowKey};

/// Rows fetched for one relation at one level
#[derive(Debug, Clone, Default)]
pub struct FetchedRelation {
    /// Related rows in fetch order
    pub rows: Vec<ResultRow>,
    /// Linking-table rows, only populated for many-to-many relations
    pub links: Vec<ResultRow>,
}

impl FetchedRelation {
    pub fn direct(rows: Vec<ResultRow>) -> Self {
        Self {
            rows,
            links: Vec::new(),
        }
    }
}

/// Attaches related rows to parents according to the relation kind
pub struct RelationStitcher;

impl RelationStitcher {
    pub fn stitch(
        parents: &mut [ResultRow],
        descriptor: &RelationDescriptor,
        fetched: FetchedRelation,
    ) {
        match descriptor.kind {
            RelationKind::ToOne | RelationKind::ReverseToOne => {
                Self::stitch_single(parents, descriptor, fetched.rows)
            }
            RelationKind::ToMany => Self::stitch_many(parents, descriptor, fetched.rows),
            RelationKind::ManyToMany => Self::stitch_through(parents, descriptor, fetched),
        }
    }

    /// Match parent `local_key` to related `remote_key`, first match wins
    fn stitch_single(
        parents: &mut [ResultRow],
        descriptor: &RelationDescriptor,
        related: Vec<ResultRow>,
    ) {
        let mut index: HashMap<RowKey, ResultRow> = HashMap::with_capacity(related.len());
        for row in related {
            if let Some(key) = row.key(&descriptor.remote_key) {
                index.entry(key).or_insert(row);
            }
        }

        for parent in parents.iter_mut() {
            let related = parent
                .key(&descriptor.local_key)
                .and_then(|key| index.get(&key))
                .map(|row| Box::new(row.clone()));
            parent.set_relation(descriptor.name.clone(), RelationValue::One(related));
        }
    }

    /// Group related rows by `remote_key`, keeping fetch order within each group
    fn stitch_many(
        parents: &mut [ResultRow],
        descriptor: &RelationDescriptor,
        related: Vec<ResultRow>,
    ) {
        let mut groups: HashMap<RowKey, Vec<ResultRow>> = HashMap::new();
        for row in related {
            if let Some(key) = row.key(&descriptor.remote_key) {
                groups.entry(key).or_default().push(row);
            }
        }

        for parent in parents.iter_mut() {
            let rows = parent
                .key(&descriptor.local_key)
                .and_then(|key| groups.get(&key))
                .cloned()
                .unwrap_or_default();
            parent.set_relation(descriptor.name.clone(), RelationValue::Many(rows));
        }
    }

    /// Resolve parent -> target membership through the linking rows
    fn stitch_through(
        parents: &mut [ResultRow],
        descriptor: &RelationDescriptor,
        fetched: FetchedRelation,
    ) {
        let Some(through) = descriptor.through.as_ref() else {
            for parent in parents.iter_mut() {
                parent.set_relation(descriptor.name.clone(), RelationValue::Many(Vec::new()));
            }
            return;
        };

        let mut members: HashMap<RowKey, HashSet<RowKey>> = HashMap::new();
        for link in &fetched.links {
            let source = link.key(&through.source_key);
            if let (Some(source), Some(target)) = (source, link.key(&through.target_key)) {
                members.entry(source).or_default().insert(target);
            }
        }

        let targets: Vec<(RowKey, ResultRow)> = fetched
            .rows
            .into_iter()
            .filter_map(|row| row.key(&descriptor.remote_key).map(|key| (key, row)))
            .collect();

        for parent in parents.iter_mut() {
            let mut rows = Vec::new();
            let wanted = parent.key(&descriptor.local_key).and_then(|key| members.get(&key));
            if let Some(wanted) = wanted {
                let mut attached = HashSet::new();
                for (key, row) in &targets {
                    if wanted.contains(key) && attached.insert(key) {
                        rows.push(row.clone());
                    }
                }
            }
            parent.set_relation(descriptor.name.clone(), RelationValue::Many(rows));
        }
    }
}
