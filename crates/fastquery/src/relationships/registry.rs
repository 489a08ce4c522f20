//! Relationship Registry - Runtime relation metadata storage and access

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;

use crate::error::{OrmError, OrmResult};
use super::metadata::RelationDescriptor;
use super::traits::Schema;

/// Thread-safe relation registry, shared cheaply through clones
#[derive(Debug, Clone, Default)]
pub struct RelationshipRegistry {
    /// Map of entity name -> relation name -> descriptor
    relationships: Arc<DashMap<String, HashMap<String, RelationDescriptor>>>,
}

impl RelationshipRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a relation for an entity, replacing any previous one of the same name
    pub fn register(&self, entity: &str, descriptor: RelationDescriptor) -> OrmResult<()> {
        descriptor.validate()?;

        tracing::trace!(
            "Registering relation {}.{} ({:?} -> {})",
            entity,
            descriptor.name,
            descriptor.kind,
            descriptor.target
        );

        self.relationships
            .entry(entity.to_string())
            .or_default()
            .insert(descriptor.name.clone(), descriptor);

        Ok(())
    }

    /// Register a relation (builder style)
    pub fn with(self, entity: &str, descriptor: RelationDescriptor) -> OrmResult<Self> {
        self.register(entity, descriptor)?;
        Ok(self)
    }

    /// Get a relation descriptor by entity and relation name
    pub fn get(&self, entity: &str, name: &str) -> Option<RelationDescriptor> {
        self.relationships.get(entity)?.get(name).cloned()
    }

    /// Check if a relation exists
    pub fn has_relation(&self, entity: &str, name: &str) -> bool {
        self.relationships
            .get(entity)
            .map(|relations| relations.contains_key(name))
            .unwrap_or(false)
    }
}

impl Schema for RelationshipRegistry {
    fn describe_relation(&self, entity: &str, name: &str) -> OrmResult<RelationDescriptor> {
        self.get(entity, name)
            .ok_or_else(|| OrmError::unknown_relation(entity, name))
    }

    fn relation_names(&self, entity: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .relationships
            .get(entity)
            .map(|relations| relations.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }
}
