//! Relationship Traits - Schema capability consumed by the prefetch planner

use crate::error::OrmResult;
use super::metadata::RelationDescriptor;

/// Source of relation metadata for entity types
pub trait Schema: Send + Sync {
    /// Describe relation `name` of `entity`
    ///
    /// Fails with `OrmError::UnknownRelation` when the entity has no such relation.
    fn describe_relation(&self, entity: &str, name: &str) -> OrmResult<RelationDescriptor>;

    /// Names of all relations declared on `entity`
    fn relation_names(&self, entity: &str) -> Vec<String>;
}
