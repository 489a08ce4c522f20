//! Relationship Metadata - How two entity types are linked

use serde::{Deserialize, Serialize};

use crate::error::{OrmError, OrmResult};

/// Defines the kind of relationship between entity types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// Many-to-one or one-to-one held by a foreign key on the parent
    ToOne,
    /// One-to-many held by a foreign key on the related entity
    ToMany,
    /// Many-to-many through a linking table
    ManyToMany,
    /// One-to-one held by a foreign key on the related entity
    ReverseToOne,
}

impl RelationKind {
    /// Returns true if this relationship attaches a list
    pub fn is_collection(self) -> bool {
        matches!(self, Self::ToMany | Self::ManyToMany)
    }

    /// Returns true if this relationship requires a through table
    pub fn requires_through(self) -> bool {
        matches!(self, Self::ManyToMany)
    }
}

/// Linking table for many-to-many relationships
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThroughTable {
    /// The linking table name
    pub table: String,
    /// Column in the linking table pointing at the parent entity
    pub source_key: String,
    /// Column in the linking table pointing at the related entity
    pub target_key: String,
}

impl ThroughTable {
    pub fn new(
        table: impl Into<String>,
        source_key: impl Into<String>,
        target_key: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            source_key: source_key.into(),
            target_key: target_key.into(),
        }
    }

    pub fn validate(&self) -> OrmResult<()> {
        if self.table.is_empty() {
            return Err(OrmError::Configuration(
                "Through table name cannot be empty".to_string(),
            ));
        }

        if self.source_key.is_empty() || self.target_key.is_empty() {
            return Err(OrmError::Configuration(format!(
                "Through table '{}' must name both linking columns",
                self.table
            )));
        }

        if self.source_key == self.target_key {
            return Err(OrmError::Configuration(format!(
                "Through table '{}' source and target keys must be different",
                self.table
            )));
        }

        Ok(())
    }
}

/// Metadata for one named relation of an entity type
///
/// Parent rows are matched to related rows by comparing the parent's
/// `local_key` field with the related row's `remote_key` field. For
/// many-to-many relations the comparison goes through `through`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDescriptor {
    pub name: String,
    pub kind: RelationKind,
    /// Entity type of the related rows
    pub target: String,
    pub local_key: String,
    pub remote_key: String,
    pub through: Option<ThroughTable>,
}

impl RelationDescriptor {
    /// Foreign key `local_key` on the parent pointing at the related primary key
    pub fn to_one(
        name: impl Into<String>,
        target: impl Into<String>,
        local_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: RelationKind::ToOne,
            target: target.into(),
            local_key: local_key.into(),
            remote_key: "id".to_string(),
            through: None,
        }
    }

    /// Foreign key `remote_key` on the related rows pointing at the parent
    pub fn to_many(
        name: impl Into<String>,
        target: impl Into<String>,
        remote_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: RelationKind::ToMany,
            target: target.into(),
            local_key: "id".to_string(),
            remote_key: remote_key.into(),
            through: None,
        }
    }

    /// Unique foreign key `remote_key` on the related row pointing at the parent
    pub fn reverse_to_one(
        name: impl Into<String>,
        target: impl Into<String>,
        remote_key: impl Into<String>,
    ) -> Self {
        Self {
            kind: RelationKind::ReverseToOne,
            ..Self::to_many(name, target, remote_key)
        }
    }

    pub fn many_to_many(
        name: impl Into<String>,
        target: impl Into<String>,
        through: ThroughTable,
    ) -> Self {
        Self {
            name: name.into(),
            kind: RelationKind::ManyToMany,
            target: target.into(),
            local_key: "id".to_string(),
            remote_key: "id".to_string(),
            through: Some(through),
        }
    }

    /// Override the parent-side key
    pub fn with_local_key(mut self, local_key: impl Into<String>) -> Self {
        self.local_key = local_key.into();
        self
    }

    /// Override the related-side key
    pub fn with_remote_key(mut self, remote_key: impl Into<String>) -> Self {
        self.remote_key = remote_key.into();
        self
    }

    /// Validate the descriptor for consistency
    pub fn validate(&self) -> OrmResult<()> {
        if self.name.is_empty() || self.target.is_empty() {
            return Err(OrmError::Configuration(
                "Relation name and target cannot be empty".to_string(),
            ));
        }

        if self.local_key.is_empty() || self.remote_key.is_empty() {
            return Err(OrmError::Configuration(format!(
                "Relation '{}' must name both linking keys",
                self.name
            )));
        }

        match (&self.through, self.kind.requires_through()) {
            (Some(through), true) => through.validate(),
            (None, true) => Err(OrmError::Configuration(format!(
                "Relation '{}' of kind {:?} requires a through table",
                self.name, self.kind
            ))),
            (Some(_), false) => Err(OrmError::Configuration(format!(
                "Relation '{}' of kind {:?} cannot use a through table",
                self.name, self.kind
            ))),
            (None, false) => Ok(()),
        }
    }
}
