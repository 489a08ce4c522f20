//! Error types for the prefetch system
//!
//! Every failure aborts the whole `FastQuery` execution. Nothing is retried and
//! no partially stitched result is ever handed back to the caller.

use thiserror::Error;

/// Result type alias for prefetch operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for query planning and execution
#[derive(Debug, Error)]
pub enum OrmError {
    /// Empty or syntactically invalid relation path
    #[error("Malformed relation path '{path}': {reason}")]
    MalformedPath { path: String, reason: String },

    /// Path segment that is not a relation of the entity in scope
    #[error("Unknown relation '{relation}' on entity '{entity}'")]
    UnknownRelation { entity: String, relation: String },

    /// Slice with a stride other than 1
    #[error("Unsupported slice step {step}: only unit-stride slices are supported")]
    UnsupportedSlice { step: i64 },

    /// Integer index past the end of the result
    #[error("Index {index} out of range")]
    IndexOutOfRange { index: usize },

    /// Failure reported by the backend, passed through untouched
    #[error("Backend fetch of '{entity}' failed: {source}")]
    BackendFetch {
        entity: String,
        #[source]
        source: anyhow::Error,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Query building error
    #[error("Query error: {0}")]
    Query(String),
}

impl OrmError {
    /// Shorthand for a malformed path error
    pub fn malformed_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        OrmError::MalformedPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for an unknown relation error
    pub fn unknown_relation(entity: impl Into<String>, relation: impl Into<String>) -> Self {
        OrmError::UnknownRelation {
            entity: entity.into(),
            relation: relation.into(),
        }
    }

    /// Wrap a backend failure for the given entity
    pub fn backend(entity: impl Into<String>, source: anyhow::Error) -> Self {
        OrmError::BackendFetch {
            entity: entity.into(),
            source,
        }
    }
}
