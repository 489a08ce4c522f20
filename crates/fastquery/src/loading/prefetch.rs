//! Prefetch descriptors
//!
//! A `Prefetch` names one relation to load, optionally overrides the query
//! used to load it, and lists further relations to load on the fetched rows.
//! Dotted paths such as `"user_set.groups"` are only sugar: they parse into
//! the same tree a caller would build by hand, and the executor never looks
//! at strings.

use crate::error::{OrmError, OrmResult};
use crate::query::QuerySpec;

/// Default separator between relation names in a path
pub const DEFAULT_SEPARATOR: &str = ".";

/// One relation to prefetch, with its nested relations
#[derive(Debug, Clone, PartialEq)]
pub struct Prefetch {
    relation: String,
    query: Option<QuerySpec>,
    nested: Vec<Prefetch>,
}

impl Prefetch {
    /// Prefetch `relation` using every row of its target entity
    pub fn new(relation: impl Into<String>) -> Self {
        Self {
            relation: relation.into(),
            query: None,
            nested: Vec::new(),
        }
    }

    /// Parse a dotted path with the default separator
    pub fn parse(path: &str) -> OrmResult<Self> {
        Self::parse_with(path, DEFAULT_SEPARATOR)
    }

    /// Parse a path such as `"a.b.c"` into a chain of nested descriptors
    ///
    /// A single trailing separator (`"groups."`) is accepted and means the
    /// relation is fetched with no further nesting.
    pub fn parse_with(path: &str, separator: &str) -> OrmResult<Self> {
        if path.is_empty() {
            return Err(OrmError::malformed_path(path, "path is empty"));
        }
        if separator.is_empty() {
            return Err(OrmError::Configuration(
                "Path separator cannot be empty".to_string(),
            ));
        }

        let mut segments: Vec<&str> = path.split(separator).collect();
        if segments.len() > 1 && segments.last() == Some(&"") {
            segments.pop();
        }

        for segment in &segments {
            if segment.is_empty() {
                return Err(OrmError::malformed_path(path, "path contains an empty segment"));
            }
            if segment.chars().any(char::is_whitespace) {
                return Err(OrmError::malformed_path(
                    path,
                    format!("segment '{}' contains whitespace", segment),
                ));
            }
        }

        let mut chain = segments.into_iter().rev().map(Prefetch::new);
        let leaf = chain
            .next()
            .ok_or_else(|| OrmError::malformed_path(path, "path has no segments"))?;

        Ok(chain.fold(leaf, |child, mut parent| {
            parent.nested.push(child);
            parent
        }))
    }

    /// Load the relation with `query` instead of every row of the target
    pub fn with_query(mut self, query: QuerySpec) -> Self {
        self.query = Some(query);
        self
    }

    /// Add a nested prefetch, merging with an existing one of the same name
    pub fn nested(mut self, child: Prefetch) -> Self {
        merge_into(&mut self.nested, child);
        self
    }

    pub fn relation(&self) -> &str {
        &self.relation
    }

    pub fn query(&self) -> Option<&QuerySpec> {
        self.query.as_ref()
    }

    pub fn children(&self) -> &[Prefetch] {
        &self.nested
    }

    /// Number of relation levels this descriptor spans, itself included
    pub fn depth(&self) -> usize {
        1 + self.nested.iter().map(Prefetch::depth).max().unwrap_or(0)
    }

    /// Merge another descriptor for the same relation into this one
    ///
    /// Children are merged recursively by relation name. An override query
    /// already present is kept; otherwise the other descriptor's is adopted.
    pub fn merge(&mut self, other: Prefetch) {
        debug_assert_eq!(self.relation, other.relation);
        if self.query.is_none() {
            self.query = other.query;
        }
        for child in other.nested {
            merge_into(&mut self.nested, child);
        }
    }
}

fn merge_into(list: &mut Vec<Prefetch>, prefetch: Prefetch) {
    match list.iter_mut().find(|existing| existing.relation == prefetch.relation) {
        Some(existing) => existing.merge(prefetch),
        None => list.push(prefetch),
    }
}

/// Anything `FastQuery::prefetch` accepts
#[derive(Debug, Clone, PartialEq)]
pub enum PrefetchTarget {
    Path(String),
    Descriptor(Prefetch),
}

impl PrefetchTarget {
    /// Resolve into a descriptor, parsing paths with `separator`
    pub fn into_prefetch(self, separator: &str) -> OrmResult<Prefetch> {
        match self {
            PrefetchTarget::Path(path) => Prefetch::parse_with(&path, separator),
            PrefetchTarget::Descriptor(prefetch) => Ok(prefetch),
        }
    }
}

impl From<&str> for PrefetchTarget {
    fn from(path: &str) -> Self {
        PrefetchTarget::Path(path.to_string())
    }
}

impl From<String> for PrefetchTarget {
    fn from(path: String) -> Self {
        PrefetchTarget::Path(path)
    }
}

impl From<Prefetch> for PrefetchTarget {
    fn from(prefetch: Prefetch) -> Self {
        PrefetchTarget::Descriptor(prefetch)
    }
}

/// Ordered top-level descriptors, deduplicated by relation name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrefetchSet {
    prefetches: Vec<Prefetch>,
}

impl PrefetchSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an include list such as `["groups.", "location.", "user_set.groups"]`
    pub fn from_paths<S: AsRef<str>>(paths: &[S], separator: &str) -> OrmResult<Self> {
        let mut set = Self::new();
        for path in paths {
            set.insert(Prefetch::parse_with(path.as_ref(), separator)?);
        }
        Ok(set)
    }

    /// Add a descriptor, merging with an existing one for the same relation
    pub fn insert(&mut self, prefetch: Prefetch) {
        merge_into(&mut self.prefetches, prefetch);
    }

    pub fn as_slice(&self) -> &[Prefetch] {
        &self.prefetches
    }

    pub fn len(&self) -> usize {
        self.prefetches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefetches.is_empty()
    }

    /// Deepest nesting among the registered descriptors
    pub fn depth(&self) -> usize {
        self.prefetches.iter().map(Prefetch::depth).max().unwrap_or(0)
    }
}
