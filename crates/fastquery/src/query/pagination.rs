//! Slice bounds applied to the base query before any prefetching

use std::ops::{Range, RangeFrom, RangeFull, RangeTo};

use super::builder::QuerySpec;
use crate::error::{OrmError, OrmResult};

/// Contiguous `[start:stop]` window over a query's result
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Slice {
    pub start: Option<usize>,
    pub stop: Option<usize>,
    pub step: Option<i64>,
}

impl Slice {
    pub fn new(start: Option<usize>, stop: Option<usize>) -> Self {
        Self {
            start,
            stop,
            step: None,
        }
    }

    /// Window holding only position `index`
    ///
    /// At `usize::MAX` the window is left open-ended, which selects the same
    /// (necessarily empty) set of rows.
    pub fn single(index: usize) -> Self {
        Self::new(Some(index), index.checked_add(1))
    }

    pub fn step(mut self, step: i64) -> Self {
        self.step = Some(step);
        self
    }

    /// Only unit-stride slices map onto an offset/limit at the storage layer
    pub fn validate(&self) -> OrmResult<()> {
        match self.step {
            None | Some(1) => Ok(()),
            Some(step) => Err(OrmError::UnsupportedSlice { step }),
        }
    }

    /// Whether the window cannot contain any row
    pub fn is_empty(&self) -> bool {
        matches!((self.start, self.stop), (Some(start), Some(stop)) if stop <= start)
            || self.stop == Some(0)
    }

    /// Compose the window with the offset/limit already on `query`
    pub fn apply_to(&self, mut query: QuerySpec) -> OrmResult<QuerySpec> {
        self.validate()?;

        let start = self.start.unwrap_or(0);
        let base_offset = query.offset_value.unwrap_or(0);
        let mut limit = self.stop.map(|stop| stop.saturating_sub(start));

        if let Some(base_limit) = query.limit_count {
            let remaining = base_limit.saturating_sub(start);
            limit = Some(limit.map_or(remaining, |l| l.min(remaining)));
        }

        // a window starting past the last addressable row selects nothing
        let Some(offset) = base_offset.checked_add(start) else {
            query.limit_count = Some(0);
            return Ok(query);
        };

        query.offset_value = (offset > 0).then_some(offset);
        query.limit_count = limit;
        Ok(query)
    }

    /// Apply the window to an already materialized sequence
    pub fn apply_to_slice<'a, T>(&self, items: &'a [T]) -> OrmResult<&'a [T]> {
        self.validate()?;
        let len = items.len();
        let start = self.start.unwrap_or(0).min(len);
        let stop = self.stop.unwrap_or(len).min(len).max(start);
        Ok(&items[start..stop])
    }
}

impl From<Range<usize>> for Slice {
    fn from(range: Range<usize>) -> Self {
        Slice::new(Some(range.start), Some(range.end))
    }
}

impl From<RangeFrom<usize>> for Slice {
    fn from(range: RangeFrom<usize>) -> Self {
        Slice::new(Some(range.start), None)
    }
}

impl From<RangeTo<usize>> for Slice {
    fn from(range: RangeTo<usize>) -> Self {
        Slice::new(None, Some(range.end))
    }
}

impl From<RangeFull> for Slice {
    fn from(_: RangeFull) -> Self {
        Slice::default()
    }
}
