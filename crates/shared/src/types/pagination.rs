//! Offset pagination types for stream endpoints.

use serde::{Deserialize, Serialize};

/// Request parameters for offset-paginated queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetPage {
    /// Maximum number of items to return.
    #[serde(default = "default_limit")]
    pub limit: u64,
    /// Number of items to skip.
    #[serde(default)]
    pub offset: u64,
}

fn default_limit() -> u64 {
    50
}

/// Upper bound applied to caller-supplied limits.
pub const MAX_PAGE_LIMIT: u64 = 500;

impl Default for OffsetPage {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            offset: 0,
        }
    }
}

impl OffsetPage {
    /// Creates a page request, clamping the limit to `1..=MAX_PAGE_LIMIT`.
    #[must_use]
    pub fn new(limit: u64, offset: u64) -> Self {
        Self {
            limit: limit.clamp(1, MAX_PAGE_LIMIT),
            offset,
        }
    }
}

/// One page of a stream, with an offset token for the next page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamPage<T> {
    /// Number of items in this page.
    pub count: u64,
    /// Offset of the next page; only present when this page was full.
    pub next_offset: Option<u64>,
    /// The items in the current page.
    pub items: Vec<T>,
}

impl<T> StreamPage<T> {
    /// Builds a page from the items returned for `page`.
    ///
    /// A full page means more rows may follow, so `next_offset` becomes
    /// `offset + returned_count`. A short page ends the stream.
    #[must_use]
    pub fn new(items: Vec<T>, page: OffsetPage) -> Self {
        let count = items.len() as u64;
        let next_offset = (count == page.limit).then(|| page.offset + count);
        Self {
            count,
            next_offset,
            items,
        }
    }
}

#[cfg(test)]
#[path = "pagination_tests.rs"]
mod tests;
