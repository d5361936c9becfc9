//! Page-number pagination over ordered querysets.
//!
//! Listings are sliced into fixed-size pages selected by a `page` query
//! parameter. Unparsable or missing values fall back to page 1; values past
//! the end clamp to the last page, so a stale bookmark still renders.

use serde::Serialize;

/// Offset window handed to a repository listing query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: u32,
    pub offset: u64,
}

/// One rendered page of an ordered listing.
#[derive(Debug, Clone, Serialize)]
pub struct PageSlice<T> {
    pub items: Vec<T>,
    pub number: u32,
    pub total_pages: u32,
    pub total_items: u64,
}

impl<T> PageSlice<T> {
    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.total_pages
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    page_size: u32,
}

impl Paginator {
    pub fn new(page_size: u32) -> Self {
        Self {
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Total pages for a collection; an empty collection still has one page.
    pub fn total_pages(&self, total_items: u64) -> u32 {
        let size = u64::from(self.page_size);
        let pages = total_items.div_ceil(size).max(1);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    /// Resolve the raw `page` parameter against the collection size.
    pub fn resolve(&self, raw: Option<&str>, total_items: u64) -> u32 {
        let requested = raw
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .and_then(|value| value.parse::<u32>().ok())
            .filter(|page| *page >= 1)
            .unwrap_or(1);
        requested.min(self.total_pages(total_items))
    }

    /// Offset window for a resolved page number.
    pub fn window(&self, page: u32) -> PageRequest {
        let offset = u64::from(page.saturating_sub(1)) * u64::from(self.page_size);
        PageRequest {
            limit: self.page_size,
            offset,
        }
    }

    /// Assemble a page slice from fetched items and the collection size.
    pub fn slice<T>(&self, items: Vec<T>, page: u32, total_items: u64) -> PageSlice<T> {
        PageSlice {
            items,
            number: page,
            total_pages: self.total_pages(total_items),
            total_items,
        }
    }
}
