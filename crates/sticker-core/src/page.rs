//! Pagination primitives shared by the store and the query engine.

use serde::{Deserialize, Serialize};

/// A 1-based page request. `page == 0` or `size == 0` means "everything".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: usize,
    pub size: usize,
}

impl PageRequest {
    pub const fn new(page: usize, size: usize) -> Self {
        Self { page, size }
    }

    /// Request every matching item.
    pub const fn all() -> Self {
        Self { page: 0, size: 0 }
    }

    pub const fn is_unpaged(&self) -> bool {
        self.page == 0 || self.size == 0
    }

    /// Slice a fully ordered result set down to this page.
    pub fn apply<T>(&self, items: Vec<T>) -> ListResult<T> {
        let total = items.len();
        if self.is_unpaged() {
            return ListResult {
                page: 0,
                size: 0,
                total,
                items,
            };
        }
        let start = (self.page - 1).saturating_mul(self.size);
        let items = items.into_iter().skip(start).take(self.size).collect();
        ListResult {
            page: self.page,
            size: self.size,
            total,
            items,
        }
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResult<T> {
    pub page: usize,
    pub size: usize,
    /// Number of matching items across all pages.
    pub total: usize,
    pub items: Vec<T>,
}

impl<T> ListResult<T> {
    pub fn total_pages(&self) -> usize {
        if self.size == 0 {
            return usize::from(self.total > 0);
        }
        self.total.div_ceil(self.size)
    }

    pub fn has_next(&self) -> bool {
        self.page != 0 && self.page < self.total_pages()
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> ListResult<U> {
        ListResult {
            page: self.page,
            size: self.size,
            total: self.total,
            items: self.items.into_iter().map(f).collect(),
        }
    }
}
