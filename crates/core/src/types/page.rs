//! Zero-based pagination.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Page parameters as received in a query string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    #[serde(default)]
    pub page: u32,
    #[serde(default = "default_size")]
    pub size: u32,
}

const fn default_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    #[must_use]
    pub const fn new(page: u32, size: u32) -> Self {
        Self { page, size }.clamped()
    }

    /// Size clamped to `1..=100`.
    #[must_use]
    pub const fn clamped(self) -> Self {
        let size = if self.size == 0 {
            1
        } else if self.size > MAX_PAGE_SIZE {
            MAX_PAGE_SIZE
        } else {
            self.size
        };
        Self {
            page: self.page,
            size,
        }
    }

    #[must_use]
    pub const fn limit(self) -> i64 {
        self.clamped().size as i64
    }

    #[must_use]
    pub const fn offset(self) -> i64 {
        self.page as i64 * self.limit()
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub total_pages: u32,
    pub total_elements: u64,
    pub size: u32,
    pub number: u32,
    pub first: bool,
    pub last: bool,
    pub empty: bool,
}

impl<T> Page<T> {
    #[must_use]
    pub fn new(content: Vec<T>, request: PageRequest, total_elements: u64) -> Self {
        let request = request.clamped();
        let total_pages =
            u32::try_from(total_elements.div_ceil(u64::from(request.size))).unwrap_or(u32::MAX);
        Self {
            empty: content.is_empty(),
            content,
            total_pages,
            total_elements,
            size: request.size,
            number: request.page,
            first: request.page == 0,
            last: request.page.saturating_add(1) >= total_pages,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            total_pages: self.total_pages,
            total_elements: self.total_elements,
            size: self.size,
            number: self.number,
            first: self.first,
            last: self.last,
            empty: self.empty,
        }
    }
}
