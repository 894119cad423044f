//! Pagination types shared by both paging strategies.

use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::config::{DEFAULT_PAGE_NUMBER, DEFAULT_PAGE_SIZE};

/// Largest offset or limit a store can bind as a signed 64-bit integer
const MAX_WINDOW_BOUND: u64 = i64::MAX as u64;

/// A clamped `(page, page_size)` window.
///
/// Caller input is never rejected: a page below 1 becomes 1 and a page size
/// below 1 becomes [`DEFAULT_PAGE_SIZE`]. Offset and limit never exceed
/// `i64::MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u64,
    page_size: u64,
}

impl PageRequest {
    pub fn new(page: i64, page_size: i64) -> Self {
        let page = if page < 1 { DEFAULT_PAGE_NUMBER } else { page as u64 };
        let page_size = if page_size < 1 {
            DEFAULT_PAGE_SIZE
        } else {
            page_size as u64
        };
        Self { page, page_size }
    }

    /// 1-based page number
    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Calculate offset for database query
    pub fn offset(&self) -> u64 {
        (self.page - 1)
            .saturating_mul(self.page_size)
            .min(MAX_WINDOW_BOUND)
    }

    pub fn limit(&self) -> u64 {
        self.page_size.min(MAX_WINDOW_BOUND)
    }

    /// Cut this window out of an already materialized sequence.
    pub fn slice<T>(&self, items: Vec<T>) -> Vec<T> {
        let skip = usize::try_from(self.offset()).unwrap_or(usize::MAX);
        let take = usize::try_from(self.limit()).unwrap_or(usize::MAX);
        items.into_iter().skip(skip).take(take).collect()
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE_NUMBER,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// `ceil(total / page_size)`, zero when there is nothing to page through.
pub fn total_pages(total: u64, page_size: u64) -> u64 {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(page_size)
}

/// One page of results plus the metadata needed to navigate the rest.
#[derive(Debug, Clone, PartialEq)]
pub struct PaginationResult<T> {
    content: Vec<T>,
    item_amount: u64,
    current_page: u64,
    page_size: u64,
}

/// Alias kept for callers that return pages from outward-facing handlers.
pub type PaginatedResult<T> = PaginationResult<T>;

impl<T> PaginationResult<T> {
    /// Wrap a page that was already sliced elsewhere.
    ///
    /// `item_amount` is the number of records matching the query, not the
    /// length of `content`. Content longer than the window is truncated.
    pub fn new(mut content: Vec<T>, item_amount: u64, request: PageRequest) -> Self {
        let cap = usize::try_from(request.page_size()).unwrap_or(usize::MAX);
        content.truncate(cap);
        Self {
            content,
            item_amount,
            current_page: request.page(),
            page_size: request.page_size(),
        }
    }

    /// Slice a fully materialized result set in memory.
    pub fn from_items(items: Vec<T>, request: PageRequest) -> Self {
        let item_amount = items.len() as u64;
        Self::new(request.slice(items), item_amount, request)
    }

    pub fn content(&self) -> &[T] {
        &self.content
    }

    pub fn into_content(self) -> Vec<T> {
        self.content
    }

    /// Total matching records across all pages
    pub fn item_amount(&self) -> u64 {
        self.item_amount
    }

    /// Alias of [`item_amount`](Self::item_amount)
    pub fn total_count(&self) -> u64 {
        self.item_amount
    }

    pub fn current_page(&self) -> u64 {
        self.current_page
    }

    /// Alias of [`current_page`](Self::current_page)
    pub fn page_number(&self) -> u64 {
        self.current_page
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    pub fn total_pages(&self) -> u64 {
        total_pages(self.item_amount, self.page_size)
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages()
    }

    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Project every item, e.g. entity to DTO, keeping the metadata.
    pub fn map<U, F>(self, f: F) -> PaginationResult<U>
    where
        F: FnMut(T) -> U,
    {
        PaginationResult {
            content: self.content.into_iter().map(f).collect(),
            item_amount: self.item_amount,
            current_page: self.current_page,
            page_size: self.page_size,
        }
    }
}

impl<T: Serialize> Serialize for PaginationResult<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("PaginationResult", 5)?;
        state.serialize_field("content", &self.content)?;
        state.serialize_field("item_amount", &self.item_amount)?;
        state.serialize_field("current_page", &self.current_page)?;
        state.serialize_field("page_size", &self.page_size)?;
        state.serialize_field("total_pages", &self.total_pages())?;
        state.end()
    }
}
