//! Shared types.

mod pagination;

pub use pagination::{total_pages, PageRequest, PaginatedResult, PaginationResult};
