//! Library-wide constants
//!
//! Centralized location for magic values to improve maintainability.

// =============================================================================
// Pagination
// =============================================================================

/// Default starting page number (1-indexed)
pub const DEFAULT_PAGE_NUMBER: u64 = 1;

/// Page size used when the caller asks for zero or a negative size
pub const DEFAULT_PAGE_SIZE: u64 = 10;

// =============================================================================
// Database
// =============================================================================

/// Default database connection URL (for development)
pub const DEFAULT_DATABASE_URL: &str = "sqlite::memory:";

/// Default upper bound of pooled connections
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Default lower bound of pooled connections
pub const DEFAULT_MIN_CONNECTIONS: u32 = 1;

/// Default connect timeout in seconds
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 8;

// =============================================================================
// Logging
// =============================================================================

/// Log filter used when `RUST_LOG` is not set
pub const DEFAULT_LOG_FILTER: &str = "info";
