//! Centralized error handling.
//!
//! Not-found is never an error for lookups: repositories return `Option`.
//! Everything that reaches this type is exceptional for the caller.

use thiserror::Error;

/// Repository and unit-of-work error types
#[derive(Error, Debug)]
pub enum RepoError {
    /// Only produced on request, via [`OptionExt::ok_or_not_found`]
    #[error("Resource not found")]
    NotFound,

    /// A single-result lookup matched more than one record
    #[error("More than one {entity} record matched a single-result lookup")]
    AmbiguousResult { entity: String },

    #[error("Invalid unit of work state: {0}")]
    StateViolation(#[from] StateViolation),

    /// Any failure reported by the store, passed through untouched
    #[error("Store error: {0}")]
    Store(#[from] sea_orm::DbErr),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Transaction lifecycle misuse
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateViolation {
    #[error("a transaction is already open")]
    TransactionAlreadyOpen,

    #[error("no transaction is open")]
    NoTransaction,

    #[error("the unit of work has been disposed")]
    Disposed,
}

impl RepoError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            RepoError::NotFound => "NOT_FOUND",
            RepoError::AmbiguousResult { .. } => "AMBIGUOUS_RESULT",
            RepoError::StateViolation(_) => "STATE_VIOLATION",
            RepoError::Store(_) => "STORE_FAILURE",
            RepoError::Config(_) => "CONFIG_ERROR",
            RepoError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn ambiguous(entity: impl Into<String>) -> Self {
        RepoError::AmbiguousResult {
            entity: entity.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        RepoError::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        RepoError::Internal(msg.into())
    }

    /// The state violation carried by this error, if any
    pub fn state_violation(&self) -> Option<StateViolation> {
        match self {
            RepoError::StateViolation(violation) => Some(*violation),
            _ => None,
        }
    }
}

/// Result type alias
pub type RepoResult<T> = Result<T, RepoError>;

/// Extension trait for Option -> RepoError conversion
pub trait OptionExt<T> {
    fn ok_or_not_found(self) -> RepoResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self) -> RepoResult<T> {
        self.ok_or(RepoError::NotFound)
    }
}
