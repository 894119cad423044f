//! Infrastructure layer - Store access
//!
//! This module handles all persistence concerns:
//! - Database connections
//! - The generic repository and its query builder
//! - Store-level pagination
//! - Unit of Work for transaction management

pub mod db;
pub mod paging;
pub mod repositories;
pub(crate) mod session;
pub mod unit_of_work;

pub use db::Database;
pub use repositories::{GenericRepository, QuerySpec, QueryStep};
pub use session::TransactionState;
pub use unit_of_work::{Persistence, UnitOfWork};
