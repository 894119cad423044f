//! Generic Repository - persistence access over SeaORM
//!
//! One type-parametrized repository provides CRUD, predicate queries,
//! related-entity loading, ordering and pagination for any entity, and a
//! Unit of Work groups repository operations into atomic transactions.
//!
//! # Layers
//!
//! - **config**: Connection settings and constants
//! - **domain**: The entity base contract
//! - **infra**: Database, generic repository, unit of work, store paging
//! - **types**: Pagination window and result types
//! - **errors**: Centralized error handling
//! - **cli** / **commands**: The `generic-repository` binary
//!
//! # Usage
//!
//! ```ignore
//! let db = Database::connect(&Config::from_env()).await?;
//! let uow = db.unit_of_work();
//!
//! uow.begin_transaction().await?;
//! let items = uow.repo::<item::Entity>();
//! items.add(item::Model { id: 4, name: "D".into() }).await?;
//! uow.save_changes().await?;
//! uow.commit_transaction().await?;
//!
//! let page = items
//!     .as_paginated(1, 20, QuerySpec::new().filter(item::Column::Name.starts_with("A")))
//!     .await?;
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod domain;
pub mod errors;
pub mod infra;
pub mod types;

// Re-export commonly used types at crate root
pub use config::Config;
pub use domain::BaseEntity;
pub use errors::{OptionExt, RepoError, RepoResult, StateViolation};
pub use infra::{Database, GenericRepository, Persistence, QuerySpec, TransactionState, UnitOfWork};
pub use types::{PageRequest, PaginatedResult, PaginationResult};
