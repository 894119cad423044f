//! Repository layer - Data access abstraction
//!
//! A single generic repository serves every entity type. Reads are composed
//! from a [`QuerySpec`]; writes are tracked and staged until the owning unit
//! of work saves.

mod generic;
mod query;
pub(crate) mod tracking;

pub use generic::GenericRepository;
pub use query::{QuerySpec, QueryStep};
