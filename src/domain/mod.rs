//! Domain layer - the contract every persisted type fulfils.

mod entity;

pub use entity::{entity_name, BaseEntity};
