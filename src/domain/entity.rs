//! Entity base contract.
//!
//! A repository can be built for any SeaORM entity whose model exposes an
//! identity value. Identity equality is the only thing the repository and
//! the change tracker rely on, so it is spelled out as a bound here rather
//! than inferred from the primary key type.

use std::fmt::Debug;
use std::hash::Hash;

use sea_orm::{EntityTrait, PrimaryKeyTrait};

/// A persisted record type with a unique, non-null identity.
///
/// ```ignore
/// impl BaseEntity for item::Entity {
///     type Id = i32;
///
///     fn id(model: &item::Model) -> i32 {
///         model.id
///     }
/// }
/// ```
pub trait BaseEntity: EntityTrait {
    /// Identity value, convertible into the primary key used for lookups
    type Id: Clone
        + Eq
        + Hash
        + Debug
        + Send
        + Sync
        + 'static
        + Into<<Self::PrimaryKey as PrimaryKeyTrait>::ValueType>;

    /// Identity of a loaded or staged model
    fn id(model: &Self::Model) -> Self::Id;
}

/// Table name of an entity, used in logs and error messages.
pub fn entity_name<E: EntityTrait>() -> String {
    E::default().table_name().to_string()
}
