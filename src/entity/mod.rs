//! Entities: capability registries composed from aspects.
//!
//! An [`Entity`] maps capability identifiers to the aspects that provide
//! them. Aspects are attached one at a time with [`Entity::attach`] /
//! [`Entity::add_aspect`], or in a batch through the [`EntityBuilder`] and the
//! [`entity!`](crate::entity!) macro. Lookups come back either typed
//! ([`Entity::get`]) or as an [`Assertion`] the caller narrows.

pub mod assertion;
pub mod builder;
pub mod registry;

pub use assertion::{Assertion, BoundAspect};
pub use builder::EntityBuilder;
pub use registry::{same_aspect, Entity, EntityId, WeakEntity};
