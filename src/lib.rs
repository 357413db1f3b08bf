//! # Aspect
//!
//! Aspect composition: assemble one logical entity out of several
//! independently defined implementation objects ("aspects") and later
//! retrieve any capability from it without knowing which object provides it.
//!
//! - [`capability`] derives stable registry keys from capability types.
//! - [`entity`] holds the registry itself, lookups and the builder.
//! - [`aspect`] defines the attachment protocol: exposure of extra
//!   capabilities and the one-time assignment notification.
//! - [`config`] carries entity configuration and the entity factory.
//!
//! ```
//! use std::sync::Arc;
//! use aspect::{Aspect, Entity, Exposer, Membership};
//!
//! trait Apt: Send + Sync {
//!     fn nbeds(&self) -> u32;
//! }
//!
//! struct Flat {
//!     membership: Membership,
//!     nbeds: u32,
//! }
//!
//! impl Apt for Flat {
//!     fn nbeds(&self) -> u32 {
//!         self.nbeds
//!     }
//! }
//!
//! impl Aspect for Flat {
//!     fn exposed_aspects(exposer: &mut Exposer<Self>) {
//!         exposer.expose::<dyn Apt>(|flat| flat);
//!     }
//!
//!     fn membership(&self) -> Option<&Membership> {
//!         Some(&self.membership)
//!     }
//! }
//!
//! let flat = Arc::new(Flat { membership: Membership::new(), nbeds: 2 });
//! let entity = Entity::builder().with(Arc::clone(&flat)).build().unwrap();
//!
//! assert_eq!(entity.get::<dyn Apt>().unwrap().nbeds(), 2);
//! assert_eq!(flat.membership.entity_id(), Some(entity.id()));
//! ```

pub mod aspect;
pub mod capability;
pub mod config;
pub mod entity;
pub mod error;

#[cfg(test)]
mod fixtures;

pub use aspect::{Aspect, Aspectual, Assertable, Exposer, Membership};
pub use capability::{CapabilityId, Descriptor, ErasedDescriptor};
pub use config::{EntityConfig, EntityFactory, MembershipPolicy, SelfViewHook};
pub use entity::{
    same_aspect, Assertion, BoundAspect, Entity, EntityBuilder, EntityId, WeakEntity,
};
pub use error::{AspectError, Result};
