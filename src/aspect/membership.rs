//! Back-reference from an aspect to its entity.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use super::Assertable;
use crate::capability::Descriptor;
use crate::entity::assertion::single_capability;
use crate::entity::{Assertion, Entity, EntityId, WeakEntity};
use crate::error::Result;

/// Embeddable back-reference holder.
///
/// Stores a non-owning reference to the entity the aspect was attached to,
/// and answers capability assertions on that entity's behalf so an aspect
/// can reach its siblings. A detached membership, or one whose entity has
/// been dropped, has no self-view: it answers [`Assertion::Absent`] to the
/// zero-argument form as well as to every capability.
#[derive(Default)]
pub struct Membership {
    entity: RwLock<Option<WeakEntity>>,
}

impl Membership {
    /// A detached membership.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `entity` as the owner.
    pub fn assign(&self, entity: &Entity) {
        *self.entity.write() = Some(entity.downgrade());
    }

    /// The owning entity, if assigned and still alive.
    pub fn entity(&self) -> Option<Entity> {
        self.entity.read().as_ref().and_then(WeakEntity::upgrade)
    }

    /// Identifier of the owning entity, if assigned.
    pub fn entity_id(&self) -> Option<EntityId> {
        self.entity.read().as_ref().map(WeakEntity::id)
    }

    /// Whether an entity has been assigned.
    pub fn is_assigned(&self) -> bool {
        self.entity.read().is_some()
    }

    /// Sibling aspect bound as capability `C`.
    pub fn get<C: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<C>> {
        self.entity()?.get::<C>()
    }
}

impl Assertable for Membership {
    /// Delegates to the owning entity. Without one there is no self-view,
    /// so `as_capability(&[])` is [`Assertion::Absent`] too.
    fn as_capability(&self, descriptors: &[&dyn Descriptor]) -> Result<Assertion> {
        match self.entity() {
            Some(entity) => entity.as_capability(descriptors),
            None => {
                single_capability(descriptors)?;
                Ok(Assertion::Absent)
            }
        }
    }
}

impl fmt::Debug for Membership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Membership")
            .field("entity", &self.entity_id())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
