//! Aspects and the attachment protocol.
//!
//! An aspect is any `Send + Sync + 'static` type implementing [`Aspect`]. When
//! attached to an entity it is registered under its own type, then under
//! every capability it reports through [`Aspect::exposed_aspects`]. After its
//! first binding to an entity it receives exactly one
//! [`Aspect::note_assigned_to`] call for that entity.
//!
//! Aspects that want to find their entity again embed a [`Membership`] and
//! return it from [`Aspect::membership`]; the default notification then
//! records the back-reference there.

pub mod membership;

use std::sync::Arc;

pub use membership::Membership;

use crate::capability::Descriptor;
use crate::entity::assertion::single_capability;
use crate::entity::registry::Binding;
use crate::entity::{Assertion, Entity, EntityId};
use crate::error::Result;

/// An object that can be composed into an entity.
pub trait Aspect: Send + Sync + 'static {
    /// Capabilities, beyond its own type, this aspect is bound under.
    fn exposed_aspects(_exposer: &mut Exposer<Self>)
    where
        Self: Sized,
    {
    }

    /// Back-reference holder, if the aspect keeps one.
    fn membership(&self) -> Option<&Membership> {
        None
    }

    /// Called once, after the aspect is first bound to `entity`.
    fn note_assigned_to(&self, entity: &Entity) {
        if let Some(membership) = self.membership() {
            membership.assign(entity);
        }
    }

    /// Live entity this aspect currently belongs to.
    ///
    /// An owner that has been dropped no longer counts, so the aspect can be
    /// attached elsewhere.
    fn assigned_entity(&self) -> Option<EntityId> {
        self.membership()
            .and_then(Membership::entity)
            .map(|entity| entity.id())
    }

    /// Assert zero or one capabilities on the entity this aspect belongs to.
    ///
    /// Answered through [`Aspect::membership`]. An aspect without one, or
    /// whose entity is gone, has no self-view and reports every capability
    /// as [`Assertion::Absent`].
    fn as_capability(&self, descriptors: &[&dyn Descriptor]) -> Result<Assertion> {
        match self.membership() {
            Some(membership) => membership.as_capability(descriptors),
            None => {
                single_capability(descriptors)?;
                Ok(Assertion::Absent)
            }
        }
    }
}

/// Collects the extra capabilities of an aspect of type `T`.
pub struct Exposer<T> {
    aspect: Arc<T>,
    bindings: Vec<Binding>,
}

impl<T: Aspect> Exposer<T> {
    pub(crate) fn new(aspect: Arc<T>) -> Self {
        Self {
            aspect,
            bindings: Vec::new(),
        }
    }

    /// Expose the aspect as capability `C`.
    ///
    /// `cast` receives the aspect and must return it coerced to `C`, which
    /// for a trait object is just `|aspect| aspect`. Returning any other
    /// object fails the attachment with
    /// [`UnrelatedCast`](crate::AspectError::UnrelatedCast).
    pub fn expose<C: ?Sized + Send + Sync + 'static>(
        &mut self,
        cast: impl FnOnce(Arc<T>) -> Arc<C>,
    ) -> &mut Self {
        let exposed = cast(Arc::clone(&self.aspect));
        self.bindings.push(Binding::new(exposed));
        self
    }

    /// The aspect being exposed.
    pub fn aspect(&self) -> &Arc<T> {
        &self.aspect
    }

    /// Number of capabilities exposed so far.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether nothing has been exposed.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub(crate) fn into_bindings(self) -> Vec<Binding> {
        self.bindings
    }
}

/// Anything that can be asked for a capability.
pub trait Assertable {
    /// Assert zero or one capabilities; see [`Entity::as_capability`].
    fn as_capability(&self, descriptors: &[&dyn Descriptor]) -> Result<Assertion>;
}

/// The entity-side surface used by wiring code.
pub trait Aspectual: Assertable {
    /// Bind `aspect` as capability `C`.
    fn add_aspect<C, T>(&self, aspect: &Arc<T>, cast: impl FnOnce(Arc<T>) -> Arc<C>) -> Result<()>
    where
        C: ?Sized + Send + Sync + 'static,
        T: Aspect;

    /// Bind `aspect` under its own type and its exposed capabilities.
    fn attach<T: Aspect>(&self, aspect: Arc<T>) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CapabilityId;
    use crate::error::AspectError;
    use crate::fixtures::*;
    use std::marker::PhantomData;

    #[test]
    fn test_exposer_collects_bindings() {
        let apt = apartment(2);
        let mut exposer = Exposer::new(Arc::clone(&apt));
        assert!(exposer.is_empty());
        Apartment::exposed_aspects(&mut exposer);
        assert_eq!(exposer.len(), 1);
        assert!(Arc::ptr_eq(exposer.aspect(), &apt));
    }

    #[test]
    fn test_default_aspect_has_no_membership() {
        let plain = Arc::new(Plain);
        assert!(plain.membership().is_none());
        assert!(plain.assigned_entity().is_none());

        let entity = Entity::new();
        entity.attach(Arc::clone(&plain)).unwrap();
        assert!(plain.assigned_entity().is_none());
        assert!(entity.contains::<Plain>());
    }

    #[test]
    fn test_aspectual_through_trait() {
        fn wire<E: Aspectual>(entity: &E, rental: Arc<Rental>) -> Result<()> {
            entity.attach(Arc::clone(&rental))?;
            entity.add_aspect::<dyn Priced, _>(&rental, |rental| rental)
        }

        let entity = Entity::new();
        let rental = rental(800.0);
        wire(&entity, Arc::clone(&rental)).unwrap();

        let priced = Assertable::as_capability(&entity, &[&PhantomData::<dyn Priced>])
            .unwrap()
            .narrow::<dyn Priced>()
            .unwrap();
        assert_eq!(priced.price(), 800.0);
        assert_eq!(rental.notifications(), 1);
    }

    #[test]
    fn test_aspect_asserts_its_siblings() {
        let bob = person("Bob");
        let player = chess_player(3);
        let _entity = Entity::builder()
            .with(Arc::clone(&bob))
            .with(Arc::clone(&player))
            .build()
            .unwrap();

        let sibling = bob
            .as_capability(&[&PhantomData::<ChessPlayer>])
            .unwrap()
            .narrow::<ChessPlayer>()
            .unwrap();
        assert!(Arc::ptr_eq(&sibling, &player));
        assert!(bob
            .as_capability(&[&PhantomData::<dyn Rentable>])
            .unwrap()
            .is_absent());
        assert_eq!(
            player
                .as_capability(&[])
                .unwrap()
                .narrow::<Person>()
                .unwrap()
                .name,
            "Bob"
        );
    }

    #[test]
    fn test_aspect_without_entity_has_no_self_view() {
        let detached = person("Alice");
        assert!(detached.as_capability(&[]).unwrap().is_absent());
        assert!(Plain
            .as_capability(&[&PhantomData::<Plain>])
            .unwrap()
            .is_absent());

        let apt = CapabilityId::of::<dyn Apt>();
        assert!(matches!(
            detached.as_capability(&[&apt, &apt]),
            Err(AspectError::InvalidMultiAssertion { count: 2 })
        ));
    }
}
