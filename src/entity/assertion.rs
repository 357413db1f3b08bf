//! Results of capability assertions and their caller-side narrowing.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use super::registry::Entity;
use crate::capability::{CapabilityId, Descriptor};
use crate::error::{AspectError, Result};

/// An aspect as stored under one capability.
#[derive(Clone)]
pub struct BoundAspect {
    capability: CapabilityId,
    /// Holds an `Arc<C>` for the bound capability `C`.
    value: Arc<dyn Any + Send + Sync>,
}

impl BoundAspect {
    pub(crate) fn new(capability: CapabilityId, value: Arc<dyn Any + Send + Sync>) -> Self {
        Self { capability, value }
    }

    /// The capability this aspect was bound as.
    pub fn capability(&self) -> CapabilityId {
        self.capability
    }

    /// The aspect as capability `C`, if that is what it was bound as.
    pub fn downcast<C: ?Sized + 'static>(&self) -> Option<Arc<C>> {
        self.value.downcast_ref::<Arc<C>>().cloned()
    }
}

impl fmt::Debug for BoundAspect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BoundAspect({})", self.capability)
    }
}

/// Outcome of [`Assertable::as_capability`](crate::Assertable::as_capability).
pub enum Assertion {
    /// Zero descriptors: the entity itself, ready to be narrowed to any bound
    /// capability.
    View(Entity),
    /// Zero descriptors with a self-view hook configured: the hook's value.
    Hooked(Box<dyn Any + Send + Sync>),
    /// One descriptor: the aspect bound under it.
    Found(BoundAspect),
    /// One descriptor, nothing bound under it.
    Absent,
}

impl Assertion {
    /// Narrow the result to capability `C`.
    ///
    /// Fails with [`AspectError::MissingCapability`] when nothing is bound and
    /// with [`AspectError::MistypedCapability`] when the value was bound as a
    /// different capability.
    pub fn narrow<C: ?Sized + Send + Sync + 'static>(self) -> Result<Arc<C>> {
        let requested = CapabilityId::of::<C>();
        match self {
            Assertion::Found(bound) => {
                bound
                    .downcast::<C>()
                    .ok_or_else(|| AspectError::MistypedCapability {
                        requested: requested.name(),
                        bound: bound.capability().name(),
                    })
            }
            Assertion::View(entity) => narrow_view::<C>(&entity),
            Assertion::Hooked(value) => {
                if let Some(entity) = value.downcast_ref::<Entity>() {
                    return narrow_view::<C>(entity);
                }
                value
                    .downcast::<Arc<C>>()
                    .map(|aspect| *aspect)
                    .map_err(|_| AspectError::MistypedCapability {
                        requested: requested.name(),
                        bound: "self-view hook value",
                    })
            }
            Assertion::Absent => Err(AspectError::MissingCapability {
                capability: requested.name(),
            }),
        }
    }

    /// Whether a single-capability lookup found nothing.
    pub fn is_absent(&self) -> bool {
        matches!(self, Assertion::Absent)
    }

    /// The bound aspect, for single-capability lookups that found one.
    pub fn into_bound(self) -> Option<BoundAspect> {
        match self {
            Assertion::Found(bound) => Some(bound),
            _ => None,
        }
    }

    /// The entity, for plain self-views.
    pub fn into_entity(self) -> Option<Entity> {
        match self {
            Assertion::View(entity) => Some(entity),
            _ => None,
        }
    }
}

impl fmt::Debug for Assertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Assertion::View(entity) => f.debug_tuple("View").field(&entity.id()).finish(),
            Assertion::Hooked(_) => f.write_str("Hooked"),
            Assertion::Found(bound) => f.debug_tuple("Found").field(bound).finish(),
            Assertion::Absent => f.write_str("Absent"),
        }
    }
}

fn narrow_view<C: ?Sized + Send + Sync + 'static>(entity: &Entity) -> Result<Arc<C>> {
    entity.get::<C>().ok_or_else(|| AspectError::MissingCapability {
        capability: CapabilityId::of::<C>().name(),
    })
}

/// Enforce the zero-or-one arity of an assertion and resolve the descriptor.
pub(crate) fn single_capability(descriptors: &[&dyn Descriptor]) -> Result<Option<CapabilityId>> {
    match descriptors {
        [] => Ok(None),
        [descriptor] => descriptor.capability_id().map(Some),
        _ => {
            log::error!("attempt to assert {} capabilities at once", descriptors.len());
            Err(AspectError::InvalidMultiAssertion {
                count: descriptors.len(),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
