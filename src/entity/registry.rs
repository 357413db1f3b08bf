//! The capability registry.
//!
//! An entity maps capability identifiers to the aspects bound under them.
//! Bindings are write-once per key: re-binding the same aspect is a no-op,
//! binding a different one is a [`AspectError::ConflictingBinding`]. Nothing
//! is ever unbound.
//!
//! Entities are cheap handles (`Arc`) over one shared registry, so aspects
//! can keep a non-owning [`WeakEntity`] back-reference to the entity they
//! were attached to.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use super::assertion::{single_capability, Assertion, BoundAspect};
use super::builder::EntityBuilder;
use crate::aspect::{Aspect, Aspectual, Assertable, Exposer};
use crate::capability::{CapabilityId, Descriptor};
use crate::config::{EntityConfig, EntityFactory, MembershipPolicy};
use crate::error::{AspectError, Result};

// ---------------------------------------------------------------------------
// Identities
// ---------------------------------------------------------------------------

static ENTITY_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Process-unique entity identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u64);

impl EntityId {
    fn next() -> Self {
        Self(ENTITY_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity#{}", self.0)
    }
}

/// Identity of an aspect instance: the data address of its allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct AspectIdentity(usize);

impl AspectIdentity {
    pub(crate) fn of<T: ?Sized>(aspect: &Arc<T>) -> Self {
        Self(Arc::as_ptr(aspect) as *const () as usize)
    }
}

/// One registry entry: an aspect coerced to the capability it is bound as.
#[derive(Clone)]
pub(crate) struct Binding {
    pub(crate) identity: AspectIdentity,
    pub(crate) bound: BoundAspect,
}

impl Binding {
    pub(crate) fn new<C: ?Sized + Send + Sync + 'static>(aspect: Arc<C>) -> Self {
        Self {
            identity: AspectIdentity::of(&aspect),
            bound: BoundAspect::new(CapabilityId::of::<C>(), Arc::new(aspect)),
        }
    }

    fn capability(&self) -> CapabilityId {
        self.bound.capability()
    }
}

/// An aspect together with every binding it is about to receive.
pub(crate) struct Attachment {
    aspect: Arc<dyn Aspect>,
    name: &'static str,
    identity: AspectIdentity,
    bindings: Vec<Binding>,
}

impl Attachment {
    /// The aspect under its own type and every capability it exposes.
    pub(crate) fn of<T: Aspect>(aspect: Arc<T>) -> Self {
        let mut exposer = Exposer::new(Arc::clone(&aspect));
        T::exposed_aspects(&mut exposer);
        let mut bindings = vec![Binding::new(Arc::clone(&aspect))];
        bindings.extend(exposer.into_bindings());
        Self::with_bindings(aspect, bindings)
    }

    fn with_bindings<T: Aspect>(aspect: Arc<T>, bindings: Vec<Binding>) -> Self {
        Self {
            identity: AspectIdentity::of(&aspect),
            name: std::any::type_name::<T>(),
            aspect,
            bindings,
        }
    }

    /// Every binding must point at the aspect itself.
    fn check_bindings(&self) -> Result<()> {
        match self
            .bindings
            .iter()
            .find(|binding| binding.identity != self.identity)
        {
            Some(binding) => {
                log::error!(
                    "cast of {} to {} returned a different object",
                    self.name,
                    binding.capability()
                );
                Err(AspectError::UnrelatedCast {
                    aspect: self.name,
                    capability: binding.capability().name(),
                })
            }
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

struct Registry {
    bindings: HashMap<CapabilityId, Binding>,
    /// Aspects already notified of their assignment to this entity.
    members: HashSet<AspectIdentity>,
}

struct EntityInner {
    id: EntityId,
    config: Arc<EntityConfig>,
    registry: RwLock<Registry>,
}

/// A composed entity.
///
/// Cloning yields another handle to the same registry; equality is identity.
///
/// ```
/// use std::sync::Arc;
/// use aspect::{Aspect, Entity, Exposer};
///
/// trait Rentable: Send + Sync {
///     fn rate(&self) -> f32;
/// }
///
/// struct Flat {
///     rate: f32,
/// }
///
/// impl Rentable for Flat {
///     fn rate(&self) -> f32 {
///         self.rate
///     }
/// }
///
/// impl Aspect for Flat {
///     fn exposed_aspects(exposer: &mut Exposer<Self>) {
///         exposer.expose::<dyn Rentable>(|flat| flat);
///     }
/// }
///
/// let entity = Entity::builder().with(Arc::new(Flat { rate: 950.0 })).build().unwrap();
/// assert_eq!(entity.get::<dyn Rentable>().unwrap().rate(), 950.0);
/// assert!(entity.get::<Flat>().is_some());
/// ```
#[derive(Clone)]
pub struct Entity {
    inner: Arc<EntityInner>,
}

/// Non-owning back-reference to an entity.
#[derive(Clone)]
pub struct WeakEntity {
    id: EntityId,
    inner: Weak<EntityInner>,
}

impl WeakEntity {
    /// Identifier of the referenced entity, even if it has been dropped.
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Recover a strong handle if the entity is still alive.
    pub fn upgrade(&self) -> Option<Entity> {
        self.inner.upgrade().map(|inner| Entity { inner })
    }
}

impl fmt::Debug for WeakEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WeakEntity({})", self.id)
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::new()
    }
}

impl Entity {
    /// Create an empty entity from the process-wide factory.
    pub fn new() -> Self {
        EntityFactory::global().create()
    }

    /// Start composing an entity with the process-wide factory.
    pub fn builder() -> EntityBuilder {
        EntityFactory::global().builder()
    }

    pub(crate) fn with_config(config: Arc<EntityConfig>) -> Self {
        let registry = Registry {
            bindings: HashMap::with_capacity(config.initial_capacity),
            members: HashSet::new(),
        };
        Self {
            inner: Arc::new(EntityInner {
                id: EntityId::next(),
                config,
                registry: RwLock::new(registry),
            }),
        }
    }

    /// This entity's identifier.
    pub fn id(&self) -> EntityId {
        self.inner.id
    }

    /// Configuration this entity was created with.
    pub fn config(&self) -> &EntityConfig {
        &self.inner.config
    }

    /// Non-owning back-reference.
    pub fn downgrade(&self) -> WeakEntity {
        WeakEntity {
            id: self.inner.id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    // --- Introspection ---

    /// Number of bound capabilities.
    pub fn len(&self) -> usize {
        self.inner.registry.read().bindings.len()
    }

    /// Whether nothing is bound yet.
    pub fn is_empty(&self) -> bool {
        self.inner.registry.read().bindings.is_empty()
    }

    /// Number of distinct aspects attached.
    pub fn aspect_count(&self) -> usize {
        self.inner.registry.read().members.len()
    }

    /// Whether capability `C` is bound.
    pub fn contains<C: ?Sized + 'static>(&self) -> bool {
        self.contains_id(CapabilityId::of::<C>())
    }

    /// Whether the capability with this identifier is bound.
    pub fn contains_id(&self, capability: CapabilityId) -> bool {
        self.inner.registry.read().bindings.contains_key(&capability)
    }

    /// Names of all bound capabilities, sorted.
    pub fn capabilities(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self
            .inner
            .registry
            .read()
            .bindings
            .keys()
            .map(CapabilityId::name)
            .collect();
        names.sort_unstable();
        names
    }

    // --- Lookup ---

    /// The aspect bound as capability `C`, if any.
    pub fn get<C: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<C>> {
        self.lookup(CapabilityId::of::<C>())
            .and_then(|bound| bound.downcast::<C>())
    }

    /// The binding stored under `capability`, if any.
    pub fn lookup(&self, capability: CapabilityId) -> Option<BoundAspect> {
        let found = self
            .inner
            .registry
            .read()
            .bindings
            .get(&capability)
            .map(|binding| binding.bound.clone());
        log::trace!(
            "{} lookup {}: {}",
            self.inner.id,
            capability,
            if found.is_some() { "hit" } else { "miss" }
        );
        found
    }

    /// Assert zero or one capabilities.
    ///
    /// With no descriptor the result is the self-view; with one, the bound
    /// aspect or [`Assertion::Absent`]; more than one is an
    /// [`AspectError::InvalidMultiAssertion`].
    pub fn as_capability(&self, descriptors: &[&dyn Descriptor]) -> Result<Assertion> {
        Ok(match single_capability(descriptors)? {
            None => self.self_view(),
            Some(capability) => match self.lookup(capability) {
                Some(bound) => Assertion::Found(bound),
                None => Assertion::Absent,
            },
        })
    }

    fn self_view(&self) -> Assertion {
        match &self.inner.config.self_view_hook {
            Some(hook) => Assertion::Hooked(hook(self)),
            None => Assertion::View(self.clone()),
        }
    }

    // --- Attachment ---

    /// Bind `aspect` as capability `C`.
    ///
    /// `cast` must return the aspect itself, coerced to `C`; any other object
    /// is an [`AspectError::UnrelatedCast`]. The aspect is notified of its
    /// assignment the first time it is bound to this entity.
    pub fn add_aspect<C, T>(&self, aspect: &Arc<T>, cast: impl FnOnce(Arc<T>) -> Arc<C>) -> Result<()>
    where
        C: ?Sized + Send + Sync + 'static,
        T: Aspect,
    {
        let binding = Binding::new(cast(Arc::clone(aspect)));
        self.attach_batch(vec![Attachment::with_bindings(
            Arc::clone(aspect),
            vec![binding],
        )])
    }

    /// Bind `aspect` under its own type.
    pub fn add_aspect_self<T: Aspect>(&self, aspect: &Arc<T>) -> Result<()> {
        self.add_aspect::<T, T>(aspect, |aspect| aspect)
    }

    /// Attach `aspect` under its own type and every capability it exposes.
    ///
    /// All keys are checked before any is bound, so a failed attachment
    /// leaves the entity unchanged.
    pub fn attach<T: Aspect>(&self, aspect: Arc<T>) -> Result<()> {
        self.attach_batch(vec![Attachment::of(aspect)])
    }

    /// Bind a batch of aspects, all or nothing.
    ///
    /// Every key of every aspect is checked, against the registry and
    /// against the rest of the batch, before anything is bound. Notifications
    /// go out in batch order once the lock is released.
    pub(crate) fn attach_batch(&self, batch: Vec<Attachment>) -> Result<()> {
        for attachment in &batch {
            attachment.check_bindings()?;
            self.check_membership(attachment)?;
        }

        let assigned = {
            let mut registry = self.inner.registry.write();
            let mut staged: HashMap<CapabilityId, AspectIdentity> = HashMap::new();
            for binding in batch.iter().flat_map(|attachment| &attachment.bindings) {
                let capability = binding.capability();
                let holder = registry
                    .bindings
                    .get(&capability)
                    .map(|existing| existing.identity)
                    .or_else(|| staged.get(&capability).copied());
                match holder {
                    Some(holder) if holder != binding.identity => {
                        log::error!(
                            "{}: capability {} already bound to a different aspect",
                            self.inner.id,
                            capability
                        );
                        return Err(AspectError::ConflictingBinding {
                            capability: capability.name(),
                        });
                    }
                    Some(_) => {}
                    None => {
                        staged.insert(capability, binding.identity);
                    }
                }
            }

            let mut assigned = Vec::new();
            for attachment in batch {
                for binding in attachment.bindings {
                    if let Entry::Vacant(slot) = registry.bindings.entry(binding.capability()) {
                        log::debug!("{}: bound {}", self.inner.id, binding.capability());
                        slot.insert(binding);
                    }
                }
                if registry.members.insert(attachment.identity) {
                    assigned.push(attachment.aspect);
                }
            }
            assigned
        };

        // Lock released: the callbacks may query this entity.
        for aspect in assigned {
            aspect.note_assigned_to(self);
        }
        Ok(())
    }

    fn check_membership(&self, attachment: &Attachment) -> Result<()> {
        let owner = match attachment.aspect.assigned_entity() {
            Some(owner) if owner != self.inner.id => owner,
            _ => return Ok(()),
        };
        let capability = attachment.name;
        match self.inner.config.membership {
            MembershipPolicy::Exclusive => {
                log::error!(
                    "{}: aspect {} already belongs to {}",
                    self.inner.id,
                    capability,
                    owner
                );
                Err(AspectError::ForeignAspect { capability })
            }
            MembershipPolicy::Permissive => {
                log::warn!(
                    "{}: re-homing aspect {} from {}",
                    self.inner.id,
                    capability,
                    owner
                );
                Ok(())
            }
        }
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Entity {}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.inner.id)
            .field("capabilities", &self.capabilities())
            .finish()
    }
}

impl Assertable for Entity {
    fn as_capability(&self, descriptors: &[&dyn Descriptor]) -> Result<Assertion> {
        Entity::as_capability(self, descriptors)
    }
}

impl Aspectual for Entity {
    fn add_aspect<C, T>(&self, aspect: &Arc<T>, cast: impl FnOnce(Arc<T>) -> Arc<C>) -> Result<()>
    where
        C: ?Sized + Send + Sync + 'static,
        T: Aspect,
    {
        Entity::add_aspect(self, aspect, cast)
    }

    fn attach<T: Aspect>(&self, aspect: Arc<T>) -> Result<()> {
        Entity::attach(self, aspect)
    }
}

/// Compare two handles by the aspect they point at.
pub fn same_aspect<A: ?Sized, B: ?Sized>(a: &Arc<A>, b: &Arc<B>) -> bool {
    AspectIdentity::of(a) == AspectIdentity::of(b)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
