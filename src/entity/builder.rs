//! Composing an entity from a batch of aspects.

use std::fmt;
use std::sync::Arc;

use super::registry::{Attachment, Entity};
use crate::aspect::Aspect;
use crate::config::EntityFactory;
use crate::error::Result;

/// Collects aspects and attaches them, in order, to a fresh entity.
///
/// Each aspect is attached as by [`Entity::attach`]: under its own type and
/// every capability it exposes. Two aspects exposing the same capability are
/// a [`ConflictingBinding`](crate::AspectError::ConflictingBinding). The
/// batch is checked as a whole first, so a failed build binds and notifies
/// nothing.
pub struct EntityBuilder {
    factory: EntityFactory,
    attachments: Vec<Attachment>,
}

impl EntityBuilder {
    pub(crate) fn new(factory: EntityFactory) -> Self {
        Self {
            factory,
            attachments: Vec::new(),
        }
    }

    /// Add an aspect (builder pattern).
    pub fn with<T: Aspect>(mut self, aspect: Arc<T>) -> Self {
        self.add(aspect);
        self
    }

    /// Add an aspect in place.
    pub fn add<T: Aspect>(&mut self, aspect: Arc<T>) -> &mut Self {
        self.attachments.push(Attachment::of(aspect));
        self
    }

    /// Number of aspects collected so far.
    pub fn len(&self) -> usize {
        self.attachments.len()
    }

    /// Whether no aspect has been added.
    pub fn is_empty(&self) -> bool {
        self.attachments.is_empty()
    }

    /// Create the entity and attach every collected aspect.
    pub fn build(self) -> Result<Entity> {
        let entity = self.factory.create();
        let count = self.attachments.len();
        entity.attach_batch(self.attachments)?;
        log::debug!(
            "{}: composed from {} aspects, {} capabilities",
            entity.id(),
            count,
            entity.len()
        );
        Ok(entity)
    }
}

impl fmt::Debug for EntityBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityBuilder")
            .field("factory", &self.factory)
            .field("aspects", &self.attachments.len())
            .finish()
    }
}

/// Compose an entity from a list of `Arc`ed aspects with the process-wide
/// factory.
///
/// ```
/// use std::sync::Arc;
/// use aspect::{entity, Aspect};
///
/// struct Person {
///     name: String,
/// }
///
/// impl Aspect for Person {}
///
/// let bob = Arc::new(Person { name: "Bob".into() });
/// let entity = entity![bob].unwrap();
/// assert_eq!(entity.get::<Person>().unwrap().name, "Bob");
/// ```
#[macro_export]
macro_rules! entity {
    ($($aspect:expr),* $(,)?) => {
        $crate::Entity::builder()$(.with($aspect))*.build()
    };
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
