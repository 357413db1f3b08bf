//! Capability key derivation.
//!
//! A capability is any `'static` type an aspect can be asked for: usually a
//! trait object such as `dyn Rentable`, or the aspect's own concrete type.
//! Its registry key is a [`CapabilityId`], derived from the type's
//! [`TypeId`]. Derivation is deterministic and allocation-free, and equal
//! types always yield equal keys no matter which descriptor form named them.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use crate::error::{AspectError, Result};

/// Stable identity token for a capability type.
///
/// Equality and hashing use the type identity only; the type name is kept
/// for diagnostics.
#[derive(Clone, Copy)]
pub struct CapabilityId {
    type_id: TypeId,
    name: &'static str,
}

impl CapabilityId {
    /// Derive the identifier of capability `C`.
    pub fn of<C: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<C>(),
            name: std::any::type_name::<C>(),
        }
    }

    /// Human-readable type name of the capability.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Underlying type identity.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }
}

impl PartialEq for CapabilityId {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for CapabilityId {}

impl Hash for CapabilityId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for CapabilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CapabilityId({})", self.name)
    }
}

impl fmt::Display for CapabilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Anything that names a capability.
///
/// Two forms are built in and normalise to the same key:
///
/// - a reified token, [`CapabilityId`];
/// - a zero-sized placeholder of the capability type, `PhantomData<C>`.
///
/// [`ErasedDescriptor`] covers values that arrive type-erased; resolving one
/// that does not hold a token fails with
/// [`AspectError::NonCapabilityDescriptor`].
///
/// ```
/// use std::marker::PhantomData;
/// use aspect::{CapabilityId, Descriptor};
///
/// trait Rentable {}
///
/// let token = CapabilityId::of::<dyn Rentable>();
/// let placeholder = PhantomData::<dyn Rentable>;
/// assert_eq!(token.capability_id().unwrap(), placeholder.capability_id().unwrap());
/// ```
pub trait Descriptor {
    /// Resolve this descriptor to its registry key.
    fn capability_id(&self) -> Result<CapabilityId>;
}

impl Descriptor for CapabilityId {
    fn capability_id(&self) -> Result<CapabilityId> {
        Ok(*self)
    }
}

impl<C: ?Sized + 'static> Descriptor for PhantomData<C> {
    fn capability_id(&self) -> Result<CapabilityId> {
        Ok(CapabilityId::of::<C>())
    }
}

/// A descriptor received as an arbitrary value.
///
/// Only a wrapped [`CapabilityId`] resolves.
pub struct ErasedDescriptor {
    value: Box<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl ErasedDescriptor {
    /// Wrap an arbitrary value for use as a descriptor.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            value: Box::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }
}

impl Descriptor for ErasedDescriptor {
    fn capability_id(&self) -> Result<CapabilityId> {
        match self.value.downcast_ref::<CapabilityId>() {
            Some(id) => Ok(*id),
            None => {
                log::error!("value of type {} used as a capability descriptor", self.type_name);
                Err(AspectError::NonCapabilityDescriptor {
                    found: self.type_name.to_string(),
                })
            }
        }
    }
}

impl fmt::Debug for ErasedDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErasedDescriptor")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
