//! Entity configuration and the entity factory.
//!
//! Every entity is created by an [`EntityFactory`], which hands it a shared
//! [`EntityConfig`]. Applications either inject a factory explicitly or
//! install a process-wide one once at startup with
//! [`EntityFactory::install`]. Without an installed factory the defaults
//! apply: exclusive membership and no self-view hook.

use std::any::Any;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::entity::{Entity, EntityBuilder};
use crate::error::{AspectError, Result};

/// Optional collaborator that produces the zero-argument self-view.
///
/// When configured, `as_capability(&[])` returns
/// [`Assertion::Hooked`](crate::Assertion::Hooked) with the hook's value
/// instead of the plain entity view. Lookup results never depend on it.
pub type SelfViewHook = Arc<dyn Fn(&Entity) -> Box<dyn Any + Send + Sync> + Send + Sync>;

static GLOBAL_FACTORY: OnceCell<EntityFactory> = OnceCell::new();

/// Rule applied when an aspect that already belongs to one entity is
/// attached to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipPolicy {
    /// Reject the attachment with [`AspectError::ForeignAspect`].
    #[default]
    Exclusive,
    /// Allow it; the aspect's back-reference moves to the new entity.
    Permissive,
}

/// Configuration shared by all entities of one factory.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityConfig {
    /// Re-homing rule for aspects.
    pub membership: MembershipPolicy,
    /// Pre-allocated registry capacity.
    pub initial_capacity: usize,
    /// Self-view hook (never serialized).
    #[serde(skip)]
    pub self_view_hook: Option<SelfViewHook>,
}

impl Default for EntityConfig {
    fn default() -> Self {
        Self {
            membership: MembershipPolicy::Exclusive,
            initial_capacity: 8,
            self_view_hook: None,
        }
    }
}

impl fmt::Debug for EntityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityConfig")
            .field("membership", &self.membership)
            .field("initial_capacity", &self.initial_capacity)
            .field("self_view_hook", &self.self_view_hook.is_some())
            .finish()
    }
}

impl EntityConfig {
    /// Parse a configuration from YAML.
    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Parse a configuration from JSON.
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Load a configuration file; the extension selects the format.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(&content),
            Some("json") => Self::from_json(&content),
            _ => Err(AspectError::Config(format!(
                "unsupported configuration file: {}",
                path.display()
            ))),
        }
    }

    /// Attach a self-view hook (builder pattern).
    pub fn with_self_view_hook(
        mut self,
        hook: impl Fn(&Entity) -> Box<dyn Any + Send + Sync> + Send + Sync + 'static,
    ) -> Self {
        self.self_view_hook = Some(Arc::new(hook));
        self
    }

    /// Set the membership policy (builder pattern).
    pub fn with_membership(mut self, membership: MembershipPolicy) -> Self {
        self.membership = membership;
        self
    }
}

/// Creates entities that share one configuration.
#[derive(Debug, Clone, Default)]
pub struct EntityFactory {
    config: Arc<EntityConfig>,
}

impl EntityFactory {
    /// Create a factory for an explicit configuration.
    pub fn new(config: EntityConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Install the process-wide factory.
    ///
    /// Succeeds once, and only if nothing has used the global factory yet.
    pub fn install(config: EntityConfig) -> Result<()> {
        GLOBAL_FACTORY
            .set(Self::new(config))
            .map_err(|_| AspectError::FactoryAlreadyInstalled)
    }

    /// The process-wide factory, defaulted on first use.
    pub fn global() -> &'static EntityFactory {
        GLOBAL_FACTORY.get_or_init(EntityFactory::default)
    }

    /// The configuration handed to new entities.
    pub fn config(&self) -> &EntityConfig {
        &self.config
    }

    /// Create an empty entity.
    pub fn create(&self) -> Entity {
        Entity::with_config(Arc::clone(&self.config))
    }

    /// Start composing an entity.
    pub fn builder(&self) -> EntityBuilder {
        EntityBuilder::new(self.clone())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_defaults() {
        let config = EntityConfig::default();
        assert_eq!(config.membership, MembershipPolicy::Exclusive);
        assert_eq!(config.initial_capacity, 8);
        assert!(config.self_view_hook.is_none());
    }

    #[test]
    fn test_config_from_yaml_partial() {
        let config = EntityConfig::from_yaml("membership: permissive\n").unwrap();
        assert_eq!(config.membership, MembershipPolicy::Permissive);
        assert_eq!(config.initial_capacity, 8);
    }

    #[test]
    fn test_config_from_json() {
        let config =
            EntityConfig::from_json(r#"{"membership": "exclusive", "initial_capacity": 32}"#)
                .unwrap();
        assert_eq!(config.membership, MembershipPolicy::Exclusive);
        assert_eq!(config.initial_capacity, 32);
    }

    #[test]
    fn test_config_rejects_unknown_policy() {
        let err = EntityConfig::from_yaml("membership: sometimes\n").unwrap_err();
        assert!(matches!(err, AspectError::Yaml(_)));
    }

    #[test]
    fn test_config_from_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "membership: permissive").unwrap();
        writeln!(file, "initial_capacity: 2").unwrap();

        let config = EntityConfig::from_file(file.path()).unwrap();
        assert_eq!(config.membership, MembershipPolicy::Permissive);
        assert_eq!(config.initial_capacity, 2);
    }

    #[test]
    fn test_config_from_file_unknown_extension() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        let err = EntityConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, AspectError::Config(_)));
    }

    #[test]
    fn test_config_debug_hides_hook() {
        let config = EntityConfig::default().with_self_view_hook(|e| Box::new(e.id()));
        let rendered = format!("{:?}", config);
        assert!(rendered.contains("self_view_hook: true"));
    }

    #[test]
    fn test_global_factory_installs_once() {
        let _ = EntityFactory::install(EntityConfig::default());
        let second = EntityFactory::install(EntityConfig::default());
        assert!(matches!(second, Err(AspectError::FactoryAlreadyInstalled)));
        assert!(EntityFactory::global().config().self_view_hook.is_none());
    }

    #[test]
    fn test_factory_shares_config() {
        let factory = EntityFactory::new(
            EntityConfig::default().with_membership(MembershipPolicy::Permissive),
        );
        let a = factory.create();
        let b = factory.create();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.config().membership, MembershipPolicy::Permissive);
        assert_eq!(b.config().membership, MembershipPolicy::Permissive);
    }
}
