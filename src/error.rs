//! Aspect composition errors.
//!
//! Registry errors are programmer errors: they abort the operation that
//! raised them and leave the entity unchanged. Absent capabilities are not
//! errors at lookup time; only the caller's narrowing step reports them.

use thiserror::Error;

/// Errors raised by entities, the attachment protocol and configuration.
#[derive(Debug, Error)]
pub enum AspectError {
    /// The capability is already bound to a different aspect instance.
    #[error("capability {capability} is already bound to a different aspect")]
    ConflictingBinding { capability: &'static str },

    /// A cast handed to the registry returned an object other than the aspect.
    #[error("cast of aspect {aspect} to {capability} returned a different object")]
    UnrelatedCast {
        aspect: &'static str,
        capability: &'static str,
    },

    /// More than one capability was asserted in a single call.
    #[error("cannot assert {count} capabilities at once; at most one is allowed")]
    InvalidMultiAssertion { count: usize },

    /// A type-erased descriptor did not carry a capability token.
    #[error("descriptor does not denote a capability: {found}")]
    NonCapabilityDescriptor { found: String },

    /// Narrowing failed because no aspect is bound to the capability.
    #[error("no aspect is bound to capability {capability}")]
    MissingCapability { capability: &'static str },

    /// Narrowing failed because the value does not provide the requested capability.
    #[error("aspect bound as {bound} does not provide capability {requested}")]
    MistypedCapability {
        requested: &'static str,
        bound: &'static str,
    },

    /// The aspect already belongs to another entity.
    #[error("aspect {capability} is already assigned to another entity")]
    ForeignAspect { capability: &'static str },

    /// The process-wide entity factory was installed twice.
    #[error("the process-wide entity factory is already installed")]
    FactoryAlreadyInstalled,

    /// Configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// YAML parsing failed.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AspectError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_capability() {
        let err = AspectError::ConflictingBinding { capability: "fixtures::Person" };
        assert!(err.to_string().contains("fixtures::Person"));

        let err = AspectError::MistypedCapability {
            requested: "dyn Apt",
            bound: "dyn Rentable",
        };
        assert_eq!(
            err.to_string(),
            "aspect bound as dyn Rentable does not provide capability dyn Apt"
        );
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: AspectError = io.into();
        assert!(matches!(err, AspectError::Io(_)));
    }
}
