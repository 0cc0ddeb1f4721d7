//! Error types for the relic system.
//!
//! Uses `thiserror` for ergonomic error definition with rich context.

use std::fmt;

use thiserror::Error;

use crate::key::Key;

/// Result alias used throughout relic.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for relic operations.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional context about where the error occurred.
    pub context: Option<ErrorContext>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Adds context to this error.
    #[must_use]
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Creates an invalid-definition error.
    #[must_use]
    pub fn invalid_definition(reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidDefinition(reason.into()))
    }

    /// Creates an already-registered error.
    #[must_use]
    pub fn already_registered(name: impl Into<String>) -> Self {
        Self::new(ErrorKind::AlreadyRegistered(name.into()))
    }

    /// Creates an unknown-resource error.
    #[must_use]
    pub fn unknown_resource(name: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownResource(name.into()))
    }

    /// Creates a missing-key error.
    #[must_use]
    pub fn missing_key(resource: impl Into<String>, id_attribute: impl Into<String>) -> Self {
        Self::new(ErrorKind::MissingKey {
            resource: resource.into(),
            id_attribute: id_attribute.into(),
        })
    }

    /// Creates a record-not-found error.
    #[must_use]
    pub fn record_not_found(resource: impl Into<String>, key: Key) -> Self {
        Self::new(ErrorKind::RecordNotFound {
            resource: resource.into(),
            key,
        })
    }

    /// Creates a validation-failed error.
    #[must_use]
    pub fn validation_failed(resource: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::ValidationFailed {
            resource: resource.into(),
            reason: reason.into(),
        })
    }

    /// Creates a hook-failed error.
    #[must_use]
    pub fn hook_failed(
        hook: impl Into<String>,
        resource: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::new(ErrorKind::HookFailed {
            hook: hook.into(),
            resource: resource.into(),
            reason: reason.into(),
        })
    }

    /// Creates an unknown-relation error.
    #[must_use]
    pub fn unknown_relation(resource: impl Into<String>, relation: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownRelation {
            resource: resource.into(),
            relation: relation.into(),
        })
    }

    /// Creates a relation-fetch error.
    #[must_use]
    pub fn relation_fetch(relation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::RelationFetch {
            relation: relation.into(),
            reason: reason.into(),
        })
    }

    /// Creates an adapter error.
    #[must_use]
    pub fn adapter(reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::Adapter(reason.into()))
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal(reason.into()))
    }
}

/// Categorized error kinds for pattern matching.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// Registration input was malformed.
    #[error("invalid definition: {0}")]
    InvalidDefinition(String),

    /// A resource with this name is already registered.
    #[error("resource already registered: {0}")]
    AlreadyRegistered(String),

    /// The named resource is not registered.
    #[error("unknown resource: {0}")]
    UnknownResource(String),

    /// A record lacked a usable primary key.
    #[error("record for {resource} is missing key attribute {id_attribute}")]
    MissingKey {
        /// The resource the record was destined for.
        resource: String,
        /// The configured id attribute.
        id_attribute: String,
    },

    /// The keyed record is not in the store.
    #[error("no record {key} in {resource}")]
    RecordNotFound {
        /// The resource that was queried.
        resource: String,
        /// The key that was looked up.
        key: Key,
    },

    /// A validate hook rejected the attributes.
    #[error("validation failed for {resource}: {reason}")]
    ValidationFailed {
        /// The resource being validated.
        resource: String,
        /// The rejection reason.
        reason: String,
    },

    /// A non-validate lifecycle hook reported failure.
    #[error("hook {hook} failed for {resource}: {reason}")]
    HookFailed {
        /// Name of the failing hook.
        hook: String,
        /// The resource the pipeline was running for.
        resource: String,
        /// The failure reason.
        reason: String,
    },

    /// A relation name was requested that the definition does not declare.
    #[error("no relation {relation} declared on {resource}")]
    UnknownRelation {
        /// The resource whose definition was consulted.
        resource: String,
        /// The undeclared relation name.
        relation: String,
    },

    /// A named relation failed to load.
    #[error("failed to load relation {relation}: {reason}")]
    RelationFetch {
        /// The relation that failed.
        relation: String,
        /// The underlying failure.
        reason: String,
    },

    /// The named method is not attached to the resource.
    #[error("no method {method} on {resource}")]
    UnknownMethod {
        /// The resource whose capability table was consulted.
        resource: String,
        /// The missing method name.
        method: String,
    },

    /// Opaque failure passed through from the adapter layer.
    #[error("adapter error: {0}")]
    Adapter(String),

    /// Internal error (should not happen).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Context about where an error occurred.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// Resource the operation was running against.
    pub resource: Option<String>,
    /// Operation name (inject, eject, digest, ...).
    pub operation: Option<String>,
    /// Record key involved, rendered for display.
    pub key: Option<String>,
}

impl ErrorContext {
    /// Creates a new empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the resource name.
    #[must_use]
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Sets the operation name.
    #[must_use]
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// Sets the record key.
    #[must_use]
    pub fn with_key(mut self, key: &Key) -> Self {
        self.key = Some(key.to_string());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(operation) = &self.operation {
            write!(f, "during {operation}")?;
        }
        if let Some(resource) = &self.resource {
            write!(f, " on {resource}")?;
        }
        if let Some(key) = &self.key {
            write!(f, " [{key}]")?;
        }
        Ok(())
    }
}
