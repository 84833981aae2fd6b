//! Error types for dependency injection

use crate::ServiceKey;
use std::fmt;
use thiserror::Error;

/// Ordered list of services that were being resolved when an error occurred.
///
/// The first entry is the service originally requested, the last one is the
/// service whose resolution failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionChain(Vec<ServiceKey>);

impl ResolutionChain {
    /// Create a chain from resolution-ordered keys
    #[inline]
    pub fn new(keys: Vec<ServiceKey>) -> Self {
        Self(keys)
    }

    /// Keys in resolution order
    #[inline]
    pub fn keys(&self) -> &[ServiceKey] {
        &self.0
    }

    /// Number of services in the chain
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the chain is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check whether a key takes part in the chain
    #[inline]
    pub fn contains(&self, key: &ServiceKey) -> bool {
        self.0.contains(key)
    }
}

impl fmt::Display for ResolutionChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<root>");
        }
        for (i, key) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{key}")?;
        }
        Ok(())
    }
}

/// Errors that can occur during dependency injection operations
#[derive(Error, Debug, Clone)]
pub enum DiError {
    /// No binding and no zero-configuration strategy exists for the service
    #[error("Unresolvable dependency: {key} (resolution chain: {chain})")]
    UnresolvableDependency {
        key: ServiceKey,
        chain: ResolutionChain,
    },

    /// The resolution chain revisited a service that is still being built
    #[error("Cyclic dependency detected: {chain}")]
    CyclicDependency { chain: ResolutionChain },

    /// A constructor parameter is a plain value with no binding
    #[error("Ambiguous construction of {service}: parameter {parameter} has no binding (resolution chain: {chain})")]
    AmbiguousConstruction {
        service: &'static str,
        parameter: &'static str,
        chain: ResolutionChain,
    },

    /// Factory failed to create service
    #[error("Failed to create service {type_name}: {reason}")]
    CreationFailed {
        type_name: &'static str,
        reason: String,
    },

    /// Stored instance does not hold the requested type
    #[error("Stored instance for {key} does not match the requested type")]
    TypeMismatch { key: ServiceKey },

    /// Container is locked and cannot be modified
    #[error("Container is locked - cannot register new services")]
    Locked,
}

impl DiError {
    /// Create an UnresolvableDependency error
    #[inline]
    pub fn unresolvable(key: ServiceKey, chain: ResolutionChain) -> Self {
        Self::UnresolvableDependency { key, chain }
    }

    /// Create a CyclicDependency error
    #[inline]
    pub fn cyclic(chain: ResolutionChain) -> Self {
        Self::CyclicDependency { chain }
    }

    /// Create a CreationFailed error
    #[inline]
    pub fn creation_failed<T: ?Sized + 'static>(reason: impl Into<String>) -> Self {
        Self::CreationFailed {
            type_name: std::any::type_name::<T>(),
            reason: reason.into(),
        }
    }

    /// Whether the error means "nothing is registered for this service".
    ///
    /// Optional dependencies swallow these and nothing else.
    #[inline]
    pub fn is_missing(&self) -> bool {
        matches!(
            self,
            Self::UnresolvableDependency { .. } | Self::AmbiguousConstruction { .. }
        )
    }
}

/// Result type alias for DI operations
pub type Result<T> = std::result::Result<T, DiError>;
