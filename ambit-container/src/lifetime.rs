//! Service lifetimes.
//!
//! A lifetime decides how often a factory runs:
//! - [`Lifetime::Singleton`] — once per container (or per overriding scope)
//! - [`Lifetime::Scoped`] — once per [`Scope`](crate::scope::Scope); an error at the root
//! - [`Lifetime::Transient`] — on every resolve

use std::fmt;

use serde::{Deserialize, Serialize};

/// Defines the instance-reuse policy of a registration.
///
/// # Examples
/// ```
/// use ambit_container::lifetime::Lifetime;
///
/// assert_eq!(Lifetime::default(), Lifetime::Singleton);
/// assert!(!Lifetime::Transient.is_cached());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifetime {
    /// One instance per container.
    ///
    /// Built on first resolve and cached until the owning container is
    /// disposed. A scope with local overrides builds its own copy so the
    /// override reaches the singleton's dependencies.
    ///
    /// # When to use
    /// - Storage adapters
    /// - Configuration objects
    /// - Shared caches
    #[default]
    Singleton,

    /// One instance per scope.
    ///
    /// Resolving a scoped registration directly from the root container
    /// fails with [`AmbitError::ScopedServiceMisuse`](crate::error::AmbitError::ScopedServiceMisuse).
    ///
    /// # When to use
    /// - Per-render-tree or per-request state
    /// - Form state bound to one view
    Scoped,

    /// New instance on every resolve call. Never cached, never disposed
    /// by the container.
    ///
    /// # When to use
    /// - Lightweight stateless helpers
    /// - Objects with mutable state that must not be shared
    Transient,
}

impl Lifetime {
    /// Returns `true` if resolved instances are kept in a cache.
    #[inline]
    pub fn is_cached(&self) -> bool {
        matches!(self, Lifetime::Singleton | Lifetime::Scoped)
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifetime::Singleton => write!(f, "singleton"),
            Lifetime::Scoped => write!(f, "scoped"),
            Lifetime::Transient => write!(f, "transient"),
        }
    }
}
