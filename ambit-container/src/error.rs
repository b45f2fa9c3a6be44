//! Error types for Ambit container operations.
//!
//! Every error names the token involved, by name and id, so a failed
//! resolve can be traced back to the registration that caused it.

use std::fmt;

use ambit_support::rendering::render_chain;

use crate::token::TokenKey;

/// Boxed foreign error, as returned by factories and dispose hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for all Ambit operations.
#[derive(Debug, thiserror::Error)]
pub enum AmbitError {
    /// Nothing was registered for the requested token.
    #[error("{}", .0)]
    NotRegistered(NotRegisteredError),

    /// The token is already being constructed further up this resolve call.
    #[error("{}", .0)]
    CircularDependency(CircularDependencyError),

    /// The factory returned an error.
    #[error("Failed to construct {token}: {source}")]
    ServiceCreation {
        token: TokenKey,
        #[source]
        source: BoxError,
    },

    /// A scoped registration was resolved from the root container.
    #[error(
        "Scoped service {token} cannot be resolved from the root container\n  Hint: resolve it through a scope created with .create_scope()"
    )]
    ScopedServiceMisuse { token: TokenKey },

    /// The container or scope was already disposed.
    #[error("{}", .0)]
    ContainerDisposed(ContainerDisposedError),

    /// Token already registered while overrides are disabled.
    #[error("{}", .0)]
    AlreadyRegistered(AlreadyRegisteredError),

    /// A cached value did not downcast to the token's type.
    #[error("Type mismatch for {token}: expected {expected}")]
    TypeMismatch {
        token: TokenKey,
        expected: &'static str,
    },
}

impl AmbitError {
    /// Returns the token this error is about, if any.
    pub fn token(&self) -> Option<&TokenKey> {
        match self {
            AmbitError::NotRegistered(e) => Some(&e.requested),
            AmbitError::CircularDependency(e) => e.chain.last(),
            AmbitError::ServiceCreation { token, .. }
            | AmbitError::ScopedServiceMisuse { token }
            | AmbitError::TypeMismatch { token, .. } => Some(token),
            AmbitError::ContainerDisposed(e) => e.token.as_ref(),
            AmbitError::AlreadyRegistered(e) => Some(&e.token),
        }
    }

    /// `true` when this is a `NotRegistered` for exactly `key`, as opposed to
    /// one raised by a dependency deeper in the graph.
    pub(crate) fn is_missing(&self, key: &TokenKey) -> bool {
        matches!(self, AmbitError::NotRegistered(e) if &e.requested == key)
    }

    pub(crate) fn not_registered(requested: TokenKey, suggestions: Vec<String>) -> Self {
        AmbitError::NotRegistered(NotRegisteredError {
            requested,
            required_by: None,
            suggestions,
        })
    }

    pub(crate) fn disposed(
        kind: ContainerKind,
        operation: &'static str,
        token: Option<&TokenKey>,
    ) -> Self {
        AmbitError::ContainerDisposed(ContainerDisposedError {
            kind,
            operation,
            token: token.cloned(),
        })
    }

    /// Maps an error returned by the factory for `token`.
    ///
    /// Ambit errors from nested resolves pass through so a cycle stays a
    /// cycle; a nested `NotRegistered` learns who required it. Anything else
    /// becomes `ServiceCreation`.
    pub(crate) fn from_factory(token: &TokenKey, error: BoxError) -> Self {
        match error.downcast::<AmbitError>() {
            Ok(inner) => match *inner {
                AmbitError::NotRegistered(mut e) => {
                    if e.required_by.is_none() {
                        e.required_by = Some(token.clone());
                    }
                    AmbitError::NotRegistered(e)
                }
                other => other,
            },
            Err(source) => AmbitError::ServiceCreation {
                token: token.clone(),
                source,
            },
        }
    }
}

/// Which kind of container raised an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Container,
    Scope,
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerKind::Container => write!(f, "container"),
            ContainerKind::Scope => write!(f, "scope"),
        }
    }
}

/// Error when a token has no registration and no instance.
#[derive(Debug)]
pub struct NotRegisteredError {
    /// The token that was requested
    pub requested: TokenKey,
    /// Whose factory asked for it (if it was a nested resolve)
    pub required_by: Option<TokenKey>,
    /// Names of registered tokens that look similar
    pub suggestions: Vec<String>,
}

impl fmt::Display for NotRegisteredError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Service not registered: {}", self.requested)?;

        if let Some(ref parent) = self.required_by {
            write!(f, "\n  Required by: {parent}")?;
        }

        if !self.suggestions.is_empty() {
            write!(f, "\n  Did you mean one of:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n    - {suggestion}")?;
            }
        }

        write!(
            f,
            "\n  Hint: register a factory or an instance for {} before resolving it",
            self.requested.name()
        )
    }
}

/// Error when a token is met again while it is still being constructed.
#[derive(Debug)]
pub struct CircularDependencyError {
    /// In-flight tokens from the first occurrence of the repeated token,
    /// ending with the repeat. Example: `[A, B, A]`.
    pub chain: Vec<TokenKey>,
}

impl fmt::Display for CircularDependencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.chain.iter().map(|k| k.to_string()).collect();
        write!(f, "Circular dependency detected:\n  {}", render_chain(&names))?;
        write!(
            f,
            "\n  Hint: break the cycle by resolving one side lazily or restructuring the services"
        )
    }
}

/// Error when a disposed container or scope is used.
#[derive(Debug)]
pub struct ContainerDisposedError {
    pub kind: ContainerKind,
    /// The rejected operation, e.g. `"resolve"`
    pub operation: &'static str,
    pub token: Option<TokenKey>,
}

impl fmt::Display for ContainerDisposedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cannot {} on a disposed {}", self.operation, self.kind)?;
        if let Some(ref token) = self.token {
            write!(f, " (token {token})")?;
        }
        Ok(())
    }
}

/// Error when registering a token that exists while overrides are disabled.
#[derive(Debug)]
pub struct AlreadyRegisteredError {
    pub token: TokenKey,
}

impl fmt::Display for AlreadyRegisteredError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Service already registered: {}", self.token)?;
        write!(
            f,
            "\n  Hint: enable allow_override in ContainerOptions to let the last registration win"
        )
    }
}

/// Convenient Result type for Ambit operations.
pub type Result<T> = std::result::Result<T, AmbitError>;
