//! Container configuration.
//!
//! Options are plain data and deserialize from any serde format, so an
//! application can keep them next to the rest of its settings.

use serde::{Deserialize, Serialize};

/// What a scope's plain `register` does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeRegistration {
    /// Forward to the parent, so the registration is visible to every scope
    /// sharing that ancestor. Instances stay scope-local either way.
    #[default]
    Delegate,
    /// Keep the registration private to the scope, shadowing ancestors.
    Local,
}

/// Settings shared by a root container and every scope below it.
///
/// # Examples
/// ```
/// use ambit_container::options::{ContainerOptions, ScopeRegistration};
///
/// let options = ContainerOptions::default();
/// assert!(options.allow_override);
/// assert_eq!(options.scope_registration, ScopeRegistration::Delegate);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerOptions {
    /// Let a later `register` replace an earlier one for the same token.
    /// When false, re-registration fails with `AlreadyRegistered`.
    pub allow_override: bool,
    pub scope_registration: ScopeRegistration,
    /// Cap on "did you mean?" hints in `NotRegistered` errors.
    pub max_suggestions: usize,
}

impl Default for ContainerOptions {
    fn default() -> Self {
        Self {
            allow_override: true,
            scope_registration: ScopeRegistration::Delegate,
            max_suggestions: 3,
        }
    }
}

impl ContainerOptions {
    pub fn allow_override(mut self, allow: bool) -> Self {
        self.allow_override = allow;
        self
    }

    pub fn scope_registration(mut self, policy: ScopeRegistration) -> Self {
        self.scope_registration = policy;
        self
    }

    pub fn max_suggestions(mut self, max: usize) -> Self {
        self.max_suggestions = max;
        self
    }
}
