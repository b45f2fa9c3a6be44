//! Provider trait — a module of related registrations.
//!
//! Providers group the registrations of one concern (storage, validation,
//! dates...) so application bootstrap reads as a list of modules.
//!
//! # Examples
//! ```rust
//! use ambit_container::prelude::*;
//! use once_cell::sync::Lazy;
//!
//! static DATE_FORMAT: Lazy<Token<String>> = Lazy::new(|| Token::new("DateFormat"));
//!
//! struct DateProvider;
//!
//! impl Provider for DateProvider {
//!     fn register(&self, container: &Container) -> Result<()> {
//!         container.register_instance(&DATE_FORMAT, String::from("%Y-%m-%d"))
//!     }
//! }
//!
//! let container = Container::new();
//! container.install(&DateProvider).unwrap();
//! assert_eq!(*container.resolve(&DATE_FORMAT).unwrap(), "%Y-%m-%d");
//! ```

use crate::container::Container;
use crate::error::Result;

/// A module that registers related services into a container.
///
/// ```rust,ignore
/// container.install(&StorageProvider)?;
/// container.install(&ValidationProvider)?;
/// container.install(&TodoProvider)?;
/// ```
pub trait Provider: Send + Sync {
    /// Register services into `container`. Called once per install.
    fn register(&self, container: &Container) -> Result<()>;

    /// Human-readable name for logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}
