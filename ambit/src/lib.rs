//! # Ambit — token-based dependency injection for Rust
//!
//! Register services against [`Token`]s with a [`Lifetime`], resolve them
//! from a [`Container`] or from a [`Scope`] that overrides part of the
//! graph, and dispose the whole tree asynchronously at shutdown.
//!
//! ```rust
//! use ambit::prelude::*;
//!
//! let greeting = Token::<String>::new("Greeting");
//!
//! let container = Container::new();
//! container.register_instance(&greeting, String::from("hello")).unwrap();
//!
//! let scope = container.create_scope().unwrap();
//! scope.register_instance(&greeting, String::from("hi")).unwrap();
//!
//! assert_eq!(*container.resolve(&greeting).unwrap(), "hello");
//! assert_eq!(*scope.resolve(&greeting).unwrap(), "hi");
//! ```

mod global;

pub use ambit_container::*;
pub use ambit_support::rendering;
pub use global::global;

pub mod prelude {
    pub use crate::global::global;
    pub use ambit_container::prelude::*;
}
