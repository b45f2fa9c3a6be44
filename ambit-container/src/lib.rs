//! Core container implementation for Ambit DI.

mod cache;
pub mod container;
pub mod error;
pub mod lifetime;
pub mod options;
pub mod provider;
pub mod registry;
pub mod scope;
mod stack;
pub mod token;

pub use container::{Container, prelude};
pub use error::{AmbitError, BoxError, Result};
pub use lifetime::Lifetime;
pub use registry::{Disposable, Factory, Resolver};
pub use scope::{Parent, Scope};
pub use token::{Token, TokenKey, create_token};
