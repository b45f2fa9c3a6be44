//! The process-wide default container.
//!
//! Convenient for bootstrap code and for call sites that cannot be handed a
//! container. Everything else should take a `&Container` or `&Scope`.

use ambit_container::Container;
use once_cell::sync::Lazy;
use tracing::debug;

static GLOBAL_CONTAINER: Lazy<Container> = Lazy::new(|| {
    debug!("Initializing global container");
    Container::new()
});

/// Returns the global container, creating it on first access.
///
/// The application owns its teardown: call `global().dispose().await` at
/// shutdown. After that the global container rejects every registration
/// and resolve, like any disposed container.
///
/// # Examples
///
/// ```
/// use ambit::prelude::*;
///
/// let answer = Token::<u32>::new("Answer");
/// global().register_instance(&answer, 42u32).unwrap();
/// assert_eq!(*global().resolve(&answer).unwrap(), 42);
/// ```
pub fn global() -> &'static Container {
    &GLOBAL_CONTAINER
}
