//! # The Container — root of the Ambit DI tree
//!
//! Holds every registration, the singleton cache and the scopes it has
//! spawned. Resolution and disposal for the whole tree start here.
//!
//! # Architecture
//! ```text
//! Container ──create_scope()──> Scope ──create_scope()──> Scope ...
//!     ▲                           │
//!     └──── delegates lookups ────┘
//! ```
//!
//! # Examples
//! ```rust
//! use ambit_container::prelude::*;
//! use once_cell::sync::Lazy;
//! use std::sync::Arc;
//!
//! trait Logger: Send + Sync {
//!     fn log(&self, msg: &str);
//! }
//!
//! struct ConsoleLogger;
//! impl Logger for ConsoleLogger {
//!     fn log(&self, msg: &str) { println!("{msg}"); }
//! }
//!
//! struct Greeter {
//!     logger: Arc<dyn Logger>,
//! }
//!
//! static LOGGER: Lazy<Token<dyn Logger>> = Lazy::new(|| Token::new("Logger"));
//! static GREETER: Lazy<Token<Greeter>> = Lazy::new(|| Token::new("Greeter"));
//!
//! let container = Container::new();
//! container
//!     .singleton(&LOGGER, Factory::shared(|_| Ok(Arc::new(ConsoleLogger) as Arc<dyn Logger>)))
//!     .expect("register logger");
//! container
//!     .transient(&GREETER, Factory::new(|r| Ok(Greeter { logger: r.resolve(&LOGGER)? })))
//!     .expect("register greeter");
//!
//! let a = container.resolve(&GREETER).expect("resolve");
//! let b = container.resolve(&GREETER).expect("resolve");
//! assert!(!Arc::ptr_eq(&a, &b));
//! assert!(Arc::ptr_eq(&a.logger, &b.logger));
//! ```

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use ambit_support::rendering::suggest_similar;
use futures::FutureExt;
use parking_lot::Mutex;
use tracing::{debug, info, instrument, trace, warn};

use crate::cache::{InstanceCache, dispose_instances};
use crate::error::{AmbitError, ContainerKind, Result};
use crate::lifetime::Lifetime;
use crate::options::ContainerOptions;
use crate::provider::Provider;
use crate::registry::{
    Binding, Disposable, Factory, Instance, Registration, Registry, Resolver, disposer, downcast,
    erase,
};
use crate::scope::{Parent, Scope};
use crate::stack::ResolutionStack;
use crate::token::{Token, TokenKey};

/// Root dependency injection container.
///
/// A cheap-to-clone handle; clones share the same registrations and caches.
/// Register services, resolve them by [`Token`], spawn [`Scope`]s for
/// isolated overrides, and [`dispose`](Container::dispose) at shutdown.
#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

struct ContainerInner {
    options: ContainerOptions,
    registry: Registry,
    instances: InstanceCache,
    stack: ResolutionStack,
    scopes: Mutex<Vec<Scope>>,
    disposed: AtomicBool,
}

impl Container {
    /// Creates an empty container with default options.
    pub fn new() -> Self {
        Self::with_options(ContainerOptions::default())
    }

    pub fn with_options(options: ContainerOptions) -> Self {
        debug!(?options, "Creating container");
        Self {
            inner: Arc::new(ContainerInner {
                options,
                registry: Registry::new(),
                instances: InstanceCache::new(),
                stack: ResolutionStack::new(),
                scopes: Mutex::new(Vec::new()),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    pub fn options(&self) -> &ContainerOptions {
        &self.inner.options
    }

    // ── Registration ──

    /// Registers `factory` for `token` with the given lifetime.
    ///
    /// Last write wins unless overrides are disabled in the options.
    pub fn register<T: ?Sized + Send + Sync + 'static>(
        &self,
        token: &Token<T>,
        factory: Factory<T>,
        lifetime: Lifetime,
    ) -> Result<()> {
        self.add_registration(factory.into_registration(token, lifetime))
    }

    /// Registers a singleton factory: built once, on first resolve.
    pub fn singleton<T: ?Sized + Send + Sync + 'static>(
        &self,
        token: &Token<T>,
        factory: Factory<T>,
    ) -> Result<()> {
        self.register(token, factory, Lifetime::Singleton)
    }

    /// Registers a scoped factory: built once per [`Scope`].
    pub fn scoped<T: ?Sized + Send + Sync + 'static>(
        &self,
        token: &Token<T>,
        factory: Factory<T>,
    ) -> Result<()> {
        self.register(token, factory, Lifetime::Scoped)
    }

    /// Registers a transient factory: built on every resolve.
    pub fn transient<T: ?Sized + Send + Sync + 'static>(
        &self,
        token: &Token<T>,
        factory: Factory<T>,
    ) -> Result<()> {
        self.register(token, factory, Lifetime::Transient)
    }

    /// Places a ready-made instance in the singleton cache. Resolving the
    /// token returns it without running any factory.
    pub fn register_instance<T: ?Sized + Send + Sync + 'static>(
        &self,
        token: &Token<T>,
        instance: impl Into<Arc<T>>,
    ) -> Result<()> {
        self.ensure_live("register_instance", Some(token.key()))?;
        debug!(token = %token, "Registered instance");
        self.inner
            .instances
            .insert_registered(token.key().clone(), erase(instance.into()), None);
        Ok(())
    }

    /// Like [`register_instance`](Container::register_instance), and the
    /// instance's [`Disposable`] impl runs when the container is disposed.
    pub fn register_disposable<T: ?Sized + Disposable + 'static>(
        &self,
        token: &Token<T>,
        instance: impl Into<Arc<T>>,
    ) -> Result<()> {
        self.ensure_live("register_instance", Some(token.key()))?;
        debug!(token = %token, "Registered disposable instance");
        self.inner.instances.insert_registered(
            token.key().clone(),
            erase(instance.into()),
            Some(disposer::<T>()),
        );
        Ok(())
    }

    /// Runs a [`Provider`] module against this container.
    pub fn install(&self, provider: &dyn Provider) -> Result<()> {
        self.ensure_live("install", None)?;
        let before = self.inner.registry.len();
        provider.register(self)?;
        info!(
            provider = provider.name(),
            added = self.inner.registry.len().saturating_sub(before),
            "Installed provider"
        );
        Ok(())
    }

    pub(crate) fn add_registration(&self, registration: Registration) -> Result<()> {
        self.ensure_live("register", Some(&registration.token))?;
        self.inner
            .registry
            .register(registration, self.inner.options.allow_override)
    }

    // ── Resolution ──

    /// Resolves the service for `token`, building it if needed.
    ///
    /// # Errors
    /// - [`AmbitError::NotRegistered`] — no registration or instance
    /// - [`AmbitError::CircularDependency`] — `token` is already being built
    /// - [`AmbitError::ServiceCreation`] — the factory failed or returned a future
    /// - [`AmbitError::ScopedServiceMisuse`] — `token` is scoped
    /// - [`AmbitError::ContainerDisposed`] — the container was disposed
    pub fn resolve<T: ?Sized + Send + Sync + 'static>(&self, token: &Token<T>) -> Result<Arc<T>> {
        let instance = self.resolve_erased(token.key())?;
        downcast(token, &instance)
    }

    /// Like [`resolve`](Container::resolve), but `Ok(None)` when nothing is
    /// registered for `token`. Cycles and disposal are still errors.
    pub fn try_resolve<T: ?Sized + Send + Sync + 'static>(
        &self,
        token: &Token<T>,
    ) -> Result<Option<Arc<T>>> {
        self.try_resolve_key(token.key())?
            .map(|instance| downcast(token, &instance))
            .transpose()
    }

    fn resolve_erased(&self, key: &TokenKey) -> Result<Instance> {
        self.ensure_live("resolve", Some(key))?;
        trace!(token = %key, "Resolving");

        if let Some(instance) = self.inner.instances.get(key) {
            trace!(token = %key, "Cache hit");
            return Ok(instance);
        }

        let registration = self
            .inner
            .registry
            .get(key)
            .ok_or_else(|| self.not_registered(key))?;

        match registration.lifetime {
            Lifetime::Scoped => Err(AmbitError::ScopedServiceMisuse { token: key.clone() }),
            Lifetime::Singleton => {
                let value = self.construct(&registration)?;
                Ok(self.inner.instances.get_or_insert_constructed(
                    key.clone(),
                    value,
                    registration.dispose.clone(),
                ))
            }
            Lifetime::Transient => self.construct(&registration),
        }
    }

    fn construct(&self, registration: &Registration) -> Result<Instance> {
        let _frame = self.inner.stack.enter(&registration.token)?;
        registration.construct(self)
    }

    fn not_registered(&self, key: &TokenKey) -> AmbitError {
        let suggestions = suggest_similar(
            key.name(),
            &self.known_names(),
            self.inner.options.max_suggestions,
        );
        AmbitError::not_registered(key.clone(), suggestions)
    }

    pub(crate) fn known_names(&self) -> Vec<String> {
        let mut names = self.inner.registry.names();
        names.extend(self.inner.instances.names());
        names
    }

    /// What this container holds for `key`, without building anything.
    pub(crate) fn lookup(&self, key: &TokenKey) -> Option<Binding> {
        if self.is_disposed() {
            return None;
        }
        if self.inner.instances.get_registered(key).is_some() {
            return Some(Binding::Instance);
        }
        self.inner.registry.get(key).map(Binding::Factory)
    }

    // ── Scopes ──

    /// Creates a child [`Scope`] and records it for cascading disposal.
    ///
    /// Scopes must be disposed: the container holds each one until
    /// [`Scope::dispose`] or [`Container::dispose`] runs, so dropping the
    /// returned handle does not release the scope or its cached instances.
    pub fn create_scope(&self) -> Result<Scope> {
        self.ensure_live("create_scope", None)?;
        let scope = Scope::new(Parent::Container(self.clone()), self.inner.options.clone());
        debug!(scope = scope.id(), "Created scope");
        self.inner.scopes.lock().push(scope.clone());
        Ok(scope)
    }

    pub(crate) fn detach_scope(&self, id: u64) {
        self.inner.scopes.lock().retain(|s| s.id() != id);
    }

    // ── Queries ──

    /// `true` if a registration or an instance exists for `token`.
    /// Reports `false` once disposed.
    pub fn is_registered<T: ?Sized>(&self, token: &Token<T>) -> bool {
        self.is_registered_key(token.key())
    }

    pub(crate) fn is_registered_key(&self, key: &TokenKey) -> bool {
        !self.is_disposed()
            && (self.inner.registry.contains(key) || self.inner.instances.contains(key))
    }

    /// `true` if an instance for `token` is cached right now.
    /// Reports `false` once disposed.
    pub fn has_instance<T: ?Sized>(&self, token: &Token<T>) -> bool {
        !self.is_disposed() && self.inner.instances.contains(token.key())
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    /// Number of registered factories.
    pub fn len(&self) -> usize {
        self.inner.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.registry.is_empty()
    }

    /// Number of live scopes spawned directly by this container.
    pub fn scope_count(&self) -> usize {
        self.inner.scopes.lock().len()
    }

    fn ensure_live(&self, operation: &'static str, token: Option<&TokenKey>) -> Result<()> {
        if self.is_disposed() {
            return Err(AmbitError::disposed(ContainerKind::Container, operation, token));
        }
        Ok(())
    }

    // ── Disposal ──

    /// Tears the container down.
    ///
    /// Disposes every spawned scope, then runs the dispose hooks of every
    /// cached instance, newest first, then drops all registrations. A
    /// failing scope or hook is logged and skipped. Calling it again is a
    /// no-op.
    #[instrument(skip(self), name = "container_dispose")]
    pub async fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::AcqRel) {
            debug!("Container already disposed");
            return;
        }

        let scopes = std::mem::take(&mut *self.inner.scopes.lock());
        let scope_count = scopes.len();
        for scope in scopes {
            let id = scope.id();
            if AssertUnwindSafe(scope.dispose()).catch_unwind().await.is_err() {
                warn!(scope = id, "Scope disposal panicked");
            }
        }

        let failures =
            dispose_instances(ContainerKind::Container, self.inner.instances.drain()).await;
        self.inner.registry.clear();

        info!(scopes = scope_count, failed_hooks = failures, "Container disposed");
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver for Container {
    fn resolve_key(&self, key: &TokenKey) -> Result<Instance> {
        self.resolve_erased(key)
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("registered", &self.inner.registry.len())
            .field("instances", &self.inner.instances.len())
            .field("scopes", &self.scope_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ═══════════════════════════════════════════
// Prelude
// ═══════════════════════════════════════════

pub mod prelude {
    pub use super::Container;
    pub use crate::error::{AmbitError, BoxError, Result};
    pub use crate::lifetime::Lifetime;
    pub use crate::options::{ContainerOptions, ScopeRegistration};
    pub use crate::provider::Provider;
    pub use crate::registry::{Disposable, Factory, Resolver};
    pub use crate::scope::{Parent, Scope};
    pub use crate::token::{Token, TokenKey, create_token};
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;
    use std::sync::atomic::{AtomicU32, AtomicUsize};

    struct Logger {
        calls: AtomicU32,
    }

    struct Greeter {
        logger: Arc<Logger>,
    }

    #[test]
    fn singleton_resolves_same_instance() {
        let token = Token::<Logger>::new("Logger");
        let container = Container::new();
        container
            .singleton(&token, Factory::new(|_| Ok(Logger { calls: AtomicU32::new(0) })))
            .unwrap();

        let a = container.resolve(&token).unwrap();
        let b = container.resolve(&token).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(container.has_instance(&token));
    }

    #[test]
    fn default_lifetime_is_singleton() {
        let token = Token::<u32>::new("n");
        let container = Container::new();
        container.register(&token, Factory::new(|_| Ok(1)), Lifetime::default()).unwrap();
        assert!(Arc::ptr_eq(&container.resolve(&token).unwrap(), &container.resolve(&token).unwrap()));
    }

    #[test]
    fn singleton_factory_called_once() {
        let counter = Arc::new(AtomicU32::new(0));
        let token = Token::<u32>::new("Counter");
        let container = Container::new();
        container
            .singleton(&token, Factory::new({
                let counter = counter.clone();
                move |_| Ok(counter.fetch_add(1, Ordering::SeqCst))
            }))
            .unwrap();

        for _ in 0..3 {
            container.resolve(&token).unwrap();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn transient_creates_new_each_time() {
        let counter = Arc::new(AtomicU32::new(0));
        let token = Token::<u32>::new("Ticket");
        let container = Container::new();
        container
            .transient(&token, Factory::new({
                let counter = counter.clone();
                move |_| Ok(counter.fetch_add(1, Ordering::SeqCst))
            }))
            .unwrap();

        let a = container.resolve(&token).unwrap();
        let b = container.resolve(&token).unwrap();
        assert_eq!((*a, *b), (0, 1));
        assert!(!Arc::ptr_eq(&a, &b));
        assert!(!container.has_instance(&token));
    }

    #[test]
    fn transients_share_singleton_dependency() {
        let logger = Token::<Logger>::new("Logger");
        let greeter = Token::<Greeter>::new("Greeter");
        let container = Container::new();
        container
            .singleton(&logger, Factory::new(|_| Ok(Logger { calls: AtomicU32::new(0) })))
            .unwrap();
        let dep = logger.clone();
        container
            .transient(&greeter, Factory::new(move |r| Ok(Greeter { logger: r.resolve(&dep)? })))
            .unwrap();

        let g1 = container.resolve(&greeter).unwrap();
        let g2 = container.resolve(&greeter).unwrap();
        assert!(!Arc::ptr_eq(&g1, &g2));
        assert!(Arc::ptr_eq(&g1.logger, &g2.logger));
        g1.logger.calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(g2.logger.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn register_instance_bypasses_factory() {
        let calls = Arc::new(AtomicUsize::new(0));
        let token = Token::<String>::new("Env");
        let container = Container::new();
        container
            .singleton(&token, Factory::new({
                let calls = calls.clone();
                move |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(String::from("factory"))
                }
            }))
            .unwrap();
        container.register_instance(&token, String::from("explicit")).unwrap();

        assert_eq!(*container.resolve(&token).unwrap(), "explicit");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn resolve_not_registered() {
        let registered = Token::<u32>::new("Logger");
        let missing = Token::<u32>::new("Loger");
        let container = Container::new();
        container.singleton(&registered, Factory::new(|_| Ok(1))).unwrap();

        match container.resolve(&missing).unwrap_err() {
            AmbitError::NotRegistered(e) => {
                assert_eq!(&e.requested, missing.key());
                assert_eq!(e.suggestions, vec!["Logger".to_string()]);
            }
            other => panic!("Expected NotRegistered, got: {other:?}"),
        }
    }

    #[test]
    fn try_resolve_absent_is_none() {
        let token = Token::<u32>::new("Optional");
        let container = Container::new();
        assert!(container.try_resolve(&token).unwrap().is_none());

        container.register_instance(&token, 5u32).unwrap();
        assert_eq!(container.try_resolve(&token).unwrap().as_deref(), Some(&5));
    }

    #[test]
    fn try_resolve_reports_missing_dependency() {
        let dep = Token::<u32>::new("Port");
        let token = Token::<String>::new("Url");
        let container = Container::new();
        let d = dep.clone();
        container
            .singleton(&token, Factory::new(move |r| Ok(format!("http://localhost:{}", r.resolve(&d)?))))
            .unwrap();

        let err = container.try_resolve(&token).unwrap_err();
        assert!(err.is_missing(dep.key()));
    }

    #[test]
    fn scoped_at_root_is_misuse() {
        let token = Token::<u32>::new("RequestId");
        let container = Container::new();
        container.scoped(&token, Factory::new(|_| Ok(1))).unwrap();

        let err = container.resolve(&token).unwrap_err();
        assert!(matches!(err, AmbitError::ScopedServiceMisuse { .. }));
        assert!(container.try_resolve(&token).is_err());
    }

    #[test]
    fn circular_dependency_detected_and_stack_cleared() {
        let a = Token::<u32>::new("A");
        let b = Token::<u32>::new("B");
        let container = Container::new();

        let (a2, b2) = (a.clone(), b.clone());
        container.singleton(&a, Factory::new(move |r| Ok(*r.resolve(&b2)? + 1))).unwrap();
        container.singleton(&b, Factory::new(move |r| Ok(*r.resolve(&a2)? + 1))).unwrap();

        match container.resolve(&a).unwrap_err() {
            AmbitError::CircularDependency(e) => {
                assert_eq!(e.chain, vec![a.key().clone(), b.key().clone(), a.key().clone()]);
            }
            other => panic!("Expected CircularDependency, got: {other:?}"),
        }
        assert!(matches!(
            container.resolve(&b).unwrap_err(),
            AmbitError::CircularDependency(_)
        ));
        assert_eq!(container.inner.stack.depth(), 0);

        // fix the cycle; the earlier failures left nothing behind
        container.singleton(&b, Factory::new(|_| Ok(10))).unwrap();
        assert_eq!(*container.resolve(&a).unwrap(), 11);
        assert_eq!(*container.resolve(&b).unwrap(), 10);
    }

    #[test]
    fn factory_error_wrapped_and_not_cached() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let token = Token::<u32>::new("Flaky");
        let container = Container::new();
        container
            .singleton(&token, Factory::new({
                let attempts = attempts.clone();
                move |_| {
                    if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(BoxError::from("not yet"))
                    } else {
                        Ok(3)
                    }
                }
            }))
            .unwrap();

        let err = container.resolve(&token).unwrap_err();
        assert!(matches!(err, AmbitError::ServiceCreation { .. }));
        assert!(!container.has_instance(&token));
        assert_eq!(*container.resolve(&token).unwrap(), 3);
    }

    #[test]
    fn deferred_factory_result_fails_fast() {
        type Deferred = std::pin::Pin<Box<dyn std::future::Future<Output = u32> + Send + Sync>>;

        let token = Token::<Deferred>::new("Deferred");
        let container = Container::new();
        container
            .singleton(&token, Factory::new(|_| Ok(Box::pin(async { 7u32 }) as Deferred)))
            .unwrap();

        let err = container.resolve(&token).err().unwrap();
        assert!(matches!(err, AmbitError::ServiceCreation { .. }));
        assert!(!container.has_instance(&token));
    }

    #[test]
    fn override_disabled_rejects_reregistration() {
        let token = Token::<u32>::new("n");
        let container = Container::with_options(ContainerOptions::default().allow_override(false));
        container.singleton(&token, Factory::new(|_| Ok(1))).unwrap();
        let err = container.singleton(&token, Factory::new(|_| Ok(2))).unwrap_err();
        assert!(matches!(err, AmbitError::AlreadyRegistered(_)));
    }

    #[test]
    fn unsized_service_tokens() {
        trait Validator: Send + Sync {
            fn valid(&self, input: &str) -> bool;
        }
        struct NonEmpty;
        impl Validator for NonEmpty {
            fn valid(&self, input: &str) -> bool {
                !input.trim().is_empty()
            }
        }

        let token = Token::<dyn Validator>::new("Validator");
        let container = Container::new();
        container
            .singleton(&token, Factory::shared(|_| Ok(Arc::new(NonEmpty) as Arc<dyn Validator>)))
            .unwrap();

        let validator = container.resolve(&token).unwrap();
        assert!(validator.valid("buy milk"));
        assert!(!validator.valid("   "));
    }

    #[test]
    fn install_provider() {
        struct Settings;
        impl Provider for Settings {
            fn register(&self, container: &Container) -> Result<()> {
                container.register_instance(&Token::<u32>::new("port"), 8080u32)?;
                container.singleton(&Token::<String>::new("host"), Factory::new(|_| Ok("localhost".into())))
            }
        }

        let container = Container::new();
        container.install(&Settings).unwrap();
        assert_eq!(container.len(), 1);
    }

    #[tokio::test]
    async fn disposed_container_rejects_everything() {
        let token = Token::<u32>::new("n");
        let container = Container::new();
        container.singleton(&token, Factory::new(|_| Ok(1))).unwrap();
        container.resolve(&token).unwrap();

        container.dispose().await;
        assert!(container.is_disposed());

        for err in [
            container.singleton(&token, Factory::new(|_| Ok(2))).unwrap_err(),
            container.register_instance(&token, 3u32).unwrap_err(),
            container.resolve(&token).unwrap_err(),
            container.try_resolve(&token).unwrap_err(),
            container.create_scope().unwrap_err(),
        ] {
            assert!(matches!(err, AmbitError::ContainerDisposed(_)), "got {err:?}");
        }
        assert!(!container.is_registered(&token));
        assert!(!container.has_instance(&token));

        // second dispose is a no-op
        container.dispose().await;
    }

    #[tokio::test]
    async fn dispose_runs_hooks_for_constructed_singletons_only() {
        let disposed = Arc::new(AtomicUsize::new(0));
        let single = Token::<u32>::new("single");
        let never_built = Token::<u32>::new("never-built");
        let transient = Token::<u32>::new("transient");
        let container = Container::new();

        let hook = |counter: Arc<AtomicUsize>| {
            move |_: &u32| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<(), BoxError>(())
            }
        };
        container
            .singleton(&single, Factory::new(|_| Ok(1)).on_dispose_sync(hook(disposed.clone())))
            .unwrap();
        container
            .singleton(&never_built, Factory::new(|_| Ok(2)).on_dispose_sync(hook(disposed.clone())))
            .unwrap();
        container
            .transient(&transient, Factory::new(|_| Ok(3)).on_dispose_sync(hook(disposed.clone())))
            .unwrap();

        container.resolve(&single).unwrap();
        container.resolve(&transient).unwrap();
        container.dispose().await;

        assert_eq!(disposed.load(Ordering::SeqCst), 1);
        assert!(container.is_empty());
    }

    #[tokio::test]
    async fn failing_hook_does_not_block_others() {
        let disposed = Arc::new(AtomicUsize::new(0));
        let bad = Token::<u32>::new("bad");
        let good = Token::<u32>::new("good");
        let container = Container::new();

        container
            .singleton(&good, Factory::new(|_| Ok(1)).on_dispose_sync({
                let disposed = disposed.clone();
                move |_| {
                    disposed.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }))
            .unwrap();
        container
            .singleton(&bad, Factory::new(|_| Ok(2)).on_dispose(|_| async {
                Err::<(), BoxError>(BoxError::from("close failed"))
            }))
            .unwrap();

        container.resolve(&good).unwrap();
        container.resolve(&bad).unwrap();
        container.dispose().await;

        assert_eq!(disposed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn debug_display() {
        let container = Container::new();
        container.register_instance(&Token::<u8>::new("a"), 1u8).unwrap();
        container.singleton(&Token::<u8>::new("b"), Factory::new(|_| Ok(2))).unwrap();

        let debug = format!("{container:?}");
        assert!(debug.contains("Container"));
        assert!(debug.contains("registered: 1"));
        assert!(debug.contains("instances: 1"));
    }
}
