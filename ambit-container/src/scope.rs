//! Scopes — child containers that can override their ancestors.
//!
//! A [`Scope`] answers from its own instances and factories first, then
//! from its parent. Once it holds any override of its own, it rebuilds
//! ancestor-registered services with *itself* as the resolver, so the
//! override reaches dependencies buried inside other factories.
//!
//! Resolution order for a token:
//! 1. the scope's own instance cache
//! 2. the scope's own factories (`register_local`)
//! 3. an ancestor's factory, rebuilt here, if the scope has overrides or the
//!    registration is [`Lifetime::Scoped`]; cached here unless transient
//! 4. otherwise the parent's own `resolve`

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use ambit_support::rendering::suggest_similar;
use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::cache::{InstanceCache, dispose_instances};
use crate::container::Container;
use crate::error::{AmbitError, ContainerKind, Result};
use crate::lifetime::Lifetime;
use crate::options::{ContainerOptions, ScopeRegistration};
use crate::registry::{
    Binding, Disposable, Factory, Instance, Registration, Registry, Resolver, disposer, downcast,
    erase,
};
use crate::stack::ResolutionStack;
use crate::token::{Token, TokenKey};

static NEXT_SCOPE_ID: AtomicU64 = AtomicU64::new(1);

/// The container or scope a [`Scope`] was created from.
#[derive(Clone, Debug)]
pub enum Parent {
    Container(Container),
    Scope(Scope),
}

impl Parent {
    fn register(&self, registration: Registration) -> Result<()> {
        match self {
            Parent::Container(c) => c.add_registration(registration),
            Parent::Scope(s) => s.add_registration(registration),
        }
    }

    fn resolve_key(&self, key: &TokenKey) -> Result<Instance> {
        match self {
            Parent::Container(c) => c.resolve_key(key),
            Parent::Scope(s) => s.resolve_key(key),
        }
    }

    fn lookup(&self, key: &TokenKey) -> Option<Binding> {
        match self {
            Parent::Container(c) => c.lookup(key),
            Parent::Scope(s) => s.lookup(key),
        }
    }

    fn is_registered(&self, key: &TokenKey) -> bool {
        match self {
            Parent::Container(c) => c.is_registered_key(key),
            Parent::Scope(s) => s.is_registered_key(key),
        }
    }

    fn known_names(&self) -> Vec<String> {
        match self {
            Parent::Container(c) => c.known_names(),
            Parent::Scope(s) => s.known_names(),
        }
    }

    fn detach(&self, id: u64) {
        match self {
            Parent::Container(c) => c.detach_scope(id),
            Parent::Scope(s) => s.inner.children.lock().retain(|child| child.id() != id),
        }
    }
}

/// A child container with its own instances and optional overrides.
///
/// Cheap to clone; clones are the same scope. A scope stays reachable from
/// its parent until it is disposed, either directly or by the parent.
#[derive(Clone)]
pub struct Scope {
    inner: Arc<ScopeInner>,
}

struct ScopeInner {
    id: u64,
    parent: Parent,
    options: ContainerOptions,
    registry: Registry,
    instances: InstanceCache,
    stack: ResolutionStack,
    children: Mutex<Vec<Scope>>,
    disposed: AtomicBool,
}

impl Scope {
    pub(crate) fn new(parent: Parent, options: ContainerOptions) -> Self {
        Self {
            inner: Arc::new(ScopeInner {
                id: NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed),
                parent,
                options,
                registry: Registry::new(),
                instances: InstanceCache::new(),
                stack: ResolutionStack::new(),
                children: Mutex::new(Vec::new()),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    /// Process-unique scope id, used in logs.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn parent(&self) -> &Parent {
        &self.inner.parent
    }

    // ── Registration ──

    /// Registers `factory` for `token`.
    ///
    /// With the default [`ScopeRegistration::Delegate`] policy this forwards
    /// to the parent (and on up to the root), so the registration is seen by
    /// sibling scopes too. Use [`register_local`](Scope::register_local) for
    /// a scope-private factory.
    pub fn register<T: ?Sized + Send + Sync + 'static>(
        &self,
        token: &Token<T>,
        factory: Factory<T>,
        lifetime: Lifetime,
    ) -> Result<()> {
        self.add_registration(factory.into_registration(token, lifetime))
    }

    /// Registers a factory visible only to this scope and its descendants,
    /// shadowing any ancestor registration for `token`.
    pub fn register_local<T: ?Sized + Send + Sync + 'static>(
        &self,
        token: &Token<T>,
        factory: Factory<T>,
        lifetime: Lifetime,
    ) -> Result<()> {
        self.ensure_live("register", Some(token.key()))?;
        self.inner.registry.register(
            factory.into_registration(token, lifetime),
            self.inner.options.allow_override,
        )
    }

    fn add_registration(&self, registration: Registration) -> Result<()> {
        self.ensure_live("register", Some(&registration.token))?;
        match self.inner.options.scope_registration {
            ScopeRegistration::Delegate => {
                trace!(scope = self.id(), token = %registration.token, "Delegating registration to parent");
                self.inner.parent.register(registration)
            }
            ScopeRegistration::Local => self
                .inner
                .registry
                .register(registration, self.inner.options.allow_override),
        }
    }

    /// Places `instance` in this scope only, shadowing whatever an ancestor
    /// would return for `token`.
    pub fn register_instance<T: ?Sized + Send + Sync + 'static>(
        &self,
        token: &Token<T>,
        instance: impl Into<Arc<T>>,
    ) -> Result<()> {
        self.ensure_live("register_instance", Some(token.key()))?;
        debug!(scope = self.id(), token = %token, "Registered scope instance");
        self.inner
            .instances
            .insert_registered(token.key().clone(), erase(instance.into()), None);
        Ok(())
    }

    /// Scope-local instance whose [`Disposable`] impl runs when the scope is
    /// disposed.
    pub fn register_disposable<T: ?Sized + Disposable + 'static>(
        &self,
        token: &Token<T>,
        instance: impl Into<Arc<T>>,
    ) -> Result<()> {
        self.ensure_live("register_instance", Some(token.key()))?;
        debug!(scope = self.id(), token = %token, "Registered disposable scope instance");
        self.inner.instances.insert_registered(
            token.key().clone(),
            erase(instance.into()),
            Some(disposer::<T>()),
        );
        Ok(())
    }

    // ── Resolution ──

    pub fn resolve<T: ?Sized + Send + Sync + 'static>(&self, token: &Token<T>) -> Result<Arc<T>> {
        let instance = self.resolve_erased(token.key())?;
        downcast(token, &instance)
    }

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
        trace!(scope = self.id(), token = %key, "Resolving in scope");

        if let Some(instance) = self.inner.instances.get(key) {
            trace!(scope = self.id(), token = %key, "Scope cache hit");
            return Ok(instance);
        }

        if let Some(registration) = self.inner.registry.get(key) {
            return self.construct_here(&registration);
        }

        match self.inner.parent.lookup(key) {
            Some(Binding::Factory(registration))
                if registration.lifetime == Lifetime::Scoped || self.has_overrides() =>
            {
                self.construct_here(&registration)
            }
            Some(_) => self.inner.parent.resolve_key(key),
            None => self.inner.parent.resolve_key(key).map_err(|e| {
                if e.is_missing(key) {
                    self.not_registered(key)
                } else {
                    e
                }
            }),
        }
    }

    /// Builds `registration` with this scope as the resolver.
    fn construct_here(&self, registration: &Registration) -> Result<Instance> {
        let _frame = self.inner.stack.enter(&registration.token)?;
        trace!(scope = self.id(), token = %registration.token, lifetime = %registration.lifetime, "Constructing in scope");
        let value = registration.construct(self)?;

        if registration.lifetime.is_cached() {
            Ok(self.inner.instances.get_or_insert_constructed(
                registration.token.clone(),
                value,
                registration.dispose.clone(),
            ))
        } else {
            Ok(value)
        }
    }

    /// `true` once the scope holds a factory or an explicit instance of its own.
    fn has_overrides(&self) -> bool {
        !self.inner.registry.is_empty() || self.inner.instances.has_registered()
    }

    fn lookup(&self, key: &TokenKey) -> Option<Binding> {
        if self.is_disposed() {
            return None;
        }
        if self.inner.instances.get_registered(key).is_some() {
            return Some(Binding::Instance);
        }
        match self.inner.registry.get(key) {
            Some(registration) => Some(Binding::Factory(registration)),
            None => self.inner.parent.lookup(key),
        }
    }

    fn not_registered(&self, key: &TokenKey) -> AmbitError {
        let suggestions = suggest_similar(
            key.name(),
            &self.known_names(),
            self.inner.options.max_suggestions,
        );
        AmbitError::not_registered(key.clone(), suggestions)
    }

    fn known_names(&self) -> Vec<String> {
        let mut names = self.inner.registry.names();
        names.extend(self.inner.instances.names());
        names.extend(self.inner.parent.known_names());
        names
    }

    // ── Scopes ──

    /// Creates a grandchild scope whose parent is this scope.
    ///
    /// This scope keeps the child alive until one of them is disposed;
    /// dropping the returned handle does not release the child or its
    /// cached instances.
    pub fn create_scope(&self) -> Result<Scope> {
        self.ensure_live("create_scope", None)?;
        let child = Scope::new(Parent::Scope(self.clone()), self.inner.options.clone());
        debug!(scope = child.id(), parent = self.id(), "Created nested scope");
        self.inner.children.lock().push(child.clone());
        Ok(child)
    }

    // ── Queries ──

    /// `true` if this scope or an ancestor can answer for `token`.
    /// Reports `false` once disposed.
    pub fn is_registered<T: ?Sized>(&self, token: &Token<T>) -> bool {
        self.is_registered_key(token.key())
    }

    fn is_registered_key(&self, key: &TokenKey) -> bool {
        !self.is_disposed()
            && (self.inner.registry.contains(key)
                || self.inner.instances.contains(key)
                || self.inner.parent.is_registered(key))
    }

    /// `true` if this scope itself caches an instance for `token`.
    pub fn has_instance<T: ?Sized>(&self, token: &Token<T>) -> bool {
        !self.is_disposed() && self.inner.instances.contains(token.key())
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    fn ensure_live(&self, operation: &'static str, token: Option<&TokenKey>) -> Result<()> {
        if self.is_disposed() {
            return Err(AmbitError::disposed(ContainerKind::Scope, operation, token));
        }
        Ok(())
    }

    // ── Disposal ──

    /// Disposes this scope: nested scopes first, then every instance in the
    /// scope's own cache (newest first), then its local factories. The
    /// parent and siblings are untouched. Calling it again is a no-op.
    pub fn dispose(&self) -> BoxFuture<'_, ()> {
        async move {
            if self.inner.disposed.swap(true, Ordering::AcqRel) {
                return;
            }

            let children = std::mem::take(&mut *self.inner.children.lock());
            for child in children {
                let id = child.id();
                if AssertUnwindSafe(child.dispose()).catch_unwind().await.is_err() {
                    warn!(scope = id, parent = self.id(), "Nested scope disposal panicked");
                }
            }

            let failures =
                dispose_instances(ContainerKind::Scope, self.inner.instances.drain()).await;
            self.inner.registry.clear();
            self.inner.parent.detach(self.id());

            debug!(scope = self.id(), failed_hooks = failures, "Scope disposed");
        }
        .boxed()
    }
}

impl Resolver for Scope {
    fn resolve_key(&self, key: &TokenKey) -> Result<Instance> {
        self.resolve_erased(key)
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.inner.id)
            .field("registered", &self.inner.registry.len())
            .field("instances", &self.inner.instances.len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
