//! Registrations and the factories behind them.
//!
//! A [`Factory`] knows how to build one service and, optionally, how to tear
//! it down. Once registered it is erased into a [`Registration`] keyed by
//! [`TokenKey`] so containers and scopes can store any service type.

use std::any::{Any, type_name};
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::debug;

use crate::error::{AlreadyRegisteredError, AmbitError, BoxError, Result};
use crate::lifetime::Lifetime;
use crate::token::{Token, TokenKey};

/// A type-erased service value.
///
/// Always wraps an `Arc<T>` for the token's `T`, so unsized services such as
/// `dyn Storage` can be stored and handed back as `Arc<dyn Storage>`.
pub type Instance = Arc<dyn Any + Send + Sync>;

pub(crate) type FactoryFn =
    Arc<dyn Fn(&dyn Resolver) -> std::result::Result<Instance, BoxError> + Send + Sync>;

pub(crate) type DisposeFn =
    Arc<dyn Fn(Instance) -> BoxFuture<'static, std::result::Result<(), BoxError>> + Send + Sync>;

/// What a factory receives: the container or scope currently resolving.
///
/// Resolving through it (rather than through a captured container) is what
/// lets a scope's overrides reach dependencies built deep inside someone
/// else's factory.
pub trait Resolver: Send + Sync {
    /// Resolves an erased instance for `key`.
    fn resolve_key(&self, key: &TokenKey) -> Result<Instance>;

    /// Like [`resolve_key`](Resolver::resolve_key), but `Ok(None)` when `key`
    /// itself has nothing registered.
    fn try_resolve_key(&self, key: &TokenKey) -> Result<Option<Instance>> {
        match self.resolve_key(key) {
            Ok(instance) => Ok(Some(instance)),
            Err(e) if e.is_missing(key) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl dyn Resolver + '_ {
    /// Resolves a typed service. Use this inside factory closures:
    ///
    /// ```rust,ignore
    /// Factory::new(|r| {
    ///     let storage = r.resolve(&STORAGE)?;
    ///     Ok(TodoService::new(storage))
    /// })
    /// ```
    pub fn resolve<T: ?Sized + Send + Sync + 'static>(&self, token: &Token<T>) -> Result<Arc<T>> {
        let instance = self.resolve_key(token.key())?;
        downcast(token, &instance)
    }

    /// Resolves a typed service, `None` if the token is not registered.
    pub fn try_resolve<T: ?Sized + Send + Sync + 'static>(
        &self,
        token: &Token<T>,
    ) -> Result<Option<Arc<T>>> {
        self.try_resolve_key(token.key())?
            .map(|instance| downcast(token, &instance))
            .transpose()
    }
}

/// A service that knows how to release its own resources.
///
/// Attach it to a registration with [`Factory::disposable`], or register a
/// ready instance with `register_disposable`.
#[async_trait]
pub trait Disposable: Send + Sync {
    async fn dispose(&self) -> std::result::Result<(), BoxError>;
}

/// Builds a service of type `T`, plus an optional teardown hook.
///
/// Factories are synchronous. For an ordinary token an `async` closure does
/// not satisfy the signature at all:
///
/// ```compile_fail
/// use ambit_container::registry::Factory;
///
/// let factory: Factory<u32> = Factory::new(|_| async { Ok(7u32) });
/// ```
///
/// A token whose type is itself a boxed future (`Pin<Box<dyn Future<..>>>`)
/// does type-check; resolving it fails with
/// [`AmbitError::ServiceCreation`] instead of caching unfinished work.
///
/// # Examples
/// ```
/// use ambit_container::registry::Factory;
///
/// struct Clock;
///
/// let factory = Factory::new(|_| Ok(Clock)).on_dispose_sync(|_clock: &Clock| Ok(()));
/// assert!(factory.has_dispose_hook());
/// ```
pub struct Factory<T: ?Sized> {
    create: Arc<dyn Fn(&dyn Resolver) -> std::result::Result<Arc<T>, BoxError> + Send + Sync>,
    dispose: Option<Arc<dyn Fn(Arc<T>) -> BoxFuture<'static, std::result::Result<(), BoxError>> + Send + Sync>>,
}

impl<T: Send + Sync + 'static> Factory<T> {
    /// Factory for a sized value; the result is wrapped in an `Arc`.
    pub fn new<F>(create: F) -> Self
    where
        F: Fn(&dyn Resolver) -> std::result::Result<T, BoxError> + Send + Sync + 'static,
    {
        Self::shared(move |resolver| create(resolver).map(Arc::new))
    }
}

impl<T: ?Sized + Send + Sync + 'static> Factory<T> {
    /// Factory returning an `Arc<T>` directly. Needed for trait objects:
    ///
    /// ```rust,ignore
    /// Factory::<dyn Storage>::shared(|_| Ok(Arc::new(MemoryStorage::default()) as Arc<dyn Storage>))
    /// ```
    pub fn shared<F>(create: F) -> Self
    where
        F: Fn(&dyn Resolver) -> std::result::Result<Arc<T>, BoxError> + Send + Sync + 'static,
    {
        Self {
            create: Arc::new(create),
            dispose: None,
        }
    }

    /// Attaches an asynchronous teardown hook, run when the owning
    /// container or scope is disposed.
    pub fn on_dispose<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Arc<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<(), BoxError>> + Send + 'static,
    {
        self.dispose = Some(Arc::new(move |value: Arc<T>| hook(value).boxed()));
        self
    }

    /// Attaches a synchronous teardown hook.
    pub fn on_dispose_sync<F>(self, hook: F) -> Self
    where
        F: Fn(&T) -> std::result::Result<(), BoxError> + Send + Sync + 'static,
    {
        let hook = Arc::new(hook);
        self.on_dispose(move |value: Arc<T>| {
            let hook = Arc::clone(&hook);
            async move { hook(&*value) }
        })
    }

    /// Uses the service's own [`Disposable`] impl as its teardown hook.
    pub fn disposable(self) -> Self
    where
        T: Disposable,
    {
        self.on_dispose(|value: Arc<T>| async move { value.dispose().await })
    }

    pub fn has_dispose_hook(&self) -> bool {
        self.dispose.is_some()
    }

    /// Erases the factory into a registration for `token`.
    pub(crate) fn into_registration(self, token: &Token<T>, lifetime: Lifetime) -> Registration {
        let create = self.create;
        let deferred = is_deferred::<T>();
        let factory: FactoryFn = Arc::new(move |resolver: &dyn Resolver| {
            let value = create(resolver)?;
            if deferred {
                return Err(BoxError::from(format!(
                    "factory returned a deferred value ({}); await it before registering",
                    type_name::<T>()
                )));
            }
            Ok(erase(value))
        });

        let dispose = self.dispose.map(|hook| -> DisposeFn {
            Arc::new(move |instance: Instance| match instance.downcast_ref::<Arc<T>>() {
                Some(value) => hook(Arc::clone(value)),
                None => futures::future::ready(Err(BoxError::from(format!(
                    "dispose hook expected {}",
                    type_name::<T>()
                ))))
                .boxed(),
            })
        });

        Registration {
            token: token.key().clone(),
            lifetime,
            factory,
            dispose,
        }
    }
}

/// Registration entry for a single token.
#[derive(Clone)]
pub(crate) struct Registration {
    pub token: TokenKey,
    pub lifetime: Lifetime,
    pub factory: FactoryFn,
    pub dispose: Option<DisposeFn>,
}

impl Registration {
    /// Runs the factory against `resolver`, mapping its error for this token.
    pub fn construct(&self, resolver: &dyn Resolver) -> Result<Instance> {
        (self.factory)(resolver).map_err(|e| AmbitError::from_factory(&self.token, e))
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("token", &self.token)
            .field("lifetime", &self.lifetime)
            .field("dispose_hook", &self.dispose.is_some())
            .finish()
    }
}

/// What an ancestor holds for a token, as seen by a scope deciding whether
/// to build the service itself.
pub(crate) enum Binding {
    /// An explicit instance; the ancestor's own resolve must answer.
    Instance,
    /// A factory the scope may re-run with itself as the resolver.
    Factory(Registration),
}

/// Stores the registrations declared on one container or scope.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    registrations: DashMap<TokenKey, Registration>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `registration`, replacing any earlier one for the same token.
    ///
    /// # Errors
    /// Returns [`AmbitError::AlreadyRegistered`] if the token is already
    /// registered and `allow_override` is false.
    pub fn register(&self, registration: Registration, allow_override: bool) -> Result<()> {
        let key = registration.token.clone();

        if !allow_override && self.registrations.contains_key(&key) {
            return Err(AmbitError::AlreadyRegistered(AlreadyRegisteredError { token: key }));
        }

        debug!(token = %key, lifetime = %registration.lifetime, "Registered service");
        if self.registrations.insert(key, registration).is_some() {
            debug!("Previous registration replaced");
        }
        Ok(())
    }

    /// Looks up a registration. The clone is cheap (all `Arc`s) and lets the
    /// caller run the factory without holding a map guard.
    pub fn get(&self, key: &TokenKey) -> Option<Registration> {
        self.registrations.get(key).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, key: &TokenKey) -> bool {
        self.registrations.contains_key(key)
    }

    /// Returns the number of registered tokens.
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Names of all registered tokens, for "did you mean?" hints.
    pub fn names(&self) -> Vec<String> {
        self.registrations
            .iter()
            .map(|entry| entry.key().name().to_string())
            .collect()
    }

    pub fn clear(&self) {
        self.registrations.clear();
    }
}

/// `true` when `T` names a future trait object, i.e. work a synchronous
/// resolve cannot finish.
fn is_deferred<T: ?Sized>() -> bool {
    type_name::<T>().contains("future::Future<Output")
}

/// Wraps a shared value into an erased [`Instance`].
pub(crate) fn erase<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> Instance {
    Arc::new(value)
}

/// Recovers the typed `Arc<T>` from an erased instance.
pub(crate) fn downcast<T: ?Sized + Send + Sync + 'static>(
    token: &Token<T>,
    instance: &Instance,
) -> Result<Arc<T>> {
    instance
        .downcast_ref::<Arc<T>>()
        .cloned()
        .ok_or_else(|| AmbitError::TypeMismatch {
            token: token.key().clone(),
            expected: type_name::<T>(),
        })
}

/// Teardown hook for an instance registered directly via `register_disposable`.
pub(crate) fn disposer<T: ?Sized + Disposable + 'static>() -> DisposeFn {
    Arc::new(|instance: Instance| {
        async move {
            match instance.downcast_ref::<Arc<T>>() {
                Some(value) => value.dispose().await,
                None => Err(BoxError::from(format!("dispose hook expected {}", type_name::<T>()))),
            }
        }
        .boxed()
    })
}
