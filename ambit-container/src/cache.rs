//! Per-container instance cache.
//!
//! Remembers every instance a container or scope owns, where it came from,
//! and how to tear it down. Entries are kept in insertion order so disposal
//! can run dependents before the services they were built from.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use parking_lot::Mutex;
use tracing::{trace, warn};

use crate::error::ContainerKind;
use crate::registry::{DisposeFn, Instance};
use crate::token::TokenKey;

/// How an instance got into the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Origin {
    /// Placed by `register_instance`; counts as an override.
    Registered,
    /// Built by a factory and memoized.
    Constructed,
}

#[derive(Clone)]
pub(crate) struct CachedInstance {
    pub value: Instance,
    pub origin: Origin,
    pub dispose: Option<DisposeFn>,
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<TokenKey, CachedInstance>,
    order: Vec<TokenKey>,
    /// Entries displaced by `register_instance`; still owned, still disposed.
    retired: Vec<(TokenKey, CachedInstance)>,
}

#[derive(Default)]
pub(crate) struct InstanceCache {
    inner: Mutex<CacheInner>,
}

impl InstanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &TokenKey) -> Option<Instance> {
        self.inner.lock().entries.get(key).map(|e| e.value.clone())
    }

    /// Returns the instance only if it was placed by `register_instance`.
    pub fn get_registered(&self, key: &TokenKey) -> Option<Instance> {
        self.inner
            .lock()
            .entries
            .get(key)
            .filter(|e| e.origin == Origin::Registered)
            .map(|e| e.value.clone())
    }

    pub fn contains(&self, key: &TokenKey) -> bool {
        self.inner.lock().entries.contains_key(key)
    }

    /// `true` if any entry came from `register_instance`.
    pub fn has_registered(&self) -> bool {
        self.inner
            .lock()
            .entries
            .values()
            .any(|e| e.origin == Origin::Registered)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Names of cached tokens, for "did you mean?" hints.
    pub fn names(&self) -> Vec<String> {
        self.inner
            .lock()
            .entries
            .keys()
            .map(|k| k.name().to_string())
            .collect()
    }

    /// Places an explicit instance, replacing whatever was cached for `key`.
    pub fn insert_registered(&self, key: TokenKey, value: Instance, dispose: Option<DisposeFn>) {
        let mut inner = self.inner.lock();
        let entry = CachedInstance {
            value,
            origin: Origin::Registered,
            dispose,
        };
        if let Some(previous) = inner.entries.insert(key.clone(), entry) {
            inner.order.retain(|k| k != &key);
            inner.retired.push((key.clone(), previous));
        }
        inner.order.push(key);
    }

    /// Memoizes a freshly built instance. If another call got there first,
    /// the cached value wins and `value` is dropped.
    pub fn get_or_insert_constructed(
        &self,
        key: TokenKey,
        value: Instance,
        dispose: Option<DisposeFn>,
    ) -> Instance {
        let mut inner = self.inner.lock();
        if let Some(existing) = inner.entries.get(&key) {
            trace!(token = %key, "Concurrent construction lost; keeping cached instance");
            return existing.value.clone();
        }
        inner.entries.insert(
            key.clone(),
            CachedInstance {
                value: value.clone(),
                origin: Origin::Constructed,
                dispose,
            },
        );
        inner.order.push(key);
        value
    }

    /// Empties the cache, returning entries newest first.
    pub fn drain(&self) -> Vec<(TokenKey, CachedInstance)> {
        let mut inner = self.inner.lock();
        let CacheInner {
            entries,
            order,
            retired,
        } = &mut *inner;

        let mut drained: Vec<(TokenKey, CachedInstance)> = order
            .drain(..)
            .rev()
            .filter_map(|key| entries.remove(&key).map(|entry| (key, entry)))
            .collect();
        drained.extend(retired.drain(..).rev());
        entries.clear();
        drained
    }
}

/// Runs dispose hooks one after another.
///
/// A hook that errors or panics is logged and skipped; the rest still run.
/// Returns the number of failed hooks.
pub(crate) async fn dispose_instances(
    kind: ContainerKind,
    entries: Vec<(TokenKey, CachedInstance)>,
) -> usize {
    let mut failures = 0;

    for (token, entry) in entries {
        let Some(hook) = entry.dispose else {
            continue;
        };
        let value = entry.value;

        let outcome = match std::panic::catch_unwind(AssertUnwindSafe(|| hook(value))) {
            Ok(pending) => AssertUnwindSafe(pending).catch_unwind().await,
            Err(panic) => Err(panic),
        };

        match outcome {
            Ok(Ok(())) => trace!(token = %token, owner = %kind, "Disposed instance"),
            Ok(Err(error)) => {
                failures += 1;
                warn!(token = %token, owner = %kind, error = %error, "Dispose hook failed");
            }
            Err(_) => {
                failures += 1;
                warn!(token = %token, owner = %kind, "Dispose hook panicked");
            }
        }
    }

    failures
}
