//! Service identity tokens.
//!
//! A [`Token`] names an abstract capability ("something that can validate
//! input") and is the key every registration, cache and error refers to.
//! Identity comes from a process-wide counter, never from the name: two
//! tokens created with the same name are still different tokens.

use std::any::type_name;
use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use ambit_support::rendering::shorten_type_name;

static NEXT_TOKEN_ID: AtomicU64 = AtomicU64::new(1);

/// Type-erased token identity.
///
/// This is what registries, instance caches and resolution stacks key on.
/// Equality and hashing use the numeric id only.
#[derive(Clone)]
pub struct TokenKey {
    inner: Arc<TokenInfo>,
}

struct TokenInfo {
    id: u64,
    name: Cow<'static, str>,
    description: Option<Cow<'static, str>>,
    type_name: &'static str,
}

impl TokenKey {
    fn allocate(
        name: Cow<'static, str>,
        description: Option<Cow<'static, str>>,
        type_name: &'static str,
    ) -> Self {
        let id = NEXT_TOKEN_ID.fetch_add(1, Ordering::Relaxed);
        Self {
            inner: Arc::new(TokenInfo { id, name, description, type_name }),
        }
    }

    /// Returns the unique numeric identity.
    #[inline]
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Returns the human-readable name. Not unique.
    #[inline]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns the optional description given at creation.
    #[inline]
    pub fn description(&self) -> Option<&str> {
        self.inner.description.as_deref()
    }

    /// Returns the Rust type this token resolves to.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.inner.type_name
    }
}

impl PartialEq for TokenKey {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for TokenKey {}

impl Hash for TokenKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for TokenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Token({}#{}: {})",
            self.name(),
            self.id(),
            shorten_type_name(self.type_name())
        )
    }
}

impl fmt::Display for TokenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name(), self.id())
    }
}

/// A typed service identity.
///
/// `T` is what resolving the token yields (as `Arc<T>`); it may be unsized,
/// so `Token<dyn Storage>` is the usual way to name a capability.
///
/// # Examples
/// ```
/// use ambit_container::token::Token;
///
/// trait Validator: Send + Sync {}
///
/// let a = Token::<dyn Validator>::new("Validator");
/// let b = Token::<dyn Validator>::new("Validator");
/// assert_eq!(a.name(), b.name());
/// assert_ne!(a, b);
/// ```
pub struct Token<T: ?Sized> {
    key: TokenKey,
    _marker: PhantomData<fn() -> Arc<T>>,
}

impl<T: ?Sized + 'static> Token<T> {
    /// Creates a new token. Equivalent of `createToken(name)`.
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self::from_key(TokenKey::allocate(name.into(), None, type_name::<T>()))
    }

    /// Creates a new token carrying a description for diagnostics.
    pub fn with_description(
        name: impl Into<Cow<'static, str>>,
        description: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::from_key(TokenKey::allocate(
            name.into(),
            Some(description.into()),
            type_name::<T>(),
        ))
    }

    fn from_key(key: TokenKey) -> Self {
        Self { key, _marker: PhantomData }
    }
}

impl<T: ?Sized> Token<T> {
    /// Returns the erased identity used as a map key.
    #[inline]
    pub fn key(&self) -> &TokenKey {
        &self.key
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.key.id()
    }

    #[inline]
    pub fn name(&self) -> &str {
        self.key.name()
    }

    #[inline]
    pub fn description(&self) -> Option<&str> {
        self.key.description()
    }
}

// Manual impls: derives would demand `T: Clone` / `T: PartialEq`.
impl<T: ?Sized> Clone for Token<T> {
    fn clone(&self) -> Self {
        Self { key: self.key.clone(), _marker: PhantomData }
    }
}

impl<T: ?Sized> PartialEq for Token<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<T: ?Sized> Eq for Token<T> {}

impl<T: ?Sized> Hash for Token<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl<T: ?Sized> fmt::Debug for Token<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.key, f)
    }
}

impl<T: ?Sized> fmt::Display for Token<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.key, f)
    }
}

/// Shorthand for [`Token::new`].
pub fn create_token<T: ?Sized + 'static>(name: impl Into<Cow<'static, str>>) -> Token<T> {
    Token::new(name)
}
