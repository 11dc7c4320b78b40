//! Engine configuration and global installation.
//!
//! [`DestructuringOptions`] collects destructurers, shapes, filters and
//! limits, and either builds a standalone [`Engine`] or installs one
//! globally for [`crate::destructure`] and the logging adapters to use.
//!
//! Without an installed engine, the global functions use a default engine
//! built with [`DestructuringOptions::new`].
//!
//! # Examples
//!
//! ```
//! use unravel::DestructuringOptions;
//!
//! DestructuringOptions::new()
//!     .ignore_members(["Password", "Token"])
//!     .max_depth(8)
//!     .install()
//!     .expect("destructuring options already installed");
//! ```

use alloc::{borrow::Cow, boxed::Box};
use core::{
    error::Error,
    fmt,
    ptr::NonNull,
    sync::atomic::{AtomicPtr, Ordering},
};

use crate::{
    destructurer::{Destructurer, DestructurerMap, NameOnly, builtin},
    engine::{DEFAULT_ROOT_NAME, Engine},
    filter::{FilterChain, IgnoreMembersByName, MemberFilter},
    shape::ErrorShape,
};

/// Builder for an [`Engine`].
pub struct DestructuringOptions(Box<Engine>);

impl Default for DestructuringOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DestructuringOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DestructuringOptions").field(&self.0).finish()
    }
}

/// Error returned by [`DestructuringOptions::install`] when an engine is
/// already installed.
///
/// Hands back the options that could not be installed.
pub struct OptionsAlreadyInstalledError(pub DestructuringOptions);

impl fmt::Debug for OptionsAlreadyInstalledError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionsAlreadyInstalledError").finish()
    }
}

impl fmt::Display for OptionsAlreadyInstalledError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "destructuring options are already installed globally")
    }
}

impl Error for OptionsAlreadyInstalledError {}

impl DestructuringOptions {
    /// Creates options with the [default destructurers](builtin).
    pub fn new() -> Self {
        Self::new_without_defaults().with_default_destructurers()
    }

    /// Creates options without any registered destructurer or shape.
    ///
    /// Shaped errors are still destructured through the reflective
    /// destructurer.
    pub fn new_without_defaults() -> Self {
        Self(Box::new(Engine {
            destructurers: DestructurerMap::default(),
            filters: FilterChain::new(),
            max_depth: None,
            reflection: true,
            root_name: Cow::Borrowed(DEFAULT_ROOT_NAME),
        }))
    }

    /// Registers the destructurers for well-known error types.
    ///
    /// Destructurers registered earlier for the same types are replaced.
    pub fn with_default_destructurers(mut self) -> Self {
        builtin::register(&mut self.0.destructurers);
        self
    }

    /// Registers a destructurer for errors of type `E`.
    ///
    /// Replaces any destructurer registered for `E` before.
    pub fn destructurer<E, D>(mut self, destructurer: D) -> Self
    where
        E: Error + 'static,
        D: Destructurer<E>,
    {
        self.0.destructurers.insert::<E, D>(destructurer);
        self
    }

    /// Makes the engine report the type name of `E` instead of the opaque
    /// placeholder, without writing any members.
    pub fn named<E: Error + 'static>(self) -> Self {
        self.destructurer::<E, _>(NameOnly)
    }

    /// Recognizes `E` when it is reached through [`Error::source`].
    ///
    /// Without this, shaped errors that their parent exposes as a plain
    /// `&dyn Error` are treated as opaque.
    pub fn shape<E: ErrorShape>(mut self) -> Self {
        self.0.destructurers.insert_shape::<E>();
        self
    }

    /// Adds a member filter.
    ///
    /// A member is left out if any configured filter excludes it.
    pub fn filter<F: MemberFilter>(mut self, filter: F) -> Self {
        self.0.filters.push(filter);
        self
    }

    /// Leaves out members with one of the given names, on every error.
    pub fn ignore_members<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Cow<'static, str>>,
    {
        self.filter(IgnoreMembersByName::new(names))
    }

    /// Stops descending below the given depth.
    ///
    /// The root has depth `0`. Nodes deeper than `max_depth` only get their
    /// `Type` and `Message`. Unlimited by default.
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.0.max_depth = Some(max_depth);
        self
    }

    /// Disables the reflective destructurer.
    ///
    /// Shaped errors without a specialized destructurer then only get the
    /// reserved keys.
    pub fn without_reflection(mut self) -> Self {
        self.0.reflection = false;
        self
    }

    /// Sets the name under which logging adapters attach the mapping.
    ///
    /// Defaults to [`DEFAULT_ROOT_NAME`].
    pub fn root_name(mut self, root_name: impl Into<Cow<'static, str>>) -> Self {
        self.0.root_name = root_name.into();
        self
    }

    /// Builds a standalone engine.
    pub fn build(self) -> Engine {
        *self.0
    }

    /// Installs the engine globally.
    ///
    /// Fails if an engine is already installed, handing the options back.
    /// See [`replace`](Self::replace) to overwrite an installed engine.
    ///
    /// # Memory Management
    ///
    /// An installed engine is leaked and stays alive for the rest of the
    /// program, even after being replaced.
    pub fn install(self) -> Result<(), OptionsAlreadyInstalledError> {
        let boxed = Box::into_raw(self.0);

        // SAFETY: `boxed` is a fresh `Box::into_raw` pointer that nothing
        // else has seen.
        if unsafe { GLOBAL.install(boxed) } {
            return Ok(());
        }

        // SAFETY: the slot was already taken, so `boxed` was never published
        // and this is the only pointer to the engine.
        let engine = unsafe { Box::from_raw(boxed) };
        Err(OptionsAlreadyInstalledError(DestructuringOptions(engine)))
    }

    /// Replaces the globally installed engine.
    ///
    /// Returns the previously installed engine, if any.
    pub fn replace(self) -> Option<LeakedEngine> {
        self.leak().replace()
    }

    /// Leaks the engine for later installation with
    /// [`LeakedEngine::replace`].
    pub fn leak(self) -> LeakedEngine {
        LeakedEngine {
            engine: NonNull::from(Box::leak(self.0)),
        }
    }
}

/// A handle to an engine leaked into static memory.
#[derive(Copy, Clone, Debug)]
pub struct LeakedEngine {
    /// Always comes from `Box::leak` or from the global slot, so it is never
    /// freed except through [`LeakedEngine::reclaim`].
    engine: NonNull<Engine>,
}

// SAFETY: the handle behaves like a `&'static Engine`, and `Engine` is
// `Send + Sync` (asserted in the engine tests).
unsafe impl Send for LeakedEngine {}

// SAFETY: as for `Send`.
unsafe impl Sync for LeakedEngine {}

impl LeakedEngine {
    /// Fetches the globally installed engine, if any.
    pub fn fetch_current() -> Option<Self> {
        Some(Self {
            engine: GLOBAL.fetch()?,
        })
    }

    /// Installs this engine globally, returning the previous one, if any.
    pub fn replace(self) -> Option<LeakedEngine> {
        Some(Self {
            engine: GLOBAL.replace(self.engine)?,
        })
    }

    /// The leaked engine.
    pub fn get(self) -> &'static Engine {
        // SAFETY: leaked engines are never freed unless `reclaim` is called,
        // and its contract forbids outstanding references like this one.
        unsafe { self.engine.as_ref() }
    }

    /// Takes back ownership of the leaked engine.
    ///
    /// # Safety
    ///
    /// The engine must no longer be installed, and no reference from
    /// [`LeakedEngine::get`] or [`Engine::global`] and no copy of this
    /// handle may be used afterwards.
    pub unsafe fn reclaim(self) -> DestructuringOptions {
        // SAFETY: the caller guarantees this handle is the last user of the
        // leaked box.
        let boxed = unsafe { Box::from_raw(self.engine.as_ptr()) };
        DestructuringOptions(boxed)
    }
}

/// The slot behind [`Engine::global`].
struct GlobalEngine {
    /// Null until the first install. Afterwards it always holds a leaked
    /// engine; stores are `Release` and loads are `Acquire` so a reader sees
    /// the engine fully built.
    ptr: AtomicPtr<Engine>,
}

impl GlobalEngine {
    const fn new() -> Self {
        Self {
            ptr: AtomicPtr::new(core::ptr::null_mut()),
        }
    }

    fn fetch(&self) -> Option<NonNull<Engine>> {
        NonNull::new(self.ptr.load(Ordering::Acquire))
    }

    /// Publishes `new` if the slot is still empty. Returns `false` and
    /// leaves `new` untouched otherwise.
    ///
    /// # Safety
    ///
    /// `new` must come from `Box::into_raw`. Once published it is never
    /// freed by the caller.
    unsafe fn install(&self, new: *mut Engine) -> bool {
        self.ptr
            .compare_exchange(core::ptr::null_mut(), new, Ordering::Release, Ordering::Relaxed)
            .is_ok()
    }

    fn replace(&self, new: NonNull<Engine>) -> Option<NonNull<Engine>> {
        NonNull::new(self.ptr.swap(new.as_ptr(), Ordering::AcqRel))
    }
}

static GLOBAL: GlobalEngine = GlobalEngine::new();

static DEFAULT: spin::Once<Engine> = spin::Once::new();

impl Engine {
    /// The globally installed engine, or the default one.
    pub fn global() -> &'static Engine {
        match LeakedEngine::fetch_current() {
            Some(engine) => engine.get(),
            None => DEFAULT.call_once(Engine::default),
        }
    }
}
