//! Member filters.
//!
//! A [`MemberFilter`] decides whether one member of one error instance is
//! left out of the destructured mapping. Filters are configured on
//! [`DestructuringOptions`](crate::DestructuringOptions) and combined into a
//! [`FilterChain`]: a member is excluded if any filter in the chain asks for
//! it.
//!
//! Filters see declared members, entries written by specialized
//! destructurers and the `Data` entry. The `Type`, `Message` and chain keys
//! are never offered to them.
//!
//! # Examples
//!
//! ```
//! use unravel::{
//!     ErrorRef, Value,
//!     filter::{IgnoreMembersByName, MemberFilter},
//! };
//!
//! #[derive(Debug, thiserror::Error)]
//! #[error("boom")]
//! struct Boom;
//!
//! let filter = IgnoreMembersByName::new(["StackTrace"]);
//! let error = ErrorRef::opaque(&Boom);
//!
//! assert!(filter.should_filter(error, "StackTrace", &Value::Null));
//! assert!(!filter.should_filter(error, "Message", &Value::Null));
//! ```

use alloc::{borrow::Cow, vec::Vec};
use core::{error::Error, fmt, marker::PhantomData};

use hashbrown::HashSet;
use rustc_hash::FxBuildHasher;
use triomphe::Arc;
use unsize::CoerceUnsize;
use unravel_internals::Value;

use crate::shape::ErrorRef;

/// Decides whether a member should be excluded from the mapping.
///
/// Implementations must be pure: the answer may only depend on the
/// arguments.
///
/// Closures of the form `Fn(ErrorRef<'_>, &str, &Value) -> bool` implement
/// this trait.
pub trait MemberFilter: 'static + Send + Sync {
    /// Returns `true` if the member `name` with value `value` of `error`
    /// must be left out.
    fn should_filter(&self, error: ErrorRef<'_>, name: &str, value: &Value) -> bool;
}

impl<F> MemberFilter for F
where
    F: Fn(ErrorRef<'_>, &str, &Value) -> bool + 'static + Send + Sync,
{
    fn should_filter(&self, error: ErrorRef<'_>, name: &str, value: &Value) -> bool {
        self(error, name, value)
    }
}

type NameSet = HashSet<Cow<'static, str>, FxBuildHasher>;

/// Excludes members by exact, case-sensitive name.
///
/// An empty set excludes nothing.
#[derive(Clone, Default)]
pub struct IgnoreMembersByName {
    names: NameSet,
}

impl IgnoreMembersByName {
    /// Creates a filter excluding every member named in `names`.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Cow<'static, str>>,
    {
        names.into_iter().collect()
    }

    /// The excluded names, in no particular order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(|name| &**name)
    }
}

impl<S: Into<Cow<'static, str>>> FromIterator<S> for IgnoreMembersByName {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl MemberFilter for IgnoreMembersByName {
    fn should_filter(&self, _error: ErrorRef<'_>, name: &str, _value: &Value) -> bool {
        self.names.contains(name)
    }
}

impl fmt::Debug for IgnoreMembersByName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

/// Excludes members by name, but only on errors of concrete type `E`.
pub struct IgnoreMembersOfType<E> {
    names: IgnoreMembersByName,
    _error: PhantomData<fn(&E)>,
}

impl<E: Error + 'static> IgnoreMembersOfType<E> {
    /// Creates a filter excluding the members named in `names` from errors
    /// of type `E`.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Cow<'static, str>>,
    {
        Self {
            names: IgnoreMembersByName::new(names),
            _error: PhantomData,
        }
    }
}

impl<E: Error + 'static> MemberFilter for IgnoreMembersOfType<E> {
    fn should_filter(&self, error: ErrorRef<'_>, name: &str, value: &Value) -> bool {
        error.is::<E>() && self.names.should_filter(error, name, value)
    }
}

impl<E> fmt::Debug for IgnoreMembersOfType<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IgnoreMembersOfType")
            .field("error_type", &core::any::type_name::<E>())
            .field("names", &self.names)
            .finish()
    }
}

/// An ordered set of filters combined with logical OR.
#[derive(Clone, Default)]
pub struct FilterChain {
    filters: Vec<Arc<dyn MemberFilter>>,
}

impl FilterChain {
    /// Creates an empty chain, which excludes nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a filter to the chain.
    pub fn push<F: MemberFilter>(&mut self, filter: F) {
        let filter = Arc::new(filter).unsize(unsize::Coercion!(to dyn MemberFilter));
        self.filters.push(filter);
    }

    /// The number of filters in the chain.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Returns `true` if the chain holds no filters.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl MemberFilter for FilterChain {
    fn should_filter(&self, error: ErrorRef<'_>, name: &str, value: &Value) -> bool {
        self.filters
            .iter()
            .any(|filter| filter.should_filter(error, name, value))
    }
}

impl fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterChain")
            .field("len", &self.filters.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct First;

    impl fmt::Display for First {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("first")
        }
    }

    impl Error for First {}

    #[derive(Debug)]
    struct Second;

    impl fmt::Display for Second {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("second")
        }
    }

    impl Error for Second {}

    static_assertions::assert_impl_all!(FilterChain: Send, Sync, Clone);
    static_assertions::assert_impl_all!(IgnoreMembersOfType<First>: Send, Sync);

    #[test]
    fn test_by_name() {
        let filter = IgnoreMembersByName::new(["StackTrace"]);
        let error = ErrorRef::opaque(&First);
        assert!(filter.should_filter(error, "StackTrace", &Value::from(1)));
        assert!(!filter.should_filter(error, "Message", &Value::from(1)));
        assert!(!filter.should_filter(error, "stacktrace", &Value::from(1)));
    }

    #[test]
    fn test_empty_set_never_filters() {
        let filter = IgnoreMembersByName::default();
        for name in ["StackTrace", "Message", "", "Code"] {
            assert!(!filter.should_filter(ErrorRef::opaque(&First), name, &Value::Null));
        }
    }

    #[test]
    fn test_of_type() {
        let filter = IgnoreMembersOfType::<First>::new(["Code"]);
        assert!(filter.should_filter(ErrorRef::opaque(&First), "Code", &Value::Null));
        assert!(!filter.should_filter(ErrorRef::opaque(&Second), "Code", &Value::Null));
        assert!(!filter.should_filter(ErrorRef::opaque(&First), "Other", &Value::Null));
    }

    #[test]
    fn test_chain_is_logical_or() {
        let mut chain = FilterChain::new();
        assert!(!chain.should_filter(ErrorRef::opaque(&First), "Code", &Value::Null));

        chain.push(IgnoreMembersByName::new(["Code"]));
        chain.push(|_: ErrorRef<'_>, _: &str, value: &Value| value.as_u64() == Some(0));
        assert_eq!(chain.len(), 2);

        let error = ErrorRef::opaque(&Second);
        assert!(chain.should_filter(error, "Code", &Value::from(5_u64)));
        assert!(chain.should_filter(error, "Count", &Value::from(0_u64)));
        assert!(!chain.should_filter(error, "Count", &Value::from(5_u64)));
    }
}
