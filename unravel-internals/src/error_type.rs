//! Static descriptions of error types.
//!
//! An [`ErrorType`] is the unit the conflict-resolution pass reasons about:
//! every [`MemberDescriptor`](crate::MemberDescriptor) points at the
//! [`ErrorType`] that declared it, and the pass renames a member only when
//! its declaring type is a strict subtype of the other member's declaring
//! type.
//!
//! Rust has no inheritance, so the subtype relation is declared explicitly
//! with [`ErrorType::extends`]. Types are compared by [`TypeId`], never by
//! the address of the [`ErrorType`] value, since the same constant may be
//! materialized more than once.

use core::{
    any::TypeId,
    fmt,
    hash::{Hash, Hasher},
};

/// The static description of an error type.
///
/// Values of this type are built in `const` context and referenced as
/// `&'static ErrorType`.
///
/// # Examples
///
/// ```
/// use unravel_internals::ErrorType;
///
/// struct IoFailure;
/// struct ReadFailure;
///
/// const IO_FAILURE: &ErrorType = &ErrorType::new::<IoFailure>("IoFailure");
/// const READ_FAILURE: &ErrorType =
///     &ErrorType::new::<ReadFailure>("ReadFailure").extends(IO_FAILURE);
///
/// assert!(READ_FAILURE.is_strict_subtype_of(IO_FAILURE));
/// assert!(!IO_FAILURE.is_strict_subtype_of(READ_FAILURE));
/// assert!(!IO_FAILURE.is_strict_subtype_of(IO_FAILURE));
/// ```
#[derive(Copy, Clone)]
pub struct ErrorType {
    /// Name used for the `Type` key and for renamed members.
    name: &'static str,
    /// Returns the [`TypeId`] of the described Rust type.
    type_id: fn() -> TypeId,
    /// The type this type extends, if any.
    base: Option<&'static ErrorType>,
}

impl ErrorType {
    /// Creates the description of `T` under the given name.
    #[must_use]
    pub const fn new<T: ?Sized + 'static>(name: &'static str) -> Self {
        Self {
            name,
            type_id: TypeId::of::<T>,
            base: None,
        }
    }

    /// Declares that this type extends `base`.
    ///
    /// Members declared by this type that share a name with a member declared
    /// by `base` (or any of its ancestors) will be exposed as
    /// `"<Name>.<member>"`.
    #[must_use]
    pub const fn extends(mut self, base: &'static ErrorType) -> Self {
        self.base = Some(base);
        self
    }

    /// The name of this type.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The [`TypeId`] of the described Rust type.
    #[inline]
    pub fn type_id(&self) -> TypeId {
        (self.type_id)()
    }

    /// The type this type directly extends, if any.
    #[inline]
    pub fn base(&self) -> Option<&'static ErrorType> {
        self.base
    }

    /// Iterates over the strict ancestors of this type, nearest first.
    pub fn ancestors(&self) -> Ancestors {
        Ancestors { next: self.base }
    }

    /// Returns `true` if `self` describes the same Rust type as `other`.
    #[inline]
    pub fn is_same_type(&self, other: &ErrorType) -> bool {
        self.type_id() == other.type_id()
    }

    /// Returns `true` if `other` is a strict ancestor of `self`.
    ///
    /// A type is never a strict subtype of itself.
    pub fn is_strict_subtype_of(&self, other: &ErrorType) -> bool {
        let other = other.type_id();
        if self.type_id() == other {
            return false;
        }
        self.ancestors().any(|ancestor| ancestor.type_id() == other)
    }
}

/// Iterator over the ancestors of an [`ErrorType`].
///
/// Created by [`ErrorType::ancestors`].
#[derive(Clone)]
#[allow(missing_copy_implementations)]
pub struct Ancestors {
    /// The next ancestor to yield.
    next: Option<&'static ErrorType>,
}

impl Iterator for Ancestors {
    type Item = &'static ErrorType;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.base;
        Some(current)
    }
}

impl PartialEq for ErrorType {
    fn eq(&self, other: &Self) -> bool {
        self.is_same_type(other)
    }
}

impl Eq for ErrorType {}

impl Hash for ErrorType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id().hash(state);
    }
}

impl fmt::Debug for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("ErrorType");
        debug.field("name", &self.name);
        if let Some(base) = self.base {
            debug.field("extends", &base.name);
        }
        debug.finish()
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
