//! Error shapes: how an error type describes itself to the engine.
//!
//! Rust has no runtime reflection, so every error type that wants its fields
//! destructured implements [`ErrorShape`]. The implementation is a small,
//! static member table, built once per type and cached (see
//! [`crate::cache`]).
//!
//! The engine itself works on [`ErrorRef`], which is either a shaped error
//! (a [`&dyn Destructure`](Destructure)) or an opaque
//! [`&dyn Error`](core::error::Error) reached through
//! [`Error::source`](core::error::Error::source). Opaque errors are upgraded
//! to shaped ones whenever their type has been registered with
//! [`DestructuringOptions::shape`](crate::DestructuringOptions::shape).
//!
//! # Examples
//!
//! ```
//! use unravel::{ErrorShape, ErrorType, MemberTable, keys};
//!
//! #[derive(Debug, thiserror::Error)]
//! #[error("query failed")]
//! struct QueryError {
//!     table: String,
//!     retries: u32,
//! }
//!
//! impl ErrorShape for QueryError {
//!     const ERROR_TYPE: &'static ErrorType = &ErrorType::new::<Self>("QueryError");
//!
//!     fn declare_members(members: &mut MemberTable<Self>) {
//!         members
//!             .field("Table", |e| e.table.clone())
//!             .field("Retries", |e| e.retries);
//!     }
//! }
//!
//! let error = QueryError {
//!     table: "users".into(),
//!     retries: 3,
//! };
//! let mapping = unravel::destructure_shape(&error);
//!
//! assert_eq!(mapping.get(keys::TYPE).unwrap().as_str(), Some("QueryError"));
//! assert_eq!(mapping.get("Table").unwrap().as_str(), Some("users"));
//! assert_eq!(mapping.get("Retries").unwrap().as_u64(), Some(3));
//! ```

use alloc::{
    string::{String, ToString},
    vec::Vec,
};
use core::{
    any::{Any, TypeId},
    error::Error,
    fmt,
};

use triomphe::Arc;
use unravel_internals::{ErrorType, Mapping};

use crate::{
    cache,
    members::{MemberTable, TypeMembers},
};

/// Static description of an error type.
///
/// Implementing this trait is the registration mechanism that replaces
/// runtime reflection: [`ERROR_TYPE`](Self::ERROR_TYPE) names the type and
/// its place in the subtype hierarchy, and
/// [`declare_members`](Self::declare_members) lists the members that end up
/// in the destructured mapping.
///
/// Every method except `declare_members` has a default that mirrors plain
/// [`Error`] behavior: the chain pointer is [`Error::source`], there are no
/// aggregated errors and no data bag.
pub trait ErrorShape: Error + Send + Sync + Sized + 'static {
    /// The description of this type.
    ///
    /// Must be built with `ErrorType::new::<Self>(..)`.
    const ERROR_TYPE: &'static ErrorType;

    /// Declares the members of this type.
    ///
    /// Called at most a handful of times per process: the resulting table
    /// is cached per concrete type.
    fn declare_members(members: &mut MemberTable<Self>) {
        let _ = members;
    }

    /// The error that caused this one.
    ///
    /// Override this to return [`ErrorRef::shaped`] when the cause is itself
    /// a shaped error, so that its members are destructured without having
    /// to register its shape.
    fn inner_error(&self) -> Option<ErrorRef<'_>> {
        self.source().map(ErrorRef::opaque)
    }

    /// The sub-errors of an aggregate error, in order.
    fn inner_errors(&self) -> Option<Vec<ErrorRef<'_>>> {
        None
    }

    /// Auxiliary data attached to this error instance.
    fn data(&self) -> Option<&Mapping> {
        None
    }
}

/// Object-safe view of an [`ErrorShape`].
///
/// Blanket-implemented for every [`ErrorShape`]; the engine only ever sees
/// shaped errors through this trait.
pub trait Destructure: Error + Send + Sync + 'static {
    /// The description of the concrete type.
    fn error_type(&self) -> &'static ErrorType;

    /// The cached member table of the concrete type.
    fn type_members(&self) -> Arc<TypeMembers>;

    /// Upcasts to [`Any`], used to hand the instance to extractors.
    fn as_any(&self) -> &dyn Any;

    /// See [`ErrorShape::inner_error`].
    fn chained_error(&self) -> Option<ErrorRef<'_>>;

    /// See [`ErrorShape::inner_errors`].
    fn aggregated_errors(&self) -> Option<Vec<ErrorRef<'_>>>;

    /// See [`ErrorShape::data`].
    fn data_bag(&self) -> Option<&Mapping>;
}

impl<E: ErrorShape> Destructure for E {
    fn error_type(&self) -> &'static ErrorType {
        E::ERROR_TYPE
    }

    fn type_members(&self) -> Arc<TypeMembers> {
        cache::members_of::<E>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn chained_error(&self) -> Option<ErrorRef<'_>> {
        ErrorShape::inner_error(self)
    }

    fn aggregated_errors(&self) -> Option<Vec<ErrorRef<'_>>> {
        ErrorShape::inner_errors(self)
    }

    fn data_bag(&self) -> Option<&Mapping> {
        ErrorShape::data(self)
    }
}

/// A borrowed node of an error graph.
#[derive(Copy, Clone)]
pub enum ErrorRef<'e> {
    /// An error whose type implements [`ErrorShape`].
    Shaped(&'e dyn Destructure),
    /// Any other error, typically reached through [`Error::source`].
    Opaque(&'e (dyn Error + 'static)),
}

impl<'e> ErrorRef<'e> {
    /// Wraps a shaped error.
    pub fn shaped(error: &'e dyn Destructure) -> Self {
        ErrorRef::Shaped(error)
    }

    /// Wraps an error of unknown shape.
    pub fn opaque(error: &'e (dyn Error + 'static)) -> Self {
        ErrorRef::Opaque(error)
    }

    /// The node as a plain [`Error`].
    pub fn as_error(&self) -> &'e (dyn Error + 'static) {
        match *self {
            ErrorRef::Shaped(error) => error as &(dyn Error + 'static),
            ErrorRef::Opaque(error) => error,
        }
    }

    /// Returns `true` if the concrete type of the node is `T`.
    pub fn is<T: Error + 'static>(&self) -> bool {
        self.downcast_ref::<T>().is_some()
    }

    /// Returns the node as `&T` if its concrete type is `T`.
    pub fn downcast_ref<T: Error + 'static>(&self) -> Option<&'e T> {
        match *self {
            ErrorRef::Shaped(error) => error.as_any().downcast_ref::<T>(),
            ErrorRef::Opaque(error) => error.downcast_ref::<T>(),
        }
    }

    /// The [`TypeId`] of the concrete type, when known.
    ///
    /// Opaque nodes do not expose their type.
    pub fn type_id(&self) -> Option<TypeId> {
        match *self {
            ErrorRef::Shaped(error) => Some(Any::type_id(error.as_any())),
            ErrorRef::Opaque(_) => None,
        }
    }

    /// The [`Display`](fmt::Display) output of the node.
    pub fn message(&self) -> String {
        self.as_error().to_string()
    }

    /// The cause of this node.
    pub fn chained_error(&self) -> Option<ErrorRef<'e>> {
        match *self {
            ErrorRef::Shaped(error) => error.chained_error(),
            ErrorRef::Opaque(error) => error.source().map(ErrorRef::Opaque),
        }
    }

    /// The sub-errors of this node, if it is an aggregate.
    pub fn aggregated_errors(&self) -> Option<Vec<ErrorRef<'e>>> {
        match *self {
            ErrorRef::Shaped(error) => error.aggregated_errors(),
            ErrorRef::Opaque(_) => None,
        }
    }

    /// The auxiliary data bag of this node.
    pub fn data_bag(&self) -> Option<&'e Mapping> {
        match *self {
            ErrorRef::Shaped(error) => error.data_bag(),
            ErrorRef::Opaque(_) => None,
        }
    }
}

impl<'e, E: ErrorShape> From<&'e E> for ErrorRef<'e> {
    fn from(error: &'e E) -> Self {
        ErrorRef::Shaped(error)
    }
}

impl fmt::Display for ErrorRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.as_error(), f)
    }
}

impl fmt::Debug for ErrorRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorRef::Shaped(error) => f
                .debug_tuple("Shaped")
                .field(&error.error_type().name())
                .field(&format_args!("{error}"))
                .finish(),
            ErrorRef::Opaque(error) => f
                .debug_tuple("Opaque")
                .field(&format_args!("{error}"))
                .finish(),
        }
    }
}
