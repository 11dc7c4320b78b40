//! Reserved keys of a destructured mapping.
//!
//! Every mapping produced by the engine starts with [`TYPE`] and
//! [`MESSAGE`]. The chain keys are only present when destructuring
//! recursively and the error has something to chain to.
//!
//! Member names equal to one of these keys are rejected when a member table
//! is built.

/// The name of the concrete error type.
pub const TYPE: &str = "Type";

/// The [`Display`](core::fmt::Display) output of the error.
pub const MESSAGE: &str = "Message";

/// The destructured mapping of the error's cause.
pub const INNER_EXCEPTION: &str = "InnerException";

/// The ordered destructured mappings of an aggregate's sub-errors.
pub const INNER_EXCEPTIONS: &str = "InnerExceptions";

/// The auxiliary data bag of the error, as a nested mapping.
pub const DATA: &str = "Data";

/// The type name used for errors whose concrete type is unknown.
///
/// These are errors reached through [`Error::source`] whose type has no
/// registered destructurer and no registered shape.
///
/// [`Error::source`]: core::error::Error::source
pub const OPAQUE_TYPE_NAME: &str = "Error";

pub(crate) const RESERVED: [&str; 5] = [TYPE, MESSAGE, INNER_EXCEPTION, INNER_EXCEPTIONS, DATA];

pub(crate) fn is_reserved(name: &str) -> bool {
    RESERVED.contains(&name)
}
