//! An error bundling several independent failures.

use alloc::{borrow::Cow, boxed::Box, vec::Vec};
use core::{error::Error, fmt};

use unravel_internals::ErrorType;

use crate::{
    members::MemberTable,
    shape::{ErrorRef, ErrorShape},
};

type BoxedError = Box<dyn Error + Send + Sync + 'static>;

/// Several failures that happened together, for instance in parallel work.
///
/// Destructures to a `Count` member, an `InnerExceptions` sequence holding
/// every sub-error in order, and an `InnerException` holding the first one.
///
/// # Examples
///
/// ```
/// use std::error::Error;
///
/// use unravel::{AggregateError, keys};
///
/// let errors: Vec<Box<dyn Error + Send + Sync>> = vec![
///     "x".parse::<u8>().unwrap_err().into(),
///     "1.2.3".parse::<f64>().unwrap_err().into(),
/// ];
/// let error = AggregateError::new("two lookups failed", errors);
/// let mapping = unravel::destructure_shape(&error);
///
/// let sub_errors = mapping.get(keys::INNER_EXCEPTIONS).unwrap().as_sequence().unwrap();
/// assert_eq!(sub_errors.len(), 2);
/// assert_eq!(mapping.get("Count").unwrap().as_u64(), Some(2));
/// ```
pub struct AggregateError {
    message: Cow<'static, str>,
    errors: Vec<BoxedError>,
}

impl AggregateError {
    /// Bundles `errors` under `message`.
    pub fn new(message: impl Into<Cow<'static, str>>, errors: Vec<BoxedError>) -> Self {
        Self {
            message: message.into(),
            errors,
        }
    }

    /// Adds another sub-error.
    pub fn push(&mut self, error: impl Into<BoxedError>) {
        self.errors.push(error.into());
    }

    /// The sub-errors, in order.
    pub fn errors(&self) -> &[BoxedError] {
        &self.errors
    }

    /// The number of sub-errors.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns `true` if there are no sub-errors.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} errors)", self.message, self.errors.len())
    }
}

impl fmt::Debug for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregateError")
            .field("message", &self.message)
            .field("errors", &self.errors)
            .finish()
    }
}

impl Error for AggregateError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.errors
            .first()
            .map(|error| &**error as &(dyn Error + 'static))
    }
}

impl ErrorShape for AggregateError {
    const ERROR_TYPE: &'static ErrorType = &ErrorType::new::<Self>("AggregateError");

    fn declare_members(members: &mut MemberTable<Self>) {
        members.field("Count", AggregateError::len);
    }

    fn inner_errors(&self) -> Option<Vec<ErrorRef<'_>>> {
        Some(
            self.errors
                .iter()
                .map(|error| ErrorRef::opaque(&**error as &(dyn Error + 'static)))
                .collect(),
        )
    }
}

impl FromIterator<BoxedError> for AggregateError {
    fn from_iter<I: IntoIterator<Item = BoxedError>>(iter: I) -> Self {
        Self::new("one or more errors occurred", iter.into_iter().collect())
    }
}
