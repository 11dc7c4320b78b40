//! The failure of a single member extractor.

use alloc::{borrow::Cow, string::String};
use core::fmt;

/// Raised by an extractor that could not read its member.
///
/// The engine never propagates an [`ExtractionFault`] to its caller. It
/// stores it in the produced mapping as [`Value::ExtractionFailed`] under the
/// key of the member that failed.
///
/// [`Value::ExtractionFailed`]: crate::Value::ExtractionFailed
///
/// # Examples
///
/// ```
/// use unravel_internals::ExtractionFault;
///
/// let fault = ExtractionFault::new("connection pool already closed");
/// assert_eq!(fault.message(), "connection pool already closed");
/// assert_eq!(
///     fault.to_string(),
///     "member extraction failed: connection pool already closed"
/// );
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractionFault {
    /// Human-readable description of the failure.
    message: Cow<'static, str>,
}

impl ExtractionFault {
    /// Creates a fault with the given message.
    pub fn new(message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Creates a fault carrying the [`Display`](fmt::Display) output of
    /// `error`.
    pub fn from_error(error: &dyn core::error::Error) -> Self {
        Self::new(alloc::format!("{error}"))
    }

    /// The message describing the failure.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ExtractionFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "member extraction failed: {}", self.message)
    }
}

impl core::error::Error for ExtractionFault {}

impl From<&'static str> for ExtractionFault {
    fn from(message: &'static str) -> Self {
        Self::new(message)
    }
}

impl From<String> for ExtractionFault {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}
