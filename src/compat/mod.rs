//! Destructuring errors from other error handling libraries.
//!
//! Error types such as [`anyhow::Error`] or `Box<dyn Error>` do not
//! implement [`core::error::Error`] themselves, so they cannot be handed to
//! [`crate::destructure`] directly. The [`DestructureExt`] trait bridges the
//! gap for them and for `Result`s carrying them.
//!
//! # Available Integrations
//!
//! - [`boxed_error`] - `Box<dyn Error>` and `Box<dyn Error + Send + Sync>`
//! - [`anyhow1`] - `anyhow` 1.x (requires the `compat-anyhow1` feature flag)
//! - [`eyre06`] - `eyre` 0.6.x (requires the `compat-eyre06` feature flag)
//!
//! # Example
//!
//! ```
//! use std::error::Error;
//!
//! use unravel::{compat::DestructureExt, keys};
//!
//! let result: Result<u8, Box<dyn Error + Send + Sync>> = "x".parse::<u8>().map_err(Into::into);
//! let mapping = result.destructure().unwrap();
//!
//! assert_eq!(mapping.get(keys::TYPE).unwrap().as_str(), Some("ParseIntError"));
//! ```

#[cfg(feature = "compat-anyhow1")]
pub mod anyhow1;
pub mod boxed_error;
#[cfg(feature = "compat-eyre06")]
pub mod eyre06;

use crate::Engine;

/// Destructures error values that do not implement
/// [`core::error::Error`] themselves.
pub trait DestructureExt {
    /// The result of destructuring: a mapping for errors, an optional
    /// mapping for `Result`s.
    type Output;

    /// Destructures with the given engine.
    fn destructure_with(&self, engine: &Engine, recursive: bool) -> Self::Output;

    /// Destructures recursively with the [global engine](Engine::global).
    fn destructure(&self) -> Self::Output {
        self.destructure_with(Engine::global(), true)
    }
}

impl<T, E: DestructureExt> DestructureExt for Result<T, E> {
    type Output = Option<E::Output>;

    fn destructure_with(&self, engine: &Engine, recursive: bool) -> Self::Output {
        self.as_ref()
            .err()
            .map(|error| error.destructure_with(engine, recursive))
    }
}
