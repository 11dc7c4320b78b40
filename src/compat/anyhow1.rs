//! Destructuring [`anyhow::Error`] values.
//!
//! This module specifically supports `anyhow` version 1.x. To enable it, add
//! the `compat-anyhow1` feature flag to your `Cargo.toml`.
//!
//! The outermost error of an [`anyhow::Error`] becomes the root of the
//! mapping; context added with `.context(..)` shows up as the outer levels of
//! the `InnerException` chain.
//!
//! ```
//! use anyhow::Context;
//! use unravel::{compat::DestructureExt, keys};
//!
//! let error = "x"
//!     .parse::<u8>()
//!     .context("failed to read the port")
//!     .unwrap_err();
//! let mapping = error.destructure();
//!
//! assert_eq!(mapping.get(keys::MESSAGE).unwrap().as_str(), Some("failed to read the port"));
//! let inner = mapping.get(keys::INNER_EXCEPTION).unwrap().as_map().unwrap();
//! assert_eq!(inner.get(keys::TYPE).unwrap().as_str(), Some("ParseIntError"));
//! ```

use unravel_internals::Mapping;

use crate::{Engine, compat::DestructureExt};

impl DestructureExt for anyhow::Error {
    type Output = Mapping;

    fn destructure_with(&self, engine: &Engine, recursive: bool) -> Mapping {
        engine.destructure_error(&**self, recursive)
    }
}
