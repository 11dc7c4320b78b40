//! Destructuring [`eyre::Report`] values.
//!
//! This module specifically supports `eyre` version 0.6.x. To enable it, add
//! the `compat-eyre06` feature flag to your `Cargo.toml`.

use unravel_internals::Mapping;

use crate::{Engine, compat::DestructureExt};

impl DestructureExt for eyre::Report {
    type Output = Mapping;

    fn destructure_with(&self, engine: &Engine, recursive: bool) -> Mapping {
        engine.destructure_error(&**self, recursive)
    }
}
