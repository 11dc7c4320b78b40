//! Commonly used items for convenient importing.
//!
//! ```rust
//! use unravel::prelude::*;
//!
//! #[derive(Debug, thiserror::Error)]
//! #[error("timed out after {seconds}s")]
//! struct Timeout {
//!     seconds: u64,
//! }
//!
//! impl ErrorShape for Timeout {
//!     const ERROR_TYPE: &'static ErrorType = &ErrorType::new::<Self>("Timeout");
//!
//!     fn declare_members(members: &mut MemberTable<Self>) {
//!         members.field("Seconds", |e| e.seconds);
//!     }
//! }
//!
//! let mapping = unravel::destructure_shape(&Timeout { seconds: 30 });
//! assert_eq!(mapping.get("Seconds").and_then(Value::as_u64), Some(30));
//! ```

pub use crate::{
    Destructuring, DestructuringOptions, ErrorRef, ErrorShape, ErrorType, Mapping, MemberTable,
    Value, compat::DestructureExt, destructurer::Destructurer, filter::MemberFilter,
};
