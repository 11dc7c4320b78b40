#![cfg_attr(not(doc), no_std)]
#![deny(
    missing_docs,
    clippy::alloc_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::std_instead_of_core,
    clippy::missing_safety_doc,
    clippy::undocumented_unsafe_blocks,
    clippy::multiple_unsafe_ops_per_block,
    clippy::as_ptr_cast_mut,
    clippy::ptr_as_ptr,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]
// Make docs.rs generate better docs
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Turns error graphs into structured, loggable key-value mappings.
//!
//! ## Overview
//!
//! Logging an error as a single string loses everything that made it useful
//! in the first place: the status code, the table name, the retry count, and
//! the errors that caused it. This crate destructures an error, together with
//! its chain of causes, the sub-errors of aggregate errors, and any attached
//! data, into an ordered [`Mapping`] of names to [`Value`]s that a
//! structured logging pipeline can emit as-is.
//!
//! ## Quick Example
//!
//! ```
//! use unravel::{ErrorShape, ErrorType, MemberTable, keys};
//!
//! #[derive(Debug, thiserror::Error)]
//! #[error("boom")]
//! struct RequestError {
//!     code: i32,
//!     #[source]
//!     cause: std::io::Error,
//! }
//!
//! impl ErrorShape for RequestError {
//!     const ERROR_TYPE: &'static ErrorType = &ErrorType::new::<Self>("RequestError");
//!
//!     fn declare_members(members: &mut MemberTable<Self>) {
//!         members.field("Code", |e| e.code);
//!     }
//! }
//!
//! let error = RequestError {
//!     code: 42,
//!     cause: std::io::Error::other("root cause"),
//! };
//! let mapping = unravel::destructure_shape(&error);
//!
//! assert_eq!(mapping.get(keys::TYPE).unwrap().as_str(), Some("RequestError"));
//! assert_eq!(mapping.get(keys::MESSAGE).unwrap().as_str(), Some("boom"));
//! assert_eq!(mapping.get("Code").unwrap().as_i64(), Some(42));
//!
//! let inner = mapping.get(keys::INNER_EXCEPTION).unwrap().as_map().unwrap();
//! assert_eq!(inner.get(keys::MESSAGE).unwrap().as_str(), Some("root cause"));
//! ```
//!
//! ## Core Concepts
//!
//! - An [`ErrorShape`] describes an error type: its name, its place in a
//!   subtype hierarchy ([`ErrorType`]), and its members ([`MemberTable`]).
//!   Member tables are built once per type and cached ([`cache`]). When a
//!   member declared by a type has the same name as a member of one of its
//!   bases, the more derived one is exposed as `Type.Member`.
//! - [Destructurers](destructurer) write the members of specific error
//!   types. The most specific one wins; shaped errors fall back to their
//!   declared members.
//! - [Filters](filter) leave out members by name, type or any predicate.
//! - The [`Engine`] walks the error graph with a per-call cycle guard and
//!   never fails: members that cannot be read become
//!   [`Value::ExtractionFailed`] markers.
//! - [`DestructuringOptions`] configures an engine and installs it globally.
//!
//! ## Reserved keys
//!
//! Every mapping starts with [`keys::TYPE`] and [`keys::MESSAGE`]. When
//! destructuring recursively, causes are attached under
//! [`keys::INNER_EXCEPTION`] and the sub-errors of aggregates under
//! [`keys::INNER_EXCEPTIONS`]. Attached data appears under [`keys::DATA`].
//!
//! ## Features
//!
//! - `std`: uses `std` locks and captures panics raised by member accessors.
//!   Adds destructurers for `std::io::Error` and `std::env::VarError`.
//! - `serde`: implements `Serialize` for [`Value`] and [`Mapping`].
//! - `compat-anyhow1`, `compat-eyre06`: see [`compat`].

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod cache;
pub mod compat;
pub mod destructurer;
pub mod filter;
pub mod keys;
pub mod prelude;

mod aggregate;
mod cache_lock;
mod engine;
mod members;
mod options;
mod shape;
mod util;

use core::error::Error;

pub use unravel_internals::{ErrorType, ExtractionFault, Mapping, MemberDescriptor, Value};

pub use self::{
    aggregate::AggregateError,
    engine::{DEFAULT_ROOT_NAME, Destructuring, Engine},
    members::{MemberTable, TypeMembers},
    options::{DestructuringOptions, LeakedEngine, OptionsAlreadyInstalledError},
    shape::{Destructure, ErrorRef, ErrorShape},
};

/// Destructures `error` and its causes with the [global engine](Engine::global).
///
/// `error` is treated as opaque unless its type has a registered destructurer
/// or shape. Use [`destructure_shape`] for shaped errors.
pub fn destructure(error: &(dyn Error + 'static)) -> Mapping {
    Engine::global().destructure_error(error, true)
}

/// Destructures a shaped error and its causes with the
/// [global engine](Engine::global).
pub fn destructure_shape<E: ErrorShape>(error: &E) -> Mapping {
    Engine::global().destructure_shape(error, true)
}
