#![no_std]
#![deny(
    missing_docs,
    unsafe_code,
    clippy::alloc_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::std_instead_of_core,
    clippy::missing_docs_in_private_items,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]
#![allow(rustdoc::private_intra_doc_links)]
//! Internal implementation crate for [`unravel`].
//!
//! # Overview
//!
//! This crate contains the leaf data structures that power the [`unravel`]
//! destructuring engine. It has no knowledge of the engine itself, of
//! filtering or of any registry; it only describes types, members and the
//! values extracted from them.
//!
//! **This crate is an implementation detail.** No semantic versioning guarantees
//! are provided. Users should depend on the [`unravel`] crate, not this one.
//!
//! # Architecture
//!
//! - **[`error_type`]**: [`ErrorType`], the static description of an error
//!   type: its name, its [`TypeId`](core::any::TypeId) and the type it
//!   extends. Answers subtype questions by walking the `extends` chain.
//! - **[`descriptor`]**: [`MemberDescriptor`], one extractable member of an
//!   error type together with its type-erased extractor, and
//!   [`resolve_name_conflicts`], the pass that renames members shadowing a
//!   same-named member of an ancestor type.
//! - **[`value`]**: [`Value`] and [`Mapping`], the loggable output of
//!   destructuring.
//! - **[`fault`]**: [`ExtractionFault`], the failure of a single extractor.
//!
//! # Renaming
//!
//! A [`MemberDescriptor`] starts out exposed under its own name. It can be
//! renamed to `"<DeclaringType>.<name>"` exactly once, after which the name
//! is frozen. The state is held in a [`spin::Once`] so that descriptors stay
//! `Send + Sync` and can be shared across threads after their table has
//! been built.
//!
//! [`unravel`]: https://docs.rs/unravel

extern crate alloc;

pub mod descriptor;
pub mod error_type;
pub mod fault;
pub mod value;

pub use self::{
    descriptor::{Extractor, MemberDescriptor, resolve_name_conflicts},
    error_type::ErrorType,
    fault::ExtractionFault,
    value::{Mapping, Value},
};
