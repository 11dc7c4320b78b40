//! The default reflective destructurer.
//!
//! Writes every member of the node's [type member table](crate::cache) in
//! table order, under each member's exposed name. It is used for every
//! shaped error that has no more specific destructurer, unless disabled with
//! [`DestructuringOptions::without_reflection`](crate::DestructuringOptions::without_reflection).

use crate::{
    cache,
    destructurer::Destructurer,
    engine::Destructuring,
    shape::{ErrorRef, ErrorShape},
};

/// Writes the declared members of a shaped error.
///
/// Registering it explicitly for a type restores the default behavior for
/// that type when it would otherwise be handled by a destructurer registered
/// for one of its bases.
#[derive(Copy, Clone, Debug, Default)]
pub struct ReflectionDestructurer;

impl<E: ErrorShape> Destructurer<E> for ReflectionDestructurer {
    fn destructure<'e>(&self, error: &'e E, cx: &mut Destructuring<'_, 'e>) {
        match cx.error() {
            ErrorRef::Shaped(_) => cx.insert_declared_members(),
            // Reached through `Error::source` without a registered shape.
            ErrorRef::Opaque(_) => cx.insert_members(error, &cache::members_of::<E>()),
        };
    }
}

pub(crate) fn destructure_declared(cx: &mut Destructuring<'_, '_>) {
    cx.insert_declared_members();
}
