//! Destructurers and the registry that selects them.
//!
//! A [`Destructurer<E>`] writes the members of an `E` into a
//! [`Destructuring`] context. The engine picks the most specific one for
//! every node it visits:
//!
//! 1. a destructurer registered for the exact concrete type,
//! 2. for shaped errors, a destructurer registered for one of the bases
//!    embedded with [`MemberTable::inherit`], nearest first; it receives the
//!    embedded base value,
//! 3. the [reflective destructurer](reflection), which writes the declared
//!    members of shaped errors, unless it has been disabled.
//!
//! Errors reached through [`Error::source`] are opaque until recognized:
//! either as a shape registered with
//! [`DestructuringOptions::shape`](crate::DestructuringOptions::shape), or as
//! the type of a registered destructurer. Unrecognized errors only get the
//! reserved `Type` and `Message` keys.
//!
//! [`MemberTable::inherit`]: crate::MemberTable::inherit

pub mod builtin;
pub mod reflection;

pub use self::reflection::ReflectionDestructurer;

use core::{
    any::{Any, TypeId},
    error::Error,
    fmt,
    marker::PhantomData,
};

use hashbrown::HashMap;
use rustc_hash::FxBuildHasher;
use triomphe::Arc;
use unsize::CoerceUnsize;

use crate::{
    engine::{Destructuring, Identity},
    keys,
    shape::{Destructure, ErrorRef, ErrorShape},
    util::short_type_name,
};

/// Writes the members of errors of type `E`.
///
/// Closures of the form
/// `for<'e> Fn(&'e E, &mut Destructuring<'_, 'e>)` implement this trait.
///
/// # Examples
///
/// ```
/// use core::num::ParseIntError;
///
/// use unravel::{DestructuringOptions, Destructuring};
///
/// let engine = DestructuringOptions::new_without_defaults()
///     .destructurer::<ParseIntError, _>(|error: &ParseIntError, cx: &mut Destructuring<'_, '_>| {
///         cx.insert("Kind", format!("{:?}", error.kind()));
///     })
///     .build();
///
/// let error = "x".parse::<u8>().unwrap_err();
/// let mapping = engine.destructure_error(&error, true);
///
/// assert_eq!(mapping.get("Type").unwrap().as_str(), Some("ParseIntError"));
/// assert_eq!(mapping.get("Kind").unwrap().as_str(), Some("InvalidDigit"));
/// ```
pub trait Destructurer<E: 'static>: 'static + Send + Sync {
    /// Writes the members of `error` into `cx`.
    ///
    /// `Type` and `Message` are already present; the chain keys and the data
    /// bag are added by the engine afterwards.
    fn destructure<'e>(&self, error: &'e E, cx: &mut Destructuring<'_, 'e>);
}

impl<E, F> Destructurer<E> for F
where
    E: 'static,
    F: for<'e> Fn(&'e E, &mut Destructuring<'_, 'e>) + 'static + Send + Sync,
{
    fn destructure<'e>(&self, error: &'e E, cx: &mut Destructuring<'_, 'e>) {
        self(error, cx);
    }
}

/// A destructurer that writes nothing beyond the reserved keys.
///
/// Registering it for a foreign type makes the engine report the type's
/// name instead of the opaque placeholder.
#[derive(Copy, Clone, Debug, Default)]
pub struct NameOnly;

impl<E: 'static> Destructurer<E> for NameOnly {
    fn destructure<'e>(&self, _error: &'e E, _cx: &mut Destructuring<'_, 'e>) {}
}

/// Type-erased destructurer stored in the registry.
pub(crate) trait StoredDestructurer: 'static + Send + Sync {
    /// The type this destructurer was registered for.
    fn error_type_id(&self) -> TypeId;

    fn type_name(&self) -> &'static str;

    /// Runs the destructurer. Does nothing if `error` has the wrong type.
    fn destructure_any<'e>(&self, error: &'e dyn Any, cx: &mut Destructuring<'_, 'e>);

    fn downcast_opaque<'e>(&self, error: &'e (dyn Error + 'static)) -> Option<&'e dyn Any>;
}

struct Typed<E, D> {
    destructurer: D,
    type_name: &'static str,
    _destructured: PhantomData<fn(&E)>,
}

impl<E, D> StoredDestructurer for Typed<E, D>
where
    E: Error + 'static,
    D: Destructurer<E>,
{
    fn error_type_id(&self) -> TypeId {
        TypeId::of::<E>()
    }

    fn type_name(&self) -> &'static str {
        self.type_name
    }

    fn destructure_any<'e>(&self, error: &'e dyn Any, cx: &mut Destructuring<'_, 'e>) {
        if let Some(error) = error.downcast_ref::<E>() {
            self.destructurer.destructure(error, cx);
        }
    }

    fn downcast_opaque<'e>(&self, error: &'e (dyn Error + 'static)) -> Option<&'e dyn Any> {
        error.downcast_ref::<E>().map(|error| error as &dyn Any)
    }
}

/// Upgrades an opaque error to a shaped one when it has the right type.
pub(crate) type ShapeRecognizer = for<'e> fn(&'e (dyn Error + 'static)) -> Option<&'e dyn Destructure>;

fn recognize<'e, E: ErrorShape>(error: &'e (dyn Error + 'static)) -> Option<&'e dyn Destructure> {
    error
        .downcast_ref::<E>()
        .map(|error| error as &dyn Destructure)
}

/// How a node is going to be destructured.
pub(crate) enum Selection<'r, 'e> {
    Specialized {
        destructurer: &'r dyn StoredDestructurer,
        instance: &'e dyn Any,
    },
    Reflective,
    ReservedOnly,
}

/// A node after registry lookup.
pub(crate) struct Resolved<'r, 'e> {
    pub(crate) error: ErrorRef<'e>,
    pub(crate) type_name: &'static str,
    pub(crate) identity: Identity,
    pub(crate) selection: Selection<'r, 'e>,
}

/// The registered destructurers and shape recognizers.
#[derive(Clone, Default)]
pub(crate) struct DestructurerMap {
    destructurers: HashMap<TypeId, Arc<dyn StoredDestructurer>, FxBuildHasher>,
    recognizers: HashMap<TypeId, ShapeRecognizer, FxBuildHasher>,
}

impl DestructurerMap {
    pub(crate) fn insert<E, D>(&mut self, destructurer: D)
    where
        E: Error + 'static,
        D: Destructurer<E>,
    {
        self.insert_named::<E, D>(short_type_name(core::any::type_name::<E>()), destructurer);
    }

    pub(crate) fn insert_named<E, D>(&mut self, type_name: &'static str, destructurer: D)
    where
        E: Error + 'static,
        D: Destructurer<E>,
    {
        let typed: Typed<E, D> = Typed {
            destructurer,
            type_name,
            _destructured: PhantomData,
        };
        let stored = Arc::new(typed).unsize(unsize::Coercion!(to dyn StoredDestructurer));
        self.destructurers.insert(TypeId::of::<E>(), stored);
    }

    pub(crate) fn insert_shape<E: ErrorShape>(&mut self) {
        self.recognizers
            .insert(TypeId::of::<E>(), recognize::<E> as ShapeRecognizer);
    }

    pub(crate) fn contains(&self, type_id: TypeId) -> bool {
        self.destructurers.contains_key(&type_id)
    }

    /// Picks the type name, identity and destructurer for a node.
    pub(crate) fn resolve<'r, 'e>(&'r self, error: ErrorRef<'e>, reflection: bool) -> Resolved<'r, 'e> {
        match error {
            ErrorRef::Shaped(error) => self.resolve_shaped(error, reflection),
            ErrorRef::Opaque(error) => {
                if let Some(shaped) = self
                    .recognizers
                    .values()
                    .find_map(|recognize| recognize(error))
                {
                    return self.resolve_shaped(shaped, reflection);
                }

                for destructurer in self.destructurers.values() {
                    if let Some(instance) = destructurer.downcast_opaque(error) {
                        return Resolved {
                            error: ErrorRef::Opaque(error),
                            type_name: destructurer.type_name(),
                            identity: Identity::typed(error, destructurer.error_type_id()),
                            selection: Selection::Specialized {
                                destructurer: &**destructurer,
                                instance,
                            },
                        };
                    }
                }

                Resolved {
                    error: ErrorRef::Opaque(error),
                    type_name: keys::OPAQUE_TYPE_NAME,
                    identity: Identity::opaque(error),
                    selection: Selection::ReservedOnly,
                }
            }
        }
    }

    fn resolve_shaped<'r, 'e>(&'r self, error: &'e dyn Destructure, reflection: bool) -> Resolved<'r, 'e> {
        let instance = error.as_any();
        let type_id = Any::type_id(instance);

        let selection = if let Some(destructurer) = self.destructurers.get(&type_id) {
            Selection::Specialized {
                destructurer: &**destructurer,
                instance,
            }
        } else if let Some(selection) = self.resolve_ancestor(error) {
            selection
        } else if reflection {
            Selection::Reflective
        } else {
            Selection::ReservedOnly
        };

        Resolved {
            error: ErrorRef::Shaped(error),
            type_name: error.error_type().name(),
            identity: Identity::typed(instance, type_id),
            selection,
        }
    }

    fn resolve_ancestor<'r, 'e>(&'r self, error: &'e dyn Destructure) -> Option<Selection<'r, 'e>> {
        if self.destructurers.is_empty() {
            return None;
        }
        let members = error.type_members();
        members.ancestors().iter().find_map(|ancestor| {
            let destructurer = self.destructurers.get(&ancestor.error_type.type_id())?;
            let instance = (ancestor.project)(error.as_any())?;
            Some(Selection::Specialized {
                destructurer: &**destructurer,
                instance,
            })
        })
    }
}

impl fmt::Debug for DestructurerMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DestructurerMap")
            .field(
                "destructurers",
                &self
                    .destructurers
                    .values()
                    .map(|destructurer| destructurer.type_name())
                    .collect::<alloc::vec::Vec<_>>(),
            )
            .field("shapes", &self.recognizers.len())
            .finish()
    }
}
