//! Per-type member tables.
//!
//! A [`MemberTable`] is the builder handed to
//! [`ErrorShape::declare_members`]. It turns typed accessors into
//! type-erased [`MemberDescriptor`]s, embeds the members of other shapes via
//! [`MemberTable::inherit`], and rejects members it cannot expose. Once
//! declaration is done the table runs the name conflict pass and freezes into
//! a [`TypeMembers`].
//!
//! # Ordering
//!
//! Members declared by the type itself come first, in declaration order,
//! followed by inherited members in the order the bases were inherited.
//!
//! # Rejected members
//!
//! A member is skipped, with a `debug` level trace, when its name is empty,
//! when it collides with one of the [reserved keys](crate::keys), or when
//! the same declaring type already declared a member of that name (which
//! happens with diamond-shaped inheritance). Skipping never fails the table.

use alloc::{borrow::Cow, boxed::Box, vec::Vec};
use core::{any::Any, fmt, marker::PhantomData};

use unravel_internals::{
    ErrorType, ExtractionFault, Extractor, MemberDescriptor, Value, resolve_name_conflicts,
};

use crate::{keys, shape::ErrorShape};

/// Projects an instance onto one of its embedded bases.
pub(crate) type Projection =
    Box<dyn for<'a> Fn(&'a dyn Any) -> Option<&'a dyn Any> + Send + Sync>;

/// Pins down the higher-ranked signature of a projection closure.
fn projection<F>(project: F) -> Projection
where
    F: for<'a> Fn(&'a dyn Any) -> Option<&'a dyn Any> + Send + Sync + 'static,
{
    Box::new(project)
}

fn type_mismatch<T>() -> ExtractionFault {
    ExtractionFault::new(alloc::format!(
        "instance is not a {}",
        core::any::type_name::<T>()
    ))
}

/// A base embedded with [`MemberTable::inherit`].
pub(crate) struct Ancestor {
    pub(crate) error_type: &'static ErrorType,
    pub(crate) project: Projection,
}

/// Builder for the member table of `T`.
///
/// # Examples
///
/// Embedding a base error and shadowing one of its members:
///
/// ```
/// use unravel::{ErrorShape, ErrorType, MemberTable};
///
/// #[derive(Debug, thiserror::Error)]
/// #[error("http request failed with {status}")]
/// struct HttpError {
///     status: u16,
/// }
///
/// impl ErrorShape for HttpError {
///     const ERROR_TYPE: &'static ErrorType = &ErrorType::new::<Self>("HttpError");
///
///     fn declare_members(members: &mut MemberTable<Self>) {
///         members.field("Status", |e| e.status);
///     }
/// }
///
/// #[derive(Debug, thiserror::Error)]
/// #[error("upstream unavailable")]
/// struct UpstreamError {
///     http: HttpError,
///     status: &'static str,
/// }
///
/// impl ErrorShape for UpstreamError {
///     const ERROR_TYPE: &'static ErrorType =
///         &ErrorType::new::<Self>("UpstreamError").extends(HttpError::ERROR_TYPE);
///
///     fn declare_members(members: &mut MemberTable<Self>) {
///         members
///             .field("Status", |e| e.status)
///             .inherit::<HttpError>(|e| &e.http);
///     }
/// }
///
/// let error = UpstreamError {
///     http: HttpError { status: 503 },
///     status: "degraded",
/// };
/// let mapping = unravel::destructure_shape(&error);
///
/// assert_eq!(mapping.get("UpstreamError.Status").unwrap().as_str(), Some("degraded"));
/// assert_eq!(mapping.get("Status").unwrap().as_u64(), Some(503));
/// ```
pub struct MemberTable<T: 'static> {
    declaring_type: &'static ErrorType,
    local: Vec<MemberDescriptor>,
    inherited: Vec<MemberDescriptor>,
    ancestors: Vec<Ancestor>,
    _table_of: PhantomData<fn(&T)>,
}

impl<T: 'static> MemberTable<T> {
    pub(crate) fn new(declaring_type: &'static ErrorType) -> Self {
        Self {
            declaring_type,
            local: Vec::new(),
            inherited: Vec::new(),
            ancestors: Vec::new(),
            _table_of: PhantomData,
        }
    }

    /// Declares a member read by an infallible accessor.
    pub fn field<V, F>(&mut self, name: impl Into<Cow<'static, str>>, get: F) -> &mut Self
    where
        V: Into<Value>,
        F: Fn(&T) -> V + Send + Sync + 'static,
    {
        self.try_field(name, move |instance| Ok(get(instance)))
    }

    /// Declares a member whose accessor can fail.
    ///
    /// A failure does not abort destructuring: the member is stored as a
    /// [`Value::ExtractionFailed`] marker.
    pub fn try_field<V, F>(&mut self, name: impl Into<Cow<'static, str>>, get: F) -> &mut Self
    where
        V: Into<Value>,
        F: Fn(&T) -> Result<V, ExtractionFault> + Send + Sync + 'static,
    {
        let extractor: Extractor = Box::new(move |instance: &dyn Any| -> Result<Value, ExtractionFault> {
            let instance = instance.downcast_ref::<T>().ok_or_else(type_mismatch::<T>)?;
            get(instance).map(Into::into)
        });
        let descriptor = MemberDescriptor::new(name, Some(self.declaring_type), extractor);
        if self.accepts(&descriptor) {
            self.local.push(descriptor);
        }
        self
    }

    /// Embeds all members of the shape `B`, reached through `project`.
    ///
    /// The embedded members keep `B` (or whichever of `B`'s bases declared
    /// them) as their declaring type. Declare the subtype relation with
    /// [`ErrorType::extends`] so that members of `T` shadowing members of
    /// `B` are renamed instead of overwriting them.
    ///
    /// Destructurers registered for `B` also apply to `T` when no more
    /// specific destructurer is registered.
    pub fn inherit<B: ErrorShape>(&mut self, project: fn(&T) -> &B) -> &mut Self {
        let mut base = MemberTable::<B>::new(B::ERROR_TYPE);
        B::declare_members(&mut base);
        let MemberTable {
            local,
            inherited,
            ancestors,
            ..
        } = base;

        for descriptor in local.into_iter().chain(inherited) {
            let descriptor = descriptor.rebind(|extract| {
                Box::new(move |instance: &dyn Any| -> Result<Value, ExtractionFault> {
                    let instance = instance.downcast_ref::<T>().ok_or_else(type_mismatch::<T>)?;
                    extract(project(instance) as &dyn Any)
                })
            });
            if self.accepts(&descriptor) {
                self.inherited.push(descriptor);
            }
        }

        self.ancestors.push(Ancestor {
            error_type: B::ERROR_TYPE,
            project: projection(move |instance| {
                let instance = instance.downcast_ref::<T>()?;
                Some(project(instance) as &dyn Any)
            }),
        });
        for ancestor in ancestors {
            let Ancestor {
                error_type,
                project: project_further,
            } = ancestor;
            self.ancestors.push(Ancestor {
                error_type,
                project: projection(move |instance| {
                    let instance = instance.downcast_ref::<T>()?;
                    project_further(project(instance) as &dyn Any)
                }),
            });
        }
        self
    }

    fn accepts(&self, descriptor: &MemberDescriptor) -> bool {
        let name = descriptor.name();
        let reason = if name.is_empty() {
            "empty member name"
        } else if keys::is_reserved(name) {
            "member name collides with a reserved key"
        } else if self
            .local
            .iter()
            .chain(&self.inherited)
            .any(|existing| existing.name() == name && existing.declaring_type() == descriptor.declaring_type())
        {
            "member already declared by the same type"
        } else {
            return true;
        };

        tracing::debug!(
            error_type = self.declaring_type.name(),
            member = name,
            reason,
            "skipping member"
        );
        false
    }

    pub(crate) fn finish(self) -> TypeMembers {
        let mut descriptors = self.local;
        descriptors.extend(self.inherited);
        resolve_name_conflicts(&descriptors);
        TypeMembers {
            error_type: self.declaring_type,
            descriptors,
            ancestors: self.ancestors,
        }
    }
}

/// The frozen member table of one concrete type.
///
/// Shared through the [type member cache](crate::cache); every instance of
/// the type uses the same table.
pub struct TypeMembers {
    error_type: &'static ErrorType,
    descriptors: Vec<MemberDescriptor>,
    ancestors: Vec<Ancestor>,
}

impl TypeMembers {
    /// The type this table describes.
    pub fn error_type(&self) -> &'static ErrorType {
        self.error_type
    }

    /// The member descriptors, in output order.
    pub fn descriptors(&self) -> &[MemberDescriptor] {
        &self.descriptors
    }

    /// Looks up a descriptor by its exposed name.
    pub fn get(&self, exposed_name: &str) -> Option<&MemberDescriptor> {
        self.descriptors
            .iter()
            .find(|descriptor| descriptor.exposed_name() == exposed_name)
    }

    /// The number of members.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Returns `true` if the type declares no members.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// The embedded bases, nearest first.
    pub(crate) fn ancestors(&self) -> &[Ancestor] {
        &self.ancestors
    }
}

impl fmt::Debug for TypeMembers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeMembers")
            .field("error_type", &self.error_type.name())
            .field("descriptors", &self.descriptors)
            .field(
                "ancestors",
                &self
                    .ancestors
                    .iter()
                    .map(|ancestor| ancestor.error_type.name())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

pub(crate) fn build<E: ErrorShape>() -> TypeMembers {
    let mut table = MemberTable::<E>::new(E::ERROR_TYPE);
    E::declare_members(&mut table);
    table.finish()
}
