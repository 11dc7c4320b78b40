//! Member descriptors and the name conflict pass.
//!
//! A [`MemberDescriptor`] is created once per (type, member) pair when the
//! member table of a type is first built. It owns a type-erased
//! [`Extractor`] and the rename-once state of its exposed name.
//!
//! # Rename state machine
//!
//! The exposed name has two states, unmarked and marked, with a single
//! allowed transition. Unmarked descriptors are exposed under their own
//! name. [`MemberDescriptor::mark_name_with_type_name`] performs the
//! transition to `"<DeclaringType>.<name>"`; every later call is a no-op.
//!
//! # Conflict resolution
//!
//! [`resolve_name_conflicts`] compares every pair of descriptors that share
//! an exposed name. Only the descriptor whose declaring type is a strict
//! subtype of the other's declaring type is renamed. When neither type
//! extends the other, both keep their name and the later one overwrites the
//! earlier one in the produced mapping.

use alloc::{borrow::Cow, boxed::Box, format, string::String};
use core::{any::Any, fmt};

use crate::{ErrorType, ExtractionFault, Value};

/// A type-erased extractor.
///
/// Receives the error instance as [`Any`] and returns the member value. An
/// extractor must not have side effects. It reports failure by returning an
/// [`ExtractionFault`], which the engine turns into a marker value.
pub type Extractor = Box<dyn Fn(&dyn Any) -> Result<Value, ExtractionFault> + Send + Sync>;

/// Describes one extractable member of an error type.
///
/// # Examples
///
/// ```
/// use unravel_internals::{ErrorType, MemberDescriptor, Value};
///
/// struct Base;
/// struct Derived;
///
/// const BASE: &ErrorType = &ErrorType::new::<Base>("Base");
/// const DERIVED: &ErrorType = &ErrorType::new::<Derived>("Derived").extends(BASE);
///
/// let inherited = MemberDescriptor::new("Code", Some(BASE), Box::new(|_| Ok(Value::from(1))));
/// let shadowing = MemberDescriptor::new("Code", Some(DERIVED), Box::new(|_| Ok(Value::from(2))));
///
/// shadowing.mark_name_with_type_name_if_redefines(&inherited);
/// inherited.mark_name_with_type_name_if_redefines(&shadowing);
///
/// assert_eq!(shadowing.exposed_name(), "Derived.Code");
/// assert_eq!(inherited.exposed_name(), "Code");
/// ```
pub struct MemberDescriptor {
    /// The member's own name.
    name: Cow<'static, str>,
    /// The type that introduced the member, `None` for synthetic members.
    declaring_type: Option<&'static ErrorType>,
    /// Reads the member from an instance.
    extractor: Extractor,
    /// The qualified name, set at most once.
    marked: spin::Once<String>,
}

impl MemberDescriptor {
    /// Creates an unmarked descriptor.
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        declaring_type: Option<&'static ErrorType>,
        extractor: Extractor,
    ) -> Self {
        Self {
            name: name.into(),
            declaring_type,
            extractor,
            marked: spin::Once::new(),
        }
    }

    /// Creates a descriptor that no type declared.
    ///
    /// Synthetic descriptors never take part in renaming.
    pub fn synthetic(name: impl Into<Cow<'static, str>>, extractor: Extractor) -> Self {
        Self::new(name, None, extractor)
    }

    /// Replaces the extractor while keeping name and declaring type.
    ///
    /// Used when a member table embeds the members of another type and has to
    /// route extraction through a projection. The rename state is not carried
    /// over, so this is only meant to be called before conflict resolution.
    #[must_use]
    pub fn rebind(self, rebind: impl FnOnce(Extractor) -> Extractor) -> Self {
        Self::new(self.name, self.declaring_type, rebind(self.extractor))
    }

    /// The member's own name, regardless of renaming.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The name this member is stored under in a produced mapping.
    pub fn exposed_name(&self) -> &str {
        self.marked.get().map_or(&*self.name, String::as_str)
    }

    /// The type that introduced this member.
    pub fn declaring_type(&self) -> Option<&'static ErrorType> {
        self.declaring_type
    }

    /// Returns `true` once the exposed name has been qualified with the
    /// declaring type name.
    pub fn is_marked_with_type_name(&self) -> bool {
        self.marked.is_completed()
    }

    /// Reads the member from `instance`.
    ///
    /// Failures are returned as they are; catching them is the engine's job.
    pub fn extract(&self, instance: &dyn Any) -> Result<Value, ExtractionFault> {
        (self.extractor)(instance)
    }

    /// Qualifies the exposed name with the declaring type name.
    ///
    /// Idempotent, and a no-op for synthetic members.
    pub fn mark_name_with_type_name(&self) {
        let Some(declaring_type) = self.declaring_type else {
            return;
        };
        self.marked
            .call_once(|| format!("{}.{}", declaring_type.name(), self.name));
    }

    /// Qualifies the exposed name if this member redefines `other`.
    ///
    /// This is a no-op when `other` is this very descriptor, when either
    /// member is synthetic, when the exposed names differ, or when this
    /// descriptor has already been marked. Otherwise the name is qualified
    /// iff the declaring type of `self` is a strict subtype of the declaring
    /// type of `other`.
    pub fn mark_name_with_type_name_if_redefines(&self, other: &MemberDescriptor) {
        if core::ptr::eq(self, other) || self.is_marked_with_type_name() {
            return;
        }
        let (Some(own_type), Some(other_type)) = (self.declaring_type, other.declaring_type) else {
            return;
        };
        if self.exposed_name() != other.exposed_name() {
            return;
        }
        if own_type.is_strict_subtype_of(other_type) {
            self.mark_name_with_type_name();
        }
    }
}

impl fmt::Debug for MemberDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberDescriptor")
            .field("name", &self.name)
            .field("exposed_name", &self.exposed_name())
            .field("declaring_type", &self.declaring_type.map(ErrorType::name))
            .finish_non_exhaustive()
    }
}

/// Runs the pairwise conflict check across `descriptors`.
///
/// Afterwards, no two descriptors share an exposed name unless their
/// declaring types are unrelated or one of them is synthetic.
pub fn resolve_name_conflicts(descriptors: &[MemberDescriptor]) {
    for descriptor in descriptors {
        for other in descriptors {
            if descriptor.name() == other.name() {
                descriptor.mark_name_with_type_name_if_redefines(other);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::{vec, vec::Vec};

    use super::*;

    struct Root;
    struct Middle;
    struct Leaf;
    struct Mixin;

    const ROOT: &ErrorType = &ErrorType::new::<Root>("Root");
    const MIDDLE: &ErrorType = &ErrorType::new::<Middle>("Middle").extends(ROOT);
    const LEAF: &ErrorType = &ErrorType::new::<Leaf>("Leaf").extends(MIDDLE);
    const MIXIN: &ErrorType = &ErrorType::new::<Mixin>("Mixin");

    fn constant(name: &'static str, declaring_type: Option<&'static ErrorType>) -> MemberDescriptor {
        MemberDescriptor::new(name, declaring_type, Box::new(|_| Ok(Value::Null)))
    }

    fn exposed(descriptors: &[MemberDescriptor]) -> Vec<&str> {
        descriptors.iter().map(MemberDescriptor::exposed_name).collect()
    }

    #[test]
    fn test_descriptor_send_sync() {
        static_assertions::assert_impl_all!(MemberDescriptor: Send, Sync);
        static_assertions::assert_not_impl_any!(MemberDescriptor: Clone);
    }

    #[test]
    fn test_mark_is_idempotent() {
        let descriptor = constant("Code", Some(LEAF));
        assert!(!descriptor.is_marked_with_type_name());

        descriptor.mark_name_with_type_name();
        let once = String::from(descriptor.exposed_name());
        descriptor.mark_name_with_type_name();

        assert_eq!(once, "Leaf.Code");
        assert_eq!(descriptor.exposed_name(), once);
        assert!(descriptor.is_marked_with_type_name());
        assert_eq!(descriptor.name(), "Code");
    }

    #[test]
    fn test_mark_synthetic_is_noop() {
        let descriptor = constant("Data", None);
        descriptor.mark_name_with_type_name();
        assert_eq!(descriptor.exposed_name(), "Data");
        assert!(!descriptor.is_marked_with_type_name());
    }

    #[test]
    fn test_redefines_self_is_noop() {
        let descriptor = constant("Code", Some(LEAF));
        descriptor.mark_name_with_type_name_if_redefines(&descriptor);
        assert_eq!(descriptor.exposed_name(), "Code");
    }

    #[test]
    fn test_redefines_renames_only_the_subtype() {
        let base = constant("Code", Some(ROOT));
        let derived = constant("Code", Some(LEAF));

        base.mark_name_with_type_name_if_redefines(&derived);
        assert_eq!(base.exposed_name(), "Code");

        derived.mark_name_with_type_name_if_redefines(&base);
        assert_eq!(derived.exposed_name(), "Leaf.Code");
        assert_eq!(base.exposed_name(), "Code");
    }

    #[test]
    fn test_redefines_ignores_different_names() {
        let base = constant("Code", Some(ROOT));
        let derived = constant("Status", Some(LEAF));
        derived.mark_name_with_type_name_if_redefines(&base);
        assert_eq!(derived.exposed_name(), "Status");
    }

    #[test]
    fn test_redefines_ignores_unrelated_and_synthetic() {
        let mixin = constant("Code", Some(MIXIN));
        let derived = constant("Code", Some(LEAF));
        let synthetic = constant("Code", None);

        derived.mark_name_with_type_name_if_redefines(&mixin);
        mixin.mark_name_with_type_name_if_redefines(&derived);
        derived.mark_name_with_type_name_if_redefines(&synthetic);
        synthetic.mark_name_with_type_name_if_redefines(&derived);

        assert_eq!(derived.exposed_name(), "Code");
        assert_eq!(mixin.exposed_name(), "Code");
        assert_eq!(synthetic.exposed_name(), "Code");
    }

    #[test]
    fn test_resolve_three_levels_in_any_order() {
        let orders: [[&'static ErrorType; 3]; 3] =
            [[ROOT, MIDDLE, LEAF], [LEAF, MIDDLE, ROOT], [MIDDLE, LEAF, ROOT]];

        for order in orders {
            let descriptors: Vec<_> = order.iter().map(|&ty| constant("X", Some(ty))).collect();
            resolve_name_conflicts(&descriptors);

            let mut names = exposed(&descriptors);
            names.sort_unstable();
            assert_eq!(names, ["Leaf.X", "Middle.X", "X"]);
        }
    }

    #[test]
    fn test_resolve_leaves_unique_names_alone() {
        let descriptors = vec![
            constant("Code", Some(ROOT)),
            constant("Path", Some(LEAF)),
            constant("Kind", Some(MIDDLE)),
        ];
        resolve_name_conflicts(&descriptors);
        assert_eq!(exposed(&descriptors), ["Code", "Path", "Kind"]);
    }

    #[test]
    fn test_extract_passes_faults_through() {
        let descriptor = MemberDescriptor::new(
            "Broken",
            Some(ROOT),
            Box::new(|_| Err(ExtractionFault::new("getter failed"))),
        );
        let fault = descriptor.extract(&()).unwrap_err();
        assert_eq!(fault.message(), "getter failed");
    }

    #[test]
    fn test_rebind_keeps_identity() {
        let descriptor = MemberDescriptor::new("Code", Some(ROOT), Box::new(|_| Ok(Value::from(1))));
        let rebound = descriptor.rebind(|inner| {
            Box::new(move |any| Ok(Value::Sequence(vec![inner(any)?])))
        });
        assert_eq!(rebound.name(), "Code");
        assert_eq!(rebound.declaring_type(), Some(ROOT));
        assert_eq!(
            rebound.extract(&()).unwrap(),
            Value::Sequence(vec![Value::I64(1)])
        );
    }
}
