//! The recursive destructuring engine.
//!
//! An [`Engine`] turns an error and everything reachable from it into a
//! [`Mapping`]. Every node gets the reserved `Type` and `Message` keys,
//! followed by whatever its destructurer writes, its data bag under `Data`
//! and, when destructuring recursively, its cause under `InnerException` and
//! the sub-errors of an aggregate under `InnerExceptions`.
//!
//! # Cycle guard
//!
//! Each call to [`Engine::destructure`] keeps its own set of visited nodes.
//! Nodes are identified by address together with their concrete type, so a
//! wrapper and a field stored at offset zero are still told apart, while two
//! distinct errors with equal contents are never folded together. A node
//! that has already been visited, or that lies beyond the configured
//! [maximum depth](crate::DestructuringOptions::max_depth), is emitted with
//! its reserved keys only.
//!
//! Zero-sized errors have no address of their own: every boxed unit struct
//! of a type points to the same place. They are only checked against the
//! path from the root to the current node, so siblings are destructured in
//! full while a zero-sized error that leads back to itself still stops.

use alloc::{string::String, vec::Vec};
use core::{
    any::{Any, TypeId},
    error::Error,
    fmt,
    hash::{Hash, Hasher},
};

use hashbrown::HashSet;
use rustc_hash::FxBuildHasher;
use unravel_internals::{ExtractionFault, Mapping, MemberDescriptor, Value};

use crate::{
    destructurer::{DestructurerMap, Resolved, Selection, reflection},
    filter::{FilterChain, MemberFilter},
    keys,
    members::TypeMembers,
    shape::{ErrorRef, ErrorShape},
};

/// The root name used by logging adapters when none is configured.
pub const DEFAULT_ROOT_NAME: &str = "ExceptionDetail";

/// A configured destructuring engine.
///
/// Built with [`DestructuringOptions`](crate::DestructuringOptions). The
/// engine holds no per-call state and can be shared freely between threads.
pub struct Engine {
    pub(crate) destructurers: DestructurerMap,
    pub(crate) filters: FilterChain,
    pub(crate) max_depth: Option<usize>,
    pub(crate) reflection: bool,
    pub(crate) root_name: alloc::borrow::Cow<'static, str>,
}

impl Engine {
    /// Destructures `error` and, if `recursive` is set, everything it chains
    /// to.
    pub fn destructure(&self, error: ErrorRef<'_>, recursive: bool) -> Mapping {
        let mut visited = Visited::default();
        destructure_node(self, &mut visited, recursive, error, 0).1
    }

    /// Destructures an error of unknown shape.
    pub fn destructure_error(&self, error: &(dyn Error + 'static), recursive: bool) -> Mapping {
        self.destructure(ErrorRef::Opaque(error), recursive)
    }

    /// Destructures a shaped error.
    pub fn destructure_shape<E: ErrorShape>(&self, error: &E, recursive: bool) -> Mapping {
        self.destructure(ErrorRef::Shaped(error), recursive)
    }

    /// The name under which logging adapters attach the mapping.
    pub fn root_name(&self) -> &str {
        &self.root_name
    }

    /// The configured depth limit, if any.
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Returns `true` if shaped errors without a specialized destructurer
    /// get their declared members.
    pub fn reflection_enabled(&self) -> bool {
        self.reflection
    }

    /// The configured member filters.
    pub fn filters(&self) -> &FilterChain {
        &self.filters
    }

    /// Returns `true` if a destructurer is registered for exactly `E`.
    pub fn has_destructurer<E: 'static>(&self) -> bool {
        self.destructurers.contains(TypeId::of::<E>())
    }
}

impl Default for Engine {
    fn default() -> Self {
        crate::DestructuringOptions::new().build()
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("destructurers", &self.destructurers)
            .field("filters", &self.filters)
            .field("max_depth", &self.max_depth)
            .field("reflection", &self.reflection)
            .field("root_name", &self.root_name)
            .finish()
    }
}

/// Identity of a visited node.
#[derive(Copy, Clone)]
pub(crate) enum Identity {
    /// A node whose concrete type is known.
    Typed { address: usize, type_id: TypeId },
    /// A node of unknown type, compared by its full trait object pointer.
    Opaque(*const (dyn Error + 'static)),
}

impl Identity {
    pub(crate) fn typed<T: ?Sized>(node: &T, type_id: TypeId) -> Self {
        Identity::Typed {
            address: core::ptr::from_ref(node).cast::<()>().addr(),
            type_id,
        }
    }

    pub(crate) fn opaque(node: &(dyn Error + 'static)) -> Self {
        Identity::Opaque(core::ptr::from_ref(node))
    }
}

impl PartialEq for Identity {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Identity::Typed { address, type_id },
                Identity::Typed {
                    address: other_address,
                    type_id: other_type_id,
                },
            ) => address == other_address && type_id == other_type_id,
            (Identity::Opaque(node), Identity::Opaque(other)) => core::ptr::eq(*node, *other),
            _ => false,
        }
    }
}

impl Eq for Identity {}

impl Hash for Identity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Identity::Typed { address, type_id } => {
                address.hash(state);
                type_id.hash(state);
            }
            // Equal trait object pointers always share their data address.
            Identity::Opaque(node) => node.cast::<()>().addr().hash(state),
        }
    }
}

/// The nodes seen during one call.
#[derive(Default)]
pub(crate) struct Visited {
    /// Every node with a size that has been entered.
    nodes: HashSet<Identity, FxBuildHasher>,
    /// Zero-sized nodes between the root and the current node.
    zero_sized_path: Vec<Identity>,
}

impl Visited {
    fn contains(&self, identity: &Identity, zero_sized: bool) -> bool {
        if zero_sized {
            self.zero_sized_path.contains(identity)
        } else {
            self.nodes.contains(identity)
        }
    }

    fn enter(&mut self, identity: Identity, zero_sized: bool) {
        if zero_sized {
            self.zero_sized_path.push(identity);
        } else {
            self.nodes.insert(identity);
        }
    }

    fn leave(&mut self, zero_sized: bool) {
        if zero_sized {
            self.zero_sized_path.pop();
        }
    }
}

fn destructure_node(
    engine: &Engine,
    visited: &mut Visited,
    recursive: bool,
    error: ErrorRef<'_>,
    depth: usize,
) -> (Identity, Mapping) {
    let Resolved {
        error,
        type_name,
        identity,
        selection,
    } = engine.destructurers.resolve(error, engine.reflection);

    let mut mapping = Mapping::new();
    mapping.insert(keys::TYPE, type_name);
    mapping.insert(keys::MESSAGE, error.message());

    let zero_sized = core::mem::size_of_val(error.as_error()) == 0;
    if visited.contains(&identity, zero_sized) {
        tracing::trace!(error_type = type_name, depth, "node already visited, not descending");
        return (identity, mapping);
    }
    if engine.max_depth.is_some_and(|max_depth| depth > max_depth) {
        tracing::trace!(error_type = type_name, depth, "depth limit reached, not descending");
        return (identity, mapping);
    }
    visited.enter(identity, zero_sized);

    let mut cx = Destructuring {
        engine,
        visited,
        recursive,
        error,
        depth,
        mapping,
    };

    match selection {
        Selection::Specialized {
            destructurer,
            instance,
        } => destructurer.destructure_any(instance, &mut cx),
        Selection::Reflective => reflection::destructure_declared(&mut cx),
        Selection::ReservedOnly => {}
    }

    cx.insert_data_bag();
    if recursive {
        cx.attach_chain();
    }
    cx.visited.leave(zero_sized);

    (identity, cx.mapping)
}

/// The mapping under construction for one node.
///
/// Handed to [`Destructurer`](crate::destructurer::Destructurer)s. Values
/// written through it pass through the configured member filters.
pub struct Destructuring<'w, 'e> {
    engine: &'w Engine,
    visited: &'w mut Visited,
    recursive: bool,
    error: ErrorRef<'e>,
    depth: usize,
    mapping: Mapping,
}

impl<'w, 'e> Destructuring<'w, 'e> {
    /// The node being destructured.
    pub fn error(&self) -> ErrorRef<'e> {
        self.error
    }

    /// The depth of the node, `0` for the root.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Returns `true` if the current call destructures recursively.
    pub fn is_recursive(&self) -> bool {
        self.recursive
    }

    /// The entries written so far.
    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    /// Writes an entry, unless a filter excludes it.
    ///
    /// Reserved keys cannot be written this way and are ignored.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let name = name.into();
        if keys::is_reserved(&name) {
            tracing::debug!(member = %name, "ignoring write to a reserved key");
            return self;
        }
        self.insert_filtered(name, value.into());
        self
    }

    /// Writes an entry whose value could not be obtained.
    ///
    /// Errors become [`Value::ExtractionFailed`] markers.
    pub fn try_insert<V: Into<Value>>(
        &mut self,
        name: impl Into<String>,
        value: Result<V, ExtractionFault>,
    ) -> &mut Self {
        let value = value.map_or_else(Value::ExtractionFailed, Into::into);
        self.insert(name, value)
    }

    /// Writes every member of `members`, read from `instance`.
    ///
    /// `instance` must be of the type `members` describes; otherwise every
    /// member is written as an extraction failure.
    pub fn insert_members(&mut self, instance: &dyn Any, members: &TypeMembers) -> &mut Self {
        for descriptor in members.descriptors() {
            let value = extract(descriptor, instance);
            self.insert_filtered(String::from(descriptor.exposed_name()), value);
        }
        self
    }

    /// Writes the declared members of the node.
    ///
    /// Does nothing for nodes that are not shaped.
    pub fn insert_declared_members(&mut self) -> &mut Self {
        if let ErrorRef::Shaped(error) = self.error {
            let members = error.type_members();
            self.insert_members(error.as_any(), &members);
        }
        self
    }

    /// Destructures another error as a child of this node.
    ///
    /// The child shares the visited set of the current call, so it stops at
    /// nodes that have been seen before.
    pub fn nested(&mut self, error: ErrorRef<'_>) -> Mapping {
        destructure_node(self.engine, self.visited, self.recursive, error, self.depth + 1).1
    }

    fn insert_filtered(&mut self, name: String, value: Value) {
        if self.engine.filters.should_filter(self.error, &name, &value) {
            return;
        }
        self.mapping.insert(name, value);
    }

    fn insert_data_bag(&mut self) {
        if let Some(data) = self.error.data_bag()
            && !data.is_empty()
        {
            self.insert_filtered(String::from(keys::DATA), Value::Map(data.clone()));
        }
    }

    fn child(&mut self, error: ErrorRef<'_>) -> (Identity, Mapping) {
        destructure_node(self.engine, self.visited, self.recursive, error, self.depth + 1)
    }

    fn attach_chain(&mut self) {
        let error = self.error;

        let Some(aggregated) = error.aggregated_errors() else {
            if let Some(inner) = error.chained_error() {
                let (_, inner) = self.child(inner);
                self.mapping.insert(keys::INNER_EXCEPTION, inner);
            }
            return;
        };

        let mut children = Vec::with_capacity(aggregated.len());
        for sub_error in aggregated {
            children.push(self.child(sub_error));
        }

        let inner = match error.chained_error() {
            Some(inner) => {
                let identity = self
                    .engine
                    .destructurers
                    .resolve(inner, self.engine.reflection)
                    .identity;
                match children.iter().find(|(child, _)| *child == identity) {
                    Some((_, mapping)) => Some(mapping.clone()),
                    None => Some(self.child(inner).1),
                }
            }
            None => children.first().map(|(_, mapping)| mapping.clone()),
        };

        if let Some(inner) = inner {
            self.mapping.insert(keys::INNER_EXCEPTION, inner);
        }
        self.mapping.insert(
            keys::INNER_EXCEPTIONS,
            Value::Sequence(
                children
                    .into_iter()
                    .map(|(_, mapping)| Value::Map(mapping))
                    .collect(),
            ),
        );
    }
}

impl fmt::Debug for Destructuring<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Destructuring")
            .field("error", &self.error)
            .field("depth", &self.depth)
            .field("recursive", &self.recursive)
            .field("mapping", &self.mapping)
            .finish()
    }
}

/// Reads one member, turning failures into markers.
fn extract(descriptor: &MemberDescriptor, instance: &dyn Any) -> Value {
    #[cfg(feature = "std")]
    let result = std::panic::catch_unwind(core::panic::AssertUnwindSafe(|| {
        descriptor.extract(instance)
    }))
    .unwrap_or_else(|payload| Err(ExtractionFault::new(crate::util::panic_message(&*payload))));

    #[cfg(not(feature = "std"))]
    let result = descriptor.extract(instance);

    result.unwrap_or_else(|fault| {
        tracing::debug!(
            member = descriptor.exposed_name(),
            %fault,
            "member extraction failed"
        );
        Value::ExtractionFailed(fault)
    })
}

#[cfg(test)]
mod tests {
    use alloc::{boxed::Box, format};

    use unravel_internals::ErrorType;

    use super::*;
    use crate::{DestructuringOptions, members::MemberTable};

    #[derive(Debug)]
    struct Leaf;

    impl fmt::Display for Leaf {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("root cause")
        }
    }

    impl Error for Leaf {}

    #[derive(Debug)]
    struct Wrapper {
        code: i32,
        inner: Leaf,
    }

    impl fmt::Display for Wrapper {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("boom")
        }
    }

    impl Error for Wrapper {
        fn source(&self) -> Option<&(dyn Error + 'static)> {
            Some(&self.inner)
        }
    }

    impl ErrorShape for Wrapper {
        const ERROR_TYPE: &'static ErrorType = &ErrorType::new::<Self>("Wrapper");

        fn declare_members(members: &mut MemberTable<Self>) {
            members
                .field("Code", |e| e.code)
                .try_field("Broken", |_| Err::<i32, _>(ExtractionFault::new("no value")));
        }
    }

    static_assertions::assert_impl_all!(Engine: Send, Sync);

    fn engine() -> Engine {
        DestructuringOptions::new_without_defaults().build()
    }

    #[test]
    fn test_reserved_keys_come_first() {
        let error = Wrapper { code: 42, inner: Leaf };
        let mapping = engine().destructure_shape(&error, false);
        let keys: Vec<_> = mapping.keys().collect();
        assert_eq!(keys, ["Type", "Message", "Code", "Broken"]);
        assert!(!mapping.contains_key(keys::INNER_EXCEPTION));
    }

    #[test]
    fn test_field_at_offset_zero_is_a_separate_node() {
        // `inner` is zero-sized and may share the wrapper's address.
        let error = Wrapper { code: 1, inner: Leaf };
        let mapping = engine().destructure_shape(&error, true);
        let inner = mapping.get(keys::INNER_EXCEPTION).unwrap().as_map().unwrap();
        assert_eq!(inner.get(keys::TYPE).unwrap().as_str(), Some(keys::OPAQUE_TYPE_NAME));
        assert_eq!(inner.get(keys::MESSAGE).unwrap().as_str(), Some("root cause"));
    }

    #[test]
    fn test_zero_sized_nodes_only_match_their_path() {
        let zero_sized = Identity::typed(&Leaf, TypeId::of::<Leaf>());
        let sized = Identity::typed(&Wrapper { code: 1, inner: Leaf }, TypeId::of::<Wrapper>());

        let mut visited = Visited::default();
        visited.enter(sized, false);
        visited.enter(zero_sized, true);
        assert!(visited.contains(&zero_sized, true));

        visited.leave(true);
        visited.leave(false);
        assert!(!visited.contains(&zero_sized, true));
        assert!(visited.contains(&sized, false));
    }

    #[test]
    fn test_fault_becomes_marker() {
        let error = Wrapper { code: 42, inner: Leaf };
        let mapping = engine().destructure_shape(&error, false);
        let fault = mapping.get("Broken").unwrap().as_extraction_fault().unwrap();
        assert_eq!(fault.message(), "no value");
        assert_eq!(mapping.get("Code").unwrap().as_i64(), Some(42));
    }

    #[test]
    fn test_reserved_keys_are_protected() {
        let engine = DestructuringOptions::new_without_defaults()
            .destructurer::<Leaf, _>(|_: &Leaf, cx: &mut Destructuring<'_, '_>| {
                cx.insert(keys::MESSAGE, "overwritten").insert("Extra", true);
            })
            .build();
        let mapping = engine.destructure_error(&Leaf, true);
        assert_eq!(mapping.get(keys::TYPE).unwrap().as_str(), Some("Leaf"));
        assert_eq!(mapping.get(keys::MESSAGE).unwrap().as_str(), Some("root cause"));
        assert_eq!(mapping.get("Extra").unwrap().as_bool(), Some(true));
    }

    #[test]
    fn test_boxed_error_is_opaque() {
        let error: Box<dyn Error + Send + Sync> = Box::new(Leaf);
        let mapping = engine().destructure_error(&*error, true);
        assert_eq!(mapping.len(), 2);
        assert_eq!(
            format!("{mapping}"),
            r#"{Type: "Error", Message: "root cause"}"#
        );
    }
}
