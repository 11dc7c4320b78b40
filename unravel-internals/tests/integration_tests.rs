//! Integration tests for the unravel-internals crate.
//!
//! Exercises descriptors, conflict resolution and mappings through the public
//! API only:
//!
//! - `test_hierarchy_with_mixin`: a three-level hierarchy sharing a member
//!   name with an unrelated type
//! - `test_extraction_through_any`: extractors downcast the erased instance
//! - `test_mapping_overwrite_keeps_position`: later inserts overwrite in place
//! - `test_mapping_equality_ignores_order`

use std::any::Any;

use unravel_internals::{
    ErrorType, ExtractionFault, Mapping, MemberDescriptor, Value, resolve_name_conflicts,
};

struct Transport;
struct Http;
struct NotFound;
struct Retry;

const TRANSPORT: &ErrorType = &ErrorType::new::<Transport>("Transport");
const HTTP: &ErrorType = &ErrorType::new::<Http>("Http").extends(TRANSPORT);
const NOT_FOUND: &ErrorType = &ErrorType::new::<NotFound>("NotFound").extends(HTTP);
const RETRY: &ErrorType = &ErrorType::new::<Retry>("Retry");

fn member(name: &'static str, declaring_type: &'static ErrorType) -> MemberDescriptor {
    MemberDescriptor::new(
        name,
        Some(declaring_type),
        Box::new(move |_| Ok(Value::from(declaring_type.name()))),
    )
}

#[test]
fn test_hierarchy_with_mixin() {
    assert!(NOT_FOUND.is_strict_subtype_of(TRANSPORT));
    assert!(!TRANSPORT.is_strict_subtype_of(NOT_FOUND));
    assert!(!RETRY.is_strict_subtype_of(TRANSPORT));
    assert_eq!(
        NOT_FOUND.ancestors().map(ErrorType::name).collect::<Vec<_>>(),
        ["Http", "Transport"]
    );

    let descriptors = [
        member("Status", NOT_FOUND),
        member("Status", RETRY),
        member("Status", TRANSPORT),
        member("Status", HTTP),
        member("Path", NOT_FOUND),
    ];
    resolve_name_conflicts(&descriptors);

    let names: Vec<_> = descriptors
        .iter()
        .map(MemberDescriptor::exposed_name)
        .collect();
    assert_eq!(
        names,
        ["NotFound.Status", "Status", "Status", "Http.Status", "Path"]
    );

    // A second pass changes nothing.
    resolve_name_conflicts(&descriptors);
    assert_eq!(descriptors[0].exposed_name(), "NotFound.Status");
    assert_eq!(descriptors[3].exposed_name(), "Http.Status");

    let mut mapping = Mapping::new();
    for descriptor in &descriptors {
        mapping.insert(descriptor.exposed_name(), descriptor.extract(&()).unwrap());
    }
    assert_eq!(mapping.len(), 4);
    // Unrelated declarers share the name; the later one wins.
    assert_eq!(mapping.get("Status").and_then(Value::as_str), Some("Transport"));
}

#[test]
fn test_extraction_through_any() {
    struct Timeout {
        millis: u64,
    }

    let descriptor = MemberDescriptor::new(
        "Millis",
        Some(TRANSPORT),
        Box::new(|instance: &dyn Any| {
            instance
                .downcast_ref::<Timeout>()
                .map(|timeout| Value::from(timeout.millis))
                .ok_or_else(|| ExtractionFault::new("not a Timeout"))
        }),
    );

    let value = descriptor.extract(&Timeout { millis: 250 }).unwrap();
    assert_eq!(value.as_u64(), Some(250));

    let fault = descriptor.extract(&"something else").unwrap_err();
    assert_eq!(fault.message(), "not a Timeout");
    assert_eq!(
        Value::from(fault).as_extraction_fault().map(ExtractionFault::message),
        Some("not a Timeout")
    );
}

#[test]
fn test_mapping_overwrite_keeps_position() {
    let mut mapping = Mapping::new();
    mapping.insert("Type", "Http");
    mapping.insert("Message", "bad gateway");
    mapping.insert("Status", 502u16);

    let previous = mapping.insert("Type", "NotFound");
    assert_eq!(previous.as_ref().and_then(Value::as_str), Some("Http"));
    assert_eq!(mapping.keys().collect::<Vec<_>>(), ["Type", "Message", "Status"]);
    assert_eq!(mapping.get("Type").and_then(Value::as_str), Some("NotFound"));
}

#[test]
fn test_mapping_equality_ignores_order() {
    let mut forward = Mapping::new();
    forward.insert("A", 1);
    forward.insert("B", Value::Null);

    let mut backward = Mapping::new();
    backward.insert("B", Value::Null);
    backward.insert("A", 1);

    assert_eq!(forward, backward);
    backward.insert("A", 2);
    assert_ne!(forward, backward);
}
