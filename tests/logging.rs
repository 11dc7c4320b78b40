//! Diagnostics emitted while building member tables and extracting members.

use std::{
    io,
    sync::{Arc, Mutex},
};

use tracing_subscriber::util::SubscriberInitExt;
use unravel::{DestructuringOptions, ErrorShape, ErrorType, ExtractionFault, MemberTable, cache};

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn capture(f: impl FnOnce()) -> String {
    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_writer(move || writer.clone())
        .finish();
    {
        let _guard = subscriber.set_default();
        f();
    }
    captured.text()
}

#[derive(Debug, thiserror::Error)]
#[error("misdeclared")]
struct Misdeclared {
    code: u32,
}

impl ErrorShape for Misdeclared {
    const ERROR_TYPE: &'static ErrorType = &ErrorType::new::<Self>("Misdeclared");

    fn declare_members(members: &mut MemberTable<Self>) {
        members
            .field("Code", |e| e.code)
            .field("Type", |e| e.code)
            .field("Code", |e| e.code);
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unreadable")]
struct Unreadable;

impl ErrorShape for Unreadable {
    const ERROR_TYPE: &'static ErrorType = &ErrorType::new::<Self>("Unreadable");

    fn declare_members(members: &mut MemberTable<Self>) {
        members.try_field("Secret", |_| {
            Err::<u32, _>(ExtractionFault::new("secret store unavailable"))
        });
    }
}

#[test]
fn test_skipped_members_are_logged() {
    let logs = capture(|| {
        assert_eq!(cache::members_of::<Misdeclared>().len(), 1);
    });

    assert!(logs.contains("skipping member"), "{logs}");
    assert!(logs.contains("member name collides with a reserved key"), "{logs}");
    assert!(logs.contains("member already declared by the same type"), "{logs}");
}

#[test]
fn test_extraction_failures_are_logged() {
    let engine = DestructuringOptions::new().build();
    let logs = capture(|| {
        let mapping = engine.destructure_shape(&Unreadable, true);
        assert!(mapping.get("Secret").unwrap().as_extraction_fault().is_some());
    });

    assert!(logs.contains("member extraction failed"), "{logs}");
    assert!(logs.contains("secret store unavailable"), "{logs}");
}
