//! Global installation of destructuring options.
//!
//! Kept in its own test binary since installation is process-wide.

use unravel::{DestructuringOptions, Engine, ErrorShape, ErrorType, LeakedEngine, MemberTable, keys};

#[derive(Debug, thiserror::Error)]
#[error("login failed for {user}")]
struct LoginError {
    user: &'static str,
    password: &'static str,
}

impl ErrorShape for LoginError {
    const ERROR_TYPE: &'static ErrorType = &ErrorType::new::<Self>("LoginError");

    fn declare_members(members: &mut MemberTable<Self>) {
        members
            .field("User", |e| e.user)
            .field("Password", |e| e.password);
    }
}

#[test]
fn test_install_and_replace() {
    let error = LoginError {
        user: "ada",
        password: "hunter2",
    };

    assert!(LeakedEngine::fetch_current().is_none());
    assert!(unravel::destructure_shape(&error).contains_key("Password"));

    DestructuringOptions::new()
        .ignore_members(["Password"])
        .install()
        .unwrap();

    let mapping = unravel::destructure_shape(&error);
    assert!(mapping.contains_key("User"));
    assert!(!mapping.contains_key("Password"));

    let rejected = DestructuringOptions::new().root_name("Rejected").install();
    let rejected = rejected.unwrap_err();
    assert_eq!(rejected.to_string(), "destructuring options are already installed globally");
    assert_eq!(rejected.0.build().root_name(), "Rejected");

    let previous = DestructuringOptions::new().root_name("Replaced").replace();
    assert_eq!(previous.unwrap().get().filters().len(), 1);
    assert_eq!(Engine::global().root_name(), "Replaced");
    assert!(unravel::destructure_shape(&error).contains_key("Password"));

    let via_opaque = unravel::destructure(&error);
    assert_eq!(
        via_opaque.get(keys::TYPE).and_then(unravel::Value::as_str),
        Some(keys::OPAQUE_TYPE_NAME)
    );
}
