/// Strips the module path from a type name produced by
/// [`core::any::type_name`], keeping any generic arguments intact.
///
/// `"std::io::error::Error"` becomes `"Error"` and
/// `"alloc::vec::Vec<u8>"` becomes `"Vec<u8>"`.
pub(crate) fn short_type_name(full: &'static str) -> &'static str {
    let path_end = full.find('<').unwrap_or(full.len());
    match full[..path_end].rfind("::") {
        Some(separator) => &full[separator + 2..],
        None => full,
    }
}

/// Extracts a message from a panic payload.
#[cfg(feature = "std")]
pub(crate) fn panic_message(payload: &(dyn core::any::Any + Send)) -> alloc::string::String {
    use alloc::string::{String, ToString};

    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "extractor panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name("std::io::error::Error"), "Error");
        assert_eq!(short_type_name("alloc::vec::Vec<u8>"), "Vec<u8>");
        assert_eq!(
            short_type_name("my_crate::Wrapper<core::num::ParseIntError>"),
            "Wrapper<core::num::ParseIntError>"
        );
        assert_eq!(short_type_name("Plain"), "Plain");
    }
}
