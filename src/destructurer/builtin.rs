//! Destructurers for well-known error types.
//!
//! Installed by [`DestructuringOptions::new`] and
//! [`DestructuringOptions::with_default_destructurers`]. Errors from `core`
//! and `alloc` carry little structured data, so most entries only make the
//! engine report the type name.
//!
//! [`DestructuringOptions::new`]: crate::DestructuringOptions::new
//! [`DestructuringOptions::with_default_destructurers`]: crate::DestructuringOptions::with_default_destructurers

use alloc::string::FromUtf8Error;
use core::{
    char::ParseCharError,
    fmt,
    net::AddrParseError,
    num::{ParseFloatError, ParseIntError, TryFromIntError},
    str::{ParseBoolError, Utf8Error},
};

use unravel_internals::Value;

use crate::{
    aggregate::AggregateError,
    destructurer::{DestructurerMap, NameOnly},
    engine::Destructuring,
};

fn parse_int<'e>(error: &'e ParseIntError, cx: &mut Destructuring<'_, 'e>) {
    cx.insert("Kind", Value::debug(error.kind()));
}

fn utf8_fields(error: &Utf8Error, cx: &mut Destructuring<'_, '_>) {
    cx.insert("ValidUpTo", error.valid_up_to())
        .insert("ErrorLength", error.error_len());
}

fn utf8<'e>(error: &'e Utf8Error, cx: &mut Destructuring<'_, 'e>) {
    utf8_fields(error, cx);
}

fn from_utf8<'e>(error: &'e FromUtf8Error, cx: &mut Destructuring<'_, 'e>) {
    utf8_fields(&error.utf8_error(), cx);
    cx.insert("ByteCount", error.as_bytes().len());
}

#[cfg(feature = "std")]
fn io<'e>(error: &'e std::io::Error, cx: &mut Destructuring<'_, 'e>) {
    cx.insert("Kind", Value::debug(&error.kind()))
        .insert("RawOsError", error.raw_os_error());
}

#[cfg(feature = "std")]
fn var<'e>(error: &'e std::env::VarError, cx: &mut Destructuring<'_, 'e>) {
    let kind = match error {
        std::env::VarError::NotPresent => "NotPresent",
        std::env::VarError::NotUnicode(_) => "NotUnicode",
    };
    cx.insert("Kind", kind);
}

pub(crate) fn register(map: &mut DestructurerMap) {
    map.insert_shape::<AggregateError>();

    map.insert::<ParseIntError, _>(parse_int);
    map.insert::<Utf8Error, _>(utf8);
    map.insert::<FromUtf8Error, _>(from_utf8);

    map.insert::<ParseFloatError, _>(NameOnly);
    map.insert::<ParseBoolError, _>(NameOnly);
    map.insert::<TryFromIntError, _>(NameOnly);
    map.insert::<ParseCharError, _>(NameOnly);
    map.insert::<AddrParseError, _>(NameOnly);
    map.insert_named::<fmt::Error, _>("fmt::Error", NameOnly);

    #[cfg(feature = "std")]
    {
        map.insert_named::<std::io::Error, _>("io::Error", io);
        map.insert::<std::env::VarError, _>(var);
    }
}

#[cfg(test)]
mod tests {
    use alloc::{string::String, vec};

    use crate::{DestructuringOptions, keys};

    #[test]
    fn test_parse_int() {
        let engine = DestructuringOptions::new().build();
        let error = "".parse::<u32>().unwrap_err();
        let mapping = engine.destructure_error(&error, true);
        assert_eq!(mapping.get(keys::TYPE).unwrap().as_str(), Some("ParseIntError"));
        assert_eq!(mapping.get("Kind").unwrap().as_str(), Some("Empty"));
    }

    #[test]
    fn test_from_utf8() {
        let engine = DestructuringOptions::new().build();
        let error = String::from_utf8(vec![b'o', b'k', 0xff, b'!']).unwrap_err();
        let mapping = engine.destructure_error(&error, true);
        assert_eq!(mapping.get(keys::TYPE).unwrap().as_str(), Some("FromUtf8Error"));
        assert_eq!(mapping.get("ValidUpTo").unwrap().as_u64(), Some(2));
        assert_eq!(mapping.get("ErrorLength").unwrap().as_u64(), Some(1));
        assert_eq!(mapping.get("ByteCount").unwrap().as_u64(), Some(4));
    }

    #[test]
    fn test_name_only() {
        let engine = DestructuringOptions::new().build();
        let error = "maybe".parse::<bool>().unwrap_err();
        let mapping = engine.destructure_error(&error, true);
        assert_eq!(mapping.get(keys::TYPE).unwrap().as_str(), Some("ParseBoolError"));
        assert_eq!(mapping.len(), 2);
    }

    #[test]
    fn test_without_defaults_is_opaque() {
        let engine = DestructuringOptions::new_without_defaults().build();
        let error = "".parse::<u32>().unwrap_err();
        let mapping = engine.destructure_error(&error, true);
        assert_eq!(mapping.get(keys::TYPE).unwrap().as_str(), Some(keys::OPAQUE_TYPE_NAME));
        assert!(!mapping.contains_key("Kind"));
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_io_error() {
        let engine = DestructuringOptions::new().build();
        let error = std::io::Error::new(std::io::ErrorKind::NotFound, "config.toml");
        let mapping = engine.destructure_error(&error, true);
        assert_eq!(mapping.get(keys::TYPE).unwrap().as_str(), Some("io::Error"));
        assert_eq!(mapping.get("Kind").unwrap().as_str(), Some("NotFound"));
        assert!(mapping.get("RawOsError").unwrap().is_null());
    }
}
