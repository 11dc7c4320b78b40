//! Loggable values and the ordered mapping produced by destructuring.
//!
//! [`Value`] is deliberately small: primitives pass through unchanged,
//! collections become [`Value::Sequence`] or [`Value::Map`], and anything
//! else is turned into text with [`Value::display`] or [`Value::debug`]. How
//! a value is finally rendered is up to the logging pipeline.

use alloc::{
    borrow::Cow,
    format,
    string::{String, ToString},
    vec::Vec,
};
use core::fmt;

use indexmap::IndexMap;

use crate::ExtractionFault;

/// A loggable value extracted from an error member.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// An absent value.
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    I64(i64),
    /// An unsigned integer.
    U64(u64),
    /// A floating point number.
    F64(f64),
    /// A string.
    String(String),
    /// An ordered sequence of values.
    Sequence(Vec<Value>),
    /// A nested mapping, used for nested errors and structured data.
    Map(Mapping),
    /// Marker left in place of a member whose extractor failed.
    ExtractionFailed(ExtractionFault),
}

impl Value {
    /// Converts any [`Display`](fmt::Display) value into a [`Value::String`].
    pub fn display(value: &(impl fmt::Display + ?Sized)) -> Self {
        Value::String(value.to_string())
    }

    /// Converts any [`Debug`](fmt::Debug) value into a [`Value::String`].
    pub fn debug(value: &(impl fmt::Debug + ?Sized)) -> Self {
        Value::String(format!("{value:?}"))
    }

    /// Returns `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the string slice if this is a [`Value::String`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer if this is a [`Value::I64`] or a [`Value::U64`]
    /// that fits.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::I64(v) => Some(v),
            Value::U64(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    /// Returns the integer if this is a [`Value::U64`] or a non-negative
    /// [`Value::I64`].
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Value::U64(v) => Some(v),
            Value::I64(v) => u64::try_from(v).ok(),
            _ => None,
        }
    }

    /// Returns the boolean if this is a [`Value::Bool`].
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Bool(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the nested mapping if this is a [`Value::Map`].
    pub fn as_map(&self) -> Option<&Mapping> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Returns the elements if this is a [`Value::Sequence`].
    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(values) => Some(values),
            _ => None,
        }
    }

    /// Returns the fault if this is a [`Value::ExtractionFailed`] marker.
    pub fn as_extraction_fault(&self) -> Option<&ExtractionFault> {
        match self {
            Value::ExtractionFailed(fault) => Some(fault),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(v) => fmt::Display::fmt(v, f),
            Value::I64(v) => fmt::Display::fmt(v, f),
            Value::U64(v) => fmt::Display::fmt(v, f),
            Value::F64(v) => fmt::Display::fmt(v, f),
            Value::String(v) => fmt::Debug::fmt(v, f),
            Value::Sequence(values) => f.debug_list().entries(values).finish(),
            Value::Map(map) => fmt::Display::fmt(map, f),
            Value::ExtractionFailed(fault) => write!(f, "<{fault}>"),
        }
    }
}

macro_rules! from_signed {
    ($($t:ty),*) => {$(
        impl From<$t> for Value {
            fn from(value: $t) -> Self {
                Value::I64(value as i64)
            }
        }
    )*};
}

macro_rules! from_unsigned {
    ($($t:ty),*) => {$(
        impl From<$t> for Value {
            fn from(value: $t) -> Self {
                Value::U64(value as u64)
            }
        }
    )*};
}

from_signed!(i8, i16, i32, i64, isize);
from_unsigned!(u8, u16, u32, u64, usize);

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::F64(f64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::F64(value)
    }
}

impl From<char> for Value {
    fn from(value: char) -> Self {
        Value::String(value.to_string())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.into())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Value::String(value.clone())
    }
}

impl From<Cow<'_, str>> for Value {
    fn from(value: Cow<'_, str>) -> Self {
        Value::String(value.into_owned())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::Sequence(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Clone + Into<Value>> From<&[T]> for Value {
    fn from(values: &[T]) -> Self {
        Value::Sequence(values.iter().cloned().map(Into::into).collect())
    }
}

impl From<Mapping> for Value {
    fn from(value: Mapping) -> Self {
        Value::Map(value)
    }
}

impl From<ExtractionFault> for Value {
    fn from(fault: ExtractionFault) -> Self {
        Value::ExtractionFailed(fault)
    }
}

/// An insertion-ordered mapping from member names to values.
///
/// Inserting a key that is already present replaces its value but keeps the
/// key at its original position.
///
/// # Examples
///
/// ```
/// use unravel_internals::{Mapping, Value};
///
/// let mut mapping = Mapping::new();
/// mapping.insert("Type", "ConfigError");
/// mapping.insert("Code", 42);
/// mapping.insert("Type", "ParseError");
///
/// let keys: Vec<_> = mapping.keys().collect();
/// assert_eq!(keys, ["Type", "Code"]);
/// assert_eq!(mapping.get("Type").and_then(Value::as_str), Some("ParseError"));
/// ```
#[derive(Clone, Default, PartialEq)]
pub struct Mapping {
    /// The entries, in insertion order.
    entries: IndexMap<String, Value, rustc_hash::FxBuildHasher>,
}

impl Mapping {
    /// Creates an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `value` under `key`, returning the previous value if the key
    /// was already present.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Returns `true` if `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Removes `key`, preserving the order of the remaining entries.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.shift_remove(key)
    }

    /// The number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the mapping has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the keys in insertion order.
    pub fn keys(&self) -> impl ExactSizeIterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Iterates over the entries in insertion order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl fmt::Debug for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl fmt::Display for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (index, (key, value)) in self.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}: {value}")?;
        }
        f.write_str("}")
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Mapping {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut mapping = Mapping::new();
        mapping.extend(iter);
        mapping
    }
}

impl<K: Into<String>, V: Into<Value>> Extend<(K, V)> for Mapping {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl IntoIterator for Mapping {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(feature = "serde")]
mod serialize {
    use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

    use super::{Mapping, Value};

    impl Serialize for Value {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            match self {
                Value::Null => serializer.serialize_unit(),
                Value::Bool(v) => serializer.serialize_bool(*v),
                Value::I64(v) => serializer.serialize_i64(*v),
                Value::U64(v) => serializer.serialize_u64(*v),
                Value::F64(v) => serializer.serialize_f64(*v),
                Value::String(v) => serializer.serialize_str(v),
                Value::Sequence(values) => {
                    let mut seq = serializer.serialize_seq(Some(values.len()))?;
                    for value in values {
                        seq.serialize_element(value)?;
                    }
                    seq.end()
                }
                Value::Map(map) => map.serialize(serializer),
                Value::ExtractionFailed(fault) => serializer.collect_str(&format_args!("<{fault}>")),
            }
        }
    }

    impl Serialize for Mapping {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let mut map = serializer.serialize_map(Some(self.len()))?;
            for (key, value) in self.iter() {
                map.serialize_entry(key, value)?;
            }
            map.end()
        }
    }
}
