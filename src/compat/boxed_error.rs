//! Destructuring boxed error trait objects.

use alloc::boxed::Box;
use core::error::Error;

use unravel_internals::Mapping;

use crate::{Engine, compat::DestructureExt};

impl DestructureExt for Box<dyn Error + Send + Sync> {
    type Output = Mapping;

    fn destructure_with(&self, engine: &Engine, recursive: bool) -> Mapping {
        engine.destructure_error(&**self, recursive)
    }
}

impl DestructureExt for Box<dyn Error> {
    type Output = Mapping;

    fn destructure_with(&self, engine: &Engine, recursive: bool) -> Mapping {
        engine.destructure_error(&**self, recursive)
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use core::fmt;

    use super::*;
    use crate::{DestructuringOptions, keys};

    #[derive(Debug)]
    struct Outer(Box<dyn Error + Send + Sync>);

    impl fmt::Display for Outer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("outer")
        }
    }

    impl Error for Outer {
        fn source(&self) -> Option<&(dyn Error + 'static)> {
            Some(&*self.0)
        }
    }

    #[test]
    fn test_boxed_chain() {
        let engine = DestructuringOptions::new().build();
        let inner = String::from("-").parse::<i8>().unwrap_err();
        let error: Box<dyn Error + Send + Sync> = Box::new(Outer(Box::new(inner)));

        let mapping = error.destructure_with(&engine, true);
        assert_eq!(mapping.get(keys::MESSAGE).unwrap().as_str(), Some("outer"));
        let inner = mapping.get(keys::INNER_EXCEPTION).unwrap().as_map().unwrap();
        assert_eq!(inner.get(keys::TYPE).unwrap().as_str(), Some("ParseIntError"));
        assert_eq!(inner.get("Kind").unwrap().as_str(), Some("InvalidDigit"));

        let shallow = error.destructure_with(&engine, false);
        assert!(!shallow.contains_key(keys::INNER_EXCEPTION));
    }

    #[test]
    fn test_ok_result_has_no_mapping() {
        let result: Result<(), Box<dyn Error>> = Ok(());
        assert!(result.destructure().is_none());
    }
}
