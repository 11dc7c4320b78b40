#![deny(
    missing_docs,
    unsafe_code,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]

//! Structured error details for `tracing` events.
//!
//! A logging pipeline built on `tracing` sees errors as opaque
//! `&dyn Error` field values. This crate destructures them with
//! [`unravel`] so that their members and causes reach the log sink as
//! structured data.
//!
//! # How It Works
//!
//! Add [`ErrorDetailLayer`] to your subscriber next to your other layers.
//! Whenever an event records an error-valued field, the layer destructures
//! the error with the [global engine](unravel::Engine::global) and hands the
//! resulting mapping to a [`DetailSink`].
//!
//! For pipelines that only understand text fields, [`ErrorDetail`] renders a
//! mapping as JSON and can be recorded with `%`.
//!
//! # Quick Start
//!
//! ```
//! use std::error::Error;
//!
//! use tracing_subscriber::{Registry, layer::SubscriberExt};
//! use unravel_tracing::{ErrorDetailLayer, ErrorEvent};
//!
//! let layer = ErrorDetailLayer::new(|event: ErrorEvent<'_>| {
//!     println!("{} = {}", event.root_name, event.detail);
//! });
//! let subscriber = Registry::default().with(layer);
//!
//! tracing::subscriber::with_default(subscriber, || {
//!     let error = "x".parse::<u8>().unwrap_err();
//!     tracing::error!(error = &error as &(dyn Error + 'static), "failed to parse");
//! });
//! ```
//!
//! # Environment Variables
//!
//! - `UNRAVEL_TRACING` - Comma-separated options:
//!   - `shallow` - Only destructure the recorded error itself, not its causes

use std::{error::Error, fmt, sync::OnceLock};

use tracing::{
    Event, Level, Subscriber,
    field::{Field, Visit},
};
use tracing_subscriber::layer::{Context, Layer};
use unravel::{Engine, Mapping};

/// An error recorded on a tracing event, destructured.
#[derive(Debug)]
pub struct ErrorEvent<'a> {
    /// The target of the event.
    pub target: &'a str,
    /// The level of the event.
    pub level: Level,
    /// The name of the field holding the error.
    pub field: &'a str,
    /// The configured root name of the engine, such as `ExceptionDetail`.
    pub root_name: &'a str,
    /// The destructured error.
    pub detail: Mapping,
}

/// Receives the destructured errors of tracing events.
///
/// Closures of the form `Fn(ErrorEvent<'_>)` implement this trait.
pub trait DetailSink: 'static + Send + Sync {
    /// Called once per error-valued field of an event.
    fn on_error(&self, event: ErrorEvent<'_>);
}

impl<F> DetailSink for F
where
    F: Fn(ErrorEvent<'_>) + 'static + Send + Sync,
{
    fn on_error(&self, event: ErrorEvent<'_>) {
        self(event);
    }
}

/// A tracing layer that destructures error-valued event fields.
///
/// # Examples
///
/// ```
/// use tracing_subscriber::{Registry, layer::SubscriberExt};
/// use unravel_tracing::{ErrorDetail, ErrorDetailLayer, ErrorEvent};
///
/// let subscriber = Registry::default()
///     .with(ErrorDetailLayer::new(|event: ErrorEvent<'_>| {
///         eprintln!("{}", ErrorDetail::from(event.detail));
///     }))
///     .with(tracing_subscriber::fmt::layer());
///
/// tracing::subscriber::set_global_default(subscriber).expect("failed to set subscriber");
/// ```
pub struct ErrorDetailLayer<K> {
    sink: K,
    engine: Option<&'static Engine>,
    recursive: bool,
}

impl<K: DetailSink> ErrorDetailLayer<K> {
    /// Creates a layer sending every destructured error to `sink`.
    ///
    /// Recursion is controlled by the `UNRAVEL_TRACING` environment
    /// variable.
    pub fn new(sink: K) -> Self {
        Self {
            sink,
            engine: None,
            recursive: !UnravelTracingEnvOptions::get().shallow,
        }
    }

    /// Uses `engine` instead of the global engine.
    pub fn with_engine(mut self, engine: &'static Engine) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Sets whether causes and sub-errors are destructured too.
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    fn engine(&self) -> &'static Engine {
        self.engine.unwrap_or_else(Engine::global)
    }
}

impl<K> fmt::Debug for ErrorDetailLayer<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorDetailLayer")
            .field("engine", &self.engine)
            .field("recursive", &self.recursive)
            .finish_non_exhaustive()
    }
}

impl<S, K> Layer<S> for ErrorDetailLayer<K>
where
    S: Subscriber,
    K: DetailSink,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let engine = self.engine();

        struct ErrorFieldVisitor<'a> {
            engine: &'a Engine,
            recursive: bool,
            found: Vec<(&'static str, Mapping)>,
        }

        impl Visit for ErrorFieldVisitor<'_> {
            fn record_debug(&mut self, _field: &Field, _value: &dyn fmt::Debug) {}

            fn record_error(&mut self, field: &Field, value: &(dyn Error + 'static)) {
                let detail = self.engine.destructure_error(value, self.recursive);
                self.found.push((field.name(), detail));
            }
        }

        let mut visitor = ErrorFieldVisitor {
            engine,
            recursive: self.recursive,
            found: Vec::new(),
        };
        event.record(&mut visitor);

        let metadata = event.metadata();
        for (field, detail) in visitor.found {
            self.sink.on_error(ErrorEvent {
                target: metadata.target(),
                level: *metadata.level(),
                field,
                root_name: engine.root_name(),
                detail,
            });
        }
    }
}

/// A destructured error rendered as JSON.
///
/// # Examples
///
/// ```
/// use unravel_tracing::ErrorDetail;
///
/// let error = "x".parse::<u8>().unwrap_err();
/// let detail = ErrorDetail::new(&error);
///
/// tracing::warn!(detail = %detail, "invalid input");
/// assert!(detail.to_string().starts_with(r#"{"Type":"ParseIntError""#));
/// ```
#[derive(Clone, Debug)]
pub struct ErrorDetail(Mapping);

impl ErrorDetail {
    /// Destructures `error` recursively with the global engine.
    pub fn new(error: &(dyn Error + 'static)) -> Self {
        Self(unravel::destructure(error))
    }

    /// The destructured mapping.
    pub fn mapping(&self) -> &Mapping {
        &self.0
    }
}

impl From<Mapping> for ErrorDetail {
    fn from(mapping: Mapping) -> Self {
        Self(mapping)
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(&self.0).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

#[derive(Debug)]
struct UnravelTracingEnvOptions {
    shallow: bool,
}

impl UnravelTracingEnvOptions {
    fn get() -> &'static Self {
        static UNRAVEL_TRACING_FLAGS: OnceLock<UnravelTracingEnvOptions> = OnceLock::new();

        UNRAVEL_TRACING_FLAGS.get_or_init(|| {
            let shallow = std::env::var_os("UNRAVEL_TRACING").is_some_and(|var| {
                var.to_string_lossy()
                    .split(',')
                    .any(|option| option.trim().eq_ignore_ascii_case("shallow"))
            });

            UnravelTracingEnvOptions { shallow }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use tracing_subscriber::{Registry, layer::SubscriberExt};
    use unravel::{DestructuringOptions, keys};

    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("failed to load settings")]
    struct LoadError {
        #[source]
        cause: std::num::ParseIntError,
    }

    type Captured = Arc<Mutex<Vec<(String, Level, Mapping)>>>;

    struct CaptureSink(Captured);

    impl DetailSink for CaptureSink {
        fn on_error(&self, event: ErrorEvent<'_>) {
            self.0
                .lock()
                .unwrap()
                .push((event.field.to_string(), event.level, event.detail));
        }
    }

    fn capture(configure: impl FnOnce(ErrorDetailLayer<CaptureSink>) -> ErrorDetailLayer<CaptureSink>) -> Captured {
        let captured = Captured::default();
        let layer = configure(ErrorDetailLayer::new(CaptureSink(Arc::clone(&captured))));
        let subscriber = Registry::default().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            let error = LoadError {
                cause: "x".parse::<u16>().unwrap_err(),
            };
            tracing::error!(error = &error as &(dyn Error + 'static), "startup failed");
            tracing::info!(answer = 42, "no errors here");
        });

        captured
    }

    #[test]
    fn test_layer_destructures_error_fields() {
        let captured = capture(|layer| layer.recursive(true));
        let captured = captured.lock().unwrap();
        assert_eq!(captured.len(), 1);

        let (field, level, detail) = &captured[0];
        assert_eq!(field, "error");
        assert_eq!(*level, Level::ERROR);
        assert_eq!(
            detail.get(keys::MESSAGE).unwrap().as_str(),
            Some("failed to load settings")
        );
        let inner = detail.get(keys::INNER_EXCEPTION).unwrap().as_map().unwrap();
        assert_eq!(inner.get(keys::TYPE).unwrap().as_str(), Some("ParseIntError"));
    }

    #[test]
    fn test_layer_shallow() {
        let captured = capture(|layer| layer.recursive(false));
        let captured = captured.lock().unwrap();
        assert!(!captured[0].2.contains_key(keys::INNER_EXCEPTION));
    }

    #[test]
    fn test_layer_with_engine() {
        let engine = DestructuringOptions::new_without_defaults()
            .root_name("Failure")
            .leak()
            .get();
        let captured = capture(|layer| layer.with_engine(engine).recursive(true));
        let captured = captured.lock().unwrap();
        let inner = captured[0].2.get(keys::INNER_EXCEPTION).unwrap().as_map().unwrap();
        assert_eq!(inner.get(keys::TYPE).unwrap().as_str(), Some(keys::OPAQUE_TYPE_NAME));
    }

    #[test]
    fn test_error_detail_json() {
        let error = LoadError {
            cause: "".parse::<u16>().unwrap_err(),
        };
        let detail = ErrorDetail::new(&error);
        let json: serde_json::Value = serde_json::from_str(&detail.to_string()).unwrap();
        assert_eq!(json["Type"], "Error");
        assert_eq!(json["Message"], "failed to load settings");
        assert_eq!(json["InnerException"]["Type"], "ParseIntError");
        assert_eq!(json["InnerException"]["Kind"], "Empty");
    }
}
