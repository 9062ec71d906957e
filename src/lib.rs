//! # Liitu
//!
//! Colorized, indented, human-readable rendering of structured log events
//! for terminals and other byte-stream destinations.
//!
//! ## Front Ends
//!
//! The crate renders events coming from two kinds of producers:
//!
//! - **Typed records**: a [`Handler`] accepts a [`Record`] (time, level,
//!   message, typed attributes, source location). The [`TintLayer`] plugs a
//!   handler into `tracing`, mapping spans onto handler groups.
//! - **Serialized lines**: an [`EventWriter`] accepts one pre-serialized
//!   event per write, decodes it and renders it the same way.
//!
//! ## Architecture Overview
//!
//! - `level`: severity model, text codes, deltas and color buckets
//! - `palette`: the immutable color scheme
//! - `value`: attributes and their tagged values
//! - `printer`: the shared render buffer, its lock and the drawing
//!   primitives
//! - `handler`: the typed-record renderer and its derivation chain
//! - `event`: the serialized-line renderer
//! - `logging`: `tracing` integration
//! - `utils`: float formatting, quoting and event decoding
//! - `cli`: arguments of the `liitu` prettifier binary
//!
//! ## Usage Example
//!
//! ```rust
//! use liitu::{Attr, Handler, HandlerOptions, Level, Record};
//!
//! # fn main() -> liitu::Result<()> {
//! let handler = Handler::new(std::io::stderr(), HandlerOptions::default())
//!     .with_group("http")
//!     .with_attrs([Attr::string("service", "api")]);
//!
//! let record = Record::new(Level::WARN, "request failed")
//!     .with_attrs([Attr::int("status", 503)]);
//! handler.handle(&record)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency
//!
//! Rendering is fully synchronous. All handlers derived from one root, and
//! any event writer built on the same printer, share one lock: each record
//! is assembled and written to the sink while holding it, so concurrent
//! callers never see interleaved records.

pub mod cli;

pub mod error;

/// Event adapter for pre-serialized lines
///
/// Decodes one event per call into an ordered tree, pulls out the level,
/// time and message fields and renders the rest as attributes.
pub mod event;

/// Attribute renderer for typed records
///
/// Holds the configuration, group path and pre-rendered attributes of a
/// handler context, and the derivation operations that build new contexts.
pub mod handler;

pub mod level;

/// `tracing` integration
///
/// A `tracing_subscriber` layer that renders events through a [`Handler`]
/// and turns spans into groups.
pub mod logging;

pub mod palette;

/// Shared render buffer and drawing primitives
pub mod printer;

pub mod utils;

pub mod value;

pub use error::{Error, Result};
pub use event::{EventOptions, EventWriter, FieldNames};
pub use handler::{Handler, HandlerOptions, Record, ReplaceAttr, Source};
pub use level::{Bucket, Level};
pub use logging::TintLayer;
pub use palette::{Palette, Tint};
pub use printer::{Canvas, Frame, Printer, PrinterOptions, TimeValue};
pub use value::{Attr, AttrValue};

/// The current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration values
///
/// Every option falls back to one of these when left unset.
pub mod defaults {
    use crate::level::Level;

    /// Records below this level are skipped.
    pub const LEVEL: Level = Level::INFO;

    /// Timestamp layout, in strftime syntax.
    pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    /// Spaces per indent unit.
    pub const INDENT_WIDTH: usize = 2;

    /// Keys offered to the rewrite hook for the built-in record fields.
    pub const TIME_KEY: &str = "time";
    pub const LEVEL_KEY: &str = "level";
    pub const MESSAGE_KEY: &str = "msg";
    pub const SOURCE_KEY: &str = "source";

    /// Well-known fields of serialized event lines.
    pub const EVENT_LEVEL_FIELD: &str = "level";
    pub const EVENT_TIME_FIELD: &str = "time";
    pub const EVENT_MESSAGE_FIELD: &str = "message";
}

/// In-memory sinks for unit tests
#[cfg(test)]
pub(crate) mod testing {
    use parking_lot::Mutex;
    use std::io::{self, Write};
    use std::sync::Arc;

    /// Records every write call as its own segment.
    #[derive(Clone, Default)]
    pub struct Capture(Arc<Mutex<Vec<Vec<u8>>>>);

    impl Capture {
        pub fn segments(&self) -> Vec<String> {
            self.0
                .lock()
                .iter()
                .map(|s| String::from_utf8_lossy(s).into_owned())
                .collect()
        }

        pub fn text(&self) -> String {
            self.segments().concat()
        }
    }

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().push(buf.to_vec());
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Fails the first `n` writes, then behaves like [`Capture`].
    #[derive(Clone)]
    pub struct Flaky {
        failures: Arc<Mutex<usize>>,
        inner: Capture,
    }

    impl Flaky {
        pub fn failing_first(n: usize) -> Self {
            Self {
                failures: Arc::new(Mutex::new(n)),
                inner: Capture::default(),
            }
        }

        pub fn text(&self) -> String {
            self.inner.text()
        }
    }

    impl Write for Flaky {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let mut failures = self.failures.lock();
            if *failures > 0 {
                *failures -= 1;
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"));
            }
            drop(failures);
            self.inner.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}
