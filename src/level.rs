//! # Severity Levels
//!
//! Levels are plain signed integers so that producers can log at arbitrary
//! severities between the named ones. Every level falls into exactly one
//! [`Bucket`]: the named bucket with the largest threshold that does not
//! exceed it. The distance from that threshold is the level's *delta* and is
//! shown after the bucket code, so `-2` renders as `DBG+2` and `5` as `WRN+1`.
//!
//! | Bucket | Threshold | Code  |
//! |--------|-----------|-------|
//! | Trace  | -8        | `TRC` |
//! | Debug  | -4        | `DBG` |
//! | Info   | 0         | `INF` |
//! | Warn   | 4         | `WRN` |
//! | Error  | 8         | `ERR` |
//! | Fatal  | 12        | `FTL` |
//! | Panic  | 15        | `PNC` |
//!
//! Anything at or above 16 is unknown and renders as `???+N` where `N` is the
//! literal level. Colors are chosen independently of the text bucket: fatal
//! and panic share the error color and unknown levels use the reset style.

use crate::palette::{Palette, Tint};
use std::fmt;

/// A signed log severity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Level(pub i32);

impl Level {
    pub const TRACE: Level = Level(-8);
    pub const DEBUG: Level = Level(-4);
    pub const INFO: Level = Level(0);
    pub const WARN: Level = Level(4);
    pub const ERROR: Level = Level(8);
    pub const FATAL: Level = Level(12);
    pub const PANIC: Level = Level(15);
    /// Sentinel returned for level names that are not recognized.
    pub const UNKNOWN: Level = Level(16);

    /// Map a lowercase level name to its threshold.
    ///
    /// Only the exact names `trace`, `debug`, `info`, `warn`, `error`,
    /// `fatal` and `panic` are accepted. Anything else, including different
    /// casing, yields [`Level::UNKNOWN`].
    pub fn from_name(name: &str) -> Level {
        Level::parse_name(name).unwrap_or(Level::UNKNOWN)
    }

    /// Like [`Level::from_name`] but reports unrecognized names as `None`.
    pub fn parse_name(name: &str) -> Option<Level> {
        match name {
            "trace" => Some(Level::TRACE),
            "debug" => Some(Level::DEBUG),
            "info" => Some(Level::INFO),
            "warn" => Some(Level::WARN),
            "error" => Some(Level::ERROR),
            "fatal" => Some(Level::FATAL),
            "panic" => Some(Level::PANIC),
            _ => None,
        }
    }

    /// The text bucket this level falls into.
    pub fn bucket(self) -> Bucket {
        match self.0 {
            l if l < Level::DEBUG.0 => Bucket::Trace,
            l if l < Level::INFO.0 => Bucket::Debug,
            l if l < Level::WARN.0 => Bucket::Info,
            l if l < Level::ERROR.0 => Bucket::Warn,
            l if l < Level::FATAL.0 => Bucket::Error,
            l if l < Level::PANIC.0 => Bucket::Fatal,
            l if l == Level::PANIC.0 => Bucket::Panic,
            _ => Bucket::Unknown,
        }
    }

    /// Offset from the bucket threshold.
    ///
    /// Panic never carries a delta and unknown levels report the literal
    /// level value.
    pub fn delta(self) -> i64 {
        match self.bucket() {
            Bucket::Panic => 0,
            Bucket::Unknown => i64::from(self.0),
            bucket => i64::from(self.0) - i64::from(bucket.threshold()),
        }
    }

    /// Short text form, e.g. `INF`, `DBG+2`, `TRC-1`, `???+20`.
    pub fn text(self) -> String {
        let code = self.bucket().code();
        match self.delta() {
            0 => code.to_string(),
            d if d > 0 => format!("{}+{}", code, d),
            d => format!("{}{}", code, d),
        }
    }

    /// The palette entry used to color this level.
    pub fn tint(self, palette: &Palette) -> &Tint {
        match self.0 {
            l if l < Level::DEBUG.0 => &palette.trace,
            l if l < Level::INFO.0 => &palette.debug,
            l if l < Level::WARN.0 => &palette.info,
            l if l < Level::ERROR.0 => &palette.warn,
            l if l < Level::UNKNOWN.0 => &palette.error,
            _ => &palette.reset,
        }
    }
}

impl Default for Level {
    fn default() -> Self {
        Level::INFO
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

impl From<i32> for Level {
    fn from(level: i32) -> Self {
        Level(level)
    }
}

impl From<tracing::Level> for Level {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE => Level::TRACE,
            tracing::Level::DEBUG => Level::DEBUG,
            tracing::Level::INFO => Level::INFO,
            tracing::Level::WARN => Level::WARN,
            tracing::Level::ERROR => Level::ERROR,
        }
    }
}

/// Named severity range used to pick the level's text code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bucket {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
    Panic,
    Unknown,
}

impl Bucket {
    /// Three-letter code rendered inside the level brackets.
    pub fn code(self) -> &'static str {
        match self {
            Bucket::Trace => "TRC",
            Bucket::Debug => "DBG",
            Bucket::Info => "INF",
            Bucket::Warn => "WRN",
            Bucket::Error => "ERR",
            Bucket::Fatal => "FTL",
            Bucket::Panic => "PNC",
            Bucket::Unknown => "???",
        }
    }

    /// Lowest level that selects this bucket.
    pub fn threshold(self) -> i32 {
        match self {
            Bucket::Trace => Level::TRACE.0,
            Bucket::Debug => Level::DEBUG.0,
            Bucket::Info => Level::INFO.0,
            Bucket::Warn => Level::WARN.0,
            Bucket::Error => Level::ERROR.0,
            Bucket::Fatal => Level::FATAL.0,
            Bucket::Panic => Level::PANIC.0,
            Bucket::Unknown => Level::UNKNOWN.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Named thresholds render without a delta
    #[test]
    fn test_named_levels() {
        assert_eq!(Level::TRACE.text(), "TRC");
        assert_eq!(Level::DEBUG.text(), "DBG");
        assert_eq!(Level::INFO.text(), "INF");
        assert_eq!(Level::WARN.text(), "WRN");
        assert_eq!(Level::ERROR.text(), "ERR");
        assert_eq!(Level::FATAL.text(), "FTL");
        assert_eq!(Level::PANIC.text(), "PNC");
    }

    /// Levels between thresholds carry their offset
    #[test]
    fn test_custom_levels() {
        assert_eq!(Level(-2).text(), "DBG+2");
        assert_eq!(Level(5).text(), "WRN+1");
        assert_eq!(Level(14).text(), "FTL+2");
        assert_eq!(Level(-10).text(), "TRC-2");
        assert_eq!(Level(16).text(), "???+16");
        assert_eq!(Level(40).text(), "???+40");
    }

    /// Every level in a wide range maps to one code with a consistent delta
    #[test]
    fn test_bucket_selection_range() {
        let codes = ["TRC", "DBG", "INF", "WRN", "ERR", "FTL", "PNC", "???"];
        for l in -1000..=1000 {
            let level = Level(l);
            let bucket = level.bucket();
            assert!(codes.contains(&bucket.code()));

            let text = level.text();
            assert!(text.starts_with(bucket.code()));
            match bucket {
                Bucket::Panic => assert_eq!(text, "PNC"),
                Bucket::Unknown => assert_eq!(text, format!("???+{}", l)),
                _ => {
                    let delta = l - bucket.threshold();
                    if delta == 0 {
                        assert_eq!(text, bucket.code());
                    } else {
                        assert_eq!(level.delta(), i64::from(delta));
                        assert_ne!(text, bucket.code());
                    }
                    if bucket != Bucket::Trace {
                        assert!(delta >= 0);
                    }
                }
            }
        }
    }

    /// Names round-trip through their threshold
    #[test]
    fn test_from_name() {
        assert_eq!(Level::from_name("warn"), Level(4));
        assert_eq!(Level::from_name("warn").text(), "WRN");
        for name in ["trace", "debug", "info", "warn", "error", "fatal", "panic"] {
            let level = Level::from_name(name);
            assert_ne!(level, Level::UNKNOWN);
            assert_eq!(level.delta(), 0);
        }
        assert_eq!(Level::from_name("WARN"), Level::UNKNOWN);
        assert_eq!(Level::from_name("warning"), Level::UNKNOWN);
        assert_eq!(Level::from_name(""), Level::UNKNOWN);
        assert_eq!(Level::parse_name("verbose"), None);
    }

    /// Fatal and panic share the error color, unknown uses reset
    #[test]
    fn test_level_tint() {
        let palette = Palette::default();
        assert_eq!(Level(-6).tint(&palette), &palette.trace);
        assert_eq!(Level(-1).tint(&palette), &palette.debug);
        assert_eq!(Level(3).tint(&palette), &palette.info);
        assert_eq!(Level(4).tint(&palette), &palette.warn);
        assert_eq!(Level::FATAL.tint(&palette), &palette.error);
        assert_eq!(Level::PANIC.tint(&palette), &palette.error);
        assert_eq!(Level::UNKNOWN.tint(&palette), &palette.reset);
    }

    #[test]
    fn test_from_tracing_level() {
        assert_eq!(Level::from(tracing::Level::TRACE), Level::TRACE);
        assert_eq!(Level::from(tracing::Level::WARN), Level::WARN);
        assert_eq!(Level::from(tracing::Level::ERROR), Level::ERROR);
    }
}
