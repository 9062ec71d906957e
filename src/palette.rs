//! # Color Scheme
//!
//! The palette is one immutable value built once and shared by reference
//! with every printer. Each entry is a [`Tint`]: an ANSI SGR escape built
//! from a `colored` foreground color and an optional bold attribute.
//!
//! Escapes are emitted directly rather than through `colored::ColoredString`
//! so that rendering does not depend on terminal detection. Whether color is
//! written at all is decided per printer by its `no_color` flag.

use colored::Color;
use once_cell::sync::Lazy;
use std::sync::Arc;

/// SGR sequence that restores the default style.
pub const RESET: &str = "\x1b[0m";

static STANDARD: Lazy<Arc<Palette>> = Lazy::new(|| Arc::new(Palette::default()));

/// A single escape sequence in the palette.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tint {
    escape: String,
}

impl Tint {
    /// Foreground color without attributes.
    pub fn new(color: Color) -> Self {
        Self::with_codes(&[color.to_fg_str().as_ref()])
    }

    /// Foreground color rendered bold.
    pub fn bold(color: Color) -> Self {
        Self::with_codes(&[color.to_fg_str().as_ref(), "1"])
    }

    /// The reset style, used where no color applies.
    pub fn reset() -> Self {
        Self {
            escape: RESET.to_string(),
        }
    }

    fn with_codes(codes: &[&str]) -> Self {
        Self {
            escape: format!("\x1b[{}m", codes.join(";")),
        }
    }

    /// The escape sequence written before colored text.
    pub fn escape(&self) -> &str {
        &self.escape
    }
}

/// Colors for every element of a rendered record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Palette {
    pub time: Tint,
    pub field: Tint,
    pub string: Tint,
    pub number: Tint,
    pub boolean: Tint,
    pub binary: Tint,
    pub null: Tint,

    pub trace: Tint,
    pub debug: Tint,
    pub info: Tint,
    pub warn: Tint,
    pub error: Tint,
    pub reset: Tint,
}

impl Palette {
    /// The process-wide default palette, built on first use.
    pub fn shared() -> Arc<Palette> {
        Arc::clone(&STANDARD)
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            time: Tint::new(Color::BrightBlack),
            field: Tint::new(Color::Cyan),
            string: Tint::new(Color::Green),
            number: Tint::new(Color::Magenta),
            boolean: Tint::new(Color::Yellow),
            binary: Tint::new(Color::Blue),
            null: Tint::new(Color::BrightYellow),

            trace: Tint::bold(Color::Blue),
            debug: Tint::bold(Color::Magenta),
            info: Tint::bold(Color::Green),
            warn: Tint::bold(Color::Yellow),
            error: Tint::bold(Color::Red),
            reset: Tint::reset(),
        }
    }
}
