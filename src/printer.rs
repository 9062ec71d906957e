//! # Render Buffer
//!
//! A [`Printer`] owns the output sink together with a byte buffer, both
//! behind one mutex. Every record is assembled and flushed while that lock is
//! held, so concurrent producers sharing a printer never interleave partial
//! records.
//!
//! ## Lifecycle of a Record
//!
//! 1. [`Printer::lock`] acquires the mutex and returns a [`Frame`]
//! 2. [`Frame::canvas`] exposes the rendering primitives ([`Canvas`])
//! 3. [`Frame::flush`] writes the whole buffer to the sink in one call and
//!    clears it, whether or not the write succeeded
//!
//! Dropping a `Frame` without flushing discards whatever was assembled, so
//! the buffer only ever holds the record currently being built.
//!
//! ## Rendering Rules
//!
//! - Colored text is written as `escape + text + reset`, or as raw text when
//!   the printer has color disabled
//! - Field names are indented by `indent_level` indent units and followed by
//!   `": "`
//! - Scalars take a fast path; groups and opaque values fall back to the tree
//!   renderer, which colors each leaf with the same palette

use crate::level::Level;
use crate::palette::{Palette, Tint, RESET};
use crate::utils::{format_float, quote, quote_leaf};
use crate::value::AttrValue;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Local, TimeZone, Utc};
use parking_lot::{Mutex, MutexGuard};
use serde_json::Value;
use std::fmt::Write as _;
use std::io::{self, Write};
use std::sync::Arc;

/// Encoder configuration for a [`Printer`].
#[derive(Clone, Debug)]
pub struct PrinterOptions {
    /// Write plain text without escape sequences.
    pub no_color: bool,
    /// Spaces per indent unit.
    pub indent_width: usize,
    pub palette: Arc<Palette>,
}

impl Default for PrinterOptions {
    fn default() -> Self {
        Self {
            no_color: false,
            indent_width: crate::defaults::INDENT_WIDTH,
            palette: Palette::shared(),
        }
    }
}

#[derive(Debug)]
struct Style {
    no_color: bool,
    indent: String,
    palette: Arc<Palette>,
}

struct Slate<W> {
    buf: Vec<u8>,
    sink: W,
}

/// Shared buffer, lock and sink backing one output destination.
pub struct Printer<W> {
    style: Style,
    slate: Mutex<Slate<W>>,
}

impl<W: Write> Printer<W> {
    pub fn new(sink: W, options: PrinterOptions) -> Self {
        Self {
            style: Style {
                no_color: options.no_color,
                indent: " ".repeat(options.indent_width),
                palette: options.palette,
            },
            slate: Mutex::new(Slate {
                buf: Vec::new(),
                sink,
            }),
        }
    }

    /// Acquire the printer for one record.
    pub fn lock(&self) -> Frame<'_, W> {
        Frame {
            style: &self.style,
            slate: self.slate.lock(),
        }
    }

    /// Give back the sink.
    pub fn into_sink(self) -> W {
        self.slate.into_inner().sink
    }
}

impl<W> Printer<W> {
    pub fn no_color(&self) -> bool {
        self.style.no_color
    }

    pub fn indent_width(&self) -> usize {
        self.style.indent.len()
    }

    /// A canvas over a caller-owned buffer using this printer's style.
    ///
    /// Used to pre-render attributes outside of the lock.
    pub fn detached<'a>(&'a self, buf: &'a mut Vec<u8>) -> Canvas<'a> {
        Canvas {
            buf,
            style: &self.style,
        }
    }
}

/// Exclusive access to a [`Printer`] for the duration of one record.
pub struct Frame<'a, W> {
    style: &'a Style,
    slate: MutexGuard<'a, Slate<W>>,
}

impl<'a, W: Write> Frame<'a, W> {
    pub fn canvas(&mut self) -> Canvas<'_> {
        Canvas {
            buf: &mut self.slate.buf,
            style: self.style,
        }
    }

    /// Write the assembled record to the sink and clear the buffer.
    ///
    /// Returns the number of bytes flushed. The buffer is cleared even when
    /// the sink fails and the write is never retried.
    pub fn flush(mut self) -> io::Result<usize> {
        let Slate { buf, sink } = &mut *self.slate;
        let flushed = buf.len();
        let result = sink.write_all(buf).and_then(|_| sink.flush());
        buf.clear();
        result.map(|_| flushed)
    }
}

impl<W> Drop for Frame<'_, W> {
    fn drop(&mut self) {
        self.slate.buf.clear();
    }
}

/// Where a timestamp comes from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TimeValue<'a> {
    /// RFC 3339 text, e.g. `2023-01-01T00:00:00Z`.
    Text(&'a str),
    /// Seconds (and nanoseconds) since the Unix epoch.
    Unix { secs: i64, nanos: u32 },
    Instant(DateTime<Utc>),
    Missing,
}

impl<'a> TimeValue<'a> {
    /// Interpret a decoded field. Strings are RFC 3339, numbers are epoch
    /// seconds (fractions allowed), anything else is missing.
    pub fn from_tree(value: Option<&'a Value>) -> Self {
        match value {
            Some(Value::String(text)) => TimeValue::Text(text),
            Some(Value::Number(n)) => match (n.as_i64(), n.as_f64()) {
                (Some(secs), _) => TimeValue::Unix { secs, nanos: 0 },
                (None, Some(secs)) if secs.is_finite() => TimeValue::Unix {
                    secs: secs.floor() as i64,
                    nanos: (secs.fract().abs() * 1e9) as u32,
                },
                _ => TimeValue::Missing,
            },
            _ => TimeValue::Missing,
        }
    }

    /// Local time for this value, or the current time when it is missing or
    /// cannot be parsed.
    pub fn resolve(self) -> DateTime<Local> {
        let parsed = match self {
            TimeValue::Text(text) => DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|t| t.with_timezone(&Local)),
            TimeValue::Unix { secs, nanos } => Utc
                .timestamp_opt(secs, nanos)
                .single()
                .map(|t| t.with_timezone(&Local)),
            TimeValue::Instant(t) => Some(t.with_timezone(&Local)),
            TimeValue::Missing => None,
        };
        parsed.unwrap_or_else(Local::now)
    }
}

/// Format a timestamp with a strftime-style format.
///
/// An invalid format yields an empty string.
pub fn format_time(time: &DateTime<Local>, format: &str) -> String {
    let mut out = String::new();
    if write!(out, "{}", time.format(format)).is_err() {
        out.clear();
    }
    out
}

/// Rendering primitives over a byte buffer.
pub struct Canvas<'a> {
    buf: &'a mut Vec<u8>,
    style: &'a Style,
}

impl<'a> Canvas<'a> {
    pub fn palette(&self) -> &'a Palette {
        let style: &'a Style = self.style;
        &style.palette
    }

    /// A canvas with the same style over another buffer.
    pub fn scratch<'b>(&self, buf: &'b mut Vec<u8>) -> Canvas<'b>
    where
        'a: 'b,
    {
        Canvas {
            buf,
            style: self.style,
        }
    }

    /// Append raw text.
    pub fn push_str(&mut self, text: &str) {
        self.buf.extend_from_slice(text.as_bytes());
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Whitespace for `level` indent units.
    pub fn indent(&self, level: usize) -> String {
        self.style.indent.repeat(level)
    }

    fn push_indent(&mut self, level: usize) {
        for _ in 0..level {
            self.buf.extend_from_slice(self.style.indent.as_bytes());
        }
    }

    /// Append colored text.
    pub fn print(&mut self, tint: &Tint, text: &str) {
        if self.style.no_color {
            self.push_str(text);
            return;
        }
        self.push_str(tint.escape());
        self.push_str(text);
        self.push_str(RESET);
    }

    /// Append colored text followed by a newline.
    pub fn println(&mut self, tint: &Tint, text: &str) {
        self.print(tint, &format!("{}\n", text));
    }

    pub fn print_field(&mut self, name: &str, indent_level: usize) {
        let style = self.style;
        let label = format!("{}{}", self.indent(indent_level), name);
        self.print(&style.palette.field, &label);
        self.push_str(": ");
    }

    pub fn print_level(&mut self, level: Level) {
        let style = self.style;
        self.print(level.tint(&style.palette), &format!(" [{}] ", level.text()));
    }

    /// Render a timestamp. Missing or unparsable values fall back to now.
    pub fn print_time(&mut self, value: TimeValue<'_>, format: &str) {
        let style = self.style;
        let text = format_time(&value.resolve(), format);
        self.print(&style.palette.time, &text);
    }

    /// Render the group path as `(a/b) `.
    pub fn print_group(&mut self, groups: &[String]) {
        let style = self.style;
        self.print(&style.palette.field, &format!("({}) ", groups.join("/")));
    }

    /// Render a value and terminate the line.
    pub fn print_value(&mut self, value: &AttrValue, indent_level: usize) {
        let palette = self.palette();
        match value {
            AttrValue::Int(v) => self.println(&palette.number, &v.to_string()),
            AttrValue::Uint(v) => self.println(&palette.number, &v.to_string()),
            AttrValue::Float(v) => self.println(&palette.number, &format_float(*v)),
            AttrValue::String(v) => self.println(&palette.string, &quote(v)),
            AttrValue::Bool(v) => self.println(&palette.boolean, &v.to_string()),
            AttrValue::Binary(v) => self.println(&palette.binary, &quote(&BASE64.encode(v))),
            AttrValue::Group(_) | AttrValue::Opaque(_) => {
                self.print_tree(&value.to_tree(), indent_level)
            }
        }
    }

    /// Pretty-print a tree and terminate the line.
    ///
    /// Nested lines are prefixed with `indent_level` indent units plus one
    /// unit per nesting depth. Leaves are colored by kind and object keys use
    /// the field color.
    pub fn print_tree(&mut self, value: &Value, indent_level: usize) {
        self.encode_tree(value, indent_level, 0);
        self.push_str("\n");
    }

    fn encode_tree(&mut self, value: &Value, indent_level: usize, depth: usize) {
        let palette = self.palette();
        match value {
            Value::Null => self.print(&palette.null, "null"),
            Value::Bool(b) => self.print(&palette.boolean, if *b { "true" } else { "false" }),
            Value::Number(n) => self.print(&palette.number, &n.to_string()),
            Value::String(s) => self.print(&palette.string, &quote_leaf(s)),
            Value::Array(items) if items.is_empty() => self.push_str("[]"),
            Value::Object(members) if members.is_empty() => self.push_str("{}"),
            Value::Array(items) => {
                self.push_str("[");
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.push_str(",");
                    }
                    self.push_str("\n");
                    self.push_indent(indent_level + depth + 1);
                    self.encode_tree(item, indent_level, depth + 1);
                }
                self.push_str("\n");
                self.push_indent(indent_level + depth);
                self.push_str("]");
            }
            Value::Object(members) => {
                self.push_str("{");
                for (i, (key, member)) in members.iter().enumerate() {
                    if i > 0 {
                        self.push_str(",");
                    }
                    self.push_str("\n");
                    self.push_indent(indent_level + depth + 1);
                    self.print(&palette.field, &quote_leaf(key));
                    self.push_str(": ");
                    self.encode_tree(member, indent_level, depth + 1);
                }
                self.push_str("\n");
                self.push_indent(indent_level + depth);
                self.push_str("}");
            }
        }
    }
}
