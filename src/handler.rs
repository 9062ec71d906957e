//! # Attribute Renderer
//!
//! A [`Handler`] turns typed [`Record`]s into text on a shared [`Printer`].
//! Handlers are cheap, immutable handles: deriving one with
//! [`Handler::with_attrs`] or [`Handler::with_group`] builds a new context
//! and never touches the parent, so handlers can be freely cloned and
//! passed between threads.
//!
//! ## Record Layout
//!
//! ```text
//! 2023-01-01 12:00:00 [WRN] (http/server) request failed
//!   src/server.rs:42
//!     func server::handle
//!   service: "api"
//!   status: 503
//!   retry:
//!     attempt: 2
//!     backoff: 1.5
//! ```
//!
//! The first line carries time, level, the handler's group path and the
//! message. The optional source lines follow, then the attributes baked in by
//! `with_attrs`, then the record's own attributes, one per line at indent
//! level 1. Group attributes open a new line and indent their members one
//! level deeper.
//!
//! ## Rewrite Hook
//!
//! [`HandlerOptions::replace_attr`] is applied to the level, time, message
//! and source of every record and to every non-group attribute. Returning an
//! attribute with an empty key drops that field. Attributes attached with
//! `with_attrs` are rewritten once, when they are baked, not on every record.

use crate::error::Result;
use crate::level::Level;
use crate::palette::Palette;
use crate::printer::{Canvas, Printer, PrinterOptions, TimeValue};
use crate::value::{Attr, AttrValue};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::json;
use std::fmt;
use std::io::Write;
use std::panic::Location;
use std::sync::Arc;

/// Attribute rewrite hook: `(group path, attribute) -> attribute`.
pub type ReplaceAttr = Arc<dyn Fn(&[String], Attr) -> Attr + Send + Sync>;

/// Configuration for a [`Handler`].
#[derive(Clone)]
pub struct HandlerOptions {
    /// Minimum level to render.
    pub level: Level,
    /// Disable color. Only used when the handler builds its own printer.
    pub no_color: bool,
    /// Print the record's source location.
    pub add_source: bool,
    /// Print the calling function as well. Ignored without `add_source`.
    pub add_caller: bool,
    /// strftime-style format for timestamps.
    pub time_format: String,
    pub replace_attr: Option<ReplaceAttr>,
    /// Spaces per indent unit. Only used when the handler builds its own
    /// printer.
    pub indent_width: usize,
}

impl Default for HandlerOptions {
    fn default() -> Self {
        Self {
            level: crate::defaults::LEVEL,
            no_color: false,
            add_source: false,
            add_caller: false,
            time_format: crate::defaults::TIME_FORMAT.to_string(),
            replace_attr: None,
            indent_width: crate::defaults::INDENT_WIDTH,
        }
    }
}

impl fmt::Debug for HandlerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerOptions")
            .field("level", &self.level)
            .field("no_color", &self.no_color)
            .field("add_source", &self.add_source)
            .field("add_caller", &self.add_caller)
            .field("time_format", &self.time_format)
            .field("replace_attr", &self.replace_attr.is_some())
            .field("indent_width", &self.indent_width)
            .finish()
    }
}

/// Program location a record was emitted from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Source {
    pub file: String,
    pub line: u32,
    pub function: Option<String>,
    /// Enclosing module, shown when no function name is known.
    pub module: Option<String>,
}

impl From<&Location<'_>> for Source {
    fn from(location: &Location<'_>) -> Self {
        Self {
            file: location.file().to_string(),
            line: location.line(),
            function: None,
            module: None,
        }
    }
}

/// One log event.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    /// `None` omits the time from the output.
    pub time: Option<DateTime<Utc>>,
    pub level: Level,
    pub message: String,
    pub attrs: Vec<Attr>,
    pub source: Option<Source>,
}

impl Record {
    /// A record stamped with the current time and the caller's location.
    #[track_caller]
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            time: Some(Utc::now()),
            level,
            message: message.into(),
            attrs: Vec::new(),
            source: Some(Source::from(Location::caller())),
        }
    }

    pub fn with_attrs(mut self, attrs: impl IntoIterator<Item = Attr>) -> Self {
        self.attrs.extend(attrs);
        self
    }

    pub fn add(&mut self, attr: Attr) {
        self.attrs.push(attr);
    }
}

struct Config {
    level: Level,
    add_source: bool,
    add_caller: bool,
    time_format: String,
    replace_attr: Option<ReplaceAttr>,
}

struct Context<W> {
    printer: Arc<Printer<W>>,
    config: Arc<Config>,
    groups: Vec<String>,
    /// Attributes pre-rendered by `with_attrs`, replayed on every record.
    prefix: Vec<u8>,
}

/// Renders records to a shared printer.
pub struct Handler<W> {
    context: Arc<Context<W>>,
}

impl<W> Clone for Handler<W> {
    fn clone(&self) -> Self {
        Self {
            context: Arc::clone(&self.context),
        }
    }
}

impl<W> fmt::Debug for Handler<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("level", &self.context.config.level)
            .field("groups", &self.context.groups)
            .field("prefix_len", &self.context.prefix.len())
            .finish()
    }
}

impl<W: Write> Handler<W> {
    /// Create a root handler with its own printer over `sink`.
    pub fn new(sink: W, options: HandlerOptions) -> Self {
        let printer = Printer::new(
            sink,
            PrinterOptions {
                no_color: options.no_color,
                indent_width: options.indent_width,
                palette: Palette::shared(),
            },
        );
        Self::with_printer(Arc::new(printer), options)
    }

    /// Create a root handler on an existing printer.
    ///
    /// Color and indentation come from the printer; the corresponding
    /// fields of `options` are ignored.
    pub fn with_printer(printer: Arc<Printer<W>>, options: HandlerOptions) -> Self {
        let config = Config {
            level: options.level,
            add_source: options.add_source,
            add_caller: options.add_source && options.add_caller,
            time_format: options.time_format,
            replace_attr: options.replace_attr,
        };
        Self {
            context: Arc::new(Context {
                printer,
                config: Arc::new(config),
                groups: Vec::new(),
                prefix: Vec::new(),
            }),
        }
    }

    /// Derive a handler whose records carry `attrs`.
    ///
    /// The attributes are rendered once, now, and replayed before every
    /// record's own attributes. An empty list returns this same handler.
    pub fn with_attrs(&self, attrs: impl IntoIterator<Item = Attr>) -> Self {
        let attrs: Vec<Attr> = attrs.into_iter().collect();
        if attrs.is_empty() {
            return self.clone();
        }

        let ctx = &*self.context;
        let mut prefix = ctx.prefix.clone();
        let mut canvas = ctx.printer.detached(&mut prefix);
        let mut groups = ctx.groups.clone();
        for attr in attrs {
            ctx.print_attr(&mut canvas, attr, 1, &mut groups);
        }

        self.derive(ctx.groups.clone(), prefix)
    }

    /// Derive a handler nested one group deeper. An empty name returns this
    /// same handler.
    pub fn with_group(&self, name: &str) -> Self {
        if name.is_empty() {
            return self.clone();
        }

        let ctx = &*self.context;
        let mut groups = ctx.groups.clone();
        groups.push(name.to_string());
        self.derive(groups, ctx.prefix.clone())
    }

    fn derive(&self, groups: Vec<String>, prefix: Vec<u8>) -> Self {
        Self {
            context: Arc::new(Context {
                printer: Arc::clone(&self.context.printer),
                config: Arc::clone(&self.context.config),
                groups,
                prefix,
            }),
        }
    }

    /// Render one record and flush it to the sink.
    ///
    /// Records below the minimum level are skipped and report zero bytes.
    /// Otherwise returns the number of bytes flushed.
    pub fn handle(&self, record: &Record) -> Result<usize> {
        if !self.enabled(record.level) {
            return Ok(0);
        }

        let ctx = &*self.context;
        let mut frame = ctx.printer.lock();
        let mut canvas = frame.canvas();

        ctx.print_time(&mut canvas, record.time);
        ctx.print_level(&mut canvas, record.level);
        if !ctx.groups.is_empty() {
            canvas.print_group(&ctx.groups);
        }
        ctx.print_message(&mut canvas, &record.message);
        if ctx.config.add_source {
            if let Some(source) = &record.source {
                ctx.print_source(&mut canvas, source);
            }
        }

        canvas.push_bytes(&ctx.prefix);

        let mut groups = ctx.groups.clone();
        for attr in &record.attrs {
            ctx.print_attr(&mut canvas, attr.clone(), 1, &mut groups);
        }

        Ok(frame.flush()?)
    }
}

impl<W> Handler<W> {
    /// Whether a record at `level` would be rendered.
    pub fn enabled(&self, level: Level) -> bool {
        level >= self.context.config.level
    }

    pub fn groups(&self) -> &[String] {
        &self.context.groups
    }

    pub fn printer(&self) -> &Arc<Printer<W>> {
        &self.context.printer
    }

    /// True when both handles share one context.
    pub fn same_context(&self, other: &Handler<W>) -> bool {
        Arc::ptr_eq(&self.context, &other.context)
    }
}

impl<W> Context<W> {
    fn rewrite(&self, groups: &[String], attr: Attr) -> Option<Attr> {
        let attr = match &self.config.replace_attr {
            Some(replace) => replace(groups, attr),
            None => attr,
        };
        if attr.is_empty() {
            None
        } else {
            Some(attr)
        }
    }

    fn print_time(&self, canvas: &mut Canvas<'_>, time: Option<DateTime<Utc>>) {
        let Some(time) = time else { return };
        let format = &self.config.time_format;

        if self.config.replace_attr.is_none() {
            canvas.print_time(TimeValue::Instant(time), format);
            return;
        }

        let text = time.to_rfc3339_opts(SecondsFormat::AutoSi, true);
        let attr = Attr::string(crate::defaults::TIME_KEY, text);
        match self.rewrite(&self.groups, attr).map(|a| a.value) {
            Some(AttrValue::String(text)) => canvas.print_time(TimeValue::Text(&text), format),
            Some(AttrValue::Int(secs)) => canvas.print_time(TimeValue::Unix { secs, nanos: 0 }, format),
            _ => {}
        }
    }

    fn print_level(&self, canvas: &mut Canvas<'_>, level: Level) {
        if self.config.replace_attr.is_none() {
            canvas.print_level(level);
            return;
        }

        let attr = Attr::int(crate::defaults::LEVEL_KEY, i64::from(level.0));
        match self.rewrite(&self.groups, attr).map(|a| a.value) {
            Some(AttrValue::Int(n)) => {
                if let Ok(n) = i32::try_from(n) {
                    canvas.print_level(Level(n));
                }
            }
            Some(AttrValue::String(name)) => canvas.print_level(Level::from_name(&name)),
            _ => {}
        }
    }

    /// The header line always ends here, even when the message is dropped.
    fn print_message(&self, canvas: &mut Canvas<'_>, message: &str) {
        if self.config.replace_attr.is_none() {
            canvas.push_str(message);
        } else {
            let attr = Attr::string(crate::defaults::MESSAGE_KEY, message);
            if let Some(attr) = self.rewrite(&self.groups, attr) {
                canvas.push_str(&attr.value.to_string());
            }
        }
        canvas.push_str("\n");
    }

    fn print_source(&self, canvas: &mut Canvas<'_>, source: &Source) {
        let palette = canvas.palette();

        if self.config.replace_attr.is_none() {
            let location = format!("{}{}:{}", canvas.indent(1), source.file, source.line);
            canvas.println(&palette.string, &location);
            if self.config.add_caller {
                let caller = match (&source.function, &source.module) {
                    (Some(function), _) => Some(format!("{}func {}", canvas.indent(2), function)),
                    (None, Some(module)) => Some(format!("{}module {}", canvas.indent(2), module)),
                    (None, None) => None,
                };
                if let Some(caller) = caller {
                    canvas.println(&palette.string, &caller);
                }
            }
            return;
        }

        let mut tree = json!({ "file": source.file, "line": source.line });
        if self.config.add_caller {
            if let Some(function) = &source.function {
                tree["function"] = json!(function);
            }
            if let Some(module) = &source.module {
                tree["module"] = json!(module);
            }
        }
        let attr = Attr::new(crate::defaults::SOURCE_KEY, tree);
        if let Some(attr) = self.rewrite(&self.groups, attr) {
            canvas.print_field(&attr.key, 1);
            canvas.print_value(&attr.value, 1);
        }
    }

    /// Rewrite and render one attribute. Group members are rewritten with
    /// the group path extended by the enclosing group keys.
    fn print_attr(
        &self,
        canvas: &mut Canvas<'_>,
        attr: Attr,
        indent_level: usize,
        groups: &mut Vec<String>,
    ) {
        if attr.is_empty() {
            return;
        }

        let members = match attr.value {
            AttrValue::Group(members) => members,
            value => {
                let attr = Attr { key: attr.key, value };
                let Some(attr) = self.rewrite(groups, attr) else { return };
                match attr.value {
                    AttrValue::Group(members) => {
                        self.print_group_attr(canvas, &attr.key, members, indent_level, groups)
                    }
                    value => {
                        canvas.print_field(&attr.key, indent_level);
                        canvas.print_value(&value, indent_level);
                    }
                }
                return;
            }
        };
        self.print_group_attr(canvas, &attr.key, members, indent_level, groups);
    }

    /// A group is rendered only when at least one member produces output,
    /// so members are drawn on a scratch canvas first.
    fn print_group_attr(
        &self,
        canvas: &mut Canvas<'_>,
        key: &str,
        members: Vec<Attr>,
        indent_level: usize,
        groups: &mut Vec<String>,
    ) {
        let mut body = Vec::new();
        let mut scratch = canvas.scratch(&mut body);
        groups.push(key.to_string());
        for member in members {
            self.print_attr(&mut scratch, member, indent_level + 1, groups);
        }
        groups.pop();

        if body.is_empty() {
            return;
        }
        canvas.print_field(key, indent_level);
        canvas.push_str("\n");
        canvas.push_bytes(&body);
    }
}
