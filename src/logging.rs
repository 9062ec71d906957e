use crate::error::Result;
use crate::handler::{Handler, HandlerOptions, Record, Source};
use crate::level::Level;
use crate::value::Attr;
use std::fmt;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::field::{Field, Visit};
use tracing::span;
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::{LookupSpan, SpanRef};

/// A `tracing` layer that renders events through a [`Handler`].
///
/// Each span derives its parent's handler with the span name as a group and
/// the span's fields as attributes; the derived handler is cached in the
/// span's extensions. Events render through the handler of their innermost
/// span, or the root handler outside of any span.
///
/// The `message` field becomes the record's message. Other fields keep their
/// type: integers, floats, booleans and strings map to the matching
/// attribute kinds and anything else is rendered with its `Debug` form.
///
/// A layer has no caller to return errors to. The first failed write is
/// reported once on stderr; later records keep being attempted.
pub struct TintLayer<W> {
    handler: Handler<W>,
    sink_failed: AtomicBool,
}

/// Handler cached in a span's extensions.
struct SpanHandler<W>(Handler<W>);

impl<W: Write> TintLayer<W> {
    pub fn new(sink: W, options: HandlerOptions) -> Self {
        Self::with_handler(Handler::new(sink, options))
    }

    pub fn with_handler(handler: Handler<W>) -> Self {
        Self {
            handler,
            sink_failed: AtomicBool::new(false),
        }
    }

    pub fn handler(&self) -> &Handler<W> {
        &self.handler
    }

    /// Whether a record has failed to reach the sink.
    pub fn sink_failed(&self) -> bool {
        self.sink_failed.load(Ordering::Relaxed)
    }

    fn report(&self, result: Result<usize>) {
        if let Err(err) = result {
            if !self.sink_failed.swap(true, Ordering::Relaxed) {
                eprintln!("liitu: log sink failed, records may be lost: {}", err);
            }
        }
    }
}

impl<S, W> Layer<S> for TintLayer<W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: Write + Send + 'static,
{
    fn on_new_span(&self, attrs: &span::Attributes<'_>, id: &span::Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else { return };

        let parent = span
            .parent()
            .and_then(|parent| cached_handler(&parent))
            .unwrap_or_else(|| self.handler.clone());

        let mut fields = FieldCollector::default();
        attrs.record(&mut fields);

        let derived = parent.with_group(span.name()).with_attrs(fields.attrs);
        span.extensions_mut().insert(SpanHandler(derived));
    }

    fn on_record(&self, id: &span::Id, values: &span::Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else { return };

        let mut fields = FieldCollector::default();
        values.record(&mut fields);

        let mut extensions = span.extensions_mut();
        if let Some(cached) = extensions.get_mut::<SpanHandler<W>>() {
            cached.0 = cached.0.with_attrs(fields.attrs);
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let level = Level::from(*metadata.level());

        let handler = ctx
            .event_span(event)
            .and_then(|span| cached_handler(&span))
            .unwrap_or_else(|| self.handler.clone());

        if !handler.enabled(level) {
            return;
        }

        let mut fields = FieldCollector::default();
        event.record(&mut fields);

        let mut record = Record::new(level, fields.message.unwrap_or_default());
        record.attrs = fields.attrs;
        record.source = match (metadata.file(), metadata.line()) {
            (Some(file), Some(line)) => Some(Source {
                file: file.to_string(),
                line,
                function: None,
                module: metadata.module_path().map(str::to_string),
            }),
            _ => None,
        };

        self.report(handler.handle(&record));
    }
}

fn cached_handler<S, W>(span: &SpanRef<'_, S>) -> Option<Handler<W>>
where
    S: for<'a> LookupSpan<'a>,
    W: 'static,
{
    let extensions = span.extensions();
    let cached = extensions.get::<SpanHandler<W>>().map(|cached| cached.0.clone());
    cached
}

/// Collects `tracing` fields into typed attributes.
#[derive(Default)]
struct FieldCollector {
    message: Option<String>,
    attrs: Vec<Attr>,
}

impl Visit for FieldCollector {
    fn record_i64(&mut self, field: &Field, value: i64) {
        self.attrs.push(Attr::int(field.name(), value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.attrs.push(Attr::uint(field.name(), value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.attrs.push(Attr::float(field.name(), value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.attrs.push(Attr::bool(field.name(), value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.attrs.push(Attr::string(field.name(), value));
        }
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.attrs.push(Attr::string(field.name(), value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{:?}", value));
        } else {
            self.attrs.push(Attr::string(field.name(), format!("{:?}", value)));
        }
    }
}
