use crate::error::{Error, Result};
use crate::level::Level;
use crate::palette::Palette;
use crate::printer::{Printer, PrinterOptions, TimeValue};
use crate::utils::{decode_first_wins, quote};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use serde_json::Value;
use std::io::{self, Write};
use std::sync::Arc;

/// Names of the fields pulled out of every event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldNames {
    pub level: String,
    pub time: String,
    pub message: String,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            level: crate::defaults::EVENT_LEVEL_FIELD.to_string(),
            time: crate::defaults::EVENT_TIME_FIELD.to_string(),
            message: crate::defaults::EVENT_MESSAGE_FIELD.to_string(),
        }
    }
}

impl FieldNames {
    fn is_well_known(&self, key: &str) -> bool {
        key == self.level || key == self.time || key == self.message
    }
}

/// Configuration for an [`EventWriter`].
#[derive(Clone, Debug)]
pub struct EventOptions {
    /// Only used when the writer builds its own printer.
    pub no_color: bool,
    /// Only used when the writer builds its own printer.
    pub indent_width: usize,
    pub time_format: String,
    /// Minimum level to render. `None` renders every event.
    pub level: Option<Level>,
    pub fields: FieldNames,
}

impl Default for EventOptions {
    fn default() -> Self {
        Self {
            no_color: false,
            indent_width: crate::defaults::INDENT_WIDTH,
            time_format: crate::defaults::TIME_FORMAT.to_string(),
            level: None,
            fields: FieldNames::default(),
        }
    }
}

/// Renders pre-serialized event lines.
///
/// Each call takes one encoded event, decodes it into an ordered key-value
/// tree (the first occurrence of a duplicated key wins) and renders it:
/// time, level and message on the header line, then every other field at
/// indent level 1 in the order it appeared.
///
/// The printer is built from the sink on first use unless one was supplied
/// with [`EventWriter::with_printer`]. Sharing a handler's printer lets both
/// front ends write to one sink under one lock.
pub struct EventWriter<W> {
    options: EventOptions,
    sink: Mutex<Option<W>>,
    printer: OnceCell<Arc<Printer<W>>>,
}

impl<W: Write> EventWriter<W> {
    pub fn new(sink: W) -> Self {
        Self::with_options(sink, EventOptions::default())
    }

    pub fn with_options(sink: W, options: EventOptions) -> Self {
        Self {
            options,
            sink: Mutex::new(Some(sink)),
            printer: OnceCell::new(),
        }
    }

    pub fn with_printer(printer: Arc<Printer<W>>, options: EventOptions) -> Self {
        Self {
            options,
            sink: Mutex::new(None),
            printer: OnceCell::with_value(printer),
        }
    }

    /// The printer, if it has been built yet.
    pub fn printer(&self) -> Option<&Arc<Printer<W>>> {
        self.printer.get()
    }

    fn ensure_printer(&self) -> Result<&Arc<Printer<W>>> {
        self.printer.get_or_try_init(|| {
            let sink = self.sink.lock().take().ok_or(Error::SinkUnavailable)?;
            let options = PrinterOptions {
                no_color: self.options.no_color,
                indent_width: self.options.indent_width,
                palette: Palette::shared(),
            };
            Ok(Arc::new(Printer::new(sink, options)))
        })
    }

    /// Decode and render one event.
    ///
    /// Returns the number of bytes flushed to the sink, zero when the event
    /// is below the minimum level. A decode failure returns the error
    /// before anything is written.
    pub fn render(&self, bytes: &[u8]) -> Result<usize> {
        let printer = self.ensure_printer()?;
        let mut frame = printer.lock();

        let fields = match decode_first_wins(bytes)? {
            Value::Object(fields) => fields,
            _ => return Err(Error::NotAnObject),
        };
        let names = &self.options.fields;

        let level = event_level(fields.get(&names.level));
        if matches!(self.options.level, Some(min) if level < min) {
            return Ok(0);
        }

        let mut canvas = frame.canvas();
        let palette = canvas.palette();

        canvas.print_time(
            TimeValue::from_tree(fields.get(&names.time)),
            &self.options.time_format,
        );
        canvas.print_level(level);
        match fields.get(&names.message) {
            Some(Value::String(message)) => canvas.push_str(message),
            Some(other) => canvas.push_str(&other.to_string()),
            None => {}
        }
        canvas.push_str("\n");

        for (key, value) in fields.iter().filter(|(k, _)| !names.is_well_known(k)) {
            canvas.print_field(key, 1);
            match value {
                Value::String(s) => canvas.println(&palette.string, &quote(s)),
                Value::Number(n) => canvas.println(&palette.number, &n.to_string()),
                other => canvas.print_tree(other, 1),
            }
        }

        Ok(frame.flush()?)
    }
}

/// Strings go through the level names, integers are taken as raw levels.
/// A missing level is info; anything else is unknown.
fn event_level(value: Option<&Value>) -> Level {
    match value {
        None => Level::INFO,
        Some(Value::String(name)) => Level::from_name(name),
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .map_or(Level::UNKNOWN, Level),
        Some(_) => Level::UNKNOWN,
    }
}

/// One event per call. Reports the whole input as consumed on success.
impl<W: Write> Write for &EventWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.render(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<W: Write> Write for EventWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (&*self).write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{Handler, HandlerOptions, Record};
    use crate::printer::format_time;
    use crate::testing::{Capture, Flaky};
    use chrono::{DateTime, Local};

    fn plain() -> EventOptions {
        EventOptions {
            no_color: true,
            ..Default::default()
        }
    }

    fn local(rfc3339: &str) -> String {
        let instant = DateTime::parse_from_rfc3339(rfc3339).unwrap();
        format_time(&instant.with_timezone(&Local), crate::defaults::TIME_FORMAT)
    }

    #[test]
    fn test_well_known_fields_are_consumed() {
        let sink = Capture::default();
        let writer = EventWriter::with_options(sink.clone(), plain());
        let line = br#"{"level":"warn","time":"2023-01-01T00:00:00Z","message":"boom","user":"bob"}"#;
        writer.render(line).unwrap();

        let text = sink.text();
        assert_eq!(
            text,
            format!("{} [WRN] boom\n  user: \"bob\"\n", local("2023-01-01T00:00:00Z"))
        );
        assert!(!text.contains("level:"));
        assert!(!text.contains("time:"));
        assert!(!text.contains("message:"));
    }

    #[test]
    fn test_colored_output() {
        let sink = Capture::default();
        let writer = EventWriter::new(sink.clone());
        writer
            .render(br#"{"level":"error","message":"x","n":1,"s":"v"}"#)
            .unwrap();
        let text = sink.text();
        assert!(text.contains("\x1b[31;1m [ERR] \x1b[0m"));
        assert!(text.contains("\x1b[36m  n\x1b[0m: \x1b[35m1\n\x1b[0m"));
        assert!(text.contains("\x1b[32m\"v\"\n\x1b[0m"));
    }

    /// Invalid input is reported and nothing reaches the sink
    #[test]
    fn test_decode_failure_writes_nothing() {
        let sink = Capture::default();
        let writer = EventWriter::with_options(sink.clone(), plain());
        let err = writer.render(br#"{"level":"info","mess"#).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
        assert!(sink.segments().is_empty());

        let err = writer.render(b"[1,2,3]").unwrap_err();
        assert!(matches!(err, Error::NotAnObject));
        assert!(sink.segments().is_empty());
    }

    #[test]
    fn test_level_field_variants() {
        assert_eq!(event_level(None), Level::INFO);
        assert_eq!(event_level(Some(&Value::from("panic"))), Level::PANIC);
        assert_eq!(event_level(Some(&Value::from("verbose"))), Level::UNKNOWN);
        assert_eq!(event_level(Some(&Value::from(5))), Level(5));
        assert_eq!(event_level(Some(&Value::Bool(true))), Level::UNKNOWN);

        let sink = Capture::default();
        let writer = EventWriter::with_options(sink.clone(), plain());
        writer.render(br#"{"level":"verbose","time":0}"#).unwrap();
        assert!(sink.text().ends_with(" [???+16] \n"));
    }

    /// Fields keep their input order and duplicates keep the first value
    #[test]
    fn test_field_order_and_duplicates() {
        let sink = Capture::default();
        let writer = EventWriter::with_options(sink.clone(), plain());
        writer
            .render(br#"{"time":1,"zeta":"z","alpha":"a","zeta":"ignored","message":"m"}"#)
            .unwrap();
        let text = sink.text();
        let body: Vec<&str> = text.lines().skip(1).collect();
        assert_eq!(body, ["  zeta: \"z\"", "  alpha: \"a\""]);
    }

    #[test]
    fn test_nested_values_render_as_tree() {
        let sink = Capture::default();
        let writer = EventWriter::with_options(sink.clone(), plain());
        writer
            .render(br#"{"message":"m","ok":true,"none":null,"obj":{"some":"json","n":[1,2.5]}}"#)
            .unwrap();
        let text = sink.text();
        let body = text.split_once('\n').unwrap().1;
        let expected = concat!(
            "  ok: true\n",
            "  none: null\n",
            "  obj: {\n",
            "    \"some\": \"json\",\n",
            "    \"n\": [\n",
            "      1,\n",
            "      2.5\n",
            "    ]\n",
            "  }\n",
        );
        assert_eq!(body, expected);
    }

    /// Numbers are printed exactly as they appear on the line
    #[test]
    fn test_numbers_render_as_written() {
        let sink = Capture::default();
        let writer = EventWriter::with_options(sink.clone(), plain());
        writer
            .render(br#"{"message":"m","a":1e3,"b":1.10,"c":123456789012345678901234567890,"d":[1E-2]}"#)
            .unwrap();
        let text = sink.text();
        let body: Vec<&str> = text.lines().skip(1).collect();
        assert_eq!(
            body,
            [
                "  a: 1e3",
                "  b: 1.10",
                "  c: 123456789012345678901234567890",
                "  d: [",
                "    1E-2",
                "  ]",
            ]
        );
    }

    #[test]
    fn test_missing_message_still_ends_header() {
        let sink = Capture::default();
        let writer = EventWriter::with_options(sink.clone(), plain());
        writer.render(br#"{"time":"2023-01-01T00:00:00Z","k":2}"#).unwrap();
        assert_eq!(
            sink.text(),
            format!("{} [INF] \n  k: 2\n", local("2023-01-01T00:00:00Z"))
        );
    }

    #[test]
    fn test_epoch_time() {
        let sink = Capture::default();
        let writer = EventWriter::with_options(sink.clone(), plain());
        writer.render(br#"{"time":1672531200,"message":"epoch"}"#).unwrap();
        assert!(sink.text().starts_with(&local("2023-01-01T00:00:00Z")));
    }

    #[test]
    fn test_minimum_level_gate() {
        let sink = Capture::default();
        let writer = EventWriter::with_options(
            sink.clone(),
            EventOptions {
                level: Some(Level::WARN),
                ..plain()
            },
        );
        assert_eq!(writer.render(br#"{"level":"info","message":"skip"}"#).unwrap(), 0);
        assert!(writer.render(br#"{"level":"error","message":"keep"}"#).unwrap() > 0);
        assert_eq!(sink.segments().len(), 1);
    }

    #[test]
    fn test_custom_field_names() {
        let sink = Capture::default();
        let writer = EventWriter::with_options(
            sink.clone(),
            EventOptions {
                fields: FieldNames {
                    level: "severity".to_string(),
                    time: "ts".to_string(),
                    message: "msg".to_string(),
                },
                ..plain()
            },
        );
        writer
            .render(br#"{"severity":"debug","ts":"2023-01-01T00:00:00Z","msg":"hi","level":"x"}"#)
            .unwrap();
        assert_eq!(
            sink.text(),
            format!("{} [DBG] hi\n  level: \"x\"\n", local("2023-01-01T00:00:00Z"))
        );
    }

    /// The printer is created on first use
    #[test]
    fn test_lazy_printer() {
        let writer = EventWriter::with_options(Capture::default(), plain());
        assert!(writer.printer().is_none());
        writer.render(br#"{"message":"first"}"#).unwrap();
        assert!(writer.printer().is_some());
    }

    #[test]
    fn test_io_write_contract() {
        let sink = Capture::default();
        let mut writer = EventWriter::with_options(sink.clone(), plain());
        let line = b"{\"message\":\"via write\"}\n";
        assert_eq!(writer.write(line).unwrap(), line.len());
        writer.write_all(line).unwrap();
        assert_eq!(sink.segments().len(), 2);

        let err = writer.write(b"not json").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_sink_failure_is_reported() {
        let sink = Flaky::failing_first(1);
        let writer = EventWriter::with_options(sink.clone(), plain());
        let err = writer.render(br#"{"message":"lost"}"#).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        writer.render(br#"{"message":"kept","time":0}"#).unwrap();
        assert!(sink.text().ends_with(" [INF] kept\n"));
        assert!(!sink.text().contains("lost"));
    }

    /// Both front ends can write through one printer
    #[test]
    fn test_shared_printer_with_handler() {
        let sink = Capture::default();
        let handler = Handler::new(
            sink.clone(),
            HandlerOptions {
                no_color: true,
                ..Default::default()
            },
        );
        let writer = EventWriter::with_printer(Arc::clone(handler.printer()), EventOptions::default());

        let mut record = Record::new(Level::INFO, "typed");
        record.time = None;
        handler.handle(&record).unwrap();
        writer.render(br#"{"message":"serialized","time":0}"#).unwrap();

        let segments = sink.segments();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0], " [INF] typed\n");
        assert!(segments[1].ends_with(" [INF] serialized\n"));
    }
}
