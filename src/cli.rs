use crate::event::{EventOptions, FieldNames};
use crate::level::Level;
use clap::Parser;
use std::path::PathBuf;

/// Liitu - Pretty-print newline-delimited JSON logs with colors and indentation
#[derive(Parser, Debug)]
#[clap(version, about, long_about = None)]
pub struct Args {
    /// Input files to read; standard input when none are given
    #[clap(help_heading = "Input")]
    pub files: Vec<PathBuf>,

    /// Fail on the first line that is not a JSON object instead of passing it through
    #[clap(long, default_value_t = false, help_heading = "Input")]
    pub strict: bool,

    /// Minimum level to show (trace, debug, info, warn, error, fatal, panic or an integer)
    #[clap(short = 'l', long, value_parser = parse_level, allow_hyphen_values = true, help_heading = "Output")]
    pub level: Option<Level>,

    /// Timestamp layout in strftime syntax
    #[clap(short = 't', long, default_value = crate::defaults::TIME_FORMAT, help_heading = "Output")]
    pub time_format: String,

    /// Spaces per indent level
    #[clap(long, default_value_t = crate::defaults::INDENT_WIDTH, help_heading = "Output")]
    pub indent: usize,

    /// Disable colored output (also disabled when NO_COLOR is set)
    #[clap(long, default_value_t = false, help_heading = "Output")]
    pub no_color: bool,

    /// Field holding the event level
    #[clap(long, default_value = crate::defaults::EVENT_LEVEL_FIELD, help_heading = "Fields")]
    pub level_key: String,

    /// Field holding the event time
    #[clap(long, default_value = crate::defaults::EVENT_TIME_FIELD, help_heading = "Fields")]
    pub time_key: String,

    /// Field holding the event message
    #[clap(long, default_value = crate::defaults::EVENT_MESSAGE_FIELD, help_heading = "Fields")]
    pub message_key: String,
}

impl Args {
    /// Build the writer options, with `no_color_env` reporting whether
    /// `NO_COLOR` is set in the environment.
    pub fn event_options(&self, no_color_env: bool) -> EventOptions {
        EventOptions {
            no_color: self.no_color || no_color_env,
            indent_width: self.indent,
            time_format: self.time_format.clone(),
            level: self.level,
            fields: FieldNames {
                level: self.level_key.clone(),
                time: self.time_key.clone(),
                message: self.message_key.clone(),
            },
        }
    }
}

/// Parse a level given by name or as a raw integer (e.g. "warn", "-4")
fn parse_level(s: &str) -> Result<Level, String> {
    let s = s.trim();

    if s.is_empty() {
        return Err("Level cannot be empty".to_string());
    }

    if let Some(level) = Level::parse_name(&s.to_ascii_lowercase()) {
        return Ok(level);
    }

    s.parse::<i32>()
        .map(Level)
        .map_err(|_| format!("Invalid level: {}", s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("warn").unwrap(), Level::WARN);
        assert_eq!(parse_level("ERROR").unwrap(), Level::ERROR);
        assert_eq!(parse_level(" debug ").unwrap(), Level::DEBUG);
        assert_eq!(parse_level("-4").unwrap(), Level::DEBUG);
        assert_eq!(parse_level("6").unwrap(), Level(6));

        assert!(parse_level("").is_err());
        assert!(parse_level("verbose").is_err());
    }

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["liitu"]);
        assert!(args.files.is_empty());
        assert!(!args.strict);
        assert_eq!(args.level, None);
        assert_eq!(args.indent, crate::defaults::INDENT_WIDTH);

        let options = args.event_options(false);
        assert!(!options.no_color);
        assert_eq!(options.time_format, crate::defaults::TIME_FORMAT);
        assert_eq!(options.fields, FieldNames::default());
    }

    #[test]
    fn test_flags_map_to_event_options() {
        let args = Args::parse_from([
            "liitu",
            "-l",
            "warn",
            "-t",
            "%H:%M",
            "--indent",
            "4",
            "--level-key",
            "severity",
            "--time-key",
            "ts",
            "--message-key",
            "msg",
            "--strict",
            "app.log",
        ]);
        assert!(args.strict);
        assert_eq!(args.files, vec![PathBuf::from("app.log")]);

        let options = args.event_options(false);
        assert_eq!(options.level, Some(Level::WARN));
        assert_eq!(options.time_format, "%H:%M");
        assert_eq!(options.indent_width, 4);
        assert_eq!(options.fields.level, "severity");
        assert_eq!(options.fields.time, "ts");
        assert_eq!(options.fields.message, "msg");
    }

    /// NO_COLOR in the environment wins over the default
    #[test]
    fn test_no_color_env() {
        let args = Args::parse_from(["liitu"]);
        assert!(args.event_options(true).no_color);

        let args = Args::parse_from(["liitu", "--no-color"]);
        assert!(args.event_options(false).no_color);
    }
}
