//! # Liitu - Main Entry Point
//!
//! A command-line prettifier for newline-delimited JSON logs. Each input
//! line is decoded as one event and rendered with the same colorized,
//! indented layout the library's handlers produce.
//!
//! ## Architecture Overview
//!
//! The main function performs these key operations:
//! 1. **Parse arguments**: Processes command-line configuration
//! 2. **Initialize logging**: Routes the tool's own diagnostics to stderr
//!    through a `TintLayer`, filtered by `RUST_LOG`
//! 3. **Render input**: Streams stdin or the given files line by line
//!    through one `EventWriter` on stdout
//!
//! ## Error Handling
//!
//! The application uses `anyhow::Result` for error handling. Lines that are
//! not JSON objects are copied to stdout unchanged, unless `--strict` is
//! given, in which case the first such line aborts the run. A closed stdout
//! (e.g. piping into `head`) ends the run quietly.

use anyhow::{Context, Result};
use clap::Parser;
use liitu::{cli::Args, Error, EventWriter, HandlerOptions, Level, TintLayer};
use std::env;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Stdout, Write};
use tracing::{debug, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = Args::parse();
    let no_color_env = env::var_os("NO_COLOR").is_some_and(|value| !value.is_empty());

    // Diagnostics go to stderr so they never mix with rendered events.
    // Example: RUST_LOG=debug liitu app.log
    let layer = TintLayer::new(
        io::stderr(),
        HandlerOptions {
            level: Level::TRACE,
            no_color: args.no_color || no_color_env,
            ..Default::default()
        },
    );
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(layer)
        .init();

    debug!(?args, "parsed arguments");

    let writer = EventWriter::with_options(io::stdout(), args.event_options(no_color_env));

    match run(&args, &writer) {
        Err(err) if is_broken_pipe(&err) => {
            debug!("stdout closed, stopping");
            Ok(())
        }
        other => other,
    }
}

/// Render every input source in order
fn run(args: &Args, writer: &EventWriter<Stdout>) -> Result<()> {
    if args.files.is_empty() {
        return prettify(io::stdin().lock(), writer, args.strict).context("failed to render stdin");
    }

    for path in &args.files {
        info!(path = %path.display(), "rendering file");
        let file =
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        prettify(BufReader::new(file), writer, args.strict)
            .with_context(|| format!("failed to render {}", path.display()))?;
    }
    Ok(())
}

/// Render one newline-delimited stream
///
/// Lines that fail to decode are written through verbatim, or returned as
/// an error with their line number when `strict` is set.
fn prettify<R: BufRead>(mut input: R, writer: &EventWriter<Stdout>, strict: bool) -> Result<()> {
    let mut line = Vec::new();
    let mut number = 0usize;

    loop {
        line.clear();
        if input.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        number += 1;

        let event = trim_line_ending(&line);
        match writer.render(event) {
            Ok(_) => {}
            Err(err @ (Error::Decode(_) | Error::NotAnObject)) => {
                if strict {
                    return Err(err).with_context(|| format!("line {}", number));
                }
                debug!(line = number, error = %err, "passing line through");

                let mut stdout = io::stdout().lock();
                stdout.write_all(event)?;
                stdout.write_all(b"\n")?;
                stdout.flush()?;
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn is_broken_pipe(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<io::Error>()
            .is_some_and(|err| err.kind() == io::ErrorKind::BrokenPipe)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_line_ending() {
        assert_eq!(trim_line_ending(b"{}\n"), b"{}");
        assert_eq!(trim_line_ending(b"{}\r\n"), b"{}");
        assert_eq!(trim_line_ending(b"{}"), b"{}");
        assert_eq!(trim_line_ending(b"\n"), b"");
    }

    #[test]
    fn test_broken_pipe_is_detected_through_context() {
        let err = anyhow::Error::new(Error::Io(io::Error::new(
            io::ErrorKind::BrokenPipe,
            "closed",
        )))
        .context("failed to render stdin");
        assert!(is_broken_pipe(&err));

        let err = anyhow::Error::new(Error::NotAnObject).context("line 3");
        assert!(!is_broken_pipe(&err));
    }
}
