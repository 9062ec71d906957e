//! Shared helpers for the integration tests.
//!
//! Integration tests build against the public API only, so they carry their
//! own sink instead of the crate's internal test sinks.

#![allow(dead_code)]

use parking_lot::Mutex;
use std::io::{self, Write};
use std::sync::Arc;

/// Sink that keeps each write call as one text segment, so tests can check
/// that one record arrives in exactly one write.
#[derive(Clone, Default)]
pub struct Capture {
    writes: Arc<Mutex<Vec<String>>>,
}

impl Capture {
    pub fn segments(&self) -> Vec<String> {
        self.writes.lock().clone()
    }

    pub fn text(&self) -> String {
        self.writes.lock().concat()
    }
}

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let segment = String::from_utf8_lossy(buf).into_owned();
        self.writes.lock().push(segment);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
