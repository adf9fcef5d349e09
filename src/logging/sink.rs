//! Output sinks
//!
//! A sink accepts formatted records for one channel. Sinks serialize their own
//! writes so lines never interleave, and they never return errors: failures are
//! reported on stderr and the emission carries on.

use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

use crate::config::friendly_io_error_message;

use super::record::{LogRecord, RecordFormat};

/// A concrete output target for log records
pub trait Sink: Send + Sync {
    /// Write one record. Must not panic or propagate I/O failures.
    fn write(&self, record: &LogRecord);

    /// Push any buffered bytes to their destination
    fn flush(&self);
}

/// Report a sink failure without going back through the logging system
///
/// Writes straight to stderr: routing this through a channel could re-enter
/// the sink that just failed.
pub(crate) fn report_sink_error(context: &str, error: &io::Error) {
    eprintln!("drivelog: {}", friendly_io_error_message(error, context));
}

/// Sink writing one line per record to standard output (or any writer)
pub struct ConsoleSink {
    writer: Mutex<Box<dyn Write + Send>>,
    format: RecordFormat,
}

impl ConsoleSink {
    /// Console sink on stdout using the standard format
    pub fn stdout() -> Self {
        Self::with_writer(Box::new(io::stdout()))
    }

    /// Console sink on an arbitrary writer
    pub fn with_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(writer),
            format: RecordFormat::Standard,
        }
    }

    /// Use a different line format
    pub fn with_format(mut self, format: RecordFormat) -> Self {
        self.format = format;
        self
    }
}

impl Sink for ConsoleSink {
    fn write(&self, record: &LogRecord) {
        let line = record.format(self.format);
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writeln!(writer, "{}", line) {
            report_sink_error("Failed to write console record", &e);
        }
    }

    fn flush(&self) {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writer.flush() {
            report_sink_error("Failed to flush console", &e);
        }
    }
}
