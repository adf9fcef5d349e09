//! Log records and their line formats

use chrono::{DateTime, Local};

use super::level::Level;

/// Line layout used by a sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFormat {
    /// `<timestamp> - <LEVEL> - <channel> - <message>`
    Standard,
    /// `<timestamp>.<ms> - <LEVEL> - <channel> [<thread>] - <message>`
    Detailed,
}

/// A single immutable log record
#[derive(Debug, Clone)]
pub struct LogRecord {
    /// Local wall-clock time the record was created
    pub timestamp: DateTime<Local>,
    /// Name of the originating channel
    pub channel: String,
    pub level: Level,
    /// Name of the emitting thread
    pub thread: String,
    pub message: String,
}

impl LogRecord {
    /// Create a record stamped with the current time and thread
    pub fn new(channel: impl Into<String>, level: Level, message: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            channel: channel.into(),
            level,
            thread: current_thread_name(),
            message: message.into(),
        }
    }

    /// Render this record as one line (no trailing newline)
    pub fn format(&self, format: RecordFormat) -> String {
        match format {
            RecordFormat::Standard => format!(
                "{} - {} - {} - {}",
                self.timestamp.format("%Y-%m-%d %H:%M:%S,%3f"),
                self.level,
                self.channel,
                self.message
            ),
            RecordFormat::Detailed => format!(
                "{} - {} - {} [{}] - {}",
                self.timestamp.format("%Y-%m-%d %H:%M:%S.%3f"),
                self.level,
                self.channel,
                self.thread,
                self.message
            ),
        }
    }
}

/// Name of the calling thread, falling back to its id for unnamed threads
fn current_thread_name() -> String {
    let thread = std::thread::current();
    match thread.name() {
        Some(name) => name.to_string(),
        None => format!("{:?}", thread.id()),
    }
}
