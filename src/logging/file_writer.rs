//! Size-rotated file sink
//!
//! Appends detailed records to `<name>.log`. When the next record would push
//! the active file past `max_bytes`, generations shift (`.log.1` becomes
//! `.log.2`, ...), the active file becomes `.log.1`, and writing continues in
//! a fresh file. Generations past `backup_count` are deleted, so a family never
//! holds more than `max_bytes * (backup_count + 1)` bytes.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use super::record::{LogRecord, RecordFormat};
use super::retention::{backup_path, prune_generations};
use super::sink::{report_sink_error, Sink};

/// Bytes in one megabyte as used by the `max_file_size_mb` setting
pub const BYTES_PER_MB: u64 = 1024 * 1024;

/// Open handle plus the number of bytes already in the active file
#[derive(Default)]
struct ActiveFile {
    writer: Option<BufWriter<File>>,
    len: u64,
}

/// File sink with size-based rotation and bounded backups
pub struct RotatingFileSink {
    path: PathBuf,
    max_bytes: u64,
    backup_count: usize,
    format: RecordFormat,
    active: Mutex<ActiveFile>,
}

impl RotatingFileSink {
    /// Create a sink for `path`
    ///
    /// Opening failures are reported and retried on the next write, so the
    /// sink is always constructed.
    pub fn new(path: impl Into<PathBuf>, max_bytes: u64, backup_count: usize) -> Self {
        let sink = Self {
            path: path.into(),
            max_bytes,
            backup_count,
            format: RecordFormat::Detailed,
            active: Mutex::new(ActiveFile::default()),
        };

        if let Err(e) = prune_generations(&sink.path, backup_count) {
            report_sink_error("Failed to prune old log generations", &e);
        }

        {
            let mut active = sink.lock_active();
            if let Err(e) = sink.ensure_open(&mut active) {
                report_sink_error(&format!("Failed to open {}", sink.path.display()), &e);
            }
        }

        sink
    }

    /// Use a different line format (detailed by default)
    pub fn with_format(mut self, format: RecordFormat) -> Self {
        self.format = format;
        self
    }

    /// Path of the active file
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    pub fn backup_count(&self) -> usize {
        self.backup_count
    }

    fn lock_active(&self) -> std::sync::MutexGuard<'_, ActiveFile> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open the active file in append mode if it is not open yet
    fn ensure_open<'a>(&self, active: &'a mut ActiveFile) -> io::Result<&'a mut BufWriter<File>> {
        if active.writer.is_none() {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)?;
            active.len = file.metadata()?.len();
            active.writer = Some(BufWriter::new(file));
        }
        match active.writer.as_mut() {
            Some(writer) => Ok(writer),
            None => Err(io::Error::new(io::ErrorKind::Other, "log file not open")),
        }
    }

    /// Whether appending `incoming` bytes requires a rollover first
    fn should_rollover(&self, current: u64, incoming: usize) -> bool {
        self.max_bytes > 0 && current > 0 && current + incoming as u64 > self.max_bytes
    }

    /// Shift generations and start a fresh active file
    fn rollover(&self, active: &mut ActiveFile) -> io::Result<()> {
        if let Some(mut writer) = active.writer.take() {
            writer.flush()?;
        }

        if self.backup_count > 0 {
            for generation in (1..self.backup_count).rev() {
                let src = backup_path(&self.path, generation);
                if src.exists() {
                    let dst = backup_path(&self.path, generation + 1);
                    if dst.exists() {
                        fs::remove_file(&dst)?;
                    }
                    fs::rename(&src, &dst)?;
                }
            }

            let first = backup_path(&self.path, 1);
            if first.exists() {
                fs::remove_file(&first)?;
            }
            if self.path.exists() {
                fs::rename(&self.path, &first)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)?;
        active.writer = Some(BufWriter::new(file));
        active.len = 0;

        prune_generations(&self.path, self.backup_count)?;
        Ok(())
    }

    fn write_line(&self, active: &mut ActiveFile, line: &[u8]) -> io::Result<()> {
        self.ensure_open(active)?;
        if self.should_rollover(active.len, line.len()) {
            self.rollover(active)?;
        }

        let writer = self.ensure_open(active)?;
        writer.write_all(line)?;
        writer.flush()?;
        active.len += line.len() as u64;
        Ok(())
    }
}

impl Sink for RotatingFileSink {
    fn write(&self, record: &LogRecord) {
        let mut line = record.format(self.format);
        line.push('\n');

        let mut active = self.lock_active();
        if let Err(e) = self.write_line(&mut active, line.as_bytes()) {
            // Drop the handle so the next write reopens from a clean state
            active.writer = None;
            report_sink_error(&format!("Failed to write {}", self.path.display()), &e);
        }
    }

    fn flush(&self) {
        let mut active = self.lock_active();
        if let Some(writer) = active.writer.as_mut() {
            let result = writer.flush().and_then(|_| writer.get_ref().sync_data());
            if let Err(e) = result {
                report_sink_error(&format!("Failed to flush {}", self.path.display()), &e);
            }
        }
    }
}
