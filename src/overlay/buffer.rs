//! In-memory ring of recent overlay records
//!
//! Written by any producer thread, read by the render thread. Insertion with
//! eviction happens under one write lock and readers copy out under one read
//! lock, so a render pass never sees a half-applied update.

use std::collections::VecDeque;
use std::sync::{PoisonError, RwLock};

use chrono::Local;

/// A single overlay line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayEntry {
    /// Local time of insertion, `HH:MM:SS`
    pub timestamp: String,
    /// Display category, selects the color
    pub category: String,
    pub message: String,
}

impl OverlayEntry {
    /// Create an entry stamped with the current local time
    pub fn new(category: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now().format("%H:%M:%S").to_string(),
            category: category.into(),
            message: message.into(),
        }
    }
}

/// Thread-safe fixed-capacity FIFO of overlay entries
#[derive(Debug)]
pub struct OverlayBuffer {
    entries: RwLock<VecDeque<OverlayEntry>>,
    /// Maximum entries to keep; the oldest is evicted beyond this
    capacity: usize,
}

impl OverlayBuffer {
    /// Create a buffer holding at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append an entry, evicting the oldest when full
    pub fn push(&self, entry: OverlayEntry) {
        if self.capacity == 0 {
            return;
        }
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Get all entries, oldest first
    pub fn all_entries(&self) -> Vec<OverlayEntry> {
        self.entries
            .read()
            .map(|e| e.iter().cloned().collect())
            .unwrap_or_else(|e| e.into_inner().iter().cloned().collect())
    }

    /// Get the `count` most recent entries, oldest first
    pub fn tail(&self, count: usize) -> Vec<OverlayEntry> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let start = entries.len().saturating_sub(count);
        entries.iter().skip(start).cloned().collect()
    }

    /// Empty the buffer and insert `entry` as the only element, atomically
    pub fn reset_with(&self, entry: OverlayEntry) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.clear();
        if self.capacity > 0 {
            entries.push_back(entry);
        }
    }

    /// Get the number of entries in the buffer
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .map(|e| e.len())
            .unwrap_or_else(|e| e.into_inner().len())
    }

    /// Check if the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
