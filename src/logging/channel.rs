//! Named log channels
//!
//! A channel owns a severity threshold, a propagation flag and its sinks.
//! Emitting on a channel never touches the registry: the threshold is an
//! atomic and the sink list has its own lock, so producer threads only contend
//! on the sinks they actually write to.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use super::level::Level;
use super::record::LogRecord;
use super::sink::Sink;

/// Shared handle to a registered channel
pub type ChannelHandle = Arc<Channel>;

/// A named logging destination
pub struct Channel {
    name: String,
    level: AtomicU8,
    propagate: AtomicBool,
    /// Ancestor receiving propagated records (the root channel, or none for root)
    parent: Option<ChannelHandle>,
    sinks: RwLock<Vec<Arc<dyn Sink>>>,
}

impl Channel {
    /// Create a detached channel
    pub fn new(
        name: impl Into<String>,
        level: Level,
        propagate: bool,
        parent: Option<ChannelHandle>,
    ) -> Self {
        Self {
            name: name.into(),
            level: AtomicU8::new(level.as_u8()),
            propagate: AtomicBool::new(propagate),
            parent,
            sinks: RwLock::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current minimum severity
    pub fn level(&self) -> Level {
        Level::from_u8(self.level.load(Ordering::Acquire))
    }

    pub fn set_level(&self, level: Level) {
        self.level.store(level.as_u8(), Ordering::Release);
    }

    /// Whether records continue to the parent's sinks
    pub fn propagates(&self) -> bool {
        self.propagate.load(Ordering::Acquire)
    }

    pub fn set_propagate(&self, propagate: bool) {
        self.propagate.store(propagate, Ordering::Release);
    }

    pub fn parent(&self) -> Option<&ChannelHandle> {
        self.parent.as_ref()
    }

    /// Attach a sink; records are delivered to sinks in attachment order
    pub fn add_sink(&self, sink: Arc<dyn Sink>) {
        self.sinks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sink);
    }

    /// Detach every sink
    pub fn clear_sinks(&self) {
        self.sinks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn sink_count(&self) -> usize {
        self.sinks
            .read()
            .map(|s| s.len())
            .unwrap_or_else(|e| e.into_inner().len())
    }

    /// Check if a record at `level` passes this channel's threshold
    pub fn is_enabled_for(&self, level: Level) -> bool {
        level >= self.level()
    }

    /// Emit a message at `level`
    pub fn log(&self, level: Level, message: impl Into<String>) {
        if !self.is_enabled_for(level) {
            return;
        }
        self.dispatch(&LogRecord::new(self.name.as_str(), level, message));
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.log(Level::Debug, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(Level::Info, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.log(Level::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(Level::Error, message);
    }

    pub fn critical(&self, message: impl Into<String>) {
        self.log(Level::Critical, message);
    }

    /// Hand a record to this channel's sinks and up the propagation chain
    ///
    /// Ancestors receive the record regardless of their own threshold.
    pub fn dispatch(&self, record: &LogRecord) {
        let mut current = Some(self);
        while let Some(channel) = current {
            channel.write_to_sinks(record);
            current = if channel.propagates() {
                channel.parent.as_deref()
            } else {
                None
            };
        }
    }

    fn write_to_sinks(&self, record: &LogRecord) {
        let sinks = self.sinks.read().unwrap_or_else(PoisonError::into_inner);
        for sink in sinks.iter() {
            sink.write(record);
        }
    }

    /// Flush every sink attached to this channel
    pub fn flush(&self) {
        let sinks = self.sinks.read().unwrap_or_else(PoisonError::into_inner);
        for sink in sinks.iter() {
            sink.flush();
        }
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("name", &self.name)
            .field("level", &self.level())
            .field("propagate", &self.propagates())
            .field("parent", &self.parent.as_ref().map(|p| p.name()))
            .field("sinks", &self.sink_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::sink::testing::CaptureSink;

    fn root_with_capture() -> (ChannelHandle, Arc<CaptureSink>) {
        let root = Arc::new(Channel::new("root", Level::Info, false, None));
        let capture = CaptureSink::new();
        root.add_sink(capture.clone());
        (root, capture)
    }

    #[test]
    fn test_threshold_filters_records() {
        let (root, capture) = root_with_capture();

        root.debug("hidden");
        root.info("shown");
        root.critical("shown too");

        assert_eq!(capture.messages(), vec!["shown", "shown too"]);
    }

    #[test]
    fn test_records_propagate_to_parent() {
        let (root, root_capture) = root_with_capture();
        let child = Channel::new("planner", Level::Debug, true, Some(Arc::clone(&root)));
        let child_capture = CaptureSink::new();
        child.add_sink(child_capture.clone());

        child.debug("route computed");

        assert_eq!(child_capture.messages(), vec!["route computed"]);
        // Parent threshold (INFO) does not gate propagated records
        assert_eq!(root_capture.messages(), vec!["route computed"]);
        assert_eq!(root_capture.records()[0].channel, "planner");
    }

    #[test]
    fn test_isolated_channel_does_not_propagate() {
        let (root, root_capture) = root_with_capture();
        let special = Channel::new("sync", Level::Debug, false, Some(Arc::clone(&root)));

        special.warning("clock skew");

        assert!(root_capture.messages().is_empty());

        special.set_propagate(true);
        special.warning("clock skew");
        assert_eq!(root_capture.messages(), vec!["clock skew"]);
    }

    #[test]
    fn test_set_level_changes_threshold() {
        let channel = Channel::new("control", Level::Info, true, None);
        assert!(!channel.is_enabled_for(Level::Debug));

        channel.set_level(Level::Debug);
        assert_eq!(channel.level(), Level::Debug);
        assert!(channel.is_enabled_for(Level::Debug));

        channel.set_level(Level::Critical);
        assert!(!channel.is_enabled_for(Level::Error));
    }

    #[test]
    fn test_flush_reaches_every_sink() {
        let channel = Channel::new("performance", Level::Info, false, None);
        let first = CaptureSink::new();
        let second = CaptureSink::new();
        channel.add_sink(first.clone());
        channel.add_sink(second.clone());

        channel.flush();

        assert_eq!(first.flush_count(), 1);
        assert_eq!(second.flush_count(), 1);
        assert_eq!(channel.sink_count(), 2);
    }
}
