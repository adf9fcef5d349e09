//! Logging manager
//!
//! Facade over the channel registry, sinks and rate limiter. Build one with
//! [`LoggingManager::new`] and hand the `Arc` to every producer, or use
//! [`LoggingManager::get_or_initialize`] for a process-wide instance where
//! the first successful caller's configuration wins.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use crate::config::LoggingConfig;
use crate::error::{Error, Result};

use super::bridge;
use super::channel::ChannelHandle;
use super::file_writer::RotatingFileSink;
use super::level::Level;
use super::rate_limit::RateLimiter;
use super::registry::{ChannelRegistry, SPECIAL_CHANNELS};
use super::sink::ConsoleSink;
use super::system_info::{HostProbe, SystemProbe};

/// File receiving the root channel
pub const MAIN_LOG_FILE: &str = "main.log";

/// Channel receiving host facts from [`LoggingManager::log_system_info`]
pub const SYSTEM_CHANNEL: &str = "system";

/// The five isolated channels created at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialCategory {
    /// System health monitoring
    Diagnostic,
    /// Sensor metrics
    Sensor,
    /// Sensor/clock synchronization
    Sync,
    /// Control system
    Control,
    /// Performance monitoring
    Performance,
}

impl SpecialCategory {
    pub const ALL: [SpecialCategory; 5] = [
        SpecialCategory::Diagnostic,
        SpecialCategory::Sensor,
        SpecialCategory::Sync,
        SpecialCategory::Control,
        SpecialCategory::Performance,
    ];

    /// Channel name for this category
    pub fn as_str(&self) -> &'static str {
        match self {
            SpecialCategory::Diagnostic => SPECIAL_CHANNELS[0],
            SpecialCategory::Sensor => SPECIAL_CHANNELS[1],
            SpecialCategory::Sync => SPECIAL_CHANNELS[2],
            SpecialCategory::Control => SPECIAL_CHANNELS[3],
            SpecialCategory::Performance => SPECIAL_CHANNELS[4],
        }
    }

    /// File name of this category's rotating log
    pub fn file_name(&self) -> String {
        format!("{}.log", self.as_str())
    }
}

impl fmt::Display for SpecialCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpecialCategory {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        SpecialCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or(())
    }
}

/// Coordinates channels, sinks and rate limiting for the whole process
pub struct LoggingManager {
    config: LoggingConfig,
    registry: Arc<ChannelRegistry>,
    rate_limiter: RateLimiter,
    special: HashMap<SpecialCategory, ChannelHandle>,
    probe: Box<dyn SystemProbe>,
}

static GLOBAL_MANAGER: OnceLock<Arc<LoggingManager>> = OnceLock::new();
static GLOBAL_INIT: Mutex<()> = Mutex::new(());

impl LoggingManager {
    /// Build a manager: create the log directory, configure root, create the
    /// special channels with their files
    ///
    /// Fails only when the log directory cannot be created. Does not touch the
    /// global tracing subscriber; see [`LoggingManager::install_tracing`].
    pub fn new(config: LoggingConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.log_dir).map_err(|source| Error::CreateLogDir {
            path: config.log_dir.clone(),
            source,
        })?;

        let registry = Arc::new(ChannelRegistry::new(config.default_level));
        let manager = Self {
            special: HashMap::new(),
            rate_limiter: RateLimiter::new(),
            probe: Box::new(HostProbe::default()),
            registry,
            config,
        };
        manager.configure_root();
        Ok(manager.with_special_channels())
    }

    /// Return the process-wide manager, creating it on first use
    ///
    /// Later calls return the existing instance and ignore `config`. A failed
    /// first attempt leaves nothing behind, so a later call may retry.
    pub fn get_or_initialize(config: LoggingConfig) -> Result<Arc<LoggingManager>> {
        if let Some(manager) = GLOBAL_MANAGER.get() {
            return Ok(Arc::clone(manager));
        }

        let _guard = GLOBAL_INIT.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(manager) = GLOBAL_MANAGER.get() {
            return Ok(Arc::clone(manager));
        }

        let capture_tracing = config.capture_tracing;
        let manager = Arc::new(LoggingManager::new(config)?);
        let manager = Arc::clone(GLOBAL_MANAGER.get_or_init(|| manager));
        if capture_tracing && !manager.install_tracing() {
            manager
                .root()
                .debug("A global tracing subscriber was already installed; tracing events are not captured");
        }
        Ok(manager)
    }

    /// The process-wide manager, if [`LoggingManager::get_or_initialize`] ran
    pub fn global() -> Option<Arc<LoggingManager>> {
        GLOBAL_MANAGER.get().cloned()
    }

    /// Replace the host metrics source
    pub fn with_probe(mut self, probe: Box<dyn SystemProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// Route every `tracing` event in the process into this manager's channels
    ///
    /// Returns `false` when a global subscriber already exists.
    pub fn install_tracing(&self) -> bool {
        bridge::install(Arc::clone(&self.registry))
    }

    /// Reset root's sinks to the configured console and main.log outputs
    fn configure_root(&self) {
        let root = self.registry.root();
        root.clear_sinks();
        root.set_level(self.config.default_level);

        if self.config.enable_console {
            root.add_sink(Arc::new(ConsoleSink::stdout()));
        }
        if self.config.enable_file {
            root.add_sink(Arc::new(RotatingFileSink::new(
                self.config.log_dir.join(MAIN_LOG_FILE),
                self.config.max_file_bytes(),
                self.config.backup_count,
            )));
        }
    }

    fn with_special_channels(mut self) -> Self {
        for category in SpecialCategory::ALL {
            let channel = self.registry.get_or_create(category.as_str());
            if self.config.enable_file {
                channel.add_sink(Arc::new(RotatingFileSink::new(
                    self.config.log_dir.join(category.file_name()),
                    self.config.max_file_bytes(),
                    self.config.backup_count,
                )));
            }
            self.special.insert(category, channel);
        }
        self
    }

    pub fn config(&self) -> &LoggingConfig {
        &self.config
    }

    pub fn log_dir(&self) -> &Path {
        &self.config.log_dir
    }

    pub fn registry(&self) -> &Arc<ChannelRegistry> {
        &self.registry
    }

    /// The root channel
    pub fn root(&self) -> &ChannelHandle {
        self.registry.root()
    }

    /// Get or create the channel called `name`
    pub fn get_logger(&self, name: &str) -> ChannelHandle {
        self.registry.get_or_create(name)
    }

    /// Set the level of every channel, or only of the named existing ones
    pub fn set_level(&self, level: Level, names: Option<&[&str]>) {
        self.registry.set_level(level, names);
    }

    /// One of the five special channels, or `None` for any other name
    pub fn get_special_logger(&self, category: &str) -> Option<ChannelHandle> {
        let category = category.parse::<SpecialCategory>().ok()?;
        self.special_logger(category)
    }

    /// Typed access to a special channel
    pub fn special_logger(&self, category: SpecialCategory) -> Option<ChannelHandle> {
        self.special.get(&category).cloned()
    }

    /// Get the diagnostic logger for system health monitoring
    pub fn diagnostic_logger(&self) -> Option<ChannelHandle> {
        self.special_logger(SpecialCategory::Diagnostic)
    }

    /// Get the sensor metrics logger
    pub fn sensor_logger(&self) -> Option<ChannelHandle> {
        self.special_logger(SpecialCategory::Sensor)
    }

    /// Get the synchronization logger
    pub fn sync_logger(&self) -> Option<ChannelHandle> {
        self.special_logger(SpecialCategory::Sync)
    }

    /// Get the control system logger
    pub fn control_logger(&self) -> Option<ChannelHandle> {
        self.special_logger(SpecialCategory::Control)
    }

    /// Get the performance monitoring logger
    pub fn performance_logger(&self) -> Option<ChannelHandle> {
        self.special_logger(SpecialCategory::Performance)
    }

    /// Enable (DEBUG) or silence (CRITICAL) a special channel
    ///
    /// Announces the change on root. Unknown categories are ignored.
    pub fn toggle_special_logger(&self, category: &str, enable: bool) {
        let Some(channel) = self.get_special_logger(category) else {
            return;
        };

        channel.set_level(if enable { Level::Debug } else { Level::Critical });
        self.root().info(format!(
            "{} {} logging",
            if enable { "Enabled" } else { "Disabled" },
            channel.name()
        ));
    }

    /// Emit `message` unless this (channel, level) emitted within the last
    /// `1 / limit_per_second` seconds
    ///
    /// Returns whether the rate limiter let the record through. The record
    /// may still be filtered by the channel's level afterwards.
    pub fn rate_limited_log(
        &self,
        channel: &ChannelHandle,
        level: Level,
        message: impl Into<String>,
        limit_per_second: f64,
    ) -> bool {
        if !self
            .rate_limiter
            .should_emit(channel.name(), level, limit_per_second)
        {
            return false;
        }
        channel.log(level, message);
        true
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    /// Emit one INFO record per host fact on the `system` channel
    pub fn log_system_info(&self) {
        let channel = self.get_logger(SYSTEM_CHANNEL);
        for line in self.probe.snapshot().lines() {
            channel.info(line);
        }
    }

    /// Flush every sink of every channel
    pub fn flush_all(&self) {
        for channel in self.registry.channels() {
            channel.flush();
        }
    }
}

impl fmt::Debug for LoggingManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggingManager")
            .field("config", &self.config)
            .field("channels", &self.registry.names())
            .finish()
    }
}
