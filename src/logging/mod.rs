//! Logging system for drivelog
//!
//! Named channels with per-channel thresholds, console and size-rotated file
//! sinks, per-(channel, level) rate limiting, and a manager tying them
//! together. `tracing` events can be routed into the same channels.

mod bridge;
mod channel;
mod file_writer;
mod level;
mod manager;
mod rate_limit;
mod record;
mod registry;
mod retention;
mod sink;
mod system_info;

pub use bridge::ChannelLayer;
pub use channel::{Channel, ChannelHandle};
pub use file_writer::{RotatingFileSink, BYTES_PER_MB};
pub use level::Level;
pub use manager::{LoggingManager, SpecialCategory, MAIN_LOG_FILE, SYSTEM_CHANNEL};
pub use rate_limit::{RateLimiter, DEFAULT_RATE_LIMIT};
pub use record::{LogRecord, RecordFormat};
pub use registry::{is_special, ChannelRegistry, ROOT_CHANNEL, SPECIAL_CHANNELS};
pub use retention::{backup_path, prune_generations};
pub use sink::{ConsoleSink, Sink};
pub use system_info::{DiskUsage, HostProbe, MemoryUsage, SystemProbe, SystemSnapshot};
