//! Channel registry
//!
//! Sole owner of every channel. Lookups create channels on demand; channels
//! are never removed. The registry lock covers map access only, never I/O.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::channel::{Channel, ChannelHandle};
use super::level::Level;

/// Name of the root channel every ordinary channel propagates to
pub const ROOT_CHANNEL: &str = "root";

/// Channels created isolated (non-propagating) with their own log files
pub const SPECIAL_CHANNELS: [&str; 5] = ["diagnostic", "sensor", "sync", "control", "performance"];

/// Check whether `name` is one of the special channels
pub fn is_special(name: &str) -> bool {
    SPECIAL_CHANNELS.contains(&name)
}

/// Mapping from channel name to channel
pub struct ChannelRegistry {
    channels: Mutex<HashMap<String, ChannelHandle>>,
    root: ChannelHandle,
    default_level: Level,
}

impl ChannelRegistry {
    /// Create a registry holding only the root channel
    pub fn new(default_level: Level) -> Self {
        let root = Arc::new(Channel::new(ROOT_CHANNEL, default_level, false, None));
        let mut channels = HashMap::new();
        channels.insert(ROOT_CHANNEL.to_string(), Arc::clone(&root));

        Self {
            channels: Mutex::new(channels),
            root,
            default_level,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, ChannelHandle>> {
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The root channel
    pub fn root(&self) -> &ChannelHandle {
        &self.root
    }

    /// Level given to newly created channels
    pub fn default_level(&self) -> Level {
        self.default_level
    }

    /// Return the channel called `name`, creating it if needed
    ///
    /// New channels start at the default level with no sinks. Special channels
    /// are isolated; every other channel propagates to root. Concurrent callers
    /// asking for the same new name all receive the same channel.
    pub fn get_or_create(&self, name: &str) -> ChannelHandle {
        let mut channels = self.lock();
        if let Some(channel) = channels.get(name) {
            return Arc::clone(channel);
        }

        let channel = Arc::new(Channel::new(
            name,
            self.default_level,
            !is_special(name),
            Some(Arc::clone(&self.root)),
        ));
        channels.insert(name.to_string(), Arc::clone(&channel));
        channel
    }

    /// Return the channel called `name` only if it already exists
    pub fn get(&self, name: &str) -> Option<ChannelHandle> {
        self.lock().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lock().contains_key(name)
    }

    /// Set the level of every channel, or only of the named ones
    ///
    /// Unknown names are ignored.
    pub fn set_level(&self, level: Level, names: Option<&[&str]>) {
        let channels = self.lock();
        match names {
            None => {
                for channel in channels.values() {
                    channel.set_level(level);
                }
            }
            Some(names) => {
                for name in names {
                    if let Some(channel) = channels.get(*name) {
                        channel.set_level(level);
                    }
                }
            }
        }
    }

    /// Snapshot of every registered channel
    pub fn channels(&self) -> Vec<ChannelHandle> {
        self.lock().values().cloned().collect()
    }

    /// Sorted names of every registered channel
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
