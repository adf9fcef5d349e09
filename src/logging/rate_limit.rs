//! Per-(channel, level) emission rate limiting
//!
//! Each key remembers when it last let a record through. A record is accepted
//! when at least `1 / limit_per_second` has passed since then. The whole
//! check-and-update runs under one lock, so concurrent callers on the same key
//! see a single consistent history.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use super::level::Level;

/// Default cap used by [`crate::logging::LoggingManager::rate_limited_log`] callers
pub const DEFAULT_RATE_LIMIT: f64 = 1.0;

/// Channel count above which expired entries are compacted away
const COMPACT_THRESHOLD: usize = 1024;

#[derive(Debug, Clone, Copy)]
struct Slot {
    last_accepted: Instant,
    /// Interval in force at the last acceptance; `None` never expires
    interval: Option<Duration>,
}

impl Slot {
    fn expired(&self, now: Instant) -> bool {
        match self.interval {
            Some(interval) => now.saturating_duration_since(self.last_accepted) >= interval,
            None => false,
        }
    }
}

/// Slots for one channel, indexed by level
type LevelSlots = [Option<Slot>; 5];

/// Tracks the last accepted emission per (channel, level)
#[derive(Debug, Default)]
pub struct RateLimiter {
    entries: Mutex<HashMap<String, LevelSlots>>,
}

/// Minimum spacing for a cap of `limit_per_second`
///
/// Non-positive or NaN caps never re-open after the first emission; an
/// infinite cap never suppresses.
fn min_interval(limit_per_second: f64) -> Option<Duration> {
    if limit_per_second.is_nan() || limit_per_second <= 0.0 {
        return None;
    }
    if limit_per_second.is_infinite() {
        return Some(Duration::ZERO);
    }
    Duration::try_from_secs_f64(1.0 / limit_per_second).ok()
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide whether an emission for `(channel, level)` may go out now
    pub fn should_emit(&self, channel: &str, level: Level, limit_per_second: f64) -> bool {
        self.should_emit_at(channel, level, limit_per_second, Instant::now())
    }

    /// Same as [`RateLimiter::should_emit`] with an explicit clock reading
    pub fn should_emit_at(
        &self,
        channel: &str,
        level: Level,
        limit_per_second: f64,
        now: Instant,
    ) -> bool {
        let interval = min_interval(limit_per_second);
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        if !entries.contains_key(channel) {
            if entries.len() >= COMPACT_THRESHOLD {
                compact(&mut entries, now);
            }
            entries.insert(channel.to_string(), [None; 5]);
        }
        let Some(slots) = entries.get_mut(channel) else {
            return true;
        };

        let slot = &mut slots[level.index()];
        let accept = match (*slot, interval) {
            (None, _) => true,
            (Some(existing), Some(interval)) => {
                now.saturating_duration_since(existing.last_accepted) >= interval
            }
            (Some(_), None) => false,
        };
        if accept {
            *slot = Some(Slot {
                last_accepted: now,
                interval,
            });
        }
        accept
    }

    /// Number of channels currently tracked
    pub fn tracked_channels(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Drop slots whose interval has elapsed
///
/// An elapsed slot behaves like a missing one as long as the key keeps being
/// checked with the limit it was last accepted under.
fn compact(entries: &mut HashMap<String, LevelSlots>, now: Instant) {
    entries.retain(|_, slots| {
        for slot in slots.iter_mut() {
            if slot.map(|s| s.expired(now)).unwrap_or(false) {
                *slot = None;
            }
        }
        slots.iter().any(Option::is_some)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_first_call_is_accepted() {
        let limiter = RateLimiter::new();
        assert!(limiter.should_emit("sensor", Level::Info, 1.0));
    }

    #[test]
    fn test_second_call_within_interval_is_suppressed() {
        let limiter = RateLimiter::new();
        let t0 = Instant::now();

        assert!(limiter.should_emit_at("sensor", Level::Info, 2.0, t0));
        assert!(!limiter.should_emit_at("sensor", Level::Info, 2.0, t0 + Duration::from_millis(100)));
    }

    #[test]
    fn test_full_interval_reopens() {
        let limiter = RateLimiter::new();
        let t0 = Instant::now();

        assert!(limiter.should_emit_at("sensor", Level::Info, 2.0, t0));
        assert!(limiter.should_emit_at("sensor", Level::Info, 2.0, t0 + Duration::from_millis(500)));
    }

    #[test]
    fn test_suppressed_call_does_not_move_window() {
        let limiter = RateLimiter::new();
        let t0 = Instant::now();

        assert!(limiter.should_emit_at("sync", Level::Warning, 1.0, t0));
        assert!(!limiter.should_emit_at("sync", Level::Warning, 1.0, t0 + Duration::from_millis(900)));
        // Measured from t0, not from the rejected call
        assert!(limiter.should_emit_at("sync", Level::Warning, 1.0, t0 + Duration::from_millis(1000)));
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = RateLimiter::new();
        let t0 = Instant::now();

        assert!(limiter.should_emit_at("sensor", Level::Info, 1.0, t0));
        assert!(limiter.should_emit_at("sensor", Level::Error, 1.0, t0));
        assert!(limiter.should_emit_at("control", Level::Info, 1.0, t0));
        assert!(!limiter.should_emit_at("sensor", Level::Info, 1.0, t0));
    }

    #[test]
    fn test_real_clock_interval() {
        let limiter = RateLimiter::new();

        assert!(limiter.should_emit("perf", Level::Debug, 20.0));
        assert!(!limiter.should_emit("perf", Level::Debug, 20.0));
        std::thread::sleep(Duration::from_millis(60));
        assert!(limiter.should_emit("perf", Level::Debug, 20.0));
    }

    #[test]
    fn test_degenerate_limits() {
        let limiter = RateLimiter::new();
        let t0 = Instant::now();
        let later = t0 + Duration::from_secs(3600);

        assert!(limiter.should_emit_at("a", Level::Info, 0.0, t0));
        assert!(!limiter.should_emit_at("a", Level::Info, 0.0, later));

        assert!(limiter.should_emit_at("b", Level::Info, f64::INFINITY, t0));
        assert!(limiter.should_emit_at("b", Level::Info, f64::INFINITY, t0));
    }

    #[test]
    fn test_concurrent_callers_accept_once_per_window() {
        let limiter = Arc::new(RateLimiter::new());
        let t0 = Instant::now();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                std::thread::spawn(move || limiter.should_emit_at("lidar", Level::Info, 1.0, t0))
            })
            .collect();

        let accepted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|accepted| *accepted)
            .count();
        assert_eq!(accepted, 1);
    }

    #[test]
    fn test_interval_follows_current_limit() {
        let limiter = RateLimiter::new();
        let t0 = Instant::now();

        assert!(limiter.should_emit_at("control", Level::Info, 1.0, t0));
        assert!(limiter.should_emit_at("control", Level::Info, 10.0, t0 + Duration::from_millis(150)));
        assert!(!limiter.should_emit_at("control", Level::Info, 1.0, t0 + Duration::from_millis(900)));
    }

    #[test]
    fn test_compaction_drops_only_expired_entries() {
        let limiter = RateLimiter::new();
        let t0 = Instant::now();

        assert!(limiter.should_emit_at("pinned", Level::Info, 0.0, t0));
        for i in 0..COMPACT_THRESHOLD {
            limiter.should_emit_at(&format!("channel-{}", i), Level::Info, 10.0, t0);
        }
        assert_eq!(limiter.tracked_channels(), COMPACT_THRESHOLD + 1);

        let later = t0 + Duration::from_secs(1);
        assert!(limiter.should_emit_at("newcomer", Level::Info, 10.0, later));

        // Expired channels are gone, the never-expiring one survived
        assert_eq!(limiter.tracked_channels(), 2);
        assert!(!limiter.should_emit_at("pinned", Level::Info, 0.0, later));
    }
}
