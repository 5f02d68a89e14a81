/// Single-slot response cache.
///
/// Holds the last projected API response together with its fetch time. There
/// is exactly one slot: every successful live fetch overwrites it, and no
/// history is retained. Freshness is decided by [`is_fresh`] against an
/// injected clock, so the store itself never looks at the time.
///
/// Two backends are provided:
///
/// - [`FileCache`]: persisted to `~/.pollen-gauge/cache.json`, surviving
///   across short-lived CLI invocations.
/// - [`MemoryCache`]: process-local, used by tests and when no home
///   directory is available.
use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, TimeDelta, Utc};

use crate::model::CachedResponse;

mod file;

pub use file::{FileCache, default_cache_path};

/// Default freshness window: one hour.
pub const DEFAULT_MAX_AGE_MS: u64 = 60 * 60 * 1000;

/// Storage for the single cached response slot.
pub trait CacheStore {
    /// The stored entry, if any. Unreadable entries count as absent.
    fn read(&self) -> Option<CachedResponse>;

    /// Replace the slot with `entry`.
    fn write(&mut self, entry: &CachedResponse) -> Result<()>;

    /// Drop the stored entry.
    fn clear(&mut self) -> Result<()>;

    /// Where the slot is persisted; `None` for process-local stores.
    fn location(&self) -> Option<&Path> {
        None
    }
}

impl<T: CacheStore + ?Sized> CacheStore for Box<T> {
    fn read(&self) -> Option<CachedResponse> {
        (**self).read()
    }

    fn write(&mut self, entry: &CachedResponse) -> Result<()> {
        (**self).write(entry)
    }

    fn clear(&mut self) -> Result<()> {
        (**self).clear()
    }

    fn location(&self) -> Option<&Path> {
        (**self).location()
    }
}

/// `true` iff the entry is younger than `max_age` at `now`.
pub fn is_fresh(entry: &CachedResponse, now: DateTime<Utc>, max_age: TimeDelta) -> bool {
    now.signed_duration_since(entry.fetched_at) < max_age
}

/// Convert a millisecond setting to a [`TimeDelta`], saturating on overflow.
pub fn max_age_from_ms(ms: u64) -> TimeDelta {
    i64::try_from(ms)
        .ok()
        .and_then(TimeDelta::try_milliseconds)
        .unwrap_or(TimeDelta::MAX)
}

// ---------------------------------------------------------------------------
// In-memory backend
// ---------------------------------------------------------------------------

/// Process-local cache slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    slot: Option<CachedResponse>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryCache {
    fn read(&self) -> Option<CachedResponse> {
        self.slot.clone()
    }

    fn write(&mut self, entry: &CachedResponse) -> Result<()> {
        self.slot = Some(entry.clone());
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.slot = None;
        Ok(())
    }
}
