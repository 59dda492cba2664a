//! Cache backend trait and lookup outcome.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use adboard_core::{AdboardResult, CachedItem, Timestamp};
use async_trait::async_trait;

use super::key::CacheKey;

/// A decoded cache entry together with the time it was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub item: CachedItem,
    pub cached_at: Timestamp,
}

/// Outcome of a successful cache lookup.
///
/// Transport and decode failures travel on the `Err` side of the
/// surrounding `AdboardResult`; a key that was never written or has expired
/// is a plain `Miss`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    Hit(CacheEntry),
    Miss,
}

impl CacheLookup {
    pub fn is_hit(&self) -> bool {
        matches!(self, Self::Hit(_))
    }

    pub fn into_entry(self) -> Option<CacheEntry> {
        match self {
            Self::Hit(entry) => Some(entry),
            Self::Miss => None,
        }
    }
}

/// Key/value store with per-key expiry holding [`CachedItem`] payloads.
///
/// Implementations must be safe to share across tasks. The serialized form
/// is private to each backend's `get`/`put` pair.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Look up an entry.
    async fn get(&self, key: &CacheKey) -> AdboardResult<CacheLookup>;

    /// Write an entry, replacing whatever is there. Expires after `ttl`.
    async fn put(&self, key: &CacheKey, item: &CachedItem, ttl: Duration) -> AdboardResult<()>;

    /// Retention window configured for this backend.
    fn ttl(&self) -> Duration;

    /// Connectivity check used by readiness.
    async fn ping(&self) -> AdboardResult<()> {
        Ok(())
    }
}

/// Snapshot of read-path counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Reads answered straight from the cache.
    pub hits: u64,
    /// Reads that found no entry.
    pub misses: u64,
    /// Store fetches that wrote a fresh entry.
    pub fills: u64,
    /// Misses that waited on another caller's fill instead of starting one.
    pub coalesced: u64,
    /// Misses for ids the store does not know.
    pub not_found: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Lock-free counters behind [`CacheStats`].
#[derive(Debug, Default)]
pub(crate) struct StatsRecorder {
    hits: AtomicU64,
    misses: AtomicU64,
    fills: AtomicU64,
    coalesced: AtomicU64,
    not_found: AtomicU64,
}

impl StatsRecorder {
    pub(crate) fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn fill(&self) {
        self.fills.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn coalesced(&self) {
        self.coalesced.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn not_found(&self) {
        self.not_found.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            fills: self.fills.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            not_found: self.not_found.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_stats_hit_rate() {
        let stats = CacheStats {
            hits: 80,
            misses: 20,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.8).abs() < 0.001);

        let empty_stats = CacheStats::default();
        assert!((empty_stats.hit_rate() - 0.0).abs() < 0.001);
    }

    #[test]
    fn test_recorder_snapshot() {
        let recorder = StatsRecorder::default();
        recorder.hit();
        recorder.hit();
        recorder.miss();
        recorder.fill();
        recorder.coalesced();

        let stats = recorder.snapshot();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.fills, 1);
        assert_eq!(stats.coalesced, 1);
        assert_eq!(stats.not_found, 0);
    }
}
