//! Read results carrying provenance and staleness metadata.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Where the value of a [`CacheRead`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadSource {
    /// Served from an existing cache entry.
    Cache,
    /// This caller fetched from the store and populated the cache.
    Store,
    /// Another caller's in-flight fill answered this read.
    Coalesced,
}

impl ReadSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadSource::Cache => "cache",
            ReadSource::Store => "store",
            ReadSource::Coalesced => "coalesced",
        }
    }
}

/// Result of a cache read, carrying staleness metadata.
#[derive(Debug, Clone)]
pub struct CacheRead<T> {
    value: T,
    /// When the backing entry was written.
    cached_at: DateTime<Utc>,
    source: ReadSource,
}

impl<T> CacheRead<T> {
    /// Create a new cache read from a cache hit.
    pub fn from_cache(value: T, cached_at: DateTime<Utc>) -> Self {
        Self {
            value,
            cached_at,
            source: ReadSource::Cache,
        }
    }

    /// Create a new cache read from a store fetch.
    pub fn from_store(value: T, cached_at: DateTime<Utc>) -> Self {
        Self {
            value,
            cached_at,
            source: ReadSource::Store,
        }
    }

    /// Create a read answered by someone else's fill.
    pub fn coalesced(value: T, cached_at: DateTime<Utc>) -> Self {
        Self {
            value,
            cached_at,
            source: ReadSource::Coalesced,
        }
    }

    /// Consume the wrapper and return the underlying value.
    pub fn into_value(self) -> T {
        self.value
    }

    /// Get a reference to the underlying value.
    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn source(&self) -> ReadSource {
        self.source
    }

    /// Calculate how stale the data is.
    pub fn staleness(&self) -> Duration {
        let now = Utc::now();
        if now > self.cached_at {
            (now - self.cached_at).to_std().unwrap_or(Duration::ZERO)
        } else {
            Duration::ZERO
        }
    }

    /// Get when this value was cached.
    pub fn cached_at(&self) -> DateTime<Utc> {
        self.cached_at
    }

    /// Check if this was a cache hit.
    pub fn was_cache_hit(&self) -> bool {
        self.source == ReadSource::Cache
    }

    /// Map the inner value to a new type.
    pub fn map<U, F>(self, f: F) -> CacheRead<U>
    where
        F: FnOnce(T) -> U,
    {
        CacheRead {
            value: f(self.value),
            cached_at: self.cached_at,
            source: self.source,
        }
    }
}
