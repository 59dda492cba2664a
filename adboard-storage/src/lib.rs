//! ADBOARD Storage - Repository Trait and Read-Through Cache
//!
//! Defines the repository abstraction over the persistent ad store and the
//! cache layer in front of it. The Postgres adapter lives in adboard-api.

pub mod cache;
pub mod repository;

pub use cache::{
    CacheBackend, CacheConfig, CacheEntry, CacheKey, CacheLookup, CacheRead, CacheStats,
    FlightRole, InMemoryCacheBackend, ReadSource, ReadThroughCache, SingleFlight,
};
#[cfg(feature = "redis-backend")]
pub use cache::RedisCacheBackend;
pub use repository::{AdRepository, InMemoryAdRepository};
