//! Cache layer for ad reads.
//!
//! A [`ReadThroughCache`] sits between handlers and the [`AdRepository`]:
//! lookups go to a [`CacheBackend`], misses fall back to the repository and
//! populate the cache with the full [`adboard_core::CachedItem`], and every
//! answer is narrowed to the caller's requested fields on the way out.
//!
//! Reads return [`CacheRead<T>`], which records whether the value came from
//! the cache, from this caller's own store fetch, or from a fill another
//! caller had already started.
//!
//! # Example
//!
//! ```ignore
//! let backend = Arc::new(InMemoryCacheBackend::new(config.entry_ttl));
//! let cache = ReadThroughCache::new(backend, repository, config);
//!
//! let read = cache.get(id, RequestedFieldSet::maximal()).await?;
//! ```
//!
//! [`AdRepository`]: crate::AdRepository

mod codec;
pub mod freshness;
pub mod key;
pub mod memory;
pub mod read_through;
#[cfg(feature = "redis-backend")]
pub mod redis_backend;
pub mod single_flight;
pub mod traits;

pub use freshness::{CacheRead, ReadSource};
pub use key::CacheKey;
pub use memory::InMemoryCacheBackend;
pub use read_through::{CacheConfig, ReadThroughCache};
#[cfg(feature = "redis-backend")]
pub use redis_backend::RedisCacheBackend;
pub use single_flight::{FlightRole, SingleFlight};
pub use traits::{CacheBackend, CacheEntry, CacheLookup, CacheStats};
