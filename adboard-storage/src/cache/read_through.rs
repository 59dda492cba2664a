//! Read-through cache over the ad repository.
//!
//! Lookup, store fallback, population and projection for single-ad reads.
//! Concurrent misses for the same ad are coalesced into one store fetch and
//! one cache write.

use std::sync::Arc;
use std::time::Duration;

use adboard_core::{
    AdId, AdItem, AdboardResult, CacheError, CachedItem, ConfigError, CreateAdInput,
    ItemPayload, ListItemPayload, ListQuery, Project, RequestedFieldSet,
};
use adboard_core::settings::parse_positive;
use chrono::Utc;
use tracing::{debug, warn};

use super::freshness::CacheRead;
use super::key::CacheKey;
use super::single_flight::{FlightRole, SingleFlight};
use super::traits::{CacheBackend, CacheEntry, CacheLookup, CacheStats, StatsRecorder};
use crate::repository::AdRepository;

const DEFAULT_ENTRY_TTL: Duration = Duration::from_secs(5 * 60);
const DEFAULT_FILL_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for the read-through cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Retention window for cache entries. Backends are built with it.
    pub entry_ttl: Duration,
    /// Longest a single read waits on a fill before giving up.
    pub fill_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            entry_ttl: DEFAULT_ENTRY_TTL,
            fill_timeout: DEFAULT_FILL_TIMEOUT,
        }
    }
}

impl CacheConfig {
    /// Create a new cache config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from the environment, falling back to defaults.
    ///
    /// - `ADBOARD_CACHE_TTL_SECS`: entry retention, at least 1 (default: 300)
    /// - `ADBOARD_CACHE_FILL_TIMEOUT_MS`: fill wait limit, at least 1 (default: 10000)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load through `lookup`; a present but malformed value is an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let entry_ttl = parse_positive(
            "ADBOARD_CACHE_TTL_SECS",
            lookup("ADBOARD_CACHE_TTL_SECS").as_deref(),
        )?
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_ENTRY_TTL);

        let fill_timeout = parse_positive(
            "ADBOARD_CACHE_FILL_TIMEOUT_MS",
            lookup("ADBOARD_CACHE_FILL_TIMEOUT_MS").as_deref(),
        )?
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_FILL_TIMEOUT);

        Ok(Self {
            entry_ttl,
            fill_timeout,
        })
    }

    /// Set the entry TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.entry_ttl = ttl;
        self
    }

    /// Set the fill timeout.
    pub fn with_fill_timeout(mut self, timeout: Duration) -> Self {
        self.fill_timeout = timeout;
        self
    }
}

/// What a fill produced. Shared verbatim with every waiter.
#[derive(Debug, Clone)]
enum Filled {
    /// Another fill wrote the entry between our lookup and this one.
    AlreadyCached(CacheEntry),
    /// Fetched from the store and written to the cache.
    Stored(CacheEntry),
    /// The store has no such ad.
    Missing,
}

type FillOutcome = AdboardResult<Filled>;

/// Read-through cache for ads.
///
/// # Example
///
/// ```ignore
/// let cache = ReadThroughCache::new(backend, repository, CacheConfig::default());
///
/// let fields = FieldSelector::parse(["description"])?;
/// if let Some(read) = cache.get(42, fields).await? {
///     println!("{} from {:?}", read.value().title, read.source());
/// }
/// ```
pub struct ReadThroughCache {
    cache: Arc<dyn CacheBackend>,
    repository: Arc<dyn AdRepository>,
    config: CacheConfig,
    flights: Arc<SingleFlight<CacheKey, FillOutcome>>,
    stats: Arc<StatsRecorder>,
}

impl ReadThroughCache {
    /// Create a new read-through cache.
    pub fn new(
        cache: Arc<dyn CacheBackend>,
        repository: Arc<dyn AdRepository>,
        config: CacheConfig,
    ) -> Self {
        Self {
            cache,
            repository,
            config,
            flights: Arc::new(SingleFlight::new()),
            stats: Arc::new(StatsRecorder::default()),
        }
    }

    /// Get the cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Get a reference to the cache backend.
    pub fn backend(&self) -> &dyn CacheBackend {
        self.cache.as_ref()
    }

    /// Get a reference to the repository.
    pub fn repository(&self) -> &dyn AdRepository {
        self.repository.as_ref()
    }

    /// Snapshot of the read-path counters.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    /// Number of ads with a fill currently in progress.
    pub fn fills_in_flight(&self) -> usize {
        self.flights.in_flight()
    }

    /// Get an ad projected to `fields`.
    ///
    /// Returns `Ok(None)` when the store does not know the id. Cache lookup
    /// failures, store failures and cache population failures are all
    /// errors; none of them fall through to an uncached answer.
    pub async fn get(
        &self,
        id: AdId,
        fields: RequestedFieldSet,
    ) -> AdboardResult<Option<CacheRead<ItemPayload>>> {
        let read = self.read(id).await?;
        Ok(read.map(|read| read.map(|item| item.project(fields))))
    }

    /// Get the full cached shape of an ad.
    pub async fn read(&self, id: AdId) -> AdboardResult<Option<CacheRead<CachedItem>>> {
        let key = CacheKey::for_ad(id);

        match self.cache.get(&key).await {
            Ok(CacheLookup::Hit(entry)) => {
                self.stats.hit();
                debug!(ad_id = id, cache_key = %key, "Cache hit");
                return Ok(Some(CacheRead::from_cache(entry.item, entry.cached_at)));
            }
            Ok(CacheLookup::Miss) => {
                self.stats.miss();
                debug!(ad_id = id, cache_key = %key, "Cache miss");
            }
            Err(e) => {
                warn!(ad_id = id, cache_key = %key, error = %e, "Cache lookup failed");
                return Err(e);
            }
        }

        self.fill(id, key).await
    }

    /// Join or start the fill for `key` and translate its outcome.
    async fn fill(&self, id: AdId, key: CacheKey) -> AdboardResult<Option<CacheRead<CachedItem>>> {
        let cache = Arc::clone(&self.cache);
        let repository = Arc::clone(&self.repository);
        let stats = Arc::clone(&self.stats);
        let fill_key = key.clone();

        let flight = self.flights.run(key.clone(), move || {
            populate(cache, repository, stats, id, fill_key)
        });

        let (outcome, role) = match tokio::time::timeout(self.config.fill_timeout, flight).await {
            Ok(done) => done,
            Err(_) => {
                warn!(ad_id = id, cache_key = %key, "Cache fill timed out");
                return Err(CacheError::FillTimeout {
                    key: key.to_string(),
                    elapsed: self.config.fill_timeout,
                }
                .into());
            }
        };

        if role == FlightRole::Follower {
            self.stats.coalesced();
        }

        let read = match outcome? {
            Filled::AlreadyCached(entry) => CacheRead::from_cache(entry.item, entry.cached_at),
            Filled::Stored(entry) => match role {
                FlightRole::Leader => CacheRead::from_store(entry.item, entry.cached_at),
                FlightRole::Follower => CacheRead::coalesced(entry.item, entry.cached_at),
            },
            Filled::Missing => return Ok(None),
        };
        Ok(Some(read))
    }

    /// Persist a new ad and write its cache entry.
    ///
    /// A failed cache write fails the call even though the ad is stored.
    pub async fn create(&self, input: &CreateAdInput) -> AdboardResult<AdItem> {
        let ad = self.repository.create(input).await?;
        let key = CacheKey::for_ad(ad.id);
        if let Err(e) = self
            .cache
            .put(&key, &CachedItem::from(&ad), self.cache.ttl())
            .await
        {
            warn!(ad_id = ad.id, cache_key = %key, error = %e, "Cache warm-up after create failed");
            return Err(e);
        }
        debug!(ad_id = ad.id, "Created ad and warmed cache");
        Ok(ad)
    }

    /// One page of ads straight from the repository.
    pub async fn list(&self, query: &ListQuery) -> AdboardResult<Vec<ListItemPayload>> {
        self.repository.list(query).await
    }
}

/// Body of a fill: re-check, fetch, write.
///
/// The re-check catches a fill that completed between the caller's lookup
/// and its joining the flight.
async fn populate(
    cache: Arc<dyn CacheBackend>,
    repository: Arc<dyn AdRepository>,
    stats: Arc<StatsRecorder>,
    id: AdId,
    key: CacheKey,
) -> FillOutcome {
    if let CacheLookup::Hit(entry) = cache.get(&key).await? {
        return Ok(Filled::AlreadyCached(entry));
    }

    let Some(ad) = repository.get_by_id(id).await? else {
        stats.not_found();
        return Ok(Filled::Missing);
    };

    let item = CachedItem::from(ad);
    let cached_at = Utc::now();
    cache.put(&key, &item, cache.ttl()).await?;
    stats.fill();
    debug!(ad_id = id, cache_key = %key, "Populated cache from store");

    Ok(Filled::Stored(CacheEntry { item, cached_at }))
}

impl Clone for ReadThroughCache {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            repository: Arc::clone(&self.repository),
            config: self.config.clone(),
            flights: Arc::clone(&self.flights),
            stats: Arc::clone(&self.stats),
        }
    }
}

impl std::fmt::Debug for ReadThroughCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadThroughCache")
            .field("config", &self.config)
            .field("stats", &self.stats.snapshot())
            .finish_non_exhaustive()
    }
}
