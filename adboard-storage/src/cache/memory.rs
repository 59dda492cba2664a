//! In-process cache backend.
//!
//! Stores the same encoded bytes the networked backend would, so decode
//! failures behave identically. Expiry is checked on read, and a purge task
//! started with [`InMemoryCacheBackend::spawn_purge_task`] drops entries
//! that are never read again.

use std::sync::Arc;
use std::time::Duration;

use adboard_core::{AdboardResult, CachedItem};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use super::codec::{decode_entry, encode_entry};
use super::key::CacheKey;
use super::traits::{CacheBackend, CacheLookup};

#[derive(Debug, Clone)]
struct StoredEntry {
    bytes: Vec<u8>,
    expires_at: Instant,
}

/// Cache backend backed by a concurrent hash map.
#[derive(Debug)]
pub struct InMemoryCacheBackend {
    entries: DashMap<CacheKey, StoredEntry>,
    ttl: Duration,
}

impl InMemoryCacheBackend {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        before - self.entries.len()
    }

    /// Purge expired entries every `period` until the backend is dropped.
    pub fn spawn_purge_task(backend: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let backend = Arc::downgrade(backend);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(backend) = backend.upgrade() else {
                    break;
                };
                let removed = backend.purge_expired();
                if removed > 0 {
                    debug!(removed, remaining = backend.len(), "Purged expired cache entries");
                }
            }
        })
    }

    /// Store raw bytes under `key`, bypassing encoding.
    pub fn insert_raw(&self, key: &CacheKey, bytes: Vec<u8>, ttl: Duration) {
        self.entries.insert(
            key.clone(),
            StoredEntry {
                bytes,
                expires_at: Instant::now() + ttl,
            },
        );
    }
}

#[async_trait]
impl CacheBackend for InMemoryCacheBackend {
    async fn get(&self, key: &CacheKey) -> AdboardResult<CacheLookup> {
        let stored = match self.entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => entry.bytes.clone(),
            Some(_) => {
                self.entries
                    .remove_if(key, |_, entry| entry.expires_at <= Instant::now());
                return Ok(CacheLookup::Miss);
            }
            None => return Ok(CacheLookup::Miss),
        };
        decode_entry(key, &stored).map(CacheLookup::Hit)
    }

    async fn put(&self, key: &CacheKey, item: &CachedItem, ttl: Duration) -> AdboardResult<()> {
        let bytes = encode_entry(key, item, Utc::now())?;
        self.insert_raw(key, bytes, ttl);
        Ok(())
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adboard_core::{AdboardError, CacheError};
    use rust_decimal::Decimal;

    fn item(id: i64) -> CachedItem {
        CachedItem {
            id,
            title: format!("item {id}"),
            price: Decimal::new(1999, 2),
            main_image_url: Some("https://img.example/a.jpg".to_string()),
            description: "desc".to_string(),
            image_urls: vec!["https://img.example/a.jpg".to_string()],
        }
    }

    #[tokio::test]
    async fn test_put_then_get_hits() {
        let backend = InMemoryCacheBackend::new(Duration::from_secs(300));
        let key = CacheKey::for_ad(1);
        backend.put(&key, &item(1), backend.ttl()).await.unwrap();

        match backend.get(&key).await.unwrap() {
            CacheLookup::Hit(entry) => assert_eq!(entry.item, item(1)),
            CacheLookup::Miss => panic!("expected hit"),
        }
        assert_eq!(
            backend.get(&CacheKey::for_ad(2)).await.unwrap(),
            CacheLookup::Miss
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_after_ttl() {
        let backend = InMemoryCacheBackend::new(Duration::from_secs(300));
        let key = CacheKey::for_ad(1);
        backend
            .put(&key, &item(1), Duration::from_secs(5))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(4)).await;
        assert!(backend.get(&key).await.unwrap().is_hit());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(backend.get(&key).await.unwrap(), CacheLookup::Miss);
        assert!(backend.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let backend = InMemoryCacheBackend::new(Duration::from_secs(300));
        backend
            .put(&CacheKey::for_ad(1), &item(1), Duration::from_secs(1))
            .await
            .unwrap();
        backend
            .put(&CacheKey::for_ad(2), &item(2), Duration::from_secs(60))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(backend.purge_expired(), 1);
        assert_eq!(backend.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_task_drops_entries_never_read_again() {
        let backend = Arc::new(InMemoryCacheBackend::new(Duration::from_secs(300)));
        backend
            .put(&CacheKey::for_ad(1), &item(1), Duration::from_secs(1))
            .await
            .unwrap();
        backend
            .put(&CacheKey::for_ad(2), &item(2), Duration::from_secs(60))
            .await
            .unwrap();

        let task = InMemoryCacheBackend::spawn_purge_task(&backend, Duration::from_secs(10));
        tokio::task::yield_now().await;

        tokio::time::sleep(Duration::from_secs(11)).await;
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
        assert_eq!(backend.len(), 1, "expired entry must be purged without a read");

        drop(backend);
        tokio::time::sleep(Duration::from_secs(11)).await;
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
        assert!(task.is_finished());
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_an_error_not_a_miss() {
        let backend = InMemoryCacheBackend::new(Duration::from_secs(300));
        let key = CacheKey::for_ad(5);
        backend.insert_raw(&key, b"garbage".to_vec(), Duration::from_secs(60));

        let err = backend.get(&key).await.unwrap_err();
        assert!(matches!(
            err,
            AdboardError::Cache(CacheError::Corrupt { .. })
        ));
    }
}
