//! Repository abstraction over the persistent ad store.
//!
//! The Postgres adapter lives in adboard-api; the in-memory implementation
//! here backs tests and local runs without a database.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::RwLock;

use adboard_core::{
    paginate, AdId, AdItem, AdboardResult, CreateAdInput, ListItemPayload, ListQuery, StorageError,
};
use async_trait::async_trait;
use chrono::Utc;

/// Async access to the persistent ad store.
#[async_trait]
pub trait AdRepository: Send + Sync {
    /// Fetch one ad. `Ok(None)` when no ad has this id.
    async fn get_by_id(&self, id: AdId) -> AdboardResult<Option<AdItem>>;

    /// Persist a new ad and return it with its store-assigned id.
    async fn create(&self, input: &CreateAdInput) -> AdboardResult<AdItem>;

    /// One page of ads, ordered by `query.sort` with ties broken by id
    /// ascending. An offset past the end yields an empty page.
    async fn list(&self, query: &ListQuery) -> AdboardResult<Vec<ListItemPayload>>;

    /// Connectivity check used by readiness.
    async fn ping(&self) -> AdboardResult<()> {
        Ok(())
    }
}

// ============================================================================
// IN-MEMORY REPOSITORY
// ============================================================================

/// In-memory repository.
#[derive(Debug)]
pub struct InMemoryAdRepository {
    ads: RwLock<BTreeMap<AdId, AdItem>>,
    next_id: AtomicI64,
}

impl Default for InMemoryAdRepository {
    fn default() -> Self {
        Self {
            ads: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

impl InMemoryAdRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fully formed ad, replacing any ad with the same id.
    pub fn insert(&self, ad: AdItem) -> AdboardResult<()> {
        let mut ads = self.ads.write().map_err(|_| StorageError::LockPoisoned)?;
        self.next_id.fetch_max(ad.id.saturating_add(1), Ordering::SeqCst);
        ads.insert(ad.id, ad);
        Ok(())
    }

    /// Get count of stored ads.
    pub fn len(&self) -> usize {
        self.ads.read().map(|ads| ads.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AdRepository for InMemoryAdRepository {
    async fn get_by_id(&self, id: AdId) -> AdboardResult<Option<AdItem>> {
        let ads = self.ads.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(ads.get(&id).cloned())
    }

    async fn create(&self, input: &CreateAdInput) -> AdboardResult<AdItem> {
        let mut ads = self.ads.write().map_err(|_| StorageError::LockPoisoned)?;
        let id = self
            .next_id
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |next| next.checked_add(1))
            .map_err(|_| StorageError::InsertFailed {
                reason: "ad id space exhausted".to_string(),
            })?;
        if ads.contains_key(&id) {
            return Err(StorageError::InsertFailed {
                reason: format!("ad id {} already taken", id),
            }
            .into());
        }
        let ad = AdItem {
            id,
            title: input.title.clone(),
            price: input.price,
            description: input.description.clone(),
            main_image_url: input.main_image_url().map(str::to_string),
            image_urls: input.image_urls().to_vec(),
            created_at: Utc::now(),
        };
        ads.insert(id, ad.clone());
        Ok(ad)
    }

    async fn list(&self, query: &ListQuery) -> AdboardResult<Vec<ListItemPayload>> {
        let ads = self.ads.read().map_err(|_| StorageError::LockPoisoned)?;
        let all: Vec<AdItem> = ads.values().cloned().collect();
        drop(ads);
        Ok(paginate(all, query).iter().map(ListItemPayload::from).collect())
    }
}
