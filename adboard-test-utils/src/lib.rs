//! ADBOARD Test Utilities
//!
//! Shared test infrastructure for the ADBOARD workspace:
//! - Instrumented repository and cache doubles
//! - Proptest generators for ad types
//! - Test fixtures for common scenarios
//! - Assertions over `AdboardResult`

pub use adboard_core::{
    AdId, AdItem, AdboardError, AdboardResult, CacheError, CachedItem, CreateAdInput,
    ItemPayload, ListItemPayload, ListQuery, OptionalField, RequestedFieldSet, SortKey,
    StorageError, ValidationError,
};
pub use adboard_storage::{
    AdRepository, CacheBackend, CacheKey, CacheLookup, InMemoryAdRepository,
    InMemoryCacheBackend,
};

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

// ============================================================================
// INSTRUMENTED DOUBLES
// ============================================================================

/// Repository that counts single-ad fetches and can stall or fail them.
///
/// `create` and `list` pass straight through to the inner store.
#[derive(Debug, Default)]
pub struct CountingRepository {
    inner: InMemoryAdRepository,
    gets: AtomicUsize,
    fetch_delay: Option<Duration>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl CountingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `get_by_id` sleeps for `delay` before answering.
    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = Some(delay);
        self
    }

    /// The wrapped store, for seeding.
    pub fn inner(&self) -> &InMemoryAdRepository {
        &self.inner
    }

    /// Number of `get_by_id` calls so far.
    pub fn fetches(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn unavailable() -> AdboardError {
        StorageError::Unavailable {
            reason: "connection refused".to_string(),
        }
        .into()
    }
}

#[async_trait]
impl AdRepository for CountingRepository {
    async fn get_by_id(&self, id: AdId) -> AdboardResult<Option<AdItem>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.fetch_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        self.inner.get_by_id(id).await
    }

    async fn create(&self, input: &CreateAdInput) -> AdboardResult<AdItem> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::InsertFailed {
                reason: "connection refused".to_string(),
            }
            .into());
        }
        self.inner.create(input).await
    }

    async fn list(&self, query: &ListQuery) -> AdboardResult<Vec<ListItemPayload>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        self.inner.list(query).await
    }

    async fn ping(&self) -> AdboardResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        Ok(())
    }
}

/// Cache backend whose lookups and writes can be switched to transport
/// failures at runtime. Counts writes.
#[derive(Debug)]
pub struct FlakyCacheBackend {
    inner: InMemoryCacheBackend,
    puts: AtomicUsize,
    fail_get: AtomicBool,
    fail_put: AtomicBool,
}

impl FlakyCacheBackend {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: InMemoryCacheBackend::new(ttl),
            puts: AtomicUsize::new(0),
            fail_get: AtomicBool::new(false),
            fail_put: AtomicBool::new(false),
        }
    }

    pub fn inner(&self) -> &InMemoryCacheBackend {
        &self.inner
    }

    /// Number of `put` calls so far, failed ones included.
    pub fn writes(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn fail_get(&self, fail: bool) {
        self.fail_get.store(fail, Ordering::SeqCst);
    }

    pub fn fail_put(&self, fail: bool) {
        self.fail_put.store(fail, Ordering::SeqCst);
    }

    fn transport(reason: &str) -> AdboardError {
        CacheError::Transport {
            reason: reason.to_string(),
        }
        .into()
    }
}

impl Default for FlakyCacheBackend {
    fn default() -> Self {
        Self::new(Duration::from_secs(300))
    }
}

#[async_trait]
impl CacheBackend for FlakyCacheBackend {
    async fn get(&self, key: &CacheKey) -> AdboardResult<CacheLookup> {
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(Self::transport("connection reset by peer"));
        }
        self.inner.get(key).await
    }

    async fn put(&self, key: &CacheKey, item: &CachedItem, ttl: Duration) -> AdboardResult<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.fail_put.load(Ordering::SeqCst) {
            return Err(Self::transport("READONLY You can't write against a read only replica"));
        }
        self.inner.put(key, item, ttl).await
    }

    fn ttl(&self) -> Duration {
        self.inner.ttl()
    }

    async fn ping(&self) -> AdboardResult<()> {
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(Self::transport("connection reset by peer"));
        }
        Ok(())
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating ADBOARD types.

    use super::*;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;
    use rust_decimal::Decimal;

    /// Store-assigned ids are positive.
    pub fn arb_ad_id() -> impl Strategy<Value = AdId> {
        1i64..1_000_000
    }

    /// Non-negative price with two decimal places.
    pub fn arb_price() -> impl Strategy<Value = rust_decimal::Decimal> {
        (0i64..10_000_000).prop_map(|cents| Decimal::new(cents, 2))
    }

    /// Absolute image URL.
    pub fn arb_image_url() -> impl Strategy<Value = String> {
        "[a-z]{3,10}".prop_map(|name| format!("https://img.example/{}.jpg", name))
    }

    pub fn arb_title() -> impl Strategy<Value = String> {
        "[A-Za-z][A-Za-z0-9 ]{0,40}"
    }

    pub fn arb_sort_key() -> impl Strategy<Value = SortKey> {
        prop_oneof![Just(SortKey::CreatedAt), Just(SortKey::Price)]
    }

    /// Any subset of the optional fields.
    pub fn arb_field_set() -> impl Strategy<Value = RequestedFieldSet> {
        (0u8..4).prop_map(RequestedFieldSet::from_bits_truncate)
    }

    /// A stored ad. The primary image is always the first image URL.
    pub fn arb_ad_item() -> impl Strategy<Value = AdItem> {
        (
            arb_ad_id(),
            arb_title(),
            arb_price(),
            prop::option::of("[a-z ]{0,60}"),
            prop::collection::vec(arb_image_url(), 0..4),
            0i64..2_000_000_000,
        )
            .prop_map(|(id, title, price, description, image_urls, secs)| AdItem {
                id,
                title,
                price,
                description,
                main_image_url: image_urls.first().cloned(),
                image_urls,
                created_at: Utc.timestamp_opt(secs, 0).single().unwrap_or_default(),
            })
    }

    /// A create payload that passes request validation.
    pub fn arb_create_input() -> impl Strategy<Value = CreateAdInput> {
        (
            arb_title(),
            prop::option::of("[a-z ]{0,60}"),
            prop::option::of(prop::collection::vec(arb_image_url(), 0..4)),
            arb_price(),
        )
            .prop_map(|(title, description, image_urls, price)| CreateAdInput {
                title,
                description,
                image_urls,
                price,
            })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built test fixtures for common testing scenarios.

    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    /// A create payload with two images and a description.
    pub fn bike_input() -> CreateAdInput {
        CreateAdInput {
            title: "Road bike".to_string(),
            description: Some("54cm frame, recently serviced".to_string()),
            image_urls: Some(vec![
                "https://img.example/bike-1.jpg".to_string(),
                "https://img.example/bike-2.jpg".to_string(),
            ]),
            price: Decimal::new(45000, 2),
        }
    }

    /// Ad with a fixed creation time `minute` minutes past a fixed epoch.
    pub fn ad_at(id: AdId, price: i64, minute: i64) -> AdItem {
        let base = Utc
            .with_ymd_and_hms(2024, 1, 1, 12, 0, 0)
            .single()
            .unwrap_or_default();
        AdItem {
            id,
            title: format!("Ad {}", id),
            price: Decimal::from(price),
            description: Some(format!("Description of ad {}", id)),
            main_image_url: Some(format!("https://img.example/{}-0.jpg", id)),
            image_urls: vec![
                format!("https://img.example/{}-0.jpg", id),
                format!("https://img.example/{}-1.jpg", id),
            ],
            created_at: base + chrono::Duration::minutes(minute),
        }
    }

    /// Three ads created in id order with prices 20, 30 and 10.
    ///
    /// Ascending by price this lists as `[3, 1, 2]`.
    pub fn three_ads() -> Vec<AdItem> {
        vec![ad_at(1, 20, 0), ad_at(2, 30, 1), ad_at(3, 10, 2)]
    }

    /// In-memory repository holding `ads`.
    pub fn seeded_repository(ads: Vec<AdItem>) -> AdboardResult<InMemoryAdRepository> {
        let repository = InMemoryAdRepository::new();
        for ad in ads {
            repository.insert(ad)?;
        }
        Ok(repository)
    }

    /// Counting repository holding `ads`.
    pub fn seeded_counting_repository(ads: Vec<AdItem>) -> AdboardResult<CountingRepository> {
        let repository = CountingRepository::new();
        for ad in ads {
            repository.inner().insert(ad)?;
        }
        Ok(repository)
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertion helpers for ADBOARD results.

    use super::*;

    /// Assert that an AdboardResult is a Validation error.
    #[track_caller]
    pub fn assert_validation_error<T: std::fmt::Debug>(result: &AdboardResult<T>) {
        match result {
            Err(AdboardError::Validation(_)) => {}
            other => panic!("Expected Validation error, got: {:?}", other),
        }
    }

    /// Assert that an AdboardResult is an UnknownField validation error.
    #[track_caller]
    pub fn assert_unknown_field<T: std::fmt::Debug>(result: &AdboardResult<T>, field: &str) {
        match result {
            Err(AdboardError::Validation(ValidationError::UnknownField { field: f })) => {
                assert_eq!(f, field, "Wrong field in UnknownField error");
            }
            other => panic!("Expected UnknownField({}), got: {:?}", field, other),
        }
    }

    /// Assert that an AdboardResult is a Storage error.
    #[track_caller]
    pub fn assert_storage_error<T: std::fmt::Debug>(result: &AdboardResult<T>) {
        match result {
            Err(AdboardError::Storage(_)) => {}
            other => panic!("Expected Storage error, got: {:?}", other),
        }
    }

    /// Assert that an AdboardResult is a Cache error.
    #[track_caller]
    pub fn assert_cache_error<T: std::fmt::Debug>(result: &AdboardResult<T>) {
        match result {
            Err(AdboardError::Cache(_)) => {}
            other => panic!("Expected Cache error, got: {:?}", other),
        }
    }

    /// Assert that an AdboardResult failed because a dependency did.
    #[track_caller]
    pub fn assert_dependency_failure<T: std::fmt::Debug>(result: &AdboardResult<T>) {
        match result {
            Err(e) if e.is_dependency_failure() => {}
            other => panic!("Expected dependency failure, got: {:?}", other),
        }
    }

    /// Assert that a payload carries exactly the requested optional fields.
    #[track_caller]
    pub fn assert_projected(payload: &ItemPayload, fields: RequestedFieldSet) {
        assert_eq!(
            payload.description.is_some(),
            fields.wants(OptionalField::Description),
            "description presence does not match {:?}",
            fields
        );
        assert_eq!(
            payload.image_urls.is_some(),
            fields.wants(OptionalField::ImageUrls),
            "image_urls presence does not match {:?}",
            fields
        );
    }
}
