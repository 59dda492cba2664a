//! Shared application state for Axum routers.

use std::sync::Arc;
use std::time::Instant;

use adboard_storage::ReadThroughCache;

use crate::config::ApiConfig;

/// Application-wide state shared across all routes.
///
/// Built once at startup and injected into handlers; nothing here is global.
#[derive(Clone)]
pub struct AppState {
    /// Read-through coordinator over the cache backend and the repository.
    pub cache: ReadThroughCache,
    pub config: Arc<ApiConfig>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(cache: ReadThroughCache, config: ApiConfig) -> Self {
        Self {
            cache,
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }
}

crate::impl_from_ref!(ReadThroughCache, cache);
crate::impl_from_ref!(Arc<ApiConfig>, config);
crate::impl_from_ref!(Instant, start_time);
