//! API Configuration Module
//!
//! Route versioning, pagination, request timeout and cache backend
//! selection. Configuration is loaded from environment variables with
//! defaults suitable for development; a set but malformed variable stops
//! startup with a `ConfigError`.

use std::time::Duration;

use adboard_core::settings::{invalid_setting, parse_positive};
use adboard_core::ConfigError;

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// HTTP surface configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Version segment of every ad route: `/api/v{api_version}/...`.
    pub api_version: String,

    /// Rows per `list_ads` page.
    pub page_size: usize,

    /// Upper bound on a single request, including any cache fill it waits on.
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_version: "0.1".to_string(),
            page_size: 10,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `ADBOARD_API_VERSION`: Route version segment (default: 0.1)
    /// - `ADBOARD_PAGE_SIZE`: Rows per listing page, at least 1 (default: 10)
    /// - `ADBOARD_REQUEST_TIMEOUT_SECS`: Per-request timeout, at least 1 (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load through `lookup`; a present but malformed value is an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            api_version: lookup("ADBOARD_API_VERSION")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.api_version),
            page_size: parse_positive("ADBOARD_PAGE_SIZE", lookup("ADBOARD_PAGE_SIZE").as_deref())?
                .map(|size| size as usize)
                .unwrap_or(defaults.page_size),
            request_timeout: parse_positive(
                "ADBOARD_REQUEST_TIMEOUT_SECS",
                lookup("ADBOARD_REQUEST_TIMEOUT_SECS").as_deref(),
            )?
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout),
        })
    }

    /// Path prefix shared by the ad routes, e.g. `/api/v0.1`.
    pub fn route_prefix(&self) -> String {
        format!("/api/v{}", self.api_version)
    }
}

// ============================================================================
// CACHE BACKEND CONFIGURATION
// ============================================================================

/// Which cache backend the server runs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheBackendKind {
    /// Redis at the given URL.
    Redis { url: String },
    /// Process-local map; entries are lost on restart.
    Memory,
}

impl Default for CacheBackendKind {
    fn default() -> Self {
        Self::Redis {
            url: "redis://127.0.0.1:6379/0".to_string(),
        }
    }
}

impl CacheBackendKind {
    /// Create the backend selection from environment variables.
    ///
    /// - `ADBOARD_CACHE_BACKEND`: `redis` (default) or `memory`
    /// - `ADBOARD_REDIS_URL`: Redis URL (default: redis://127.0.0.1:6379/0)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load through `lookup`; an unrecognised backend name is an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend = lookup("ADBOARD_CACHE_BACKEND");
        match backend.as_deref().map(str::trim) {
            None | Some("") | Some("redis") => {
                Ok(match lookup("ADBOARD_REDIS_URL").filter(|url| !url.is_empty()) {
                    Some(url) => Self::Redis { url },
                    None => Self::default(),
                })
            }
            Some("memory") => Ok(Self::Memory),
            Some(other) => Err(invalid_setting(
                "ADBOARD_CACHE_BACKEND",
                other,
                "expected `redis` or `memory`",
            )),
        }
    }
}
