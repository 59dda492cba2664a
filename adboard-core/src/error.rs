//! Error types for ADBOARD operations

use crate::AdId;
use std::time::Duration;
use thiserror::Error;

/// Persistent store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Ad not found: {id}")]
    NotFound { id: AdId },

    #[error("Insert failed: {reason}")]
    InsertFailed { reason: String },

    #[error("Query failed: {reason}")]
    QueryFailed { reason: String },

    #[error("Connection unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Cache layer errors.
///
/// A cache *miss* is never an error; see `CacheLookup::Miss`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache transport failure: {reason}")]
    Transport { reason: String },

    #[error("Cache payload for {key} could not be decoded: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("Cache payload for {key} could not be encoded: {reason}")]
    Encode { key: String, reason: String },

    #[error("Cache fill for {key} timed out after {elapsed:?}")]
    FillTimeout { key: String, elapsed: Duration },

    #[error("Cache lock poisoned")]
    LockPoisoned,
}

/// Client input validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Field is not selectable: {field}")]
    UnknownField { field: String },
}

/// Configuration errors raised while loading settings at startup.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all ADBOARD errors.
///
/// `Clone` so a single outcome can be handed to every caller waiting on the
/// same coalesced cache fill.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AdboardError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl AdboardError {
    /// True for failures of the cache or the persistent store.
    pub fn is_dependency_failure(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Cache(_))
    }
}

/// Result type alias for ADBOARD operations.
pub type AdboardResult<T> = Result<T, AdboardError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_display_not_found() {
        let err = StorageError::NotFound { id: 42 };
        let msg = format!("{}", err);
        assert!(msg.contains("Ad not found"));
        assert!(msg.contains("42"));
    }

    #[test]
    fn test_cache_error_display_corrupt() {
        let err = CacheError::Corrupt {
            key: "item:7".to_string(),
            reason: "expected value".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("item:7"));
        assert!(msg.contains("expected value"));
    }

    #[test]
    fn test_cache_error_display_fill_timeout() {
        let err = CacheError::FillTimeout {
            key: "item:1".to_string(),
            elapsed: Duration::from_millis(250),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("timed out"));
        assert!(msg.contains("250ms"));
    }

    #[test]
    fn test_validation_error_display_unknown_field() {
        let err = ValidationError::UnknownField {
            field: "bogus".to_string(),
        };
        assert_eq!(format!("{}", err), "Field is not selectable: bogus");
    }

    #[test]
    fn test_adboard_error_from_variants() {
        let storage = AdboardError::from(StorageError::LockPoisoned);
        assert!(matches!(storage, AdboardError::Storage(_)));
        assert!(storage.is_dependency_failure());

        let cache = AdboardError::from(CacheError::LockPoisoned);
        assert!(matches!(cache, AdboardError::Cache(_)));
        assert!(cache.is_dependency_failure());

        let validation = AdboardError::from(ValidationError::InvalidValue {
            field: "title".to_string(),
            reason: "must not be empty".to_string(),
        });
        assert!(matches!(validation, AdboardError::Validation(_)));
        assert!(!validation.is_dependency_failure());

        let config = AdboardError::from(ConfigError::InvalidValue {
            field: "ADBOARD_PAGE_SIZE".to_string(),
            value: "abc".to_string(),
            reason: "invalid digit found in string".to_string(),
        });
        assert!(matches!(config, AdboardError::Config(_)));
        assert!(!config.is_dependency_failure());
    }
}
