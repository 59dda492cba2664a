//! ADBOARD Core - Entity Types
//!
//! Pure data structures and the pure functions over them: field selection,
//! projection and listing order. All other crates depend on this.
//! No I/O lives here.

use chrono::{DateTime, Utc};

pub mod entities;
pub mod error;
pub mod fields;
pub mod listing;
pub mod projection;
pub mod settings;

/// Store-assigned ad identifier.
pub type AdId = i64;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

pub use entities::{AdItem, CachedItem, CreateAdInput, ItemPayload, ListItemPayload};
pub use error::{
    AdboardError, AdboardResult, CacheError, ConfigError, StorageError, ValidationError,
};
pub use fields::{FieldSelector, OptionalField, RequestedFieldSet};
pub use listing::{listing_order, paginate, ListQuery, SortKey};
pub use projection::Project;
