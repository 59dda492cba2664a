//! Cache keys for ad entries.
//!
//! One entry per ad, keyed `item:{id}`. The mapping is total and injective:
//! distinct ids always render to distinct keys because the decimal rendering
//! of an `i64` is unique and the prefix is fixed.

use adboard_core::AdId;
use std::fmt;

const PREFIX: &str = "item:";

/// Key of the cache entry holding one ad's [`adboard_core::CachedItem`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    rendered: String,
}

impl CacheKey {
    pub fn for_ad(id: AdId) -> Self {
        Self {
            rendered: format!("{}{}", PREFIX, id),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.rendered
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered)
    }
}
