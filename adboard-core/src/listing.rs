//! Listing contract: sort keys, page requests and the total order.

use crate::entities::AdItem;
use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Column a listing is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    CreatedAt,
    Price,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::CreatedAt => "created_at",
            SortKey::Price => "price",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created_at" => Ok(SortKey::CreatedAt),
            "price" => Ok(SortKey::Price),
            other => Err(ValidationError::InvalidValue {
                field: "by".to_string(),
                reason: format!("expected created_at or price, got '{}'", other),
            }),
        }
    }
}

/// One page of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListQuery {
    pub offset: usize,
    pub limit: usize,
    pub sort: SortKey,
    pub ascending: bool,
}

impl ListQuery {
    pub fn new(offset: usize, limit: usize) -> Self {
        Self {
            offset,
            limit,
            sort: SortKey::default(),
            ascending: true,
        }
    }

    pub fn sorted_by(mut self, sort: SortKey, ascending: bool) -> Self {
        self.sort = sort;
        self.ascending = ascending;
        self
    }
}

/// Total order used by every listing.
///
/// The sort key honours `ascending`; ties always fall back to the
/// identifier in ascending order.
pub fn listing_order(a: &AdItem, b: &AdItem, sort: SortKey, ascending: bool) -> Ordering {
    let primary = match sort {
        SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
        SortKey::Price => a.price.cmp(&b.price),
    };
    let primary = if ascending { primary } else { primary.reverse() };
    primary.then_with(|| a.id.cmp(&b.id))
}

/// Sort `items` and cut out the page described by `query`.
///
/// An offset past the end yields an empty page.
pub fn paginate(mut items: Vec<AdItem>, query: &ListQuery) -> Vec<AdItem> {
    items.sort_by(|a, b| listing_order(a, b, query.sort, query.ascending));
    items
        .into_iter()
        .skip(query.offset)
        .take(query.limit)
        .collect()
}
