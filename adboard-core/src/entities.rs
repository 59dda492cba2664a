//! Ad entity types and their wire/cache shapes.

use crate::{AdId, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Canonical, store-resident classified ad.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdItem {
    pub id: AdId,
    pub title: String,
    pub price: Decimal,
    pub description: Option<String>,
    pub main_image_url: Option<String>,
    pub image_urls: Vec<String>,
    pub created_at: Timestamp,
}

/// The maximal cacheable projection of an [`AdItem`].
///
/// Every cache entry has this shape regardless of which fields the request
/// that populated it asked for. Narrowing only ever happens on the way out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedItem {
    pub id: AdId,
    pub title: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    pub main_image_url: Option<String>,
    pub description: String,
    pub image_urls: Vec<String>,
}

impl From<&AdItem> for CachedItem {
    fn from(item: &AdItem) -> Self {
        Self {
            id: item.id,
            title: item.title.clone(),
            price: item.price,
            main_image_url: item.main_image_url.clone(),
            description: item.description.clone().unwrap_or_default(),
            image_urls: item.image_urls.clone(),
        }
    }
}

impl From<AdItem> for CachedItem {
    fn from(item: AdItem) -> Self {
        Self {
            id: item.id,
            title: item.title,
            price: item.price,
            main_image_url: item.main_image_url,
            description: item.description.unwrap_or_default(),
            image_urls: item.image_urls,
        }
    }
}

/// Single-item response payload.
///
/// `description` and `image_urls` are `Some` exactly when the client asked
/// for them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ItemPayload {
    pub id: AdId,
    pub title: String,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    #[cfg_attr(feature = "openapi", schema(value_type = f64))]
    pub price: Decimal,
    pub main_image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_urls: Option<Vec<String>>,
}

/// Row shape returned by `list_ads`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ListItemPayload {
    pub id: AdId,
    pub title: String,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    #[cfg_attr(feature = "openapi", schema(value_type = f64))]
    pub price: Decimal,
    pub main_image_url: Option<String>,
}

impl From<&AdItem> for ListItemPayload {
    fn from(item: &AdItem) -> Self {
        Self {
            id: item.id,
            title: item.title.clone(),
            price: item.price,
            main_image_url: item.main_image_url.clone(),
        }
    }
}

/// Input for ad creation, as accepted by `create_ad`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateAdInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_urls: Option<Vec<String>>,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    #[cfg_attr(feature = "openapi", schema(value_type = f64))]
    pub price: Decimal,
}

impl CreateAdInput {
    /// The primary image is the first listed image URL.
    pub fn main_image_url(&self) -> Option<&str> {
        self.image_urls
            .as_ref()
            .and_then(|urls| urls.first())
            .map(String::as_str)
    }

    /// Image URLs in submission order (empty when none were given).
    pub fn image_urls(&self) -> &[String] {
        self.image_urls.as_deref().unwrap_or(&[])
    }
}
