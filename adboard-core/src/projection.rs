//! Response-boundary projection.
//!
//! Narrows a full (or already narrowed) item down to the always-present
//! fields plus the requested optional ones. Inputs are borrowed and never
//! modified.

use crate::entities::{AdItem, CachedItem, ItemPayload};
use crate::fields::{OptionalField, RequestedFieldSet};

/// Types that can be narrowed into an [`ItemPayload`].
pub trait Project {
    fn project(&self, fields: RequestedFieldSet) -> ItemPayload;
}

impl Project for CachedItem {
    fn project(&self, fields: RequestedFieldSet) -> ItemPayload {
        ItemPayload {
            id: self.id,
            title: self.title.clone(),
            price: self.price,
            main_image_url: self.main_image_url.clone(),
            description: fields
                .wants(OptionalField::Description)
                .then(|| self.description.clone()),
            image_urls: fields
                .wants(OptionalField::ImageUrls)
                .then(|| self.image_urls.clone()),
        }
    }
}

impl Project for AdItem {
    fn project(&self, fields: RequestedFieldSet) -> ItemPayload {
        ItemPayload {
            id: self.id,
            title: self.title.clone(),
            price: self.price,
            main_image_url: self.main_image_url.clone(),
            description: fields
                .wants(OptionalField::Description)
                .then(|| self.description.clone().unwrap_or_default()),
            image_urls: fields
                .wants(OptionalField::ImageUrls)
                .then(|| self.image_urls.clone()),
        }
    }
}

/// Narrowing only: a field the payload no longer carries stays absent.
impl Project for ItemPayload {
    fn project(&self, fields: RequestedFieldSet) -> ItemPayload {
        ItemPayload {
            id: self.id,
            title: self.title.clone(),
            price: self.price,
            main_image_url: self.main_image_url.clone(),
            description: self
                .description
                .clone()
                .filter(|_| fields.wants(OptionalField::Description)),
            image_urls: self
                .image_urls
                .clone()
                .filter(|_| fields.wants(OptionalField::ImageUrls)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;
    use rust_decimal::Decimal;

    fn cached() -> CachedItem {
        CachedItem {
            id: 3,
            title: "Desk".to_string(),
            price: Decimal::new(4999, 2),
            main_image_url: Some("https://img.example/desk.jpg".to_string()),
            description: "Oak".to_string(),
            image_urls: vec!["https://img.example/desk.jpg".to_string()],
        }
    }

    #[test]
    fn test_empty_set_drops_optional_fields() {
        let payload = cached().project(RequestedFieldSet::empty());
        assert_eq!(payload.id, 3);
        assert_eq!(payload.title, "Desk");
        assert_eq!(payload.price, Decimal::new(4999, 2));
        assert!(payload.main_image_url.is_some());
        assert!(payload.description.is_none());
        assert!(payload.image_urls.is_none());
    }

    #[test]
    fn test_requested_empty_values_stay_present() {
        let mut item = cached();
        item.description.clear();
        item.image_urls.clear();

        let payload = item.project(RequestedFieldSet::maximal());
        assert_eq!(payload.description.as_deref(), Some(""));
        assert_eq!(payload.image_urls, Some(vec![]));
    }

    #[test]
    fn test_ad_item_and_cached_item_project_identically() {
        let ad = AdItem {
            id: 5,
            title: "Kettle".to_string(),
            price: Decimal::new(20, 0),
            description: None,
            main_image_url: None,
            image_urls: vec![],
            created_at: Utc::now(),
        };
        for mask in 0u8..4 {
            let fields = RequestedFieldSet::from_bits_truncate(mask);
            assert_eq!(ad.project(fields), CachedItem::from(&ad).project(fields));
        }
    }

    #[test]
    fn test_projection_does_not_touch_input() {
        let item = cached();
        let before = item.clone();
        let _ = item.project(RequestedFieldSet::empty());
        assert_eq!(item, before);
    }

    fn arb_cached_item() -> impl Strategy<Value = CachedItem> {
        (
            1i64..1_000_000,
            "[A-Za-z ]{1,24}",
            0i64..10_000_000,
            proptest::option::of("https://img\\.example/[a-z]{1,8}\\.png"),
            ".{0,40}",
            proptest::collection::vec("https://img\\.example/[a-z]{1,8}\\.png", 0..4),
        )
            .prop_map(|(id, title, cents, main_image_url, description, image_urls)| CachedItem {
                id,
                title,
                price: Decimal::new(cents, 2),
                main_image_url,
                description,
                image_urls,
            })
    }

    proptest! {
        #[test]
        fn prop_projection_is_idempotent(item in arb_cached_item(), mask in 0u8..4) {
            let fields = RequestedFieldSet::from_bits_truncate(mask);
            let once = item.project(fields);
            let twice = once.project(fields);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_exactly_requested_fields_present(item in arb_cached_item(), mask in 0u8..4) {
            let fields = RequestedFieldSet::from_bits_truncate(mask);
            let json = serde_json::to_value(item.project(fields)).unwrap();
            let obj = json.as_object().unwrap();

            for always in ["id", "title", "price", "main_image_url"] {
                prop_assert!(obj.contains_key(always));
            }
            prop_assert_eq!(obj.contains_key("description"), fields.wants(OptionalField::Description));
            prop_assert_eq!(obj.contains_key("image_urls"), fields.wants(OptionalField::ImageUrls));
            prop_assert_eq!(obj.len(), 4 + fields.bits().count_ones() as usize);
        }
    }
}
