//! Serialized form of cache entries shared by the byte-oriented backends.
//!
//! Entries are JSON objects `{"cached_at": .., "item": {..}}`. The price is
//! carried as a decimal string so it round-trips exactly.

use adboard_core::{AdboardResult, CacheError, CachedItem, Timestamp};
use serde::{Deserialize, Serialize};

use super::key::CacheKey;
use super::traits::CacheEntry;

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    cached_at: Timestamp,
    item: &'a CachedItem,
}

#[derive(Deserialize)]
struct Envelope {
    cached_at: Timestamp,
    item: CachedItem,
}

pub fn encode_entry(
    key: &CacheKey,
    item: &CachedItem,
    cached_at: Timestamp,
) -> AdboardResult<Vec<u8>> {
    serde_json::to_vec(&EnvelopeRef { cached_at, item }).map_err(|e| {
        CacheError::Encode {
            key: key.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

pub fn decode_entry(key: &CacheKey, bytes: &[u8]) -> AdboardResult<CacheEntry> {
    let envelope: Envelope = serde_json::from_slice(bytes).map_err(|e| CacheError::Corrupt {
        key: key.to_string(),
        reason: e.to_string(),
    })?;
    Ok(CacheEntry {
        item: envelope.item,
        cached_at: envelope.cached_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use adboard_core::AdboardError;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn sample() -> CachedItem {
        CachedItem {
            id: 3,
            title: "Desk".to_string(),
            price: Decimal::from_str("0.10").unwrap(),
            main_image_url: None,
            description: String::new(),
            image_urls: vec![],
        }
    }

    #[test]
    fn test_decode_preserves_price_scale() {
        let key = CacheKey::for_ad(3);
        let now = Utc::now();
        let bytes = encode_entry(&key, &sample(), now).unwrap();
        let entry = decode_entry(&key, &bytes).unwrap();

        assert_eq!(entry.item, sample());
        assert_eq!(entry.item.price.to_string(), "0.10");
        assert_eq!(entry.cached_at, now);
    }

    #[test]
    fn test_decode_garbage_is_corrupt() {
        let key = CacheKey::for_ad(3);
        let err = decode_entry(&key, b"{not json").unwrap_err();
        match err {
            AdboardError::Cache(CacheError::Corrupt { key, .. }) => assert_eq!(key, "item:3"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
