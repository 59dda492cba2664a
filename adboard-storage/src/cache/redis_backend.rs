//! Redis cache backend.
//!
//! Entries live under their plain `item:{id}` key with a server-side expiry.
//! The connection manager reconnects on its own after transport failures.

use std::time::Duration;

use adboard_core::{AdboardResult, CacheError, CachedItem};
use async_trait::async_trait;
use chrono::Utc;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{debug, info};

use super::codec::{decode_entry, encode_entry};
use super::key::CacheKey;
use super::traits::{CacheBackend, CacheLookup};

fn transport(err: redis::RedisError) -> CacheError {
    CacheError::Transport {
        reason: err.to_string(),
    }
}

/// Cache backend talking to a Redis server.
#[derive(Clone)]
pub struct RedisCacheBackend {
    conn: ConnectionManager,
    ttl: Duration,
}

impl RedisCacheBackend {
    /// Open a managed connection to `url` and verify it with a PING.
    pub async fn connect(url: &str, ttl: Duration) -> AdboardResult<Self> {
        let client = redis::Client::open(url).map_err(transport)?;
        let conn = ConnectionManager::new(client).await.map_err(transport)?;
        let backend = Self { conn, ttl };
        backend.ping().await?;
        info!(ttl_secs = ttl.as_secs(), "Connected to Redis cache");
        Ok(backend)
    }
}

#[async_trait]
impl CacheBackend for RedisCacheBackend {
    async fn get(&self, key: &CacheKey) -> AdboardResult<CacheLookup> {
        let mut conn = self.conn.clone();
        let bytes: Option<Vec<u8>> = conn.get(key.as_str()).await.map_err(transport)?;
        match bytes {
            Some(bytes) => decode_entry(key, &bytes).map(CacheLookup::Hit),
            None => {
                debug!(key = %key, "Redis cache miss");
                Ok(CacheLookup::Miss)
            }
        }
    }

    async fn put(&self, key: &CacheKey, item: &CachedItem, ttl: Duration) -> AdboardResult<()> {
        let bytes = encode_entry(key, item, Utc::now())?;
        // SETEX rejects a zero expiry.
        let seconds = ttl.as_secs().max(1);
        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(key.as_str(), bytes, seconds)
            .await
            .map_err(transport)?;
        Ok(())
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }

    async fn ping(&self) -> AdboardResult<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(transport)?;
        Ok(())
    }
}

impl std::fmt::Debug for RedisCacheBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCacheBackend")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
