//! Database Connection Pool Module
//!
//! PostgreSQL connection pooling using deadpool-postgres, and the Postgres
//! implementation of [`AdRepository`].
//!
//! Ads live in `ads`; their image URLs live in `ad_images`, one row per URL
//! with its position in the submitted list.

use std::time::Duration;

use adboard_core::{
    AdId, AdItem, AdboardError, AdboardResult, ConfigError, CreateAdInput, ListItemPayload,
    ListQuery, SortKey, StorageError,
};
use adboard_core::settings::{parse_positive, parse_setting};
use adboard_storage::AdRepository;
use async_trait::async_trait;
use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime};
use tokio_postgres::NoTls;

use crate::error::{ApiError, ApiResult};

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

/// Database connection pool configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Full connection string; overrides the discrete fields when set
    pub url: Option<String>,
    /// PostgreSQL host
    pub host: String,
    /// PostgreSQL port
    pub port: u16,
    /// Database name
    pub dbname: String,
    /// Database user
    pub user: String,
    /// Database password
    pub password: String,
    /// Maximum pool size
    pub max_size: usize,
    /// How long to wait for a pooled connection
    pub timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".to_string(),
            port: 5432,
            dbname: "adboard".to_string(),
            user: "postgres".to_string(),
            password: "".to_string(),
            max_size: 16,
            timeout: Duration::from_secs(30),
        }
    }
}

impl DbConfig {
    /// Create a new database configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load through `lookup`; a present but malformed number is an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let text = |name: &str| lookup(name).filter(|v| !v.is_empty());
        Ok(Self {
            url: text("ADBOARD_DB_URL"),
            host: text("ADBOARD_DB_HOST").unwrap_or(defaults.host),
            port: parse_setting("ADBOARD_DB_PORT", lookup("ADBOARD_DB_PORT").as_deref())?
                .unwrap_or(defaults.port),
            dbname: text("ADBOARD_DB_NAME").unwrap_or(defaults.dbname),
            user: text("ADBOARD_DB_USER").unwrap_or(defaults.user),
            password: lookup("ADBOARD_DB_PASSWORD").unwrap_or_default(),
            max_size: parse_positive(
                "ADBOARD_DB_POOL_SIZE",
                lookup("ADBOARD_DB_POOL_SIZE").as_deref(),
            )?
            .map(|size| size as usize)
            .unwrap_or(defaults.max_size),
            timeout: parse_setting("ADBOARD_DB_TIMEOUT", lookup("ADBOARD_DB_TIMEOUT").as_deref())?
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        })
    }

    /// Create a connection pool from this configuration.
    pub fn create_pool(&self) -> ApiResult<Pool> {
        let mut cfg = Config::new();
        match &self.url {
            Some(url) => cfg.url = Some(url.clone()),
            None => {
                cfg.host = Some(self.host.clone());
                cfg.port = Some(self.port);
                cfg.dbname = Some(self.dbname.clone());
                cfg.user = Some(self.user.clone());
                cfg.password = Some(self.password.clone());
            }
        }

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let mut pool_cfg = PoolConfig::new(self.max_size);
        pool_cfg.timeouts.wait = Some(self.timeout);
        cfg.pool = Some(pool_cfg);

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| ApiError::database_error(format!("Failed to create pool: {}", e)))?;

        Ok(pool)
    }
}

// ============================================================================
// SCHEMA
// ============================================================================

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS ads (
    id             BIGSERIAL PRIMARY KEY,
    title          TEXT        NOT NULL,
    description    TEXT,
    price          NUMERIC     NOT NULL CHECK (price >= 0),
    main_image_url TEXT,
    created_at     TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS ad_images (
    ad_id    BIGINT  NOT NULL REFERENCES ads (id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    url      TEXT    NOT NULL,
    PRIMARY KEY (ad_id, position)
);

CREATE INDEX IF NOT EXISTS ads_price_id_idx ON ads (price, id);
CREATE INDEX IF NOT EXISTS ads_created_at_id_idx ON ads (created_at, id);
"#;

/// `ORDER BY` clause for a listing. Column names come from a closed set.
fn order_clause(sort: SortKey, ascending: bool) -> String {
    let column = match sort {
        SortKey::CreatedAt => "created_at",
        SortKey::Price => "price",
    };
    let direction = if ascending { "ASC" } else { "DESC" };
    format!("ORDER BY {} {}, id ASC", column, direction)
}

fn query_failed(err: tokio_postgres::Error) -> AdboardError {
    StorageError::QueryFailed {
        reason: err.to_string(),
    }
    .into()
}

fn insert_failed(err: tokio_postgres::Error) -> AdboardError {
    StorageError::InsertFailed {
        reason: err.to_string(),
    }
    .into()
}

// ============================================================================
// POSTGRES REPOSITORY
// ============================================================================

/// [`AdRepository`] backed by a Postgres connection pool.
#[derive(Clone)]
pub struct PgAdRepository {
    pool: Pool,
}

impl PgAdRepository {
    /// Create a new repository with the given pool.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Create a new repository from configuration.
    pub fn from_config(config: &DbConfig) -> ApiResult<Self> {
        let pool = config.create_pool()?;
        Ok(Self::new(pool))
    }

    /// Get the current pool size for observability.
    pub fn pool_size(&self) -> usize {
        self.pool.status().size
    }

    /// Create the tables if they do not exist yet.
    pub async fn migrate(&self) -> ApiResult<()> {
        let conn = self.pool.get().await?;
        conn.batch_execute(SCHEMA).await?;
        tracing::info!("Database schema ready");
        Ok(())
    }

    async fn conn(&self) -> AdboardResult<deadpool_postgres::Object> {
        self.pool.get().await.map_err(|e| {
            StorageError::Unavailable {
                reason: e.to_string(),
            }
            .into()
        })
    }
}

impl std::fmt::Debug for PgAdRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgAdRepository")
            .field("pool_size", &self.pool_size())
            .finish()
    }
}

#[async_trait]
impl AdRepository for PgAdRepository {
    async fn get_by_id(&self, id: AdId) -> AdboardResult<Option<AdItem>> {
        let conn = self.conn().await?;
        let row = conn
            .query_opt(
                "SELECT id, title, description, price, main_image_url, created_at \
                 FROM ads WHERE id = $1",
                &[&id],
            )
            .await
            .map_err(query_failed)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let images = conn
            .query(
                "SELECT url FROM ad_images WHERE ad_id = $1 ORDER BY position",
                &[&id],
            )
            .await
            .map_err(query_failed)?;
        let image_urls = images
            .iter()
            .map(|image| image.try_get::<_, String>("url"))
            .collect::<Result<Vec<_>, _>>()
            .map_err(query_failed)?;

        Ok(Some(AdItem {
            id: row.try_get("id").map_err(query_failed)?,
            title: row.try_get("title").map_err(query_failed)?,
            description: row.try_get("description").map_err(query_failed)?,
            price: row.try_get("price").map_err(query_failed)?,
            main_image_url: row.try_get("main_image_url").map_err(query_failed)?,
            image_urls,
            created_at: row.try_get("created_at").map_err(query_failed)?,
        }))
    }

    async fn create(&self, input: &CreateAdInput) -> AdboardResult<AdItem> {
        let mut conn = self.conn().await?;
        let tx = conn.transaction().await.map_err(insert_failed)?;

        let main_image_url = input.main_image_url();
        let row = tx
            .query_one(
                "INSERT INTO ads (title, description, price, main_image_url) \
                 VALUES ($1, $2, $3, $4) RETURNING id, created_at",
                &[&input.title, &input.description, &input.price, &main_image_url],
            )
            .await
            .map_err(insert_failed)?;
        let id: AdId = row.try_get("id").map_err(insert_failed)?;

        for (position, url) in input.image_urls().iter().enumerate() {
            let position = i32::try_from(position).map_err(|_| StorageError::InsertFailed {
                reason: "too many image urls".to_string(),
            })?;
            tx.execute(
                "INSERT INTO ad_images (ad_id, position, url) VALUES ($1, $2, $3)",
                &[&id, &position, url],
            )
            .await
            .map_err(insert_failed)?;
        }

        tx.commit().await.map_err(insert_failed)?;
        tracing::debug!(ad_id = id, "Ad persisted");

        Ok(AdItem {
            id,
            title: input.title.clone(),
            price: input.price,
            description: input.description.clone(),
            main_image_url: main_image_url.map(str::to_string),
            image_urls: input.image_urls().to_vec(),
            created_at: row.try_get("created_at").map_err(insert_failed)?,
        })
    }

    async fn list(&self, query: &ListQuery) -> AdboardResult<Vec<ListItemPayload>> {
        let conn = self.conn().await?;
        let sql = format!(
            "SELECT id, title, price, main_image_url FROM ads {} LIMIT $1 OFFSET $2",
            order_clause(query.sort, query.ascending)
        );
        let limit = i64::try_from(query.limit).unwrap_or(i64::MAX);
        let offset = i64::try_from(query.offset).unwrap_or(i64::MAX);

        let rows = conn
            .query(sql.as_str(), &[&limit, &offset])
            .await
            .map_err(query_failed)?;

        rows.iter()
            .map(|row| -> AdboardResult<ListItemPayload> {
                Ok(ListItemPayload {
                    id: row.try_get("id").map_err(query_failed)?,
                    title: row.try_get("title").map_err(query_failed)?,
                    price: row.try_get("price").map_err(query_failed)?,
                    main_image_url: row.try_get("main_image_url").map_err(query_failed)?,
                })
            })
            .collect()
    }

    async fn ping(&self) -> AdboardResult<()> {
        let conn = self.conn().await?;
        conn.query_one("SELECT 1", &[]).await.map_err(query_failed)?;
        Ok(())
    }
}
