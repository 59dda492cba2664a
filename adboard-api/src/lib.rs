//! ADBOARD API - HTTP Layer
//!
//! Axum service exposing the classified-ad endpoints, the Postgres
//! repository adapter, configuration and telemetry. Reads go through the
//! coalescing read-through cache from `adboard-storage`.

pub mod config;
pub mod db;
pub mod error;
pub mod macros;
#[cfg(feature = "openapi")]
pub mod openapi;
pub mod routes;
pub mod state;
pub mod telemetry;
pub mod types;
pub mod validation;

pub use config::{ApiConfig, CacheBackendKind};
pub use db::{DbConfig, PgAdRepository};
pub use error::{ApiError, ApiResult, ErrorCode};
#[cfg(feature = "openapi")]
pub use openapi::ApiDoc;
pub use routes::{create_router, Endpoint};
pub use state::AppState;
pub use types::*;
