//! ADBOARD API Server Entry Point
//!
//! Bootstraps configuration, prepares the database schema, connects the
//! cache backend and starts the Axum HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;

use adboard_api::telemetry::{init_tracing, TelemetryConfig};
use adboard_api::{
    create_router, ApiConfig, ApiError, ApiResult, AppState, CacheBackendKind, DbConfig,
    PgAdRepository,
};
use adboard_storage::{
    CacheBackend, CacheConfig, InMemoryCacheBackend, ReadThroughCache, RedisCacheBackend,
};

#[tokio::main]
async fn main() -> ApiResult<()> {
    let telemetry_config = TelemetryConfig::default();
    init_tracing(&telemetry_config)?;

    let db_config = DbConfig::from_env()?;
    let repository = PgAdRepository::from_config(&db_config)?;
    repository.migrate().await?;

    let cache_config = CacheConfig::from_env()?;
    let backend: Arc<dyn CacheBackend> = match CacheBackendKind::from_env()? {
        CacheBackendKind::Redis { url } => {
            Arc::new(RedisCacheBackend::connect(&url, cache_config.entry_ttl).await?)
        }
        CacheBackendKind::Memory => {
            tracing::warn!("Using in-process cache backend; entries are not shared");
            let backend = Arc::new(InMemoryCacheBackend::new(cache_config.entry_ttl));
            InMemoryCacheBackend::spawn_purge_task(&backend, cache_config.entry_ttl);
            backend
        }
    };

    let cache = ReadThroughCache::new(backend, Arc::new(repository), cache_config);
    let api_config = ApiConfig::from_env()?;
    let app = create_router(AppState::new(cache, api_config));

    let addr = resolve_bind_addr()?;
    tracing::info!(%addr, "Starting ADBOARD API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

fn resolve_bind_addr() -> ApiResult<SocketAddr> {
    let host = std::env::var("ADBOARD_API_BIND").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port_str = std::env::var("PORT")
        .ok()
        .or_else(|| std::env::var("ADBOARD_API_PORT").ok())
        .unwrap_or_else(|| "3000".to_string());
    let port = port_str
        .parse::<u16>()
        .map_err(|_| ApiError::invalid_input(format!("Invalid port value: {}", port_str)))?;

    let addr = format!("{}:{}", host, port);
    addr.parse::<SocketAddr>()
        .map_err(|e| ApiError::invalid_input(format!("Invalid bind address {}: {}", addr, e)))
}
