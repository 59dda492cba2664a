//! REST API Routes Module
//!
//! Includes:
//! - The three ad endpoints under `/api/v{version}/`
//! - Health check endpoints (Kubernetes-compatible)
//! - Prometheus metrics and the OpenAPI document
//!
//! The ad routes come from the closed [`Endpoint`] set and are bound once
//! when the router is built. Unmatched paths get the default 404.

pub mod ads;
pub mod health;

use axum::{
    http::StatusCode,
    middleware::{from_fn, map_response},
    response::{IntoResponse, Response},
    routing::{get, post, MethodRouter},
    Router,
};
use tower_http::timeout::TimeoutLayer;

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::state::AppState;
use crate::telemetry::{metrics_handler, observability_middleware};
use crate::types::ErrorEnvelope;

// ============================================================================
// ENDPOINTS
// ============================================================================

/// The ad endpoints served under the versioned prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    CreateAd,
    GetAd,
    ListAds,
}

impl Endpoint {
    pub const ALL: [Endpoint; 3] = [Endpoint::CreateAd, Endpoint::GetAd, Endpoint::ListAds];

    /// Final path segment.
    pub fn segment(&self) -> &'static str {
        match self {
            Endpoint::CreateAd => "create_ad",
            Endpoint::GetAd => "get_ad",
            Endpoint::ListAds => "list_ads",
        }
    }

    /// Shape of this endpoint's error responses.
    pub fn error_envelope(&self) -> ErrorEnvelope {
        match self {
            Endpoint::CreateAd => ErrorEnvelope::Id,
            Endpoint::GetAd | Endpoint::ListAds => ErrorEnvelope::Result,
        }
    }

    /// Full route path, e.g. `/api/v0.1/get_ad`.
    pub fn path(&self, config: &ApiConfig) -> String {
        format!("{}/{}", config.route_prefix(), self.segment())
    }

    fn handler(&self) -> MethodRouter<AppState> {
        match self {
            Endpoint::CreateAd => post(ads::create_ad),
            Endpoint::GetAd => get(ads::get_ad),
            Endpoint::ListAds => get(ads::list_ads),
        }
    }

    /// Handler bounded by the request timeout, answering a timeout in this
    /// endpoint's error envelope.
    fn bounded_handler(self, config: &ApiConfig) -> MethodRouter<AppState> {
        self.handler()
            .layer(TimeoutLayer::new(config.request_timeout))
            .layer(map_response(move |response: Response| {
                envelope_timeout(self, response)
            }))
    }
}

/// Re-render the timeout layer's empty 408 in the endpoint's envelope.
async fn envelope_timeout(endpoint: Endpoint, response: Response) -> Response {
    if response.status() != StatusCode::REQUEST_TIMEOUT {
        return response;
    }
    tracing::warn!(endpoint = endpoint.segment(), "Request timed out");
    ApiError::request_timeout()
        .in_envelope(endpoint.error_envelope())
        .into_response()
}

// ============================================================================
// OPENAPI ENDPOINT
// ============================================================================

/// Handler for /openapi.json endpoint.
#[cfg(feature = "openapi")]
async fn openapi_json() -> impl axum::response::IntoResponse {
    use utoipa::OpenApi;
    axum::Json(crate::openapi::ApiDoc::openapi())
}

// ============================================================================
// ROUTER
// ============================================================================

/// Build the complete application router.
///
/// Every request is bounded by the configured timeout; a request that
/// times out drops its handler, withdrawing it from any fill it waits on.
/// The ad routes carry their own timeout so the 408 keeps their envelope.
pub fn create_router(state: AppState) -> Router {
    let config = state.config.clone();

    let router = Router::new()
        .nest("/health", health::create_router())
        .route("/metrics", get(metrics_handler));

    #[cfg(feature = "openapi")]
    let router = router.route("/openapi.json", get(openapi_json));

    let mut router = router.layer(TimeoutLayer::new(config.request_timeout));
    for endpoint in Endpoint::ALL {
        router = router.route(&endpoint.path(&config), endpoint.bounded_handler(&config));
    }

    router
        .layer(from_fn(observability_middleware))
        .with_state(state)
}
