//! OpenAPI Specification for ADBOARD API
//!
//! Generated with utoipa from the route annotations and response types.
//! Ad paths are documented under the default version prefix.

use adboard_core::{CreateAdInput, ItemPayload, ListItemPayload};
use utoipa::OpenApi;

use crate::error::{ApiError, ErrorCode};
use crate::routes::{ads, health};
use crate::telemetry::metrics;
use crate::types::{
    CreateAdResponse, ErrorIdResponse, ErrorResultResponse, GetAdResponse, ListAdsResponse,
    ResponseStatus,
};

/// OpenAPI document for ADBOARD API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "ADBOARD API",
        version = "0.1.0",
        description = "Classified-ad service with a coalescing read-through cache",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local Development")
    ),
    tags(
        (name = "Ads", description = "Create, fetch and list classified ads"),
        (name = "Health", description = "Liveness and readiness checks"),
        (name = "Observability", description = "Prometheus metrics")
    ),
    paths(
        ads::get_ad,
        ads::list_ads,
        ads::create_ad,
        health::ping,
        health::liveness,
        health::readiness,
        metrics::metrics_handler,
    ),
    components(
        schemas(
            ApiError, ErrorCode, ResponseStatus,
            GetAdResponse, ListAdsResponse, CreateAdResponse,
            ErrorResultResponse, ErrorIdResponse,
            ItemPayload, ListItemPayload, CreateAdInput,
            health::HealthResponse, health::HealthStatus, health::HealthDetails,
            health::ComponentHealth,
        )
    )
)]
pub struct ApiDoc;

impl ApiDoc {
    /// Generate OpenAPI spec as JSON string.
    pub fn to_json() -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::openapi())
    }
}
