//! Ad REST API Routes
//!
//! `get_ad` reads through the cache, `list_ads` goes straight to the store
//! and `create_ad` persists then warms the cache. Every failure is answered
//! in the endpoint's own envelope.

use std::sync::Arc;

use adboard_core::CreateAdInput;
use adboard_storage::ReadThroughCache;
use axum::{
    body::Bytes,
    extract::{RawQuery, State},
    Json,
};

use super::Endpoint;
use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::telemetry::METRICS;
use crate::types::{
    CreateAdResponse, GetAdParams, GetAdResponse, ListAdsParams, ListAdsResponse,
};
#[cfg(feature = "openapi")]
use crate::types::{ErrorIdResponse, ErrorResultResponse};
use crate::validation::validate_create_input;

fn in_envelope(endpoint: Endpoint) -> impl FnOnce(ApiError) -> ApiError {
    move |err| err.in_envelope(endpoint.error_envelope())
}

// ============================================================================
// GET AD
// ============================================================================

/// Get one ad, optionally with its description and image URLs.
#[cfg_attr(
    feature = "openapi",
    utoipa::path(
        get,
        path = "/api/v0.1/get_ad",
        tag = "Ads",
        params(
            ("id" = i64, Query, description = "Ad ID"),
            ("fields" = Option<Vec<String>>, Query, description = "Optional fields: description, image_urls (repeated or comma-separated)"),
        ),
        responses(
            (status = 200, description = "Ad details; result is null for an unknown id", body = GetAdResponse),
            (status = 422, description = "Malformed id or unknown field", body = ErrorResultResponse),
            (status = 408, description = "Request exceeded its time limit", body = ErrorResultResponse),
            (status = 500, description = "Cache or store failure", body = ErrorResultResponse),
        ),
    )
)]
pub async fn get_ad(
    State(cache): State<ReadThroughCache>,
    RawQuery(query): RawQuery,
) -> ApiResult<Json<GetAdResponse>> {
    fetch_ad(&cache, query.as_deref())
        .await
        .map(Json)
        .map_err(in_envelope(Endpoint::GetAd))
}

async fn fetch_ad(cache: &ReadThroughCache, query: Option<&str>) -> ApiResult<GetAdResponse> {
    let params = GetAdParams::from_query(query)?;
    let read = cache.get(params.id, params.fields).await?;

    let result = read.map(|read| {
        if let Ok(metrics) = METRICS.as_ref() {
            metrics.record_cache_read(read.source());
        }
        tracing::debug!(
            ad_id = params.id,
            source = read.source().as_str(),
            staleness_ms = read.staleness().as_millis(),
            "Ad served"
        );
        read.into_value()
    });

    Ok(GetAdResponse::success(result))
}

// ============================================================================
// LIST ADS
// ============================================================================

/// List one page of ads.
#[cfg_attr(
    feature = "openapi",
    utoipa::path(
        get,
        path = "/api/v0.1/list_ads",
        tag = "Ads",
        params(
            ("offset" = Option<i64>, Query, description = "Rows to skip, at least 0 (default 0)"),
            ("by" = Option<String>, Query, description = "Sort key: created_at (default) or price"),
            ("asc" = Option<bool>, Query, description = "Ascending order (default true)"),
        ),
        responses(
            (status = 200, description = "One page of ads", body = ListAdsResponse),
            (status = 422, description = "Malformed parameters", body = ErrorResultResponse),
            (status = 408, description = "Request exceeded its time limit", body = ErrorResultResponse),
            (status = 500, description = "Store failure", body = ErrorResultResponse),
        ),
    )
)]
pub async fn list_ads(
    State(cache): State<ReadThroughCache>,
    State(config): State<Arc<ApiConfig>>,
    RawQuery(query): RawQuery,
) -> ApiResult<Json<ListAdsResponse>> {
    fetch_page(&cache, &config, query.as_deref())
        .await
        .map(Json)
        .map_err(in_envelope(Endpoint::ListAds))
}

async fn fetch_page(
    cache: &ReadThroughCache,
    config: &ApiConfig,
    query: Option<&str>,
) -> ApiResult<ListAdsResponse> {
    let params = ListAdsParams::from_query(query)?;
    let page = cache.list(&params.to_query(config.page_size)).await?;
    Ok(ListAdsResponse::success(page))
}

// ============================================================================
// CREATE AD
// ============================================================================

/// Create an ad.
#[cfg_attr(
    feature = "openapi",
    utoipa::path(
        post,
        path = "/api/v0.1/create_ad",
        tag = "Ads",
        request_body = CreateAdInput,
        responses(
            (status = 200, description = "Ad created", body = CreateAdResponse),
            (status = 422, description = "Invalid or unparseable body", body = ErrorIdResponse),
            (status = 408, description = "Request exceeded its time limit", body = ErrorIdResponse),
            (status = 500, description = "Store or cache failure", body = ErrorIdResponse),
        ),
    )
)]
pub async fn create_ad(
    State(cache): State<ReadThroughCache>,
    body: Bytes,
) -> ApiResult<Json<CreateAdResponse>> {
    store_ad(&cache, &body)
        .await
        .map(Json)
        .map_err(in_envelope(Endpoint::CreateAd))
}

async fn store_ad(cache: &ReadThroughCache, body: &[u8]) -> ApiResult<CreateAdResponse> {
    let input: CreateAdInput = serde_json::from_slice(body)?;
    validate_create_input(&input)?;

    let ad = cache.create(&input).await?;
    tracing::info!(ad_id = ad.id, images = ad.image_urls.len(), "Ad created");

    Ok(CreateAdResponse::success(ad.id))
}
