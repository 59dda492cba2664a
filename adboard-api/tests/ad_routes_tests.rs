//! Router-level tests for the ad endpoints, health checks and fallbacks.
//!
//! Everything runs against the in-memory doubles from adboard-test-utils,
//! so no database or Redis is needed.

use std::sync::Arc;
use std::time::Duration;

use adboard_api::{create_router, ApiConfig, AppState};
use adboard_storage::{CacheConfig, ReadThroughCache};
use adboard_test_utils::fixtures::{bike_input, seeded_counting_repository, three_ads};
use adboard_test_utils::{CountingRepository, FlakyCacheBackend};
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

struct Harness {
    router: Router,
    repo: Arc<CountingRepository>,
    cache: Arc<FlakyCacheBackend>,
}

fn harness_with(repo: CountingRepository, cache_config: CacheConfig) -> Harness {
    harness_with_api(repo, cache_config, ApiConfig::default())
}

fn harness_with_api(
    repo: CountingRepository,
    cache_config: CacheConfig,
    api_config: ApiConfig,
) -> Harness {
    let repo = Arc::new(repo);
    let cache = Arc::new(FlakyCacheBackend::new(cache_config.entry_ttl));
    let read_through = ReadThroughCache::new(cache.clone(), repo.clone(), cache_config);
    let router = create_router(AppState::new(read_through, api_config));
    Harness {
        router,
        repo,
        cache,
    }
}

fn harness() -> Harness {
    let repo = seeded_counting_repository(three_ads()).unwrap();
    harness_with(repo, CacheConfig::default())
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(router, request).await
}

async fn post(router: &Router, uri: &str, body: impl Into<Body>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap();
    send(router, request).await
}

fn ids(body: &Value) -> Vec<i64> {
    body["result"]
        .as_array()
        .map(|rows| rows.iter().filter_map(|row| row["id"].as_i64()).collect())
        .unwrap_or_default()
}

// ============================================================================
// GET AD
// ============================================================================

#[tokio::test]
async fn test_get_ad_miss_then_hit() {
    let h = harness();

    let (status, body) = get(&h.router, "/api/v0.1/get_ad?id=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["result"]["id"], 1);
    assert_eq!(body["result"]["title"], "Ad 1");
    assert_eq!(body["result"]["price"].as_f64(), Some(20.0));
    assert_eq!(body["result"]["main_image_url"], "https://img.example/1-0.jpg");
    assert_eq!(h.repo.fetches(), 1);
    assert_eq!(h.cache.writes(), 1);

    let (status, again) = get(&h.router, "/api/v0.1/get_ad?id=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again, body);
    assert_eq!(h.repo.fetches(), 1, "second read must be served from cache");
}

#[tokio::test]
async fn test_get_ad_omits_optional_fields_by_default() {
    let h = harness();
    let (_, body) = get(&h.router, "/api/v0.1/get_ad?id=2").await;
    let result = body["result"].as_object().unwrap();
    assert!(!result.contains_key("description"));
    assert!(!result.contains_key("image_urls"));
}

#[tokio::test]
async fn test_get_ad_projects_requested_fields() {
    let h = harness();

    let (status, body) = get(&h.router, "/api/v0.1/get_ad?id=2&fields=description").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["description"], "Description of ad 2");
    assert!(body["result"].get("image_urls").is_none());

    // The cached entry is maximal, so a wider request is still a hit.
    let (status, body) = get(
        &h.router,
        "/api/v0.1/get_ad?id=2&fields=image_urls&fields=description",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["result"]["image_urls"],
        json!(["https://img.example/2-0.jpg", "https://img.example/2-1.jpg"])
    );
    assert_eq!(body["result"]["description"], "Description of ad 2");
    assert_eq!(h.repo.fetches(), 1);
}

#[tokio::test]
async fn test_get_ad_accepts_comma_separated_fields() {
    let h = harness();
    let (status, body) = get(&h.router, "/api/v0.1/get_ad?id=3&fields=description,image_urls").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["result"]["description"].is_string());
    assert!(body["result"]["image_urls"].is_array());
}

#[tokio::test]
async fn test_get_ad_unknown_id_is_null_result() {
    let h = harness();
    let (status, body) = get(&h.router, "/api/v0.1/get_ad?id=999").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "success", "result": null}));
    assert_eq!(h.cache.writes(), 0);
}

#[tokio::test]
async fn test_get_ad_unknown_field_is_rejected() {
    let h = harness();
    let (status, body) = get(&h.router, "/api/v0.1/get_ad?id=1&fields=bogus").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body, json!({"status": "error", "result": null}));
    assert_eq!(h.repo.fetches(), 0);
}

#[tokio::test]
async fn test_get_ad_bad_id_is_rejected() {
    let h = harness();
    for uri in ["/api/v0.1/get_ad", "/api/v0.1/get_ad?id=abc", "/api/v0.1/get_ad?id="] {
        let (status, body) = get(&h.router, uri).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{}", uri);
        assert_eq!(body, json!({"status": "error", "result": null}), "{}", uri);
    }
}

#[tokio::test]
async fn test_get_ad_store_failure_is_500() {
    let h = harness();
    h.repo.fail_reads(true);
    let (status, body) = get(&h.router, "/api/v0.1/get_ad?id=1").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"status": "error", "result": null}));
}

#[tokio::test]
async fn test_get_ad_cache_lookup_failure_is_500() {
    let h = harness();
    h.cache.fail_get(true);
    let (status, body) = get(&h.router, "/api/v0.1/get_ad?id=1").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"status": "error", "result": null}));
    assert_eq!(h.repo.fetches(), 0, "lookup failures must not fall through to the store");
}

#[tokio::test]
async fn test_get_ad_cache_write_failure_is_500() {
    let h = harness();
    h.cache.fail_put(true);
    let (status, _) = get(&h.router, "/api/v0.1/get_ad?id=1").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_get_ad_fill_timeout_is_500() {
    let repo = seeded_counting_repository(three_ads())
        .unwrap()
        .with_fetch_delay(Duration::from_millis(500));
    let config = CacheConfig::default().with_fill_timeout(Duration::from_millis(20));
    let h = harness_with(repo, config);

    let (status, body) = get(&h.router, "/api/v0.1/get_ad?id=1").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"status": "error", "result": null}));
}

#[tokio::test]
async fn test_get_ad_request_timeout_keeps_envelope() {
    let repo = seeded_counting_repository(three_ads())
        .unwrap()
        .with_fetch_delay(Duration::from_millis(500));
    let api_config = ApiConfig {
        request_timeout: Duration::from_millis(20),
        ..ApiConfig::default()
    };
    let h = harness_with_api(repo, CacheConfig::default(), api_config);

    let (status, body) = get(&h.router, "/api/v0.1/get_ad?id=1").await;
    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    assert_eq!(body, json!({"status": "error", "result": null}));

    // Fast routes under the same limit are unaffected.
    let (status, body) = get(&h.router, "/api/v0.1/list_ads").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec![1, 2, 3]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_get_ad_misses_fetch_once() {
    let repo = seeded_counting_repository(three_ads())
        .unwrap()
        .with_fetch_delay(Duration::from_millis(50));
    let h = harness_with(repo, CacheConfig::default());

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let router = h.router.clone();
            let uri = if i % 2 == 0 {
                "/api/v0.1/get_ad?id=2"
            } else {
                "/api/v0.1/get_ad?id=2&fields=description"
            };
            tokio::spawn(async move { get(&router, uri).await })
        })
        .collect();

    for handle in handles {
        let (status, body) = handle.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"]["id"], 2);
    }
    assert_eq!(h.repo.fetches(), 1);
    assert_eq!(h.cache.writes(), 1);
}

// ============================================================================
// LIST ADS
// ============================================================================

#[tokio::test]
async fn test_list_ads_defaults_to_created_at_ascending() {
    let h = harness();
    let (status, body) = get(&h.router, "/api/v0.1/list_ads").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(ids(&body), vec![1, 2, 3]);

    let row = body["result"][0].as_object().unwrap();
    let mut keys: Vec<&str> = row.keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(keys, vec!["id", "main_image_url", "price", "title"]);
}

#[tokio::test]
async fn test_list_ads_sorted_by_price() {
    let h = harness();

    let (_, body) = get(&h.router, "/api/v0.1/list_ads?by=price&asc=true").await;
    assert_eq!(ids(&body), vec![3, 1, 2]);

    let (_, body) = get(&h.router, "/api/v0.1/list_ads?by=price&asc=false").await;
    assert_eq!(ids(&body), vec![2, 1, 3]);

    let (_, body) = get(&h.router, "/api/v0.1/list_ads?by=created_at&asc=0").await;
    assert_eq!(ids(&body), vec![3, 2, 1]);
}

#[tokio::test]
async fn test_list_ads_pages_by_configured_size() {
    let ads = (1..=25)
        .map(|id| adboard_test_utils::fixtures::ad_at(id, id * 10, id))
        .collect();
    let h = harness_with(seeded_counting_repository(ads).unwrap(), CacheConfig::default());

    let (_, first) = get(&h.router, "/api/v0.1/list_ads").await;
    assert_eq!(ids(&first), (1..=10).collect::<Vec<_>>());

    let (_, third) = get(&h.router, "/api/v0.1/list_ads?offset=20").await;
    assert_eq!(ids(&third), (21..=25).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_list_ads_offset_past_end_is_empty() {
    let h = harness();
    let (status, body) = get(&h.router, "/api/v0.1/list_ads?offset=10000").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "success", "result": []}));
}

#[tokio::test]
async fn test_list_ads_rejects_bad_parameters() {
    let h = harness();
    for uri in [
        "/api/v0.1/list_ads?offset=-1",
        "/api/v0.1/list_ads?offset=ten",
        "/api/v0.1/list_ads?by=title",
        "/api/v0.1/list_ads?asc=maybe",
    ] {
        let (status, body) = get(&h.router, uri).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{}", uri);
        assert_eq!(body, json!({"status": "error", "result": null}), "{}", uri);
    }
}

#[tokio::test]
async fn test_list_ads_bypasses_cache() {
    let h = harness();
    get(&h.router, "/api/v0.1/list_ads").await;
    assert_eq!(h.cache.writes(), 0);
    assert_eq!(h.repo.fetches(), 0);
}

#[tokio::test]
async fn test_list_ads_store_failure_is_500() {
    let h = harness();
    h.repo.fail_reads(true);
    let (status, body) = get(&h.router, "/api/v0.1/list_ads").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"status": "error", "result": null}));
}

// ============================================================================
// CREATE AD
// ============================================================================

#[tokio::test]
async fn test_create_ad_returns_id_and_warms_cache() {
    let h = harness();
    let body = serde_json::to_vec(&bike_input()).unwrap();

    let (status, created) = post(&h.router, "/api/v0.1/create_ad", body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["status"], "success");
    let id = created["id"].as_i64().unwrap();
    assert_eq!(id, 4);
    assert_eq!(h.cache.writes(), 1);

    let (status, fetched) = get(
        &h.router,
        &format!("/api/v0.1/get_ad?id={}&fields=description,image_urls", id),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["result"]["title"], "Road bike");
    assert_eq!(fetched["result"]["price"].as_f64(), Some(450.0));
    assert_eq!(fetched["result"]["main_image_url"], "https://img.example/bike-1.jpg");
    assert_eq!(fetched["result"]["image_urls"].as_array().map(Vec::len), Some(2));
    assert_eq!(h.repo.fetches(), 0, "created ad must be served from cache");
}

#[tokio::test]
async fn test_create_ad_price_keeps_every_digit() {
    let h = harness();
    let (status, created) = post(
        &h.router,
        "/api/v0.1/create_ad",
        r#"{"title":"Yacht","price":12345678901234567.89}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = created["id"].as_i64().unwrap();

    let (_, fetched) = get(&h.router, &format!("/api/v0.1/get_ad?id={}", id)).await;
    assert_eq!(fetched["result"]["price"].to_string(), "12345678901234567.89");

    let (_, listed) = get(&h.router, "/api/v0.1/list_ads?by=price&asc=false").await;
    assert_eq!(listed["result"][0]["id"].as_i64(), Some(id));
    assert_eq!(listed["result"][0]["price"].to_string(), "12345678901234567.89");
}

#[tokio::test]
async fn test_create_ad_without_images() {
    let h = harness();
    let (status, created) = post(
        &h.router,
        "/api/v0.1/create_ad",
        r#"{"title":"Desk lamp","price":12.5}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = created["id"].as_i64().unwrap();

    let (_, fetched) = get(
        &h.router,
        &format!("/api/v0.1/get_ad?id={}&fields=image_urls", id),
    )
    .await;
    assert_eq!(fetched["result"]["main_image_url"], Value::Null);
    assert_eq!(fetched["result"]["image_urls"], json!([]));
}

#[tokio::test]
async fn test_create_ad_rejects_invalid_bodies() {
    let h = harness();
    for body in [
        "not json",
        r#"{"title":"Lamp"}"#,
        r#"{"title":"","price":5}"#,
        r#"{"title":"Lamp","price":-1}"#,
        r#"{"title":"Lamp","price":5,"image_urls":["img/relative.png"]}"#,
    ] {
        let (status, response) = post(&h.router, "/api/v0.1/create_ad", body).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{}", body);
        assert_eq!(response, json!({"status": "error", "id": null}), "{}", body);
    }
    assert_eq!(h.repo.inner().len(), 3);
}

#[tokio::test]
async fn test_create_ad_store_failure_is_500() {
    let h = harness();
    h.repo.fail_writes(true);
    let body = serde_json::to_vec(&bike_input()).unwrap();
    let (status, response) = post(&h.router, "/api/v0.1/create_ad", body).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response, json!({"status": "error", "id": null}));
}

#[tokio::test]
async fn test_create_ad_cache_failure_is_500() {
    let h = harness();
    h.cache.fail_put(true);
    let body = serde_json::to_vec(&bike_input()).unwrap();
    let (status, response) = post(&h.router, "/api/v0.1/create_ad", body).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response, json!({"status": "error", "id": null}));
}

// ============================================================================
// ROUTING, HEALTH, METRICS
// ============================================================================

#[tokio::test]
async fn test_unknown_paths_are_404() {
    let h = harness();
    for uri in ["/api/v0.2/get_ad?id=1", "/api/v0.1/delete_ad", "/"] {
        let (status, _) = get(&h.router, uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
    }
}

#[tokio::test]
async fn test_wrong_method_is_405() {
    let h = harness();
    let (status, _) = post(&h.router, "/api/v0.1/get_ad?id=1", "").await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

    let (status, _) = get(&h.router, "/api/v0.1/create_ad").await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_readiness_reflects_dependencies() {
    let h = harness();
    let (status, body) = get(&h.router, "/health/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["details"]["database"]["status"], "healthy");

    h.cache.fail_get(true);
    let (status, body) = get(&h.router, "/health/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["details"]["cache"]["status"], "unhealthy");
    assert_eq!(body["details"]["database"]["status"], "healthy");
}

#[tokio::test]
async fn test_metrics_endpoint_reports_cache_reads() {
    let h = harness();
    get(&h.router, "/api/v0.1/get_ad?id=1").await;

    let response = h
        .router
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8_lossy(&bytes);
    assert!(text.contains("adboard_cache_reads_total"));
}

#[cfg(feature = "openapi")]
#[tokio::test]
async fn test_openapi_document_is_served() {
    let h = harness();
    let (status, body) = get(&h.router, "/openapi.json").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/v0.1/get_ad"].is_object());
}
