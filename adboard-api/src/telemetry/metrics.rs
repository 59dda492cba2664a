//! Prometheus Metrics Definitions
//!
//! Defines all ADBOARD metrics with appropriate labels and types.
//! Exposes a /metrics endpoint for Prometheus scraping.

use adboard_storage::{ReadSource, ReadThroughCache};
use axum::{extract::State, http::StatusCode, response::IntoResponse};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge, register_histogram_vec, register_int_gauge, CounterVec,
    Encoder, Gauge, HistogramVec, IntGauge, TextEncoder,
};

use crate::error::{ApiError, ApiResult};

/// HTTP request latency buckets (seconds)
/// Covers: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0,
];

/// Global metrics instance - initialized once at startup
pub static METRICS: Lazy<ApiResult<AdboardMetrics>> = Lazy::new(AdboardMetrics::new);

/// Container for all ADBOARD metrics.
#[derive(Clone)]
pub struct AdboardMetrics {
    /// HTTP request counter - labels: method, path, status
    pub http_requests_total: CounterVec,

    /// HTTP request duration histogram - labels: method, path
    pub http_request_duration_seconds: HistogramVec,

    /// Single-ad reads by where the answer came from - labels: source
    pub cache_reads_total: CounterVec,

    /// Share of lookups answered by the cache since startup
    pub cache_hit_ratio: Gauge,

    /// Ads with a cache fill currently in progress
    pub cache_fills_in_flight: IntGauge,
}

fn registration_failed(name: &str, err: prometheus::Error) -> ApiError {
    ApiError::internal_error(format!("Failed to register {}: {}", name, err))
}

impl AdboardMetrics {
    /// Create and register all metrics with Prometheus.
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            http_requests_total: register_counter_vec!(
                "adboard_http_requests_total",
                "Total number of HTTP requests",
                &["method", "path", "status"]
            )
            .map_err(|e| registration_failed("http_requests_total", e))?,

            http_request_duration_seconds: register_histogram_vec!(
                "adboard_http_request_duration_seconds",
                "HTTP request duration in seconds",
                &["method", "path"],
                HTTP_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| registration_failed("http_request_duration_seconds", e))?,

            cache_reads_total: register_counter_vec!(
                "adboard_cache_reads_total",
                "Single-ad reads by source (cache, store, coalesced)",
                &["source"]
            )
            .map_err(|e| registration_failed("cache_reads_total", e))?,

            cache_hit_ratio: register_gauge!(
                "adboard_cache_hit_ratio",
                "Fraction of cache lookups that were hits"
            )
            .map_err(|e| registration_failed("cache_hit_ratio", e))?,

            cache_fills_in_flight: register_int_gauge!(
                "adboard_cache_fills_in_flight",
                "Ads with a cache fill in progress"
            )
            .map_err(|e| registration_failed("cache_fills_in_flight", e))?,
        })
    }

    /// Record an HTTP request.
    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }

    /// Record where a single-ad read was answered from.
    pub fn record_cache_read(&self, source: ReadSource) {
        self.cache_reads_total
            .with_label_values(&[source.as_str()])
            .inc();
    }

    /// Copy the coordinator's counters into the gauges.
    pub fn observe_cache(&self, cache: &ReadThroughCache) {
        self.cache_hit_ratio.set(cache.stats().hit_rate());
        self.cache_fills_in_flight
            .set(i64::try_from(cache.fills_in_flight()).unwrap_or(i64::MAX));
    }
}

/// Handler for GET /metrics endpoint.
///
/// Returns Prometheus text format metrics.
#[cfg_attr(
    feature = "openapi",
    utoipa::path(
        get,
        path = "/metrics",
        tag = "Observability",
        responses(
            (status = 200, description = "Prometheus metrics in text format", content_type = "text/plain"),
            (status = 500, description = "Failed to encode metrics"),
        ),
    )
)]
pub async fn metrics_handler(State(cache): State<ReadThroughCache>) -> impl IntoResponse {
    if let Ok(metrics) = METRICS.as_ref() {
        metrics.observe_cache(&cache);
    }

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {}", e).into_bytes(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::core::Collector;

    #[test]
    fn test_metrics_creation() -> Result<(), String> {
        let metrics = METRICS
            .as_ref()
            .map_err(|e| format!("Metrics init failed: {}", e.message))?;
        assert!(!metrics.http_requests_total.desc().is_empty());
        Ok(())
    }

    #[test]
    fn test_record_http_request() -> Result<(), String> {
        let metrics = METRICS
            .as_ref()
            .map_err(|e| format!("Metrics init failed: {}", e.message))?;
        metrics.record_http_request("GET", "/api/v0.1/get_ad", 200, 0.015);
        Ok(())
    }

    #[test]
    fn test_record_cache_read() -> Result<(), String> {
        let metrics = METRICS
            .as_ref()
            .map_err(|e| format!("Metrics init failed: {}", e.message))?;
        let before = metrics
            .cache_reads_total
            .with_label_values(&["coalesced"])
            .get();
        metrics.record_cache_read(ReadSource::Coalesced);
        let after = metrics
            .cache_reads_total
            .with_label_values(&["coalesced"])
            .get();
        assert!(after >= before + 1.0);
        Ok(())
    }
}
