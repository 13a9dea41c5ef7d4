//! Metrics collection with Prometheus
//!
//! This module provides Prometheus metrics for VoxRoute:
//! - Request counts by endpoint, resolved version and status
//! - Request latency histograms by endpoint
//! - Upstream call outcomes and pages fetched
//! - Cache gate outcomes

use prometheus::{Counter, CounterVec, HistogramOpts, HistogramVec, Opts, Registry};
use std::sync::Arc;

/// Metrics collector for VoxRoute
#[derive(Clone)]
pub struct Metrics {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Requests served, by endpoint, version and HTTP status
    pub requests_total: CounterVec,
    /// End-to-end request duration
    pub request_duration_seconds: HistogramVec,

    /// Upstream API calls, by operation and outcome
    pub upstream_requests_total: CounterVec,
    /// Conversation pages fetched from upstream
    pub upstream_pages_total: Counter,

    /// Cache gate outcomes (hit, miss, bypass, error)
    pub cache_lookups_total: CounterVec,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests_total = CounterVec::new(
            Opts::new("voxroute_requests_total", "Total number of requests"),
            &["endpoint", "version", "status"],
        )?;

        let request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "voxroute_request_duration_seconds",
                "Request duration in seconds",
            )
            .buckets(vec![
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
            ]),
            &["endpoint"],
        )?;

        let upstream_requests_total = CounterVec::new(
            Opts::new(
                "voxroute_upstream_requests_total",
                "Total number of upstream API calls",
            ),
            &["operation", "outcome"],
        )?;

        let upstream_pages_total = Counter::with_opts(Opts::new(
            "voxroute_upstream_pages_total",
            "Total number of conversation pages fetched from upstream",
        ))?;

        let cache_lookups_total = CounterVec::new(
            Opts::new("voxroute_cache_lookups_total", "Cache gate outcomes"),
            &["outcome"],
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(request_duration_seconds.clone()))?;
        registry.register(Box::new(upstream_requests_total.clone()))?;
        registry.register(Box::new(upstream_pages_total.clone()))?;
        registry.register(Box::new(cache_lookups_total.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            requests_total,
            request_duration_seconds,
            upstream_requests_total,
            upstream_pages_total,
            cache_lookups_total,
        })
    }

    /// Get the Prometheus registry for exporting metrics
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record a served request
    pub fn record_request(&self, endpoint: &str, version: &str, status: u16, duration_secs: f64) {
        self.requests_total
            .with_label_values(&[endpoint, version, &status.to_string()])
            .inc();
        self.request_duration_seconds
            .with_label_values(&[endpoint])
            .observe(duration_secs);
    }

    /// Record one upstream operation (`success` or `error`)
    pub fn record_upstream(&self, operation: &str, success: bool) {
        let outcome = if success { "success" } else { "error" };
        self.upstream_requests_total
            .with_label_values(&[operation, outcome])
            .inc();
    }

    /// Record pages fetched by one paginated walk
    pub fn record_upstream_pages(&self, pages: u32) {
        self.upstream_pages_total.inc_by(f64::from(pages));
    }

    /// Record a cache gate outcome
    pub fn record_cache_lookup(&self, outcome: &str) {
        self.cache_lookups_total
            .with_label_values(&[&outcome.to_ascii_lowercase()])
            .inc();
    }
}
