//! Shared application state and readiness reporting

use std::sync::Arc;
use voxroute_core::Upstream;
use voxroute_observability::{ComponentStatus, Metrics, ReadinessChecker};
use voxroute_routing::Dispatcher;

/// State shared by every API handler
#[derive(Clone)]
pub struct AppState {
    /// `None` when no API key is configured
    pub upstream: Option<Arc<dyn Upstream>>,
    pub dispatcher: Dispatcher,
    pub metrics: Arc<Metrics>,
    /// Log every request at info level
    pub log_requests: bool,
}

impl AppState {
    pub fn new(
        upstream: Option<Arc<dyn Upstream>>,
        dispatcher: Dispatcher,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            upstream,
            dispatcher,
            metrics,
            log_requests: false,
        }
    }

    pub fn with_log_requests(mut self, log_requests: bool) -> Self {
        self.log_requests = log_requests;
        self
    }
}

/// Cache wiring as seen by the readiness probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheReadiness {
    Disabled,
    Configured { backend: &'static str },
    /// Enabled, but the store credentials are missing
    Missing,
}

/// Readiness derived from which credentials were configured at startup
#[derive(Debug, Clone)]
pub struct ConfigReadiness {
    pub upstream_configured: bool,
    pub cache: CacheReadiness,
}

impl ReadinessChecker for ConfigReadiness {
    fn is_ready(&self) -> bool {
        self.upstream_configured && self.cache != CacheReadiness::Missing
    }

    fn component_statuses(&self) -> Vec<ComponentStatus> {
        let upstream = ComponentStatus::new(
            "upstream",
            if self.upstream_configured {
                "configured"
            } else {
                "missing"
            },
        );

        let cache = match &self.cache {
            CacheReadiness::Disabled => ComponentStatus::new("cache", "disabled"),
            CacheReadiness::Configured { backend } => {
                ComponentStatus::new("cache", "configured").with_detail(*backend)
            }
            CacheReadiness::Missing => ComponentStatus::new("cache", "missing"),
        };

        vec![upstream, cache]
    }
}
