//! Conversation statistics handlers
//!
//! One parameterized implementation per handler kind:
//! - `aggregate`: cache gate, paginated fetch and aggregation
//! - `raw`: paginated fetch, records returned untouched
//! - `unavailable`: 501 for versions that are registered but not built yet

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};
use voxroute_cache::{CACHE_HEADER, CacheGate, CacheKey};
use voxroute_core::{
    DateRange, Error, HandlerRequest, HandlerResponse, Result, Upstream, aggregate,
};
use voxroute_egress::{FetchedConversations, PaginationConfig, fetch_all_conversations};
use voxroute_observability::Metrics;
use voxroute_routing::{VersionHandler, VersionInfo};

pub const START_DATE_PARAM: &str = "startDate";
pub const END_DATE_PARAM: &str = "endDate";
pub const FORCE_REFRESH_PARAM: &str = "force_refresh";

const MISSING_API_KEY: &str = "ELEVENLABS_API_KEY is not configured";
const MISSING_CACHE: &str =
    "Cache is enabled but KV_REST_API_URL and KV_REST_API_TOKEN are not configured";

fn enabled() -> bool {
    true
}

/// Handler kind and its options, as written in the versions configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum HandlerKind {
    Aggregate {
        #[serde(default = "enabled")]
        cache: bool,
        #[serde(default = "enabled")]
        filter_by_date: bool,
    },
    Raw {
        #[serde(default = "enabled")]
        filter_by_date: bool,
    },
    Unavailable,
}

impl HandlerKind {
    pub fn name(&self) -> &'static str {
        match self {
            HandlerKind::Aggregate { .. } => "aggregate",
            HandlerKind::Raw { .. } => "raw",
            HandlerKind::Unavailable => "unavailable",
        }
    }
}

/// Shared dependencies handed to every handler at construction
#[derive(Clone)]
pub struct HandlerDeps {
    /// `None` when no API key is configured
    pub upstream: Option<Arc<dyn Upstream>>,
    /// `None` when the cache store credentials are missing
    pub cache: Option<CacheGate>,
    /// Global cache switch
    pub cache_enabled: bool,
    pub key_prefix: String,
    pub pagination: PaginationConfig,
    pub metrics: Arc<Metrics>,
}

/// Build the handler for one registered version
pub fn build_handler(
    tag: &str,
    info: &VersionInfo,
    kind: HandlerKind,
    deps: &HandlerDeps,
) -> Arc<dyn VersionHandler> {
    match kind {
        HandlerKind::Aggregate {
            cache,
            filter_by_date,
        } => {
            let cache = if !(cache && deps.cache_enabled) {
                CacheMode::Disabled
            } else {
                match &deps.cache {
                    Some(gate) => CacheMode::Enabled(gate.clone()),
                    None => CacheMode::Unconfigured,
                }
            };

            Arc::new(AggregateHandler {
                version: tag.to_string(),
                upstream: deps.upstream.clone(),
                cache,
                filter_by_date,
                key_prefix: deps.key_prefix.clone(),
                pagination: deps.pagination,
                metrics: deps.metrics.clone(),
            })
        }
        HandlerKind::Raw { filter_by_date } => Arc::new(RawHandler {
            upstream: deps.upstream.clone(),
            filter_by_date,
            pagination: deps.pagination,
            metrics: deps.metrics.clone(),
        }),
        HandlerKind::Unavailable => Arc::new(UnavailableHandler {
            version: tag.to_string(),
            message: format!("Version {} of this API is currently in development.", tag),
            status: info.status.to_string(),
        }),
    }
}

fn require_upstream(upstream: &Option<Arc<dyn Upstream>>) -> Result<&Arc<dyn Upstream>> {
    upstream
        .as_ref()
        .ok_or_else(|| Error::MissingConfig(MISSING_API_KEY.to_string()))
}

fn date_range(request: &HandlerRequest, filter_by_date: bool) -> Result<DateRange> {
    if !filter_by_date {
        return Ok(DateRange::all());
    }
    DateRange::parse(request.param(START_DATE_PARAM), request.param(END_DATE_PARAM))
}

/// Walk every page, recording upstream metrics
async fn fetch_recorded(
    upstream: &dyn Upstream,
    range: &DateRange,
    pagination: &PaginationConfig,
    metrics: &Metrics,
) -> Result<FetchedConversations> {
    let result = fetch_all_conversations(upstream, range, pagination).await;
    metrics.record_upstream("list_conversations", result.is_ok());
    if let Ok(fetched) = &result {
        metrics.record_upstream_pages(fetched.pages);
    }
    result
}

/// How an aggregate handler uses the cache
#[derive(Clone)]
enum CacheMode {
    Disabled,
    Enabled(CacheGate),
    /// Wanted, but the store credentials are missing
    Unconfigured,
}

/// Cache gate + paginated fetch + aggregation
pub struct AggregateHandler {
    version: String,
    upstream: Option<Arc<dyn Upstream>>,
    cache: CacheMode,
    filter_by_date: bool,
    key_prefix: String,
    pagination: PaginationConfig,
    metrics: Arc<Metrics>,
}

impl AggregateHandler {
    async fn fetch_and_aggregate(&self, upstream: &dyn Upstream, range: &DateRange) -> Result<String> {
        let fetched = fetch_recorded(upstream, range, &self.pagination, &self.metrics).await?;
        let stats = aggregate(fetched.records);
        debug!(
            "Aggregated {} conversations across {} agents",
            stats.total_calls,
            stats.calls_by_agent.len()
        );
        Ok(serde_json::to_string(&stats)?)
    }
}

#[async_trait]
impl VersionHandler for AggregateHandler {
    async fn handle(&self, request: HandlerRequest) -> Result<HandlerResponse> {
        let upstream = require_upstream(&self.upstream)?;
        let gate = match &self.cache {
            CacheMode::Disabled => None,
            CacheMode::Enabled(gate) => Some(gate),
            CacheMode::Unconfigured => return Err(Error::MissingConfig(MISSING_CACHE.to_string())),
        };
        let range = date_range(&request, self.filter_by_date)?;

        let Some(gate) = gate else {
            let body = self.fetch_and_aggregate(upstream.as_ref(), &range).await?;
            return Ok(HandlerResponse::raw_json(200, body));
        };

        let key = CacheKey::new(&self.key_prefix, &self.version, range);
        let result = gate
            .get_or_compute(&key, request.flag(FORCE_REFRESH_PARAM), || {
                self.fetch_and_aggregate(upstream.as_ref(), &range)
            })
            .await;

        match result {
            Ok(gated) => {
                self.metrics.record_cache_lookup(gated.outcome.as_str());
                info!("Stats for {} served ({})", key, gated.outcome.as_str());
                Ok(HandlerResponse::raw_json(200, gated.body)
                    .with_header(CACHE_HEADER, gated.outcome.as_str()))
            }
            Err(e) => {
                if matches!(e, Error::Cache(_)) {
                    self.metrics.record_cache_lookup("error");
                }
                Err(e)
            }
        }
    }
}

/// Paginated fetch with the records returned as upstream sent them
pub struct RawHandler {
    upstream: Option<Arc<dyn Upstream>>,
    filter_by_date: bool,
    pagination: PaginationConfig,
    metrics: Arc<Metrics>,
}

#[async_trait]
impl VersionHandler for RawHandler {
    async fn handle(&self, request: HandlerRequest) -> Result<HandlerResponse> {
        let upstream = require_upstream(&self.upstream)?;
        let range = date_range(&request, self.filter_by_date)?;

        let fetched =
            fetch_recorded(upstream.as_ref(), &range, &self.pagination, &self.metrics).await?;
        let body = json!({
            "count": fetched.records.len(),
            "conversations": fetched.records,
        });

        debug!("Raw upstream conversations: {}", body);
        HandlerResponse::json(200, &body)
    }
}

/// Fixed 501 for a version that is registered but not implemented
pub struct UnavailableHandler {
    version: String,
    message: String,
    status: String,
}

#[async_trait]
impl VersionHandler for UnavailableHandler {
    async fn handle(&self, _request: HandlerRequest) -> Result<HandlerResponse> {
        HandlerResponse::json(
            501,
            &json!({
                "error": "Not Implemented",
                "message": self.message,
                "version": self.version,
                "status": self.status,
            }),
        )
    }
}
