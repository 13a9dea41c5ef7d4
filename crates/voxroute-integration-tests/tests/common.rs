//! Common test utilities for integration tests

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Request, StatusCode},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;
use voxroute_cache::{CacheGate, GateConfig};
use voxroute_core::{CacheStore, Upstream};
use voxroute_egress::{ElevenLabsConfig, ElevenLabsConnector, PaginationConfig};
use voxroute_ingress::{AppState, HandlerDeps, HandlerKind, api_router, build_handler};
use voxroute_observability::{HealthState, Metrics, health_router};
use voxroute_routing::{Dispatcher, VersionEntry, VersionInfo, VersionRegistry, VersionStatus};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header, method, path, query_param, query_param_is_missing},
};

pub const API_KEY: &str = "test-key";

/// 2024-01-01T00:00:00Z
pub const BASE_TIME: i64 = 1_704_067_200;

/// Deterministic conversation fixture: one call every 3h, three agents
#[allow(dead_code)]
pub fn conversation(i: usize) -> Value {
    json!({
        "conversation_id": format!("conv_{}", i),
        "agent_id": format!("agent_{}", i % 3),
        "agent_name": format!("Agent {}", i % 3),
        "start_time_unix_secs": BASE_TIME + (i as i64) * 3 * 3600,
        "call_duration_secs": 60 + (i % 5) as u64,
        "status": "done"
    })
}

/// Mount `total` conversations split into pages of `page_size`
///
/// Each page is expected exactly `fetches` times.
#[allow(dead_code)]
pub async fn mount_conversation_pages(
    server: &MockServer,
    total: usize,
    page_size: usize,
    fetches: u64,
) {
    let pages = total.div_ceil(page_size).max(1);

    for page in 0..pages {
        let start = page * page_size;
        let end = (start + page_size).min(total);
        let has_more = page + 1 < pages;
        let body = json!({
            "conversations": (start..end).map(conversation).collect::<Vec<_>>(),
            "has_more": has_more,
            "next_cursor": if has_more { json!(format!("cursor-{}", page + 2)) } else { Value::Null },
        });

        let mock = Mock::given(method("GET"))
            .and(path("/v1/convai/conversations"))
            .and(header("xi-api-key", API_KEY));
        let mock = if page == 0 {
            mock.and(query_param_is_missing("cursor"))
        } else {
            mock.and(query_param("cursor", format!("cursor-{}", page + 1)))
        };

        mock.respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(fetches)
            .mount(server)
            .await;
    }
}

/// Test application wiring
pub struct TestApp {
    pub router: Router,
    #[allow(dead_code)]
    pub metrics: Arc<Metrics>,
}

/// Options for building a `TestApp`
pub struct TestAppOptions {
    /// ElevenLabs base URL; `None` means no API key configured
    pub upstream_url: Option<String>,
    /// Cache store; `None` means credentials missing
    pub cache: Option<Arc<dyn CacheStore>>,
    pub cache_enabled: bool,
    pub fail_open: bool,
}

impl TestAppOptions {
    #[allow(dead_code)]
    pub fn new(server: &MockServer) -> Self {
        Self {
            upstream_url: Some(server.uri()),
            cache: None,
            cache_enabled: true,
            fail_open: false,
        }
    }

    #[allow(dead_code)]
    pub fn with_cache(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(store);
        self
    }
}

/// Registered versions:
/// - v1: cached aggregate (default)
/// - v2: in development (501)
/// - v3: raw records
/// - v4: uncached aggregate, dates ignored
/// - v5: listed without a handler
pub fn build_app(options: TestAppOptions) -> TestApp {
    let metrics = Arc::new(Metrics::new().unwrap());

    let upstream: Option<Arc<dyn Upstream>> = options.upstream_url.map(|url| {
        Arc::new(
            ElevenLabsConnector::new(ElevenLabsConfig::new(API_KEY).with_base_url(url)).unwrap(),
        ) as Arc<dyn Upstream>
    });

    let cache = options.cache.map(|store| {
        CacheGate::new(
            store,
            GateConfig {
                fail_open: options.fail_open,
                ..Default::default()
            },
        )
    });

    let deps = HandlerDeps {
        upstream: upstream.clone(),
        cache,
        cache_enabled: options.cache_enabled,
        key_prefix: "voxroute".to_string(),
        pagination: PaginationConfig::default(),
        metrics: metrics.clone(),
    };

    let versions = [
        (
            "v1",
            VersionInfo::new("Conversation statistics"),
            Some(HandlerKind::Aggregate {
                cache: true,
                filter_by_date: true,
            }),
        ),
        (
            "v2",
            VersionInfo::new("Next").with_status(VersionStatus::Development),
            Some(HandlerKind::Unavailable),
        ),
        (
            "v3",
            VersionInfo::new("Raw records"),
            Some(HandlerKind::Raw {
                filter_by_date: true,
            }),
        ),
        (
            "v4",
            VersionInfo::new("Uncached, unfiltered"),
            Some(HandlerKind::Aggregate {
                cache: false,
                filter_by_date: false,
            }),
        ),
        ("v5", VersionInfo::new("Reserved"), None),
    ];

    let entries = versions.into_iter().map(|(tag, info, kind)| {
        let handler = kind.map(|kind| build_handler(tag, &info, kind, &deps));
        VersionEntry::new(tag, info, handler)
    });

    let registry = VersionRegistry::new("v1", entries).unwrap();
    let state = AppState::new(upstream, Dispatcher::new(Arc::new(registry)), metrics.clone());

    let router = api_router(Arc::new(state)).merge(health_router(HealthState::new(metrics.clone())));

    TestApp { router, metrics }
}

/// Response pieces a test inspects
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    #[allow(dead_code)]
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    #[allow(dead_code)]
    pub fn text(&self) -> String {
        String::from_utf8(self.body.clone()).unwrap()
    }

    #[allow(dead_code)]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

pub async fn get(router: &Router, uri: &str) -> TestResponse {
    let response = router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec();

    TestResponse {
        status,
        headers,
        body,
    }
}
