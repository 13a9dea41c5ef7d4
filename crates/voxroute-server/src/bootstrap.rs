//! Wiring of the configured components into the HTTP application
//!
//! Everything that can be decided from configuration is decided here, once:
//! the upstream connector, the cache gate, the version registry and the
//! handler behind each version. Missing credentials are not fatal at startup;
//! the requests that need them fail with a descriptive error instead.

use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};
use voxroute_cache::{
    CacheError, CacheGate, GateConfig, MemoryCacheStore, RestCacheConfig, RestCacheStore,
};
use voxroute_core::{CacheStore, Upstream};
use voxroute_egress::{
    EgressError, ElevenLabsConfig, ElevenLabsConnector, PaginationConfig, client::HttpClientConfig,
};
use voxroute_ingress::{
    AppState, CacheReadiness, ConfigReadiness, HandlerDeps, api_router, build_handler,
};
use voxroute_observability::{HealthState, Metrics, health_router};
use voxroute_routing::{Dispatcher, RegistryError, VersionEntry, VersionRegistry};

use crate::config::{CacheBackend, ServerConfig};

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Failed to build upstream connector: {0}")]
    Egress(#[from] EgressError),

    #[error("Failed to build cache store: {0}")]
    Cache(#[from] CacheError),

    #[error("Invalid versions configuration: {0}")]
    Registry(#[from] RegistryError),
}

fn credential(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// Build the ElevenLabs connector, if an API key is configured
pub fn build_upstream(config: &ServerConfig) -> Result<Option<Arc<dyn Upstream>>, BootstrapError> {
    let Some(api_key) = credential(&config.upstream.api_key) else {
        warn!("⚠️  ELEVENLABS_API_KEY not set; upstream endpoints will return errors");
        return Ok(None);
    };

    let client_config = HttpClientConfig {
        timeout_secs: config.upstream.timeout_secs,
        connect_timeout_secs: config.upstream.connect_timeout_secs,
        ..Default::default()
    };
    let connector = ElevenLabsConnector::new(
        ElevenLabsConfig::new(api_key)
            .with_base_url(config.upstream.base_url.clone())
            .with_client_config(client_config),
    )?;

    info!("✓ ElevenLabs upstream: {}", config.upstream.base_url);
    Ok(Some(Arc::new(connector)))
}

/// Build the cache gate and report how the cache is wired
pub fn build_cache(
    config: &ServerConfig,
) -> Result<(Option<CacheGate>, CacheReadiness), BootstrapError> {
    if !config.cache.enabled {
        info!("💾 Response cache disabled");
        return Ok((None, CacheReadiness::Disabled));
    }

    let store: Arc<dyn CacheStore> = match config.cache.backend {
        CacheBackend::Memory => Arc::new(MemoryCacheStore::new()),
        CacheBackend::Rest => match (credential(&config.cache.url), credential(&config.cache.token)) {
            (Some(url), Some(token)) => {
                Arc::new(RestCacheStore::new(RestCacheConfig::new(url, token))?)
            }
            _ => {
                warn!("⚠️  KV_REST_API_URL / KV_REST_API_TOKEN not set; cached versions will return errors");
                return Ok((None, CacheReadiness::Missing));
            }
        },
    };

    let backend = store.backend();
    let gate = CacheGate::new(
        store,
        GateConfig {
            ttl: Duration::from_secs(config.cache.ttl_secs),
            fail_open: config.cache.fail_open,
        },
    );

    info!(
        "💾 Response cache: {} (ttl {}s, fail_open={})",
        backend, config.cache.ttl_secs, config.cache.fail_open
    );
    Ok((Some(gate), CacheReadiness::Configured { backend }))
}

/// Build the version registry with one handler per configured kind
pub fn build_registry(
    config: &ServerConfig,
    deps: &HandlerDeps,
) -> Result<VersionRegistry, BootstrapError> {
    let entries = config.versions.entries.iter().map(|(tag, version)| {
        let handler = version
            .handler
            .map(|kind| build_handler(tag, &version.info, kind, deps));
        match &version.handler {
            Some(kind) => info!("   {} → {} ({})", tag, kind.name(), version.info.status),
            None => warn!("   {} has no handler configured", tag),
        }
        VersionEntry::new(tag.clone(), version.info.clone(), handler)
    });

    Ok(VersionRegistry::new(config.versions.default.clone(), entries)?)
}

/// The assembled application
pub struct App {
    pub router: Router,
    pub readiness: ConfigReadiness,
    pub default_version: String,
}

/// Build the full router (API + health/metrics) from configuration
pub fn build_app(config: &ServerConfig, metrics: Arc<Metrics>) -> Result<App, BootstrapError> {
    let upstream = build_upstream(config)?;
    let (cache, cache_readiness) = build_cache(config)?;

    let deps = HandlerDeps {
        upstream: upstream.clone(),
        cache,
        cache_enabled: config.cache.enabled,
        key_prefix: config.cache.key_prefix.clone(),
        pagination: PaginationConfig {
            page_size: config.upstream.page_size,
            max_pages: config.upstream.max_pages,
        },
        metrics: metrics.clone(),
    };

    info!("📋 Registering {} API versions", config.versions.entries.len());
    let registry = build_registry(config, &deps)?;
    let default_version = registry.default_tag().to_string();

    let readiness = ConfigReadiness {
        upstream_configured: upstream.is_some(),
        cache: cache_readiness,
    };

    let state = AppState::new(
        upstream,
        Dispatcher::new(Arc::new(registry)),
        metrics.clone(),
    )
    .with_log_requests(config.logging.log_requests);

    let health_state = HealthState::with_readiness_checker(metrics, Arc::new(readiness.clone()));

    let router = api_router(Arc::new(state)).merge(health_router(health_state));

    Ok(App {
        router,
        readiness,
        default_version,
    })
}
