//! Read-through cache gate
//!
//! On a hit the stored string is returned unmodified. On a miss the compute
//! closure runs and its output is written back with the configured TTL, so a
//! later hit returns the very same bytes. `force_refresh` skips the read but
//! still writes.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use voxroute_core::{CacheStore, Result};

use crate::CacheKey;

/// Response header reporting the gate outcome
pub const CACHE_HEADER: &str = "x-cache";

/// How a gated value was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// Served from the store
    Hit,
    /// Not in the store; computed and written
    Miss,
    /// Read skipped on request; computed and written
    Bypass,
}

impl CacheOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheOutcome::Hit => "HIT",
            CacheOutcome::Miss => "MISS",
            CacheOutcome::Bypass => "BYPASS",
        }
    }
}

/// Gate settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateConfig {
    /// Lifetime of written entries
    pub ttl: Duration,

    /// Serve computed values when the store fails instead of erroring
    pub fail_open: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            fail_open: false,
        }
    }
}

/// Gated value and where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateResult {
    pub body: String,
    pub outcome: CacheOutcome,
}

/// Cache gate over any `CacheStore`
#[derive(Clone)]
pub struct CacheGate {
    store: Arc<dyn CacheStore>,
    config: GateConfig,
}

impl CacheGate {
    pub fn new(store: Arc<dyn CacheStore>, config: GateConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Return the cached value for `key`, or compute and store it
    ///
    /// # Errors
    /// - Any error from `compute`; nothing is written in that case
    /// - `Error::Cache` when the store fails and `fail_open` is off
    pub async fn get_or_compute<F, Fut>(
        &self,
        key: &CacheKey,
        force_refresh: bool,
        compute: F,
    ) -> Result<GateResult>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        let key = key.to_string();

        if !force_refresh {
            match self.store.get(&key).await {
                Ok(Some(body)) => {
                    debug!("Cache hit for {}", key);
                    return Ok(GateResult {
                        body,
                        outcome: CacheOutcome::Hit,
                    });
                }
                Ok(None) => debug!("Cache miss for {}", key),
                Err(e) if self.config.fail_open => {
                    warn!("Cache read failed for {}, serving uncached: {}", key, e);
                }
                Err(e) => return Err(e),
            }
        }

        let body = compute().await?;

        match self.store.set(&key, &body, self.config.ttl).await {
            Ok(()) => debug!("Cached {} for {}s", key, self.config.ttl.as_secs()),
            Err(e) if self.config.fail_open => {
                warn!("Cache write failed for {}: {}", key, e);
            }
            Err(e) => return Err(e),
        }

        Ok(GateResult {
            body,
            outcome: if force_refresh {
                CacheOutcome::Bypass
            } else {
                CacheOutcome::Miss
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryCacheStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use voxroute_core::{DateRange, Error};

    struct BrokenStore;

    #[async_trait]
    impl CacheStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(Error::Cache("connection refused".to_string()))
        }

        async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<()> {
            Err(Error::Cache("connection refused".to_string()))
        }

        fn backend(&self) -> &'static str {
            "broken"
        }
    }

    fn key() -> CacheKey {
        CacheKey::new("test", "v1", DateRange::all())
    }

    #[tokio::test]
    async fn test_miss_then_hit_returns_same_bytes() {
        let gate = CacheGate::new(Arc::new(MemoryCacheStore::new()), GateConfig::default());
        let calls = &AtomicUsize::new(0);

        let first = gate
            .get_or_compute(&key(), false, || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(r#"{"totalCalls":2}"#.to_string())
            })
            .await
            .unwrap();
        let second = gate
            .get_or_compute(&key(), false, || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(r#"{"totalCalls":99}"#.to_string())
            })
            .await
            .unwrap();

        assert_eq!(first.outcome, CacheOutcome::Miss);
        assert_eq!(second.outcome, CacheOutcome::Hit);
        assert_eq!(first.body, second.body);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_force_refresh_recomputes_and_overwrites() {
        let store = Arc::new(MemoryCacheStore::new());
        let gate = CacheGate::new(store.clone(), GateConfig::default());

        gate.get_or_compute(&key(), false, || async { Ok("old".to_string()) })
            .await
            .unwrap();
        let refreshed = gate
            .get_or_compute(&key(), true, || async { Ok("new".to_string()) })
            .await
            .unwrap();

        assert_eq!(refreshed.outcome, CacheOutcome::Bypass);
        assert_eq!(refreshed.body, "new");
        assert_eq!(
            store.get(&key().to_string()).await.unwrap().as_deref(),
            Some("new")
        );
    }

    #[tokio::test]
    async fn test_compute_error_writes_nothing() {
        let store = Arc::new(MemoryCacheStore::new());
        let gate = CacheGate::new(store.clone(), GateConfig::default());

        let result = gate
            .get_or_compute(&key(), false, || async {
                Err(Error::Upstream {
                    status_code: 500,
                    body: "boom".to_string(),
                })
            })
            .await;

        assert!(result.is_err());
        assert!(store.get(&key().to_string()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_store_failure_is_fatal_by_default() {
        let gate = CacheGate::new(Arc::new(BrokenStore), GateConfig::default());
        let calls = &AtomicUsize::new(0);

        let result = gate
            .get_or_compute(&key(), false, || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok("{}".to_string())
            })
            .await;

        assert!(matches!(result, Err(Error::Cache(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fail_open_serves_computed_value() {
        let gate = CacheGate::new(
            Arc::new(BrokenStore),
            GateConfig {
                fail_open: true,
                ..Default::default()
            },
        );

        let result = gate
            .get_or_compute(&key(), false, || async { Ok("{}".to_string()) })
            .await
            .unwrap();

        assert_eq!(result.body, "{}");
        assert_eq!(result.outcome, CacheOutcome::Miss);
    }

    #[test]
    fn test_outcome_header_values() {
        assert_eq!(CacheOutcome::Hit.as_str(), "HIT");
        assert_eq!(CacheOutcome::Miss.as_str(), "MISS");
        assert_eq!(CacheOutcome::Bypass.as_str(), "BYPASS");
    }
}
