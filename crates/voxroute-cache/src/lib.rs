//! Response cache for VoxRoute
//!
//! This crate puts a best-effort TTL cache in front of expensive handler
//! work. It provides:
//! - `CacheKey`: deterministic keys built from version tag and date range
//! - `CacheGate`: read-through/write-back wrapper with `force_refresh`
//! - `RestCacheStore`: client for a managed REST key-value service
//! - `MemoryCacheStore`: in-process store for tests and local runs
//!
//! # Example
//! ```no_run
//! # use std::{sync::Arc, time::Duration};
//! # use voxroute_cache::{CacheGate, CacheKey, GateConfig, MemoryCacheStore};
//! # use voxroute_core::DateRange;
//! # async fn example() -> voxroute_core::Result<()> {
//! let gate = CacheGate::new(Arc::new(MemoryCacheStore::new()), GateConfig::default());
//! let key = CacheKey::new("voxroute", "v1", DateRange::all());
//! let result = gate
//!     .get_or_compute(&key, false, || async { Ok("{}".to_string()) })
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod gate;
pub mod key;
pub mod memory;
pub mod rest;

use thiserror::Error;

pub use gate::{CACHE_HEADER, CacheGate, CacheOutcome, GateConfig, GateResult};
pub use key::{CacheKey, SCHEMA_TAG};
pub use memory::MemoryCacheStore;
pub use rest::{RestCacheConfig, RestCacheStore};

/// Cache store errors
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Cache store returned {status_code}: {message}")]
    Status { status_code: u16, message: String },

    #[error("Cache store error: {0}")]
    Store(String),

    #[error("Unexpected cache response: {0}")]
    UnexpectedResponse(String),

    #[error("Invalid cache configuration: {0}")]
    Config(String),
}

impl From<CacheError> for voxroute_core::Error {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::Config(msg) => voxroute_core::Error::MissingConfig(msg),
            other => voxroute_core::Error::Cache(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;
