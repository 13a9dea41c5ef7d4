//! Cache store trait
//!
//! The `CacheStore` trait is a plain keyed get/set with a TTL. Atomicity of
//! each call is whatever the backing service provides; callers do no locking.

use async_trait::async_trait;
use std::time::Duration;

use crate::Result;

/// Key-value cache with per-entry expiry
///
/// Implementations:
/// - `RestCacheStore` (voxroute-cache): managed REST key-value service
/// - `MemoryCacheStore` (voxroute-cache): in-process store for tests and local runs
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Read a value; `Ok(None)` on miss or expiry
    ///
    /// # Errors
    /// - `Error::Cache` if the store cannot be reached or answers with an error
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value that expires after `ttl`
    ///
    /// # Errors
    /// - `Error::Cache` if the store cannot be reached or rejects the write
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Short backend name for logs and readiness output
    fn backend(&self) -> &'static str;
}
