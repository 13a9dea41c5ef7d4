//! REST key-value cache store
//!
//! Speaks the Upstash/Vercel-KV command protocol: each command is a JSON
//! array POSTed to the endpoint with a bearer token, and every reply is
//! `{"result": ...}` or `{"error": "..."}`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, instrument, warn};
use voxroute_core::CacheStore;

use crate::{CacheError, Result};

/// REST cache store configuration
#[derive(Debug, Clone)]
pub struct RestCacheConfig {
    /// Command endpoint (`KV_REST_API_URL`)
    pub url: String,

    /// Bearer token (`KV_REST_API_TOKEN`)
    pub token: String,

    /// Per-command timeout in seconds
    pub timeout_secs: u64,
}

impl RestCacheConfig {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            timeout_secs: 5,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CommandReply {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

/// `CacheStore` backed by a managed REST key-value service
pub struct RestCacheStore {
    config: RestCacheConfig,
    client: Client,
}

impl RestCacheStore {
    /// Create a new REST cache store
    ///
    /// # Errors
    /// - `CacheError::Config` if the URL or token is empty
    pub fn new(config: RestCacheConfig) -> Result<Self> {
        if config.url.trim().is_empty() {
            return Err(CacheError::Config("KV_REST_API_URL is not set".to_string()));
        }
        if config.token.trim().is_empty() {
            return Err(CacheError::Config(
                "KV_REST_API_TOKEN is not set".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CacheError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Run one command and return its `result`
    async fn command(&self, command: Value) -> Result<Option<Value>> {
        let response = self
            .client
            .post(&self.config.url)
            .bearer_auth(&self.config.token)
            .json(&command)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<CommandReply>(&text)
                .ok()
                .and_then(|reply| reply.error)
                .unwrap_or(text);
            warn!("Cache store returned {}: {}", status, message);
            return Err(CacheError::Status {
                status_code: status.as_u16(),
                message,
            });
        }

        let reply: CommandReply = serde_json::from_str(&text)
            .map_err(|e| CacheError::UnexpectedResponse(format!("{}: {}", e, text)))?;

        if let Some(error) = reply.error {
            return Err(CacheError::Store(error));
        }

        Ok(reply.result)
    }

    async fn get_value(&self, key: &str) -> Result<Option<String>> {
        match self.command(json!(["GET", key])).await? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(value)) => Ok(Some(value)),
            Some(other) => Err(CacheError::UnexpectedResponse(format!(
                "GET returned non-string result: {}",
                other
            ))),
        }
    }

    async fn set_value(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let ttl_secs = ttl.as_secs().max(1);
        match self
            .command(json!(["SET", key, value, "EX", ttl_secs]))
            .await?
        {
            Some(Value::String(ok)) if ok == "OK" => Ok(()),
            other => Err(CacheError::UnexpectedResponse(format!(
                "SET returned {:?}",
                other
            ))),
        }
    }
}

#[async_trait]
impl CacheStore for RestCacheStore {
    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> voxroute_core::Result<Option<String>> {
        let value = self.get_value(key).await?;
        debug!(hit = value.is_some(), "Cache GET");
        Ok(value)
    }

    #[instrument(skip(self, value), fields(bytes = value.len()))]
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> voxroute_core::Result<()> {
        self.set_value(key, value, ttl).await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "rest"
    }
}
