//! ElevenLabs egress connector

use crate::{
    EgressError, Result,
    client::{HttpClientConfig, create_client},
};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, instrument, warn};
use voxroute_core::{ConversationPage, ConversationQuery, Upstream};

/// Header carrying the API key
pub const API_KEY_HEADER: &str = "xi-api-key";

/// ElevenLabs connector configuration
#[derive(Debug, Clone)]
pub struct ElevenLabsConfig {
    /// API key for authentication
    pub api_key: String,

    /// Base URL for the API (default: https://api.elevenlabs.io)
    pub base_url: String,

    /// HTTP client configuration
    pub client_config: HttpClientConfig,
}

impl ElevenLabsConfig {
    /// Create a new configuration with the default base URL
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.elevenlabs.io".to_string(),
            client_config: HttpClientConfig::default(),
        }
    }

    /// Set the base URL (for mock servers and proxies)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the HTTP client configuration
    pub fn with_client_config(mut self, client_config: HttpClientConfig) -> Self {
        self.client_config = client_config;
        self
    }
}

/// ElevenLabs connector
pub struct ElevenLabsConnector {
    config: ElevenLabsConfig,
    client: Client,
}

impl ElevenLabsConnector {
    /// Create a new ElevenLabs connector
    pub fn new(config: ElevenLabsConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(EgressError::ConfigError(
                "ElevenLabs API key is empty".to_string(),
            ));
        }

        let client = create_client(&config.client_config)?;
        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// GET a JSON document, mapping non-success statuses to `ProviderError`
    async fn get_json(&self, url: String) -> Result<Value> {
        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, &self.config.api_key)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EgressError::Timeout(self.config.client_config.timeout_secs)
                } else {
                    EgressError::from(e)
                }
            })?;

        let status = response.status();
        debug!("ElevenLabs GET {} -> {}", url, status);

        if !status.is_success() {
            let status_code = status.as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());
            warn!("ElevenLabs returned {}: {}", status_code, body);
            return Err(EgressError::ProviderError {
                status_code,
                message: body,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| EgressError::ParseError(format!("Failed to parse ElevenLabs response: {}", e)))
    }

    /// Build the conversation listing URL for one page
    fn conversations_url(&self, query: &ConversationQuery) -> Result<String> {
        let mut params: Vec<(&str, String)> = Vec::with_capacity(4);
        if let Some(after) = query.call_start_after_unix {
            params.push(("call_start_after_unix", after.to_string()));
        }
        if let Some(before) = query.call_start_before_unix {
            params.push(("call_start_before_unix", before.to_string()));
        }
        params.push(("page_size", query.page_size.to_string()));
        if let Some(cursor) = &query.cursor {
            params.push(("cursor", cursor.clone()));
        }

        let encoded = serde_urlencoded::to_string(&params)
            .map_err(|e| EgressError::InvalidRequest(format!("Unencodable query: {}", e)))?;

        Ok(format!("{}?{}", self.url("/v1/convai/conversations"), encoded))
    }
}

/// Path segments are forwarded into upstream URLs, so only allow id-like values
fn validate_path_segment(kind: &str, value: &str) -> Result<()> {
    if value.is_empty() || value.len() > 128 {
        return Err(EgressError::InvalidRequest(format!(
            "{} must be 1-128 characters",
            kind
        )));
    }

    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(EgressError::InvalidRequest(format!(
            "{} contains invalid characters",
            kind
        )));
    }

    Ok(())
}

#[async_trait]
impl Upstream for ElevenLabsConnector {
    #[instrument(skip(self), fields(cursor = ?query.cursor))]
    async fn list_conversations(
        &self,
        query: &ConversationQuery,
    ) -> voxroute_core::Result<ConversationPage> {
        let url = self.conversations_url(query)?;
        let body = self.get_json(url).await?;
        Ok(ConversationPage::from_upstream(body))
    }

    #[instrument(skip(self))]
    async fn get_conversation(&self, conversation_id: &str) -> voxroute_core::Result<Value> {
        validate_path_segment("conversation id", conversation_id)?;
        let url = self.url(&format!("/v1/convai/conversations/{}", conversation_id));
        Ok(self.get_json(url).await?)
    }

    #[instrument(skip(self))]
    async fn get_voices(&self, voice_id: Option<&str>) -> voxroute_core::Result<Value> {
        let url = match voice_id {
            Some(id) => {
                validate_path_segment("voice id", id)?;
                self.url(&format!("/v1/voices/{}", id))
            }
            None => self.url("/v1/voices"),
        };
        Ok(self.get_json(url).await?)
    }
}
