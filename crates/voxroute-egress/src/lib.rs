//! VoxRoute Egress Connectors
//!
//! This crate provides the connector to the upstream conversational-AI API:
//! - ElevenLabs connector (conversations, voices)
//! - Cursor-paginated conversation fetcher
//! - Shared HTTP client construction

pub mod client;
pub mod elevenlabs;
pub mod pagination;

use thiserror::Error;

pub use elevenlabs::{ElevenLabsConfig, ElevenLabsConnector};
pub use pagination::{FetchedConversations, PaginationConfig, fetch_all_conversations};

/// Egress error types
#[derive(Debug, Error)]
pub enum EgressError {
    /// Network, TLS or protocol failure talking to upstream
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Upstream answered with a non-success status
    #[error("Provider returned error {status_code}: {message}")]
    ProviderError { status_code: u16, message: String },

    /// Upstream answered 2xx with a body we could not read
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Request timed out
    #[error("Request timeout after {0}s")]
    Timeout(u64),

    /// Caller supplied something we refuse to forward
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Connector could not be built
    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

impl From<EgressError> for voxroute_core::Error {
    fn from(err: EgressError) -> Self {
        match err {
            EgressError::ProviderError {
                status_code,
                message,
            } => voxroute_core::Error::Upstream {
                status_code,
                body: message,
            },
            EgressError::InvalidRequest(msg) => voxroute_core::Error::InvalidRequest(msg),
            EgressError::ConfigError(msg) => voxroute_core::Error::Config(msg),
            other => voxroute_core::Error::Transport(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, EgressError>;
