//! Error types for VoxRoute Core

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // Configuration errors
    #[error("Missing configuration: {0}")]
    MissingConfig(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // Upstream errors
    /// Non-success HTTP status from the upstream API. The body is kept verbatim.
    #[error("Upstream API error: {status_code}")]
    Upstream { status_code: u16, body: String },

    #[error("Upstream transport error: {0}")]
    Transport(String),

    #[error("Pagination exceeded {max_pages} pages")]
    PaginationLimit { max_pages: u32 },

    // Cache store errors
    #[error("Cache store error: {0}")]
    Cache(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Upstream HTTP status, if this error carries one
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            Error::Upstream { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
