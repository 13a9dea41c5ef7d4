//! Shared ingress types and utilities

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use voxroute_routing::DispatchError;

/// Request ID for tracing
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(String);

impl RequestId {
    /// Generate a new request ID
    pub fn generate() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let count = COUNTER.fetch_add(1, Ordering::Relaxed);
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_micros())
            .unwrap_or_default();

        Self(format!("req_{:x}_{:x}", timestamp, count))
    }

    /// Accept a caller-supplied ID if it is short and printable
    pub fn from_header(value: &str) -> Option<Self> {
        let value = value.trim();
        let acceptable = !value.is_empty()
            && value.len() <= 128
            && value
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        acceptable.then(|| Self(value.to_string()))
    }

    /// Get the string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Request metadata collected during ingress
#[derive(Debug, Clone)]
pub struct RequestMetadata {
    pub request_id: RequestId,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestMetadata {
    pub fn new() -> Self {
        Self {
            request_id: RequestId::generate(),
            client_ip: None,
            user_agent: None,
        }
    }

    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = request_id;
        self
    }

    pub fn with_client_ip(mut self, ip: String) -> Self {
        self.client_ip = Some(ip);
        self
    }

    pub fn with_user_agent(mut self, ua: String) -> Self {
        self.user_agent = Some(ua);
        self
    }

    /// `id=... ip=... ua="..."` for request log lines; absent values print as `-`
    pub fn log_context(&self) -> String {
        format!(
            "id={} ip={} ua=\"{}\"",
            self.request_id,
            self.client_ip.as_deref().unwrap_or("-"),
            self.user_agent.as_deref().unwrap_or("-")
        )
    }
}

impl Default for RequestMetadata {
    fn default() -> Self {
        Self::new()
    }
}

/// Ingress error types
#[derive(Debug, Error)]
pub enum IngressError {
    /// Bad client input (dates, ids)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A credential or setting needed for this request is absent
    #[error("Missing configuration: {0}")]
    MissingConfig(String),

    /// Upstream answered non-success; status and body are passed through
    #[error("Upstream API error: {status_code}")]
    Upstream { status_code: u16, body: String },

    /// The resolved version has no usable implementation
    #[error("No handler available for version {resolved_version}")]
    Dispatch {
        requested_version: Option<String>,
        resolved_version: String,
        available_versions: Vec<String>,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IngressError {
    /// HTTP status this error maps to
    pub fn status_code(&self) -> StatusCode {
        match self {
            IngressError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            IngressError::Upstream { status_code, .. } => {
                StatusCode::from_u16(*status_code).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            IngressError::MissingConfig(_)
            | IngressError::Dispatch { .. }
            | IngressError::Serialization(_)
            | IngressError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// JSON error body
    pub fn body(&self) -> Value {
        match self {
            IngressError::InvalidRequest(msg)
            | IngressError::MissingConfig(msg)
            | IngressError::Internal(msg) => json!({ "error": msg }),
            IngressError::Upstream { status_code, body } => json!({
                "error": self.to_string(),
                "details": upstream_details(body),
                "status": status_code,
            }),
            IngressError::Dispatch {
                requested_version,
                resolved_version,
                available_versions,
            } => json!({
                "error": self.to_string(),
                "requestedVersion": requested_version,
                "resolvedVersion": resolved_version,
                "availableVersions": available_versions,
            }),
            IngressError::Serialization(_) => json!({ "error": self.to_string() }),
        }
    }
}

/// Upstream error bodies are usually JSON; fall back to the raw text
fn upstream_details(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}

impl axum::response::IntoResponse for IngressError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), axum::Json(self.body())).into_response()
    }
}

impl From<voxroute_core::Error> for IngressError {
    fn from(err: voxroute_core::Error) -> Self {
        use voxroute_core::Error;

        match err {
            Error::InvalidRequest(msg) => IngressError::InvalidRequest(msg),
            Error::MissingConfig(msg) => IngressError::MissingConfig(msg),
            Error::Upstream { status_code, body } => IngressError::Upstream { status_code, body },
            Error::Serialization(e) => IngressError::Serialization(e),
            other => IngressError::Internal(other.to_string()),
        }
    }
}

impl From<DispatchError> for IngressError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::NoHandler {
                requested_version,
                resolved_version,
                available_versions,
            } => IngressError::Dispatch {
                requested_version,
                resolved_version,
                available_versions,
            },
            DispatchError::Handler { source, .. } => source.into(),
        }
    }
}

/// Ingress result type
pub type IngressResult<T> = Result<T, IngressError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_generation() {
        let id1 = RequestId::generate();
        let id2 = RequestId::generate();
        assert_ne!(id1, id2);
        assert!(id1.as_str().starts_with("req_"));
    }

    #[test]
    fn test_request_id_from_header() {
        assert_eq!(
            RequestId::from_header("abc-123").map(|id| id.to_string()),
            Some("abc-123".to_string())
        );
        assert!(RequestId::from_header("").is_none());
        assert!(RequestId::from_header("has space").is_none());
        assert!(RequestId::from_header(&"x".repeat(129)).is_none());
    }

    #[test]
    fn test_log_context() {
        let metadata = RequestMetadata::new()
            .with_request_id(RequestId::from_header("trace-1").unwrap())
            .with_client_ip("203.0.113.7".to_string())
            .with_user_agent("curl/8.5".to_string());
        assert_eq!(
            metadata.log_context(),
            r#"id=trace-1 ip=203.0.113.7 ua="curl/8.5""#
        );

        let bare = RequestMetadata::new().with_request_id(RequestId::from_header("r2").unwrap());
        assert_eq!(bare.log_context(), r#"id=r2 ip=- ua="-""#);
    }

    #[test]
    fn test_upstream_error_passthrough() {
        let err = IngressError::Upstream {
            status_code: 401,
            body: r#"{"detail":"invalid_api_key"}"#.to_string(),
        };

        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            err.body(),
            json!({
                "error": "Upstream API error: 401",
                "details": {"detail": "invalid_api_key"},
                "status": 401
            })
        );
    }

    #[test]
    fn test_upstream_text_body_kept_as_string() {
        let err = IngressError::Upstream {
            status_code: 503,
            body: "Service Unavailable".to_string(),
        };
        assert_eq!(err.body()["details"], "Service Unavailable");
    }

    #[test]
    fn test_core_error_mapping() {
        let err: IngressError = voxroute_core::Error::InvalidRequest("bad date".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err: IngressError =
            voxroute_core::Error::MissingConfig("ELEVENLABS_API_KEY".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.body(), json!({"error": "ELEVENLABS_API_KEY"}));

        let err: IngressError = voxroute_core::Error::Cache("down".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let err: IngressError = voxroute_core::Error::PaginationLimit { max_pages: 3 }.into();
        assert!(matches!(err, IngressError::Internal(_)));
    }

    #[test]
    fn test_dispatch_error_body() {
        let err: IngressError = DispatchError::NoHandler {
            requested_version: Some("v9".to_string()),
            resolved_version: "v1".to_string(),
            available_versions: vec!["v1".to_string(), "v2".to_string()],
        }
        .into();

        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = err.body();
        assert_eq!(body["requestedVersion"], "v9");
        assert_eq!(body["resolvedVersion"], "v1");
        assert_eq!(body["availableVersions"], json!(["v1", "v2"]));
    }
}
