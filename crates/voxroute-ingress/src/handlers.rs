//! HTTP handlers for the public API
//!
//! - `GET /api/elevenlabs` - conversation statistics, routed by `version`
//! - `GET /api/voices` - voice list or single voice passthrough
//! - `GET /api/conversations/{conversation_id}` - conversation detail passthrough
//! - `GET /api/versions` - registered versions and usage notes

use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::{HeaderName, HeaderValue, StatusCode, header},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use voxroute_core::{HandlerRequest, HandlerResponse};
use voxroute_routing::VersionInfo;

use crate::middleware::{RequestMetadataExt, request_context_middleware};
use crate::state::AppState;
use crate::types::{IngressError, IngressResult, RequestMetadata};

pub const STATS_PATH: &str = "/api/elevenlabs";
pub const VOICES_PATH: &str = "/api/voices";
pub const CONVERSATION_PATH: &str = "/api/conversations/{conversation_id}";
pub const VERSIONS_PATH: &str = "/api/versions";

/// Metrics label for endpoints that are not version-routed
const UNVERSIONED: &str = "none";

/// Create the public API router
pub fn api_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(STATS_PATH, get(stats))
        .route(VOICES_PATH, get(voices))
        .route(CONVERSATION_PATH, get(conversation))
        .route(VERSIONS_PATH, get(versions))
        .layer(middleware::from_fn(request_context_middleware))
        .with_state(state)
}

/// Turn a handler's pre-serialized answer into an HTTP response, body untouched
fn into_http(response: HandlerResponse) -> Response {
    let status =
        StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut http = (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        response.body,
    )
        .into_response();

    for (name, value) in response.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            (Ok(name), Ok(value)) => {
                http.headers_mut().insert(name, value);
            }
            _ => warn!("Dropping invalid response header {}", name),
        }
    }

    http
}

fn log_request(
    state: &AppState,
    request: &RequestMetadata,
    endpoint: &str,
    version: &str,
    status: StatusCode,
    started: Instant,
) {
    let elapsed = started.elapsed();
    state
        .metrics
        .record_request(endpoint, version, status.as_u16(), elapsed.as_secs_f64());

    if state.log_requests {
        info!(
            "{} version={} status={} took={}ms {}",
            endpoint,
            version,
            status.as_u16(),
            elapsed.as_millis(),
            request.log_context()
        );
    } else {
        debug!(
            "{} version={} status={} id={}",
            endpoint,
            version,
            status.as_u16(),
            request.request_id
        );
    }
}

/// `GET /api/elevenlabs`
async fn stats(
    State(state): State<Arc<AppState>>,
    Extension(RequestMetadataExt(request)): Extension<RequestMetadataExt>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Response {
    let started = Instant::now();

    match state.dispatcher.dispatch(HandlerRequest::new(params)).await {
        Ok(dispatched) => {
            let response = into_http(dispatched.response);
            log_request(&state, &request, STATS_PATH, &dispatched.version, response.status(), started);
            response
        }
        Err(err) => {
            let version = err.version().to_string();
            let err = IngressError::from(err);
            warn!("Stats request failed on {}: {}", version, err);
            log_request(&state, &request, STATS_PATH, &version, err.status_code(), started);
            err.into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
struct VoicesQuery {
    #[serde(rename = "voiceId")]
    voice_id: Option<String>,
}

/// `GET /api/voices?voiceId=`
async fn voices(
    State(state): State<Arc<AppState>>,
    Extension(RequestMetadataExt(request)): Extension<RequestMetadataExt>,
    Query(query): Query<VoicesQuery>,
) -> Response {
    let started = Instant::now();
    let result = fetch_voices(&state, query.voice_id.as_deref()).await;
    finish(&state, &request, VOICES_PATH, started, result)
}

async fn fetch_voices(state: &AppState, voice_id: Option<&str>) -> IngressResult<serde_json::Value> {
    let upstream = state.upstream.as_ref().ok_or_else(|| {
        IngressError::InvalidRequest("ElevenLabs API key is not configured".to_string())
    })?;

    let voice_id = voice_id.map(str::trim).filter(|id| !id.is_empty());
    let result = upstream.get_voices(voice_id).await;
    state.metrics.record_upstream("get_voices", result.is_ok());
    Ok(result?)
}

/// `GET /api/conversations/{conversation_id}`
async fn conversation(
    State(state): State<Arc<AppState>>,
    Extension(RequestMetadataExt(request)): Extension<RequestMetadataExt>,
    Path(conversation_id): Path<String>,
) -> Response {
    let started = Instant::now();
    let result = fetch_conversation(&state, &conversation_id).await;
    finish(&state, &request, "/api/conversations", started, result)
}

async fn fetch_conversation(state: &AppState, conversation_id: &str) -> IngressResult<serde_json::Value> {
    let upstream = state.upstream.as_ref().ok_or_else(|| {
        IngressError::MissingConfig("ELEVENLABS_API_KEY is not configured".to_string())
    })?;

    let result = upstream.get_conversation(conversation_id).await;
    state.metrics.record_upstream("get_conversation", result.is_ok());
    Ok(result?)
}

fn finish(
    state: &AppState,
    request: &RequestMetadata,
    endpoint: &str,
    started: Instant,
    result: IngressResult<serde_json::Value>,
) -> Response {
    let response = match result {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(err) => {
            warn!("{} failed: {}", endpoint, err);
            err.into_response()
        }
    };
    log_request(state, request, endpoint, UNVERSIONED, response.status(), started);
    response
}

/// One entry of the `availableVersions` list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionSummary {
    pub version: String,
    #[serde(flatten)]
    pub info: VersionInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionsDocumentation {
    pub usage: String,
    pub example: String,
}

/// Body of `GET /api/versions`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionsResponse {
    pub current_version: String,
    pub available_versions: Vec<VersionSummary>,
    /// RFC 3339, UTC, millisecond precision
    pub timestamp: String,
    pub documentation: VersionsDocumentation,
}

/// `GET /api/versions`
async fn versions(
    State(state): State<Arc<AppState>>,
    Extension(RequestMetadataExt(request)): Extension<RequestMetadataExt>,
) -> Response {
    let started = Instant::now();
    let registry = state.dispatcher.registry();
    let default = registry.default_tag().to_string();

    let available_versions: Vec<VersionSummary> = registry
        .available_versions()
        .into_iter()
        .map(|(version, info)| VersionSummary { version, info })
        .collect();

    let selectors = available_versions
        .iter()
        .map(|v| format!("?version={}", v.version))
        .collect::<Vec<_>>()
        .join(" or ");

    let body = VersionsResponse {
        current_version: default.clone(),
        available_versions,
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        documentation: VersionsDocumentation {
            usage: format!("To use a specific version, add {} to the URL", selectors),
            example: format!("{}?version={}&startDate=2024-01-01", STATS_PATH, default),
        },
    };

    let response = (StatusCode::OK, Json(body)).into_response();
    log_request(&state, &request, VERSIONS_PATH, UNVERSIONED, response.status(), started);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxroute_core::HandlerResponse;

    #[test]
    fn test_into_http_keeps_body_and_headers() {
        let response = into_http(
            HandlerResponse::raw_json(200, r#"{"a":1}"#).with_header("x-cache", "HIT"),
        );

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get("x-cache").unwrap(), "HIT");
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[test]
    fn test_into_http_drops_invalid_header() {
        let response = into_http(
            HandlerResponse::raw_json(501, "{}").with_header("bad header", "x"),
        );
        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
        assert_eq!(response.headers().len(), 1);
    }

    #[test]
    fn test_version_summary_flattens_info() {
        let summary = VersionSummary {
            version: "v1".to_string(),
            info: VersionInfo::new("v1"),
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["version"], "v1");
        assert_eq!(json["status"], "stable");
        assert_eq!(json["deprecated"], false);
    }
}
