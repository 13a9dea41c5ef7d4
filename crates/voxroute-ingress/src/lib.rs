//! VoxRoute Ingress
//!
//! HTTP surface of the proxy:
//! - Versioned conversation statistics (`/api/elevenlabs`)
//! - Voice and conversation detail passthrough
//! - Version discovery (`/api/versions`)

pub mod handlers;
pub mod middleware;
pub mod state;
pub mod stats;
pub mod types;

pub use handlers::{VersionSummary, VersionsResponse, api_router};
pub use middleware::{REQUEST_ID_HEADER, RequestMetadataExt, request_context_middleware};
pub use state::{AppState, CacheReadiness, ConfigReadiness};
pub use stats::{
    END_DATE_PARAM, FORCE_REFRESH_PARAM, HandlerDeps, HandlerKind, START_DATE_PARAM,
    build_handler,
};
pub use types::{IngressError, IngressResult, RequestId, RequestMetadata};
