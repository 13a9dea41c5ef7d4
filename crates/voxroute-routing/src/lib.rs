//! VoxRoute Version Routing
//!
//! This crate provides the version routing layer for VoxRoute:
//! - `VersionHandler` trait implemented by every handler kind
//! - Version registry built once at startup and validated
//! - Dispatcher with default-version fallback and diagnostics

pub mod dispatcher;
pub mod registry;

use async_trait::async_trait;
use voxroute_core::{HandlerRequest, HandlerResponse};

// Re-export commonly used types
pub use dispatcher::{DispatchError, Dispatched, Dispatcher, VERSION_PARAM};
pub use registry::{
    RegistryError, VersionEntry, VersionInfo, VersionRegistry, VersionStatus, is_valid_tag,
};

/// A statically known implementation behind a version tag
#[async_trait]
pub trait VersionHandler: Send + Sync {
    /// Handle a request whose `version` parameter has already been removed
    async fn handle(&self, request: HandlerRequest) -> voxroute_core::Result<HandlerResponse>;
}
