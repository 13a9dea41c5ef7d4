//! Version dispatcher
//!
//! Reads the `version` parameter, resolves it against the registry (falling
//! back to the default tag), strips it from the request and hands the rest to
//! the resolved handler.

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error};
use voxroute_core::{HandlerRequest, HandlerResponse};

use crate::registry::VersionRegistry;

/// Query parameter selecting the version
pub const VERSION_PARAM: &str = "version";

/// Dispatch failures
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The resolved version has no usable implementation
    #[error("No handler available for version {resolved_version}")]
    NoHandler {
        requested_version: Option<String>,
        resolved_version: String,
        available_versions: Vec<String>,
    },

    /// The handler ran and failed
    #[error("Version {version} failed: {source}")]
    Handler {
        version: String,
        #[source]
        source: voxroute_core::Error,
    },
}

impl DispatchError {
    /// Tag that was resolved for the failed request
    pub fn version(&self) -> &str {
        match self {
            DispatchError::NoHandler {
                resolved_version, ..
            } => resolved_version,
            DispatchError::Handler { version, .. } => version,
        }
    }
}

/// A handled request and the version that served it
#[derive(Debug, Clone)]
pub struct Dispatched {
    pub version: String,
    pub response: HandlerResponse,
}

/// Routes requests to version handlers
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<VersionRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<VersionRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &VersionRegistry {
        &self.registry
    }

    /// Dispatch a request to the version it names (or the default)
    pub async fn dispatch(
        &self,
        mut request: HandlerRequest,
    ) -> Result<Dispatched, DispatchError> {
        let requested = request
            .take_param(VERSION_PARAM)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        let entry = self.registry.resolve(requested.as_deref());

        if let Some(requested) = &requested
            && requested != &entry.tag
        {
            debug!(
                "Unknown version '{}', falling back to default {}",
                requested, entry.tag
            );
        }

        let Some(handler) = entry.handler.as_ref() else {
            error!("Version {} is registered without a handler", entry.tag);
            return Err(DispatchError::NoHandler {
                requested_version: requested,
                resolved_version: entry.tag.clone(),
                available_versions: self.registry.tags(),
            });
        };

        debug!("Dispatching to version {}", entry.tag);
        let response = handler
            .handle(request)
            .await
            .map_err(|source| DispatchError::Handler {
                version: entry.tag.clone(),
                source,
            })?;

        Ok(Dispatched {
            version: entry.tag.clone(),
            response,
        })
    }
}
