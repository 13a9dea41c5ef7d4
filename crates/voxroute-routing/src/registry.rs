//! Version registry
//!
//! Maps version tags (`v1`, `v2`, ...) to their metadata and handler. The
//! registry is built once at startup; construction rejects tags that do not
//! look like `v<digits>`, duplicate tags and a default that is not
//! registered.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::VersionHandler;

static TAG_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^v\d+$").unwrap());

/// Whether `tag` is a well-formed version tag
pub fn is_valid_tag(tag: &str) -> bool {
    TAG_PATTERN.is_match(tag)
}

/// Registry construction errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Invalid version tag '{0}': expected v<number>")]
    InvalidTag(String),

    #[error("Version '{0}' is registered more than once")]
    DuplicateTag(String),

    #[error("Default version '{default}' is not registered (available: {available})")]
    UnknownDefault { default: String, available: String },

    #[error("No versions registered")]
    Empty,
}

/// Lifecycle status advertised for a version
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionStatus {
    #[default]
    Stable,
    Development,
    Deprecated,
}

impl fmt::Display for VersionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VersionStatus::Stable => "stable",
            VersionStatus::Development => "development",
            VersionStatus::Deprecated => "deprecated",
        };
        f.write_str(s)
    }
}

fn default_endpoint() -> String {
    "/api/elevenlabs".to_string()
}

/// Public metadata of a version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default)]
    pub status: VersionStatus,

    #[serde(default)]
    pub deprecated: bool,
}

impl VersionInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            endpoint: default_endpoint(),
            status: VersionStatus::Stable,
            deprecated: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_status(mut self, status: VersionStatus) -> Self {
        self.status = status;
        self
    }
}

/// A registered version: metadata plus its handler, if one is wired
#[derive(Clone)]
pub struct VersionEntry {
    pub tag: String,
    pub info: VersionInfo,
    pub handler: Option<Arc<dyn VersionHandler>>,
}

impl VersionEntry {
    pub fn new(
        tag: impl Into<String>,
        info: VersionInfo,
        handler: Option<Arc<dyn VersionHandler>>,
    ) -> Self {
        Self {
            tag: tag.into(),
            info,
            handler,
        }
    }
}

impl fmt::Debug for VersionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VersionEntry")
            .field("tag", &self.tag)
            .field("info", &self.info)
            .field("has_handler", &self.handler.is_some())
            .finish()
    }
}

/// Validated tag → entry table
#[derive(Debug, Clone)]
pub struct VersionRegistry {
    default: VersionEntry,
    entries: BTreeMap<String, VersionEntry>,
}

impl VersionRegistry {
    /// Build and validate a registry
    pub fn new(
        default: impl Into<String>,
        entries: impl IntoIterator<Item = VersionEntry>,
    ) -> Result<Self, RegistryError> {
        let default = default.into();
        let mut table = BTreeMap::new();

        for entry in entries {
            if !is_valid_tag(&entry.tag) {
                return Err(RegistryError::InvalidTag(entry.tag));
            }
            if table.contains_key(&entry.tag) {
                return Err(RegistryError::DuplicateTag(entry.tag));
            }
            table.insert(entry.tag.clone(), entry);
        }

        if table.is_empty() {
            return Err(RegistryError::Empty);
        }

        let Some(default_entry) = table.get(&default).cloned() else {
            return Err(RegistryError::UnknownDefault {
                default,
                available: table.keys().cloned().collect::<Vec<_>>().join(", "),
            });
        };

        Ok(Self {
            default: default_entry,
            entries: table,
        })
    }

    pub fn default_tag(&self) -> &str {
        &self.default.tag
    }

    pub fn get(&self, tag: &str) -> Option<&VersionEntry> {
        self.entries.get(tag)
    }

    /// Entry for `requested`, or the default entry when it is absent or unknown
    pub fn resolve(&self, requested: Option<&str>) -> &VersionEntry {
        requested
            .and_then(|tag| self.entries.get(tag))
            .unwrap_or(&self.default)
    }

    /// Registered tags in ascending order
    pub fn tags(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Metadata of every registered version, keyed by tag
    pub fn available_versions(&self) -> BTreeMap<String, VersionInfo> {
        self.entries
            .iter()
            .map(|(tag, entry)| (tag.clone(), entry.info.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
