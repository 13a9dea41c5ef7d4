use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use voxroute_ingress::HandlerKind;
use voxroute_routing::{VersionInfo, VersionStatus};

/// A whole-value environment reference: `$VAR` or `${VAR}`
static ENV_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\$(?:\{([A-Za-z_][A-Za-z0-9_]*)\}|([A-Za-z_][A-Za-z0-9_]*))$").unwrap());

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub upstream: UpstreamConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub versions: VersionsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_false")]
    pub log_requests: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_page_size")]
    pub page_size: u32,

    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Managed REST key-value service
    #[default]
    Rest,
    /// In-process store, for local runs
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub backend: CacheBackend,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Serve upstream-only when the cache store fails
    #[serde(default = "default_false")]
    pub fail_open: bool,
}

/// One configured version: public metadata plus the handler behind it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionConfig {
    #[serde(flatten)]
    pub info: VersionInfo,

    /// No handler means the version is listed but cannot serve
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handler: Option<HandlerKind>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionsConfig {
    #[serde(default = "default_version")]
    pub default: String,

    #[serde(default = "default_version_entries")]
    pub entries: BTreeMap<String, VersionConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            logging: LoggingConfig::default(),
            upstream: UpstreamConfig::default(),
            cache: CacheConfig::default(),
            versions: VersionsConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_requests: false,
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            page_size: default_page_size(),
            max_pages: default_max_pages(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: CacheBackend::default(),
            url: None,
            token: None,
            ttl_secs: default_ttl_secs(),
            key_prefix: default_key_prefix(),
            fail_open: false,
        }
    }
}

impl Default for VersionsConfig {
    fn default() -> Self {
        Self {
            default: default_version(),
            entries: default_version_entries(),
        }
    }
}

impl ServerConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        let mut config: ServerConfig = if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml::from_str(&contents)?
        } else {
            // Default to YAML
            serde_yaml::from_str(&contents)?
        };

        config.resolve_env_refs();
        Ok(config)
    }

    /// Replace `$VAR` / `${VAR}` credential values with the variable's content
    ///
    /// Blank credentials count as unset.
    pub fn resolve_env_refs(&mut self) {
        for value in [
            &mut self.upstream.api_key,
            &mut self.cache.url,
            &mut self.cache.token,
        ] {
            *value = value.take().and_then(resolve_env_ref);
        }
    }

    /// Merge environment variables into config (env vars take precedence)
    pub fn merge_env(&mut self) {
        // Credentials keep their conventional names
        if let Some(val) = env_non_empty("ELEVENLABS_API_KEY") {
            self.upstream.api_key = Some(val);
        }

        if let Some(val) = env_non_empty("ELEVENLABS_BASE_URL") {
            self.upstream.base_url = val;
        }

        if let Some(val) = env_non_empty("KV_REST_API_URL") {
            self.cache.url = Some(val);
        }

        if let Some(val) = env_non_empty("KV_REST_API_TOKEN") {
            self.cache.token = Some(val);
        }

        if let Some(val) = env_non_empty("VOXROUTE_CACHE_ENABLED") {
            match val.parse::<bool>() {
                Ok(enabled) => self.cache.enabled = enabled,
                Err(_) => eprintln!("Warning: Invalid VOXROUTE_CACHE_ENABLED '{}', ignoring", val),
            }
        }

        if let Some(val) = env_non_empty("VOXROUTE_DEFAULT_VERSION") {
            self.versions.default = val;
        }

        // Logging settings
        if let Some(val) = env_non_empty("VOXROUTE_LOG_REQUESTS")
            && let Ok(enabled) = val.parse::<bool>()
        {
            self.logging.log_requests = enabled;
        }

        if let Some(val) = env_non_empty("VOXROUTE_LOG_LEVEL") {
            self.logging.level = val;
        }

        // Server settings
        if let Some(val) = env_non_empty("VOXROUTE_PORT")
            && let Ok(port) = val.parse::<u16>()
        {
            self.port = port;
        }

        if let Some(val) = env_non_empty("VOXROUTE_HOST") {
            self.host = val;
        }
    }

    /// Reject settings that would make every request fail
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.upstream.page_size == 0 || self.upstream.page_size > 100 {
            return Err(ConfigError::Invalid(format!(
                "upstream.page_size must be between 1 and 100, got {}",
                self.upstream.page_size
            )));
        }
        if self.upstream.max_pages == 0 {
            return Err(ConfigError::Invalid(
                "upstream.max_pages must be at least 1".to_string(),
            ));
        }
        if self.cache.ttl_secs == 0 {
            return Err(ConfigError::Invalid(
                "cache.ttl_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn resolve_env_ref(value: String) -> Option<String> {
    if value.trim().is_empty() {
        return None;
    }
    let Some(captures) = ENV_REF.captures(&value) else {
        return Some(value);
    };
    let name = captures.get(1).or_else(|| captures.get(2))?.as_str();
    env_non_empty(name)
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_base_url() -> String {
    "https://api.elevenlabs.io".to_string()
}

fn default_page_size() -> u32 {
    100
}

fn default_max_pages() -> u32 {
    1000
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_ttl_secs() -> u64 {
    300
}

fn default_key_prefix() -> String {
    "voxroute".to_string()
}

fn default_version() -> String {
    "v1".to_string()
}

fn default_version_entries() -> BTreeMap<String, VersionConfig> {
    let mut entries = BTreeMap::new();
    entries.insert(
        "v1".to_string(),
        VersionConfig {
            info: VersionInfo::new("Conversation statistics")
                .with_description("Cached aggregate statistics over all conversation pages"),
            handler: Some(HandlerKind::Aggregate {
                cache: true,
                filter_by_date: true,
            }),
        },
    );
    entries.insert(
        "v2".to_string(),
        VersionConfig {
            info: VersionInfo::new("Conversation statistics (next)")
                .with_description("Next generation statistics, in development")
                .with_status(VersionStatus::Development),
            handler: Some(HandlerKind::Unavailable),
        },
    );
    entries
}

fn default_true() -> bool {
    true
}

fn default_false() -> bool {
    false
}
