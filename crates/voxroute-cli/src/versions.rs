//! Default-version management on the server configuration file
//!
//! Edits `versions.default` in place and leaves every other setting as it
//! was. A file without a `versions.entries` table gets the server's built-in
//! versions.

use anyhow::{Context, Result, anyhow, bail};
use serde_yaml::{Mapping, Value as YamlValue};
use std::path::Path;
use voxroute_routing::is_valid_tag;

/// Versions the server registers when the config file names none
pub const BUILTIN_VERSIONS: &[&str] = &["v1", "v2"];

/// Default version when the config file names none
pub const BUILTIN_DEFAULT: &str = "v1";

/// A parsed configuration file, in the format it was written in
#[derive(Debug, Clone)]
pub enum ConfigDocument {
    Yaml(YamlValue),
    Toml(toml::Table),
}

fn is_toml(path: &Path) -> bool {
    path.extension().and_then(|s| s.to_str()) == Some("toml")
}

impl ConfigDocument {
    /// Load a configuration file; a missing file is an empty document
    pub fn load(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()));
            }
        };

        if is_toml(path) {
            let table = toml::from_str(&contents)
                .with_context(|| format!("Invalid TOML in {}", path.display()))?;
            Ok(ConfigDocument::Toml(table))
        } else {
            let value: YamlValue = if contents.trim().is_empty() {
                YamlValue::Mapping(Mapping::new())
            } else {
                serde_yaml::from_str(&contents)
                    .with_context(|| format!("Invalid YAML in {}", path.display()))?
            };
            Ok(ConfigDocument::Yaml(value))
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = match self {
            ConfigDocument::Yaml(value) => serde_yaml::to_string(value)?,
            ConfigDocument::Toml(table) => toml::to_string(table)?,
        };
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    pub fn default_version(&self) -> String {
        let configured = match self {
            ConfigDocument::Yaml(value) => value
                .get("versions")
                .and_then(|v| v.get("default"))
                .and_then(YamlValue::as_str)
                .map(str::to_string),
            ConfigDocument::Toml(table) => table
                .get("versions")
                .and_then(|v| v.get("default"))
                .and_then(toml::Value::as_str)
                .map(str::to_string),
        };
        configured.unwrap_or_else(|| BUILTIN_DEFAULT.to_string())
    }

    /// Registered version tags, sorted
    pub fn version_tags(&self) -> Vec<String> {
        let configured: Option<Vec<String>> = match self {
            ConfigDocument::Yaml(value) => value
                .get("versions")
                .and_then(|v| v.get("entries"))
                .and_then(YamlValue::as_mapping)
                .map(|entries| {
                    entries
                        .keys()
                        .filter_map(YamlValue::as_str)
                        .map(str::to_string)
                        .collect()
                }),
            ConfigDocument::Toml(table) => table
                .get("versions")
                .and_then(|v| v.get("entries"))
                .and_then(toml::Value::as_table)
                .map(|entries| entries.keys().cloned().collect()),
        };

        let mut tags = configured
            .unwrap_or_else(|| BUILTIN_VERSIONS.iter().map(|t| t.to_string()).collect());
        tags.sort_by_key(|tag| {
            tag.strip_prefix('v')
                .and_then(|n| n.parse::<u64>().ok())
                .unwrap_or(u64::MAX)
        });
        tags
    }

    /// Set `versions.default`, refusing malformed or unregistered tags
    pub fn set_default_version(&mut self, tag: &str) -> Result<()> {
        if !is_valid_tag(tag) {
            bail!("Invalid version format '{}': expected v<number>, e.g. v2", tag);
        }

        let tags = self.version_tags();
        if !tags.iter().any(|t| t == tag) {
            bail!(
                "Version {} is not registered (available: {})",
                tag,
                tags.join(", ")
            );
        }

        match self {
            ConfigDocument::Yaml(value) => {
                if value.is_null() {
                    *value = YamlValue::Mapping(Mapping::new());
                }
                let root = value
                    .as_mapping_mut()
                    .ok_or_else(|| anyhow!("Configuration root is not a mapping"))?;
                if !root.contains_key("versions") {
                    root.insert("versions".into(), YamlValue::Mapping(Mapping::new()));
                }
                let versions = root
                    .get_mut("versions")
                    .and_then(YamlValue::as_mapping_mut)
                    .ok_or_else(|| anyhow!("`versions` is not a mapping"))?;
                versions.insert("default".into(), tag.into());
            }
            ConfigDocument::Toml(table) => {
                let versions = table
                    .entry("versions")
                    .or_insert(toml::Value::Table(toml::Table::new()))
                    .as_table_mut()
                    .ok_or_else(|| anyhow!("`versions` is not a table"))?;
                versions.insert("default".to_string(), toml::Value::String(tag.to_string()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_missing_file_uses_builtin_versions() {
        let dir = tempfile::tempdir().unwrap();
        let document = ConfigDocument::load(&dir.path().join("voxroute.yaml")).unwrap();

        assert_eq!(document.default_version(), "v1");
        assert_eq!(document.version_tags(), vec!["v1", "v2"]);
    }

    #[test]
    fn test_yaml_set_keeps_other_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "voxroute.yaml",
            r#"
port: 8080
versions:
  default: v1
  entries:
    v1:
      name: Stats
    v2:
      name: Next
    v10:
      name: Later
"#,
        );

        let mut document = ConfigDocument::load(&path).unwrap();
        assert_eq!(document.version_tags(), vec!["v1", "v2", "v10"]);

        document.set_default_version("v2").unwrap();
        document.save(&path).unwrap();

        let reloaded = ConfigDocument::load(&path).unwrap();
        assert_eq!(reloaded.default_version(), "v2");

        let ConfigDocument::Yaml(value) = reloaded else {
            panic!("expected YAML document");
        };
        assert_eq!(value["port"].as_u64(), Some(8080));
        assert_eq!(value["versions"]["entries"]["v1"]["name"].as_str(), Some("Stats"));
    }

    #[test]
    fn test_toml_set() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "voxroute.toml",
            r#"
host = "0.0.0.0"

[versions.entries.v1]
name = "Stats"

[versions.entries.v3]
name = "Raw"
"#,
        );

        let mut document = ConfigDocument::load(&path).unwrap();
        assert_eq!(document.default_version(), "v1");

        document.set_default_version("v3").unwrap();
        document.save(&path).unwrap();

        let reloaded = ConfigDocument::load(&path).unwrap();
        assert_eq!(reloaded.default_version(), "v3");
        assert_eq!(reloaded.version_tags(), vec!["v1", "v3"]);
    }

    #[test]
    fn test_set_on_empty_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voxroute.yaml");

        let mut document = ConfigDocument::load(&path).unwrap();
        document.set_default_version("v2").unwrap();
        document.save(&path).unwrap();

        assert_eq!(ConfigDocument::load(&path).unwrap().default_version(), "v2");
    }

    #[test]
    fn test_set_rejects_bad_tags() {
        let dir = tempfile::tempdir().unwrap();
        let mut document = ConfigDocument::load(&dir.path().join("voxroute.yaml")).unwrap();

        let err = document.set_default_version("latest").unwrap_err();
        assert!(err.to_string().contains("Invalid version format"));

        let err = document.set_default_version("v9").unwrap_err();
        assert!(err.to_string().contains("not registered"));
        assert_eq!(document.default_version(), "v1");
    }
}
