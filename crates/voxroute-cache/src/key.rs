//! Cache key composition

use std::fmt;
use voxroute_core::DateRange;

/// Bumped whenever the cached payload shape changes, so old entries are
/// never served under a new layout
pub const SCHEMA_TAG: &str = "stats-v1";

/// Key of one cached aggregate: `{prefix}:{schema}:{version}:{range}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    prefix: String,
    version: String,
    range: DateRange,
}

impl CacheKey {
    pub fn new(prefix: impl Into<String>, version: impl Into<String>, range: DateRange) -> Self {
        Self {
            prefix: prefix.into(),
            version: version.into(),
            range,
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn range(&self) -> &DateRange {
        &self.range
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.prefix,
            SCHEMA_TAG,
            self.version,
            self.range.cache_segment()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unfiltered_key() {
        let key = CacheKey::new("voxroute", "v1", DateRange::all());
        assert_eq!(key.to_string(), "voxroute:stats-v1:v1:all");
    }

    #[test]
    fn test_ranged_key() {
        let range = DateRange::parse(Some("2024-01-01"), Some("2024-01-31")).unwrap();
        let key = CacheKey::new("voxroute", "v1", range);
        assert_eq!(key.to_string(), "voxroute:stats-v1:v1:2024-01-01_2024-01-31");
    }

    #[test]
    fn test_half_open_range_key() {
        let range = DateRange::parse(Some("2024-01-01"), None).unwrap();
        let key = CacheKey::new("voxroute", "v1", range);
        assert_eq!(key.to_string(), "voxroute:stats-v1:v1:2024-01-01_open");
    }

    #[test]
    fn test_version_and_range_distinguish_keys() {
        let range = DateRange::parse(Some("2024-01-01"), Some("2024-01-01")).unwrap();
        let keys = [
            CacheKey::new("voxroute", "v1", DateRange::all()).to_string(),
            CacheKey::new("voxroute", "v2", DateRange::all()).to_string(),
            CacheKey::new("voxroute", "v1", range).to_string(),
        ];

        assert_ne!(keys[0], keys[1]);
        assert_ne!(keys[0], keys[2]);
        assert_ne!(keys[1], keys[2]);
    }
}
