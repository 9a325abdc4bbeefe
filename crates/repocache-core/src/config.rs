//! Cache configuration, read from `repocache.toml` at the repository root.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Name of the per-repository configuration file.
pub const CONFIG_FILE_NAME: &str = "repocache.toml";

/// Default cache root, relative to the repository root.
pub const DEFAULT_CACHE_DIR: &str = ".repocache";

const DEFAULT_METADATA_TTL_SECS: u64 = 30 * 24 * 60 * 60;
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Configuration for both cache domains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// When false, the metadata cache never hits and never writes.
    pub enabled: bool,
    /// Cache root. Relative paths resolve against the repository root.
    pub cache_dir: Option<PathBuf>,
    /// Sliding TTL for metadata entries.
    pub metadata_ttl_secs: u64,
    /// Bounded wait on a locked database before a write fails.
    pub busy_timeout_ms: u64,
    pub metadata_db_name: String,
    pub static_analysis_dir: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cache_dir: None,
            metadata_ttl_secs: DEFAULT_METADATA_TTL_SECS,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            metadata_db_name: "metadata_cache.db".to_string(),
            static_analysis_dir: "static_analysis".to_string(),
        }
    }
}

impl CacheConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        let config: CacheConfig = toml::from_str(s).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load `<repo_root>/repocache.toml`, or defaults if the file is absent.
    pub fn load(repo_root: &Path) -> Result<Self, ConfigError> {
        let path = repo_root.join(CONFIG_FILE_NAME);
        if !path.is_file() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path).map_err(|e| ConfigError::Io {
            message: format!("{}: {e}", path.display()),
        })?;
        Self::from_toml(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.metadata_ttl_secs == 0 {
            return Err(invalid("metadata_ttl_secs", "must be greater than zero"));
        }
        if i64::try_from(self.metadata_ttl_secs).is_err() {
            return Err(invalid("metadata_ttl_secs", "must fit in a signed 64-bit timestamp"));
        }
        if self.busy_timeout_ms == 0 {
            return Err(invalid("busy_timeout_ms", "must be greater than zero"));
        }
        if self.metadata_db_name.trim().is_empty() {
            return Err(invalid("metadata_db_name", "must not be empty"));
        }
        if self.static_analysis_dir.trim().is_empty() {
            return Err(invalid("static_analysis_dir", "must not be empty"));
        }
        Ok(())
    }

    pub fn cache_root(&self, repo_root: &Path) -> PathBuf {
        match &self.cache_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => repo_root.join(dir),
            None => repo_root.join(DEFAULT_CACHE_DIR),
        }
    }

    pub fn metadata_db_path(&self, repo_root: &Path) -> PathBuf {
        self.cache_root(repo_root).join(&self.metadata_db_name)
    }

    pub fn static_analysis_root(&self, repo_root: &Path) -> PathBuf {
        self.cache_root(repo_root).join(&self.static_analysis_dir)
    }

    pub fn metadata_ttl(&self) -> Duration {
        Duration::from_secs(self.metadata_ttl_secs)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

fn invalid(field: &str, message: &str) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let config = CacheConfig::load(dir.path()).unwrap();
        assert_eq!(config, CacheConfig::default());
        assert_eq!(
            config.metadata_db_path(dir.path()),
            dir.path().join(".repocache").join("metadata_cache.db")
        );
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let config = CacheConfig::from_toml("metadata_ttl_secs = 60\nenabled = false\n").unwrap();
        assert_eq!(config.metadata_ttl(), Duration::from_secs(60));
        assert!(!config.enabled);
        assert_eq!(config.busy_timeout_ms, 5_000);
    }

    #[test]
    fn test_load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "cache_dir = \"cache\"\nstatic_analysis_dir = \"sa\"\n",
        )
        .unwrap();
        let config = CacheConfig::load(dir.path()).unwrap();
        assert_eq!(
            config.static_analysis_root(dir.path()),
            dir.path().join("cache").join("sa")
        );
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let err = CacheConfig::from_toml("metadata_ttl_secs = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref field, .. } if field == "metadata_ttl_secs"));
    }

    #[test]
    fn test_ttl_beyond_timestamp_range_rejected() {
        let config = CacheConfig {
            metadata_ttl_secs: u64::MAX,
            ..CacheConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { ref field, .. }) if field == "metadata_ttl_secs"
        ));
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        assert!(matches!(
            CacheConfig::from_toml("enabled = ["),
            Err(ConfigError::Parse { .. })
        ));
    }
}
