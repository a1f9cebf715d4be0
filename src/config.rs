//! Engine configuration, loadable from a YAML or JSON file.

use crate::error::ConfigError;
use crate::installers::SizeUnits;
use crate::runner::{DEFAULT_CACHE_TTL_MS, DEFAULT_TIMEOUT_MS};
use crate::structured_log::LogConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound on a single generator script
    pub generator_timeout_ms: u64,
    /// How long successful generator output is reused (0 disables caching)
    pub cache_ttl_ms: u64,
    /// Size conversion used by the built-in softwareupdate spec
    pub installer_size_units: SizeUnits,
    /// Extra directories of JSON/YAML specs to load at startup
    pub spec_dirs: Vec<PathBuf>,
    pub log: LogConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            generator_timeout_ms: DEFAULT_TIMEOUT_MS,
            cache_ttl_ms: DEFAULT_CACHE_TTL_MS,
            installer_size_units: SizeUnits::default(),
            spec_dirs: Vec::new(),
            log: LogConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load from a `.json` file, or YAML for anything else.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let parsed = if path.extension().map(|e| e == "json").unwrap_or(false) {
            serde_json::from_str(&content).map_err(|e| e.to_string())
        } else {
            serde_yaml::from_str(&content).map_err(|e| e.to_string())
        };

        parsed.map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structured_log::LogLevel;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.generator_timeout_ms, 5_000);
        assert_eq!(config.cache_ttl_ms, 30_000);
        assert_eq!(config.installer_size_units, SizeUnits::Faithful);
        assert!(config.spec_dirs.is_empty());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "generator_timeout_ms: 1500\ninstaller_size_units: decimal\nlog:\n  min_level: debug\n  json: false"
        )
        .unwrap();

        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.generator_timeout_ms, 1_500);
        assert_eq!(config.cache_ttl_ms, 30_000);
        assert_eq!(config.installer_size_units, SizeUnits::Decimal);
        assert_eq!(config.log.min_level, LogLevel::Debug);
        assert!(!config.log.json_output);
    }

    #[test]
    fn test_json_config() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"cache_ttl_ms": 0, "spec_dirs": ["/opt/specs"]}}"#).unwrap();

        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.cache_ttl_ms, 0);
        assert_eq!(config.spec_dirs, vec![PathBuf::from("/opt/specs")]);
    }

    #[test]
    fn test_bad_config_reports_path() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "generator_timeout_ms: soon").unwrap();

        let err = EngineConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
