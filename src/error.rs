//! Error types for spec and config loading.
//!
//! Completion itself never fails: unknown input and generator trouble turn
//! into empty results. These errors only cover reading declarations from disk.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpecError {
    #[error("failed to read spec file {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON spec")]
    Json(#[from] serde_json::Error),

    #[error("invalid YAML spec")]
    Yaml(#[from] serde_yaml::Error),

    #[error("unsupported spec file extension: {0:?}")]
    UnsupportedFormat(PathBuf),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
}

pub type SpecResult<T> = Result<T, SpecError>;
