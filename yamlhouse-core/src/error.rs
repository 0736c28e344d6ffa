//! Error types for yamlhouse-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building domain values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// Every record needs a non-empty id to be addressable on disk.
    #[error("record id must not be empty")]
    EmptyRecordId,
}

/// All errors that can arise while loading or resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure while reading the config file.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file did not exist at the expected path.
    #[error("config not found at {path}")]
    NotFound { path: PathBuf },

    /// YAML parse error on load; includes file path and line context from serde_yaml.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::config_dir()` returned `None`.
    #[error("cannot determine config directory; pass --config explicitly")]
    ConfigDirNotFound,

    /// A credential referenced an environment variable that is not set.
    #[error("environment variable {var} is not set")]
    MissingEnv { var: String },
}
