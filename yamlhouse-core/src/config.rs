//! YAML sync configuration.
//!
//! # File layout
//!
//! ```text
//! repository:
//!   path: ./snapshot
//!   url: git@example.com:me/snapshot.git
//! services:
//!   - kind: asana
//!     api_key: { env: ASANA_TOKEN }
//! ```
//!
//! # API pattern
//!
//! - `load_at(path)`: explicit path; used in tests with `TempDir`
//! - `load()`: derives the path from `dirs::config_dir()`, delegates to `load_at`

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Root of the sync configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    pub repository: RepositoryConfig,
    #[serde(default)]
    pub services: Vec<ServiceEntry>,
}

/// Where the snapshot working tree lives and where it is cloned from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Working tree location. Relative paths are resolved against the
    /// directory holding the config file.
    pub path: PathBuf,
    /// Remote URL used for the initial clone.
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_email: Option<String>,
}

/// One configured service. `kind` selects the adapter; everything else is
/// kept as raw YAML and decoded by that adapter's constructor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceEntry {
    pub kind: String,
    /// Namespace override; adapters fall back to their kind's default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub settings: serde_yaml::Mapping,
}

/// A secret, given inline or by environment variable name.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Credential {
    Env { env: String },
    Literal(String),
}

impl Credential {
    /// Resolve the secret value.
    pub fn resolve(&self) -> Result<String, ConfigError> {
        match self {
            Credential::Literal(value) => Ok(value.clone()),
            Credential::Env { env } => std::env::var(env)
                .ok()
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ConfigError::MissingEnv { var: env.clone() }),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Env { env } => f.debug_struct("Env").field("env", env).finish(),
            Credential::Literal(_) => f.write_str("Literal(***)"),
        }
    }
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// `<config_dir>/yamlhouse/config.yaml`. Pure, no I/O.
pub fn default_path() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join("yamlhouse").join("config.yaml"))
        .ok_or(ConfigError::ConfigDirNotFound)
}

/// Load the config at `path`.
///
/// Returns `ConfigError::NotFound` if absent,
/// `ConfigError::Parse` (with path + line context) if malformed YAML.
pub fn load_at(path: &Path) -> Result<SyncConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut config: SyncConfig =
        serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;

    if config.repository.path.is_relative() {
        if let Some(base) = path.parent() {
            config.repository.path = base.join(&config.repository.path);
        }
    }
    Ok(config)
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<SyncConfig, ConfigError> {
    load_at(&default_path()?)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
