//! Subcommand implementations.

pub mod push;
pub mod services;
pub mod sync;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use yamlhouse_core::{config, RepositoryConfig, SyncConfig};
use yamlhouse_sync::{GitCli, RecordStore};

/// `--config` flag shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct ConfigArg {
    /// Config file (default: `<config dir>/yamlhouse/config.yaml`).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl ConfigArg {
    pub fn load(&self) -> Result<SyncConfig> {
        let path = match &self.config {
            Some(path) => path.clone(),
            None => config::default_path().context("could not determine config directory")?,
        };
        let config = config::load_at(&path)
            .with_context(|| format!("failed to load config {}", path.display()))?;
        tracing::debug!(path = %path.display(), services = config.services.len(), "loaded config");
        Ok(config)
    }
}

/// Store over the configured working tree, committing as the configured
/// author when both name and email are set.
pub fn open_store(repository: &RepositoryConfig) -> RecordStore<GitCli> {
    let git = match (&repository.author_name, &repository.author_email) {
        (Some(name), Some(email)) => GitCli::with_identity(name.as_str(), email.as_str()),
        _ => GitCli::new(),
    };
    RecordStore::from_config(repository, git)
}
