//! `yamlhouse push`: publish the working tree.

use anyhow::{Context, Result};
use clap::Args;
use yamlhouse_sync::pipeline;

use super::{open_store, ConfigArg};

/// Arguments for `yamlhouse push`.
#[derive(Args, Debug)]
pub struct PushArgs {
    #[command(flatten)]
    pub config: ConfigArg,
}

impl PushArgs {
    pub fn run(self) -> Result<()> {
        let config = self.config.load()?;
        let store = open_store(&config.repository);
        pipeline::push(&store)
            .with_context(|| format!("push failed for {}", store.root().display()))?;
        println!("✓ pushed {}", store.root().display());
        Ok(())
    }
}
