//! `yamlhouse services`: list configured services.

use anyhow::{Context, Result};
use clap::Args;
use tabled::{settings::Style, Table, Tabled};
use yamlhouse_services::ServiceRegistry;

use super::ConfigArg;

/// Arguments for `yamlhouse services`.
#[derive(Args, Debug)]
pub struct ServicesArgs {
    #[command(flatten)]
    pub config: ConfigArg,
}

#[derive(Tabled)]
struct ServiceRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "name")]
    name: String,
    #[tabled(rename = "kind")]
    kind: String,
}

impl ServicesArgs {
    pub fn run(self) -> Result<()> {
        let config = self.config.load()?;
        let registry =
            ServiceRegistry::from_config(&config.services).context("invalid service configuration")?;

        if registry.is_empty() {
            println!("No services configured.");
            return Ok(());
        }

        let rows: Vec<ServiceRow> = registry
            .all()
            .iter()
            .enumerate()
            .map(|(index, adapter)| ServiceRow {
                index,
                name: adapter.name().to_string(),
                kind: adapter.kind().to_string(),
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        Ok(())
    }
}
