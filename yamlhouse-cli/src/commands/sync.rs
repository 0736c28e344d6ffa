//! `yamlhouse sync`: one sync run over every configured service.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use yamlhouse_services::ServiceRegistry;
use yamlhouse_sync::{error_chain, pipeline, CommitStatus, ServiceReport, SyncReport, WriteResult};

use super::{open_store, ConfigArg};

/// Arguments for `yamlhouse sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    #[command(flatten)]
    pub config: ConfigArg,

    /// Show what would be written without writing or committing anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Push afterwards unless the commit step failed.
    #[arg(long, conflicts_with = "dry_run")]
    pub push: bool,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let config = self.config.load()?;
        let registry =
            ServiceRegistry::from_config(&config.services).context("invalid service configuration")?;
        let store = open_store(&config.repository).with_dry_run(self.dry_run);

        let verbose = self.dry_run;
        let report = pipeline::run_with(&registry, &store, |_, result| print_write(result, verbose))
            .with_context(|| format!("sync failed for {}", store.root().display()))?;
        print_report(&report, self.dry_run);

        if self.push && report.can_push() {
            match pipeline::push(&store) {
                Ok(()) => println!("✓ pushed"),
                Err(err) => println!("{} push failed: {}", "✗".red(), error_chain(&err)),
            }
        }
        Ok(())
    }
}

fn print_report(report: &SyncReport, dry_run: bool) {
    let prefix = if dry_run { "[dry-run] " } else { "" };
    for service in &report.services {
        print_service(prefix, service);
    }

    let elapsed = report.finished_at - report.started_at;
    let commit = match &report.commit {
        CommitStatus::Committed => "committed".green().to_string(),
        CommitStatus::NothingToCommit => "nothing to commit".bright_black().to_string(),
        CommitStatus::DryRun => "commit skipped".bright_black().to_string(),
        CommitStatus::Failed(message) => format!("{} {message}", "commit failed:".red()),
    };
    println!(
        "{prefix}{} service(s), {} failed, {commit} in {:.1}s",
        report.services.len(),
        report.failed_services().count(),
        elapsed.num_milliseconds() as f64 / 1000.0,
    );
}

fn print_write(result: &WriteResult, verbose: bool) {
    match result {
        WriteResult::Written { path } => println!("  ✎  {}", path.display()),
        WriteResult::WouldWrite { path } => println!("  ~  {}", path.display()),
        WriteResult::Unchanged { path } if verbose => println!("  ·  {}", path.display()),
        WriteResult::Unchanged { .. } => {}
    }
}

fn print_service(prefix: &str, service: &ServiceReport) {
    let name = &service.service;
    let mark = if service.is_failed() { "✗".red() } else { "✓".green() };
    println!(
        "{prefix}{mark} '{name}' ({} written, {} unchanged{})",
        service.written + service.would_write,
        service.unchanged,
        if service.write_failures > 0 {
            format!(", {} write failures", service.write_failures)
        } else {
            String::new()
        },
    );
    if let Some(error) = &service.fetch_error {
        println!("    {}", error.as_str().red());
    }
}
