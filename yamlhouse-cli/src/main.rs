//! yamlhouse: mirror task-tracker records into a git repository as YAML.
//!
//! # Usage
//!
//! ```text
//! yamlhouse sync [--config <path>] [--dry-run] [--push]
//! yamlhouse push [--config <path>]
//! yamlhouse services [--config <path>]
//! ```
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{push::PushArgs, services::ServicesArgs, sync::SyncArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "yamlhouse",
    version,
    about = "Sync Asana and Jira records into a git repository as YAML files",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch every configured service, write its records and commit once.
    Sync(SyncArgs),

    /// Push the working tree to its remote.
    Push(PushArgs),

    /// List the configured services.
    Services(ServicesArgs),
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::Sync(args) => args.run(),
        Commands::Push(args) => args.run(),
        Commands::Services(args) => args.run(),
    }
}
