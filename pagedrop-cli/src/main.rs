//! pagedrop — publish static sites into a versioned remote store.
//!
//! # Usage
//!
//! ```text
//! pagedrop publish <slug> --html <file> [--css <file>] [--js <file>] [--dry-run] [--json] [--timeout <secs>]
//! pagedrop patch <slug> <section> --content <file> [--dry-run]
//! pagedrop read <path>
//! pagedrop config
//! ```
//!
//! Credentials come from `PAGEDROP_GITHUB_TOKEN`; owner/repo/branch from the
//! environment or `~/.pagedrop/config.yaml`.

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use commands::{config::ConfigArgs, patch::PatchArgs, publish::PublishArgs, read::ReadArgs};
use pagedrop_core::{config, StoreConfig};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "pagedrop",
    version,
    about = "Publish and patch static sites in a versioned remote store",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Publish a site (index.html plus optional CSS/JS) under its slug.
    Publish(PublishArgs),

    /// Replace one marker-delimited section of a published site.
    Patch(PatchArgs),

    /// Print a stored file and its version token.
    Read(ReadArgs),

    /// Show the resolved store configuration (token redacted).
    Config(ConfigArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    // Inputs are validated before configuration is touched, so a bad slug
    // fails without credentials or network.
    match cli.command {
        Commands::Publish(args) => {
            let plan = args.prepare()?;
            plan.execute(&load_config()?).await
        }
        Commands::Patch(args) => {
            let plan = args.prepare()?;
            plan.execute(&load_config()?).await
        }
        Commands::Read(args) => args.run(&load_config()?).await,
        Commands::Config(args) => args.run(&home()?),
    }
}

fn home() -> Result<PathBuf> {
    dirs::home_dir().context("could not determine home directory")
}

fn load_config() -> Result<StoreConfig> {
    let home = home()?;
    config::load_at(&home).context("failed to load store configuration")
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
