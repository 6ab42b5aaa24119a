//! wmsync — compare a local workspace tree with a remote snapshot.
//!
//! # Usage
//!
//! ```text
//! wmsync diff --remote <dir> [--local <dir>] [--direction pull|push] [--branch <name>] [--json]
//! wmsync config [--dir <dir>] [--branch <name>] [--promotion <name>]
//! wmsync lock-key <script> [--dir <dir>]
//! ```
//!
//! Nothing is ever written: every command is a dry run.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{config::ConfigArgs, diff::DiffArgs, lock_key::LockKeyArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "wmsync",
    version,
    about = "Plan branch-aware syncs between a local workspace and a remote snapshot",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show what a pull or push would change.
    Diff(DiffArgs),

    /// Print the effective configuration for a branch.
    Config(ConfigArgs),

    /// Show the dependency lock cache key and lock state of a script.
    LockKey(LockKeyArgs),
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
        Commands::Diff(args) => args.run(),
        Commands::Config(args) => args.run(),
        Commands::LockKey(args) => args.run(),
    }
}
