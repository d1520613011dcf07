//! sitesync: publish blog posts as `site.standard.document` records.
//!
//! # Usage
//!
//! ```text
//! sitesync init --site <URI> --content-root <DIR>
//! sitesync sync [PATH] [--dry-run] [--json]
//! sitesync check [--json]
//! sitesync key <DATE> [--clock-id N]
//! sitesync daemon start|stop|status|sync [PATH]
//! ```

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    check::CheckArgs, daemon::DaemonCommand, init::InitArgs, key::KeyArgs, sync::SyncArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "sitesync",
    version,
    about = "Publish markdown posts to a remote record store",
    long_about = None,
)]
struct Cli {
    /// Config file to use instead of ~/.sitesync/config.yaml.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log per-document decisions (drafts, unchanged posts).
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a default config for a site.
    Init(InitArgs),

    /// Publish new and changed posts.
    Sync(SyncArgs),

    /// Extract and validate every post without publishing.
    Check(CheckArgs),

    /// Print the record key a publish date maps to.
    Key(KeyArgs),

    /// Run or control the background watcher.
    Daemon {
        #[command(subcommand)]
        command: DaemonCommand,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Init(args) => args.run(config),
        Commands::Sync(args) => args.run(config),
        Commands::Check(args) => args.run(config),
        Commands::Key(args) => args.run(),
        Commands::Daemon { command } => commands::daemon::run(command, config),
    }
}

/// Logs go to stderr so `--json` output stays parseable.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
