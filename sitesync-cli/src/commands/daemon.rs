//! `sitesync daemon`: background watcher lifecycle.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use sitesync_daemon::paths::socket_path;
use sitesync_daemon::{request_status, request_stop, request_sync, start_blocking, DaemonError};
use sitesync_sync::Orchestrator;

use super::{home_dir, load_config};

#[derive(Subcommand, Debug)]
pub enum DaemonCommand {
    /// Run the daemon in the foreground (initial sync + watcher + socket server).
    Start(DaemonStartArgs),
    /// Request graceful daemon shutdown over the Unix socket.
    Stop,
    /// Query daemon runtime status over the Unix socket.
    Status,
    /// Ask the running daemon to sync everything, or one file.
    Sync(DaemonSyncArgs),
}

#[derive(Args, Debug)]
pub struct DaemonStartArgs {
    /// Log records instead of publishing them.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct DaemonSyncArgs {
    /// File to sync; omit for a full pass.
    pub path: Option<PathBuf>,
}

pub fn run(command: DaemonCommand, explicit: Option<&Path>) -> Result<()> {
    let home = home_dir()?;

    match command {
        DaemonCommand::Start(args) => {
            let config = load_config(explicit)?;
            let orchestrator = Orchestrator::from_config(&config, args.dry_run)
                .context("failed to set up sync")?;
            start_blocking(&home, orchestrator).context("daemon exited with error")?;
        }
        DaemonCommand::Stop => match request_stop(&home) {
            Ok(()) => println!("daemon stop requested"),
            Err(DaemonError::DaemonNotRunning { .. }) => {
                println!("daemon is not running");
            }
            Err(err) => return Err(err).context("failed to stop daemon"),
        },
        DaemonCommand::Status => {
            let payload = match request_status(&home) {
                Ok(status) => status,
                Err(DaemonError::DaemonNotRunning { .. }) => serde_json::json!({
                    "running": false,
                    "socket": socket_path(&home).display().to_string(),
                }),
                Err(err) => return Err(err).context("failed to query daemon status"),
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&payload)
                    .context("failed to render daemon status JSON")?
            );
        }
        DaemonCommand::Sync(args) => {
            let path = args
                .path
                .map(|p| {
                    p.canonicalize()
                        .with_context(|| format!("cannot resolve path '{}'", p.display()))
                })
                .transpose()?;
            let summary = request_sync(&home, path.as_deref()).context("daemon sync failed")?;
            println!(
                "{}",
                serde_json::to_string_pretty(&summary)
                    .context("failed to render sync summary JSON")?
            );
        }
    }

    Ok(())
}
