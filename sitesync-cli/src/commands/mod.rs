pub mod check;
pub mod daemon;
pub mod init;
pub mod key;
pub mod sync;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use sitesync_core::{config, Config, ConfigError};

pub(crate) fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().context("could not determine home directory")
}

/// `--config` when given, otherwise `~/.sitesync/config.yaml`.
pub(crate) fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let result = match explicit {
        Some(path) => config::load_from(path),
        None => config::load_at(&home_dir()?),
    };
    match result {
        Err(ConfigError::NotFound { path }) => anyhow::bail!(
            "no config at {}; run `sitesync init` first",
            path.display()
        ),
        other => other.context("failed to load config"),
    }
}
