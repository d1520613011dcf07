//! `sitesync init --site <URI> --content-root <DIR>`

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use sitesync_core::{config, SiteId};

use super::home_dir;

/// Write a default config for a site.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// URI identifying the publishing site (e.g. https://example.dev).
    #[arg(long)]
    pub site: String,

    /// Directory holding the markdown posts.
    #[arg(long, value_name = "DIR")]
    pub content_root: PathBuf,
}

impl InitArgs {
    pub fn run(self, explicit: Option<&Path>) -> Result<()> {
        if explicit.is_some() {
            anyhow::bail!("`init` always writes ~/.sitesync/config.yaml; drop --config");
        }
        let home = home_dir()?;
        let content_root = self
            .content_root
            .canonicalize()
            .with_context(|| format!("cannot resolve path '{}'", self.content_root.display()))?;

        let already = config::config_path_at(&home).exists();
        let cfg = config::init_at(&home, SiteId::from(self.site), content_root)
            .context("failed to write config")?;

        let path = config::config_path_at(&home);
        if already {
            println!("✓ Config already present at {}", path.display());
        } else {
            println!("✓ Wrote {}", path.display());
        }
        println!("  site:         {}", cfg.site);
        println!("  content root: {}", cfg.content_root.display());
        println!("  store:        {:?}", cfg.store.kind);
        Ok(())
    }
}
