//! `sitesync key <DATE> [--clock-id N]`

use anyhow::{Context, Result};
use clap::Args;

use sitesync_core::config::DEFAULT_CLOCK_ID;
use sitesync_record::derive_key;

/// Print the record key a publish date maps to.
#[derive(Args, Debug)]
pub struct KeyArgs {
    /// `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS` (UTC) or an RFC 3339 timestamp.
    pub date: String,

    /// Clock id mixed into the key (0-1023).
    #[arg(long, default_value_t = DEFAULT_CLOCK_ID)]
    pub clock_id: u16,
}

impl KeyArgs {
    pub fn run(self) -> Result<()> {
        let key = derive_key(&self.date, self.clock_id)
            .with_context(|| format!("cannot derive a key for '{}'", self.date))?;
        println!("{key}");
        Ok(())
    }
}
