//! `sitesync sync`: publish new and changed posts.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde_json::json;

use sitesync_sync::{
    pipeline::{self, SyncScope},
    DocumentOutcome, Orchestrator, PassReport,
};

use super::load_config;

/// Arguments for `sitesync sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Sync one changed file instead of the whole content root.
    pub path: Option<PathBuf>,

    /// Log the records that would be published instead of sending them.
    #[arg(long)]
    pub dry_run: bool,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl SyncArgs {
    pub fn run(self, explicit: Option<&Path>) -> Result<()> {
        let config = load_config(explicit)?;
        let orchestrator =
            Orchestrator::from_config(&config, self.dry_run).context("failed to set up sync")?;

        let scope = match self.path {
            Some(path) => {
                let path = path
                    .canonicalize()
                    .with_context(|| format!("cannot resolve path '{}'", path.display()))?;
                SyncScope::Document(path)
            }
            None => SyncScope::All,
        };
        let report = pipeline::run(&orchestrator, scope).context("sync failed")?;

        if self.json {
            print_json(&report)?;
        } else {
            print_report(&report, self.dry_run);
        }

        let broken = report.invalid() + report.failed();
        if broken > 0 {
            anyhow::bail!("{broken} document(s) were not published");
        }
        Ok(())
    }
}

fn print_json(report: &PassReport) -> Result<()> {
    let payload = json!({
        "summary": {
            "documents": report.documents.len(),
            "published": report.published(),
            "unchanged": report.unchanged(),
            "drafts": report.drafts(),
            "invalid": report.invalid(),
            "failed": report.failed(),
            "duration_ms": report.duration_ms,
        },
        "documents": report.documents,
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize sync JSON")?
    );
    Ok(())
}

fn print_report(report: &PassReport, dry_run: bool) {
    let prefix = if dry_run { "[dry-run] " } else { "" };
    if report.documents.is_empty() {
        println!("{prefix}✓ nothing to sync");
        return;
    }

    println!(
        "{prefix}✓ {} published, {} unchanged, {} drafts, {} invalid, {} failed ({} ms)",
        report.published(),
        report.unchanged(),
        report.drafts(),
        report.invalid(),
        report.failed(),
        report.duration_ms,
    );

    for doc in &report.documents {
        match &doc.outcome {
            DocumentOutcome::Published { key, record_path } => {
                println!("  {}  {} → {record_path} ({key})", "✎".green(), doc.path)
            }
            DocumentOutcome::SkippedUnchanged { .. } => println!("  ·  {}", doc.path),
            DocumentOutcome::SkippedDraft { .. } => {
                println!("  {}  {} (draft)", "~".yellow(), doc.path)
            }
            DocumentOutcome::Invalid { issues } => {
                println!("  {}  {}: {issues}", "✗".red(), doc.path)
            }
            DocumentOutcome::Failed { error } => {
                println!("  {}  {}: {error}", "!".red().bold(), doc.path)
            }
        }
    }
}
