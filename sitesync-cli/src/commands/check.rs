//! `sitesync check`: extract and validate every post, publish nothing.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use sitesync_sync::{CheckReport, CheckStatus, Orchestrator};

use super::load_config;

/// Arguments for `sitesync check`.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct CheckTableRow {
    #[tabled(rename = "document")]
    document: String,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "key")]
    key: String,
    #[tabled(rename = "detail")]
    detail: String,
}

impl CheckArgs {
    pub fn run(self, explicit: Option<&Path>) -> Result<()> {
        let config = load_config(explicit)?;
        // Never publishes; the dry-run store keeps credentials out of it.
        let orchestrator = Orchestrator::from_config(&config, true).context("failed to set up")?;
        let reports = orchestrator
            .check_all()
            .context("failed to list documents")?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&reports).context("failed to serialize check JSON")?
            );
        } else {
            print_table(&reports);
        }

        let broken = reports
            .iter()
            .filter(|r| matches!(r.status, CheckStatus::Invalid { .. } | CheckStatus::Failed { .. }))
            .count();
        if broken > 0 {
            anyhow::bail!("{broken} document(s) would not be published");
        }
        Ok(())
    }
}

fn print_table(reports: &[CheckReport]) {
    if reports.is_empty() {
        println!("No documents found.");
        return;
    }

    let rows: Vec<CheckTableRow> = reports.iter().map(table_row).collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    let warnings: usize = reports.iter().map(|r| r.frontmatter_issues.len()).sum();
    if warnings > 0 {
        println!(
            "{}",
            format!("{warnings} frontmatter line(s) were ignored; run with --json for details")
                .yellow()
        );
    }
}

fn table_row(report: &CheckReport) -> CheckTableRow {
    let (status, key, detail) = match &report.status {
        CheckStatus::Ready { key, record } => (
            "READY".green().to_string(),
            key.to_string(),
            record.path.clone(),
        ),
        CheckStatus::Draft { record_path } => (
            "DRAFT".yellow().to_string(),
            String::new(),
            record_path.clone(),
        ),
        CheckStatus::Invalid { issues } => (
            "INVALID".red().to_string(),
            String::new(),
            issues.to_string(),
        ),
        CheckStatus::Failed { error } => (
            "FAILED".red().bold().to_string(),
            String::new(),
            error.clone(),
        ),
    };
    CheckTableRow {
        document: report.path.to_string(),
        status,
        key,
        detail,
    }
}
