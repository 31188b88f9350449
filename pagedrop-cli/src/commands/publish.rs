//! `pagedrop publish` — write a site's files under its slug.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use colored::Colorize;
use serde_json::json;

use pagedrop_core::{PublishUnit, StoreConfig};
use pagedrop_sync::{build_unit, BatchPublisher, PublishError, PublishReport, SiteRequest, WriteResult};

use super::{read_text, remote_writer};

/// Arguments for `pagedrop publish`.
#[derive(Args, Debug)]
pub struct PublishArgs {
    /// Site identifier; normalized ("Mon Café!" → "mon-cafe").
    pub slug: String,

    /// HTML file published as index.html.
    #[arg(long)]
    pub html: PathBuf,

    /// Stylesheet published as styles/main.css.
    #[arg(long)]
    pub css: Option<PathBuf>,

    /// Script published as js/main.js.
    #[arg(long)]
    pub js: Option<PathBuf>,

    /// Compare against the store without writing anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Emit a machine-readable JSON report.
    #[arg(long)]
    pub json: bool,

    /// Stop before the next file once this many seconds have elapsed.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

/// A validated publish, ready to run against a store.
pub struct PublishPlan {
    unit: PublishUnit,
    dry_run: bool,
    json: bool,
    timeout: Option<Duration>,
}

impl PublishArgs {
    pub fn prepare(self) -> Result<PublishPlan> {
        let request = SiteRequest {
            slug: self.slug.clone(),
            html: Some(read_text(&self.html)?),
            css: self.css.as_deref().map(read_text).transpose()?,
            js: self.js.as_deref().map(read_text).transpose()?,
        };
        let unit = build_unit(&request, Utc::now())
            .with_context(|| format!("cannot publish '{}'", self.slug))?;
        Ok(PublishPlan {
            unit,
            dry_run: self.dry_run,
            json: self.json,
            timeout: self.timeout.map(Duration::from_secs),
        })
    }
}

impl PublishPlan {
    pub async fn execute(self, config: &StoreConfig) -> Result<()> {
        let mut publisher = BatchPublisher::new(remote_writer(config, self.dry_run)?);
        if let Some(timeout) = self.timeout {
            publisher = publisher.deadline(tokio::time::Instant::now() + timeout);
        }

        let slug = self.unit.slug.clone();
        match publisher.publish(self.unit).await {
            Ok(report) => {
                if self.json {
                    println!("{}", serde_json::to_string_pretty(&report_json(&report))?);
                } else {
                    print_report(&report, self.dry_run);
                }
                Ok(())
            }
            Err(err) => {
                if let Some(failure) = err.batch_failure() {
                    print_writes(&failure.committed);
                    eprintln!("  {}  {}", "✗".red(), failure.path);
                }
                if let PublishError::DeadlineExceeded { committed, .. } = &err {
                    print_writes(committed);
                }
                Err(err).with_context(|| format!("publish failed for '{slug}'"))
            }
        }
    }
}

fn report_json(report: &PublishReport) -> serde_json::Value {
    let files: Vec<_> = report
        .writes
        .iter()
        .map(|w| {
            let status = match w {
                WriteResult::Written { .. } => "written",
                WriteResult::Unchanged { .. } => "unchanged",
                WriteResult::WouldWrite { .. } => "would_write",
            };
            json!({
                "path": w.path(),
                "status": status,
                "token": w.token().map(|t| t.0.clone()),
            })
        })
        .collect();
    json!({
        "slug": report.slug.as_str(),
        "written": report.written(),
        "would_write": report.would_write(),
        "unchanged": report.unchanged(),
        "files": files,
    })
}

fn print_report(report: &PublishReport, dry_run: bool) {
    if dry_run {
        println!(
            "[dry-run] {} '{}' checked ({} would be written, {} unchanged)",
            "✓".green(),
            report.slug,
            report.would_write(),
            report.unchanged()
        );
    } else {
        println!(
            "{} '{}' published ({} written, {} unchanged)",
            "✓".green(),
            report.slug,
            report.written(),
            report.unchanged()
        );
    }
    print_writes(&report.writes);
}

fn print_writes(writes: &[WriteResult]) {
    for w in writes {
        match w {
            WriteResult::Written { path, .. } => println!("  ✎  {path}"),
            WriteResult::WouldWrite { path } => println!("  ~  {path}"),
            WriteResult::Unchanged { path, .. } => println!("  ·  {}", path.dimmed()),
        }
    }
}
