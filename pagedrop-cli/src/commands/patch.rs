//! `pagedrop patch` — replace one section of a published site.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use pagedrop_core::{normalize_section, normalize_slug, SectionName, Slug, StoreConfig};
use pagedrop_sync::{SectionPatcher, WriteResult};

use super::{read_text, remote_writer};

/// Arguments for `pagedrop patch`.
#[derive(Args, Debug)]
pub struct PatchArgs {
    /// Site identifier (normalized like `publish`).
    pub slug: String,

    /// Section name; matches `<!-- SECTION:{name}:start -->` after normalization.
    pub section: String,

    /// File whose contents become the new section interior.
    #[arg(long)]
    pub content: PathBuf,

    /// Print the diff that would be committed instead of writing.
    #[arg(long)]
    pub dry_run: bool,

    /// Give up if the patch has not been written after this many seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

/// A validated patch, ready to run against a store.
pub struct PatchPlan {
    slug: Slug,
    section: SectionName,
    interior: String,
    dry_run: bool,
    timeout: Option<Duration>,
}

impl PatchArgs {
    pub fn prepare(self) -> Result<PatchPlan> {
        let slug = normalize_slug(&self.slug).context("invalid slug")?;
        let section = normalize_section(&self.section).context("invalid section name")?;
        let interior = read_text(&self.content)?;
        Ok(PatchPlan {
            slug,
            section,
            interior,
            dry_run: self.dry_run,
            timeout: self.timeout.map(Duration::from_secs),
        })
    }
}

impl PatchPlan {
    pub async fn execute(self, config: &StoreConfig) -> Result<()> {
        let mut patcher = SectionPatcher::new(remote_writer(config, self.dry_run)?);
        if let Some(timeout) = self.timeout {
            patcher = patcher.deadline(tokio::time::Instant::now() + timeout);
        }
        let failed = || format!("patch failed for section '{}' of '{}'", self.section, self.slug);

        if self.dry_run {
            let diff = patcher
                .preview(&self.slug, &self.section, &self.interior)
                .await
                .with_context(failed)?;
            if diff.is_empty() {
                println!("No changes for section '{}'.", self.section);
            } else {
                print!("{}", diff.unified_diff);
            }
            return Ok(());
        }

        let result = patcher
            .patch(&self.slug, &self.section, &self.interior)
            .await
            .with_context(failed)?;
        match result {
            WriteResult::Written { path, token, .. } => {
                println!("{} section '{}' updated in {path} ({token})", "✓".green(), self.section)
            }
            WriteResult::Unchanged { path, .. } => {
                println!("{} section '{}' already up to date in {path}", "·".dimmed(), self.section)
            }
            WriteResult::WouldWrite { path } => println!("  ~  {path}"),
        }
        Ok(())
    }
}
