//! `pagedrop config` — show where settings resolve to.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use tabled::{settings::Style, Table, Tabled};

use pagedrop_core::config;

/// Arguments for `pagedrop config`.
#[derive(Args, Debug)]
pub struct ConfigArgs {}

#[derive(Tabled)]
struct Row {
    #[tabled(rename = "setting")]
    setting: &'static str,
    #[tabled(rename = "value")]
    value: String,
}

impl ConfigArgs {
    pub fn run(self, home: &Path) -> Result<()> {
        let cfg = config::load_at(home).context("failed to load store configuration")?;
        let rows = vec![
            Row { setting: "config file", value: config::config_path_at(home).display().to_string() },
            Row { setting: "api_base", value: cfg.api_base.clone() },
            Row { setting: "owner", value: cfg.owner.clone() },
            Row { setting: "repo", value: cfg.repo.clone() },
            Row { setting: "branch", value: cfg.branch.clone() },
            Row { setting: "token", value: cfg.token.to_string() },
            Row { setting: "retry.max_attempts", value: cfg.retry.max_attempts.to_string() },
            Row { setting: "retry.base_delay_ms", value: cfg.retry.base_delay_ms.to_string() },
        ];
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        Ok(())
    }
}
