pub mod config;
pub mod patch;
pub mod publish;
pub mod read;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use pagedrop_core::StoreConfig;
use pagedrop_store::GitHubContentsStore;
use pagedrop_sync::{RetryPolicy, VersionedWriter};

/// Writer over the configured remote store.
pub(crate) fn remote_writer(config: &StoreConfig, dry_run: bool) -> Result<VersionedWriter> {
    let store = GitHubContentsStore::new(config).context("failed to create store client")?;
    Ok(VersionedWriter::new(Arc::new(store), RetryPolicy::from_settings(&config.retry)).dry_run(dry_run))
}

pub(crate) fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("cannot read '{}'", path.display()))
}
