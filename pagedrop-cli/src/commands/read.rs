//! `pagedrop read` — print a stored file.

use std::io::Write;

use anyhow::{bail, Context, Result};
use clap::Args;
use pagedrop_core::StoreConfig;
use pagedrop_store::{GitHubContentsStore, RemoteFileStore};

/// Arguments for `pagedrop read`.
#[derive(Args, Debug)]
pub struct ReadArgs {
    /// Store path, e.g. `mon-cafe/index.html`.
    pub path: String,
}

impl ReadArgs {
    pub async fn run(self, config: &StoreConfig) -> Result<()> {
        let store = GitHubContentsStore::new(config).context("failed to create store client")?;
        let file = store
            .read(&self.path)
            .await
            .with_context(|| format!("cannot read '{}'", self.path))?;

        let (Some(content), Some(token)) = (file.content, file.token) else {
            bail!("'{}' does not exist", self.path);
        };
        eprintln!("version: {token}");
        std::io::stdout()
            .write_all(&content)
            .context("failed to write to stdout")?;
        Ok(())
    }
}
