//! `repowatch export <PATH>` and `repowatch import <PATH>`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use repowatch_core::catalog;

use super::home;

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Destination file; overwritten if it exists.
    pub path: PathBuf,
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// A file previously written by `repowatch export`.
    pub path: PathBuf,
}

impl ExportArgs {
    pub fn run(self) -> Result<()> {
        catalog::export_at(&home()?, &self.path)
            .with_context(|| format!("failed to export to '{}'", self.path.display()))?;
        println!("✓ Exported catalog to {}", self.path.display());
        Ok(())
    }
}

impl ImportArgs {
    pub fn run(self) -> Result<()> {
        let summary = catalog::import_at(&home()?, &self.path)
            .with_context(|| format!("failed to import '{}'", self.path.display()))?;
        println!(
            "✓ Imported {} repos, {} releases, {} commits",
            summary.repo_count, summary.release_count, summary.commit_count
        );
        Ok(())
    }
}
