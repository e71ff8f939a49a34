//! `repowatch fetch`: synchronize the catalog with GitHub.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use repowatch_sync::{synchronize_at, GithubClient};

use super::records::print_releases;
use super::{home, print_json};

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Emit the merged releases and commits as JSON.
    #[arg(long)]
    pub json: bool,
}

impl FetchArgs {
    pub fn run(self) -> Result<()> {
        let home = home()?;
        let client = GithubClient::from_env();
        let outcome = synchronize_at(&home, &client).context("fetch failed")?;

        if self.json {
            return print_json(&serde_json::json!({
                "releases": outcome.releases,
                "commits": outcome.commits,
                "report": outcome.report,
            }));
        }

        for key in &outcome.report.missing {
            println!(
                "{}",
                format!("! {key} was not returned by GitHub (renamed, deleted or private?)")
                    .yellow()
            );
        }
        print_releases(&outcome.releases);

        let report = &outcome.report;
        println!(
            "✓ {} new, {} updated releases · {} new, {} updated commits",
            report.releases_inserted,
            report.releases_replaced,
            report.commits_inserted,
            report.commits_replaced,
        );
        Ok(())
    }
}
