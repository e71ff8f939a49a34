//! `repowatch last-commit` and `repowatch rate-limit`: live lookups that
//! never touch the catalog.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use clap::Args;
use colored::Colorize;

use repowatch_core::RepoKey;
use repowatch_sync::{last_commit_at, rate_limit_at, GithubClient};

use super::{headline, home, print_json};

#[derive(Args, Debug)]
pub struct LastCommitArgs {
    /// `owner/name` or a GitHub URL; need not be tracked.
    pub repo: String,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct RateLimitArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl LastCommitArgs {
    pub fn run(self) -> Result<()> {
        let key = RepoKey::parse(&self.repo)
            .with_context(|| format!("invalid repository '{}'", self.repo))?;
        let commit = last_commit_at(&home()?, &GithubClient::from_env(), &key)
            .with_context(|| format!("failed to look up last commit of {key}"))?;

        if self.json {
            return print_json(&commit);
        }
        println!("{} {}", commit.sha.yellow(), headline(&commit.message, 72).bold());
        println!("  author: {}", commit.author_name);
        println!("  date:   {}", commit.committed_at.to_rfc3339());
        println!("  url:    {}", commit.url);
        Ok(())
    }
}

impl RateLimitArgs {
    pub fn run(self) -> Result<()> {
        let rate = rate_limit_at(&home()?, &GithubClient::from_env())
            .context("failed to read GitHub rate limit")?;
        if self.json {
            return print_json(&rate);
        }

        let remaining = format!("{}/{}", rate.remaining, rate.limit);
        let remaining = if rate.remaining == 0 {
            remaining.red()
        } else if rate.remaining * 10 < rate.limit {
            remaining.yellow()
        } else {
            remaining.green()
        };
        println!("Remaining: {remaining} ({} used)", rate.used);
        if let Some(reset) = DateTime::<Utc>::from_timestamp(rate.reset, 0) {
            println!(
                "Resets at: {}",
                reset.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
            );
        }
        Ok(())
    }
}
