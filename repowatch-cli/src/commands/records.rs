//! `repowatch releases` and `repowatch commits`: read the stored catalog.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use repowatch_core::{catalog, Commit, Release};

use super::{age, headline, home, print_json};

#[derive(Args, Debug)]
pub struct ReleasesArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct CommitsArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct ReleaseRow {
    #[tabled(rename = "repository")]
    repository: String,
    #[tabled(rename = "tag")]
    tag: String,
    #[tabled(rename = "name")]
    name: String,
    #[tabled(rename = "published")]
    published: String,
}

#[derive(Tabled)]
struct CommitRow {
    #[tabled(rename = "repository")]
    repository: String,
    #[tabled(rename = "sha")]
    sha: String,
    #[tabled(rename = "message")]
    message: String,
    #[tabled(rename = "author")]
    author: String,
    #[tabled(rename = "date")]
    date: String,
}

impl ReleasesArgs {
    pub fn run(self) -> Result<()> {
        let releases = catalog::stored_releases_at(&home()?);
        if self.json {
            return print_json(&releases);
        }
        print_releases(&releases);
        Ok(())
    }
}

impl CommitsArgs {
    pub fn run(self) -> Result<()> {
        let commits = catalog::stored_commits_at(&home()?);
        if self.json {
            return print_json(&commits);
        }
        print_commits(&commits);
        Ok(())
    }
}

pub fn print_releases(releases: &[Release]) {
    if releases.is_empty() {
        println!("No releases stored. Run: repowatch fetch");
        return;
    }
    let rows: Vec<ReleaseRow> = releases
        .iter()
        .map(|r| ReleaseRow {
            repository: format!("{}/{}", r.repo_owner, r.repo_name),
            tag: r.tag_name.green().to_string(),
            name: r.name.clone(),
            published: format!("{} ago", age(r.published_at)),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}

fn print_commits(commits: &[Commit]) {
    if commits.is_empty() {
        println!("No commits stored. Run: repowatch fetch");
        return;
    }
    let rows: Vec<CommitRow> = commits
        .iter()
        .map(|c| CommitRow {
            repository: format!("{}/{}", c.repo_owner, c.repo_name),
            sha: c.sha.chars().take(7).collect::<String>().yellow().to_string(),
            message: headline(&c.message, 60),
            author: c.author_name.clone(),
            date: format!("{} ago", age(c.committed_at)),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}
