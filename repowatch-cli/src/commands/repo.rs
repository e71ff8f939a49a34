//! `repowatch repo add|list|remove`

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use repowatch_core::{catalog, RepoKey};

use super::super::SourceArg;
use super::{age, home, print_json};

#[derive(Subcommand, Debug)]
pub enum RepoCommand {
    /// Track one or more repositories.
    Add(AddArgs),

    /// List tracked repositories.
    List(ListArgs),

    /// Stop tracking a repository and drop its stored releases and commits.
    Remove(RemoveArgs),
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// `owner/name`, `https://github.com/owner/name` or
    /// `git@github.com:owner/name.git`. Several at once skip duplicates.
    #[arg(required = true, value_name = "REPO")]
    pub repos: Vec<String>,

    /// How the repository was found: manual | folder. Defaults to manual.
    #[arg(long, value_name = "SOURCE")]
    pub source: Option<SourceArg>,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// Repository id or `owner/name`.
    pub repo: String,
}

#[derive(Tabled)]
struct RepoRow {
    #[tabled(rename = "repository")]
    repository: String,
    #[tabled(rename = "source")]
    source: String,
    #[tabled(rename = "added")]
    added: String,
    #[tabled(rename = "id")]
    id: String,
}

pub fn run(cmd: RepoCommand) -> Result<()> {
    match cmd {
        RepoCommand::Add(args) => add(args),
        RepoCommand::List(args) => list(args),
        RepoCommand::Remove(args) => remove(args),
    }
}

fn add(args: AddArgs) -> Result<()> {
    let home = home()?;
    let source = args.source.unwrap_or_default().into();
    let keys = args
        .repos
        .iter()
        .map(|spec| RepoKey::parse(spec).with_context(|| format!("invalid repository '{spec}'")))
        .collect::<Result<Vec<_>>>()?;

    if let [key] = keys.as_slice() {
        let repo = catalog::add_repo_at(&home, key.clone(), source)
            .with_context(|| format!("failed to add '{key}'"))?;
        println!("✓ Tracking {}", repo.key().to_string().bold());
        return Ok(());
    }

    let outcome =
        catalog::add_repos_at(&home, keys, source).context("failed to add repositories")?;
    for repo in &outcome.added {
        println!("✓ Tracking {}", repo.key().to_string().bold());
    }
    for key in &outcome.skipped {
        println!("{}", format!("· Already tracked: {key}").bright_black());
    }
    println!(
        "{} added, {} skipped",
        outcome.added.len(),
        outcome.skipped.len()
    );
    Ok(())
}

fn list(args: ListArgs) -> Result<()> {
    let home = home()?;
    let repos = catalog::list_repos_at(&home);
    if args.json {
        return print_json(&repos);
    }
    if repos.is_empty() {
        println!("No repositories tracked.");
        println!("Run: repowatch repo add <owner/name>");
        return Ok(());
    }

    let rows: Vec<RepoRow> = repos
        .iter()
        .map(|repo| RepoRow {
            repository: repo.key().to_string(),
            source: repo.source.to_string(),
            added: format!("{} ago", age(repo.added_at)),
            id: repo.id.to_string(),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    Ok(())
}

fn remove(args: RemoveArgs) -> Result<()> {
    let home = home()?;
    let removed = catalog::remove_repo_at(&home, &args.repo)
        .with_context(|| format!("failed to remove '{}'", args.repo))?;
    println!("✓ Stopped tracking {}", removed.key());
    Ok(())
}
