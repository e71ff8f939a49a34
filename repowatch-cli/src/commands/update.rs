//! `repowatch update`: clone or pull local working copies.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use colored::{ColoredString, Colorize};

use repowatch_core::{settings, store, TrackedRepo};
use repowatch_update::{
    run_blocking, update_single, GitCli, RepoUpdateState, UpdateOptions, UpdateStatus,
    UpdateSummary, UpdateTarget, DEFAULT_JOBS,
};

use super::home;

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Repositories to update (id, `owner/name` or name). Defaults to all.
    #[arg(value_name = "REPO")]
    pub repos: Vec<String>,

    /// Folder holding the working copies; defaults to `repowatch folder show`.
    #[arg(long)]
    pub folder: Option<PathBuf>,

    /// Number of repositories updated at once.
    #[arg(long, short = 'j', default_value_t = DEFAULT_JOBS)]
    pub jobs: usize,
}

impl UpdateArgs {
    pub fn run(self) -> Result<()> {
        let home = home()?;
        let folder = match self.folder {
            Some(folder) => folder,
            None => settings::update_folder_at(&home).context(
                "no update folder configured; run `repowatch folder set <PATH>` or pass --folder",
            )?,
        };

        let repos = select_repos(&home, &self.repos)?;
        if repos.is_empty() {
            println!("No repositories tracked.");
            return Ok(());
        }
        let targets: Vec<UpdateTarget> = repos
            .iter()
            .map(|repo| UpdateTarget::for_repo(repo, &folder))
            .collect();
        let token = settings::resolve_token_at(&home);
        tracing::debug!(
            count = targets.len(),
            folder = %folder.display(),
            authenticated = token.is_some(),
            "starting update"
        );

        if let [target] = targets.as_slice() {
            if !self.repos.is_empty() {
                let state = update_single(&GitCli, target, token.as_deref(), |state| {
                    print_transition(1, 1, state)
                })
                .with_context(|| format!("failed to update {}", target.repo_name))?;
                print_summary(&UpdateSummary::of(std::slice::from_ref(&state)));
                return Ok(());
            }
        }

        let total = targets.len();
        let states = run_blocking(
            Arc::new(GitCli),
            targets,
            UpdateOptions {
                jobs: self.jobs,
                token,
            },
            |progress| print_transition(progress.index + 1, total, &progress.state),
        )
        .context("update run failed")?;

        let summary = UpdateSummary::of(&states);
        print_summary(&summary);
        if summary.error > 0 {
            bail!("{} of {} repositories failed to update", summary.error, total);
        }
        Ok(())
    }
}

/// All tracked repos, or the ones named on the command line in that order.
fn select_repos(home: &std::path::Path, references: &[String]) -> Result<Vec<TrackedRepo>> {
    let catalog = store::load_catalog_at(home);
    if references.is_empty() {
        return Ok(catalog.repos);
    }
    references
        .iter()
        .map(|reference| {
            catalog
                .resolve_repo(reference)
                .or_else(|| catalog.repos.iter().find(|r| &r.name == reference))
                .cloned()
                .ok_or_else(|| anyhow!("repository '{reference}' is not tracked"))
        })
        .collect()
}

fn print_transition(position: usize, total: usize, state: &RepoUpdateState) {
    let label = status_label(state.status);
    match &state.message {
        Some(message) if state.status.is_terminal() => {
            println!("[{position}/{total}] {:<24} {label} {message}", state.repo_name)
        }
        _ => println!("[{position}/{total}] {:<24} {label}", state.repo_name),
    }
}

fn status_label(status: UpdateStatus) -> ColoredString {
    match status {
        UpdateStatus::Pending => "pending".bright_black(),
        UpdateStatus::Checking => "checking".bright_black(),
        UpdateStatus::Cloning => "cloning".cyan(),
        UpdateStatus::Pulling => "pulling".cyan(),
        UpdateStatus::Done => "done".green().bold(),
        UpdateStatus::Error => "error".red().bold(),
        UpdateStatus::Skipped => "skipped".yellow().bold(),
    }
}

fn print_summary(summary: &UpdateSummary) {
    println!(
        "{} done ({} already up to date) · {} skipped · {} failed",
        summary.done.to_string().green(),
        summary.up_to_date,
        summary.skipped.to_string().yellow(),
        summary.error.to_string().red(),
    );
}
