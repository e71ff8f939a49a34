//! Clone-or-pull state machine for tracked repositories.
//!
//! Each repository walks
//! `pending → checking → {cloning | pulling} → {done | error | skipped}`
//! independently. [`run_batch`] drives many of them on a bounded pool of
//! blocking workers and streams every transition over an mpsc channel.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tokio::sync::{mpsc, Semaphore};

use repowatch_core::TrackedRepo;

use crate::error::{io_err, UpdateError, UpdateErrorKind, UpdateFailure};
use crate::git::{Git, GitRunner};
use crate::resolver::{self, UpdatePlan};

pub const DEFAULT_JOBS: usize = 4;

const CREDENTIAL_USER: &str = "x-access-token";

// ---------------------------------------------------------------------------
// 1. Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateStatus {
    Pending,
    Checking,
    Cloning,
    Pulling,
    Done,
    Error,
    Skipped,
}

impl UpdateStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            UpdateStatus::Done | UpdateStatus::Error | UpdateStatus::Skipped
        )
    }
}

/// Where and from what one working copy is updated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateTarget {
    pub repo_name: String,
    pub path: PathBuf,
    /// Canonical clone URL, without credentials.
    pub url: String,
    /// Branch to pull, when already known; otherwise it is probed.
    pub branch: Option<String>,
}

impl UpdateTarget {
    /// `<folder>/<owner>/<name>` for a tracked repository.
    ///
    /// Names are only unique per owner.
    pub fn for_repo(repo: &TrackedRepo, folder: &Path) -> Self {
        Self {
            repo_name: repo.key().to_string(),
            path: folder.join(&repo.owner).join(&repo.name),
            url: format!("{}.git", repo.url.trim_end_matches('/')),
            branch: None,
        }
    }
}

/// Snapshot of one repository's progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoUpdateState {
    pub repo_name: String,
    pub path: PathBuf,
    pub status: UpdateStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<UpdateFailure>,
    pub has_uncommitted_changes: bool,
    pub up_to_date: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

impl RepoUpdateState {
    pub fn pending(target: &UpdateTarget) -> Self {
        Self {
            repo_name: target.repo_name.clone(),
            path: target.path.clone(),
            status: UpdateStatus::Pending,
            message: None,
            failure: None,
            has_uncommitted_changes: false,
            up_to_date: false,
            branch: target.branch.clone(),
        }
    }
}

/// A transition of the repository at `index` in the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub index: usize,
    pub state: RepoUpdateState,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSummary {
    pub done: usize,
    pub error: usize,
    pub skipped: usize,
    /// Subset of `done` whose pull found nothing new.
    pub up_to_date: usize,
}

impl UpdateSummary {
    pub fn of(states: &[RepoUpdateState]) -> Self {
        let mut summary = Self::default();
        for state in states {
            match state.status {
                UpdateStatus::Done => {
                    summary.done += 1;
                    if state.up_to_date {
                        summary.up_to_date += 1;
                    }
                }
                UpdateStatus::Error => summary.error += 1,
                UpdateStatus::Skipped => summary.skipped += 1,
                _ => {}
            }
        }
        summary
    }
}

#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
    /// Worker count; `0` is treated as `1`.
    pub jobs: usize,
    /// Credential injected into clone URLs.
    pub token: Option<String>,
}

// ---------------------------------------------------------------------------
// 2. Single repository
// ---------------------------------------------------------------------------

/// Drive one repository to a terminal state, reporting every transition.
pub fn update_one<R: GitRunner + ?Sized>(
    runner: &R,
    target: &UpdateTarget,
    token: Option<&str>,
    mut report: impl FnMut(&RepoUpdateState),
) -> RepoUpdateState {
    let mut state = RepoUpdateState::pending(target);
    state.status = UpdateStatus::Checking;
    report(&state);

    let result = match resolver::plan(&target.path, target.branch.as_deref()) {
        UpdatePlan::NeedsClone => {
            state.status = UpdateStatus::Cloning;
            report(&state);
            clone_fresh(runner, target, token).map(|()| Some("Cloned".to_string()))
        }
        UpdatePlan::NeedsBranchResolution => {
            refresh(runner, target, None, &mut state, &mut report)
        }
        UpdatePlan::NeedsPull { branch } => {
            refresh(runner, target, Some(branch), &mut state, &mut report)
        }
    };

    match result {
        Ok(message) if state.has_uncommitted_changes => {
            state.status = UpdateStatus::Skipped;
            state.message = message;
            tracing::info!(repo = %target.repo_name, "skipped: uncommitted changes");
        }
        Ok(message) => {
            state.status = UpdateStatus::Done;
            state.message = message;
            tracing::info!(repo = %target.repo_name, up_to_date = state.up_to_date, "updated");
        }
        Err(failure) => {
            let failure = failure.redact(token);
            tracing::warn!(
                repo = %target.repo_name,
                kind = ?failure.kind,
                diagnostic = %failure.raw_diagnostic,
                "update failed"
            );
            state.status = UpdateStatus::Error;
            state.message = Some(failure.message.clone());
            state.failure = Some(failure);
        }
    }
    report(&state);
    state
}

/// Update one repository and surface its failure as an error.
pub fn update_single<R: GitRunner + ?Sized>(
    runner: &R,
    target: &UpdateTarget,
    token: Option<&str>,
    report: impl FnMut(&RepoUpdateState),
) -> Result<RepoUpdateState, UpdateError> {
    let state = update_one(runner, target, token, report);
    if let Some(failure) = &state.failure {
        return Err(UpdateError::Failed(failure.clone()));
    }
    Ok(state)
}

fn clone_fresh<R: GitRunner + ?Sized>(
    runner: &R,
    target: &UpdateTarget,
    token: Option<&str>,
) -> Result<(), UpdateFailure> {
    let (parent, dest) = split_target(&target.path)?;
    std::fs::create_dir_all(parent).map_err(|e| UpdateFailure::local_io(parent, &e))?;
    let url = match token {
        Some(token) => credentialed_url(&target.url, token),
        None => target.url.clone(),
    };
    tracing::debug!(repo = %target.repo_name, path = %target.path.display(), "cloning");
    Git::new(runner, parent).clone_into(&url, &dest)?;
    if url == target.url {
        return Ok(());
    }

    // git records the clone URL as `remote.origin.url`; the credential must
    // not outlive this invocation.
    if let Err(failure) = Git::new(runner, &target.path).set_origin_url(&target.url) {
        if let Err(e) = std::fs::remove_dir_all(&target.path) {
            tracing::warn!(
                repo = %target.repo_name,
                path = %target.path.display(),
                error = %e,
                "could not remove clone after failing to reset its origin"
            );
        }
        return Err(failure);
    }
    Ok(())
}

/// Dirty check, branch resolution, checkout and pull on an existing copy.
///
/// Returns `Ok` with `has_uncommitted_changes` set when the copy was left
/// alone.
fn refresh<R: GitRunner + ?Sized>(
    runner: &R,
    target: &UpdateTarget,
    known_branch: Option<String>,
    state: &mut RepoUpdateState,
    report: &mut impl FnMut(&RepoUpdateState),
) -> Result<Option<String>, UpdateFailure> {
    let git = Git::new(runner, &target.path);
    if git.has_uncommitted_changes()? {
        state.has_uncommitted_changes = true;
        return Ok(Some("Skipped: uncommitted changes".to_string()));
    }

    let branch = match known_branch {
        Some(branch) => branch,
        None => resolver::resolve_default_branch(&git)?,
    };
    state.branch = Some(branch.clone());

    if git.current_branch()?.as_deref() != Some(branch.as_str()) {
        tracing::debug!(repo = %target.repo_name, %branch, "checking out default branch");
        git.checkout(&branch)?;
    }

    state.status = UpdateStatus::Pulling;
    report(state);
    let outcome = git.pull()?;
    state.up_to_date = outcome.up_to_date;
    Ok(Some(if outcome.up_to_date {
        "Already up to date".to_string()
    } else {
        format!("Pulled {branch}")
    }))
}

fn split_target(path: &Path) -> Result<(&Path, String), UpdateFailure> {
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => Ok((parent, name.to_string_lossy().into_owned())),
        _ => Err(UpdateFailure::local_io(
            path,
            &std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a clone destination"),
        )),
    }
}

/// `https://x-access-token:<token>@host/...`; non-HTTP URLs are returned as-is.
pub(crate) fn credentialed_url(url: &str, token: &str) -> String {
    let Ok(mut parsed) = url::Url::parse(url) else {
        return url.to_string();
    };
    if !matches!(parsed.scheme(), "https" | "http") {
        return url.to_string();
    }
    if parsed.set_username(CREDENTIAL_USER).is_err() || parsed.set_password(Some(token)).is_err()
    {
        return url.to_string();
    }
    parsed.to_string()
}

// ---------------------------------------------------------------------------
// 3. Batches
// ---------------------------------------------------------------------------

/// One lock per working-copy path, so two targets naming the same path
/// never run at once.
#[derive(Default)]
struct PathLocks(Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>);

impl PathLocks {
    fn lock_for(&self, path: &Path) -> Arc<Mutex<()>> {
        let mut locks = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(path.to_path_buf()).or_default())
    }
}

/// Update every target on at most `options.jobs` workers.
///
/// Every transition is sent on `progress` as it happens. The returned states
/// are terminal and in the same order as `targets`.
pub async fn run_batch<R: GitRunner + 'static>(
    runner: Arc<R>,
    targets: Vec<UpdateTarget>,
    options: UpdateOptions,
    progress: mpsc::Sender<Progress>,
) -> Result<Vec<RepoUpdateState>, UpdateError> {
    let jobs = options.jobs.max(1);
    let permits = Arc::new(Semaphore::new(jobs));
    let locks = Arc::new(PathLocks::default());
    let token = options.token.map(Arc::<str>::from);
    tracing::info!(repos = targets.len(), jobs, "starting update batch");

    for (index, target) in targets.iter().enumerate() {
        let state = RepoUpdateState::pending(target);
        // A dropped receiver only means nobody is watching.
        let _ = progress.send(Progress { index, state }).await;
    }

    let mut handles = Vec::with_capacity(targets.len());
    for (index, target) in targets.into_iter().enumerate() {
        let permit = Arc::clone(&permits)
            .acquire_owned()
            .await
            .map_err(|e| UpdateError::Worker(e.to_string()))?;
        let runner = Arc::clone(&runner);
        let locks = Arc::clone(&locks);
        let token = token.clone();
        let progress = progress.clone();
        let pending = RepoUpdateState::pending(&target);

        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let lock = locks.lock_for(&target.path);
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            update_one(&*runner, &target, token.as_deref(), |state| {
                let _ = progress.blocking_send(Progress {
                    index,
                    state: state.clone(),
                });
            })
        });
        handles.push((index, pending, handle));
    }

    let mut states = Vec::with_capacity(handles.len());
    for (index, pending, handle) in handles {
        let state = match handle.await {
            Ok(state) => state,
            Err(e) => {
                let state = crashed(pending, &e.to_string());
                let _ = progress
                    .send(Progress {
                        index,
                        state: state.clone(),
                    })
                    .await;
                state
            }
        };
        states.push(state);
    }
    Ok(states)
}

/// Terminal state for a repository whose worker died mid-update.
fn crashed(mut state: RepoUpdateState, reason: &str) -> RepoUpdateState {
    tracing::error!(repo = %state.repo_name, reason, "update worker failed");
    let failure = UpdateFailure::new(
        UpdateErrorKind::Unknown,
        reason,
        format!("Update worker failed: {reason}"),
    );
    state.status = UpdateStatus::Error;
    state.message = Some(failure.message.clone());
    state.failure = Some(failure);
    state
}

/// Run [`run_batch`] on a fresh runtime, handing each transition to
/// `on_progress` on the calling thread.
pub fn run_blocking<R: GitRunner + 'static>(
    runner: Arc<R>,
    targets: Vec<UpdateTarget>,
    options: UpdateOptions,
    mut on_progress: impl FnMut(&Progress),
) -> Result<Vec<RepoUpdateState>, UpdateError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;

    runtime.block_on(async move {
        let (tx, mut rx) = mpsc::channel::<Progress>(64);
        let batch = tokio::spawn(run_batch(runner, targets, options, tx));
        while let Some(progress) = rx.recv().await {
            on_progress(&progress);
        }
        batch
            .await
            .map_err(|e| UpdateError::Worker(e.to_string()))?
    })
}
