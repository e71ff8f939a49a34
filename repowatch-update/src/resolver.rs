//! Decide what a working copy needs before anything is changed on disk.

use std::path::Path;

use crate::error::{UpdateErrorKind, UpdateFailure};
use crate::git::{Git, GitRunner};

/// Branches tried, in order, when `origin/HEAD` is not recorded.
const FALLBACK_BRANCHES: &[&str] = &["main", "master"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdatePlan {
    /// Nothing at the path yet.
    NeedsClone,
    /// A working copy exists but its default branch is not known.
    NeedsBranchResolution,
    NeedsPull { branch: String },
}

/// Plan an update of the working copy at `path`.
pub fn plan(path: &Path, known_branch: Option<&str>) -> UpdatePlan {
    if !path.is_dir() {
        return UpdatePlan::NeedsClone;
    }
    match known_branch {
        Some(branch) => UpdatePlan::NeedsPull {
            branch: branch.to_string(),
        },
        None => UpdatePlan::NeedsBranchResolution,
    }
}

/// Find the default branch with read-only probes.
///
/// `origin/HEAD` wins, then `origin/main`, then `origin/master`.
pub fn resolve_default_branch<R: GitRunner + ?Sized>(
    git: &Git<'_, R>,
) -> Result<String, UpdateFailure> {
    if let Some(branch) = git.remote_head_branch()? {
        return Ok(branch);
    }
    for candidate in FALLBACK_BRANCHES {
        if git.remote_branch_exists(candidate)? {
            return Ok((*candidate).to_string());
        }
    }
    let raw = format!(
        "no origin/HEAD, origin/main or origin/master in {}",
        git.dir().display()
    );
    Err(UpdateFailure::new(
        UpdateErrorKind::BranchUndeterminable,
        raw,
        "Could not determine the default branch (no origin/HEAD, origin/main or origin/master)",
    ))
}
