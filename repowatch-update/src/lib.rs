//! # repowatch-update
//!
//! Keeps local working copies of tracked repositories current.
//!
//! - [`git`]: the [`GitRunner`] seam and typed git commands
//! - [`normalize`]: user-facing messages from git diagnostics
//! - [`resolver`]: clone / resolve-branch / pull planning
//! - [`orchestrator`]: the per-repository state machine and batch runner

pub mod error;
pub mod git;
pub mod normalize;
pub mod orchestrator;
pub mod resolver;

pub use error::{UpdateError, UpdateErrorKind, UpdateFailure};
pub use git::{Git, GitCli, GitOutput, GitRunner};
pub use orchestrator::{
    run_batch, run_blocking, update_one, update_single, Progress, RepoUpdateState,
    UpdateOptions, UpdateStatus, UpdateSummary, UpdateTarget, DEFAULT_JOBS,
};
pub use resolver::UpdatePlan;
