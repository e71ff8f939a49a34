//! Thin typed layer over the `git` executable.
//!
//! [`GitRunner`] is the only place a process is spawned; everything above it
//! works on [`GitOutput`] values, which lets tests script git's answers.

use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::{UpdateErrorKind, UpdateFailure};
use crate::normalize;

/// Captured result of one git invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl GitOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// stderr on failure; stdout and stderr together on success.
    pub fn diagnostic(&self) -> String {
        if self.success {
            format!("{}{}", self.stdout, self.stderr)
        } else if self.stderr.trim().is_empty() {
            self.stdout.clone()
        } else {
            self.stderr.clone()
        }
    }
}

/// Runs `git <args>` inside `dir`.
pub trait GitRunner: Send + Sync {
    fn run(&self, dir: &Path, args: &[&str]) -> std::io::Result<GitOutput>;
}

impl<T: GitRunner + ?Sized> GitRunner for std::sync::Arc<T> {
    fn run(&self, dir: &Path, args: &[&str]) -> std::io::Result<GitOutput> {
        (**self).run(dir, args)
    }
}

/// The system `git`, never allowed to prompt for credentials.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitCli;

impl GitRunner for GitCli {
    fn run(&self, dir: &Path, args: &[&str]) -> std::io::Result<GitOutput> {
        let output = Command::new("git")
            .args(args)
            .current_dir(dir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("LC_ALL", "C")
            .stdin(Stdio::null())
            .output()?;
        Ok(GitOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Result of a successful pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PullOutcome {
    pub up_to_date: bool,
}

/// Git commands against one working directory.
pub struct Git<'a, R: ?Sized> {
    runner: &'a R,
    dir: &'a Path,
}

impl<'a, R: GitRunner + ?Sized> Git<'a, R> {
    pub fn new(runner: &'a R, dir: &'a Path) -> Self {
        Self { runner, dir }
    }

    pub fn dir(&self) -> &Path {
        self.dir
    }

    fn run(&self, args: &[&str]) -> Result<GitOutput, UpdateFailure> {
        let command = args.first().copied().unwrap_or_default();
        tracing::trace!(dir = %self.dir.display(), command, "git");
        self.runner
            .run(self.dir, args)
            .map_err(|e| UpdateFailure::local_io(self.dir, &e))
    }

    /// `status --porcelain` printed anything.
    pub fn has_uncommitted_changes(&self) -> Result<bool, UpdateFailure> {
        let out = self.run(&["status", "--porcelain"])?;
        if !out.success {
            return Err(normalize::classify(&out.diagnostic()));
        }
        Ok(!out.stdout.trim().is_empty())
    }

    /// Branch `origin/HEAD` points at, if the remote HEAD is recorded locally.
    pub fn remote_head_branch(&self) -> Result<Option<String>, UpdateFailure> {
        let out = self.run(&["symbolic-ref", "refs/remotes/origin/HEAD"])?;
        if !out.success {
            return Ok(None);
        }
        Ok(out
            .stdout
            .trim()
            .strip_prefix("refs/remotes/origin/")
            .filter(|b| !b.is_empty())
            .map(str::to_string))
    }

    pub fn remote_branch_exists(&self, branch: &str) -> Result<bool, UpdateFailure> {
        let reference = format!("origin/{branch}");
        let out = self.run(&["rev-parse", "--verify", "--quiet", &reference])?;
        Ok(out.success)
    }

    /// Checked-out branch, or `None` on a detached or unborn HEAD.
    pub fn current_branch(&self) -> Result<Option<String>, UpdateFailure> {
        let out = self.run(&["rev-parse", "--abbrev-ref", "HEAD"])?;
        let name = out.stdout.trim();
        if !out.success || name.is_empty() || name == "HEAD" {
            return Ok(None);
        }
        Ok(Some(name.to_string()))
    }

    pub fn checkout(&self, branch: &str) -> Result<(), UpdateFailure> {
        let out = self.run(&["checkout", branch])?;
        if out.success {
            return Ok(());
        }
        let raw = out.diagnostic();
        let detail = normalize::strip_progress(&raw);
        Err(UpdateFailure::new(
            UpdateErrorKind::CheckoutFailed,
            raw,
            format!("Could not check out {branch}: {detail}"),
        ))
    }

    /// Fast-forward the current branch from its upstream.
    pub fn pull(&self) -> Result<PullOutcome, UpdateFailure> {
        let out = self.run(&["pull", "--ff-only"])?;
        if !out.success {
            return Err(normalize::classify(&out.diagnostic()));
        }
        let text = out.diagnostic();
        Ok(PullOutcome {
            up_to_date: text.contains("Already up to date")
                || text.contains("Already up-to-date"),
        })
    }

    /// Point `origin` at `url`.
    pub fn set_origin_url(&self, url: &str) -> Result<(), UpdateFailure> {
        let out = self.run(&["remote", "set-url", "origin", url])?;
        if out.success {
            Ok(())
        } else {
            Err(normalize::classify(&out.diagnostic()))
        }
    }

    /// Clone `url` into `dest`, a directory name relative to [`Git::dir`].
    pub fn clone_into(&self, url: &str, dest: &str) -> Result<(), UpdateFailure> {
        let out = self.run(&["clone", url, dest])?;
        if out.success {
            Ok(())
        } else {
            Err(normalize::classify(&out.diagnostic()))
        }
    }
}
