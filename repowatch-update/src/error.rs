//! Error types for repowatch-update.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use repowatch_core::ErrorKind;

/// Why a single working-copy update failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpdateErrorKind {
    AuthRequired,
    NetworkError,
    BranchUndeterminable,
    CheckoutFailed,
    LocalIo,
    Unknown,
}

impl UpdateErrorKind {
    pub fn kind(self) -> ErrorKind {
        match self {
            UpdateErrorKind::AuthRequired => ErrorKind::Auth,
            UpdateErrorKind::NetworkError => ErrorKind::Transport,
            UpdateErrorKind::BranchUndeterminable
            | UpdateErrorKind::CheckoutFailed
            | UpdateErrorKind::LocalIo
            | UpdateErrorKind::Unknown => ErrorKind::LocalState,
        }
    }
}

/// A failed update of one repository.
///
/// `message` is what users see; `raw_diagnostic` keeps git's own output for
/// logs and `--verbose` runs.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "camelCase")]
#[error("{message}")]
pub struct UpdateFailure {
    pub kind: UpdateErrorKind,
    pub raw_diagnostic: String,
    pub message: String,
}

impl UpdateFailure {
    pub fn new(
        kind: UpdateErrorKind,
        raw_diagnostic: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            raw_diagnostic: raw_diagnostic.into(),
            message: message.into(),
        }
    }

    pub(crate) fn local_io(path: &std::path::Path, source: &std::io::Error) -> Self {
        let raw = format!("{}: {source}", path.display());
        Self::new(UpdateErrorKind::LocalIo, raw.clone(), raw)
    }

    /// Replace every occurrence of `secret` so it can be shown or logged.
    pub(crate) fn redact(mut self, secret: Option<&str>) -> Self {
        if let Some(secret) = secret.filter(|s| !s.is_empty()) {
            self.raw_diagnostic = self.raw_diagnostic.replace(secret, "***");
            self.message = self.message.replace(secret, "***");
        }
        self
    }
}

/// Failure of a whole update run, as opposed to one repository in it.
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A single-repository run whose repository failed.
    #[error("{0}")]
    Failed(#[from] UpdateFailure),

    #[error("update worker failed: {0}")]
    Worker(String),
}

impl UpdateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            UpdateError::Failed(failure) => failure.kind.kind(),
            UpdateError::Io { .. } | UpdateError::Worker(_) => ErrorKind::LocalState,
        }
    }
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> UpdateError {
    UpdateError::Io {
        path: path.into(),
        source,
    }
}
