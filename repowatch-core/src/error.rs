//! Error types for repowatch-core.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Failure classes shared across every repowatch crate.
///
/// Each crate's error enum maps itself onto one of these through a `kind()`
/// method so callers can branch on the class without matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// Duplicate repository, malformed import file, unknown repository.
    Validation,
    /// HTTP 401 or a git credential failure.
    Auth,
    /// HTTP 403 from the metadata API.
    RateLimit,
    /// Network unreachable, unresolvable host, non-2xx status.
    Transport,
    /// Well-formed response carrying application-level errors.
    Protocol,
    /// Dirty working tree, undeterminable branch, local I/O.
    LocalState,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::Validation => "validation-error",
            ErrorKind::Auth => "auth-error",
            ErrorKind::RateLimit => "rate-limit-error",
            ErrorKind::Transport => "transport-error",
            ErrorKind::Protocol => "protocol-error",
            ErrorKind::LocalState => "local-state-error",
        };
        f.write_str(label)
    }
}

/// All errors that can arise from catalog and settings operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Underlying I/O failure, annotated with the path involved.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization error (write/save path).
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// A user-supplied file could not be parsed as JSON.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// `dirs::home_dir()` returned `None`, so `~/.repowatch/` cannot be located.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// A repository with the same `(owner, name)` is already tracked.
    #[error("repository {owner}/{name} is already tracked")]
    DuplicateRepo { owner: String, name: String },

    /// No tracked repository matches the given id or `owner/name`.
    #[error("no tracked repository matches '{0}'")]
    RepoNotFound(String),

    /// An import file failed structural validation.
    #[error("invalid data format: {0}")]
    InvalidImport(String),

    /// A repository reference that is neither `owner/name` nor a GitHub URL.
    #[error("invalid repository '{0}'; expected owner/name or a GitHub URL")]
    InvalidRepoSpec(String),
}

impl CatalogError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::DuplicateRepo { .. }
            | CatalogError::RepoNotFound(_)
            | CatalogError::InvalidImport(_)
            | CatalogError::InvalidRepoSpec(_)
            | CatalogError::Parse { .. } => ErrorKind::Validation,
            CatalogError::Io { .. } | CatalogError::Json(_) | CatalogError::HomeNotFound => {
                ErrorKind::LocalState
            }
        }
    }
}

/// Convenience constructor for [`CatalogError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> CatalogError {
    CatalogError::Io {
        path: path.into(),
        source,
    }
}
