//! Error types for repowatch-sync.

use thiserror::Error;

use repowatch_core::{CatalogError, ErrorKind};

/// All errors that can arise from metadata synchronization.
///
/// Remote failures abort the whole batch; none of them leave a partially
/// updated catalog behind.
#[derive(Debug, Error)]
pub enum SyncError {
    /// HTTP 401 from the API.
    #[error("GitHub API authentication failed; check your token")]
    Unauthorized,

    /// HTTP 403 from the API.
    #[error("GitHub API rate limit exceeded")]
    RateLimited,

    /// Connection failure or any other non-2xx status.
    #[error("GitHub API transport error: {0}")]
    Transport(String),

    /// The API answered, but with application-level errors or an
    /// unexpected shape.
    #[error("GitHub API error: {0}")]
    Protocol(String),

    /// An error from the catalog store.
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::Unauthorized => ErrorKind::Auth,
            SyncError::RateLimited => ErrorKind::RateLimit,
            SyncError::Transport(_) => ErrorKind::Transport,
            SyncError::Protocol(_) => ErrorKind::Protocol,
            SyncError::Catalog(err) => err.kind(),
        }
    }
}
