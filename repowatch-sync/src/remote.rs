//! The remote metadata contract.
//!
//! [`MetadataSource`] is the seam between reconciliation and transport: the
//! pipeline only ever sees these types, and tests substitute a scripted source.

use chrono::{DateTime, Utc};
use serde::Serialize;

use repowatch_core::RepoKey;

use crate::SyncError;

/// Latest release as reported by the remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRelease {
    pub tag_name: String,
    pub name: Option<String>,
    pub published_at: DateTime<Utc>,
    pub url: String,
    pub description: Option<String>,
}

/// Tip commit of a default branch as reported by the remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCommit {
    pub sha: String,
    pub message: String,
    #[serde(rename = "date")]
    pub committed_at: DateTime<Utc>,
    #[serde(rename = "author")]
    pub author_name: String,
    #[serde(rename = "htmlUrl")]
    pub url: String,
}

/// What the remote knows about one repository.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoMetadata {
    pub release: Option<RemoteRelease>,
    pub commit: Option<RemoteCommit>,
}

/// One entry per requested repository, in request order.
///
/// `None` means the remote did not return the repository at all
/// (renamed, deleted, or inaccessible).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResponse {
    pub repos: Vec<Option<RepoMetadata>>,
}

/// API quota snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimit {
    pub limit: u64,
    pub remaining: u64,
    /// Unix seconds at which the window resets.
    pub reset: i64,
    pub used: u64,
}

/// Source of repository metadata.
pub trait MetadataSource {
    /// Fetch release and tip-commit metadata for every repo in one request.
    fn fetch_batch(
        &self,
        repos: &[RepoKey],
        token: Option<&str>,
    ) -> Result<BatchResponse, SyncError>;

    /// Fetch the default-branch tip of a single repository.
    fn fetch_last_commit(
        &self,
        repo: &RepoKey,
        token: Option<&str>,
    ) -> Result<RemoteCommit, SyncError>;

    fn rate_limit(&self, token: Option<&str>) -> Result<RateLimit, SyncError>;
}

impl<T: MetadataSource + ?Sized> MetadataSource for &T {
    fn fetch_batch(
        &self,
        repos: &[RepoKey],
        token: Option<&str>,
    ) -> Result<BatchResponse, SyncError> {
        (**self).fetch_batch(repos, token)
    }

    fn fetch_last_commit(
        &self,
        repo: &RepoKey,
        token: Option<&str>,
    ) -> Result<RemoteCommit, SyncError> {
        (**self).fetch_last_commit(repo, token)
    }

    fn rate_limit(&self, token: Option<&str>) -> Result<RateLimit, SyncError> {
        (**self).rate_limit(token)
    }
}
