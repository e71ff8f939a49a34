//! Merge a [`BatchResponse`] into an in-memory [`Catalog`].
//!
//! Pure apart from id generation: no I/O, no clock reads. The caller decides
//! whether the mutated catalog is persisted.

use chrono::{DateTime, Utc};
use serde::Serialize;

use repowatch_core::types::generate_id;
use repowatch_core::{Catalog, Commit, Release, RepoKey, TrackedRepo, Upsert};

use crate::remote::{BatchResponse, RemoteCommit, RemoteRelease};

/// Counts of what one reconciliation changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    pub releases_inserted: usize,
    pub releases_replaced: usize,
    pub commits_inserted: usize,
    pub commits_replaced: usize,
    /// Repositories the remote did not return.
    pub missing: Vec<RepoKey>,
    /// Repositories that exist remotely but have never published a release.
    pub without_release: usize,
}

/// Apply `response` to `catalog`.
///
/// `repos` must be the list the batch was requested for, in request order.
/// Entries beyond the shorter of the two lists are ignored.
pub fn reconcile(
    catalog: &mut Catalog,
    repos: &[TrackedRepo],
    response: &BatchResponse,
    now: DateTime<Utc>,
) -> ReconcileReport {
    let mut report = ReconcileReport::default();

    for (repo, entry) in repos.iter().zip(&response.repos) {
        let Some(metadata) = entry else {
            tracing::warn!(repo = %repo.key(), "repository not returned by GitHub; skipping");
            report.missing.push(repo.key());
            continue;
        };

        // No release upstream leaves whatever is stored in place.
        match &metadata.release {
            Some(remote) => {
                let release = release_record(catalog, repo, remote, now);
                match catalog.upsert_release(release) {
                    Upsert::Inserted => report.releases_inserted += 1,
                    Upsert::Replaced => report.releases_replaced += 1,
                }
            }
            None => report.without_release += 1,
        }

        if let Some(remote) = &metadata.commit {
            let commit = commit_record(catalog, repo, remote, now);
            match catalog.upsert_commit(commit) {
                Upsert::Inserted => report.commits_inserted += 1,
                Upsert::Replaced => report.commits_replaced += 1,
            }
        }
    }

    report
}

fn release_record(
    catalog: &Catalog,
    repo: &TrackedRepo,
    remote: &RemoteRelease,
    now: DateTime<Utc>,
) -> Release {
    // Replacing keeps the record id stable across fetches.
    let id = catalog
        .releases
        .iter()
        .find(|r| r.repo_id == repo.id && r.tag_name == remote.tag_name)
        .map(|r| r.id.clone())
        .unwrap_or_else(generate_id);
    Release {
        id,
        repo_id: repo.id.clone(),
        repo_owner: repo.owner.clone(),
        repo_name: repo.name.clone(),
        tag_name: remote.tag_name.clone(),
        name: remote
            .name
            .clone()
            .unwrap_or_else(|| remote.tag_name.clone()),
        published_at: remote.published_at,
        html_url: remote.url.clone(),
        body: remote.description.clone().unwrap_or_default(),
        fetched_at: Some(now),
    }
}

fn commit_record(
    catalog: &Catalog,
    repo: &TrackedRepo,
    remote: &RemoteCommit,
    now: DateTime<Utc>,
) -> Commit {
    let id = catalog
        .commits
        .iter()
        .find(|c| c.repo_id == repo.id)
        .map(|c| c.id.clone())
        .unwrap_or_else(generate_id);
    Commit {
        id,
        repo_id: repo.id.clone(),
        repo_owner: repo.owner.clone(),
        repo_name: repo.name.clone(),
        sha: remote.sha.clone(),
        message: remote.message.clone(),
        committed_at: remote.committed_at,
        author_name: remote.author_name.clone(),
        html_url: remote.url.clone(),
        fetched_at: now,
    }
}
