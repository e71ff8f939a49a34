//! Persisted synchronization entrypoints used by the CLI and [`Session`].
//!
//! [`Session`]: crate::Session

use std::path::Path;

use chrono::Utc;

use repowatch_core::{settings, store, Commit, Release, RepoKey};

use crate::reconcile::{reconcile, ReconcileReport};
use crate::remote::{MetadataSource, RateLimit, RemoteCommit};
use crate::SyncError;

/// Result of a successful [`synchronize_at`].
#[derive(Debug, Clone, Default)]
pub struct SyncOutcome {
    /// All stored releases, newest first.
    pub releases: Vec<Release>,
    /// All stored commits, newest first.
    pub commits: Vec<Commit>,
    pub report: ReconcileReport,
}

/// Fetch metadata for every tracked repository and merge it into the catalog.
///
/// One load, one remote call, one write. Any remote failure returns before
/// the write, leaving `data.json` (and `lastFetch`) exactly as it was.
pub fn synchronize_at<S: MetadataSource>(
    home: &Path,
    source: &S,
) -> Result<SyncOutcome, SyncError> {
    let mut catalog = store::load_catalog_at(home);
    if catalog.repos.is_empty() {
        tracing::debug!("no tracked repositories; nothing to fetch");
        return Ok(SyncOutcome::default());
    }

    let repos = catalog.repos.clone();
    let keys: Vec<RepoKey> = repos.iter().map(|r| r.key()).collect();
    let token = settings::resolve_token_at(home);

    tracing::info!(count = keys.len(), authenticated = token.is_some(), "fetching metadata");
    let response = source.fetch_batch(&keys, token.as_deref()).map_err(|err| {
        tracing::warn!(error = %err, "metadata fetch failed; catalog left unchanged");
        err
    })?;

    let now = Utc::now();
    let report = reconcile(&mut catalog, &repos, &response, now);
    catalog.last_fetch = Some(now);
    store::save_catalog_at(home, &catalog)?;

    tracing::info!(
        releases_inserted = report.releases_inserted,
        releases_replaced = report.releases_replaced,
        commits_inserted = report.commits_inserted,
        commits_replaced = report.commits_replaced,
        missing = report.missing.len(),
        "catalog synchronized"
    );

    Ok(SyncOutcome {
        releases: catalog.releases_newest_first(),
        commits: catalog.commits_newest_first(),
        report,
    })
}

/// Default-branch tip of one repository. Does not touch the catalog.
pub fn last_commit_at<S: MetadataSource>(
    home: &Path,
    source: &S,
    repo: &RepoKey,
) -> Result<RemoteCommit, SyncError> {
    let token = settings::resolve_token_at(home);
    source.fetch_last_commit(repo, token.as_deref())
}

pub fn rate_limit_at<S: MetadataSource>(home: &Path, source: &S) -> Result<RateLimit, SyncError> {
    let token = settings::resolve_token_at(home);
    source.rate_limit(token.as_deref())
}
