//! Catalog operations: add / remove / upsert / sorted reads / import / export.
//!
//! The in-memory methods on [`Catalog`] enforce the uniqueness rules:
//! - repos are unique by `(owner, name)`
//! - releases are unique by `(repo_id, tag_name)`
//! - commits are unique by `repo_id`
//!
//! The `*_at` functions wrap them in one load → mutate → save cycle against
//! `<home>/.repowatch/data.json`. A failed mutation never reaches `save`, so
//! the file on disk stays untouched.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::error::{io_err, CatalogError};
use crate::store;
use crate::types::{Catalog, Commit, Release, RepoId, RepoKey, RepoSource, TrackedRepo};

/// What an upsert did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Replaced,
}

/// Outcome of adding several repositories at once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkAdd {
    pub added: Vec<TrackedRepo>,
    /// Repositories that were already tracked (or repeated in the input).
    pub skipped: Vec<RepoKey>,
}

/// Counts of records an import actually added.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub repo_count: usize,
    pub release_count: usize,
    pub commit_count: usize,
}

/// Structurally validated contents of an import file.
#[derive(Debug, Clone, Default)]
pub struct ImportData {
    pub repos: Vec<TrackedRepo>,
    pub releases: Vec<Release>,
    pub commits: Vec<Commit>,
}

impl ImportData {
    /// Validate a parsed import document.
    ///
    /// `repos` and `releases` must be arrays; `commits` is optional.
    pub fn from_value(mut value: Value) -> Result<Self, CatalogError> {
        let repos = take_array(&mut value, "repos", true)?;
        let releases = take_array(&mut value, "releases", true)?;
        let commits = take_array(&mut value, "commits", false)?;
        Ok(Self {
            repos: decode_items(repos, "repos")?,
            releases: decode_items(releases, "releases")?,
            commits: decode_items(commits, "commits")?,
        })
    }
}

fn take_array(value: &mut Value, field: &str, required: bool) -> Result<Value, CatalogError> {
    match value.get_mut(field).map(Value::take) {
        Some(array @ Value::Array(_)) => Ok(array),
        Some(Value::Null) | None if !required => Ok(Value::Array(Vec::new())),
        _ => Err(CatalogError::InvalidImport(format!("missing {field} array"))),
    }
}

fn decode_items<T: serde::de::DeserializeOwned>(
    array: Value,
    field: &str,
) -> Result<Vec<T>, CatalogError> {
    serde_json::from_value(array)
        .map_err(|e| CatalogError::InvalidImport(format!("malformed {field} entry: {e}")))
}

// ---------------------------------------------------------------------------
// 1. In-memory operations
// ---------------------------------------------------------------------------

impl Catalog {
    pub fn find_repo(&self, key: &RepoKey) -> Option<&TrackedRepo> {
        self.repos.iter().find(|r| r.matches(key))
    }

    pub fn repo_by_id(&self, id: &RepoId) -> Option<&TrackedRepo> {
        self.repos.iter().find(|r| &r.id == id)
    }

    /// Look a repository up by id, falling back to an `owner/name` reference.
    pub fn resolve_repo(&self, reference: &str) -> Option<&TrackedRepo> {
        self.repo_by_id(&RepoId::from(reference)).or_else(|| {
            RepoKey::parse(reference)
                .ok()
                .and_then(|key| self.find_repo(&key))
        })
    }

    /// Track a new repository. Fails if `(owner, name)` is already present.
    pub fn add_repo(
        &mut self,
        key: RepoKey,
        source: RepoSource,
        now: DateTime<Utc>,
    ) -> Result<TrackedRepo, CatalogError> {
        if self.find_repo(&key).is_some() {
            return Err(CatalogError::DuplicateRepo {
                owner: key.owner,
                name: key.name,
            });
        }
        let repo = TrackedRepo {
            id: RepoId::generate(),
            url: key.canonical_url(),
            owner: key.owner,
            name: key.name,
            added_at: now,
            source,
        };
        self.repos.push(repo.clone());
        Ok(repo)
    }

    /// Add every key that is not yet tracked; duplicates are collected, not
    /// treated as errors.
    pub fn add_repos(
        &mut self,
        keys: impl IntoIterator<Item = RepoKey>,
        source: RepoSource,
        now: DateTime<Utc>,
    ) -> BulkAdd {
        let mut outcome = BulkAdd::default();
        for key in keys {
            match self.add_repo(key.clone(), source, now) {
                Ok(repo) => outcome.added.push(repo),
                Err(_) => outcome.skipped.push(key),
            }
        }
        outcome
    }

    /// Remove a repository together with every release and commit it owns.
    pub fn remove_repo(&mut self, id: &RepoId) -> Option<TrackedRepo> {
        let index = self.repos.iter().position(|r| &r.id == id)?;
        let removed = self.repos.remove(index);
        self.releases.retain(|r| &r.repo_id != id);
        self.commits.retain(|c| &c.repo_id != id);
        Some(removed)
    }

    /// Insert or fully replace the release keyed by `(repo_id, tag_name)`.
    pub fn upsert_release(&mut self, release: Release) -> Upsert {
        match self
            .releases
            .iter_mut()
            .find(|r| r.repo_id == release.repo_id && r.tag_name == release.tag_name)
        {
            Some(existing) => {
                *existing = release;
                Upsert::Replaced
            }
            None => {
                self.releases.push(release);
                Upsert::Inserted
            }
        }
    }

    /// Insert or fully replace the single commit kept for `repo_id`.
    pub fn upsert_commit(&mut self, commit: Commit) -> Upsert {
        match self.commits.iter_mut().find(|c| c.repo_id == commit.repo_id) {
            Some(existing) => {
                *existing = commit;
                Upsert::Replaced
            }
            None => {
                self.commits.push(commit);
                Upsert::Inserted
            }
        }
    }

    /// Releases by `published_at`, newest first. Ties keep insertion order.
    pub fn releases_newest_first(&self) -> Vec<Release> {
        let mut releases = self.releases.clone();
        releases.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        releases
    }

    /// Commits by commit date, newest first. Ties keep insertion order.
    pub fn commits_newest_first(&self) -> Vec<Commit> {
        let mut commits = self.commits.clone();
        commits.sort_by(|a, b| b.committed_at.cmp(&a.committed_at));
        commits
    }

    /// Merge imported records without overwriting anything already present.
    ///
    /// An imported repo that duplicates a tracked one by `owner/name` is
    /// dropped, and its releases/commits are re-pointed at the tracked repo's
    /// id before deduplication. Records whose repo is unknown are dropped.
    pub fn merge_import(&mut self, data: ImportData) -> ImportSummary {
        let mut summary = ImportSummary::default();
        let mut remap: HashMap<RepoId, RepoId> = HashMap::new();

        for repo in data.repos {
            if let Some(existing) = self.find_repo(&repo.key()) {
                remap.insert(repo.id.clone(), existing.id.clone());
                continue;
            }
            if self.repo_by_id(&repo.id).is_some() {
                tracing::warn!(id = %repo.id, "imported repo id collides with a tracked repo; skipping");
                continue;
            }
            self.repos.push(repo);
            summary.repo_count += 1;
        }

        let live: HashSet<RepoId> = self.repos.iter().map(|r| r.id.clone()).collect();
        let resolve = |id: RepoId| -> Option<RepoId> {
            let id = remap.get(&id).cloned().unwrap_or(id);
            live.contains(&id).then_some(id)
        };

        for mut release in data.releases {
            let Some(repo_id) = resolve(release.repo_id.clone()) else {
                tracing::debug!(tag = %release.tag_name, "dropping imported release for unknown repo");
                continue;
            };
            release.repo_id = repo_id;
            let exists = self
                .releases
                .iter()
                .any(|r| r.repo_id == release.repo_id && r.tag_name == release.tag_name);
            if !exists {
                self.releases.push(release);
                summary.release_count += 1;
            }
        }

        for mut commit in data.commits {
            let Some(repo_id) = resolve(commit.repo_id.clone()) else {
                continue;
            };
            commit.repo_id = repo_id;
            if !self.commits.iter().any(|c| c.repo_id == commit.repo_id) {
                self.commits.push(commit);
                summary.commit_count += 1;
            }
        }

        summary
    }
}

// ---------------------------------------------------------------------------
// 2. Persisted operations
// ---------------------------------------------------------------------------

pub fn list_repos_at(home: &Path) -> Vec<TrackedRepo> {
    store::load_catalog_at(home).repos
}

pub fn add_repo_at(
    home: &Path,
    key: RepoKey,
    source: RepoSource,
) -> Result<TrackedRepo, CatalogError> {
    let mut catalog = store::load_catalog_at(home);
    let repo = catalog.add_repo(key, source, Utc::now())?;
    store::save_catalog_at(home, &catalog)?;
    tracing::info!(repo = %repo.key(), id = %repo.id, "tracking repository");
    Ok(repo)
}

/// Add many repositories with one write; already-tracked ones are skipped.
pub fn add_repos_at(
    home: &Path,
    keys: Vec<RepoKey>,
    source: RepoSource,
) -> Result<BulkAdd, CatalogError> {
    let mut catalog = store::load_catalog_at(home);
    let outcome = catalog.add_repos(keys, source, Utc::now());
    if !outcome.added.is_empty() {
        store::save_catalog_at(home, &catalog)?;
    }
    for key in &outcome.skipped {
        tracing::debug!(repo = %key, "skipping already tracked repository");
    }
    Ok(outcome)
}

/// Remove a repository (by id or `owner/name`) and cascade its records.
pub fn remove_repo_at(home: &Path, reference: &str) -> Result<TrackedRepo, CatalogError> {
    let mut catalog = store::load_catalog_at(home);
    let id = catalog
        .resolve_repo(reference)
        .map(|r| r.id.clone())
        .ok_or_else(|| CatalogError::RepoNotFound(reference.to_string()))?;
    let removed = catalog
        .remove_repo(&id)
        .ok_or_else(|| CatalogError::RepoNotFound(reference.to_string()))?;
    store::save_catalog_at(home, &catalog)?;
    tracing::info!(repo = %removed.key(), "stopped tracking repository");
    Ok(removed)
}

pub fn stored_releases_at(home: &Path) -> Vec<Release> {
    store::load_catalog_at(home).releases_newest_first()
}

pub fn stored_commits_at(home: &Path) -> Vec<Commit> {
    store::load_catalog_at(home).commits_newest_first()
}

/// Write the full catalog, unchanged, to `dest`.
pub fn export_at(home: &Path, dest: &Path) -> Result<(), CatalogError> {
    let catalog = store::load_catalog_at(home);
    store::write_json_atomic(dest, &catalog)
}

/// Validate and merge an exported catalog file into the current one.
pub fn import_at(home: &Path, src: &Path) -> Result<ImportSummary, CatalogError> {
    let contents = std::fs::read_to_string(src).map_err(|e| io_err(src, e))?;
    let value: Value = serde_json::from_str(&contents).map_err(|e| CatalogError::Parse {
        path: src.to_path_buf(),
        source: e,
    })?;
    let data = ImportData::from_value(value)?;

    let mut catalog = store::load_catalog_at(home);
    let summary = catalog.merge_import(data);
    store::save_catalog_at(home, &catalog)?;
    tracing::info!(
        repos = summary.repo_count,
        releases = summary.release_count,
        commits = summary.commit_count,
        "import merged"
    );
    Ok(summary)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn release(repo_id: &RepoId, tag: &str, published: DateTime<Utc>) -> Release {
        Release {
            id: format!("{repo_id}-{tag}"),
            repo_id: repo_id.clone(),
            repo_owner: "octo".into(),
            repo_name: "demo".into(),
            tag_name: tag.into(),
            name: tag.into(),
            published_at: published,
            html_url: String::new(),
            body: String::new(),
            fetched_at: None,
        }
    }

    fn commit(repo_id: &RepoId, sha: &str, date: DateTime<Utc>) -> Commit {
        Commit {
            id: format!("{repo_id}-{sha}"),
            repo_id: repo_id.clone(),
            repo_owner: "octo".into(),
            repo_name: "demo".into(),
            sha: sha.into(),
            message: "msg".into(),
            committed_at: date,
            author_name: "Ada".into(),
            html_url: String::new(),
            fetched_at: date,
        }
    }

    #[test]
    fn add_rejects_duplicate_owner_name() {
        let mut catalog = Catalog::default();
        catalog
            .add_repo(RepoKey::new("octo", "demo"), RepoSource::Manual, at(0))
            .expect("first add");
        let err = catalog
            .add_repo(RepoKey::new("octo", "demo"), RepoSource::Folder, at(1))
            .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateRepo { .. }));
        assert_eq!(err.kind(), crate::ErrorKind::Validation);
        assert_eq!(catalog.repos.len(), 1);
    }

    #[test]
    fn added_repo_gets_canonical_url() {
        let mut catalog = Catalog::default();
        let repo = catalog
            .add_repo(RepoKey::new("octo", "demo"), RepoSource::Folder, at(0))
            .unwrap();
        assert_eq!(repo.url, "https://github.com/octo/demo");
        assert_eq!(repo.source, RepoSource::Folder);
    }

    #[test]
    fn bulk_add_reports_skipped_duplicates() {
        let mut catalog = Catalog::default();
        catalog
            .add_repo(RepoKey::new("octo", "a"), RepoSource::Manual, at(0))
            .unwrap();
        let outcome = catalog.add_repos(
            vec![
                RepoKey::new("octo", "a"),
                RepoKey::new("octo", "b"),
                RepoKey::new("octo", "b"),
            ],
            RepoSource::Folder,
            at(1),
        );
        assert_eq!(outcome.added.len(), 1);
        assert_eq!(outcome.skipped.len(), 2);
        assert_eq!(catalog.repos.len(), 2);
    }

    #[test]
    fn remove_cascades_exactly() {
        let mut catalog = Catalog::default();
        let a = catalog
            .add_repo(RepoKey::new("octo", "a"), RepoSource::Manual, at(0))
            .unwrap();
        let b = catalog
            .add_repo(RepoKey::new("octo", "b"), RepoSource::Manual, at(0))
            .unwrap();
        catalog.upsert_release(release(&a.id, "v1", at(1)));
        catalog.upsert_release(release(&a.id, "v2", at(2)));
        catalog.upsert_release(release(&b.id, "v1", at(3)));
        catalog.upsert_commit(commit(&a.id, "aaa", at(1)));
        catalog.upsert_commit(commit(&b.id, "bbb", at(2)));

        let removed = catalog.remove_repo(&a.id).expect("removed");
        assert_eq!(removed.id, a.id);
        assert_eq!(catalog.repos.len(), 1);
        assert_eq!(catalog.releases.len(), 1);
        assert_eq!(catalog.releases[0].repo_id, b.id);
        assert_eq!(catalog.commits.len(), 1);
        assert_eq!(catalog.commits[0].repo_id, b.id);
    }

    #[test]
    fn release_upsert_replaces_by_repo_and_tag() {
        let mut catalog = Catalog::default();
        let id = RepoId::from("r1");
        assert_eq!(catalog.upsert_release(release(&id, "v1", at(0))), Upsert::Inserted);

        let mut second = release(&id, "v1", at(5));
        second.body = "second".into();
        assert_eq!(catalog.upsert_release(second), Upsert::Replaced);

        assert_eq!(catalog.releases.len(), 1);
        assert_eq!(catalog.releases[0].body, "second");
        assert_eq!(catalog.releases[0].published_at, at(5));
    }

    #[test]
    fn commit_upsert_keeps_one_per_repo() {
        let mut catalog = Catalog::default();
        let id = RepoId::from("r1");
        catalog.upsert_commit(commit(&id, "aaa", at(0)));
        catalog.upsert_commit(commit(&id, "bbb", at(1)));
        assert_eq!(catalog.commits.len(), 1);
        assert_eq!(catalog.commits[0].sha, "bbb");
    }

    #[test]
    fn sorted_reads_are_descending_and_stable() {
        let mut catalog = Catalog::default();
        let id = RepoId::from("r1");
        catalog.upsert_release(release(&id, "old", at(0)));
        catalog.upsert_release(release(&id, "tie-first", at(10)));
        catalog.upsert_release(release(&id, "newest", at(20)));
        catalog.upsert_release(release(&id, "tie-second", at(10)));

        let tags: Vec<_> = catalog
            .releases_newest_first()
            .into_iter()
            .map(|r| r.tag_name)
            .collect();
        assert_eq!(tags, ["newest", "tie-first", "tie-second", "old"]);

        catalog.upsert_commit(commit(&RepoId::from("x"), "x", at(0) - Duration::days(1)));
        catalog.upsert_commit(commit(&RepoId::from("y"), "y", at(0)));
        let shas: Vec<_> = catalog
            .commits_newest_first()
            .into_iter()
            .map(|c| c.sha)
            .collect();
        assert_eq!(shas, ["y", "x"]);
    }

    #[test]
    fn resolve_repo_by_id_or_spec() {
        let mut catalog = Catalog::default();
        let repo = catalog
            .add_repo(RepoKey::new("octo", "demo"), RepoSource::Manual, at(0))
            .unwrap();
        assert_eq!(catalog.resolve_repo(&repo.id.0).map(|r| &r.id), Some(&repo.id));
        assert_eq!(catalog.resolve_repo("octo/demo").map(|r| &r.id), Some(&repo.id));
        assert!(catalog.resolve_repo("octo/other").is_none());
    }

    #[test]
    fn import_requires_repo_and_release_arrays() {
        for doc in [
            json!({ "releases": [] }),
            json!({ "repos": [] }),
            json!({ "repos": {}, "releases": [] }),
            json!({ "repos": [], "releases": "nope" }),
        ] {
            let err = ImportData::from_value(doc).unwrap_err();
            assert!(matches!(err, CatalogError::InvalidImport(_)), "got: {err}");
        }
    }

    #[test]
    fn import_accepts_missing_commits() {
        let data = ImportData::from_value(json!({ "repos": [], "releases": [] })).unwrap();
        assert!(data.commits.is_empty());
    }

    #[test]
    fn merge_remaps_duplicate_repo_records() {
        let mut catalog = Catalog::default();
        let tracked = catalog
            .add_repo(RepoKey::new("octo", "demo"), RepoSource::Manual, at(0))
            .unwrap();
        catalog.upsert_release(release(&tracked.id, "v1", at(1)));

        let foreign = RepoId::from("foreign-id");
        let data = ImportData {
            repos: vec![TrackedRepo {
                id: foreign.clone(),
                owner: "octo".into(),
                name: "demo".into(),
                url: String::new(),
                added_at: at(0),
                source: RepoSource::Manual,
            }],
            releases: vec![release(&foreign, "v1", at(1)), release(&foreign, "v2", at(2))],
            commits: vec![commit(&RepoId::from("nobody"), "zzz", at(3))],
        };

        let summary = catalog.merge_import(data);
        assert_eq!(summary.repo_count, 0);
        assert_eq!(summary.release_count, 1);
        assert_eq!(summary.commit_count, 0);
        assert_eq!(catalog.releases.len(), 2);
        assert!(catalog.releases.iter().all(|r| r.repo_id == tracked.id));
    }
}
