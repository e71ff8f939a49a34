use std::cell::RefCell;
use std::fs;
use std::sync::{Arc, Mutex};

use chrono::{TimeZone, Utc};
use repowatch_core::{catalog, settings, store, ErrorKind, RepoKey, RepoSource};
use repowatch_sync::{
    synchronize_at, BatchResponse, MetadataSource, RateLimit, RemoteCommit, RemoteRelease,
    RepoMetadata, Session, SessionEvent, SyncError,
};
use tempfile::TempDir;

/// Scripted remote: hands out queued batch responses and records each call.
#[derive(Default)]
struct FakeSource {
    batches: RefCell<Vec<Result<BatchResponse, SyncError>>>,
    calls: RefCell<Vec<(Vec<RepoKey>, Option<String>)>>,
}

impl FakeSource {
    fn with(batches: Vec<Result<BatchResponse, SyncError>>) -> Self {
        Self {
            batches: RefCell::new(batches),
            calls: RefCell::default(),
        }
    }
}

impl MetadataSource for FakeSource {
    fn fetch_batch(
        &self,
        repos: &[RepoKey],
        token: Option<&str>,
    ) -> Result<BatchResponse, SyncError> {
        self.calls
            .borrow_mut()
            .push((repos.to_vec(), token.map(str::to_string)));
        let mut batches = self.batches.borrow_mut();
        assert!(!batches.is_empty(), "unexpected fetch_batch call");
        batches.remove(0)
    }

    fn fetch_last_commit(
        &self,
        _repo: &RepoKey,
        _token: Option<&str>,
    ) -> Result<RemoteCommit, SyncError> {
        Err(SyncError::Protocol(
            "repository not found or no commits available".into(),
        ))
    }

    fn rate_limit(&self, _token: Option<&str>) -> Result<RateLimit, SyncError> {
        Ok(RateLimit {
            limit: 5000,
            remaining: 5000,
            reset: 0,
            used: 0,
        })
    }
}

fn release(tag: &str, day: u32) -> RemoteRelease {
    RemoteRelease {
        tag_name: tag.into(),
        name: Some(format!("Release {tag}")),
        published_at: Utc.with_ymd_and_hms(2024, 6, day, 9, 0, 0).unwrap(),
        url: format!("https://github.com/o/r/releases/tag/{tag}"),
        description: None,
    }
}

fn commit(sha: &str, day: u32) -> RemoteCommit {
    RemoteCommit {
        sha: sha.into(),
        message: format!("commit {sha}"),
        committed_at: Utc.with_ymd_and_hms(2024, 6, day, 9, 0, 0).unwrap(),
        author_name: "Grace".into(),
        url: format!("https://github.com/o/r/commit/{sha}"),
    }
}

fn meta(release: Option<RemoteRelease>, commit: Option<RemoteCommit>) -> Option<RepoMetadata> {
    Some(RepoMetadata { release, commit })
}

fn home_with(names: &[&str]) -> TempDir {
    let home = TempDir::new().expect("home");
    for name in names {
        catalog::add_repo_at(home.path(), RepoKey::new("o", *name), RepoSource::Manual)
            .expect("add");
    }
    home
}

#[test]
fn empty_catalog_issues_no_request() {
    let home = TempDir::new().unwrap();
    let source = FakeSource::default();
    let outcome = synchronize_at(home.path(), &source).expect("sync");
    assert!(outcome.releases.is_empty());
    assert!(source.calls.borrow().is_empty());
    assert!(store::load_catalog_at(home.path()).last_fetch.is_none());
}

#[test]
fn merges_releases_and_commits_sorted_newest_first() {
    let home = home_with(&["a", "b"]);
    let source = FakeSource::with(vec![Ok(BatchResponse {
        repos: vec![
            meta(Some(release("v1", 1)), Some(commit("c-a", 5))),
            meta(Some(release("v9", 3)), Some(commit("c-b", 2))),
        ],
    })]);

    let outcome = synchronize_at(home.path(), &source).expect("sync");
    let tags: Vec<_> = outcome.releases.iter().map(|r| r.tag_name.as_str()).collect();
    assert_eq!(tags, vec!["v9", "v1"]);
    let shas: Vec<_> = outcome.commits.iter().map(|c| c.sha.as_str()).collect();
    assert_eq!(shas, vec!["c-a", "c-b"]);
    assert_eq!(outcome.report.releases_inserted, 2);

    let stored = store::load_catalog_at(home.path());
    assert!(stored.last_fetch.is_some());
    assert_eq!(stored.releases.len(), 2);
    assert_eq!(stored.releases[0].name, "Release v1");

    let requested = &source.calls.borrow()[0].0;
    assert_eq!(requested, &vec![RepoKey::new("o", "a"), RepoKey::new("o", "b")]);
}

#[test]
fn refetch_does_not_duplicate_records() {
    let home = home_with(&["a"]);
    let batch = || {
        Ok(BatchResponse {
            repos: vec![meta(Some(release("v1", 1)), Some(commit("c1", 1)))],
        })
    };
    let source = FakeSource::with(vec![batch(), batch()]);
    synchronize_at(home.path(), &source).expect("first");
    let outcome = synchronize_at(home.path(), &source).expect("second");

    assert_eq!(outcome.releases.len(), 1);
    assert_eq!(outcome.commits.len(), 1);
    assert_eq!(outcome.report.releases_replaced, 1);
    assert_eq!(outcome.report.commits_replaced, 1);
}

#[test]
fn commit_is_replaced_by_newer_tip() {
    let home = home_with(&["a"]);
    let source = FakeSource::with(vec![
        Ok(BatchResponse {
            repos: vec![meta(None, Some(commit("old", 1)))],
        }),
        Ok(BatchResponse {
            repos: vec![meta(None, Some(commit("new", 2)))],
        }),
    ]);
    synchronize_at(home.path(), &source).unwrap();
    let outcome = synchronize_at(home.path(), &source).unwrap();
    assert_eq!(outcome.commits.len(), 1);
    assert_eq!(outcome.commits[0].sha, "new");
}

#[test]
fn remote_failure_leaves_catalog_file_untouched() {
    let home = home_with(&["a"]);
    let source = FakeSource::with(vec![
        Ok(BatchResponse {
            repos: vec![meta(Some(release("v1", 1)), None)],
        }),
        Err(SyncError::Unauthorized),
        Err(SyncError::Transport("connection refused".into())),
    ]);
    synchronize_at(home.path(), &source).expect("first sync");
    let path = store::catalog_path_at(home.path());
    let before = fs::read(&path).unwrap();

    let err = synchronize_at(home.path(), &source).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Auth);
    let err = synchronize_at(home.path(), &source).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);

    assert_eq!(fs::read(&path).unwrap(), before);
}

#[test]
fn absent_repo_is_skipped_while_others_reconcile() {
    let home = home_with(&["renamed", "alive"]);
    let source = FakeSource::with(vec![Ok(BatchResponse {
        repos: vec![None, meta(Some(release("v2", 2)), None)],
    })]);
    let outcome = synchronize_at(home.path(), &source).expect("sync");
    assert_eq!(outcome.releases.len(), 1);
    assert_eq!(outcome.releases[0].repo_name, "alive");
    assert_eq!(outcome.report.missing, vec![RepoKey::new("o", "renamed")]);
}

#[test]
fn stored_token_is_sent() {
    let home = home_with(&["a"]);
    settings::save_token_at(home.path(), "ghp_stored").unwrap();
    let source = FakeSource::with(vec![Ok(BatchResponse {
        repos: vec![meta(None, None)],
    })]);
    synchronize_at(home.path(), &source).unwrap();
    assert_eq!(source.calls.borrow()[0].1.as_deref(), Some("ghp_stored"));
}

#[test]
fn session_tracks_state_and_notifies_listeners() {
    let home = home_with(&["a"]);
    let source = FakeSource::with(vec![
        Ok(BatchResponse {
            repos: vec![meta(Some(release("v1", 1)), Some(commit("c1", 1)))],
        }),
        Err(SyncError::RateLimited),
    ]);
    let mut session = Session::open(home.path(), source);
    assert_eq!(session.repos().len(), 1);

    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    session.subscribe(move |event| sink.lock().unwrap().push(event.clone()));

    session.refresh().expect("refresh");
    assert_eq!(session.releases().len(), 1);
    assert!(!session.loading());
    {
        let seen = events.lock().unwrap();
        assert_eq!(seen.first(), Some(&SessionEvent::Loading(true)));
        assert!(seen.contains(&SessionEvent::Releases));
        assert_eq!(seen.last(), Some(&SessionEvent::Loading(false)));
    }

    let err = session.refresh().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RateLimit);
    assert!(session.error().is_some());
    assert_eq!(session.releases().len(), 1, "failed refresh keeps old data");

    session.clear_error();
    assert!(session.error().is_none());
}

#[test]
fn session_add_and_remove_update_in_memory_lists() {
    let home = home_with(&["a"]);
    let source = FakeSource::with(vec![Ok(BatchResponse {
        repos: vec![meta(Some(release("v1", 1)), Some(commit("c1", 1)))],
    })]);
    let mut session = Session::open(home.path(), source);
    session.refresh().unwrap();

    let err = session
        .add_repo(RepoKey::new("o", "a"), RepoSource::Manual)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(session.error().is_some());

    session
        .add_repo(RepoKey::new("o", "b"), RepoSource::Folder)
        .expect("add");
    assert_eq!(session.repos().len(), 2);

    session.remove_repo("o/a").expect("remove");
    assert_eq!(session.repos().len(), 1);
    assert!(session.releases().is_empty());
    assert!(session.commits().is_empty());
    assert_eq!(catalog::list_repos_at(home.path()).len(), 1);
}
