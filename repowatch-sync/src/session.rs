//! In-memory view of the catalog for interactive callers.
//!
//! A [`Session`] owns the current repos, releases and commits together with a
//! `loading` flag and the last error message. Every mutation goes through the
//! persisted `*_at` operations first and only then updates the in-memory copy,
//! so the session never shows state that is not on disk. Listeners registered
//! with [`Session::subscribe`] are told about each field that changed.

use std::path::{Path, PathBuf};

use repowatch_core::{
    catalog, store, BulkAdd, Commit, Release, RepoKey, RepoSource, TrackedRepo,
};

use crate::pipeline::{synchronize_at, SyncOutcome};
use crate::remote::MetadataSource;
use crate::SyncError;

/// Which part of the session changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Repos,
    Releases,
    Commits,
    Loading(bool),
    Error(Option<String>),
}

/// Handle returned by [`Session::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(usize);

type Listener = Box<dyn FnMut(&SessionEvent) + Send>;

pub struct Session<S> {
    home: PathBuf,
    source: S,
    repos: Vec<TrackedRepo>,
    releases: Vec<Release>,
    commits: Vec<Commit>,
    loading: bool,
    error: Option<String>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_id: usize,
}

impl<S: MetadataSource> Session<S> {
    /// Open a session on `<home>/.repowatch` and load what is stored.
    pub fn open(home: impl Into<PathBuf>, source: S) -> Self {
        let mut session = Self {
            home: home.into(),
            source,
            repos: Vec::new(),
            releases: Vec::new(),
            commits: Vec::new(),
            loading: false,
            error: None,
            listeners: Vec::new(),
            next_id: 0,
        };
        session.load_stored();
        session
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn repos(&self) -> &[TrackedRepo] {
        &self.repos
    }

    pub fn releases(&self) -> &[Release] {
        &self.releases
    }

    pub fn commits(&self) -> &[Commit] {
        &self.commits
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn subscribe(
        &mut self,
        listener: impl FnMut(&SessionEvent) + Send + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    /// Re-read everything from disk.
    pub fn reload(&mut self) {
        self.load_stored();
    }

    /// Track one repository; a duplicate is an error.
    pub fn add_repo(
        &mut self,
        key: RepoKey,
        source: RepoSource,
    ) -> Result<TrackedRepo, SyncError> {
        let repo = self.run(|home| Ok(catalog::add_repo_at(home, key, source)?))?;
        self.repos.push(repo.clone());
        self.emit(SessionEvent::Repos);
        Ok(repo)
    }

    /// Track several repositories, skipping ones already tracked.
    pub fn add_repos(
        &mut self,
        keys: Vec<RepoKey>,
        source: RepoSource,
    ) -> Result<BulkAdd, SyncError> {
        let outcome = self.run(|home| Ok(catalog::add_repos_at(home, keys, source)?))?;
        if !outcome.added.is_empty() {
            self.repos = catalog::list_repos_at(&self.home);
            self.emit(SessionEvent::Repos);
        }
        Ok(outcome)
    }

    /// Stop tracking a repository (by id or `owner/name`) and drop its records.
    pub fn remove_repo(&mut self, reference: &str) -> Result<TrackedRepo, SyncError> {
        let removed = self.run(|home| Ok(catalog::remove_repo_at(home, reference)?))?;
        self.repos.retain(|r| r.id != removed.id);
        self.releases.retain(|r| r.repo_id != removed.id);
        self.commits.retain(|c| c.repo_id != removed.id);
        self.emit(SessionEvent::Repos);
        self.emit(SessionEvent::Releases);
        self.emit(SessionEvent::Commits);
        Ok(removed)
    }

    /// Synchronize with GitHub and pick up the merged releases and commits.
    pub fn refresh(&mut self) -> Result<SyncOutcome, SyncError> {
        self.set_loading(true);
        self.set_error(None);
        let result = synchronize_at(&self.home, &self.source);
        match &result {
            Ok(outcome) => {
                self.releases = outcome.releases.clone();
                self.commits = outcome.commits.clone();
                self.emit(SessionEvent::Releases);
                self.emit(SessionEvent::Commits);
            }
            Err(err) => self.set_error(Some(err.to_string())),
        }
        self.set_loading(false);
        result
    }

    pub fn clear_error(&mut self) {
        self.set_error(None);
    }

    fn load_stored(&mut self) {
        let stored = store::load_catalog_at(&self.home);
        self.releases = stored.releases_newest_first();
        self.commits = stored.commits_newest_first();
        self.repos = stored.repos;
        self.emit(SessionEvent::Repos);
        self.emit(SessionEvent::Releases);
        self.emit(SessionEvent::Commits);
    }

    /// Wrap a persisted operation in the loading/error bookkeeping.
    fn run<T>(
        &mut self,
        op: impl FnOnce(&Path) -> Result<T, SyncError>,
    ) -> Result<T, SyncError> {
        self.set_loading(true);
        self.set_error(None);
        let home = self.home.clone();
        let result = op(&home);
        if let Err(err) = &result {
            tracing::debug!(error = %err, "session operation failed");
            self.set_error(Some(err.to_string()));
        }
        self.set_loading(false);
        result
    }

    fn set_loading(&mut self, loading: bool) {
        if self.loading != loading {
            self.loading = loading;
            self.emit(SessionEvent::Loading(loading));
        }
    }

    fn set_error(&mut self, error: Option<String>) {
        if self.error != error {
            self.error = error.clone();
            self.emit(SessionEvent::Error(error));
        }
    }

    fn emit(&mut self, event: SessionEvent) {
        for (_, listener) in &mut self.listeners {
            listener(&event);
        }
    }
}
