//! Domain types for the repowatch catalog.
//!
//! Field names serialize in camelCase so that catalog files, settings files and
//! export files share one on-disk shape.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

/// Current on-disk catalog version. Files without a `version` field read as `0`.
pub const CATALOG_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Opaque unique token identifying a tracked repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepoId(pub String);

impl RepoId {
    /// Fresh random id (UUID v4).
    pub fn generate() -> Self {
        Self(generate_id())
    }
}

/// Fresh random record id (UUID v4) for releases and commits.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for RepoId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RepoId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Identity of a repository on the remote host: `(owner, name)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RepoKey {
    pub owner: String,
    pub name: String,
}

impl RepoKey {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Parse `owner/name`, `https://github.com/owner/name[.git]` or
    /// `git@github.com:owner/name[.git]`.
    pub fn parse(spec: &str) -> Result<Self, CatalogError> {
        let invalid = || CatalogError::InvalidRepoSpec(spec.to_string());
        let trimmed = spec.trim().trim_end_matches('/');
        let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);

        let (path, from_url) = if let Some(rest) = trimmed
            .strip_prefix("https://github.com/")
            .or_else(|| trimmed.strip_prefix("http://github.com/"))
            .or_else(|| trimmed.strip_prefix("git@github.com:"))
        {
            (rest, true)
        } else {
            (trimmed, false)
        };

        let mut segments = path.split('/');
        let owner = segments.next().ok_or_else(invalid)?;
        let name = segments.next().ok_or_else(invalid)?;
        // URLs may point deeper into the repo (`/tree/main`); bare specs may not.
        if !from_url && segments.next().is_some() {
            return Err(invalid());
        }
        if !is_valid_segment(owner) || !is_valid_segment(name) {
            return Err(invalid());
        }
        Ok(Self::new(owner, name))
    }

    /// `https://github.com/<owner>/<name>`
    pub fn canonical_url(&self) -> String {
        format!("https://github.com/{}/{}", self.owner, self.name)
    }
}

impl fmt::Display for RepoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// How a repository entered the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RepoSource {
    /// Discovered by scanning a folder of working copies.
    Folder,
    #[default]
    Manual,
}

impl fmt::Display for RepoSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepoSource::Folder => write!(f, "folder"),
            RepoSource::Manual => write!(f, "manual"),
        }
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// A repository the user has chosen to track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedRepo {
    pub id: RepoId,
    pub owner: String,
    pub name: String,
    pub url: String,
    pub added_at: DateTime<Utc>,
    #[serde(default)]
    pub source: RepoSource,
}

impl TrackedRepo {
    pub fn key(&self) -> RepoKey {
        RepoKey::new(self.owner.clone(), self.name.clone())
    }

    pub fn matches(&self, key: &RepoKey) -> bool {
        self.owner == key.owner && self.name == key.name
    }
}

/// Latest published release of a tracked repository.
///
/// Unique per `(repo_id, tag_name)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    pub id: String,
    pub repo_id: RepoId,
    pub repo_owner: String,
    pub repo_name: String,
    pub tag_name: String,
    /// Display name; falls back to the tag when the release is unnamed.
    pub name: String,
    pub published_at: DateTime<Utc>,
    pub html_url: String,
    #[serde(default)]
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<DateTime<Utc>>,
}

/// Tip of a tracked repository's default branch. Unique per `repo_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    pub id: String,
    pub repo_id: RepoId,
    pub repo_owner: String,
    pub repo_name: String,
    pub sha: String,
    pub message: String,
    #[serde(rename = "date")]
    pub committed_at: DateTime<Utc>,
    #[serde(rename = "author")]
    pub author_name: String,
    pub html_url: String,
    pub fetched_at: DateTime<Utc>,
}

/// Root of the persisted catalog (`~/.repowatch/data.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub repos: Vec<TrackedRepo>,
    #[serde(default)]
    pub releases: Vec<Release>,
    #[serde(default)]
    pub commits: Vec<Commit>,
    #[serde(default)]
    pub last_fetch: Option<DateTime<Utc>>,
}

/// User settings (`~/.repowatch/settings.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub github_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_folder_path: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
