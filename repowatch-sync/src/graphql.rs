//! GraphQL request construction and response interpretation.
//!
//! All tracked repositories go into a single query, one aliased field per
//! repository (`repo0`, `repo1`, …). Owner and name travel as variables, so
//! repository names never need escaping.

use std::collections::HashMap;
use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use repowatch_core::RepoKey;

use crate::remote::{BatchResponse, RemoteCommit, RemoteRelease, RepoMetadata};
use crate::SyncError;

const COMMIT_FIELDS: &str = "oid message committedDate author { name } url";

/// Error `type` GitHub uses for a repository that does not resolve.
const NOT_FOUND: &str = "NOT_FOUND";

fn alias(index: usize) -> String {
    format!("repo{index}")
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Request body covering every repository in `repos`.
pub fn batch_request(repos: &[RepoKey]) -> Value {
    let mut params = Vec::with_capacity(repos.len() * 2);
    let mut fields = String::new();
    let mut variables = Map::new();

    for (index, repo) in repos.iter().enumerate() {
        params.push(format!("$owner{index}: String!"));
        params.push(format!("$name{index}: String!"));
        let _ = writeln!(
            fields,
            "  {}: repository(owner: $owner{index}, name: $name{index}) {{ ...TrackedRepo }}",
            alias(index)
        );
        variables.insert(format!("owner{index}"), Value::from(repo.owner.as_str()));
        variables.insert(format!("name{index}"), Value::from(repo.name.as_str()));
    }

    let query = format!(
        "query TrackedRepos({params}) {{\n{fields}}}\n\
         fragment TrackedRepo on Repository {{\n  \
           latestRelease {{ tagName name publishedAt url description }}\n  \
           defaultBranchRef {{ target {{ ... on Commit {{ {COMMIT_FIELDS} }} }} }}\n\
         }}\n",
        params = params.join(", "),
    );
    json!({ "query": query, "variables": variables })
}

/// Request body for the default-branch tip of one repository.
pub fn last_commit_request(repo: &RepoKey) -> Value {
    let query = format!(
        "query LastCommit($owner: String!, $name: String!) {{\n  \
           repository(owner: $owner, name: $name) {{\n    \
             defaultBranchRef {{ target {{ ... on Commit {{ {COMMIT_FIELDS} }} }} }}\n  \
           }}\n\
         }}\n"
    );
    json!({
        "query": query,
        "variables": { "owner": repo.owner, "name": repo.name },
    })
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    path: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireRepository {
    latest_release: Option<WireRelease>,
    default_branch_ref: Option<WireBranchRef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireRelease {
    tag_name: String,
    name: Option<String>,
    published_at: Option<DateTime<Utc>>,
    url: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireBranchRef {
    target: Option<WireCommit>,
}

/// Non-commit targets come back as `{}`, hence every field is optional.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCommit {
    oid: Option<String>,
    message: Option<String>,
    committed_date: Option<DateTime<Utc>>,
    author: Option<WireAuthor>,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireAuthor {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireLastCommit {
    repository: Option<LastCommitRepository>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LastCommitRepository {
    default_branch_ref: Option<WireBranchRef>,
}

impl WireRelease {
    fn into_remote(self) -> Option<RemoteRelease> {
        Some(RemoteRelease {
            published_at: self.published_at?,
            tag_name: self.tag_name,
            name: self.name.filter(|n| !n.is_empty()),
            url: self.url,
            description: self.description,
        })
    }
}

impl WireBranchRef {
    fn into_commit(self) -> Option<RemoteCommit> {
        let target = self.target?;
        Some(RemoteCommit {
            sha: target.oid?,
            committed_at: target.committed_date?,
            message: target.message.unwrap_or_default(),
            author_name: target.author.and_then(|a| a.name).unwrap_or_default(),
            url: target.url.unwrap_or_default(),
        })
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Interpret the response to [`batch_request`] for `count` repositories.
///
/// `NOT_FOUND` errors pointing at one of the aliases only mark that repository
/// as absent. Any other error fails the whole batch.
pub fn parse_batch_response(body: Value, count: usize) -> Result<BatchResponse, SyncError> {
    let envelope: Envelope<HashMap<String, Option<WireRepository>>> =
        serde_json::from_value(body)
            .map_err(|e| SyncError::Protocol(format!("unexpected response shape: {e}")))?;

    let aliases: Vec<String> = (0..count).map(alias).collect();
    if let Some(fatal) = envelope
        .errors
        .iter()
        .find(|err| !is_missing_repo(err, &aliases))
    {
        return Err(SyncError::Protocol(fatal.message.clone()));
    }

    let mut data = envelope
        .data
        .ok_or_else(|| SyncError::Protocol("response carried no data".to_string()))?;

    let repos = aliases
        .iter()
        .map(|alias| {
            data.remove(alias).flatten().map(|repo| RepoMetadata {
                release: repo.latest_release.and_then(WireRelease::into_remote),
                commit: repo.default_branch_ref.and_then(WireBranchRef::into_commit),
            })
        })
        .collect();
    Ok(BatchResponse { repos })
}

/// Interpret the response to [`last_commit_request`].
pub fn parse_last_commit_response(body: Value) -> Result<RemoteCommit, SyncError> {
    let envelope: Envelope<WireLastCommit> = serde_json::from_value(body)
        .map_err(|e| SyncError::Protocol(format!("unexpected response shape: {e}")))?;
    if let Some(err) = envelope.errors.first() {
        if err.kind.as_deref() != Some(NOT_FOUND) {
            return Err(SyncError::Protocol(err.message.clone()));
        }
    }
    envelope
        .data
        .and_then(|d| d.repository)
        .and_then(|r| r.default_branch_ref)
        .and_then(WireBranchRef::into_commit)
        .ok_or_else(|| {
            SyncError::Protocol("repository not found or no commits available".to_string())
        })
}

fn is_missing_repo(err: &GraphqlError, aliases: &[String]) -> bool {
    err.kind.as_deref() == Some(NOT_FOUND)
        && err
            .path
            .first()
            .and_then(Value::as_str)
            .is_some_and(|head| aliases.iter().any(|a| a == head))
}
