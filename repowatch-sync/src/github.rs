//! [`MetadataSource`] backed by the GitHub GraphQL and REST APIs.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use repowatch_core::RepoKey;

use crate::graphql;
use crate::remote::{BatchResponse, MetadataSource, RateLimit, RemoteCommit};
use crate::SyncError;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Overrides [`DEFAULT_API_URL`], mainly for GitHub Enterprise.
pub const API_URL_ENV: &str = "REPOWATCH_API_URL";

const TIMEOUT: Duration = Duration::from_secs(30);

/// Blocking GitHub API client.
pub struct GithubClient {
    agent: ureq::Agent,
    base_url: String,
}

impl GithubClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(TIMEOUT)
            .user_agent(&format!("repowatch/{}", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            agent,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Client for `$REPOWATCH_API_URL`, or api.github.com when unset.
    pub fn from_env() -> Self {
        let base = std::env::var(API_URL_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        Self::new(base)
    }

    fn graphql(&self, body: &Value, token: Option<&str>) -> Result<Value, SyncError> {
        let url = format!("{}/graphql", self.base_url);
        tracing::debug!(%url, "POST graphql");
        let response = authorize(self.agent.post(&url), token)
            .send_json(body)
            .map_err(classify)?;
        decode(response)
    }
}

impl MetadataSource for GithubClient {
    fn fetch_batch(
        &self,
        repos: &[RepoKey],
        token: Option<&str>,
    ) -> Result<BatchResponse, SyncError> {
        let body = self.graphql(&graphql::batch_request(repos), token)?;
        graphql::parse_batch_response(body, repos.len())
    }

    fn fetch_last_commit(
        &self,
        repo: &RepoKey,
        token: Option<&str>,
    ) -> Result<RemoteCommit, SyncError> {
        let body = self.graphql(&graphql::last_commit_request(repo), token)?;
        graphql::parse_last_commit_response(body)
    }

    fn rate_limit(&self, token: Option<&str>) -> Result<RateLimit, SyncError> {
        let url = format!("{}/rate_limit", self.base_url);
        let response = authorize(self.agent.get(&url), token)
            .call()
            .map_err(classify)?;
        parse_rate_limit(decode(response)?)
    }
}

fn authorize(request: ureq::Request, token: Option<&str>) -> ureq::Request {
    match token {
        Some(token) => request.set("Authorization", &format!("bearer {token}")),
        None => request,
    }
}

fn decode(response: ureq::Response) -> Result<Value, SyncError> {
    response
        .into_json::<Value>()
        .map_err(|e| SyncError::Protocol(format!("invalid JSON from GitHub: {e}")))
}

/// Map a ureq failure onto the sync error taxonomy.
pub(crate) fn classify(err: ureq::Error) -> SyncError {
    match err {
        ureq::Error::Status(401, _) => SyncError::Unauthorized,
        ureq::Error::Status(403, _) => SyncError::RateLimited,
        ureq::Error::Status(code, response) => {
            SyncError::Transport(format!("HTTP {code} {}", response.status_text()))
        }
        ureq::Error::Transport(transport) => SyncError::Transport(transport.to_string()),
    }
}

#[derive(Debug, Deserialize)]
struct RateLimitEnvelope {
    rate: RateLimitWire,
}

#[derive(Debug, Deserialize)]
struct RateLimitWire {
    limit: u64,
    remaining: u64,
    reset: i64,
    #[serde(default)]
    used: u64,
}

fn parse_rate_limit(body: Value) -> Result<RateLimit, SyncError> {
    let envelope: RateLimitEnvelope = serde_json::from_value(body)
        .map_err(|e| SyncError::Protocol(format!("unexpected rate limit shape: {e}")))?;
    let rate = envelope.rate;
    Ok(RateLimit {
        limit: rate.limit,
        remaining: rate.remaining,
        reset: rate.reset,
        used: rate.used,
    })
}
