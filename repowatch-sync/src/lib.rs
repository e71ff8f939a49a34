//! # repowatch-sync
//!
//! Remote metadata synchronization for tracked repositories.
//!
//! [`synchronize_at`] issues one batched GraphQL query for every tracked repo
//! through a [`MetadataSource`] and merges the result into the catalog with a
//! single write. [`Session`] wraps the same operations for callers that keep
//! state in memory.

pub mod error;
pub mod github;
pub mod graphql;
pub mod pipeline;
pub mod reconcile;
pub mod remote;
pub mod session;

pub use error::SyncError;
pub use github::GithubClient;
pub use pipeline::{last_commit_at, rate_limit_at, synchronize_at, SyncOutcome};
pub use reconcile::{reconcile, ReconcileReport};
pub use remote::{
    BatchResponse, MetadataSource, RateLimit, RemoteCommit, RemoteRelease, RepoMetadata,
};
pub use session::{Session, SessionEvent, SubscriptionId};
