//! repowatch core library: domain types, catalog persistence, errors.
//!
//! - [`types`]: newtypes and persisted structs
//! - [`error`]: [`CatalogError`] and the shared [`ErrorKind`] taxonomy
//! - [`store`]: JSON load / save for catalog and settings
//! - [`catalog`]: add / remove / upsert / import / export
//! - [`settings`]: token and update-folder settings

pub mod catalog;
pub mod error;
pub mod settings;
pub mod store;
pub mod types;

pub use catalog::{BulkAdd, ImportData, ImportSummary, Upsert};
pub use error::{CatalogError, ErrorKind};
pub use types::{
    Catalog, Commit, Release, RepoId, RepoKey, RepoSource, Settings, TrackedRepo,
    CATALOG_VERSION,
};
