//! Credential and update-folder settings.
//!
//! Two token reads exist on purpose: [`stored_token_at`] only reports what the
//! user saved, while [`resolve_token_at`] also falls back to `$GITHUB_TOKEN`.
//! The environment value is read fresh on every call and never written back.

use std::path::{Path, PathBuf};

use crate::error::CatalogError;
use crate::store;

/// Environment variable consulted when no token is stored.
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";

/// The token saved in settings, ignoring the environment.
pub fn stored_token_at(home: &Path) -> Option<String> {
    non_empty(store::load_settings_at(home).github_token)
}

/// The token to authenticate with: stored first, then `$GITHUB_TOKEN`.
pub fn resolve_token_at(home: &Path) -> Option<String> {
    resolve_token(stored_token_at(home), std::env::var(TOKEN_ENV).ok())
}

fn resolve_token(stored: Option<String>, env: Option<String>) -> Option<String> {
    non_empty(stored).or_else(|| non_empty(env))
}

pub fn save_token_at(home: &Path, token: &str) -> Result<(), CatalogError> {
    let mut settings = store::load_settings_at(home);
    settings.github_token = Some(token.trim().to_string());
    store::save_settings_at(home, &settings)
}

pub fn remove_token_at(home: &Path) -> Result<(), CatalogError> {
    let mut settings = store::load_settings_at(home);
    settings.github_token = None;
    store::save_settings_at(home, &settings)
}

/// Folder under which working copies are cloned and updated.
pub fn update_folder_at(home: &Path) -> Option<PathBuf> {
    store::load_settings_at(home).update_folder_path
}

pub fn save_update_folder_at(home: &Path, folder: &Path) -> Result<(), CatalogError> {
    let mut settings = store::load_settings_at(home);
    settings.update_folder_path = Some(folder.to_path_buf());
    store::save_settings_at(home, &settings)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
