//! JSON persistence for the catalog and settings.
//!
//! # Storage layout
//!
//! ```text
//! ~/.repowatch/          (mode 0700)
//!   data.json            (catalog, mode 0600)
//!   settings.json        (settings, mode 0600)
//! ```
//!
//! # API pattern
//!
//! Every function takes an explicit `home`. The CLI derives it from
//! [`default_home`]; tests pass a `TempDir`.
//!
//! Loads never fail: a missing or unreadable file yields the default value so
//! a corrupt catalog cannot lock the user out. Saves are atomic
//! (`.tmp` sibling → `chmod 0600` → `rename`).

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{io_err, CatalogError};
use crate::types::{Catalog, Settings, CATALOG_VERSION};

pub const STATE_DIR: &str = ".repowatch";
pub const CATALOG_FILE: &str = "data.json";
pub const SETTINGS_FILE: &str = "settings.json";

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// The user's home directory.
pub fn default_home() -> Result<PathBuf, CatalogError> {
    dirs::home_dir().ok_or(CatalogError::HomeNotFound)
}

/// `<home>/.repowatch/`: pure, no I/O.
pub fn state_dir_at(home: &Path) -> PathBuf {
    home.join(STATE_DIR)
}

/// `<home>/.repowatch/data.json`
pub fn catalog_path_at(home: &Path) -> PathBuf {
    state_dir_at(home).join(CATALOG_FILE)
}

/// `<home>/.repowatch/settings.json`
pub fn settings_path_at(home: &Path) -> PathBuf {
    state_dir_at(home).join(SETTINGS_FILE)
}

/// Creates `<home>/.repowatch/` (mode `0700`) if it does not yet exist.
fn ensure_state_dir(home: &Path) -> Result<PathBuf, CatalogError> {
    let dir = state_dir_at(home);
    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        set_dir_permissions(&dir)?;
    }
    Ok(dir)
}

// ---------------------------------------------------------------------------
// 2. Catalog
// ---------------------------------------------------------------------------

/// Load the catalog, migrating older layouts to [`CATALOG_VERSION`].
pub fn load_catalog_at(home: &Path) -> Catalog {
    migrate(read_or_default(&catalog_path_at(home)))
}

/// Overwrite the catalog on disk.
pub fn save_catalog_at(home: &Path, catalog: &Catalog) -> Result<(), CatalogError> {
    ensure_state_dir(home)?;
    write_json_atomic(&catalog_path_at(home), catalog)
}

/// Bring a catalog read from disk up to the current version.
///
/// Version 0 files predate cascading deletes and may hold releases or commits
/// whose repository is gone; those are dropped.
pub fn migrate(mut catalog: Catalog) -> Catalog {
    if catalog.version < 1 {
        let before = (catalog.releases.len(), catalog.commits.len());
        let live: std::collections::HashSet<_> =
            catalog.repos.iter().map(|r| r.id.clone()).collect();
        catalog.releases.retain(|r| live.contains(&r.repo_id));
        catalog.commits.retain(|c| live.contains(&c.repo_id));
        let dropped =
            (before.0 - catalog.releases.len()) + (before.1 - catalog.commits.len());
        if dropped > 0 {
            tracing::info!(dropped, "migration dropped orphaned catalog records");
        }
    }
    catalog.version = CATALOG_VERSION;
    catalog
}

// ---------------------------------------------------------------------------
// 3. Settings
// ---------------------------------------------------------------------------

pub fn load_settings_at(home: &Path) -> Settings {
    read_or_default(&settings_path_at(home))
}

pub fn save_settings_at(home: &Path, settings: &Settings) -> Result<(), CatalogError> {
    ensure_state_dir(home)?;
    write_json_atomic(&settings_path_at(home), settings)
}

// ---------------------------------------------------------------------------
// 4. Shared read / atomic write
// ---------------------------------------------------------------------------

fn read_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return T::default(),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "unreadable state file; using defaults");
            return T::default();
        }
    };
    match serde_json::from_str(&contents) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "corrupt state file; using defaults");
            T::default()
        }
    }
}

/// Serialize `value` as pretty JSON and atomically replace `path`.
///
/// Write flow: serialize → `<path>.tmp` sibling → `chmod 0600` → `rename`.
pub fn write_json_atomic<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
) -> Result<(), CatalogError> {
    let json = serde_json::to_string_pretty(value)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!("{file_name}.tmp"));

    std::fs::write(&tmp, json).map_err(|e| io_err(&tmp, e))?;
    set_file_permissions(&tmp)?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), CatalogError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), CatalogError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), CatalogError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), CatalogError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
