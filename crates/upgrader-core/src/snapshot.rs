//! Module-list snapshot persistence.
//!
//! The snapshot is a JSON array of resolved releases, overwritten in full
//! on every successful resolution pass. Writes go to a temp file that is
//! flushed, synced and renamed into place, so readers never observe a
//! partial write. The filename is derived from the tenant identity so
//! multi-shop hosts keep separate listings.

use crate::config::UpgradeSettings;
use crate::error::{Result, UpgradeError};
use crate::models::ModuleRelease;
use serde::{de::DeserializeOwned, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process;
use tracing::debug;

/// Snapshot path for a tenant: `<cache>/github-upgrade-manager/<hash>.json`.
pub fn snapshot_path(settings: &UpgradeSettings) -> PathBuf {
    let identity = settings.tenant.replace('/', "_");
    let digest = hex::encode(Sha256::digest(identity.as_bytes()));
    settings.snapshot_dir().join(format!("{}.json", digest))
}

/// Read the last persisted listing; a missing file is an empty listing.
pub fn read_snapshot(path: &Path) -> Result<Vec<ModuleRelease>> {
    Ok(read_json(path)?.unwrap_or_default())
}

/// Persist the listing, replacing any previous snapshot in full.
pub fn write_snapshot(path: &Path, modules: &[ModuleRelease]) -> Result<()> {
    write_json_atomic(path, &modules)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }

    let mut file = File::open(path).map_err(|e| UpgradeError::io_with_path(e, path))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .map_err(|e| UpgradeError::io_with_path(e, path))?;

    let data: T = serde_json::from_str(&contents).map_err(|e| UpgradeError::Json {
        message: format!("Failed to parse {}: {}", path.display(), e),
        source: Some(e),
    })?;

    Ok(Some(data))
}

fn write_json_atomic<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| UpgradeError::io_with_path(e, parent))?;
        }
    }

    let temp_path = path.with_extension(format!("json.{}.tmp", process::id()));
    let serialized = serde_json::to_string(data)?;

    {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(|e| UpgradeError::io_with_path(e, &temp_path))?;

        file.write_all(serialized.as_bytes())
            .map_err(|e| UpgradeError::io_with_path(e, &temp_path))?;
        file.flush()
            .map_err(|e| UpgradeError::io_with_path(e, &temp_path))?;
        file.sync_all()
            .map_err(|e| UpgradeError::io_with_path(e, &temp_path))?;
    }

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        UpgradeError::io_with_path(e, path)
    })?;

    debug!("Wrote snapshot {}", path.display());
    Ok(())
}
