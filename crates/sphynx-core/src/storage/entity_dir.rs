//! # Entity Directories
//!
//! One directory per guid under a data root:
//!
//! ```text
//! <root>/<guid>/manifest
//! <root>/<guid>/rows
//! <root>/<guid>/_SUCCESS
//! ```
//!
//! Writes land in a private `<root>/.staging-<guid>-XXXXXX/` directory first
//! and are published with a single rename, so readers never observe
//! half-written entities. A directory without `_SUCCESS` is treated as
//! absent.

use crate::formats::Manifest;
use crate::formats::ordered::Encoded;
use crate::primitives::{
    MANIFEST_FILE, MAX_MANIFEST_SIZE, MAX_ROW_FILE_SIZE, ROWS_FILE, STAGING_PREFIX, SUCCESS_MARKER,
};
use crate::{Guid, SphynxError};
use std::fs;
use std::path::{Path, PathBuf};

/// Directory holding `guid` under `root`.
#[must_use]
pub fn entity_path(root: &Path, guid: Guid) -> PathBuf {
    root.join(guid.to_hex())
}

/// True when `guid` has been completely written under `root`.
#[must_use]
pub fn exists(root: &Path, guid: Guid) -> bool {
    entity_path(root, guid).join(SUCCESS_MARKER).is_file()
}

/// Publish an encoded entity under `root`.
///
/// Every call stages into its own directory, so concurrent writers of one
/// guid never share files. Content is guid-addressed: when a complete copy
/// is already published (before or during this call) it is kept and the
/// staged copy is discarded. A target left without `_SUCCESS` is replaced.
pub fn write(root: &Path, encoded: &Encoded) -> Result<PathBuf, SphynxError> {
    let guid = encoded.manifest.guid;
    let target = entity_path(root, guid);
    if exists(root, guid) {
        return Ok(target);
    }
    fs::create_dir_all(root).map_err(|e| io_context("create data root", root, e))?;

    let staging = tempfile::Builder::new()
        .prefix(&format!("{}{}-", STAGING_PREFIX, guid.to_hex()))
        .tempdir_in(root)
        .map_err(|e| io_context("create staging", root, e))?;
    let dir = staging.path();
    fs::write(dir.join(MANIFEST_FILE), encoded.manifest.to_bytes()?)
        .map_err(|e| io_context("write manifest", dir, e))?;
    fs::write(dir.join(ROWS_FILE), &encoded.rows).map_err(|e| io_context("write rows", dir, e))?;
    fs::write(dir.join(SUCCESS_MARKER), b"").map_err(|e| io_context("write marker", dir, e))?;

    if let Err(err) = fs::rename(dir, &target) {
        if exists(root, guid) {
            tracing::debug!(guid = %guid, "Entity published concurrently, keeping that copy");
            return Ok(target);
        }
        if !target.exists() {
            return Err(io_context("publish", &target, err));
        }
        // Incomplete leftover from an interrupted write.
        match fs::remove_dir_all(&target) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
                return Err(io_context("clear incomplete", &target, e));
            }
            _ => {}
        }
        if let Err(err) = fs::rename(dir, &target) {
            if !exists(root, guid) {
                return Err(io_context("publish", &target, err));
            }
        }
    }
    Ok(target)
}

/// Read the manifest and row bytes of `guid` under `root`.
pub fn read(root: &Path, guid: Guid) -> Result<(Manifest, Vec<u8>), SphynxError> {
    if !exists(root, guid) {
        return Err(SphynxError::MissingEntity(guid));
    }
    let dir = entity_path(root, guid);
    let manifest_bytes = read_limited(&dir.join(MANIFEST_FILE), MAX_MANIFEST_SIZE)?;
    let manifest = Manifest::from_bytes(&manifest_bytes, guid)?;
    let rows = read_limited(&dir.join(ROWS_FILE), MAX_ROW_FILE_SIZE)?;
    Ok((manifest, rows))
}

/// Remove `guid` under `root`. Missing directories are not an error.
pub fn remove(root: &Path, guid: Guid) -> Result<(), SphynxError> {
    let dir = entity_path(root, guid);
    if dir.exists() {
        fs::remove_dir_all(&dir).map_err(|e| io_context("remove", &dir, e))?;
    }
    Ok(())
}

/// Every completely written guid under `root`, sorted.
///
/// Staging directories and names that are not guids are skipped.
pub fn list(root: &Path) -> Result<Vec<Guid>, SphynxError> {
    if !root.is_dir() {
        return Ok(Vec::new());
    }
    let mut guids = Vec::new();
    for entry in fs::read_dir(root).map_err(|e| io_context("list", root, e))? {
        let entry = entry.map_err(|e| io_context("list", root, e))?;
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            continue;
        };
        if let Ok(guid) = name.parse::<Guid>() {
            if exists(root, guid) {
                guids.push(guid);
            }
        }
    }
    guids.sort();
    Ok(guids)
}

/// Read a file after checking its size against `max_size`.
fn read_limited(path: &Path, max_size: u64) -> Result<Vec<u8>, SphynxError> {
    let metadata = fs::metadata(path).map_err(|e| io_context("stat", path, e))?;
    if metadata.len() > max_size {
        return Err(SphynxError::SerializationError(format!(
            "File {} is {} bytes, exceeding maximum allowed {} bytes",
            path.display(),
            metadata.len(),
            max_size
        )));
    }
    fs::read(path).map_err(|e| io_context("read", path, e))
}

fn io_context(action: &str, path: &Path, err: std::io::Error) -> SphynxError {
    SphynxError::IoError(format!("{} {}: {}", action, path.display(), err))
}
