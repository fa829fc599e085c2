//! # Store Configuration
//!
//! Plain data describing where the store keeps its files and how it treats
//! guid collisions. Deserializable so the binary can read it from TOML; the
//! core itself never touches a config file.

use crate::primitives::CATALOG_FILE;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What `put` does when a guid already holds different content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Refuse the write with `SphynxError::Collision`.
    #[default]
    Reject,
    /// Replace the stored entity (last writer wins).
    Overwrite,
}

/// Configuration for an [`EntityStore`](crate::store::EntityStore).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Root of finalized, position-ordered entity data.
    pub data_dir: PathBuf,
    /// Root of staging data keyed by external ids.
    pub unordered_data_dir: PathBuf,
    /// Collision handling in `put`.
    pub collision: CollisionPolicy,
    /// Persist every operation output after publishing it.
    pub persist_outputs: bool,
    /// Keep a redb catalog of instances and persisted entities.
    pub catalog: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("sphynx-data/ordered"),
            unordered_data_dir: PathBuf::from("sphynx-data/unordered"),
            collision: CollisionPolicy::Reject,
            persist_outputs: false,
            catalog: false,
        }
    }
}

impl StoreConfig {
    /// Config rooted at `root`, with `ordered/` and `unordered/` below it.
    #[must_use]
    pub fn rooted_at(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            data_dir: root.join("ordered"),
            unordered_data_dir: root.join("unordered"),
            ..Self::default()
        }
    }

    /// Enable output persistence and the catalog.
    #[must_use]
    pub fn persistent(mut self) -> Self {
        self.persist_outputs = true;
        self.catalog = true;
        self
    }

    /// Path of the catalog database.
    #[must_use]
    pub fn catalog_path(&self) -> PathBuf {
        self.data_dir.join(CATALOG_FILE)
    }
}
