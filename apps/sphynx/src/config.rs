//! # Configuration
//!
//! Layers, lowest priority first:
//!
//! 1. binary defaults (outputs persisted, catalog on)
//! 2. `sphynx.toml`, or the file named by `--config`
//! 3. `ORDERED_SPHYNX_DATA_DIR` / `UNORDERED_SPHYNX_DATA_DIR`
//! 4. `--data-dir` / `--unordered-data-dir`
//!
//! Layers 3 and 4 both arrive through clap, which lets a flag win over its
//! environment variable.
//!
//! ```toml
//! [store]
//! data_dir = "sphynx-data/ordered"
//! unordered_data_dir = "sphynx-data/unordered"
//! collision = "reject"
//! persist_outputs = true
//! catalog = true
//! ```

use serde::Deserialize;
use sphynx_core::{CollisionPolicy, SphynxError, StoreConfig};
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "sphynx.toml";

/// Environment variable overriding `data_dir`.
pub const ORDERED_DIR_ENV: &str = "ORDERED_SPHYNX_DATA_DIR";

/// Environment variable overriding `unordered_data_dir`.
pub const UNORDERED_DIR_ENV: &str = "UNORDERED_SPHYNX_DATA_DIR";

/// Maximum config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Directory overrides from the environment or the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub data_dir: Option<PathBuf>,
    pub unordered_data_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawConfig {
    store: RawStore,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawStore {
    data_dir: Option<PathBuf>,
    unordered_data_dir: Option<PathBuf>,
    collision: Option<CollisionPolicy>,
    persist_outputs: Option<bool>,
    catalog: Option<bool>,
}

/// Store configuration the binary starts from.
#[must_use]
pub fn binary_defaults() -> StoreConfig {
    StoreConfig::default().persistent()
}

/// Resolve the store configuration.
///
/// An explicit `path` must exist; the default `sphynx.toml` is optional.
pub fn load(path: Option<&Path>, overrides: &Overrides) -> Result<StoreConfig, SphynxError> {
    let raw = match path {
        Some(path) => read_file(path)?,
        None => {
            let default = Path::new(DEFAULT_CONFIG_FILE);
            if default.is_file() {
                read_file(default)?
            } else {
                RawConfig::default()
            }
        }
    };
    Ok(apply(raw, overrides))
}

/// Parse TOML text on top of [`binary_defaults`].
pub fn from_toml(text: &str, overrides: &Overrides) -> Result<StoreConfig, SphynxError> {
    let raw: RawConfig =
        toml::from_str(text).map_err(|e| SphynxError::ConfigError(e.to_string()))?;
    Ok(apply(raw, overrides))
}

fn read_file(path: &Path) -> Result<RawConfig, SphynxError> {
    let metadata = std::fs::metadata(path).map_err(|e| {
        SphynxError::ConfigError(format!("Cannot read config '{}': {}", path.display(), e))
    })?;
    if metadata.len() > MAX_CONFIG_FILE_SIZE {
        return Err(SphynxError::ConfigError(format!(
            "Config '{}' exceeds {} bytes",
            path.display(),
            MAX_CONFIG_FILE_SIZE
        )));
    }
    let text = std::fs::read_to_string(path)?;
    tracing::debug!(path = %path.display(), "Loaded config file");
    toml::from_str(&text)
        .map_err(|e| SphynxError::ConfigError(format!("{}: {}", path.display(), e)))
}

fn apply(raw: RawConfig, overrides: &Overrides) -> StoreConfig {
    let mut config = binary_defaults();
    let store = raw.store;

    if let Some(dir) = store.data_dir {
        config.data_dir = dir;
    }
    if let Some(dir) = store.unordered_data_dir {
        config.unordered_data_dir = dir;
    }
    if let Some(collision) = store.collision {
        config.collision = collision;
    }
    if let Some(persist) = store.persist_outputs {
        config.persist_outputs = persist;
    }
    if let Some(catalog) = store.catalog {
        config.catalog = catalog;
    }

    if let Some(dir) = &overrides.data_dir {
        config.data_dir.clone_from(dir);
    }
    if let Some(dir) = &overrides.unordered_data_dir {
        config.unordered_data_dir.clone_from(dir);
    }
    config
}
