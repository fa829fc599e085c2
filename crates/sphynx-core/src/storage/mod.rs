//! # Storage
//!
//! Everything that touches the filesystem:
//! - [`entity_dir`]: one directory of row files per persisted entity
//! - [`redb_catalog`]: embedded catalog of instances and persisted entities

pub mod entity_dir;
pub mod redb_catalog;

pub use redb_catalog::{CatalogEntry, RedbCatalog};
