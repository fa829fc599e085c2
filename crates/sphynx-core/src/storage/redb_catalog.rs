//! # redb-backed Catalog
//!
//! A small embedded database recording what has been computed and persisted:
//! - `instances`: instance guid -> postcard `OperationInstance`
//! - `entities`: entity guid -> postcard `CatalogEntry`
//!
//! Row data never goes here; it lives in entity directories. The catalog is
//! what lets a new process rebuild the instance DAG and answer "who produced
//! this guid" without scanning row files.

use crate::operation::OperationInstance;
use crate::{EntityKind, Guid, SphynxError};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Table for instances: guid hex -> serialized OperationInstance bytes
const INSTANCES: TableDefinition<&str, &[u8]> = TableDefinition::new("instances");

/// Table for entities: guid hex -> serialized CatalogEntry bytes
const ENTITIES: TableDefinition<&str, &[u8]> = TableDefinition::new("entities");

/// What the catalog knows about one persisted entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub guid: Guid,
    pub kind: EntityKind,
    /// Vertex count, edge count, or column length.
    pub len: u64,
    /// Instance that produced it, if it came out of an operation.
    pub producer: Option<Guid>,
}

/// Disk-backed catalog of instances and persisted entities.
pub struct RedbCatalog {
    db: Database,
}

impl std::fmt::Debug for RedbCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbCatalog").finish_non_exhaustive()
    }
}

fn storage_err(e: impl std::fmt::Display) -> SphynxError {
    SphynxError::StorageError(e.to_string())
}

impl RedbCatalog {
    /// Open or create a catalog at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SphynxError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path.as_ref()).map_err(storage_err)?;

        // Initialize tables if they don't exist
        {
            let write_txn = db.begin_write().map_err(storage_err)?;
            let _ = write_txn.open_table(INSTANCES).map_err(storage_err)?;
            let _ = write_txn.open_table(ENTITIES).map_err(storage_err)?;
            write_txn.commit().map_err(storage_err)?;
        }

        Ok(Self { db })
    }

    /// Record an executed instance. Re-recording is a no-op overwrite.
    pub fn record_instance(&self, instance: &OperationInstance) -> Result<(), SphynxError> {
        let bytes = postcard::to_stdvec(instance)
            .map_err(|e| SphynxError::SerializationError(e.to_string()))?;
        self.put(INSTANCES, instance.guid, &bytes)
    }

    /// Record a persisted entity.
    pub fn record_entity(&self, entry: &CatalogEntry) -> Result<(), SphynxError> {
        let bytes = postcard::to_stdvec(entry)
            .map_err(|e| SphynxError::SerializationError(e.to_string()))?;
        self.put(ENTITIES, entry.guid, &bytes)
    }

    /// Look up one instance.
    pub fn instance(&self, guid: Guid) -> Result<Option<OperationInstance>, SphynxError> {
        self.get(INSTANCES, guid)
    }

    /// Look up one entity entry.
    pub fn entity(&self, guid: Guid) -> Result<Option<CatalogEntry>, SphynxError> {
        self.get(ENTITIES, guid)
    }

    /// All recorded instances, ordered by guid.
    pub fn instances(&self) -> Result<Vec<OperationInstance>, SphynxError> {
        self.all(INSTANCES)
    }

    /// All recorded entities, ordered by guid.
    pub fn entities(&self) -> Result<Vec<CatalogEntry>, SphynxError> {
        self.all(ENTITIES)
    }

    /// Forget an entity entry.
    pub fn forget_entity(&self, guid: Guid) -> Result<(), SphynxError> {
        let write_txn = self.db.begin_write().map_err(storage_err)?;
        {
            let mut table = write_txn.open_table(ENTITIES).map_err(storage_err)?;
            table.remove(guid.to_hex().as_str()).map_err(storage_err)?;
        }
        write_txn.commit().map_err(storage_err)
    }

    fn put(
        &self,
        definition: TableDefinition<&str, &[u8]>,
        guid: Guid,
        bytes: &[u8],
    ) -> Result<(), SphynxError> {
        let write_txn = self.db.begin_write().map_err(storage_err)?;
        {
            let mut table = write_txn.open_table(definition).map_err(storage_err)?;
            table
                .insert(guid.to_hex().as_str(), bytes)
                .map_err(storage_err)?;
        }
        write_txn.commit().map_err(storage_err)
    }

    fn get<T: serde::de::DeserializeOwned>(
        &self,
        definition: TableDefinition<&str, &[u8]>,
        guid: Guid,
    ) -> Result<Option<T>, SphynxError> {
        let read_txn = self.db.begin_read().map_err(storage_err)?;
        let table = read_txn.open_table(definition).map_err(storage_err)?;
        let Some(value) = table.get(guid.to_hex().as_str()).map_err(storage_err)? else {
            return Ok(None);
        };
        postcard::from_bytes(value.value())
            .map(Some)
            .map_err(|e| SphynxError::SerializationError(format!("Catalog entry {}: {}", guid, e)))
    }

    fn all<T: serde::de::DeserializeOwned>(
        &self,
        definition: TableDefinition<&str, &[u8]>,
    ) -> Result<Vec<T>, SphynxError> {
        let read_txn = self.db.begin_read().map_err(storage_err)?;
        let table = read_txn.open_table(definition).map_err(storage_err)?;
        let mut result = Vec::new();
        for entry in table.iter().map_err(storage_err)? {
            let (key, value) = entry.map_err(storage_err)?;
            let decoded = postcard::from_bytes(value.value()).map_err(|e| {
                SphynxError::SerializationError(format!("Catalog entry {}: {}", key.value(), e))
            })?;
            result.push(decoded);
        }
        Ok(result)
    }
}
