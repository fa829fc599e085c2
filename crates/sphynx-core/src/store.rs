//! # Entity Store
//!
//! The single source of truth mapping [`Guid`] to [`Entity`].
//!
//! ## Locking
//!
//! One `parking_lot::RwLock` covers the whole map:
//! - `get`/`has` take the shared lock and never block each other
//! - `put` validates with no lock held, compares against an existing entry
//!   under an upgradable read (readers still proceed), and takes the
//!   exclusive lock only for the insert itself
//! - every disk read and write happens with no lock held
//!
//! Published entities are immutable. `get` hands out `Arc` clones, never
//! copies of the column data.
//!
//! ## Persistence
//!
//! The store owns two roots from [`StoreConfig`]: `data_dir` (ordered,
//! finalized data) and `unordered_data_dir` (staging data keyed by external
//! ids). With `catalog` enabled, every persisted entity is also recorded in a
//! [`RedbCatalog`] under `data_dir`.

use crate::config::{CollisionPolicy, StoreConfig};
use crate::entity::{
    DoubleAttribute, DoubleTuple2Attribute, EdgeBundle, Entity, EntityVariant, StringAttribute,
    VertexSet,
};
use crate::formats::{ordered, unordered};
use crate::storage::{CatalogEntry, RedbCatalog, entity_dir};
use crate::{EntityKind, Guid, SphynxError};
use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Concurrency-safe guid -> entity map plus its persistence roots.
#[derive(Debug)]
pub struct EntityStore {
    entities: RwLock<BTreeMap<Guid, Entity>>,
    config: StoreConfig,
    catalog: Option<RedbCatalog>,
}

impl EntityStore {
    /// Open a store with the given configuration.
    ///
    /// Opens (or creates) the catalog when `config.catalog` is set. No entity
    /// data is read until it is asked for.
    pub fn new(config: StoreConfig) -> Result<Self, SphynxError> {
        let catalog = if config.catalog {
            Some(RedbCatalog::open(config.catalog_path())?)
        } else {
            None
        };
        Ok(Self {
            entities: RwLock::new(BTreeMap::new()),
            config,
            catalog,
        })
    }

    /// A memory-only store with default roots and no catalog.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            entities: RwLock::new(BTreeMap::new()),
            config: StoreConfig::default(),
            catalog: None,
        }
    }

    // =========================================================================
    // IN-MEMORY MAP
    // =========================================================================

    /// Entity registered under `guid`, or `None` if not computed / not loaded.
    #[must_use]
    pub fn get(&self, guid: &Guid) -> Option<Entity> {
        self.entities.read().get(guid).cloned()
    }

    /// True when `guid` is registered in memory.
    #[must_use]
    pub fn has(&self, guid: &Guid) -> bool {
        self.entities.read().contains_key(guid)
    }

    /// Validate and publish `entity` under `guid`.
    ///
    /// Returns the entity now registered under `guid`. Offering identical
    /// content again is a no-op that returns the existing entity.
    ///
    /// # Errors
    ///
    /// - a corrupt-family error if the entity does not fit its vertex sets
    /// - `MissingEntity` if a referenced vertex set is unknown
    /// - `Collision` if different content is already registered and the
    ///   policy is [`CollisionPolicy::Reject`]
    /// - `Collision` under [`CollisionPolicy::Overwrite`] too, when a vertex
    ///   set would change kind or size
    pub fn put(&self, guid: Guid, entity: Entity) -> Result<Entity, SphynxError> {
        entity.validate(guid, |g| self.resolve_vertex_set(g))?;

        let guard = self.entities.upgradable_read();
        if let Some(existing) = guard.get(&guid) {
            if existing.same_content(&entity) {
                tracing::debug!(guid = %guid, kind = %entity.kind(), "Identical re-put ignored");
                return Ok(existing.clone());
            }
            tracing::warn!(
                guid = %guid,
                existing = %existing.kind(),
                offered = %entity.kind(),
                policy = ?self.config.collision,
                "Guid collision: different content offered under a registered guid"
            );
            if self.config.collision == CollisionPolicy::Reject {
                return Err(SphynxError::Collision(guid));
            }
            // Published edge bundles and attributes index into this set.
            if let Entity::VertexSet(current) = existing {
                if entity.kind() != EntityKind::VertexSet || entity.len() != current.len() {
                    return Err(SphynxError::Collision(guid));
                }
            }
        }
        RwLockUpgradableReadGuard::upgrade(guard).insert(guid, entity.clone());
        Ok(entity)
    }

    /// Drop `guid` from memory. Persisted copies are left alone.
    pub fn remove(&self, guid: &Guid) -> Option<Entity> {
        self.entities.write().remove(guid)
    }

    /// Drop `guid` from memory, `data_dir` and the catalog.
    ///
    /// Entities that refer to `guid` are not followed; purging a vertex set
    /// that persisted attributes still use leaves them unloadable until it
    /// is computed again. Returns true when anything was removed.
    pub fn purge(&self, guid: &Guid) -> Result<bool, SphynxError> {
        let in_memory = self.remove(guid).is_some();
        let on_disk = self.has_persisted(guid);
        entity_dir::remove(&self.config.data_dir, *guid)?;
        if let Some(catalog) = &self.catalog {
            catalog.forget_entity(*guid)?;
        }
        tracing::info!(guid = %guid, in_memory, on_disk, "Purged entity");
        Ok(in_memory || on_disk)
    }

    /// Number of entities in memory.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.read().len()
    }

    /// True when no entity is in memory.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.read().is_empty()
    }

    /// Guids in memory, sorted.
    #[must_use]
    pub fn guids(&self) -> Vec<Guid> {
        self.entities.read().keys().copied().collect()
    }

    // =========================================================================
    // TYPED ACCESSORS
    // =========================================================================

    /// Entity under `guid` narrowed to one concrete type.
    ///
    /// Looks in memory only, like [`EntityStore::get`]. For entities that may
    /// only be on disk, narrow the result of [`EntityStore::get_or_load`] with
    /// [`Entity::downcast`].
    ///
    /// # Errors
    ///
    /// `MissingEntity` when absent, `KindMismatch` when of another kind.
    pub fn typed<T: EntityVariant>(&self, guid: &Guid) -> Result<Arc<T>, SphynxError> {
        self.get(guid)
            .ok_or(SphynxError::MissingEntity(*guid))?
            .downcast(*guid)
    }

    /// Vertex set under `guid`.
    pub fn vertex_set(&self, guid: &Guid) -> Result<Arc<VertexSet>, SphynxError> {
        self.typed(guid)
    }

    /// Edge bundle under `guid`.
    pub fn edge_bundle(&self, guid: &Guid) -> Result<Arc<EdgeBundle>, SphynxError> {
        self.typed(guid)
    }

    /// Double attribute under `guid`.
    pub fn double_attribute(&self, guid: &Guid) -> Result<Arc<DoubleAttribute>, SphynxError> {
        self.typed(guid)
    }

    /// String attribute under `guid`.
    pub fn string_attribute(&self, guid: &Guid) -> Result<Arc<StringAttribute>, SphynxError> {
        self.typed(guid)
    }

    /// Double pair attribute under `guid`.
    pub fn double_tuple2_attribute(
        &self,
        guid: &Guid,
    ) -> Result<Arc<DoubleTuple2Attribute>, SphynxError> {
        self.typed(guid)
    }

    /// Vertex set from memory, or from `data_dir` if only persisted there.
    fn resolve_vertex_set(&self, guid: &Guid) -> Result<Arc<VertexSet>, SphynxError> {
        self.get_or_load(guid)?.downcast(*guid)
    }

    // =========================================================================
    // ORDERED PERSISTENCE
    // =========================================================================

    /// Root of finalized, ordered entity data.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Root of unordered staging data.
    #[must_use]
    pub fn unordered_data_dir(&self) -> &Path {
        &self.config.unordered_data_dir
    }

    /// Configuration the store was opened with.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Catalog, when enabled.
    #[must_use]
    pub fn catalog(&self) -> Option<&RedbCatalog> {
        self.catalog.as_ref()
    }

    /// True when `guid` is completely written under `data_dir`.
    #[must_use]
    pub fn has_persisted(&self, guid: &Guid) -> bool {
        entity_dir::exists(&self.config.data_dir, *guid)
    }

    /// Every guid completely written under `data_dir`.
    pub fn persisted_guids(&self) -> Result<Vec<Guid>, SphynxError> {
        entity_dir::list(&self.config.data_dir)
    }

    /// Write the in-memory entity under `guid` to `data_dir/<guid>/`.
    ///
    /// Vertex sets it refers to are persisted first if they are not on disk
    /// yet, so the written entity can always be loaded back.
    pub fn persist(&self, guid: &Guid) -> Result<PathBuf, SphynxError> {
        self.persist_from(guid, None)
    }

    /// [`EntityStore::persist`], recording `producer` in the catalog.
    pub(crate) fn persist_from(
        &self,
        guid: &Guid,
        producer: Option<Guid>,
    ) -> Result<PathBuf, SphynxError> {
        let entity = self.get(guid).ok_or(SphynxError::MissingEntity(*guid))?;
        for reference in entity.references() {
            if !self.has_persisted(&reference) {
                self.persist_from(&reference, None)?;
            }
        }

        let encoded = ordered::encode(*guid, &entity, |g| self.resolve_vertex_set(g))?;
        let path = entity_dir::write(&self.config.data_dir, &encoded)?;
        tracing::info!(
            guid = %guid,
            kind = %entity.kind(),
            rows = encoded.manifest.row_count,
            "Persisted entity"
        );

        if let Some(catalog) = &self.catalog {
            let producer = match producer {
                Some(producer) => Some(producer),
                None => catalog.entity(*guid)?.and_then(|entry| entry.producer),
            };
            catalog.record_entity(&CatalogEntry {
                guid: *guid,
                kind: entity.kind(),
                len: entity.len() as u64,
                producer,
            })?;
        }
        Ok(path)
    }

    /// Read `data_dir/<guid>/`, validate it and publish it.
    ///
    /// Referenced vertex sets are resolved through [`EntityStore::get_or_load`]
    /// first.
    pub fn load(&self, guid: &Guid) -> Result<Entity, SphynxError> {
        let (manifest, rows) = entity_dir::read(&self.config.data_dir, *guid)?;
        for reference in &manifest.references {
            self.get_or_load(&reference.guid)?;
        }
        let entity = ordered::decode(&manifest, &rows, |g| self.vertex_set(g))?;
        tracing::info!(
            guid = %guid,
            kind = %manifest.kind,
            rows = manifest.row_count,
            "Loaded entity"
        );
        self.put(*guid, entity)
    }

    /// Memory hit, else disk load.
    ///
    /// # Errors
    ///
    /// `MissingEntity` when `guid` is neither in memory nor persisted.
    pub fn get_or_load(&self, guid: &Guid) -> Result<Entity, SphynxError> {
        if let Some(entity) = self.get(guid) {
            return Ok(entity);
        }
        if self.has_persisted(guid) {
            return self.load(guid);
        }
        Err(SphynxError::MissingEntity(*guid))
    }

    // =========================================================================
    // UNORDERED STAGING
    // =========================================================================

    /// Write `guid` to `unordered_data_dir/<guid>/`, keyed by external ids.
    pub fn export_unordered(&self, guid: &Guid) -> Result<PathBuf, SphynxError> {
        let entity = self.get_or_load(guid)?;
        let encoded = unordered::encode(*guid, &entity, |g| self.resolve_vertex_set(g))?;
        let path = entity_dir::write(&self.config.unordered_data_dir, &encoded)?;
        tracing::info!(
            guid = %guid,
            kind = %entity.kind(),
            rows = encoded.manifest.row_count,
            "Exported unordered entity"
        );
        Ok(path)
    }

    /// Read `unordered_data_dir/<guid>/`, assign positions and publish.
    ///
    /// Referenced vertex sets come from memory, `data_dir`, or are imported
    /// from `unordered_data_dir` themselves, in that order.
    pub fn import_unordered(&self, guid: &Guid) -> Result<Entity, SphynxError> {
        let (manifest, rows) = entity_dir::read(&self.config.unordered_data_dir, *guid)?;
        for reference in &manifest.references {
            let known = self.has(&reference.guid) || self.has_persisted(&reference.guid);
            if !known && entity_dir::exists(&self.config.unordered_data_dir, reference.guid) {
                self.import_unordered(&reference.guid)?;
            }
        }
        let entity = unordered::decode(&manifest, &rows, |g| self.resolve_vertex_set(g))?;
        tracing::info!(
            guid = %guid,
            kind = %manifest.kind,
            rows = manifest.row_count,
            "Imported unordered entity"
        );
        self.put(*guid, entity)
    }
}

// =============================================================================
// TESTS
// =============================================================================
