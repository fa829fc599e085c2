//! # sphynx-core
//!
//! The in-process data and caching core of the Sphynx graph backend - THE LOGIC.
//!
//! This crate holds graph entities (vertex sets, edge bundles, attribute
//! columns) under content-derived [`Guid`]s and defines how operations
//! consume and produce them.
//!
//! ## Invariants
//!
//! - A vertex set fixes a position space `0..n`. Edges and attributes only
//!   ever speak in positions.
//! - Every edge endpoint lies inside its vertex set; every attribute column
//!   has exactly one slot per position.
//! - Identical (class, params, inputs) always derive identical guids, so a
//!   guid already in the store is a cache hit.
//! - Published entities are immutable and shared via `Arc`.
//!
//! ## Architectural Constraints
//!
//! - Synchronous: no async runtime, no network
//! - Emits `tracing` events but never installs a subscriber
//! - Concrete graph algorithms live outside; [`ops`] only holds data-shaping
//!   operations

// =============================================================================
// MODULES
// =============================================================================

pub mod config;
pub mod dag;
pub mod entity;
pub mod executor;
pub mod formats;
pub mod guid;
pub mod operation;
pub mod ops;
pub mod primitives;
pub mod registry;
pub mod storage;
pub mod store;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{EntityKind, Guid, SphynxError};

// =============================================================================
// RE-EXPORTS: Data Model
// =============================================================================

pub use entity::{
    Attribute, ColumnValue, DoubleAttribute, DoubleTuple2Attribute, EdgeBundle, Entity,
    EntityVariant, StringAttribute, VertexSet,
};

// =============================================================================
// RE-EXPORTS: Operations
// =============================================================================

pub use dag::Dag;
pub use executor::{ExecOutcome, Executor, RunReport};
pub use guid::{derive_instance_guid, derive_output_guid};
pub use operation::{OperationDescription, OperationInstance, Params};
pub use registry::{OpContext, Operation, Registry};

// =============================================================================
// RE-EXPORTS: Store & Persistence
// =============================================================================

pub use config::{CollisionPolicy, StoreConfig};
pub use formats::{
    EdgeRow, Manifest, SingleDoubleAttributeRow, SingleDoubleTuple2AttributeRow,
    SingleStringAttributeRow, VertexRow,
};
pub use storage::{CatalogEntry, RedbCatalog};
pub use store::EntityStore;
