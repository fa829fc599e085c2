//! # Core Type Definitions
//!
//! This module contains the leaf types every other Sphynx module builds on:
//! - Content-derived identifiers (`Guid`)
//! - The closed set of entity kinds (`EntityKind`)
//! - Error types (`SphynxError`)
//!
//! ## Determinism Guarantees
//!
//! - `Guid` implements `Ord` so it can key `BTreeMap`/`BTreeSet` with a stable
//!   iteration order.
//! - A `Guid` renders as 64 lowercase hex characters and parses back losslessly.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// GUID
// =============================================================================

/// Content address of an entity or an operation instance.
///
/// A `Guid` is the 32-byte BLAKE3 digest of the content it names. It is never
/// assigned, only derived (see [`crate::guid`]).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Guid(pub [u8; 32]);

impl Guid {
    /// Length of the textual (hex) form.
    pub const HEX_LEN: usize = 64;

    /// View the digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex rendering, used for directory names and logs.
    #[must_use]
    pub fn to_hex(&self) -> String {
        blake3::Hash::from_bytes(self.0).to_hex().to_string()
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Guid({})", self.to_hex())
    }
}

impl FromStr for Guid {
    type Err = SphynxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != Self::HEX_LEN {
            return Err(SphynxError::InvalidGuid(s.to_string()));
        }
        blake3::Hash::from_hex(s)
            .map(|hash| Self(*hash.as_bytes()))
            .map_err(|_| SphynxError::InvalidGuid(s.to_string()))
    }
}

impl From<blake3::Hash> for Guid {
    fn from(hash: blake3::Hash) -> Self {
        Self(*hash.as_bytes())
    }
}

impl Serialize for Guid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Guid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// ENTITY KIND
// =============================================================================

/// The closed set of entity kinds the store can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// Canonical ordered position space.
    VertexSet,
    /// Edges as (src position, dst position) pairs.
    EdgeBundle,
    /// Per-position `f64` column.
    DoubleAttribute,
    /// Per-position UTF-8 string column.
    StringAttribute,
    /// Per-position `(f64, f64)` column.
    DoubleTuple2Attribute,
}

impl EntityKind {
    /// Stable lowercase name for logs and CLI output.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::VertexSet => "vertex_set",
            Self::EdgeBundle => "edge_bundle",
            Self::DoubleAttribute => "double_attribute",
            Self::StringAttribute => "string_attribute",
            Self::DoubleTuple2Attribute => "double_tuple2_attribute",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Sphynx core.
///
/// Variants fall into families that callers branch on:
/// - missing data ([`SphynxError::is_retryable`]): recoverable once upstream
///   instances have run or the entity has been loaded
/// - corrupt data ([`SphynxError::is_corrupt`]): not recoverable without
///   regenerating the entity
/// - addressing, operation and environment faults
#[derive(Debug, Error)]
pub enum SphynxError {
    // -------------------------------------------------------------------------
    // Missing
    // -------------------------------------------------------------------------
    /// No entity is registered (or persisted) under this guid.
    #[error("Entity not found: {0}")]
    MissingEntity(Guid),

    /// An operation input slot refers to an entity that does not exist yet.
    #[error("Missing input '{slot}': {guid}")]
    MissingInput { slot: String, guid: Guid },

    // -------------------------------------------------------------------------
    // Corrupt
    // -------------------------------------------------------------------------
    /// An entity exists but has a different kind than the caller required.
    #[error("Entity {guid} is a {found}, expected {expected}")]
    KindMismatch {
        guid: Guid,
        expected: EntityKind,
        found: EntityKind,
    },

    /// A column's length disagrees with the size it must align to.
    #[error("Length mismatch in {guid}.{field}: expected {expected}, got {actual}")]
    LengthMismatch {
        guid: Guid,
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A position lies outside its vertex set.
    #[error("Position out of range in {guid}.{field}[{index}]: {position} not in 0..{size}")]
    PositionOutOfRange {
        guid: Guid,
        field: &'static str,
        index: usize,
        position: i64,
        size: usize,
    },

    /// A vertex set maps two positions to the same external id.
    #[error("Duplicate external id {external_id} in vertex set {guid}")]
    DuplicateExternalId { guid: Guid, external_id: i64 },

    /// An attribute row file contains the same position twice.
    #[error("Duplicate position {position} in {guid} at row {row}")]
    DuplicatePosition { guid: Guid, row: u64, position: i64 },

    /// Attribute rows must be written in increasing position order.
    #[error("Unsorted positions in {guid} at row {row}: {position} after {previous}")]
    UnsortedPositions {
        guid: Guid,
        row: u64,
        position: i64,
        previous: i64,
    },

    /// A row file holds a different number of rows than its manifest declares.
    #[error("Row count mismatch in {guid}: manifest declares {expected}, found {actual}")]
    MissingRows {
        guid: Guid,
        expected: u64,
        actual: u64,
    },

    /// A single row could not be decoded.
    #[error("Malformed row {row} in {guid}: {reason}")]
    MalformedRow {
        guid: Guid,
        row: u64,
        reason: String,
    },

    /// Unordered data referenced an external id the vertex set does not hold.
    #[error("Unknown external id {external_id} in {guid} at row {row}")]
    UnknownExternalId {
        guid: Guid,
        row: u64,
        external_id: i64,
    },

    // -------------------------------------------------------------------------
    // Addressing
    // -------------------------------------------------------------------------
    /// Different content was offered under an already registered guid.
    #[error("Guid collision: {0} already holds different content")]
    Collision(Guid),

    /// An instance's guid does not match the guid derived from its content.
    #[error("Guid mismatch: declared {declared}, derived {derived}")]
    GuidMismatch { declared: Guid, derived: Guid },

    /// Text that does not parse as a guid.
    #[error("Invalid guid: {0:?}")]
    InvalidGuid(String),

    // -------------------------------------------------------------------------
    // Operations
    // -------------------------------------------------------------------------
    /// No operation is registered for this class tag.
    #[error("Unknown operation class: {0}")]
    UnknownOperation(String),

    /// Parameters do not match the class's parameter schema.
    #[error("Invalid parameters for {class}: {reason}")]
    InvalidParams { class: String, reason: String },

    /// The operation did not produce a declared output.
    #[error("Operation {class} did not produce output '{slot}'")]
    MissingOutput { class: String, slot: String },

    /// The operation produced an output slot that was not declared.
    #[error("Operation {class} produced undeclared output '{slot}'")]
    UnexpectedOutput { class: String, slot: String },

    /// The instance graph contains a cycle.
    #[error("Operation graph contains a cycle through {0}")]
    Cycle(Guid),

    /// The operation itself reported a failure.
    #[error("Operation {class} failed: {reason}")]
    OperationFailed { class: String, reason: String },

    // -------------------------------------------------------------------------
    // Environment
    // -------------------------------------------------------------------------
    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),

    /// The catalog database reported an error.
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Configuration could not be read or is inconsistent.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl SphynxError {
    /// True when the condition may clear up once upstream work completes.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::MissingEntity(_) | Self::MissingInput { .. })
    }

    /// True when the data itself is bad and must be regenerated.
    #[must_use]
    pub const fn is_corrupt(&self) -> bool {
        matches!(
            self,
            Self::KindMismatch { .. }
                | Self::LengthMismatch { .. }
                | Self::PositionOutOfRange { .. }
                | Self::DuplicateExternalId { .. }
                | Self::DuplicatePosition { .. }
                | Self::UnsortedPositions { .. }
                | Self::MissingRows { .. }
                | Self::MalformedRow { .. }
                | Self::UnknownExternalId { .. }
        )
    }
}

impl From<std::io::Error> for SphynxError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}

// =============================================================================
// TESTS
// =============================================================================
