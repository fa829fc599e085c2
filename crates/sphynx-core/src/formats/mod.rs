//! # Columnar Row Formats
//!
//! Byte-level encoding of entities as flat row files. This module is pure:
//! it turns entities into bytes and bytes back into entities. Directory
//! handling lives in [`crate::storage`].
//!
//! Every file starts with a 5-byte header:
//! - 4 bytes: Magic ("SPHX")
//! - 1 byte: Version
//!
//! A row file then holds a `u64` little-endian row count followed by that
//! many postcard-encoded rows, back to back. Rows are decoded one at a time
//! so a failure can name the row it happened at.
//!
//! Two layouts share these files:
//! - [`ordered`]: rows in canonical position order (`data_dir`)
//! - [`unordered`]: rows keyed by external ids (`unordered_data_dir`)

pub mod ordered;
pub mod rows;
pub mod unordered;

use crate::{EntityKind, Guid, SphynxError, primitives};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub use rows::{
    AttributeRow, EdgeRow, SingleDoubleAttributeRow, SingleDoubleTuple2AttributeRow,
    SingleStringAttributeRow, VertexRow,
};

// =============================================================================
// FILE HEADER
// =============================================================================

/// The header preceding every manifest and row file.
#[derive(Debug, Clone, Copy)]
pub struct FileHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl FileHeader {
    /// Create a new header with current format version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *primitives::MAGIC_BYTES,
            version: primitives::FORMAT_VERSION,
        }
    }

    /// Validate the header.
    pub fn validate(&self) -> Result<(), SphynxError> {
        if &self.magic != primitives::MAGIC_BYTES {
            return Err(SphynxError::SerializationError(
                "Invalid magic bytes".to_string(),
            ));
        }
        if self.version != primitives::FORMAT_VERSION {
            return Err(SphynxError::SerializationError(format!(
                "Unsupported version: {} (expected {})",
                self.version,
                primitives::FORMAT_VERSION
            )));
        }
        Ok(())
    }

    /// Write header to bytes.
    pub fn to_bytes(&self) -> [u8; primitives::HEADER_LEN] {
        let mut bytes = [0u8; primitives::HEADER_LEN];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes
    }

    /// Read and validate the header, returning the bytes after it.
    pub fn strip(bytes: &[u8]) -> Result<&[u8], SphynxError> {
        if bytes.len() < primitives::HEADER_LEN {
            return Err(SphynxError::SerializationError(
                "Header too short".to_string(),
            ));
        }
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[0..4]);
        Self {
            magic,
            version: bytes[4],
        }
        .validate()?;
        Ok(&bytes[primitives::HEADER_LEN..])
    }
}

impl Default for FileHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// MANIFEST
// =============================================================================

/// A vertex set an entity depends on, with the size it had when written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexSetRef {
    pub guid: Guid,
    pub size: u64,
}

/// Describes one persisted entity: what it is, how many rows it has, and
/// which vertex sets its positions point into.
///
/// `references` is empty for vertex sets, `[vertex_set]` for attributes and
/// `[src, dst]` for edge bundles (both entries present even when equal).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub guid: Guid,
    pub kind: EntityKind,
    pub row_count: u64,
    pub references: Vec<VertexSetRef>,
}

impl Manifest {
    /// Serialize to bytes (header + payload).
    pub fn to_bytes(&self) -> Result<Vec<u8>, SphynxError> {
        let payload = postcard::to_stdvec(self)
            .map_err(|e| SphynxError::SerializationError(e.to_string()))?;
        let mut result = Vec::with_capacity(primitives::HEADER_LEN + payload.len());
        result.extend_from_slice(&FileHeader::new().to_bytes());
        result.extend_from_slice(&payload);
        Ok(result)
    }

    /// Deserialize from bytes and check it describes `guid`.
    pub fn from_bytes(bytes: &[u8], guid: Guid) -> Result<Self, SphynxError> {
        let payload = FileHeader::strip(bytes)?;
        let manifest: Self = postcard::from_bytes(payload).map_err(|e| {
            SphynxError::SerializationError(format!("Failed to decode manifest of {}: {}", guid, e))
        })?;
        if manifest.guid != guid {
            return Err(SphynxError::SerializationError(format!(
                "Manifest describes {}, expected {}",
                manifest.guid, guid
            )));
        }
        if manifest.row_count > primitives::MAX_ROW_COUNT {
            return Err(SphynxError::SerializationError(format!(
                "Row count {} exceeds maximum allowed {}",
                manifest.row_count,
                primitives::MAX_ROW_COUNT
            )));
        }
        Ok(manifest)
    }

    /// The `index`-th reference, or a decode error naming the entity.
    pub fn reference(&self, index: usize) -> Result<VertexSetRef, SphynxError> {
        self.references.get(index).copied().ok_or_else(|| {
            SphynxError::SerializationError(format!(
                "Manifest of {} {} lacks vertex set reference {}",
                self.kind, self.guid, index
            ))
        })
    }
}

// =============================================================================
// ROW FILE CODEC
// =============================================================================

/// Encode rows as a row file (header + count + rows).
pub fn encode_rows<R: Serialize>(rows: &[R]) -> Result<Vec<u8>, SphynxError> {
    let mut result = Vec::with_capacity(primitives::HEADER_LEN + 8 + rows.len() * 8);
    result.extend_from_slice(&FileHeader::new().to_bytes());
    result.extend_from_slice(&(rows.len() as u64).to_le_bytes());
    for row in rows {
        let encoded =
            postcard::to_stdvec(row).map_err(|e| SphynxError::SerializationError(e.to_string()))?;
        result.extend_from_slice(&encoded);
    }
    Ok(result)
}

/// Decode a row file holding exactly `expected` rows.
///
/// Fails with `MissingRows` if the stored count disagrees with `expected`,
/// and with `MalformedRow` (naming the row) on truncated or undecodable data.
pub fn decode_rows<R: DeserializeOwned>(
    bytes: &[u8],
    guid: Guid,
    expected: u64,
) -> Result<Vec<R>, SphynxError> {
    let body = FileHeader::strip(bytes)?;
    if body.len() < 8 {
        return Err(SphynxError::MalformedRow {
            guid,
            row: 0,
            reason: "row count missing".to_string(),
        });
    }
    let mut count_bytes = [0u8; 8];
    count_bytes.copy_from_slice(&body[0..8]);
    let stored = u64::from_le_bytes(count_bytes);
    if stored != expected {
        return Err(SphynxError::MissingRows {
            guid,
            expected,
            actual: stored,
        });
    }

    let mut rest = &body[8..];
    // Every row takes at least one byte, so `rest.len()` bounds the allocation.
    let mut rows = Vec::with_capacity((stored as usize).min(rest.len()));
    for row in 0..stored {
        let (decoded, tail) =
            postcard::take_from_bytes::<R>(rest).map_err(|e| SphynxError::MalformedRow {
                guid,
                row,
                reason: e.to_string(),
            })?;
        rows.push(decoded);
        rest = tail;
    }
    if !rest.is_empty() {
        return Err(SphynxError::MalformedRow {
            guid,
            row: stored,
            reason: format!("{} trailing bytes", rest.len()),
        });
    }
    Ok(rows)
}

// =============================================================================
// TESTS
// =============================================================================
