//! # Ordered Layout
//!
//! Rows in canonical position order, as kept under `data_dir`.
//!
//! - vertex rows: `id` is the external id; row `i` is position `i`
//! - edge rows: `id` is the original edge id; `src`/`dst` are positions
//! - attribute rows: `id` is the position; only defined positions are
//!   written, in strictly increasing order
//!
//! Decoding never pads or truncates: any position that is negative, too
//! large, repeated or out of order fails the whole entity.

use super::{
    AttributeRow, EdgeRow, Manifest, SingleDoubleAttributeRow, SingleDoubleTuple2AttributeRow,
    SingleStringAttributeRow, VertexRow, VertexSetRef, decode_rows, encode_rows,
};
use crate::entity::{Attribute, EdgeBundle, Entity, VertexSet};
use crate::{Guid, SphynxError};
use std::sync::Arc;

/// Manifest plus row-file bytes for one entity.
#[derive(Debug, Clone)]
pub struct Encoded {
    pub manifest: Manifest,
    pub rows: Vec<u8>,
}

// =============================================================================
// ENCODE
// =============================================================================

/// Encode `entity` in ordered layout.
///
/// `resolve` supplies the vertex sets an edge bundle points into, so their
/// sizes can be recorded in the manifest.
pub fn encode<F>(guid: Guid, entity: &Entity, resolve: F) -> Result<Encoded, SphynxError>
where
    F: Fn(&Guid) -> Result<Arc<VertexSet>, SphynxError>,
{
    let (references, rows) = match entity {
        Entity::VertexSet(vs) => {
            let rows: Vec<VertexRow> = vs.mapping().iter().map(|&id| VertexRow { id }).collect();
            (Vec::new(), encode_rows(&rows)?)
        }
        Entity::EdgeBundle(eb) => {
            let references = vec![
                reference(eb.src_vertex_set, &resolve)?,
                reference(eb.dst_vertex_set, &resolve)?,
            ];
            let rows: Vec<EdgeRow> = eb
                .iter()
                .map(|(src, dst, id)| EdgeRow {
                    id,
                    src: src as i64,
                    dst: dst as i64,
                })
                .collect();
            (references, encode_rows(&rows)?)
        }
        Entity::DoubleAttribute(a) => encode_attribute::<SingleDoubleAttributeRow>(a)?,
        Entity::StringAttribute(a) => encode_attribute::<SingleStringAttributeRow>(a)?,
        Entity::DoubleTuple2Attribute(a) => encode_attribute::<SingleDoubleTuple2AttributeRow>(a)?,
    };

    let row_count = match entity {
        Entity::DoubleAttribute(a) => a.defined_count(),
        Entity::StringAttribute(a) => a.defined_count(),
        Entity::DoubleTuple2Attribute(a) => a.defined_count(),
        other => other.len(),
    } as u64;

    Ok(Encoded {
        manifest: Manifest {
            guid,
            kind: entity.kind(),
            row_count,
            references,
        },
        rows,
    })
}

fn reference<F>(guid: Guid, resolve: &F) -> Result<VertexSetRef, SphynxError>
where
    F: Fn(&Guid) -> Result<Arc<VertexSet>, SphynxError>,
{
    Ok(VertexSetRef {
        guid,
        size: resolve(&guid)?.len() as u64,
    })
}

fn encode_attribute<R: AttributeRow>(
    attribute: &Attribute<R::Value>,
) -> Result<(Vec<VertexSetRef>, Vec<u8>), SphynxError> {
    let references = vec![VertexSetRef {
        guid: attribute.vertex_set,
        size: attribute.len() as u64,
    }];
    let rows: Vec<R> = attribute
        .iter_defined()
        .map(|(position, value)| R::from_parts(position as i64, value))
        .collect();
    Ok((references, encode_rows(&rows)?))
}

// =============================================================================
// DECODE
// =============================================================================

/// Decode an ordered-layout entity described by `manifest`.
///
/// Every referenced vertex set is resolved and must still have the size the
/// manifest recorded.
pub fn decode<F>(manifest: &Manifest, rows: &[u8], resolve: F) -> Result<Entity, SphynxError>
where
    F: Fn(&Guid) -> Result<Arc<VertexSet>, SphynxError>,
{
    let guid = manifest.guid;
    let expected = manifest.row_count;

    let entity = match manifest.kind {
        crate::EntityKind::VertexSet => {
            let rows: Vec<VertexRow> = decode_rows(rows, guid, expected)?;
            VertexSet::new(rows.into_iter().map(|r| r.id).collect()).into()
        }
        crate::EntityKind::EdgeBundle => {
            let src_ref = manifest.reference(0)?;
            let dst_ref = manifest.reference(1)?;
            let src_size = resolved_size(guid, src_ref, &resolve)?;
            let dst_size = resolved_size(guid, dst_ref, &resolve)?;
            let rows: Vec<EdgeRow> = decode_rows(rows, guid, expected)?;

            let mut src = Vec::with_capacity(rows.len());
            let mut dst = Vec::with_capacity(rows.len());
            let mut edge_mapping = Vec::with_capacity(rows.len());
            for (index, row) in rows.into_iter().enumerate() {
                src.push(to_position(guid, "src", index, row.src, src_size)?);
                dst.push(to_position(guid, "dst", index, row.dst, dst_size)?);
                edge_mapping.push(row.id);
            }
            EdgeBundle::between(src_ref.guid, dst_ref.guid, src, dst, edge_mapping).into()
        }
        crate::EntityKind::DoubleAttribute => {
            decode_attribute::<SingleDoubleAttributeRow, _>(manifest, rows, &resolve)?.into()
        }
        crate::EntityKind::StringAttribute => {
            decode_attribute::<SingleStringAttributeRow, _>(manifest, rows, &resolve)?.into()
        }
        crate::EntityKind::DoubleTuple2Attribute => {
            decode_attribute::<SingleDoubleTuple2AttributeRow, _>(manifest, rows, &resolve)?.into()
        }
    };
    Ok(entity)
}

fn decode_attribute<R, F>(
    manifest: &Manifest,
    bytes: &[u8],
    resolve: &F,
) -> Result<Attribute<R::Value>, SphynxError>
where
    R: AttributeRow,
    F: Fn(&Guid) -> Result<Arc<VertexSet>, SphynxError>,
{
    let guid = manifest.guid;
    let vs_ref = manifest.reference(0)?;
    let size = resolved_size(guid, vs_ref, resolve)?;
    let rows: Vec<R> = decode_rows(bytes, guid, manifest.row_count)?;

    let mut values = vec![R::Value::default(); size];
    let mut defined = vec![false; size];
    let mut previous: Option<i64> = None;
    for (index, row) in rows.into_iter().enumerate() {
        let (id, value) = row.into_parts();
        if let Some(previous) = previous {
            if id == previous {
                return Err(SphynxError::DuplicatePosition {
                    guid,
                    row: index as u64,
                    position: id,
                });
            }
            if id < previous {
                return Err(SphynxError::UnsortedPositions {
                    guid,
                    row: index as u64,
                    position: id,
                    previous,
                });
            }
        }
        let position = to_position(guid, "id", index, id, size)?;
        values[position] = value;
        defined[position] = true;
        previous = Some(id);
    }
    Ok(Attribute::new(vs_ref.guid, values, defined))
}

/// Size of the resolved vertex set, checked against the manifest.
pub(crate) fn resolved_size<F>(
    guid: Guid,
    reference: VertexSetRef,
    resolve: &F,
) -> Result<usize, SphynxError>
where
    F: Fn(&Guid) -> Result<Arc<VertexSet>, SphynxError>,
{
    let size = resolve(&reference.guid)?.len();
    if size as u64 != reference.size {
        return Err(SphynxError::LengthMismatch {
            guid,
            field: "vertex_set",
            expected: size,
            actual: reference.size as usize,
        });
    }
    Ok(size)
}

/// Convert a stored `int64` position into an index below `size`.
fn to_position(
    guid: Guid,
    field: &'static str,
    index: usize,
    position: i64,
    size: usize,
) -> Result<usize, SphynxError> {
    match usize::try_from(position) {
        Ok(p) if p < size => Ok(p),
        _ => Err(SphynxError::PositionOutOfRange {
            guid,
            field,
            index,
            position,
            size,
        }),
    }
}

// =============================================================================
// TESTS
// =============================================================================
