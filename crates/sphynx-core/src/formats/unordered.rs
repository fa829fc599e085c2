//! # Unordered Layout
//!
//! Staging rows keyed by external ids, as kept under `unordered_data_dir`.
//! This is the exchange form for data that has not been assigned canonical
//! positions yet:
//!
//! - vertex rows: external ids, any order
//! - edge rows: `id` is the edge id; `src`/`dst` are external vertex ids
//! - attribute rows: `id` is the external vertex id of a defined value
//!
//! Importing assigns positions: vertex sets are sorted by external id, edge
//! bundles by edge id, and endpoints and attribute rows are placed through
//! the referenced vertex set's inverse map.

use super::ordered::{Encoded, resolved_size};
use super::{
    AttributeRow, EdgeRow, Manifest, SingleDoubleAttributeRow, SingleDoubleTuple2AttributeRow,
    SingleStringAttributeRow, VertexRow, VertexSetRef, decode_rows, encode_rows,
};
use crate::entity::{Attribute, EdgeBundle, Entity, VertexSet};
use crate::{EntityKind, Guid, SphynxError};
use std::sync::Arc;

// =============================================================================
// EXPORT
// =============================================================================

/// Encode `entity` with every position replaced by its external id.
pub fn encode<F>(guid: Guid, entity: &Entity, resolve: F) -> Result<Encoded, SphynxError>
where
    F: Fn(&Guid) -> Result<Arc<VertexSet>, SphynxError>,
{
    let (references, row_count, rows) = match entity {
        Entity::VertexSet(vs) => {
            let rows: Vec<VertexRow> = vs.mapping().iter().map(|&id| VertexRow { id }).collect();
            (Vec::new(), rows.len(), encode_rows(&rows)?)
        }
        Entity::EdgeBundle(eb) => {
            let src_set = resolve(&eb.src_vertex_set)?;
            let dst_set = resolve(&eb.dst_vertex_set)?;
            let rows: Vec<EdgeRow> = eb
                .iter()
                .map(|(src, dst, id)| EdgeRow {
                    id,
                    src: src_set.mapping()[src],
                    dst: dst_set.mapping()[dst],
                })
                .collect();
            let references = vec![
                VertexSetRef {
                    guid: eb.src_vertex_set,
                    size: src_set.len() as u64,
                },
                VertexSetRef {
                    guid: eb.dst_vertex_set,
                    size: dst_set.len() as u64,
                },
            ];
            (references, rows.len(), encode_rows(&rows)?)
        }
        Entity::DoubleAttribute(a) => export_attribute::<SingleDoubleAttributeRow, _>(a, &resolve)?,
        Entity::StringAttribute(a) => export_attribute::<SingleStringAttributeRow, _>(a, &resolve)?,
        Entity::DoubleTuple2Attribute(a) => {
            export_attribute::<SingleDoubleTuple2AttributeRow, _>(a, &resolve)?
        }
    };

    Ok(Encoded {
        manifest: Manifest {
            guid,
            kind: entity.kind(),
            row_count: row_count as u64,
            references,
        },
        rows,
    })
}

fn export_attribute<R, F>(
    attribute: &Attribute<R::Value>,
    resolve: &F,
) -> Result<(Vec<VertexSetRef>, usize, Vec<u8>), SphynxError>
where
    R: AttributeRow,
    F: Fn(&Guid) -> Result<Arc<VertexSet>, SphynxError>,
{
    let vs = resolve(&attribute.vertex_set)?;
    let rows: Vec<R> = attribute
        .iter_defined()
        .map(|(position, value)| R::from_parts(vs.mapping()[position], value))
        .collect();
    let references = vec![VertexSetRef {
        guid: attribute.vertex_set,
        size: vs.len() as u64,
    }];
    Ok((references, rows.len(), encode_rows(&rows)?))
}

// =============================================================================
// IMPORT
// =============================================================================

/// Decode unordered rows and assign canonical positions.
pub fn decode<F>(manifest: &Manifest, rows: &[u8], resolve: F) -> Result<Entity, SphynxError>
where
    F: Fn(&Guid) -> Result<Arc<VertexSet>, SphynxError>,
{
    let guid = manifest.guid;
    let expected = manifest.row_count;

    let entity = match manifest.kind {
        EntityKind::VertexSet => {
            let rows: Vec<VertexRow> = decode_rows(rows, guid, expected)?;
            let mut mapping: Vec<i64> = rows.into_iter().map(|r| r.id).collect();
            mapping.sort_unstable();
            if let Some(pair) = mapping.windows(2).find(|w| w[0] == w[1]) {
                return Err(SphynxError::DuplicateExternalId {
                    guid,
                    external_id: pair[0],
                });
            }
            VertexSet::new(mapping).into()
        }
        EntityKind::EdgeBundle => {
            let src_ref = manifest.reference(0)?;
            let dst_ref = manifest.reference(1)?;
            resolved_size(guid, src_ref, &resolve)?;
            resolved_size(guid, dst_ref, &resolve)?;
            let src_set = resolve(&src_ref.guid)?;
            let dst_set = resolve(&dst_ref.guid)?;

            let rows: Vec<EdgeRow> = decode_rows(rows, guid, expected)?;
            let mut edges = Vec::with_capacity(rows.len());
            for (row, edge) in rows.into_iter().enumerate() {
                let src = locate(guid, row, &src_set, edge.src)?;
                let dst = locate(guid, row, &dst_set, edge.dst)?;
                edges.push((edge.id, src, dst));
            }
            edges.sort_by_key(|&(id, _, _)| id);

            let edge_mapping = edges.iter().map(|e| e.0).collect();
            let src = edges.iter().map(|e| e.1).collect();
            let dst = edges.iter().map(|e| e.2).collect();
            EdgeBundle::between(src_ref.guid, dst_ref.guid, src, dst, edge_mapping).into()
        }
        EntityKind::DoubleAttribute => {
            import_attribute::<SingleDoubleAttributeRow, _>(manifest, rows, &resolve)?.into()
        }
        EntityKind::StringAttribute => {
            import_attribute::<SingleStringAttributeRow, _>(manifest, rows, &resolve)?.into()
        }
        EntityKind::DoubleTuple2Attribute => {
            import_attribute::<SingleDoubleTuple2AttributeRow, _>(manifest, rows, &resolve)?.into()
        }
    };
    Ok(entity)
}

fn import_attribute<R, F>(
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
    let vs = resolve(&vs_ref.guid)?;
    let rows: Vec<R> = decode_rows(bytes, guid, manifest.row_count)?;

    let mut values = vec![R::Value::default(); size];
    let mut defined = vec![false; size];
    for (row, record) in rows.into_iter().enumerate() {
        let (id, value) = record.into_parts();
        let position = locate(guid, row, &vs, id)?;
        if defined[position] {
            return Err(SphynxError::DuplicatePosition {
                guid,
                row: row as u64,
                position: position as i64,
            });
        }
        values[position] = value;
        defined[position] = true;
    }
    Ok(Attribute::new(vs_ref.guid, values, defined))
}

fn locate(guid: Guid, row: usize, vs: &VertexSet, external_id: i64) -> Result<usize, SphynxError> {
    vs.position_of(external_id)
        .ok_or(SphynxError::UnknownExternalId {
            guid,
            row: row as u64,
            external_id,
        })
}

// =============================================================================
// TESTS
// =============================================================================
