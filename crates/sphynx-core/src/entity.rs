//! # Graph Entities
//!
//! The five entity kinds held by the store and the rules that tie them
//! together:
//!
//! - A [`VertexSet`] defines a position space `0..n`. Positions are stable for
//!   the lifetime of the set.
//! - An [`EdgeBundle`] stores endpoints as positions into a source and a
//!   destination vertex set.
//! - An [`Attribute`] column stores one value per position plus a `defined`
//!   bitmap.
//!
//! Entities refer to each other by [`Guid`] only. Resolving a reference always
//! goes through the store, so an entity can never outlive or shadow the
//! vertex set it was validated against.

use crate::{EntityKind, Guid, SphynxError};
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

// =============================================================================
// VERTEX SET
// =============================================================================

/// Canonical ordered position space for a group of vertices.
///
/// `mapping[position]` is the external id of the vertex at `position`. The
/// inverse map is built on first use and cached; the set itself never
/// changes after construction.
#[derive(Debug, Clone, Default)]
pub struct VertexSet {
    mapping: Vec<i64>,
    inverse: OnceLock<BTreeMap<i64, usize>>,
}

impl VertexSet {
    /// Create a vertex set from external ids in position order.
    #[must_use]
    pub fn new(mapping: Vec<i64>) -> Self {
        Self {
            mapping,
            inverse: OnceLock::new(),
        }
    }

    /// External ids in position order.
    #[must_use]
    pub fn mapping(&self) -> &[i64] {
        &self.mapping
    }

    /// Number of vertices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    /// True when the set has no vertices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }

    /// External id at `position`.
    #[must_use]
    pub fn external_id(&self, position: usize) -> Option<i64> {
        self.mapping.get(position).copied()
    }

    /// Position of `external_id`, via the cached inverse map.
    #[must_use]
    pub fn position_of(&self, external_id: i64) -> Option<usize> {
        self.inverse().get(&external_id).copied()
    }

    fn inverse(&self) -> &BTreeMap<i64, usize> {
        self.inverse.get_or_init(|| {
            self.mapping
                .iter()
                .enumerate()
                .map(|(position, &id)| (id, position))
                .collect()
        })
    }

    /// Check that no two positions share an external id.
    ///
    /// On success the inverse map is cached as a side effect.
    pub fn validate(&self, guid: Guid) -> Result<(), SphynxError> {
        let mut inverse = BTreeMap::new();
        for (position, &id) in self.mapping.iter().enumerate() {
            if inverse.insert(id, position).is_some() {
                return Err(SphynxError::DuplicateExternalId {
                    guid,
                    external_id: id,
                });
            }
        }
        let _ = self.inverse.set(inverse);
        Ok(())
    }
}

impl PartialEq for VertexSet {
    fn eq(&self, other: &Self) -> bool {
        self.mapping == other.mapping
    }
}

impl Eq for VertexSet {}

// =============================================================================
// EDGE BUNDLE
// =============================================================================

/// Ordered edges between two vertex sets, in position space.
///
/// `src`, `dst` and `edge_mapping` are parallel: edge `i` goes from
/// `src[i]` (a position in `src_vertex_set`) to `dst[i]` (a position in
/// `dst_vertex_set`) and has original id `edge_mapping[i]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeBundle {
    pub src: Vec<usize>,
    pub dst: Vec<usize>,
    pub edge_mapping: Vec<i64>,
    pub src_vertex_set: Guid,
    pub dst_vertex_set: Guid,
}

impl EdgeBundle {
    /// Edges whose endpoints both live in `vertex_set`.
    #[must_use]
    pub fn new(vertex_set: Guid, src: Vec<usize>, dst: Vec<usize>, edge_mapping: Vec<i64>) -> Self {
        Self::between(vertex_set, vertex_set, src, dst, edge_mapping)
    }

    /// Edges from `src_vertex_set` to `dst_vertex_set`.
    #[must_use]
    pub fn between(
        src_vertex_set: Guid,
        dst_vertex_set: Guid,
        src: Vec<usize>,
        dst: Vec<usize>,
        edge_mapping: Vec<i64>,
    ) -> Self {
        Self {
            src,
            dst,
            edge_mapping,
            src_vertex_set,
            dst_vertex_set,
        }
    }

    /// Number of edges.
    #[must_use]
    pub fn len(&self) -> usize {
        self.edge_mapping.len()
    }

    /// True when the bundle has no edges.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edge_mapping.is_empty()
    }

    /// True when source and destination share one vertex set.
    #[must_use]
    pub fn is_homogeneous(&self) -> bool {
        self.src_vertex_set == self.dst_vertex_set
    }

    /// Iterate `(src, dst, edge_id)` triples in edge order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, i64)> + '_ {
        self.src
            .iter()
            .zip(&self.dst)
            .zip(&self.edge_mapping)
            .map(|((&s, &d), &id)| (s, d, id))
    }

    /// Check parallel lengths and endpoint ranges.
    pub fn validate(
        &self,
        guid: Guid,
        src_set: &VertexSet,
        dst_set: &VertexSet,
    ) -> Result<(), SphynxError> {
        let count = self.edge_mapping.len();
        check_len(guid, "src", count, self.src.len())?;
        check_len(guid, "dst", count, self.dst.len())?;
        check_positions(guid, "src", &self.src, src_set.len())?;
        check_positions(guid, "dst", &self.dst, dst_set.len())
    }
}

// =============================================================================
// ATTRIBUTE COLUMNS
// =============================================================================

/// A value type that can live in an attribute column.
///
/// `same_value` is content equality: doubles compare by bit pattern so `NaN`
/// and `-0.0` round-trip and compare faithfully.
pub trait ColumnValue: Clone + Default + std::fmt::Debug + Send + Sync + 'static {
    /// The entity kind of a column of this value type.
    const KIND: EntityKind;

    /// Bit-exact content equality.
    fn same_value(&self, other: &Self) -> bool;

    /// The column held by `entity`, if it is a column of this value type.
    fn column(entity: &Entity) -> Option<&Arc<Attribute<Self>>>;
}

impl ColumnValue for f64 {
    const KIND: EntityKind = EntityKind::DoubleAttribute;

    fn same_value(&self, other: &Self) -> bool {
        self.to_bits() == other.to_bits()
    }

    fn column(entity: &Entity) -> Option<&Arc<Attribute<Self>>> {
        match entity {
            Entity::DoubleAttribute(a) => Some(a),
            _ => None,
        }
    }
}

impl ColumnValue for String {
    const KIND: EntityKind = EntityKind::StringAttribute;

    fn same_value(&self, other: &Self) -> bool {
        self == other
    }

    fn column(entity: &Entity) -> Option<&Arc<Attribute<Self>>> {
        match entity {
            Entity::StringAttribute(a) => Some(a),
            _ => None,
        }
    }
}

impl ColumnValue for (f64, f64) {
    const KIND: EntityKind = EntityKind::DoubleTuple2Attribute;

    fn same_value(&self, other: &Self) -> bool {
        self.0.same_value(&other.0) && self.1.same_value(&other.1)
    }

    fn column(entity: &Entity) -> Option<&Arc<Attribute<Self>>> {
        match entity {
            Entity::DoubleTuple2Attribute(a) => Some(a),
            _ => None,
        }
    }
}

/// Per-position value column over a vertex set.
///
/// `values[i]` is meaningful only when `defined[i]` is true; otherwise it is a
/// placeholder (`T::default()` when built through [`Attribute::from_options`]).
#[derive(Debug, Clone)]
pub struct Attribute<T: ColumnValue> {
    pub values: Vec<T>,
    pub defined: Vec<bool>,
    pub vertex_set: Guid,
}

/// `f64` column.
pub type DoubleAttribute = Attribute<f64>;
/// UTF-8 string column.
pub type StringAttribute = Attribute<String>;
/// `(f64, f64)` column.
pub type DoubleTuple2Attribute = Attribute<(f64, f64)>;

impl<T: ColumnValue> Attribute<T> {
    /// Create a column from parallel values and definedness.
    #[must_use]
    pub fn new(vertex_set: Guid, values: Vec<T>, defined: Vec<bool>) -> Self {
        Self {
            values,
            defined,
            vertex_set,
        }
    }

    /// Create a fully defined column.
    #[must_use]
    pub fn dense(vertex_set: Guid, values: Vec<T>) -> Self {
        let defined = vec![true; values.len()];
        Self::new(vertex_set, values, defined)
    }

    /// Create a column from optional values; `None` becomes an undefined
    /// placeholder.
    #[must_use]
    pub fn from_options(vertex_set: Guid, values: Vec<Option<T>>) -> Self {
        let defined = values.iter().map(Option::is_some).collect();
        let values = values.into_iter().map(Option::unwrap_or_default).collect();
        Self::new(vertex_set, values, defined)
    }

    /// Column length (equals the vertex set size once validated).
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when the column is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at `position`, or `None` when undefined or out of range.
    #[must_use]
    pub fn get(&self, position: usize) -> Option<&T> {
        match self.defined.get(position) {
            Some(true) => self.values.get(position),
            _ => None,
        }
    }

    /// Number of defined positions.
    #[must_use]
    pub fn defined_count(&self) -> usize {
        self.defined.iter().filter(|&&d| d).count()
    }

    /// Iterate `(position, value)` for defined positions only.
    pub fn iter_defined(&self) -> impl Iterator<Item = (usize, &T)> + '_ {
        self.values
            .iter()
            .zip(&self.defined)
            .enumerate()
            .filter_map(|(position, (value, &defined))| defined.then_some((position, value)))
    }

    /// Check that both arrays align with the vertex set.
    pub fn validate(&self, guid: Guid, vertex_set: &VertexSet) -> Result<(), SphynxError> {
        check_len(guid, "values", vertex_set.len(), self.values.len())?;
        check_len(guid, "defined", vertex_set.len(), self.defined.len())
    }

    /// Content equality over defined positions; placeholders are ignored.
    #[must_use]
    pub fn same_content(&self, other: &Self) -> bool {
        self.vertex_set == other.vertex_set
            && self.defined == other.defined
            && self.values.len() == other.values.len()
            && self
                .iter_defined()
                .all(|(position, value)| value.same_value(&other.values[position]))
    }
}

// =============================================================================
// ENTITY
// =============================================================================

/// Any entity the store can hold.
///
/// Each variant shares its payload through an `Arc`, so cloning an `Entity`
/// never copies column data.
#[derive(Debug, Clone)]
pub enum Entity {
    VertexSet(Arc<VertexSet>),
    EdgeBundle(Arc<EdgeBundle>),
    DoubleAttribute(Arc<DoubleAttribute>),
    StringAttribute(Arc<StringAttribute>),
    DoubleTuple2Attribute(Arc<DoubleTuple2Attribute>),
}

impl Entity {
    /// The entity's kind tag.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        match self {
            Self::VertexSet(_) => EntityKind::VertexSet,
            Self::EdgeBundle(_) => EntityKind::EdgeBundle,
            Self::DoubleAttribute(_) => EntityKind::DoubleAttribute,
            Self::StringAttribute(_) => EntityKind::StringAttribute,
            Self::DoubleTuple2Attribute(_) => EntityKind::DoubleTuple2Attribute,
        }
    }

    /// Vertex count, edge count, or column length.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::VertexSet(vs) => vs.len(),
            Self::EdgeBundle(eb) => eb.len(),
            Self::DoubleAttribute(a) => a.len(),
            Self::StringAttribute(a) => a.len(),
            Self::DoubleTuple2Attribute(a) => a.len(),
        }
    }

    /// True when [`Entity::len`] is zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Vertex sets this entity refers to, deduplicated.
    #[must_use]
    pub fn references(&self) -> Vec<Guid> {
        match self {
            Self::VertexSet(_) => Vec::new(),
            Self::EdgeBundle(eb) if eb.is_homogeneous() => vec![eb.src_vertex_set],
            Self::EdgeBundle(eb) => vec![eb.src_vertex_set, eb.dst_vertex_set],
            Self::DoubleAttribute(a) => vec![a.vertex_set],
            Self::StringAttribute(a) => vec![a.vertex_set],
            Self::DoubleTuple2Attribute(a) => vec![a.vertex_set],
        }
    }

    /// Publication order: vertex sets before anything that refers to them.
    #[must_use]
    pub const fn publish_rank(&self) -> u8 {
        match self {
            Self::VertexSet(_) => 0,
            _ => 1,
        }
    }

    /// Validate against the vertex sets returned by `resolve`.
    pub fn validate<F>(&self, guid: Guid, resolve: F) -> Result<(), SphynxError>
    where
        F: Fn(&Guid) -> Result<Arc<VertexSet>, SphynxError>,
    {
        match self {
            Self::VertexSet(vs) => vs.validate(guid),
            Self::EdgeBundle(eb) => {
                let src = resolve(&eb.src_vertex_set)?;
                let dst = resolve(&eb.dst_vertex_set)?;
                eb.validate(guid, &src, &dst)
            }
            Self::DoubleAttribute(a) => {
                let vs = resolve(&a.vertex_set)?;
                a.validate(guid, &vs)
            }
            Self::StringAttribute(a) => {
                let vs = resolve(&a.vertex_set)?;
                a.validate(guid, &vs)
            }
            Self::DoubleTuple2Attribute(a) => {
                let vs = resolve(&a.vertex_set)?;
                a.validate(guid, &vs)
            }
        }
    }

    /// Content equality (bit-exact for doubles).
    #[must_use]
    pub fn same_content(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::VertexSet(a), Self::VertexSet(b)) => Arc::ptr_eq(a, b) || a == b,
            (Self::EdgeBundle(a), Self::EdgeBundle(b)) => Arc::ptr_eq(a, b) || a == b,
            (Self::DoubleAttribute(a), Self::DoubleAttribute(b)) => {
                Arc::ptr_eq(a, b) || a.same_content(b)
            }
            (Self::StringAttribute(a), Self::StringAttribute(b)) => {
                Arc::ptr_eq(a, b) || a.same_content(b)
            }
            (Self::DoubleTuple2Attribute(a), Self::DoubleTuple2Attribute(b)) => {
                Arc::ptr_eq(a, b) || a.same_content(b)
            }
            _ => false,
        }
    }
}

/// A concrete type that one [`Entity`] variant wraps.
pub trait EntityVariant: Sized {
    /// Kind tag of the wrapping variant.
    const KIND: EntityKind;

    /// Borrow the payload if `entity` is this variant.
    fn narrow(entity: &Entity) -> Option<&Arc<Self>>;
}

impl EntityVariant for VertexSet {
    const KIND: EntityKind = EntityKind::VertexSet;

    fn narrow(entity: &Entity) -> Option<&Arc<Self>> {
        match entity {
            Entity::VertexSet(vs) => Some(vs),
            _ => None,
        }
    }
}

impl EntityVariant for EdgeBundle {
    const KIND: EntityKind = EntityKind::EdgeBundle;

    fn narrow(entity: &Entity) -> Option<&Arc<Self>> {
        match entity {
            Entity::EdgeBundle(eb) => Some(eb),
            _ => None,
        }
    }
}

impl<T: ColumnValue> EntityVariant for Attribute<T> {
    const KIND: EntityKind = T::KIND;

    fn narrow(entity: &Entity) -> Option<&Arc<Self>> {
        T::column(entity)
    }
}

impl Entity {
    /// Shared handle to the payload, or `KindMismatch` naming `guid`.
    pub fn downcast<T: EntityVariant>(&self, guid: Guid) -> Result<Arc<T>, SphynxError> {
        T::narrow(self)
            .cloned()
            .ok_or(SphynxError::KindMismatch {
                guid,
                expected: T::KIND,
                found: self.kind(),
            })
    }
}

impl From<VertexSet> for Entity {
    fn from(vs: VertexSet) -> Self {
        Self::VertexSet(Arc::new(vs))
    }
}

impl From<EdgeBundle> for Entity {
    fn from(eb: EdgeBundle) -> Self {
        Self::EdgeBundle(Arc::new(eb))
    }
}

impl From<DoubleAttribute> for Entity {
    fn from(a: DoubleAttribute) -> Self {
        Self::DoubleAttribute(Arc::new(a))
    }
}

impl From<StringAttribute> for Entity {
    fn from(a: StringAttribute) -> Self {
        Self::StringAttribute(Arc::new(a))
    }
}

impl From<DoubleTuple2Attribute> for Entity {
    fn from(a: DoubleTuple2Attribute) -> Self {
        Self::DoubleTuple2Attribute(Arc::new(a))
    }
}

// =============================================================================
// VALIDATION HELPERS
// =============================================================================

fn check_len(
    guid: Guid,
    field: &'static str,
    expected: usize,
    actual: usize,
) -> Result<(), SphynxError> {
    if expected != actual {
        return Err(SphynxError::LengthMismatch {
            guid,
            field,
            expected,
            actual,
        });
    }
    Ok(())
}

fn check_positions(
    guid: Guid,
    field: &'static str,
    positions: &[usize],
    size: usize,
) -> Result<(), SphynxError> {
    match positions.iter().position(|&p| p >= size) {
        Some(index) => Err(SphynxError::PositionOutOfRange {
            guid,
            field,
            index,
            position: i64::try_from(positions[index]).unwrap_or(i64::MAX),
            size,
        }),
        None => Ok(()),
    }
}

// =============================================================================
// TESTS
// =============================================================================
