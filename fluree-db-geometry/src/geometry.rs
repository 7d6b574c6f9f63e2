//! Geometry values.
//!
//! A [`Geometry`] wraps one engine-native geometry together with the factory
//! that owns it, its concrete kind, and (for collections) the manifest of
//! member kinds it was constructed from. `Line` and `LinearRing` members are
//! indistinguishable from line strings in the engine, so `geometry_n`
//! consults the manifest before inferring a kind from the native shape.
//!
//! Predicates go through the geometry's [`PreparedIndexCache`]; everything
//! else is a direct engine call. Operands owned by a different factory are
//! cast into this geometry's factory first.

use crate::cast::{self, CastOptions};
use crate::codec::OrdinateLayout;
use crate::config::FactoryConfig;
use crate::engine::{BinaryPredicate, ExtraOrdinate, NativeGeometry, OverlayOp, UnaryOp};
use crate::error::{GeometryError, Result};
use crate::factory::Factory;
use crate::kind::GeometryKind;
use crate::prepared::{PreparedIndexCache, PreparedStatus};
use crate::structure::Structure;
use geo_types::Geometry as GeoGeometry;
use rustc_hash::FxHasher;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;
use std::cell::Cell;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A geometry owned by a [`Factory`].
pub struct Geometry {
    factory: Factory,
    kind: GeometryKind,
    native: NativeGeometry,
    /// Member kinds as constructed; same length as the native members.
    manifest: Option<Vec<GeometryKind>>,
    prepared: PreparedIndexCache,
    hash_memo: Cell<Option<u64>>,
}

impl Geometry {
    pub(crate) fn from_parts(
        factory: Factory,
        kind: GeometryKind,
        native: NativeGeometry,
        manifest: Option<Vec<GeometryKind>>,
    ) -> Self {
        let prepared = PreparedIndexCache::new(factory.auto_prepare());
        Self {
            factory,
            kind,
            native,
            manifest,
            prepared,
            hash_memo: Cell::new(None),
        }
    }

    /// Result of an engine operation: kind inferred from the shape, no
    /// manifest, factory SRID stamped.
    fn produced(&self, mut native: NativeGeometry) -> Geometry {
        native.set_srid(self.factory.srid());
        let kind = GeometryKind::infer(native.shape());
        Geometry::from_parts(self.factory.clone(), kind, native, None)
    }

    /// A sub-geometry sharing this geometry's factory.
    fn child(&self, kind: GeometryKind, native: NativeGeometry) -> Geometry {
        Geometry::from_parts(self.factory.clone(), kind, native, None)
    }

    /// Same native data owned by another factory. Used by cast optimizers.
    pub(crate) fn reassigned(&self, factory: &Factory, kind: GeometryKind) -> Geometry {
        let mut native = self.native.clone();
        native.set_srid(factory.srid());
        let manifest = if kind == self.kind {
            self.manifest.clone()
        } else {
            None
        };
        Geometry::from_parts(factory.clone(), kind, native, manifest)
    }

    /// Kind recorded at construction, which may be a subtype of what the
    /// shape alone suggests (a `Line` stored as a line string).
    pub fn kind(&self) -> GeometryKind {
        self.kind
    }

    /// The factory that built this geometry.
    pub fn factory(&self) -> &Factory {
        &self.factory
    }

    /// Engine representation: planar shape plus extra ordinate values.
    pub fn native(&self) -> &NativeGeometry {
        &self.native
    }

    /// Planar shape, without extra ordinates.
    pub fn shape(&self) -> &GeoGeometry<f64> {
        self.native.shape()
    }

    /// SRID tag stored on the native geometry.
    pub fn srid(&self) -> i32 {
        self.native.srid()
    }

    /// Member kinds recorded at construction, for collections.
    pub fn manifest(&self) -> Option<&[GeometryKind]> {
        self.manifest.as_deref()
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    fn point_coord(&self) -> Option<crate::structure::Coord4> {
        match (self.kind, self.native.shape()) {
            (GeometryKind::Point, GeoGeometry::Point(_)) => self.native.coords().first().copied(),
            _ => None,
        }
    }

    /// X of a point; `None` for other kinds.
    pub fn x(&self) -> Option<f64> {
        self.point_coord().map(|c| c.x)
    }

    pub fn y(&self) -> Option<f64> {
        self.point_coord().map(|c| c.y)
    }

    /// Z of a point, when the factory carries Z.
    pub fn z(&self) -> Option<f64> {
        self.point_coord().and_then(|c| c.z)
    }

    /// M of a point, when the factory carries M.
    pub fn m(&self) -> Option<f64> {
        self.point_coord().and_then(|c| c.m)
    }

    /// Total number of vertices.
    pub fn num_points(&self) -> usize {
        self.native.vertex_count()
    }

    /// Vertex `n` of a line string kind, as a point.
    pub fn point_n(&self, n: usize) -> Result<Geometry> {
        if !self.kind.is_line_string_family() {
            return Err(GeometryError::invalid(format!(
                "point_n is not defined on a {}",
                self.kind
            )));
        }
        let native = take_nth(self.native.vertices(), n, "point")?;
        Ok(self.child(GeometryKind::Point, native))
    }

    fn rings(&self) -> Result<Vec<NativeGeometry>> {
        if self.kind != GeometryKind::Polygon {
            return Err(GeometryError::invalid(format!("rings are not defined on a {}", self.kind)));
        }
        Ok(self.native.rings())
    }

    pub fn exterior_ring(&self) -> Result<Geometry> {
        let native = take_nth(self.rings()?, 0, "ring")?;
        Ok(self.child(GeometryKind::LinearRing, native))
    }

    pub fn num_interior_rings(&self) -> usize {
        self.rings().map_or(0, |rings| rings.len().saturating_sub(1))
    }

    pub fn interior_ring_n(&self, n: usize) -> Result<Geometry> {
        let native = take_nth(self.rings()?, n + 1, "ring")?;
        Ok(self.child(GeometryKind::LinearRing, native))
    }

    /// Number of members; 1 for non-collections.
    pub fn num_geometries(&self) -> usize {
        if self.kind.is_collection() {
            self.native.members().len()
        } else {
            1
        }
    }

    /// Member `n` of a collection, with the kind it was constructed as.
    /// For non-collections, `geometry_n(0)` is the geometry itself.
    pub fn geometry_n(&self, n: usize) -> Result<Geometry> {
        if !self.kind.is_collection() {
            return match n {
                0 => Ok(self.clone()),
                _ => Err(GeometryError::invalid(format!(
                    "{} has a single geometry, index {} requested",
                    self.kind, n
                ))),
            };
        }
        let native = take_nth(self.native.members(), n, "member")?;
        let kind = self
            .manifest
            .as_ref()
            .and_then(|manifest| manifest.get(n).copied())
            .unwrap_or_else(|| GeometryKind::infer(native.shape()));
        Ok(self.child(kind, native))
    }

    pub fn is_empty(&self) -> bool {
        self.native.vertex_count() == 0
    }

    /// Topological dimension; -1 when empty.
    pub fn dimension(&self) -> i8 {
        self.native.dimension()
    }

    /// Whether every line string in the geometry ends where it starts.
    /// Points and polygons are closed.
    pub fn is_closed(&self) -> bool {
        match self.native.shape() {
            GeoGeometry::LineString(ls) => ls.is_closed(),
            GeoGeometry::MultiLineString(mls) => mls.0.iter().all(|ls| ls.is_closed()),
            GeoGeometry::GeometryCollection(_) => self
                .native
                .members()
                .iter()
                .all(|m| !matches!(m.shape(), GeoGeometry::LineString(ls) if !ls.is_closed())),
            _ => true,
        }
    }

    // ========================================================================
    // Predicates
    // ========================================================================

    /// Bring `other` into this geometry's factory when it belongs elsewhere.
    fn operand<'a>(&self, other: &'a Geometry) -> Result<Cow<'a, Geometry>> {
        if other.factory == self.factory {
            return Ok(Cow::Borrowed(other));
        }
        let options = CastOptions::new().with_keep_subtype(true);
        cast::cast_plain(other, &self.factory, options).map(Cow::Owned)
    }

    fn predicate(&self, predicate: BinaryPredicate, other: &Geometry) -> Result<bool> {
        let other = self.operand(other)?;
        self.prepared.evaluate(
            predicate,
            &self.native,
            &other.native,
            self.factory.engine(),
            &self.factory.capabilities(),
        )
    }

    /// Geometric (topological) equality.
    pub fn equals(&self, other: &Geometry) -> Result<bool> {
        self.predicate(BinaryPredicate::Equals, other)
    }

    pub fn disjoint(&self, other: &Geometry) -> Result<bool> {
        self.predicate(BinaryPredicate::Disjoint, other)
    }

    pub fn intersects(&self, other: &Geometry) -> Result<bool> {
        self.predicate(BinaryPredicate::Intersects, other)
    }

    pub fn touches(&self, other: &Geometry) -> Result<bool> {
        self.predicate(BinaryPredicate::Touches, other)
    }

    pub fn crosses(&self, other: &Geometry) -> Result<bool> {
        self.predicate(BinaryPredicate::Crosses, other)
    }

    pub fn within(&self, other: &Geometry) -> Result<bool> {
        self.predicate(BinaryPredicate::Within, other)
    }

    pub fn contains(&self, other: &Geometry) -> Result<bool> {
        self.predicate(BinaryPredicate::Contains, other)
    }

    pub fn overlaps(&self, other: &Geometry) -> Result<bool> {
        self.predicate(BinaryPredicate::Overlaps, other)
    }

    /// DE-9IM intersection matrix, e.g. `"212101212"`.
    pub fn relate(&self, other: &Geometry) -> Result<String> {
        let other = self.operand(other)?;
        self.factory.engine().relate(&self.native, &other.native)
    }

    /// Match the DE-9IM matrix against a pattern such as `"T*F**F***"`.
    pub fn relate_pattern(&self, other: &Geometry, pattern: &str) -> Result<bool> {
        let other = self.operand(other)?;
        self.factory
            .engine()
            .relate_pattern(&self.native, &other.native, pattern)
    }

    // ========================================================================
    // Scalars
    // ========================================================================

    pub fn distance(&self, other: &Geometry) -> Result<f64> {
        let other = self.operand(other)?;
        self.factory.engine().distance(&self.native, &other.native)
    }

    pub fn area(&self) -> Result<f64> {
        self.factory.engine().area(&self.native)
    }

    pub fn length(&self) -> Result<f64> {
        self.factory.engine().length(&self.native)
    }

    // ========================================================================
    // Producers
    // ========================================================================

    fn unary(&self, op: UnaryOp) -> Result<Geometry> {
        let native = self.factory.engine().unary(op, &self.native)?;
        Ok(self.produced(native))
    }

    pub fn envelope(&self) -> Result<Geometry> {
        self.unary(UnaryOp::Envelope)
    }

    pub fn boundary(&self) -> Result<Geometry> {
        self.unary(UnaryOp::Boundary)
    }

    pub fn convex_hull(&self) -> Result<Geometry> {
        self.unary(UnaryOp::ConvexHull)
    }

    /// Buffer using the factory's buffer resolution.
    pub fn buffer(&self, distance: f64) -> Result<Geometry> {
        let native = self.factory.engine().buffer(
            &self.native,
            distance,
            self.factory.buffer_resolution(),
        )?;
        Ok(self.produced(native))
    }

    fn overlay(&self, op: OverlayOp, other: &Geometry) -> Result<Geometry> {
        let other = self.operand(other)?;
        let native = self
            .factory
            .engine()
            .overlay(op, &self.native, &other.native)?;
        Ok(self.produced(native))
    }

    pub fn intersection(&self, other: &Geometry) -> Result<Geometry> {
        self.overlay(OverlayOp::Intersection, other)
    }

    pub fn union(&self, other: &Geometry) -> Result<Geometry> {
        self.overlay(OverlayOp::Union, other)
    }

    pub fn difference(&self, other: &Geometry) -> Result<Geometry> {
        self.overlay(OverlayOp::Difference, other)
    }

    pub fn sym_difference(&self, other: &Geometry) -> Result<Geometry> {
        self.overlay(OverlayOp::SymDifference, other)
    }

    // ========================================================================
    // Representation
    // ========================================================================

    /// Same kind, same coordinates and extra ordinates. Factories and SRID
    /// tags are not compared.
    pub fn rep_equals(&self, other: &Geometry) -> bool {
        self.kind == other.kind && self.native.rep_equals(&other.native)
    }

    /// Memoized hash of the representation.
    pub fn rep_hash(&self) -> u64 {
        if let Some(hash) = self.hash_memo.get() {
            return hash;
        }
        let mut hasher = FxHasher::default();
        hasher.write_u8(self.kind as u8);
        self.native.hash_into(&mut hasher);
        let hash = hasher.finish();
        self.hash_memo.set(Some(hash));
        hash
    }

    /// Lower into a coordinate tree, keeping constructed member kinds.
    pub fn to_structure(&self) -> Structure {
        self.native.to_structure(self.manifest.as_deref())
    }

    pub(crate) fn lowered(&self) -> (GeometryKind, Structure) {
        (self.kind, self.to_structure())
    }

    /// WKT through the factory's codec.
    pub fn as_text(&self) -> String {
        let layout = OrdinateLayout::for_extra(self.factory.extra_ordinate());
        self.factory
            .codec()
            .generate(self.kind, &self.to_structure(), layout, self.srid())
    }

    // ========================================================================
    // Prepared state
    // ========================================================================

    /// Build the prepared index now instead of waiting for repeated queries.
    pub fn prepare(&self) -> Result<()> {
        self.prepared.prepare(
            &self.native,
            self.factory.engine(),
            &self.factory.capabilities(),
        )
    }

    pub fn is_prepared(&self) -> bool {
        self.prepared.is_prepared()
    }

    pub fn prepared_status(&self) -> PreparedStatus {
        self.prepared.status()
    }

    pub(crate) fn has_extra(&self, extra: ExtraOrdinate) -> bool {
        self.native.extra() == extra
    }
}

fn take_nth(mut parts: Vec<NativeGeometry>, n: usize, what: &str) -> Result<NativeGeometry> {
    let len = parts.len();
    if n >= len {
        return Err(GeometryError::invalid(format!(
            "{} index {} out of range ({} available)",
            what, n, len
        )));
    }
    Ok(parts.swap_remove(n))
}

/// Replace the member kinds of a parsed collection with a manifest.
pub(crate) fn apply_manifest(structure: &mut Structure, manifest: &[GeometryKind]) {
    if let Structure::Collection(members) = structure {
        for ((kind, _), recorded) in members.iter_mut().zip(manifest) {
            *kind = *recorded;
        }
    }
}

/// Cloning never copies a built prepared index; the clone starts from the
/// factory's initial prepared state.
impl Clone for Geometry {
    fn clone(&self) -> Self {
        let clone = Geometry::from_parts(
            self.factory.clone(),
            self.kind,
            self.native.clone(),
            self.manifest.clone(),
        );
        clone.hash_memo.set(self.hash_memo.get());
        clone
    }
}

impl PartialEq for Geometry {
    fn eq(&self, other: &Self) -> bool {
        self.rep_equals(other)
    }
}

impl Eq for Geometry {}

impl Hash for Geometry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.rep_hash());
    }
}

impl fmt::Debug for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Geometry")
            .field("kind", &self.kind)
            .field("srid", &self.srid())
            .field("extra", &self.native.extra())
            .field("prepared", &self.prepared.status())
            .field("shape", self.native.shape())
            .finish()
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

/// Serialized form: the owning factory's config plus WKT. Engine internals
/// are never serialized.
#[derive(Serialize, Deserialize)]
pub(crate) struct GeometryRepr {
    pub factory: FactoryConfig,
    pub kind: GeometryKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<Vec<GeometryKind>>,
    pub wkt: String,
}

impl Serialize for Geometry {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let layout = OrdinateLayout::for_extra(self.factory.extra_ordinate());
        GeometryRepr {
            factory: self.factory.config().clone(),
            kind: self.kind,
            manifest: self.manifest.clone(),
            wkt: crate::codec::WktCodec::default().generate(
                self.kind,
                &self.to_structure(),
                layout,
                0,
            ),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Geometry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let repr = GeometryRepr::deserialize(deserializer)?;
        let factory = Factory::new(repr.factory).map_err(serde::de::Error::custom)?;
        let parsed = crate::codec::WktCodec::default()
            .parse(&repr.wkt)
            .map_err(serde::de::Error::custom)?;
        let mut structure = parsed
            .structure
            .convert(parsed.kind, repr.kind)
            .map_err(serde::de::Error::custom)?;
        if let Some(manifest) = &repr.manifest {
            apply_manifest(&mut structure, manifest);
        }
        factory
            .build(repr.kind, structure)
            .map_err(serde::de::Error::custom)
    }
}
