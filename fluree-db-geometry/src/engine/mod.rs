//! Geometry engine binding.
//!
//! Everything geometric (predicates, overlays, buffering, distance, prepared
//! indexes) is delegated to a [`GeometryEngine`]. The factory layer only
//! decides what to call and how results are cached, paired and routed.
//!
//! # Native geometries
//!
//! A [`NativeGeometry`] is the engine-side object: a planar `geo_types` shape,
//! at most one extra ordinate per vertex, and a mutable SRID tag. Extra
//! ordinate values are stored in vertex traversal order (the order of
//! `CoordsIter::coords_iter`), which is also the traversal order of
//! [`Structure`](crate::structure::Structure).

mod geo_engine;
mod overlay;
mod prepared_index;

pub use geo_engine::GeoEngine;
pub use prepared_index::SegmentIndex;

use crate::capability::{EngineCapabilities, PreparedTier};
use crate::error::{GeometryError, Result};
use crate::kind::GeometryKind;
use crate::structure::{Coord4, Structure};
use geo::CoordsIter;
use geo_types::{
    Coord, Geometry as GeoGeometry, GeometryCollection, LineString, MultiLineString, MultiPoint,
    MultiPolygon, Point, Polygon,
};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::hash::Hasher;

/// Which single extra ordinate a native geometry carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtraOrdinate {
    #[default]
    None,
    Z,
    M,
}

/// Binary predicates the engine evaluates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryPredicate {
    Equals,
    Disjoint,
    Intersects,
    Touches,
    Crosses,
    Within,
    Contains,
    Overlaps,
}

impl BinaryPredicate {
    /// Lowest acceleration tier that covers this predicate, if any.
    pub fn tier(&self) -> Option<PreparedTier> {
        match self {
            BinaryPredicate::Contains | BinaryPredicate::Intersects => Some(PreparedTier::Tier1),
            BinaryPredicate::Disjoint
            | BinaryPredicate::Touches
            | BinaryPredicate::Crosses
            | BinaryPredicate::Within
            | BinaryPredicate::Overlaps => Some(PreparedTier::Tier2),
            BinaryPredicate::Equals => None,
        }
    }
}

/// Single-input geometry producing operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Envelope,
    Boundary,
    ConvexHull,
}

/// Two-input overlay operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayOp {
    Intersection,
    Union,
    Difference,
    SymDifference,
}

/// The geometry computation engine.
pub trait GeometryEngine: Send + Sync + Debug {
    /// Acceleration capabilities of this build. Read once per factory.
    fn capabilities(&self) -> EngineCapabilities;

    /// Plain (unprepared) predicate evaluation.
    fn predicate(
        &self,
        predicate: BinaryPredicate,
        a: &NativeGeometry,
        b: &NativeGeometry,
    ) -> Result<bool>;

    /// Full DE-9IM intersection matrix as a 9-character string.
    fn relate(&self, a: &NativeGeometry, b: &NativeGeometry) -> Result<String>;

    /// Match the DE-9IM matrix of `a` and `b` against `pattern`.
    fn relate_pattern(&self, a: &NativeGeometry, b: &NativeGeometry, pattern: &str)
        -> Result<bool>;

    fn distance(&self, a: &NativeGeometry, b: &NativeGeometry) -> Result<f64>;

    fn area(&self, a: &NativeGeometry) -> Result<f64>;

    fn length(&self, a: &NativeGeometry) -> Result<f64>;

    fn unary(&self, op: UnaryOp, a: &NativeGeometry) -> Result<NativeGeometry>;

    /// Buffer by `distance`, approximating quarter circles with `resolution`
    /// segments.
    fn buffer(&self, a: &NativeGeometry, distance: f64, resolution: u32)
        -> Result<NativeGeometry>;

    fn overlay(&self, op: OverlayOp, a: &NativeGeometry, b: &NativeGeometry)
        -> Result<NativeGeometry>;

    /// Build a prepared index over a snapshot of `a`.
    fn prepare(&self, a: &NativeGeometry) -> Result<Box<dyn PreparedIndex>>;
}

/// Engine-side prepared index over one fixed geometry.
pub trait PreparedIndex: Send + Sync + Debug {
    /// Accelerated predicate evaluation with the indexed geometry as the
    /// left operand.
    fn evaluate(&self, predicate: BinaryPredicate, other: &NativeGeometry) -> Result<bool>;
}

/// Engine-native geometry object.
#[derive(Debug, Clone)]
pub struct NativeGeometry {
    shape: GeoGeometry<f64>,
    extra: ExtraOrdinate,
    values: Vec<f64>,
    srid: i32,
}

impl NativeGeometry {
    /// Wrap a shape with its extra ordinate values.
    ///
    /// `values` must hold one entry per vertex when `extra` is not `None`,
    /// and be empty otherwise. `Line`, `Rect` and `Triangle` shapes are
    /// normalized to line strings and polygons first.
    pub fn new(
        shape: GeoGeometry<f64>,
        extra: ExtraOrdinate,
        values: Vec<f64>,
        srid: i32,
    ) -> Result<Self> {
        let shape = normalize(shape);
        let expected = match extra {
            ExtraOrdinate::None => 0,
            ExtraOrdinate::Z | ExtraOrdinate::M => shape.coords_count(),
        };
        if values.len() != expected {
            return Err(GeometryError::engine(format!(
                "expected {} extra ordinate values, got {}",
                expected,
                values.len()
            )));
        }
        Ok(Self {
            shape,
            extra,
            values,
            srid,
        })
    }

    /// Build a native geometry of `kind` from a coordinate tree. Missing
    /// extra ordinates default to 0.
    pub fn from_structure(
        kind: GeometryKind,
        structure: &Structure,
        extra: ExtraOrdinate,
        srid: i32,
    ) -> Result<Self> {
        let shape = shape_of(kind, structure)?;
        let values = match extra {
            ExtraOrdinate::None => Vec::new(),
            ExtraOrdinate::Z => {
                let mut values = Vec::with_capacity(structure.coord_count());
                structure.for_each_coord(&mut |c| values.push(c.z.unwrap_or(0.0)));
                values
            }
            ExtraOrdinate::M => {
                let mut values = Vec::with_capacity(structure.coord_count());
                structure.for_each_coord(&mut |c| values.push(c.m.unwrap_or(0.0)));
                values
            }
        };
        Self::new(shape, extra, values, srid)
    }

    /// Build a result geometry whose extra ordinates are inherited from
    /// `sources` by matching X/Y; vertices with no match get 0.
    pub(crate) fn derived(shape: GeoGeometry<f64>, sources: &[&NativeGeometry]) -> Result<Self> {
        let (extra, srid) = sources
            .first()
            .map(|s| (s.extra, s.srid))
            .unwrap_or((ExtraOrdinate::None, 0));
        let shape = normalize(shape);
        let values = match extra {
            ExtraOrdinate::None => Vec::new(),
            ExtraOrdinate::Z | ExtraOrdinate::M => {
                let mut lookup: FxHashMap<(u64, u64), f64> = FxHashMap::default();
                for source in sources {
                    for (coord, value) in source.shape.coords_iter().zip(&source.values) {
                        lookup.entry(xy_key(coord)).or_insert(*value);
                    }
                }
                shape
                    .coords_iter()
                    .map(|c| lookup.get(&xy_key(c)).copied().unwrap_or(0.0))
                    .collect()
            }
        };
        Self::new(shape, extra, values, srid)
    }

    pub fn shape(&self) -> &GeoGeometry<f64> {
        &self.shape
    }

    pub fn extra(&self) -> ExtraOrdinate {
        self.extra
    }

    /// Extra ordinate values in vertex order.
    pub fn extra_values(&self) -> &[f64] {
        &self.values
    }

    pub fn srid(&self) -> i32 {
        self.srid
    }

    pub fn set_srid(&mut self, srid: i32) {
        self.srid = srid;
    }

    pub fn vertex_count(&self) -> usize {
        self.shape.coords_count()
    }

    /// Topological dimension; -1 when empty.
    pub fn dimension(&self) -> i8 {
        geo_engine::dimension(&self.shape)
    }

    /// Coordinates in vertex order with the extra ordinate filled in.
    pub fn coords(&self) -> Vec<Coord4> {
        self.shape
            .coords_iter()
            .enumerate()
            .map(|(i, c)| self.coord4(c, i))
            .collect()
    }

    /// Lower into a coordinate tree. `member_kinds` overrides the inferred
    /// kinds of top-level collection members.
    pub fn to_structure(&self, member_kinds: Option<&[GeometryKind]>) -> Structure {
        let mut index = 0;
        self.lower(&self.shape, &mut index, member_kinds)
    }

    fn lower(
        &self,
        shape: &GeoGeometry<f64>,
        index: &mut usize,
        member_kinds: Option<&[GeometryKind]>,
    ) -> Structure {
        let take_ring = |ls: &LineString<f64>, index: &mut usize| -> Vec<Coord4> {
            ls.0.iter()
                .map(|c| {
                    let coord = self.coord4(*c, *index);
                    *index += 1;
                    coord
                })
                .collect()
        };
        match shape {
            GeoGeometry::Point(p) => {
                let coord = self.coord4(p.0, *index);
                *index += 1;
                Structure::Point(coord)
            }
            GeoGeometry::LineString(ls) => Structure::LineString(take_ring(ls, index)),
            GeoGeometry::Polygon(poly) => {
                let mut rings = Vec::with_capacity(1 + poly.interiors().len());
                rings.push(take_ring(poly.exterior(), index));
                for interior in poly.interiors() {
                    rings.push(take_ring(interior, index));
                }
                Structure::Polygon(rings)
            }
            GeoGeometry::MultiPoint(_)
            | GeoGeometry::MultiLineString(_)
            | GeoGeometry::MultiPolygon(_)
            | GeoGeometry::GeometryCollection(_) => {
                let members = members_of(shape);
                let lowered = members
                    .iter()
                    .enumerate()
                    .map(|(i, member)| {
                        let kind = member_kinds
                            .and_then(|kinds| kinds.get(i).copied())
                            .unwrap_or_else(|| GeometryKind::infer(member));
                        (kind, self.lower(member, index, None))
                    })
                    .collect();
                Structure::Collection(lowered)
            }
            // normalize() removes these before a NativeGeometry exists
            GeoGeometry::Line(_) | GeoGeometry::Rect(_) | GeoGeometry::Triangle(_) => {
                self.lower(&normalize(shape.clone()), index, member_kinds)
            }
        }
    }

    fn coord4(&self, c: Coord<f64>, index: usize) -> Coord4 {
        let base = Coord4::xy(c.x, c.y);
        match self.extra {
            ExtraOrdinate::None => base,
            ExtraOrdinate::Z => base.with_z(self.values[index]),
            ExtraOrdinate::M => base.with_m(self.values[index]),
        }
    }

    /// Split a collection into its members, each with its own slice of
    /// extra ordinate values. Empty for non-collections.
    pub fn members(&self) -> Vec<NativeGeometry> {
        if !matches!(
            self.shape,
            GeoGeometry::MultiPoint(_)
                | GeoGeometry::MultiLineString(_)
                | GeoGeometry::MultiPolygon(_)
                | GeoGeometry::GeometryCollection(_)
        ) {
            return Vec::new();
        }
        self.split(members_of(&self.shape))
    }

    /// Polygon rings (exterior first) as line strings. Empty for non-polygons.
    pub fn rings(&self) -> Vec<NativeGeometry> {
        match &self.shape {
            GeoGeometry::Polygon(poly) => {
                let rings = std::iter::once(poly.exterior())
                    .chain(poly.interiors())
                    .map(|ring| GeoGeometry::LineString(ring.clone()))
                    .collect();
                self.split(rings)
            }
            _ => Vec::new(),
        }
    }

    /// Line string vertices as points. Empty for non line strings.
    pub fn vertices(&self) -> Vec<NativeGeometry> {
        match &self.shape {
            GeoGeometry::LineString(ls) => {
                let points = ls.0.iter().map(|c| GeoGeometry::Point(Point(*c))).collect();
                self.split(points)
            }
            _ => Vec::new(),
        }
    }

    fn split(&self, parts: Vec<GeoGeometry<f64>>) -> Vec<NativeGeometry> {
        let mut offset = 0;
        parts
            .into_iter()
            .map(|shape| {
                let count = shape.coords_count();
                let values = match self.extra {
                    ExtraOrdinate::None => Vec::new(),
                    _ => self.values[offset..offset + count].to_vec(),
                };
                offset += count;
                NativeGeometry {
                    shape,
                    extra: self.extra,
                    values,
                    srid: self.srid,
                }
            })
            .collect()
    }

    /// Whether both geometries have the same vertices in the same order,
    /// comparing X/Y bitwise.
    pub fn same_xy(&self, other: &NativeGeometry) -> bool {
        self.vertex_count() == other.vertex_count()
            && self
                .shape
                .coords_iter()
                .zip(other.shape.coords_iter())
                .all(|(a, b)| xy_key(a) == xy_key(b))
    }

    /// Representational equality: same shape layout, same coordinates, same
    /// extra ordinate layout and values. Coordinates compare bitwise after
    /// folding NaNs and signed zeros. The SRID tag is not compared.
    pub fn rep_equals(&self, other: &NativeGeometry) -> bool {
        self.extra == other.extra
            && (self.shape == other.shape
                || (self.same_xy(other) && layout_of(&self.shape) == layout_of(&other.shape)))
            && self.values.len() == other.values.len()
            && self
                .values
                .iter()
                .zip(&other.values)
                .all(|(a, b)| same_value(*a, *b))
    }

    /// Feed the representation into a hasher, consistently with
    /// [`rep_equals`](Self::rep_equals).
    pub fn hash_into<H: Hasher>(&self, state: &mut H) {
        state.write_u8(self.extra as u8);
        state.write_usize(self.vertex_count());
        for c in self.shape.coords_iter() {
            state.write_u64(canonical_bits(c.x));
            state.write_u64(canonical_bits(c.y));
        }
        for v in &self.values {
            state.write_u64(canonical_bits(*v));
        }
    }
}

fn xy_key(c: Coord<f64>) -> (u64, u64) {
    (canonical_bits(c.x), canonical_bits(c.y))
}

fn canonical_bits(v: f64) -> u64 {
    if v.is_nan() {
        f64::NAN.to_bits()
    } else if v == 0.0 {
        0.0f64.to_bits()
    } else {
        v.to_bits()
    }
}

fn same_value(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

/// Variant tags and part sizes of a shape, without its coordinates.
fn layout_of(shape: &GeoGeometry<f64>) -> Vec<usize> {
    fn rings(poly: &Polygon<f64>, out: &mut Vec<usize>) {
        out.push(poly.interiors().len());
        out.push(poly.exterior().0.len());
        out.extend(poly.interiors().iter().map(|ring| ring.0.len()));
    }

    fn walk(shape: &GeoGeometry<f64>, out: &mut Vec<usize>) {
        match shape {
            GeoGeometry::Point(_) => out.push(0),
            GeoGeometry::Line(_) => out.push(1),
            GeoGeometry::LineString(ls) => out.extend([2, ls.0.len()]),
            GeoGeometry::Polygon(poly) => {
                out.push(3);
                rings(poly, out);
            }
            GeoGeometry::MultiPoint(mp) => out.extend([4, mp.0.len()]),
            GeoGeometry::MultiLineString(mls) => {
                out.extend([5, mls.0.len()]);
                out.extend(mls.0.iter().map(|ls| ls.0.len()));
            }
            GeoGeometry::MultiPolygon(mp) => {
                out.extend([6, mp.0.len()]);
                for poly in &mp.0 {
                    rings(poly, out);
                }
            }
            GeoGeometry::GeometryCollection(gc) => {
                out.extend([7, gc.0.len()]);
                for member in &gc.0 {
                    walk(member, out);
                }
            }
            GeoGeometry::Rect(_) => out.push(8),
            GeoGeometry::Triangle(_) => out.push(9),
        }
    }

    let mut out = Vec::new();
    walk(shape, &mut out);
    out
}

/// Top-level members of a collection shape.
fn members_of(shape: &GeoGeometry<f64>) -> Vec<GeoGeometry<f64>> {
    match shape {
        GeoGeometry::MultiPoint(mp) => mp.0.iter().map(|p| GeoGeometry::Point(*p)).collect(),
        GeoGeometry::MultiLineString(mls) => mls
            .0
            .iter()
            .map(|ls| GeoGeometry::LineString(ls.clone()))
            .collect(),
        GeoGeometry::MultiPolygon(mp) => {
            mp.0.iter().map(|p| GeoGeometry::Polygon(p.clone())).collect()
        }
        GeoGeometry::GeometryCollection(gc) => gc.0.clone(),
        _ => Vec::new(),
    }
}

/// Replace `Line`, `Rect` and `Triangle` with line strings and polygons.
pub(crate) fn normalize(shape: GeoGeometry<f64>) -> GeoGeometry<f64> {
    match shape {
        GeoGeometry::Line(line) => {
            GeoGeometry::LineString(LineString::new(vec![line.start, line.end]))
        }
        GeoGeometry::Rect(rect) => GeoGeometry::Polygon(rect.to_polygon()),
        GeoGeometry::Triangle(tri) => GeoGeometry::Polygon(tri.to_polygon()),
        GeoGeometry::GeometryCollection(gc) => GeoGeometry::GeometryCollection(GeometryCollection(
            gc.0.into_iter().map(normalize).collect(),
        )),
        other => other,
    }
}

fn ring(coords: &[Coord4]) -> LineString<f64> {
    LineString::new(coords.iter().map(|c| Coord { x: c.x, y: c.y }).collect())
}

fn polygon_of(rings: &[Vec<Coord4>]) -> Polygon<f64> {
    match rings.split_first() {
        Some((exterior, interiors)) => {
            Polygon::new(ring(exterior), interiors.iter().map(|r| ring(r)).collect())
        }
        None => Polygon::new(LineString::new(Vec::new()), Vec::new()),
    }
}

fn mismatch(kind: GeometryKind, member_kind: Option<GeometryKind>) -> GeometryError {
    match member_kind {
        Some(member) => {
            GeometryError::invalid(format!("{} cannot hold a {} member", kind, member))
        }
        None => GeometryError::invalid(format!("structure does not describe a {}", kind)),
    }
}

/// Build the planar shape of `kind` from a coordinate tree.
fn shape_of(kind: GeometryKind, structure: &Structure) -> Result<GeoGeometry<f64>> {
    match (kind, structure) {
        (GeometryKind::Point, Structure::Point(c)) => {
            Ok(GeoGeometry::Point(Point::new(c.x, c.y)))
        }
        (k, Structure::LineString(coords)) if k.is_line_string_family() => {
            Ok(GeoGeometry::LineString(ring(coords)))
        }
        (GeometryKind::Polygon, Structure::Polygon(rings)) => {
            Ok(GeoGeometry::Polygon(polygon_of(rings)))
        }
        (GeometryKind::MultiPoint, Structure::Collection(members)) => {
            let mut points = Vec::with_capacity(members.len());
            for (member_kind, member) in members {
                match member {
                    Structure::Point(c) if *member_kind == GeometryKind::Point => {
                        points.push(Point::new(c.x, c.y))
                    }
                    _ => return Err(mismatch(kind, Some(*member_kind))),
                }
            }
            Ok(GeoGeometry::MultiPoint(MultiPoint::new(points)))
        }
        (GeometryKind::MultiLineString, Structure::Collection(members)) => {
            let mut lines = Vec::with_capacity(members.len());
            for (member_kind, member) in members {
                match member {
                    Structure::LineString(coords) if member_kind.is_line_string_family() => {
                        lines.push(ring(coords))
                    }
                    _ => return Err(mismatch(kind, Some(*member_kind))),
                }
            }
            Ok(GeoGeometry::MultiLineString(MultiLineString::new(lines)))
        }
        (GeometryKind::MultiPolygon, Structure::Collection(members)) => {
            let mut polygons = Vec::with_capacity(members.len());
            for (member_kind, member) in members {
                match member {
                    Structure::Polygon(rings) if *member_kind == GeometryKind::Polygon => {
                        polygons.push(polygon_of(rings))
                    }
                    _ => return Err(mismatch(kind, Some(*member_kind))),
                }
            }
            Ok(GeoGeometry::MultiPolygon(MultiPolygon::new(polygons)))
        }
        (GeometryKind::GeometryCollection, Structure::Collection(members)) => {
            let shapes = members
                .iter()
                .map(|(member_kind, member)| shape_of(*member_kind, member))
                .collect::<Result<Vec<_>>>()?;
            Ok(GeoGeometry::GeometryCollection(GeometryCollection(shapes)))
        }
        _ => Err(mismatch(kind, None)),
    }
}

/// Parse WKT straight into a shape, for tests.
#[cfg(test)]
pub(crate) fn test_shape(wkt: &str) -> GeoGeometry<f64> {
    use std::str::FromStr;
    let parsed = wkt::Wkt::<f64>::from_str(wkt).expect("valid WKT");
    parsed.try_into().expect("convertible WKT")
}
