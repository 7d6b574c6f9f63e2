//! Combined Z + M geometries.
//!
//! The engine carries at most one extra ordinate per coordinate. A
//! [`CombinedFactory`] emulates 4-ordinate geometries by owning two sibling
//! factories, one with Z and one with M, identical in every other setting.
//! Each [`CombinedGeometry`] is a pair of shadow geometries built from the
//! same input, one per sibling.
//!
//! ```text
//!   POINT ZM (1 2 3 4)
//!          │
//!          ├── z shadow: POINT Z (1 2 3)   x, y, z, predicates, scalars
//!          └── m shadow: POINT M (1 2 4)   m
//! ```
//!
//! Both shadows always have the same kind and the same vertices in the same
//! order; [`CombinedGeometry`] values are only created through a pairing
//! check. Operations that produce geometries run on both shadows and pair
//! the results again. Serialization writes one `ZM` stream.

use crate::codec::{OrdinateLayout, WktCodec};
use crate::config::FactoryConfig;
use crate::coord_sys::{BuiltinResolver, CoordinateSystem, CoordinateSystemResolver};
use crate::engine::{ExtraOrdinate, GeoEngine, GeometryEngine};
use crate::error::{GeometryError, Result};
use crate::factory::{lower_path, lower_rings, Factory};
use crate::geometry::{apply_manifest, Geometry, GeometryRepr};
use crate::kind::GeometryKind;
use crate::prepared::PreparedStatus;
use crate::structure::{Coord4, Structure};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Factory producing Z + M geometries as shadow pairs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CombinedFactory {
    z: Factory,
    m: Factory,
}

impl CombinedFactory {
    /// Create a combined factory on the shared [`GeoEngine`]. The Z/M flags
    /// of `config` are ignored; the siblings set them.
    pub fn new(config: FactoryConfig) -> Result<Self> {
        let engine: Arc<dyn GeometryEngine> = GeoEngine::shared();
        Self::with_engine(config, engine, Arc::new(BuiltinResolver))
    }

    pub fn with_engine(
        config: FactoryConfig,
        engine: Arc<dyn GeometryEngine>,
        resolver: Arc<dyn CoordinateSystemResolver>,
    ) -> Result<Self> {
        let z = Factory::with_engine(
            config.clone().with_z(true).with_m(false),
            Arc::clone(&engine),
            Arc::clone(&resolver),
        )?;
        let m = Factory::with_engine(config.with_z(false).with_m(true), engine, resolver)?;
        tracing::debug!(srid = z.srid(), "Created combined Z/M geometry factory");
        Ok(Self { z, m })
    }

    /// The Z-carrying sibling.
    pub fn z_factory(&self) -> &Factory {
        &self.z
    }

    /// The M-carrying sibling.
    pub fn m_factory(&self) -> &Factory {
        &self.m
    }

    /// Configuration with both ordinates enabled.
    pub fn config(&self) -> FactoryConfig {
        self.z.config().clone().with_m(true)
    }

    pub fn srid(&self) -> i32 {
        self.z.srid()
    }

    pub fn coordinate_system(&self) -> Option<&CoordinateSystem> {
        self.z.coordinate_system()
    }

    pub fn codec(&self) -> &WktCodec {
        self.z.codec()
    }

    /// Whether `factory` is one of this factory's siblings.
    pub fn is_sibling(&self, factory: &Factory) -> bool {
        *factory == self.z || *factory == self.m
    }

    // ========================================================================
    // Constructors
    // ========================================================================

    /// A point from 2, 3 (x y z) or 4 (x y z m) ordinates. Missing extra
    /// ordinates are 0.
    pub fn point(&self, ordinates: &[f64]) -> Result<CombinedGeometry> {
        let coord = match ordinates {
            [x, y] => Coord4::xy(*x, *y),
            [x, y, z] => Coord4::xy(*x, *y).with_z(*z),
            [x, y, z, m] => Coord4::xy(*x, *y).with_z(*z).with_m(*m),
            _ => {
                return Err(GeometryError::invalid(format!(
                    "a combined point takes 2 to 4 ordinates, got {}",
                    ordinates.len()
                )))
            }
        };
        self.build(GeometryKind::Point, Structure::Point(coord))
    }

    pub fn line_string(&self, points: &[CombinedGeometry]) -> Result<CombinedGeometry> {
        let path = lower_path(points.iter().map(CombinedGeometry::lowered))?;
        self.build(GeometryKind::LineString, path)
    }

    pub fn line(
        &self,
        start: &CombinedGeometry,
        end: &CombinedGeometry,
    ) -> Result<CombinedGeometry> {
        self.build(
            GeometryKind::Line,
            lower_path([start.lowered(), end.lowered()])?,
        )
    }

    pub fn linear_ring(&self, points: &[CombinedGeometry]) -> Result<CombinedGeometry> {
        let path = lower_path(points.iter().map(CombinedGeometry::lowered))?;
        self.build(GeometryKind::LinearRing, path)
    }

    pub fn polygon(
        &self,
        outer: &CombinedGeometry,
        inner: &[CombinedGeometry],
    ) -> Result<CombinedGeometry> {
        let rings = std::iter::once(outer)
            .chain(inner)
            .map(CombinedGeometry::lowered);
        self.build(GeometryKind::Polygon, lower_rings(rings)?)
    }

    pub fn collection(&self, elements: &[CombinedGeometry]) -> Result<CombinedGeometry> {
        self.multi(GeometryKind::GeometryCollection, elements)
    }

    pub fn multi_point(&self, elements: &[CombinedGeometry]) -> Result<CombinedGeometry> {
        self.multi(GeometryKind::MultiPoint, elements)
    }

    pub fn multi_line_string(&self, elements: &[CombinedGeometry]) -> Result<CombinedGeometry> {
        self.multi(GeometryKind::MultiLineString, elements)
    }

    pub fn multi_polygon(&self, elements: &[CombinedGeometry]) -> Result<CombinedGeometry> {
        self.multi(GeometryKind::MultiPolygon, elements)
    }

    fn multi(&self, kind: GeometryKind, elements: &[CombinedGeometry]) -> Result<CombinedGeometry> {
        let members = elements.iter().map(CombinedGeometry::lowered).collect();
        self.build(kind, Structure::Collection(members))
    }

    /// Parse one WKT stream (normally `... ZM (...)`) into both shadows.
    pub fn parse_wkt(&self, text: &str) -> Result<CombinedGeometry> {
        let parsed = self.codec().parse(text)?;
        self.build(parsed.kind, parsed.structure)
    }

    /// Build both shadows from one 4-ordinate structure.
    pub fn build(&self, kind: GeometryKind, structure: Structure) -> Result<CombinedGeometry> {
        let z = self.z.build(kind, structure.clone())?;
        let m = self.m.build(kind, structure)?;
        CombinedGeometry::pair(self.clone(), z, m)
    }
}

impl Serialize for CombinedFactory {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.config().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CombinedFactory {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let config = FactoryConfig::deserialize(deserializer)?;
        CombinedFactory::new(config).map_err(serde::de::Error::custom)
    }
}

/// A 4-ordinate geometry represented by a Z shadow and an M shadow.
#[derive(Clone)]
pub struct CombinedGeometry {
    factory: CombinedFactory,
    z: Geometry,
    m: Geometry,
}

impl CombinedGeometry {
    /// Pair two shadows, checking that they describe the same vertices.
    pub(crate) fn pair(factory: CombinedFactory, z: Geometry, m: Geometry) -> Result<Self> {
        let pairable = z.kind() == m.kind()
            && z.has_extra(ExtraOrdinate::Z)
            && m.has_extra(ExtraOrdinate::M)
            && z.native().same_xy(m.native());
        if !pairable {
            return Err(GeometryError::engine(format!(
                "shadow geometries cannot be paired: {} with {} vertices, {} with {} vertices",
                z.kind(),
                z.num_points(),
                m.kind(),
                m.num_points()
            )));
        }
        Ok(Self { factory, z, m })
    }

    fn repair(&self, z: Geometry, m: Geometry) -> Result<CombinedGeometry> {
        CombinedGeometry::pair(self.factory.clone(), z, m)
    }

    /// Apply a geometry-producing operation to both shadows.
    fn both(&self, op: impl Fn(&Geometry) -> Result<Geometry>) -> Result<CombinedGeometry> {
        self.repair(op(&self.z)?, op(&self.m)?)
    }

    /// Apply a two-input operation shadow by shadow.
    fn both_with(
        &self,
        other: &CombinedGeometry,
        op: impl Fn(&Geometry, &Geometry) -> Result<Geometry>,
    ) -> Result<CombinedGeometry> {
        self.repair(op(&self.z, &other.z)?, op(&self.m, &other.m)?)
    }

    pub fn factory(&self) -> &CombinedFactory {
        &self.factory
    }

    pub fn kind(&self) -> GeometryKind {
        self.z.kind()
    }

    pub fn z_shadow(&self) -> &Geometry {
        &self.z
    }

    pub fn m_shadow(&self) -> &Geometry {
        &self.m
    }

    pub fn srid(&self) -> i32 {
        self.z.srid()
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn x(&self) -> Option<f64> {
        self.z.x()
    }

    pub fn y(&self) -> Option<f64> {
        self.z.y()
    }

    pub fn z(&self) -> Option<f64> {
        self.z.z()
    }

    pub fn m(&self) -> Option<f64> {
        self.m.m()
    }

    pub fn num_points(&self) -> usize {
        self.z.num_points()
    }

    pub fn point_n(&self, n: usize) -> Result<CombinedGeometry> {
        self.both(|shadow| shadow.point_n(n))
    }

    pub fn exterior_ring(&self) -> Result<CombinedGeometry> {
        self.both(Geometry::exterior_ring)
    }

    pub fn num_interior_rings(&self) -> usize {
        self.z.num_interior_rings()
    }

    pub fn interior_ring_n(&self, n: usize) -> Result<CombinedGeometry> {
        self.both(|shadow| shadow.interior_ring_n(n))
    }

    pub fn num_geometries(&self) -> usize {
        self.z.num_geometries()
    }

    pub fn geometry_n(&self, n: usize) -> Result<CombinedGeometry> {
        self.both(|shadow| shadow.geometry_n(n))
    }

    pub fn is_empty(&self) -> bool {
        self.z.is_empty()
    }

    pub fn dimension(&self) -> i8 {
        self.z.dimension()
    }

    pub fn is_closed(&self) -> bool {
        self.z.is_closed()
    }

    // ========================================================================
    // M-independent results, from the Z shadow
    // ========================================================================

    /// Geometric equality. M values are not considered.
    pub fn equals(&self, other: &CombinedGeometry) -> Result<bool> {
        self.z.equals(&other.z)
    }

    pub fn disjoint(&self, other: &CombinedGeometry) -> Result<bool> {
        self.z.disjoint(&other.z)
    }

    pub fn intersects(&self, other: &CombinedGeometry) -> Result<bool> {
        self.z.intersects(&other.z)
    }

    pub fn touches(&self, other: &CombinedGeometry) -> Result<bool> {
        self.z.touches(&other.z)
    }

    pub fn crosses(&self, other: &CombinedGeometry) -> Result<bool> {
        self.z.crosses(&other.z)
    }

    pub fn within(&self, other: &CombinedGeometry) -> Result<bool> {
        self.z.within(&other.z)
    }

    pub fn contains(&self, other: &CombinedGeometry) -> Result<bool> {
        self.z.contains(&other.z)
    }

    pub fn overlaps(&self, other: &CombinedGeometry) -> Result<bool> {
        self.z.overlaps(&other.z)
    }

    pub fn relate(&self, other: &CombinedGeometry) -> Result<String> {
        self.z.relate(&other.z)
    }

    pub fn relate_pattern(&self, other: &CombinedGeometry, pattern: &str) -> Result<bool> {
        self.z.relate_pattern(&other.z, pattern)
    }

    pub fn distance(&self, other: &CombinedGeometry) -> Result<f64> {
        self.z.distance(&other.z)
    }

    pub fn area(&self) -> Result<f64> {
        self.z.area()
    }

    pub fn length(&self) -> Result<f64> {
        self.z.length()
    }

    // ========================================================================
    // Producers, on both shadows
    // ========================================================================

    pub fn envelope(&self) -> Result<CombinedGeometry> {
        self.both(Geometry::envelope)
    }

    pub fn boundary(&self) -> Result<CombinedGeometry> {
        self.both(Geometry::boundary)
    }

    pub fn convex_hull(&self) -> Result<CombinedGeometry> {
        self.both(Geometry::convex_hull)
    }

    pub fn buffer(&self, distance: f64) -> Result<CombinedGeometry> {
        self.both(|shadow| shadow.buffer(distance))
    }

    pub fn intersection(&self, other: &CombinedGeometry) -> Result<CombinedGeometry> {
        self.both_with(other, Geometry::intersection)
    }

    pub fn union(&self, other: &CombinedGeometry) -> Result<CombinedGeometry> {
        self.both_with(other, Geometry::union)
    }

    pub fn difference(&self, other: &CombinedGeometry) -> Result<CombinedGeometry> {
        self.both_with(other, Geometry::difference)
    }

    pub fn sym_difference(&self, other: &CombinedGeometry) -> Result<CombinedGeometry> {
        self.both_with(other, Geometry::sym_difference)
    }

    // ========================================================================
    // Representation
    // ========================================================================

    /// Both shadows representationally equal.
    pub fn rep_equals(&self, other: &CombinedGeometry) -> bool {
        self.z.rep_equals(&other.z) && self.m.rep_equals(&other.m)
    }

    /// 4-ordinate coordinate tree: X/Y/Z from the Z shadow, M from the M
    /// shadow.
    pub fn to_structure(&self) -> Structure {
        let mut structure = self.z.to_structure();
        let mut m_values = self.m.native().extra_values().iter();
        structure.for_each_coord_mut(&mut |c| c.m = m_values.next().copied());
        structure
    }

    pub(crate) fn lowered(&self) -> (GeometryKind, Structure) {
        (self.kind(), self.to_structure())
    }

    /// `ZM` WKT through the factory's codec.
    pub fn as_text(&self) -> String {
        self.factory
            .codec()
            .generate(
                self.kind(),
                &self.to_structure(),
                OrdinateLayout::Xyzm,
                self.srid(),
            )
    }

    /// Prepare the Z shadow, which serves every predicate.
    pub fn prepare(&self) -> Result<()> {
        self.z.prepare()
    }

    pub fn is_prepared(&self) -> bool {
        self.z.is_prepared()
    }

    pub fn prepared_status(&self) -> PreparedStatus {
        self.z.prepared_status()
    }
}

impl PartialEq for CombinedGeometry {
    fn eq(&self, other: &Self) -> bool {
        self.rep_equals(other)
    }
}

impl Eq for CombinedGeometry {}

impl Hash for CombinedGeometry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.z.rep_hash());
        state.write_u64(self.m.rep_hash());
    }
}

impl fmt::Debug for CombinedGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CombinedGeometry")
            .field("z", &self.z)
            .field("m", &self.m)
            .finish()
    }
}

impl fmt::Display for CombinedGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl Serialize for CombinedGeometry {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        GeometryRepr {
            factory: self.factory.config(),
            kind: self.kind(),
            manifest: self.z.manifest().map(<[GeometryKind]>::to_vec),
            wkt: WktCodec::default().generate(
                self.kind(),
                &self.to_structure(),
                OrdinateLayout::Xyzm,
                0,
            ),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CombinedGeometry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let repr = GeometryRepr::deserialize(deserializer)?;
        let factory = CombinedFactory::new(repr.factory).map_err(serde::de::Error::custom)?;
        let parsed = WktCodec::default()
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

#[cfg(test)]
mod tests {
    use super::*;

    fn factory() -> CombinedFactory {
        CombinedFactory::new(FactoryConfig::new(4326)).unwrap()
    }

    #[test]
    fn test_siblings_differ_only_in_ordinate() {
        let f = factory();
        assert!(f.z_factory().has_z() && !f.z_factory().has_m());
        assert!(f.m_factory().has_m() && !f.m_factory().has_z());

        let mut z_config = f.z_factory().config().clone();
        z_config.has_z_coordinate = false;
        let mut m_config = f.m_factory().config().clone();
        m_config.has_m_coordinate = false;
        assert_eq!(z_config, m_config);

        let config = f.config();
        assert!(config.has_z_coordinate && config.has_m_coordinate);
    }

    #[test]
    fn test_point_routing() {
        let p = factory().point(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(p.x(), Some(1.0));
        assert_eq!(p.y(), Some(2.0));
        assert_eq!(p.z(), Some(3.0));
        assert_eq!(p.m(), Some(4.0));
        assert_eq!(p.as_text(), "POINT ZM (1 2 3 4)");
        assert!(factory().point(&[1.0]).is_err());
    }

    #[test]
    fn test_line_children_repaired() {
        let f = factory();
        let line = f
            .parse_wkt("LINESTRING ZM (0 0 1 10, 1 1 2 20, 2 0 3 30)")
            .unwrap();
        assert_eq!(line.num_points(), 3);
        let second = line.point_n(1).unwrap();
        assert_eq!((second.z(), second.m()), (Some(2.0), Some(20.0)));
        assert!((line.length().unwrap() - 2.0 * 2f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_producers_stay_paired() {
        let f = factory();
        let a = f
            .parse_wkt("POLYGON ZM ((0 0 1 5, 2 0 1 5, 2 2 1 5, 0 2 1 5, 0 0 1 5))")
            .unwrap();
        let b = f
            .parse_wkt("POLYGON ZM ((1 1 2 6, 3 1 2 6, 3 3 2 6, 1 3 2 6, 1 1 2 6))")
            .unwrap();

        let envelope = a.envelope().unwrap();
        assert_eq!(envelope.kind(), GeometryKind::Polygon);
        assert_eq!(envelope.num_points(), a.num_points());

        let inter = a.intersection(&b).unwrap();
        assert!((inter.area().unwrap() - 1.0).abs() < 1e-9);
        assert!(inter.z_shadow().native().same_xy(inter.m_shadow().native()));
    }

    #[test]
    fn test_pair_rejects_mismatched_shadows() {
        let f = factory();
        let z = f.z_factory().point(&[0.0, 0.0, 1.0]).unwrap();
        let m = f.m_factory().point(&[1.0, 0.0, 1.0]).unwrap();
        let err = CombinedGeometry::pair(f.clone(), z.clone(), m).unwrap_err();
        assert!(matches!(err, GeometryError::Engine(_)));

        let wrong_sibling = f.z_factory().point(&[0.0, 0.0, 2.0]).unwrap();
        assert!(CombinedGeometry::pair(f, z, wrong_sibling).is_err());
    }

    #[test]
    fn test_equality_semantics() {
        let f = factory();
        let a = f.point(&[1.0, 1.0, 1.0, 1.0]).unwrap();
        let b = f.point(&[1.0, 1.0, 1.0, 9.0]).unwrap();
        assert!(a.equals(&b).unwrap());
        assert!(!a.rep_equals(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn test_serde_roundtrip() {
        let f = factory();
        let line = f.parse_wkt("LINESTRING ZM (0 0 1 10, 1 1 2 20)").unwrap();
        let json = serde_json::to_string(&line).unwrap();
        assert!(json.contains("LINESTRING ZM"));
        let back: CombinedGeometry = serde_json::from_str(&json).unwrap();
        assert!(back.rep_equals(&line));
        assert_eq!(back.factory(), line.factory());

        let factory_json = serde_json::to_string(&f).unwrap();
        let factory_back: CombinedFactory = serde_json::from_str(&factory_json).unwrap();
        assert_eq!(factory_back, f);
    }
}
