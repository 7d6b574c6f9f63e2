//! Geometry factories.
//!
//! A [`Factory`] is an immutable value derived from a [`FactoryConfig`]. Two
//! factories are equal (and hash equally) exactly when the configurations
//! they were created from are equal, regardless of which engine instance
//! they hold. The SRID and coordinate system are resolved against each other
//! once, at creation, and only feed the accessors.
//!
//! Every constructor lowers its inputs into a [`Structure`] and goes through
//! [`Factory::build`], which dispatches on a kind→constructor table. Casts,
//! WKT parsing and combined factories all build through the same table.

use crate::capability::EngineCapabilities;
use crate::codec::WktCodec;
use crate::config::{AutoPrepareMode, FactoryConfig};
use crate::coord_sys::{BuiltinResolver, CoordinateSystem, CoordinateSystemResolver};
use crate::engine::{ExtraOrdinate, GeoEngine, GeometryEngine, NativeGeometry};
use crate::error::{GeometryError, Result};
use crate::geometry::Geometry;
use crate::kind::GeometryKind;
use crate::structure::{Coord4, Structure};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::Arc;

/// Interior intersection between two parts.
const INTERIORS_INTERSECT: &str = "T********";

/// Two parts sharing a boundary segment.
const BOUNDARIES_SHARE_LINE: &str = "****1****";

/// Immutable geometry factory.
#[derive(Clone)]
pub struct Factory {
    inner: Arc<FactoryInner>,
}

struct FactoryInner {
    /// Config as supplied; the identity of the factory.
    config: FactoryConfig,
    srid: i32,
    coordinate_system: Option<CoordinateSystem>,
    extra: ExtraOrdinate,
    capabilities: EngineCapabilities,
    codec: WktCodec,
    engine: Arc<dyn GeometryEngine>,
    resolver: Arc<dyn CoordinateSystemResolver>,
}

impl Factory {
    /// Create a factory on the shared [`GeoEngine`] with the built-in
    /// coordinate system resolver.
    pub fn new(config: FactoryConfig) -> Result<Self> {
        let engine: Arc<dyn GeometryEngine> = GeoEngine::shared();
        Self::with_engine(config, engine, Arc::new(BuiltinResolver))
    }

    /// Create a factory bound to a specific engine and resolver.
    pub fn with_engine(
        config: FactoryConfig,
        engine: Arc<dyn GeometryEngine>,
        resolver: Arc<dyn CoordinateSystemResolver>,
    ) -> Result<Self> {
        let extra = match (config.has_z_coordinate, config.has_m_coordinate) {
            (true, true) => {
                return Err(GeometryError::configuration(
                    "a factory cannot carry both Z and M ordinates; use a combined factory",
                ))
            }
            (true, false) => ExtraOrdinate::Z,
            (false, true) => ExtraOrdinate::M,
            (false, false) => ExtraOrdinate::None,
        };
        if config.buffer_resolution == 0 {
            return Err(GeometryError::configuration("buffer resolution must be at least 1"));
        }

        let (srid, coordinate_system) = resolve_coordinate_system(&config, resolver.as_ref());
        let capabilities = engine.capabilities();
        tracing::debug!(
            srid,
            ?extra,
            auto_prepare = ?config.auto_prepare,
            coordinate_system = ?coordinate_system.as_ref().map(|cs| cs.code),
            "Created geometry factory"
        );

        Ok(Self {
            inner: Arc::new(FactoryInner {
                codec: WktCodec::new(config.codec.clone()),
                config,
                srid,
                coordinate_system,
                extra,
                capabilities,
                engine,
                resolver,
            }),
        })
    }

    /// The configuration this factory was created from.
    pub fn config(&self) -> &FactoryConfig {
        &self.inner.config
    }

    /// SRID stamped on every geometry, taken from the coordinate system when
    /// the config leaves it at 0.
    pub fn srid(&self) -> i32 {
        self.inner.srid
    }

    /// The extra ordinate carried next to X/Y, if any.
    pub fn extra_ordinate(&self) -> ExtraOrdinate {
        self.inner.extra
    }

    /// Whether geometries carry a Z ordinate.
    pub fn has_z(&self) -> bool {
        self.inner.extra == ExtraOrdinate::Z
    }

    /// Whether geometries carry an M ordinate.
    pub fn has_m(&self) -> bool {
        self.inner.extra == ExtraOrdinate::M
    }

    /// Segments per quarter circle used by `buffer`.
    pub fn buffer_resolution(&self) -> u32 {
        self.inner.config.buffer_resolution
    }

    /// When geometries built here start caching prepared indexes.
    pub fn auto_prepare(&self) -> AutoPrepareMode {
        self.inner.config.auto_prepare
    }

    /// Coordinate system, either configured or resolved from the SRID.
    pub fn coordinate_system(&self) -> Option<&CoordinateSystem> {
        self.inner.coordinate_system.as_ref()
    }

    /// Coordinates are planar unless the coordinate system is geographic.
    pub fn is_cartesian(&self) -> bool {
        self.coordinate_system()
            .map_or(true, CoordinateSystem::is_cartesian)
    }

    /// Engine capabilities captured when the factory was created.
    pub fn capabilities(&self) -> EngineCapabilities {
        self.inner.capabilities
    }

    /// Engine evaluating every operation on this factory's geometries.
    pub fn engine(&self) -> &dyn GeometryEngine {
        self.inner.engine.as_ref()
    }

    /// Resolver used to look up coordinate systems by SRID.
    pub fn resolver(&self) -> &dyn CoordinateSystemResolver {
        self.inner.resolver.as_ref()
    }

    /// WKT codec configured from the factory's codec settings.
    pub fn codec(&self) -> &WktCodec {
        &self.inner.codec
    }

    /// Look up a factory property by name. Unknown names return `None`.
    pub fn property(&self, name: &str) -> Option<PropertyValue> {
        name.parse::<FactoryProperty>()
            .ok()
            .map(|property| self.property_value(property))
    }

    pub fn property_value(&self, property: FactoryProperty) -> PropertyValue {
        let config = &self.inner.config;
        match property {
            FactoryProperty::HasZCoordinate => PropertyValue::Bool(self.has_z()),
            FactoryProperty::HasMCoordinate => PropertyValue::Bool(self.has_m()),
            FactoryProperty::IsCartesian => PropertyValue::Bool(self.is_cartesian()),
            FactoryProperty::BufferResolution => {
                PropertyValue::Int(i64::from(config.buffer_resolution))
            }
            FactoryProperty::AutoPrepare => PropertyValue::AutoPrepare(config.auto_prepare),
            FactoryProperty::Srid => PropertyValue::Int(i64::from(self.srid())),
            FactoryProperty::UsesLenientMultiPolygonAssertions => {
                PropertyValue::Bool(config.lenient_multi_polygon_assertions)
            }
            FactoryProperty::CoordinateSystem => {
                PropertyValue::CoordinateSystem(self.coordinate_system().cloned())
            }
        }
    }

    // ========================================================================
    // Constructors
    // ========================================================================

    /// A point from 2 ordinates, or 3 when the factory carries Z or M.
    pub fn point(&self, ordinates: &[f64]) -> Result<Geometry> {
        let coord = match (ordinates, self.inner.extra) {
            ([x, y], _) => Coord4::xy(*x, *y),
            ([x, y, z], ExtraOrdinate::Z) => Coord4::xy(*x, *y).with_z(*z),
            ([x, y, m], ExtraOrdinate::M) => Coord4::xy(*x, *y).with_m(*m),
            _ => {
                return Err(GeometryError::invalid(format!(
                    "{} ordinates given to a factory with extra ordinate {:?}",
                    ordinates.len(),
                    self.inner.extra
                )))
            }
        };
        self.build(GeometryKind::Point, Structure::Point(coord))
    }

    /// A line string through `points`: zero or at least two.
    pub fn line_string(&self, points: &[Geometry]) -> Result<Geometry> {
        self.build(
            GeometryKind::LineString,
            lower_path(points.iter().map(Geometry::lowered))?,
        )
    }

    /// A two-point line.
    pub fn line(&self, start: &Geometry, end: &Geometry) -> Result<Geometry> {
        self.build(
            GeometryKind::Line,
            lower_path([start.lowered(), end.lowered()])?,
        )
    }

    /// A linear ring through `points`, closed automatically.
    pub fn linear_ring(&self, points: &[Geometry]) -> Result<Geometry> {
        self.build(
            GeometryKind::LinearRing,
            lower_path(points.iter().map(Geometry::lowered))?,
        )
    }

    /// A polygon from an outer ring and holes. Rings may be any line string
    /// kind and are closed automatically.
    pub fn polygon(&self, outer: &Geometry, inner: &[Geometry]) -> Result<Geometry> {
        let rings = std::iter::once(outer).chain(inner).map(Geometry::lowered);
        self.build(GeometryKind::Polygon, lower_rings(rings)?)
    }

    /// A heterogeneous geometry collection.
    pub fn collection(&self, elements: &[Geometry]) -> Result<Geometry> {
        self.build(
            GeometryKind::GeometryCollection,
            Structure::Collection(elements.iter().map(Geometry::lowered).collect()),
        )
    }

    pub fn multi_point(&self, elements: &[Geometry]) -> Result<Geometry> {
        self.multi(GeometryKind::MultiPoint, elements)
    }

    pub fn multi_line_string(&self, elements: &[Geometry]) -> Result<Geometry> {
        self.multi(GeometryKind::MultiLineString, elements)
    }

    pub fn multi_polygon(&self, elements: &[Geometry]) -> Result<Geometry> {
        self.multi(GeometryKind::MultiPolygon, elements)
    }

    fn multi(&self, kind: GeometryKind, elements: &[Geometry]) -> Result<Geometry> {
        let members = elements.iter().map(Geometry::lowered).collect();
        self.build(kind, Structure::Collection(members))
    }

    /// Parse WKT (or EWKT) into a geometry owned by this factory. The
    /// factory's SRID is stamped regardless of any EWKT prefix.
    pub fn parse_wkt(&self, text: &str) -> Result<Geometry> {
        let parsed = self.inner.codec.parse(text)?;
        if parsed.srid.is_some_and(|srid| srid != self.srid()) {
            tracing::debug!(
                parsed_srid = ?parsed.srid,
                srid = self.srid(),
                "EWKT SRID differs from factory SRID"
            );
        }
        self.build(parsed.kind, parsed.structure)
    }

    /// Build a geometry of `kind` from a coordinate tree, validating it the
    /// same way the typed constructors do.
    pub fn build(&self, kind: GeometryKind, structure: Structure) -> Result<Geometry> {
        let construct = CONSTRUCTORS[kind as usize];
        construct(self, kind, structure)
    }

    /// Wrap a validated structure into a native geometry.
    fn finish(&self, kind: GeometryKind, structure: &Structure) -> Result<Geometry> {
        check_finite(structure)?;
        let native =
            NativeGeometry::from_structure(kind, structure, self.inner.extra, self.srid())?;
        let manifest = match structure {
            Structure::Collection(members) if kind.is_collection() => {
                Some(members.iter().map(|(member_kind, _)| *member_kind).collect())
            }
            _ => None,
        };
        Ok(Geometry::from_parts(self.clone(), kind, native, manifest))
    }

    /// Reject multi-polygon parts whose interiors intersect or whose
    /// boundaries share a segment.
    fn check_multi_polygon(&self, geometry: &Geometry) -> Result<()> {
        let engine = self.engine();
        let parts = geometry.native().members();
        for (i, a) in parts.iter().enumerate() {
            for (j, b) in parts.iter().enumerate().skip(i + 1) {
                if engine.relate_pattern(a, b, INTERIORS_INTERSECT)? {
                    return Err(GeometryError::invalid(format!(
                        "multi polygon parts {} and {} overlap",
                        i, j
                    )));
                }
                if engine.relate_pattern(a, b, BOUNDARIES_SHARE_LINE)? {
                    return Err(GeometryError::invalid(format!(
                        "multi polygon parts {} and {} share a boundary segment",
                        i, j
                    )));
                }
            }
        }
        Ok(())
    }
}

/// SRID and coordinate system, each filled in from the other when missing.
fn resolve_coordinate_system(
    config: &FactoryConfig,
    resolver: &dyn CoordinateSystemResolver,
) -> (i32, Option<CoordinateSystem>) {
    match &config.coordinate_system {
        Some(cs) if config.srid == 0 => (cs.code, Some(cs.clone())),
        Some(cs) => (config.srid, Some(cs.clone())),
        None => (config.srid, resolver.resolve(config.srid)),
    }
}

impl PartialEq for Factory {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) || self.inner.config == other.inner.config
    }
}

impl Eq for Factory {}

impl Hash for Factory {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.config.hash(state);
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factory")
            .field("config", &self.inner.config)
            .field("srid", &self.inner.srid)
            .field("capabilities", &self.inner.capabilities)
            .finish_non_exhaustive()
    }
}

impl Serialize for Factory {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.inner.config.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Factory {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let config = FactoryConfig::deserialize(deserializer)?;
        Factory::new(config).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Properties
// ============================================================================

/// The fixed set of factory properties exposed by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FactoryProperty {
    HasZCoordinate,
    HasMCoordinate,
    IsCartesian,
    BufferResolution,
    AutoPrepare,
    Srid,
    UsesLenientMultiPolygonAssertions,
    CoordinateSystem,
}

impl FactoryProperty {
    pub const ALL: [FactoryProperty; 8] = [
        FactoryProperty::HasZCoordinate,
        FactoryProperty::HasMCoordinate,
        FactoryProperty::IsCartesian,
        FactoryProperty::BufferResolution,
        FactoryProperty::AutoPrepare,
        FactoryProperty::Srid,
        FactoryProperty::UsesLenientMultiPolygonAssertions,
        FactoryProperty::CoordinateSystem,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FactoryProperty::HasZCoordinate => "has_z_coordinate",
            FactoryProperty::HasMCoordinate => "has_m_coordinate",
            FactoryProperty::IsCartesian => "is_cartesian",
            FactoryProperty::BufferResolution => "buffer_resolution",
            FactoryProperty::AutoPrepare => "auto_prepare",
            FactoryProperty::Srid => "srid",
            FactoryProperty::UsesLenientMultiPolygonAssertions => {
                "uses_lenient_multi_polygon_assertions"
            }
            FactoryProperty::CoordinateSystem => "coordinate_system",
        }
    }
}

impl FromStr for FactoryProperty {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self> {
        FactoryProperty::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| GeometryError::unsupported(format!("unknown factory property: {}", s)))
    }
}

/// Value of a factory property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    AutoPrepare(AutoPrepareMode),
    CoordinateSystem(Option<CoordinateSystem>),
}

// ============================================================================
// Kind → constructor table
// ============================================================================

type Constructor = fn(&Factory, GeometryKind, Structure) -> Result<Geometry>;

/// Indexed by `GeometryKind as usize`.
const CONSTRUCTORS: [Constructor; 9] = [
    construct_point,
    construct_line_string,
    construct_line_string,
    construct_line_string,
    construct_polygon,
    construct_collection,
    construct_multi,
    construct_multi,
    construct_multi,
];

fn construct_point(
    factory: &Factory,
    kind: GeometryKind,
    structure: Structure,
) -> Result<Geometry> {
    match structure {
        Structure::Point(_) => factory.finish(kind, &structure),
        _ => Err(GeometryError::invalid("point structure expected")),
    }
}

fn construct_line_string(
    factory: &Factory,
    kind: GeometryKind,
    mut structure: Structure,
) -> Result<Geometry> {
    check_structure(kind, &mut structure)?;
    factory.finish(kind, &structure)
}

fn construct_polygon(
    factory: &Factory,
    kind: GeometryKind,
    mut structure: Structure,
) -> Result<Geometry> {
    check_structure(kind, &mut structure)?;
    factory.finish(kind, &structure)
}

fn construct_collection(
    factory: &Factory,
    kind: GeometryKind,
    mut structure: Structure,
) -> Result<Geometry> {
    check_structure(kind, &mut structure)?;
    factory.finish(kind, &structure)
}

fn construct_multi(
    factory: &Factory,
    kind: GeometryKind,
    structure: Structure,
) -> Result<Geometry> {
    let mut structure = coerce_elements(kind, structure)?;
    check_structure(kind, &mut structure)?;
    let geometry = factory.finish(kind, &structure)?;
    if kind == GeometryKind::MultiPolygon && !factory.config().lenient_multi_polygon_assertions {
        factory.check_multi_polygon(&geometry)?;
    }
    Ok(geometry)
}

/// Coerce each member of a homogeneous collection into the element kind.
/// Members that already are a subtype (e.g. a `Line` in a multi line
/// string) keep their kind.
fn coerce_elements(kind: GeometryKind, structure: Structure) -> Result<Structure> {
    let (element_kind, members) = match (kind.element_kind(), structure) {
        (Some(element_kind), Structure::Collection(members)) => (element_kind, members),
        _ => return Err(GeometryError::invalid(format!("structure does not describe a {}", kind))),
    };
    let coerced = members
        .into_iter()
        .enumerate()
        .map(|(i, (member_kind, member))| {
            if member_kind.is_subtype_of(element_kind) {
                return Ok((member_kind, member));
            }
            member
                .convert(member_kind, element_kind)
                .map(|converted| (element_kind, converted))
                .map_err(|e| {
                    GeometryError::invalid(format!(
                        "element {} of {} cannot be coerced to {}: {}",
                        i, kind, element_kind, e
                    ))
                })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Structure::Collection(coerced))
}

/// Validate (and close rings of) a structure of `kind`, recursively.
fn check_structure(kind: GeometryKind, structure: &mut Structure) -> Result<()> {
    match (kind, structure) {
        (GeometryKind::Point, Structure::Point(_)) => Ok(()),
        (GeometryKind::LineString, Structure::LineString(coords)) => {
            if coords.len() == 1 {
                return Err(GeometryError::invalid(
                    "a line string needs zero or at least two points",
                ));
            }
            Ok(())
        }
        (GeometryKind::Line, Structure::LineString(coords)) => {
            if coords.len() != 2 {
                return Err(GeometryError::invalid(format!(
                    "a line needs exactly two points, got {}",
                    coords.len()
                )));
            }
            Ok(())
        }
        (GeometryKind::LinearRing, Structure::LineString(coords)) => close_ring(coords),
        (GeometryKind::Polygon, Structure::Polygon(rings)) => {
            let empty = rings.iter().all(Vec::is_empty);
            if empty {
                return Ok(());
            }
            rings.iter_mut().try_for_each(|ring| {
                if ring.is_empty() {
                    return Err(GeometryError::invalid("polygon ring is empty"));
                }
                close_ring(ring)
            })
        }
        (kind, Structure::Collection(members)) if kind.is_collection() => {
            let element_kind = kind.element_kind();
            for (i, (member_kind, member)) in members.iter_mut().enumerate() {
                if let Some(element_kind) = element_kind {
                    if !member_kind.is_subtype_of(element_kind) {
                        return Err(GeometryError::invalid(format!(
                            "element {} of {} is a {}, expected {}",
                            i, kind, member_kind, element_kind
                        )));
                    }
                }
                check_structure(*member_kind, member).map_err(|e| {
                    GeometryError::invalid(format!("element {} of {}: {}", i, kind, e))
                })?;
            }
            Ok(())
        }
        (kind, _) => Err(GeometryError::invalid(format!("structure does not describe a {}", kind))),
    }
}

/// Every ordinate, extra ones included, must be finite.
fn check_finite(structure: &Structure) -> Result<()> {
    let mut bad = None;
    structure.for_each_coord(&mut |c| {
        if bad.is_none() && !c.is_finite() {
            bad = Some(*c);
        }
    });
    match bad {
        Some(c) => Err(GeometryError::invalid(format!(
            "coordinate ({} {}) has a non-finite ordinate",
            c.x, c.y
        ))),
        None => Ok(()),
    }
}

/// Close a ring in place; a closed ring has zero or at least four points.
fn close_ring(coords: &mut Vec<Coord4>) -> Result<()> {
    if let (Some(first), Some(last)) = (coords.first().copied(), coords.last()) {
        if !first.same_xy(last) {
            coords.push(first);
        }
    }
    if !coords.is_empty() && coords.len() < 4 {
        return Err(GeometryError::invalid(format!(
            "a closed ring needs at least four points, got {}",
            coords.len()
        )));
    }
    Ok(())
}

// ============================================================================
// Input lowering, shared with combined factories
// ============================================================================

/// Coordinates of point inputs, in order.
pub(crate) fn lower_path(
    points: impl IntoIterator<Item = (GeometryKind, Structure)>,
) -> Result<Structure> {
    let coords = points
        .into_iter()
        .enumerate()
        .map(|(i, (kind, structure))| match structure {
            Structure::Point(c) => Ok(c),
            _ => {
                Err(GeometryError::invalid(format!("point {} is a {}, expected a Point", i, kind)))
            }
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Structure::LineString(coords))
}

/// Rings of line string kind inputs, in order.
pub(crate) fn lower_rings(
    rings: impl IntoIterator<Item = (GeometryKind, Structure)>,
) -> Result<Structure> {
    let rings = rings
        .into_iter()
        .enumerate()
        .map(|(i, (kind, structure))| match structure {
            Structure::LineString(coords) if kind.is_line_string_family() => Ok(coords),
            _ => Err(GeometryError::invalid(format!(
                "ring {} is a {}, expected a line string",
                i, kind
            ))),
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Structure::Polygon(rings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord_sys::SRID_WGS84;

    fn factory() -> Factory {
        Factory::new(FactoryConfig::default()).unwrap()
    }

    #[test]
    fn test_both_extra_ordinates_rejected() {
        let err = Factory::new(FactoryConfig::default().with_z(true).with_m(true)).unwrap_err();
        assert!(matches!(err, GeometryError::Configuration(_)));
    }

    #[test]
    fn test_zero_buffer_resolution_rejected() {
        let err = Factory::new(FactoryConfig::default().with_buffer_resolution(0)).unwrap_err();
        assert!(matches!(err, GeometryError::Configuration(_)));
    }

    #[test]
    fn test_srid_resolution() {
        let f = Factory::new(FactoryConfig::new(SRID_WGS84)).unwrap();
        assert_eq!(f.coordinate_system(), Some(&CoordinateSystem::wgs84()));
        assert!(!f.is_cartesian());

        let f = Factory::new(
            FactoryConfig::default().with_coordinate_system(CoordinateSystem::web_mercator()),
        )
        .unwrap();
        assert_eq!(f.srid(), 3857);
        assert_eq!(f.config().srid, 0);
        assert_eq!(f.property("srid"), Some(PropertyValue::Int(3857)));
        assert!(f.is_cartesian());

        let f = Factory::new(FactoryConfig::new(99999)).unwrap();
        assert_eq!(f.coordinate_system(), None);
        assert!(f.is_cartesian());
    }

    #[test]
    fn test_identity_follows_supplied_config() {
        let by_srid = Factory::new(FactoryConfig::new(SRID_WGS84)).unwrap();
        let explicit = Factory::new(
            FactoryConfig::new(SRID_WGS84).with_coordinate_system(CoordinateSystem::wgs84()),
        )
        .unwrap();
        assert_eq!(by_srid.srid(), explicit.srid());
        assert_eq!(by_srid.coordinate_system(), explicit.coordinate_system());
        assert_ne!(by_srid, explicit);

        let again = Factory::new(FactoryConfig::new(SRID_WGS84)).unwrap();
        assert_eq!(by_srid, again);
        assert_eq!(
            serde_json::to_value(&by_srid).unwrap(),
            serde_json::to_value(by_srid.config()).unwrap()
        );
    }

    #[test]
    fn test_non_finite_ordinates_rejected() {
        let f = factory();
        for ordinates in [[f64::NAN, 0.0], [0.0, f64::INFINITY]] {
            assert!(matches!(
                f.point(&ordinates).unwrap_err(),
                GeometryError::InvalidGeometry(_)
            ));
        }

        let z = Factory::new(FactoryConfig::default().with_z(true)).unwrap();
        assert!(z.point(&[0.0, 0.0, f64::NAN]).is_err());
        assert!(z.point(&[0.0, 0.0, 1.0]).is_ok());

        let structure =
            Structure::LineString(vec![Coord4::xy(0.0, 0.0), Coord4::xy(f64::NAN, 1.0)]);
        assert!(f.build(GeometryKind::LineString, structure).is_err());
    }

    #[test]
    fn test_property_lookup() {
        let f = Factory::new(FactoryConfig::new(SRID_WGS84).with_m(true)).unwrap();
        assert_eq!(
            f.property("has_m_coordinate"),
            Some(PropertyValue::Bool(true))
        );
        assert_eq!(
            f.property("has_z_coordinate"),
            Some(PropertyValue::Bool(false))
        );
        assert_eq!(f.property("srid"), Some(PropertyValue::Int(4326)));
        assert_eq!(f.property("buffer_resolution"), Some(PropertyValue::Int(1)));
        assert_eq!(
            f.property("auto_prepare"),
            Some(PropertyValue::AutoPrepare(AutoPrepareMode::Simple))
        );
        assert_eq!(f.property("is_cartesian"), Some(PropertyValue::Bool(false)));
        assert_eq!(f.property("no_such_property"), None);
    }

    #[test]
    fn test_point_ordinate_count() {
        let f = factory();
        assert!(f.point(&[1.0, 2.0]).is_ok());
        assert!(matches!(
            f.point(&[1.0, 2.0, 3.0]).unwrap_err(),
            GeometryError::InvalidGeometry(_)
        ));
        assert!(f.point(&[1.0]).is_err());
    }

    #[test]
    fn test_line_string_point_count() {
        let f = factory();
        let a = f.point(&[0.0, 0.0]).unwrap();
        let b = f.point(&[1.0, 1.0]).unwrap();
        assert!(f.line_string(&[]).is_ok());
        assert!(f.line_string(&[a.clone()]).is_err());
        assert!(f.line_string(&[a.clone(), b.clone()]).is_ok());
        assert!(f.line(&a, &b).is_ok());
    }

    #[test]
    fn test_linear_ring_closes() {
        let f = factory();
        let pts: Vec<Geometry> = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]]
            .iter()
            .map(|c| f.point(c).unwrap())
            .collect();
        let ring = f.linear_ring(&pts).unwrap();
        assert_eq!(ring.kind(), GeometryKind::LinearRing);
        assert_eq!(ring.num_points(), 4);
        assert!(ring.is_closed());

        assert!(f.linear_ring(&pts[..2]).is_err());
    }

    #[test]
    fn test_multi_point_coerces_elements() {
        let f = factory();
        let p = f.point(&[1.0, 1.0]).unwrap();
        let single = f.multi_point(&[p.clone()]).unwrap();
        let multi = f.multi_point(&[p, single]).unwrap();
        assert_eq!(multi.num_geometries(), 2);
        assert_eq!(multi.geometry_n(1).unwrap().kind(), GeometryKind::Point);

        let line = f
            .line_string(&[f.point(&[0.0, 0.0]).unwrap(), f.point(&[1.0, 0.0]).unwrap()])
            .unwrap();
        let err = f.multi_point(&[line]).unwrap_err();
        assert!(err.to_string().contains("element 0"));
    }

    #[test]
    fn test_multi_polygon_overlap_check() {
        let f = factory();
        let a = f.parse_wkt("POLYGON((0 0, 2 0, 2 2, 0 2, 0 0))").unwrap();
        let b = f.parse_wkt("POLYGON((1 1, 3 1, 3 3, 1 3, 1 1))").unwrap();
        let c = f.parse_wkt("POLYGON((2 0, 4 0, 4 2, 2 2, 2 0))").unwrap();
        let far = f.parse_wkt("POLYGON((10 10, 11 10, 11 11, 10 10))").unwrap();

        assert!(f.multi_polygon(&[a.clone(), far]).is_ok());
        assert!(f.multi_polygon(&[a.clone(), b.clone()]).is_err());
        assert!(f.multi_polygon(&[a.clone(), c.clone()]).is_err());

        let lenient =
            Factory::new(FactoryConfig::default().with_lenient_multi_polygon_assertions(true))
                .unwrap();
        assert!(lenient.multi_polygon(&[a, b]).is_ok());
    }

    #[test]
    fn test_build_table_matches_kinds() {
        let f = factory();
        let structure = Structure::LineString(vec![Coord4::xy(0.0, 0.0), Coord4::xy(1.0, 1.0)]);
        for kind in [GeometryKind::LineString, GeometryKind::Line] {
            assert_eq!(f.build(kind, structure.clone()).unwrap().kind(), kind);
        }
        assert!(f.build(GeometryKind::Polygon, structure).is_err());
    }
}
