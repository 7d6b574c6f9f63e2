//! [`GeometryEngine`] implementation on top of the `geo` crate.

use super::overlay;
use super::prepared_index::SegmentIndex;
use super::{BinaryPredicate, GeometryEngine, NativeGeometry, OverlayOp, PreparedIndex, UnaryOp};
use crate::capability::EngineCapabilities;
use crate::error::{GeometryError, Result};
use geo::coordinate_position::CoordPos;
use geo::dimensions::Dimensions;
use geo::{Area, Distance, Euclidean, HasDimensions, Length, Relate};
use geo_types::{Coord, Geometry as GeoGeometry, Line, LineString};
use std::sync::{Arc, OnceLock};

/// Engine backed by `geo` algorithms, with `rstar` segment trees as
/// prepared indexes.
#[derive(Debug, Clone)]
pub struct GeoEngine {
    capabilities: EngineCapabilities,
}

impl GeoEngine {
    /// Engine advertising every acceleration tier.
    pub fn new() -> Self {
        Self {
            capabilities: EngineCapabilities::FULL,
        }
    }

    /// Engine advertising a restricted capability set, as a build without
    /// (some) prepared geometry support would.
    pub fn with_capabilities(capabilities: EngineCapabilities) -> Self {
        Self { capabilities }
    }

    /// Process-wide engine instance, created on first use.
    pub fn shared() -> Arc<GeoEngine> {
        static ENGINE: OnceLock<Arc<GeoEngine>> = OnceLock::new();
        ENGINE.get_or_init(|| Arc::new(GeoEngine::new())).clone()
    }
}

impl Default for GeoEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl GeometryEngine for GeoEngine {
    fn capabilities(&self) -> EngineCapabilities {
        self.capabilities
    }

    fn predicate(
        &self,
        predicate: BinaryPredicate,
        a: &NativeGeometry,
        b: &NativeGeometry,
    ) -> Result<bool> {
        evaluate_predicate(predicate, a.shape(), b.shape())
    }

    fn relate(&self, a: &NativeGeometry, b: &NativeGeometry) -> Result<String> {
        Ok(relate_matrix(a.shape(), b.shape()))
    }

    fn relate_pattern(
        &self,
        a: &NativeGeometry,
        b: &NativeGeometry,
        pattern: &str,
    ) -> Result<bool> {
        validate_pattern(pattern)?;
        let matrix = a.shape().relate(b.shape());
        matrix
            .matches(pattern)
            .map_err(|_| GeometryError::engine(format!("invalid DE-9IM pattern: {}", pattern)))
    }

    fn distance(&self, a: &NativeGeometry, b: &NativeGeometry) -> Result<f64> {
        Ok(min_distance(a.shape(), b.shape()))
    }

    fn area(&self, a: &NativeGeometry) -> Result<f64> {
        Ok(a.shape().unsigned_area())
    }

    fn length(&self, a: &NativeGeometry) -> Result<f64> {
        let mut total = 0.0;
        for_each_linework(a.shape(), &mut |ls| total += ls.length::<Euclidean>());
        Ok(total)
    }

    fn unary(&self, op: UnaryOp, a: &NativeGeometry) -> Result<NativeGeometry> {
        let shape = match op {
            UnaryOp::Envelope => overlay::envelope(a.shape()),
            UnaryOp::Boundary => overlay::boundary(a.shape())?,
            UnaryOp::ConvexHull => overlay::convex_hull(a.shape()),
        };
        NativeGeometry::derived(shape, &[a])
    }

    fn buffer(
        &self,
        a: &NativeGeometry,
        distance: f64,
        resolution: u32,
    ) -> Result<NativeGeometry> {
        let shape = overlay::buffer(a.shape(), distance, resolution)?;
        NativeGeometry::derived(shape, &[a])
    }

    fn overlay(
        &self,
        op: OverlayOp,
        a: &NativeGeometry,
        b: &NativeGeometry,
    ) -> Result<NativeGeometry> {
        let shape = overlay::overlay(op, a.shape(), b.shape())?;
        NativeGeometry::derived(shape, &[a, b])
    }

    fn prepare(&self, a: &NativeGeometry) -> Result<Box<dyn PreparedIndex>> {
        Ok(Box::new(SegmentIndex::build(a.shape().clone())))
    }
}

/// Topological dimension of a shape; -1 when empty.
pub(crate) fn dimension(shape: &GeoGeometry<f64>) -> i8 {
    match shape.dimensions() {
        Dimensions::Empty => -1,
        Dimensions::ZeroDimensional => 0,
        Dimensions::OneDimensional => 1,
        Dimensions::TwoDimensional => 2,
    }
}

/// Plain predicate evaluation through the DE-9IM matrix.
pub(crate) fn evaluate_predicate(
    predicate: BinaryPredicate,
    a: &GeoGeometry<f64>,
    b: &GeoGeometry<f64>,
) -> Result<bool> {
    let matrix = a.relate(b);
    Ok(match predicate {
        BinaryPredicate::Intersects => matrix.is_intersects(),
        BinaryPredicate::Disjoint => matrix.is_disjoint(),
        BinaryPredicate::Contains => matrix.is_contains(),
        BinaryPredicate::Within => matrix.is_within(),
        BinaryPredicate::Equals => matrix.is_equal_topo(),
        BinaryPredicate::Touches => matrix.is_touches(),
        BinaryPredicate::Crosses => matrix.is_crosses(),
        BinaryPredicate::Overlaps => matrix.is_overlaps(),
    })
}

fn validate_pattern(pattern: &str) -> Result<()> {
    let valid = pattern.len() == 9
        && pattern
            .chars()
            .all(|c| matches!(c, 'T' | 't' | 'F' | 'f' | '*' | '0' | '1' | '2'));
    if valid {
        Ok(())
    } else {
        Err(GeometryError::engine(format!("invalid DE-9IM pattern: {}", pattern)))
    }
}

const MATRIX_POSITIONS: [CoordPos; 3] = [CoordPos::Inside, CoordPos::OnBoundary, CoordPos::Outside];

/// DE-9IM matrix string in row-major order.
fn relate_matrix(a: &GeoGeometry<f64>, b: &GeoGeometry<f64>) -> String {
    let matrix = a.relate(b);
    let mut out = String::with_capacity(9);
    for lhs in MATRIX_POSITIONS {
        for rhs in MATRIX_POSITIONS {
            out.push(match matrix.get(lhs, rhs) {
                Dimensions::Empty => 'F',
                Dimensions::ZeroDimensional => '0',
                Dimensions::OneDimensional => '1',
                Dimensions::TwoDimensional => '2',
            });
        }
    }
    out
}

/// Visit every line string and polygon ring in a shape.
pub(crate) fn for_each_linework<'a>(
    shape: &'a GeoGeometry<f64>,
    f: &mut impl FnMut(&'a LineString<f64>),
) {
    match shape {
        GeoGeometry::LineString(ls) => f(ls),
        GeoGeometry::MultiLineString(mls) => mls.0.iter().for_each(f),
        GeoGeometry::Polygon(p) => {
            f(p.exterior());
            p.interiors().iter().for_each(f);
        }
        GeoGeometry::MultiPolygon(mp) => {
            for p in &mp.0 {
                f(p.exterior());
                p.interiors().iter().for_each(&mut *f);
            }
        }
        GeoGeometry::GeometryCollection(gc) => {
            for member in &gc.0 {
                for_each_linework(member, f);
            }
        }
        GeoGeometry::Point(_)
        | GeoGeometry::MultiPoint(_)
        | GeoGeometry::Line(_)
        | GeoGeometry::Rect(_)
        | GeoGeometry::Triangle(_) => {}
    }
}

/// Isolated points and segments of a shape.
pub(crate) fn primitives(shape: &GeoGeometry<f64>) -> (Vec<Coord<f64>>, Vec<Line<f64>>) {
    let mut points = Vec::new();
    let mut segments = Vec::new();
    collect_points(shape, &mut points);
    for_each_linework(shape, &mut |ls| match ls.0.len() {
        0 => {}
        1 => points.push(ls.0[0]),
        _ => segments.extend(ls.lines()),
    });
    (points, segments)
}

fn collect_points(shape: &GeoGeometry<f64>, out: &mut Vec<Coord<f64>>) {
    match shape {
        GeoGeometry::Point(p) => out.push(p.0),
        GeoGeometry::MultiPoint(mp) => out.extend(mp.0.iter().map(|p| p.0)),
        GeoGeometry::GeometryCollection(gc) => {
            for member in &gc.0 {
                collect_points(member, out);
            }
        }
        _ => {}
    }
}

/// Minimum planar distance. Zero when the shapes intersect or either is empty.
fn min_distance(a: &GeoGeometry<f64>, b: &GeoGeometry<f64>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    Euclidean::distance(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_shape as wkt;

    #[test]
    fn test_predicates_via_matrix() {
        let square = wkt("POLYGON((0 0, 10 0, 10 10, 0 10, 0 0))");
        let inner = wkt("POINT(5 5)");
        let edge = wkt("POINT(10 5)");
        let line = wkt("LINESTRING(-5 5, 15 5)");

        assert!(evaluate_predicate(BinaryPredicate::Contains, &square, &inner).unwrap());
        assert!(evaluate_predicate(BinaryPredicate::Within, &inner, &square).unwrap());
        assert!(evaluate_predicate(BinaryPredicate::Touches, &square, &edge).unwrap());
        assert!(evaluate_predicate(BinaryPredicate::Crosses, &line, &square).unwrap());
        assert!(!evaluate_predicate(BinaryPredicate::Disjoint, &line, &square).unwrap());
    }

    #[test]
    fn test_overlaps() {
        let a = wkt("POLYGON((0 0, 10 0, 10 10, 0 10, 0 0))");
        let b = wkt("POLYGON((5 5, 15 5, 15 15, 5 15, 5 5))");
        let c = wkt("POLYGON((20 20, 30 20, 30 30, 20 20))");
        assert!(evaluate_predicate(BinaryPredicate::Overlaps, &a, &b).unwrap());
        assert!(!evaluate_predicate(BinaryPredicate::Overlaps, &a, &c).unwrap());
    }

    #[test]
    fn test_relate_matrix_string() {
        let a = wkt("POLYGON((0 0, 10 0, 10 10, 0 10, 0 0))");
        let b = wkt("POINT(5 5)");
        assert_eq!(relate_matrix(&a, &b), "0F2FF1FF2");

        let line = wkt("LINESTRING(0 0, 10 0)");
        let crossing = wkt("LINESTRING(5 -5, 5 5)");
        assert_eq!(relate_matrix(&line, &crossing), "0F1FF0102");
    }

    #[test]
    fn test_dimension_from_shape() {
        assert_eq!(dimension(&wkt("POINT(1 2)")), 0);
        assert_eq!(dimension(&wkt("LINESTRING(0 0, 1 1)")), 1);
        assert_eq!(dimension(&wkt("POLYGON((0 0, 1 0, 1 1, 0 0))")), 2);
        assert_eq!(
            dimension(&wkt("GEOMETRYCOLLECTION(POINT(0 0), LINESTRING(0 0, 1 1))")),
            1
        );
        assert_eq!(dimension(&wkt("MULTIPOINT EMPTY")), -1);
    }

    #[test]
    fn test_equals_and_touches_from_matrix() {
        let a = wkt("LINESTRING(0 0, 10 0)");
        let reversed = wkt("LINESTRING(10 0, 5 0, 0 0)");
        let end = wkt("LINESTRING(10 0, 10 10)");
        assert!(evaluate_predicate(BinaryPredicate::Equals, &a, &reversed).unwrap());
        assert!(evaluate_predicate(BinaryPredicate::Touches, &a, &end).unwrap());
        assert!(!evaluate_predicate(BinaryPredicate::Touches, &a, &reversed).unwrap());
    }

    #[test]
    fn test_distance() {
        let a = wkt("LINESTRING(0 0, 10 0)");
        let b = wkt("POINT(5 3)");
        assert_eq!(min_distance(&a, &b), 3.0);

        let square = wkt("POLYGON((0 0, 10 0, 10 10, 0 10, 0 0))");
        let inside = wkt("POINT(5 5)");
        assert_eq!(min_distance(&square, &inside), 0.0);

        let far = wkt("POLYGON((20 0, 30 0, 30 10, 20 10, 20 0))");
        assert_eq!(min_distance(&square, &far), 10.0);
        assert_eq!(min_distance(&a, &wkt("MULTIPOINT EMPTY")), 0.0);
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        assert!(validate_pattern("T*F**FFF*").is_ok());
        assert!(validate_pattern("T*F").is_err());
        assert!(validate_pattern("X********").is_err());
    }
}
