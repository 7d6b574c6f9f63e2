//! Geometry kind discriminator.

use geo_types::Geometry as GeoGeometry;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Concrete geometry kind.
///
/// `Line` and `LinearRing` share the engine's line string representation, so
/// they can only be recovered from how a geometry was constructed, never from
/// the native shape alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum GeometryKind {
    Point = 0,
    LineString = 1,
    Line = 2,
    LinearRing = 3,
    Polygon = 4,
    GeometryCollection = 5,
    MultiPoint = 6,
    MultiLineString = 7,
    MultiPolygon = 8,
}

impl GeometryKind {
    /// Classify a native shape. Collections of the line family infer as
    /// `LineString`; the manifest is what preserves finer kinds.
    pub fn infer(shape: &GeoGeometry<f64>) -> Self {
        match shape {
            GeoGeometry::Point(_) => GeometryKind::Point,
            GeoGeometry::Line(_) => GeometryKind::Line,
            GeoGeometry::LineString(_) => GeometryKind::LineString,
            GeoGeometry::Polygon(_) | GeoGeometry::Rect(_) | GeoGeometry::Triangle(_) => {
                GeometryKind::Polygon
            }
            GeoGeometry::MultiPoint(_) => GeometryKind::MultiPoint,
            GeoGeometry::MultiLineString(_) => GeometryKind::MultiLineString,
            GeoGeometry::MultiPolygon(_) => GeometryKind::MultiPolygon,
            GeoGeometry::GeometryCollection(_) => GeometryKind::GeometryCollection,
        }
    }

    /// LineString, Line or LinearRing.
    pub fn is_line_string_family(&self) -> bool {
        matches!(
            self,
            GeometryKind::LineString | GeometryKind::Line | GeometryKind::LinearRing
        )
    }

    /// Kinds that hold child geometries.
    pub fn is_collection(&self) -> bool {
        matches!(
            self,
            GeometryKind::GeometryCollection
                | GeometryKind::MultiPoint
                | GeometryKind::MultiLineString
                | GeometryKind::MultiPolygon
        )
    }

    /// Required element kind for homogeneous collections.
    pub fn element_kind(&self) -> Option<GeometryKind> {
        match self {
            GeometryKind::MultiPoint => Some(GeometryKind::Point),
            GeometryKind::MultiLineString => Some(GeometryKind::LineString),
            GeometryKind::MultiPolygon => Some(GeometryKind::Polygon),
            _ => None,
        }
    }

    /// Whether `self` is `other` or one of its subtypes.
    pub fn is_subtype_of(&self, other: GeometryKind) -> bool {
        if *self == other {
            return true;
        }
        match other {
            GeometryKind::LineString => self.is_line_string_family(),
            GeometryKind::GeometryCollection => self.is_collection(),
            _ => false,
        }
    }

    /// WKT keyword for this kind. Line and LinearRing are written as line strings.
    pub fn wkt_keyword(&self) -> &'static str {
        match self {
            GeometryKind::Point => "POINT",
            GeometryKind::LineString | GeometryKind::Line | GeometryKind::LinearRing => {
                "LINESTRING"
            }
            GeometryKind::Polygon => "POLYGON",
            GeometryKind::GeometryCollection => "GEOMETRYCOLLECTION",
            GeometryKind::MultiPoint => "MULTIPOINT",
            GeometryKind::MultiLineString => "MULTILINESTRING",
            GeometryKind::MultiPolygon => "MULTIPOLYGON",
        }
    }
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GeometryKind::Point => "Point",
            GeometryKind::LineString => "LineString",
            GeometryKind::Line => "Line",
            GeometryKind::LinearRing => "LinearRing",
            GeometryKind::Polygon => "Polygon",
            GeometryKind::GeometryCollection => "GeometryCollection",
            GeometryKind::MultiPoint => "MultiPoint",
            GeometryKind::MultiLineString => "MultiLineString",
            GeometryKind::MultiPolygon => "MultiPolygon",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{line_string, point};

    #[test]
    fn test_infer() {
        let pt: GeoGeometry<f64> = point!(x: 1.0, y: 2.0).into();
        assert_eq!(GeometryKind::infer(&pt), GeometryKind::Point);

        let ls: GeoGeometry<f64> = line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)].into();
        assert_eq!(GeometryKind::infer(&ls), GeometryKind::LineString);
    }

    #[test]
    fn test_subtypes() {
        assert!(GeometryKind::LinearRing.is_subtype_of(GeometryKind::LineString));
        assert!(GeometryKind::MultiPoint.is_subtype_of(GeometryKind::GeometryCollection));
        assert!(!GeometryKind::LineString.is_subtype_of(GeometryKind::Line));
        assert!(!GeometryKind::Polygon.is_subtype_of(GeometryKind::GeometryCollection));
    }
}
