//! Geometry producing operations: overlays, buffers, envelopes, boundaries
//! and convex hulls.
//!
//! Overlays are supported for the dimension combinations `geo` can compute
//! exactly (areal/areal via `BooleanOps`, lineal/areal via clipping, puntal
//! against anything via point location). Line/line overlays need noding,
//! which this engine build does not provide; they fail with an engine error.

use super::geo_engine::{for_each_linework, primitives};
use super::OverlayOp;
use crate::error::{GeometryError, Result};
use geo::{Area, BooleanOps, BoundingRect, ConvexHull, CoordsIter, Intersects};
use geo_types::{
    Coord, Geometry as GeoGeometry, GeometryCollection, Line, LineString, MultiLineString,
    MultiPoint, MultiPolygon, Point, Polygon,
};
use std::f64::consts::PI;

/// Dimension class of an overlay operand.
enum Class {
    Empty,
    Puntal(MultiPoint<f64>),
    Lineal(MultiLineString<f64>),
    Areal(MultiPolygon<f64>),
    Mixed,
}

fn classify(shape: &GeoGeometry<f64>) -> Class {
    match shape {
        _ if shape.coords_count() == 0 => Class::Empty,
        GeoGeometry::Point(p) => Class::Puntal(MultiPoint::new(vec![*p])),
        GeoGeometry::MultiPoint(mp) => Class::Puntal(mp.clone()),
        GeoGeometry::Line(l) => {
            Class::Lineal(MultiLineString::new(vec![LineString::new(vec![l.start, l.end])]))
        }
        GeoGeometry::LineString(ls) => Class::Lineal(MultiLineString::new(vec![ls.clone()])),
        GeoGeometry::MultiLineString(mls) => Class::Lineal(mls.clone()),
        GeoGeometry::Polygon(p) => Class::Areal(MultiPolygon::new(vec![p.clone()])),
        GeoGeometry::MultiPolygon(mp) => Class::Areal(mp.clone()),
        GeoGeometry::Rect(r) => Class::Areal(MultiPolygon::new(vec![r.to_polygon()])),
        GeoGeometry::Triangle(t) => Class::Areal(MultiPolygon::new(vec![t.to_polygon()])),
        GeoGeometry::GeometryCollection(gc) => {
            let mut points = Vec::new();
            let mut lines = Vec::new();
            let mut polygons = Vec::new();
            for member in &gc.0 {
                match classify(member) {
                    Class::Empty => {}
                    Class::Puntal(mp) => points.extend(mp.0),
                    Class::Lineal(mls) => lines.extend(mls.0),
                    Class::Areal(mp) => polygons.extend(mp.0),
                    Class::Mixed => return Class::Mixed,
                }
            }
            match (points.is_empty(), lines.is_empty(), polygons.is_empty()) {
                (false, true, true) => Class::Puntal(MultiPoint::new(points)),
                (true, false, true) => Class::Lineal(MultiLineString::new(lines)),
                (true, true, false) => Class::Areal(MultiPolygon::new(polygons)),
                (true, true, true) => Class::Empty,
                _ => Class::Mixed,
            }
        }
    }
}

pub(crate) fn empty() -> GeoGeometry<f64> {
    GeoGeometry::GeometryCollection(GeometryCollection(Vec::new()))
}

/// Collapse single-member and empty multi geometries.
fn simplify(shape: GeoGeometry<f64>) -> GeoGeometry<f64> {
    match shape {
        GeoGeometry::MultiPolygon(mut mp) => match mp.0.len() {
            0 => empty(),
            1 => GeoGeometry::Polygon(mp.0.remove(0)),
            _ => GeoGeometry::MultiPolygon(mp),
        },
        GeoGeometry::MultiLineString(mut mls) => match mls.0.len() {
            0 => empty(),
            1 => GeoGeometry::LineString(mls.0.remove(0)),
            _ => GeoGeometry::MultiLineString(mls),
        },
        GeoGeometry::MultiPoint(mut mp) => match mp.0.len() {
            0 => empty(),
            1 => GeoGeometry::Point(mp.0.remove(0)),
            _ => GeoGeometry::MultiPoint(mp),
        },
        other => other,
    }
}

fn unsupported(op: OverlayOp) -> GeometryError {
    GeometryError::engine(format!(
        "{:?} is not supported for this combination of geometry dimensions",
        op
    ))
}

fn filter_points(
    points: &MultiPoint<f64>,
    other: &GeoGeometry<f64>,
    keep_inside: bool,
) -> MultiPoint<f64> {
    MultiPoint::new(
        points
            .0
            .iter()
            .filter(|p| other.intersects(*p) == keep_inside)
            .copied()
            .collect(),
    )
}

fn dedup_points(points: impl IntoIterator<Item = Point<f64>>) -> MultiPoint<f64> {
    let mut out: Vec<Point<f64>> = Vec::new();
    for p in points {
        if !out.contains(&p) {
            out.push(p);
        }
    }
    MultiPoint::new(out)
}

/// Compute an overlay of two shapes.
pub(crate) fn overlay(
    op: OverlayOp,
    a: &GeoGeometry<f64>,
    b: &GeoGeometry<f64>,
) -> Result<GeoGeometry<f64>> {
    let result = match op {
        OverlayOp::Intersection => match (classify(a), classify(b)) {
            (Class::Empty, _) | (_, Class::Empty) => empty(),
            (Class::Mixed, _) | (_, Class::Mixed) => return Err(unsupported(op)),
            (Class::Areal(pa), Class::Areal(pb)) => GeoGeometry::MultiPolygon(pa.intersection(&pb)),
            (Class::Lineal(l), Class::Areal(p)) | (Class::Areal(p), Class::Lineal(l)) => {
                GeoGeometry::MultiLineString(p.clip(&l, false))
            }
            (Class::Puntal(pts), _) => GeoGeometry::MultiPoint(filter_points(&pts, b, true)),
            (_, Class::Puntal(pts)) => GeoGeometry::MultiPoint(filter_points(&pts, a, true)),
            (Class::Lineal(_), Class::Lineal(_)) => return Err(unsupported(op)),
        },
        OverlayOp::Union => match (classify(a), classify(b)) {
            (Class::Empty, _) => b.clone(),
            (_, Class::Empty) => a.clone(),
            (Class::Mixed, _) | (_, Class::Mixed) => return Err(unsupported(op)),
            (Class::Areal(pa), Class::Areal(pb)) => GeoGeometry::MultiPolygon(pa.union(&pb)),
            (Class::Puntal(pa), Class::Puntal(pb)) => {
                GeoGeometry::MultiPoint(dedup_points(pa.0.into_iter().chain(pb.0)))
            }
            (Class::Puntal(pts), _) => union_with_points(b, &pts),
            (_, Class::Puntal(pts)) => union_with_points(a, &pts),
            (Class::Lineal(l), Class::Areal(p)) | (Class::Areal(p), Class::Lineal(l)) => {
                let outside = p.clip(&l, true);
                let mut members: Vec<GeoGeometry<f64>> =
                    p.0.into_iter().map(GeoGeometry::Polygon).collect();
                members.extend(outside.0.into_iter().map(GeoGeometry::LineString));
                GeoGeometry::GeometryCollection(GeometryCollection(members))
            }
            (Class::Lineal(_), Class::Lineal(_)) => return Err(unsupported(op)),
        },
        OverlayOp::Difference => match (classify(a), classify(b)) {
            (Class::Empty, _) => empty(),
            (_, Class::Empty) => a.clone(),
            (Class::Mixed, _) | (_, Class::Mixed) => return Err(unsupported(op)),
            (Class::Areal(pa), Class::Areal(pb)) => GeoGeometry::MultiPolygon(pa.difference(&pb)),
            (Class::Areal(_), _) => a.clone(),
            (Class::Lineal(l), Class::Areal(p)) => GeoGeometry::MultiLineString(p.clip(&l, true)),
            (Class::Lineal(_), Class::Puntal(_)) => a.clone(),
            (Class::Puntal(pts), _) => GeoGeometry::MultiPoint(filter_points(&pts, b, false)),
            (Class::Lineal(_), Class::Lineal(_)) => return Err(unsupported(op)),
        },
        OverlayOp::SymDifference => match (classify(a), classify(b)) {
            (Class::Empty, _) => b.clone(),
            (_, Class::Empty) => a.clone(),
            (Class::Areal(pa), Class::Areal(pb)) => GeoGeometry::MultiPolygon(pa.xor(&pb)),
            (Class::Puntal(pa), Class::Puntal(pb)) => {
                let only_a = pa.0.iter().filter(|p| !pb.0.contains(p)).copied();
                let only_b = pb.0.iter().filter(|p| !pa.0.contains(p)).copied();
                GeoGeometry::MultiPoint(dedup_points(only_a.chain(only_b)))
            }
            _ => return Err(unsupported(op)),
        },
    };
    Ok(simplify(result))
}

fn union_with_points(shape: &GeoGeometry<f64>, points: &MultiPoint<f64>) -> GeoGeometry<f64> {
    let outside = filter_points(points, shape, false);
    if outside.0.is_empty() {
        return shape.clone();
    }
    let mut members = match shape {
        GeoGeometry::GeometryCollection(gc) => gc.0.clone(),
        other => vec![other.clone()],
    };
    members.extend(outside.0.into_iter().map(GeoGeometry::Point));
    GeoGeometry::GeometryCollection(GeometryCollection(members))
}

/// Bounding box as a point, line string or polygon, depending on extent.
pub(crate) fn envelope(shape: &GeoGeometry<f64>) -> GeoGeometry<f64> {
    let Some(rect) = shape.bounding_rect() else {
        return empty();
    };
    let (min, max) = (rect.min(), rect.max());
    if min == max {
        GeoGeometry::Point(Point(min))
    } else if min.x == max.x || min.y == max.y {
        GeoGeometry::LineString(LineString::new(vec![min, max]))
    } else {
        GeoGeometry::Polygon(rect.to_polygon())
    }
}

/// Topological boundary. Geometry collections have no defined boundary.
pub(crate) fn boundary(shape: &GeoGeometry<f64>) -> Result<GeoGeometry<f64>> {
    let result = match shape {
        GeoGeometry::Point(_) | GeoGeometry::MultiPoint(_) => empty(),
        GeoGeometry::Line(_) | GeoGeometry::LineString(_) | GeoGeometry::MultiLineString(_) => {
            let mut endpoints: Vec<(Coord<f64>, usize)> = Vec::new();
            let mut lines = Vec::new();
            for_each_linework(shape, &mut |ls| lines.push(ls.clone()));
            if let GeoGeometry::Line(l) = shape {
                lines.push(LineString::new(vec![l.start, l.end]));
            }
            for ls in lines.iter().filter(|ls| ls.0.len() >= 2 && !ls.is_closed()) {
                for c in [ls.0[0], ls.0[ls.0.len() - 1]] {
                    match endpoints.iter_mut().find(|(e, _)| *e == c) {
                        Some((_, count)) => *count += 1,
                        None => endpoints.push((c, 1)),
                    }
                }
            }
            // mod-2 rule: endpoints shared by an even number of lines are interior
            GeoGeometry::MultiPoint(MultiPoint::new(
                endpoints
                    .into_iter()
                    .filter(|(_, count)| count % 2 == 1)
                    .map(|(c, _)| Point(c))
                    .collect(),
            ))
        }
        GeoGeometry::Polygon(_)
        | GeoGeometry::MultiPolygon(_)
        | GeoGeometry::Rect(_)
        | GeoGeometry::Triangle(_) => {
            let normalized = super::normalize(shape.clone());
            let mut rings = Vec::new();
            for_each_linework(&normalized, &mut |ls| {
                if !ls.0.is_empty() {
                    rings.push(ls.clone())
                }
            });
            GeoGeometry::MultiLineString(MultiLineString::new(rings))
        }
        GeoGeometry::GeometryCollection(_) => {
            return Err(GeometryError::engine("boundary is not defined for geometry collections"))
        }
    };
    Ok(simplify(result))
}

/// Smallest convex geometry containing every vertex.
pub(crate) fn convex_hull(shape: &GeoGeometry<f64>) -> GeoGeometry<f64> {
    let points = dedup_points(shape.coords_iter().map(Point));
    match points.0.len() {
        0 => empty(),
        1 => GeoGeometry::Point(points.0[0]),
        _ => {
            let hull = points.convex_hull();
            if hull.unsigned_area() > 0.0 {
                return GeoGeometry::Polygon(hull);
            }
            // collinear input: the hull is the segment between the extreme points
            let key = |p: &&Point<f64>| (p.x(), p.y());
            let by_xy = |a: &&Point<f64>, b: &&Point<f64>| {
                key(a).partial_cmp(&key(b)).unwrap_or(std::cmp::Ordering::Equal)
            };
            match (points.0.iter().min_by(by_xy), points.0.iter().max_by(by_xy)) {
                (Some(lo), Some(hi)) => GeoGeometry::LineString(LineString::new(vec![lo.0, hi.0])),
                _ => empty(),
            }
        }
    }
}

/// Circle approximation with `4 * resolution` segments.
fn circle_points(center: Coord<f64>, radius: f64, resolution: u32) -> Vec<Coord<f64>> {
    let segments = 4 * resolution.max(1);
    (0..segments)
        .map(|i| {
            let angle = 2.0 * PI * f64::from(i) / f64::from(segments);
            Coord {
                x: center.x + radius * angle.cos(),
                y: center.y + radius * angle.sin(),
            }
        })
        .collect()
}

/// Hull of the circles around both endpoints of a segment.
fn stadium(segment: &Line<f64>, radius: f64, resolution: u32) -> Polygon<f64> {
    let mut coords = circle_points(segment.start, radius, resolution);
    if segment.start != segment.end {
        coords.extend(circle_points(segment.end, radius, resolution));
    }
    MultiPoint::new(coords.into_iter().map(Point).collect()).convex_hull()
}

/// Union a list of polygons by pairwise reduction.
fn union_all(mut parts: Vec<MultiPolygon<f64>>) -> MultiPolygon<f64> {
    while parts.len() > 1 {
        let mut next = Vec::with_capacity(parts.len().div_ceil(2));
        let mut iter = parts.into_iter();
        while let Some(first) = iter.next() {
            match iter.next() {
                Some(second) => next.push(first.union(&second)),
                None => next.push(first),
            }
        }
        parts = next;
    }
    parts.pop().unwrap_or_else(|| MultiPolygon::new(Vec::new()))
}

/// Minkowski sum of a shape with a disc of `radius`.
fn dilate(
    shape: &GeoGeometry<f64>,
    areal: Option<&MultiPolygon<f64>>,
    radius: f64,
    resolution: u32,
) -> MultiPolygon<f64> {
    let (points, segments) = primitives(shape);
    let mut parts: Vec<MultiPolygon<f64>> = Vec::with_capacity(points.len() + segments.len() + 1);
    if let Some(areal) = areal {
        parts.push(areal.clone());
    }
    for p in points {
        parts.push(MultiPolygon::new(vec![stadium(&Line::new(p, p), radius, resolution)]));
    }
    for s in &segments {
        parts.push(MultiPolygon::new(vec![stadium(s, radius, resolution)]));
    }
    union_all(parts)
}

/// Buffer a shape by `distance`. Negative distances erode areal shapes and
/// collapse everything else to empty.
pub(crate) fn buffer(
    shape: &GeoGeometry<f64>,
    distance: f64,
    resolution: u32,
) -> Result<GeoGeometry<f64>> {
    if !distance.is_finite() {
        return Err(GeometryError::engine(format!(
            "buffer distance must be finite, got {}",
            distance
        )));
    }
    let result = match classify(shape) {
        Class::Empty => empty(),
        Class::Areal(areal) if distance < 0.0 => {
            let mut rings = Vec::new();
            for_each_linework(shape, &mut |ls| rings.push(ls.clone()));
            let edge = GeoGeometry::MultiLineString(MultiLineString::new(rings));
            let band = dilate(&edge, None, -distance, resolution);
            GeoGeometry::MultiPolygon(areal.difference(&band))
        }
        _ if distance < 0.0 => empty(),
        Class::Areal(areal) if distance == 0.0 => GeoGeometry::MultiPolygon(areal),
        _ if distance == 0.0 => empty(),
        Class::Areal(areal) => {
            GeoGeometry::MultiPolygon(dilate(shape, Some(&areal), distance, resolution))
        }
        _ => GeoGeometry::MultiPolygon(dilate(shape, None, distance, resolution)),
    };
    Ok(simplify(result))
}
