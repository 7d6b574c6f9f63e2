//! Prepared index: an R-tree of the indexed geometry's segments.
//!
//! Answers the cheap cases directly (bounding box rejection, a segment of
//! the other geometry crossing an indexed segment) and falls back to a full
//! DE-9IM evaluation against the snapshot taken at build time.

use super::geo_engine::{evaluate_predicate, primitives};
use super::{BinaryPredicate, NativeGeometry, PreparedIndex};
use crate::error::Result;
use geo::{BoundingRect, Contains, Intersects};
use geo_types::{Coord, Geometry as GeoGeometry, Line, Rect};
use rstar::primitives::Line as RLine;
use rstar::{RTree, AABB};
use std::fmt;

/// Segment R-tree over a geometry snapshot.
pub struct SegmentIndex {
    snapshot: GeoGeometry<f64>,
    bbox: Option<Rect<f64>>,
    segments: RTree<RLine<[f64; 2]>>,
}

impl SegmentIndex {
    /// Index a snapshot of `shape`. Isolated points are indexed as
    /// zero-length segments.
    pub fn build(shape: GeoGeometry<f64>) -> Self {
        let (points, lines) = primitives(&shape);
        let entries: Vec<RLine<[f64; 2]>> = lines
            .iter()
            .map(|l| RLine::new([l.start.x, l.start.y], [l.end.x, l.end.y]))
            .chain(points.iter().map(|p| RLine::new([p.x, p.y], [p.x, p.y])))
            .collect();
        tracing::trace!(segments = entries.len(), "Building prepared segment index");
        Self {
            bbox: shape.bounding_rect(),
            snapshot: shape,
            segments: RTree::bulk_load(entries),
        }
    }

    /// Number of indexed segments.
    pub fn len(&self) -> usize {
        self.segments.size()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.size() == 0
    }

    /// Whether any segment or point of `other` touches an indexed segment.
    fn any_segment_hit(&self, other: &GeoGeometry<f64>) -> bool {
        let (points, lines) = primitives(other);
        let queries = lines
            .into_iter()
            .chain(points.into_iter().map(|p| Line::new(p, p)));
        for query in queries {
            let envelope = AABB::from_corners(
                [query.start.x, query.start.y],
                [query.end.x, query.end.y],
            );
            let hit = self
                .segments
                .locate_in_envelope_intersecting(&envelope)
                .any(|entry| {
                    let indexed = Line::new(
                        Coord {
                            x: entry.from[0],
                            y: entry.from[1],
                        },
                        Coord {
                            x: entry.to[0],
                            y: entry.to[1],
                        },
                    );
                    if query.start == query.end {
                        indexed.intersects(&query.start)
                    } else if indexed.start == indexed.end {
                        query.intersects(&indexed.start)
                    } else {
                        indexed.intersects(&query)
                    }
                });
            if hit {
                return true;
            }
        }
        false
    }
}

impl PreparedIndex for SegmentIndex {
    fn evaluate(&self, predicate: BinaryPredicate, other: &NativeGeometry) -> Result<bool> {
        let other_shape = other.shape();
        if let (Some(own), Some(theirs)) = (self.bbox, other_shape.bounding_rect()) {
            if !own.intersects(&theirs) {
                return Ok(predicate == BinaryPredicate::Disjoint);
            }
            match predicate {
                BinaryPredicate::Contains if !own.contains(&theirs) => return Ok(false),
                BinaryPredicate::Within if !theirs.contains(&own) => return Ok(false),
                _ => {}
            }
        }

        match predicate {
            BinaryPredicate::Intersects if self.any_segment_hit(other_shape) => Ok(true),
            BinaryPredicate::Disjoint if self.any_segment_hit(other_shape) => Ok(false),
            _ => evaluate_predicate(predicate, &self.snapshot, other_shape),
        }
    }
}

impl fmt::Debug for SegmentIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SegmentIndex")
            .field("segments", &self.segments.size())
            .field("bbox", &self.bbox)
            .finish()
    }
}
