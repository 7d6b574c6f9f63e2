//! Factory-neutral coordinate trees.
//!
//! A [`Structure`] is what a geometry looks like once it has been lowered out
//! of the engine: plain 4-ordinate coordinates arranged as points, line
//! strings, rings and collection members. Full rebuilds during casts and the
//! WKT codec both go through this representation, and every factory
//! constructor ends up building from one.

use crate::error::{GeometryError, Result};
use crate::kind::GeometryKind;

/// One coordinate with optional extra ordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coord4 {
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
    pub m: Option<f64>,
}

impl Coord4 {
    /// A 2D coordinate.
    pub fn xy(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            z: None,
            m: None,
        }
    }

    /// Set the Z ordinate.
    pub fn with_z(mut self, z: f64) -> Self {
        self.z = Some(z);
        self
    }

    /// Set the M ordinate.
    pub fn with_m(mut self, m: f64) -> Self {
        self.m = Some(m);
        self
    }

    /// Whether every present ordinate is finite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.z.map_or(true, f64::is_finite)
            && self.m.map_or(true, f64::is_finite)
    }

    /// X/Y equality, bitwise.
    pub fn same_xy(&self, other: &Coord4) -> bool {
        self.x.to_bits() == other.x.to_bits() && self.y.to_bits() == other.y.to_bits()
    }
}

/// Coordinate tree of one geometry.
///
/// The top-level kind is carried by whoever holds the structure; collection
/// members carry their own kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum Structure {
    Point(Coord4),
    LineString(Vec<Coord4>),
    /// Exterior ring first, then interior rings.
    Polygon(Vec<Vec<Coord4>>),
    Collection(Vec<(GeometryKind, Structure)>),
}

impl Structure {
    /// Number of coordinates in traversal order.
    pub fn coord_count(&self) -> usize {
        match self {
            Structure::Point(_) => 1,
            Structure::LineString(coords) => coords.len(),
            Structure::Polygon(rings) => rings.iter().map(Vec::len).sum(),
            Structure::Collection(members) => members.iter().map(|(_, s)| s.coord_count()).sum(),
        }
    }

    /// Visit every coordinate in traversal order (exterior ring before
    /// interior rings, collection members in order).
    pub fn for_each_coord(&self, f: &mut impl FnMut(&Coord4)) {
        match self {
            Structure::Point(c) => f(c),
            Structure::LineString(coords) => coords.iter().for_each(f),
            Structure::Polygon(rings) => rings.iter().flatten().for_each(f),
            Structure::Collection(members) => {
                for (_, member) in members {
                    member.for_each_coord(f);
                }
            }
        }
    }

    /// Mutably visit every coordinate in traversal order.
    pub fn for_each_coord_mut(&mut self, f: &mut impl FnMut(&mut Coord4)) {
        match self {
            Structure::Point(c) => f(c),
            Structure::LineString(coords) => coords.iter_mut().for_each(f),
            Structure::Polygon(rings) => rings.iter_mut().flatten().for_each(f),
            Structure::Collection(members) => {
                for (_, member) in members {
                    member.for_each_coord_mut(f);
                }
            }
        }
    }

    /// Mutably visit every coordinate in traversal order, stopping at the
    /// first error.
    pub fn try_for_each_coord_mut(
        &mut self,
        f: &mut impl FnMut(&mut Coord4) -> Result<()>,
    ) -> Result<()> {
        match self {
            Structure::Point(c) => f(c),
            Structure::LineString(coords) => coords.iter_mut().try_for_each(f),
            Structure::Polygon(rings) => rings.iter_mut().flatten().try_for_each(f),
            Structure::Collection(members) => members
                .iter_mut()
                .try_for_each(|(_, member)| member.try_for_each_coord_mut(f)),
        }
    }

    /// All coordinates in traversal order.
    pub fn coords(&self) -> Vec<Coord4> {
        let mut out = Vec::with_capacity(self.coord_count());
        self.for_each_coord(&mut |c| out.push(*c));
        out
    }

    /// Reshape a structure of kind `from` so it can be built as kind `to`.
    ///
    /// Supported conversions: any kind to itself, within the line string
    /// family, wrapping into a compatible collection, unwrapping a
    /// single-member collection, and collection to collection (members are
    /// coerced again by the target constructor).
    pub fn convert(self, from: GeometryKind, to: GeometryKind) -> Result<Structure> {
        if from == to || (from.is_line_string_family() && to.is_line_string_family()) {
            return Ok(self);
        }

        if from.is_collection() {
            if to.is_collection() {
                return Ok(self);
            }
            if let Structure::Collection(mut members) = self {
                if members.len() == 1 {
                    if let Some((member_kind, member)) = members.pop() {
                        return member.convert(member_kind, to);
                    }
                }
                return Err(GeometryError::invalid(format!(
                    "cannot convert {} with {} members to {}",
                    from,
                    members.len(),
                    to
                )));
            }
            return Err(GeometryError::invalid(format!("{} structure is not a collection", from)));
        }

        let wraps = to == GeometryKind::GeometryCollection
            || to.element_kind().is_some_and(|element| from.is_subtype_of(element));
        if wraps {
            return Ok(Structure::Collection(vec![(from, self)]));
        }

        Err(GeometryError::invalid(format!("cannot convert {} to {}", from, to)))
    }
}
