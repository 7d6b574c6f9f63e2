//! WKT generation and parsing.
//!
//! Generation writes the ordinate layout explicitly (`POINT Z (1 2 3)`,
//! `LINESTRING ZM (...)`) so a parsed geometry always says which extra
//! ordinates it carries. The `ZM` layout is the native 4-ordinate stream used
//! by combined factories: both shadows are written and read as one stream.
//!
//! Parsing goes through the `wkt` crate and is lifted into a [`Structure`];
//! the factory then builds from that structure like from any other input.

use crate::config::CodecConfig;
use crate::engine::ExtraOrdinate;
use crate::error::{GeometryError, Result};
use crate::kind::GeometryKind;
use crate::structure::{Coord4, Structure};
use std::fmt::Write;
use std::str::FromStr;
use wkt::Wkt;

/// Which ordinates a WKT stream carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrdinateLayout {
    Xy,
    Xyz,
    Xym,
    Xyzm,
}

impl OrdinateLayout {
    /// Layout of a single-extra-ordinate factory.
    pub fn for_extra(extra: ExtraOrdinate) -> Self {
        match extra {
            ExtraOrdinate::None => OrdinateLayout::Xy,
            ExtraOrdinate::Z => OrdinateLayout::Xyz,
            ExtraOrdinate::M => OrdinateLayout::Xym,
        }
    }

    pub fn has_z(&self) -> bool {
        matches!(self, OrdinateLayout::Xyz | OrdinateLayout::Xyzm)
    }

    pub fn has_m(&self) -> bool {
        matches!(self, OrdinateLayout::Xym | OrdinateLayout::Xyzm)
    }

    fn tag(&self) -> &'static str {
        match self {
            OrdinateLayout::Xy => "",
            OrdinateLayout::Xyz => " Z",
            OrdinateLayout::Xym => " M",
            OrdinateLayout::Xyzm => " ZM",
        }
    }
}

/// Result of parsing one WKT (or EWKT) string.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedWkt {
    /// SRID from an EWKT prefix, if present.
    pub srid: Option<i32>,
    pub kind: GeometryKind,
    pub structure: Structure,
    pub layout: OrdinateLayout,
}

/// WKT codec configured per factory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WktCodec {
    config: CodecConfig,
}

impl WktCodec {
    pub fn new(config: CodecConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Write a geometry of `kind` as WKT, emitting exactly the ordinates of
    /// `layout`. Missing extra ordinates are written as 0.
    pub fn generate(
        &self,
        kind: GeometryKind,
        structure: &Structure,
        layout: OrdinateLayout,
        srid: i32,
    ) -> String {
        let mut out = String::with_capacity(16 + structure.coord_count() * 24);
        if self.config.emit_ewkt_srid && srid != 0 {
            let _ = write!(out, "SRID={};", srid);
        }
        write_tagged(&mut out, kind, structure, layout);
        out
    }

    /// Parse WKT, accepting an EWKT `SRID=<n>;` prefix when enabled.
    pub fn parse(&self, text: &str) -> Result<ParsedWkt> {
        let (srid, body) = self.split_srid(text.trim())?;
        let parsed = Wkt::<f64>::from_str(body)
            .map_err(|e| GeometryError::parse(format!("{:?}", e)))?;
        let (kind, structure) = lift(&parsed)?;

        let (mut has_z, mut has_m) = (false, false);
        structure.for_each_coord(&mut |c| {
            has_z |= c.z.is_some();
            has_m |= c.m.is_some();
        });
        let layout = match (has_z, has_m) {
            (false, false) => OrdinateLayout::Xy,
            (true, false) => OrdinateLayout::Xyz,
            (false, true) => OrdinateLayout::Xym,
            (true, true) => OrdinateLayout::Xyzm,
        };

        Ok(ParsedWkt {
            srid,
            kind,
            structure,
            layout,
        })
    }

    fn split_srid<'a>(&self, text: &'a str) -> Result<(Option<i32>, &'a str)> {
        let has_prefix = text
            .get(..5)
            .is_some_and(|p| p.eq_ignore_ascii_case("SRID="));
        if !has_prefix {
            return Ok((None, text));
        }
        if !self.config.support_ewkt {
            return Err(GeometryError::parse("EWKT SRID prefix is not enabled"));
        }
        let (prefix, body) = text
            .split_once(';')
            .ok_or_else(|| GeometryError::parse("EWKT SRID prefix without ';'"))?;
        let srid = prefix[5..]
            .trim()
            .parse::<i32>()
            .map_err(|e| GeometryError::parse(format!("invalid EWKT SRID: {}", e)))?;
        Ok((Some(srid), body.trim_start()))
    }
}

impl Default for WktCodec {
    fn default() -> Self {
        Self::new(CodecConfig::default())
    }
}

// ============================================================================
// Generation
// ============================================================================

fn write_tagged(
    out: &mut String,
    kind: GeometryKind,
    structure: &Structure,
    layout: OrdinateLayout,
) {
    out.push_str(kind.wkt_keyword());
    out.push_str(layout.tag());
    if is_empty(structure) {
        out.push_str(" EMPTY");
        return;
    }
    out.push(' ');
    write_body(out, kind, structure, layout);
}

fn is_empty(structure: &Structure) -> bool {
    match structure {
        Structure::Point(_) => false,
        Structure::LineString(coords) => coords.is_empty(),
        Structure::Polygon(rings) => rings.iter().all(Vec::is_empty),
        Structure::Collection(members) => members.is_empty(),
    }
}

fn write_body(out: &mut String, kind: GeometryKind, structure: &Structure, layout: OrdinateLayout) {
    match structure {
        Structure::Point(c) => {
            out.push('(');
            write_coord(out, c, layout);
            out.push(')');
        }
        Structure::LineString(coords) => write_coords(out, coords, layout),
        Structure::Polygon(rings) => write_rings(out, rings, layout),
        Structure::Collection(members) => {
            out.push('(');
            for (i, (member_kind, member)) in members.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                if kind == GeometryKind::GeometryCollection {
                    write_tagged(out, *member_kind, member, layout);
                } else {
                    write_body(out, *member_kind, member, layout);
                }
            }
            out.push(')');
        }
    }
}

fn write_rings(out: &mut String, rings: &[Vec<Coord4>], layout: OrdinateLayout) {
    out.push('(');
    for (i, ring) in rings.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_coords(out, ring, layout);
    }
    out.push(')');
}

fn write_coords(out: &mut String, coords: &[Coord4], layout: OrdinateLayout) {
    out.push('(');
    for (i, c) in coords.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_coord(out, c, layout);
    }
    out.push(')');
}

fn write_coord(out: &mut String, c: &Coord4, layout: OrdinateLayout) {
    let _ = write!(out, "{} {}", c.x, c.y);
    if layout.has_z() {
        let _ = write!(out, " {}", c.z.unwrap_or(0.0));
    }
    if layout.has_m() {
        let _ = write!(out, " {}", c.m.unwrap_or(0.0));
    }
}

// ============================================================================
// Parsing
// ============================================================================

fn lift_coord(c: &wkt::types::Coord<f64>) -> Coord4 {
    Coord4 {
        x: c.x,
        y: c.y,
        z: c.z,
        m: c.m,
    }
}

fn lift_coords(coords: &[wkt::types::Coord<f64>]) -> Vec<Coord4> {
    coords.iter().map(lift_coord).collect()
}

fn lift_point(point: &wkt::types::Point<f64>) -> Result<Coord4> {
    point
        .0
        .as_ref()
        .map(lift_coord)
        .ok_or_else(|| GeometryError::invalid("empty points are not supported"))
}

fn lift_line_string(line: &wkt::types::LineString<f64>) -> Structure {
    Structure::LineString(lift_coords(&line.0))
}

fn lift_polygon(polygon: &wkt::types::Polygon<f64>) -> Structure {
    Structure::Polygon(polygon.0.iter().map(|ring| lift_coords(&ring.0)).collect())
}

fn lift(parsed: &Wkt<f64>) -> Result<(GeometryKind, Structure)> {
    let lifted = match parsed {
        Wkt::Point(p) => (GeometryKind::Point, Structure::Point(lift_point(p)?)),
        Wkt::LineString(ls) => (GeometryKind::LineString, lift_line_string(ls)),
        Wkt::Polygon(poly) => (GeometryKind::Polygon, lift_polygon(poly)),
        Wkt::MultiPoint(mp) => {
            let members = mp
                .0
                .iter()
                .map(|p| Ok((GeometryKind::Point, Structure::Point(lift_point(p)?))))
                .collect::<Result<Vec<_>>>()?;
            (GeometryKind::MultiPoint, Structure::Collection(members))
        }
        Wkt::MultiLineString(mls) => {
            let members = mls
                .0
                .iter()
                .map(|ls| (GeometryKind::LineString, lift_line_string(ls)))
                .collect();
            (
                GeometryKind::MultiLineString,
                Structure::Collection(members),
            )
        }
        Wkt::MultiPolygon(mp) => {
            let members = mp
                .0
                .iter()
                .map(|poly| (GeometryKind::Polygon, lift_polygon(poly)))
                .collect();
            (GeometryKind::MultiPolygon, Structure::Collection(members))
        }
        Wkt::GeometryCollection(gc) => {
            let members = gc.0.iter().map(lift).collect::<Result<Vec<_>>>()?;
            (
                GeometryKind::GeometryCollection,
                Structure::Collection(members),
            )
        }
    };
    Ok(lifted)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Structure {
        Structure::Polygon(vec![vec![
            Coord4::xy(0.0, 0.0),
            Coord4::xy(1.0, 0.0),
            Coord4::xy(1.0, 1.0),
            Coord4::xy(0.0, 0.0),
        ]])
    }

    #[test]
    fn test_generate_layouts() {
        let codec = WktCodec::default();
        let point = Structure::Point(Coord4::xy(1.0, 2.5).with_z(3.0));

        assert_eq!(
            codec.generate(GeometryKind::Point, &point, OrdinateLayout::Xy, 0),
            "POINT (1 2.5)"
        );
        assert_eq!(
            codec.generate(GeometryKind::Point, &point, OrdinateLayout::Xyz, 0),
            "POINT Z (1 2.5 3)"
        );
        assert_eq!(
            codec.generate(GeometryKind::Point, &point, OrdinateLayout::Xyzm, 0),
            "POINT ZM (1 2.5 3 0)"
        );
        assert_eq!(
            codec.generate(GeometryKind::Polygon, &square(), OrdinateLayout::Xy, 0),
            "POLYGON ((0 0, 1 0, 1 1, 0 0))"
        );
    }

    #[test]
    fn test_generate_collections_and_empty() {
        let codec = WktCodec::default();
        let multi = Structure::Collection(vec![
            (GeometryKind::Point, Structure::Point(Coord4::xy(0.0, 0.0))),
            (GeometryKind::Point, Structure::Point(Coord4::xy(1.0, 1.0))),
        ]);
        assert_eq!(
            codec.generate(GeometryKind::MultiPoint, &multi, OrdinateLayout::Xy, 0),
            "MULTIPOINT ((0 0), (1 1))"
        );
        assert_eq!(
            codec.generate(
                GeometryKind::GeometryCollection,
                &multi,
                OrdinateLayout::Xy,
                0
            ),
            "GEOMETRYCOLLECTION (POINT (0 0), POINT (1 1))"
        );
        assert_eq!(
            codec.generate(
                GeometryKind::LineString,
                &Structure::LineString(Vec::new()),
                OrdinateLayout::Xy,
                0
            ),
            "LINESTRING EMPTY"
        );
    }

    #[test]
    fn test_ewkt_prefix() {
        let codec = WktCodec::new(CodecConfig {
            emit_ewkt_srid: true,
            support_ewkt: true,
        });
        let text = codec.generate(
            GeometryKind::Point,
            &Structure::Point(Coord4::xy(1.0, 2.0)),
            OrdinateLayout::Xy,
            4326,
        );
        assert_eq!(text, "SRID=4326;POINT (1 2)");

        let parsed = codec.parse(&text).unwrap();
        assert_eq!(parsed.srid, Some(4326));
        assert_eq!(parsed.kind, GeometryKind::Point);
    }

    #[test]
    fn test_ewkt_rejected_when_disabled() {
        let codec = WktCodec::new(CodecConfig {
            emit_ewkt_srid: false,
            support_ewkt: false,
        });
        let err = codec.parse("SRID=4326;POINT (1 2)").unwrap_err();
        assert!(matches!(err, GeometryError::Parse(_)));
    }

    #[test]
    fn test_parse_layouts() {
        let codec = WktCodec::default();

        let parsed = codec.parse("POINT ZM (1 2 3 4)").unwrap();
        assert_eq!(parsed.layout, OrdinateLayout::Xyzm);
        assert_eq!(
            parsed.structure,
            Structure::Point(Coord4::xy(1.0, 2.0).with_z(3.0).with_m(4.0))
        );

        let parsed = codec.parse("LINESTRING Z (0 0 1, 1 1 2)").unwrap();
        assert_eq!(parsed.layout, OrdinateLayout::Xyz);
        assert_eq!(parsed.structure.coord_count(), 2);

        let parsed = codec.parse("POLYGON ((0 0, 1 0, 1 1, 0 0))").unwrap();
        assert_eq!(parsed.layout, OrdinateLayout::Xy);
        assert_eq!(parsed.structure, square());
    }

    #[test]
    fn test_parse_errors() {
        let codec = WktCodec::default();
        assert!(matches!(
            codec.parse("POINT (1").unwrap_err(),
            GeometryError::Parse(_)
        ));
        assert!(matches!(
            codec.parse("POINT EMPTY").unwrap_err(),
            GeometryError::InvalidGeometry(_)
        ));
    }
}
