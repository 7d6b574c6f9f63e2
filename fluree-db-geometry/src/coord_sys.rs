//! Coordinate systems and SRID resolution.
//!
//! Factories resolve their SRID against a [`CoordinateSystemResolver`] at
//! creation time. The resolver is also the seam used when a cast asks for
//! coordinates to be projected between two systems.

use crate::error::{GeometryError, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};
use std::fmt::Debug;

/// SRID of WGS 84 longitude/latitude.
pub const SRID_WGS84: i32 = 4326;

/// SRID of spherical ("web") Mercator.
pub const SRID_WEB_MERCATOR: i32 = 3857;

/// WGS 84 semi-major axis, used as the sphere radius for web Mercator.
const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Broad classification of a coordinate system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateSystemKind {
    /// Angular longitude/latitude.
    Geographic,
    /// Planar projection of a geographic system.
    Projected,
    /// Unitless planar coordinates.
    Cartesian,
}

/// A resolved coordinate system definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CoordinateSystem {
    /// Authority code (EPSG code for the built-in definitions).
    pub code: i32,

    /// Human readable name.
    pub name: String,

    /// Geographic, projected or cartesian.
    pub kind: CoordinateSystemKind,
}

impl CoordinateSystem {
    /// Create a coordinate system definition.
    pub fn new(code: i32, name: impl Into<String>, kind: CoordinateSystemKind) -> Self {
        Self {
            code,
            name: name.into(),
            kind,
        }
    }

    /// WGS 84 (EPSG:4326).
    pub fn wgs84() -> Self {
        Self::new(SRID_WGS84, "WGS 84", CoordinateSystemKind::Geographic)
    }

    /// WGS 84 / Pseudo-Mercator (EPSG:3857).
    pub fn web_mercator() -> Self {
        Self::new(
            SRID_WEB_MERCATOR,
            "WGS 84 / Pseudo-Mercator",
            CoordinateSystemKind::Projected,
        )
    }

    /// Whether coordinates in this system live on a plane.
    pub fn is_cartesian(&self) -> bool {
        !matches!(self.kind, CoordinateSystemKind::Geographic)
    }
}

/// SRID ↔ coordinate system lookup and point projection.
pub trait CoordinateSystemResolver: Send + Sync + Debug {
    /// Look up the coordinate system for an SRID, if known.
    fn resolve(&self, srid: i32) -> Option<CoordinateSystem>;

    /// Project one X/Y pair from `from` into `to`.
    fn transform(
        &self,
        from: &CoordinateSystem,
        to: &CoordinateSystem,
        x: f64,
        y: f64,
    ) -> Result<(f64, f64)>;
}

/// Resolver with the handful of definitions Fluree ships with.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinResolver;

impl CoordinateSystemResolver for BuiltinResolver {
    fn resolve(&self, srid: i32) -> Option<CoordinateSystem> {
        match srid {
            SRID_WGS84 => Some(CoordinateSystem::wgs84()),
            SRID_WEB_MERCATOR => Some(CoordinateSystem::web_mercator()),
            _ => None,
        }
    }

    fn transform(
        &self,
        from: &CoordinateSystem,
        to: &CoordinateSystem,
        x: f64,
        y: f64,
    ) -> Result<(f64, f64)> {
        if from == to {
            return Ok((x, y));
        }
        match (from.code, to.code) {
            (SRID_WGS84, SRID_WEB_MERCATOR) => {
                let x_m = EARTH_RADIUS_M * x.to_radians();
                let y_m = EARTH_RADIUS_M * (FRAC_PI_4 + y.to_radians() / 2.0).tan().ln();
                Ok((x_m, y_m))
            }
            (SRID_WEB_MERCATOR, SRID_WGS84) => {
                let lng = (x / EARTH_RADIUS_M).to_degrees();
                let lat = (2.0 * (y / EARTH_RADIUS_M).exp().atan() - FRAC_PI_2).to_degrees();
                Ok((lng, lat))
            }
            (a, b) => Err(GeometryError::unsupported(format!(
                "no projection from EPSG:{} to EPSG:{}",
                a, b
            ))),
        }
    }
}
