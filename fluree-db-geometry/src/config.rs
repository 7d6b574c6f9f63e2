//! Geometry factory configuration types.
//!
//! A [`FactoryConfig`] fully determines a factory's identity: two factories
//! built from equal configs are equal, and a factory serializes as nothing
//! more than its config.

use crate::coord_sys::CoordinateSystem;
use serde::{Deserialize, Serialize};

/// Whether geometries automatically build prepared indexes for repeated
/// predicate evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoPrepareMode {
    /// Never prepare automatically; `Geometry::prepare` still works.
    Disabled,
    /// Prepare on the second accelerated predicate call.
    #[default]
    Simple,
}

/// Configuration for the WKT codec attached to a factory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Prefix generated WKT with `SRID=<srid>;` (EWKT).
    pub emit_ewkt_srid: bool,

    /// Accept an EWKT `SRID=<srid>;` prefix when parsing.
    pub support_ewkt: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            emit_ewkt_srid: false,
            support_ewkt: true,
        }
    }
}

/// Configuration for creating a geometry factory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct FactoryConfig {
    /// Spatial reference ID stamped onto every geometry.
    /// Default: 0 (unknown)
    pub srid: i32,

    /// Number of segments used to approximate a quarter circle when buffering.
    /// Default: 1
    pub buffer_resolution: u32,

    /// Carry a Z ordinate on every coordinate.
    pub has_z_coordinate: bool,

    /// Carry an M ordinate on every coordinate.
    pub has_m_coordinate: bool,

    /// Prepared geometry policy.
    pub auto_prepare: AutoPrepareMode,

    /// Skip the overlap/connectivity check on multi-polygon parts.
    pub lenient_multi_polygon_assertions: bool,

    /// Coordinate system; resolved from `srid` when unset.
    pub coordinate_system: Option<CoordinateSystem>,

    /// Codec options.
    pub codec: CodecConfig,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            srid: 0,
            buffer_resolution: 1,
            has_z_coordinate: false,
            has_m_coordinate: false,
            auto_prepare: AutoPrepareMode::Simple,
            lenient_multi_polygon_assertions: false,
            coordinate_system: None,
            codec: CodecConfig::default(),
        }
    }
}

impl FactoryConfig {
    /// Create a config with defaults for everything but the SRID.
    pub fn new(srid: i32) -> Self {
        Self {
            srid,
            ..Self::default()
        }
    }

    /// Set the buffer resolution.
    pub fn with_buffer_resolution(mut self, resolution: u32) -> Self {
        self.buffer_resolution = resolution;
        self
    }

    /// Enable or disable the Z ordinate.
    pub fn with_z(mut self, has_z: bool) -> Self {
        self.has_z_coordinate = has_z;
        self
    }

    /// Enable or disable the M ordinate.
    pub fn with_m(mut self, has_m: bool) -> Self {
        self.has_m_coordinate = has_m;
        self
    }

    /// Set the auto-prepare mode.
    pub fn with_auto_prepare(mut self, mode: AutoPrepareMode) -> Self {
        self.auto_prepare = mode;
        self
    }

    /// Allow overlapping or connected multi-polygon parts.
    pub fn with_lenient_multi_polygon_assertions(mut self, lenient: bool) -> Self {
        self.lenient_multi_polygon_assertions = lenient;
        self
    }

    /// Set an explicit coordinate system.
    pub fn with_coordinate_system(mut self, coordinate_system: CoordinateSystem) -> Self {
        self.coordinate_system = Some(coordinate_system);
        self
    }

    /// Set codec options.
    pub fn with_codec(mut self, codec: CodecConfig) -> Self {
        self.codec = codec;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FactoryConfig::default();
        assert_eq!(config.srid, 0);
        assert_eq!(config.buffer_resolution, 1);
        assert_eq!(config.auto_prepare, AutoPrepareMode::Simple);
        assert!(!config.has_z_coordinate && !config.has_m_coordinate);
    }

    #[test]
    fn test_serde_fills_defaults() {
        let config: FactoryConfig =
            serde_json::from_str(r#"{"srid": 4326, "has_z_coordinate": true}"#).unwrap();
        assert_eq!(config, FactoryConfig::new(4326).with_z(true));
    }
}
