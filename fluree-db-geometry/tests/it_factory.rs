//! Factory identity integration tests
//!
//! Factories compare and hash by the configuration they were created from, so
//! geometries built by independently created but identically configured
//! factories interoperate.

use fluree_db_geometry::{
    AutoPrepareMode, CodecConfig, CoordinateSystem, Factory, FactoryConfig, GeometryError,
    GeometryKind, PropertyValue,
};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

fn hash_of(factory: &Factory) -> u64 {
    let mut hasher = DefaultHasher::new();
    factory.hash(&mut hasher);
    hasher.finish()
}

fn configs() -> Vec<FactoryConfig> {
    vec![
        FactoryConfig::default(),
        FactoryConfig::new(4326),
        FactoryConfig::default().with_z(true),
        FactoryConfig::default().with_m(true),
        FactoryConfig::default().with_buffer_resolution(8),
        FactoryConfig::default().with_auto_prepare(AutoPrepareMode::Disabled),
        FactoryConfig::default().with_lenient_multi_polygon_assertions(true),
        FactoryConfig::default().with_coordinate_system(CoordinateSystem::web_mercator()),
        FactoryConfig::new(3857),
        FactoryConfig::new(4326).with_coordinate_system(CoordinateSystem::wgs84()),
        FactoryConfig::default().with_codec(CodecConfig {
            emit_ewkt_srid: true,
            ..CodecConfig::default()
        }),
    ]
}

#[test]
fn equal_iff_configs_equal() {
    let configs = configs();
    for (i, a) in configs.iter().enumerate() {
        for (j, b) in configs.iter().enumerate() {
            let fa = Factory::new(a.clone()).unwrap();
            let fb = Factory::new(b.clone()).unwrap();
            assert_eq!(fa == fb, i == j, "configs {} and {}", i, j);
            if i == j {
                assert_eq!(hash_of(&fa), hash_of(&fb));
            }
        }
    }
}

#[test]
fn factories_dedupe_in_hash_set() {
    let set: HashSet<Factory> = (0..4)
        .map(|_| Factory::new(FactoryConfig::new(4326)).unwrap())
        .chain(std::iter::once(Factory::new(FactoryConfig::default()).unwrap()))
        .collect();
    assert_eq!(set.len(), 2);
}

#[test]
fn same_resolution_from_different_configs_is_not_same_identity() {
    let by_srid = Factory::new(FactoryConfig::new(3857)).unwrap();
    let by_system = Factory::new(
        FactoryConfig::default().with_coordinate_system(CoordinateSystem::web_mercator()),
    )
    .unwrap();
    assert_eq!(by_srid.srid(), by_system.srid());
    assert_eq!(by_srid.coordinate_system(), by_system.coordinate_system());
    assert_ne!(by_srid, by_system);

    let json = serde_json::to_string(&by_system).unwrap();
    let back: Factory = serde_json::from_str(&json).unwrap();
    assert_eq!(back, by_system);
    assert_ne!(back, by_srid);
}

#[test]
fn z_and_m_together_is_configuration_error() {
    let err = Factory::new(FactoryConfig::default().with_z(true).with_m(true)).unwrap_err();
    assert!(matches!(err, GeometryError::Configuration(_)));
}

#[test]
fn properties_by_name() {
    let f = Factory::new(FactoryConfig::new(4326).with_z(true)).unwrap();
    assert_eq!(
        f.property("has_z_coordinate"),
        Some(PropertyValue::Bool(true))
    );
    assert_eq!(
        f.property("has_m_coordinate"),
        Some(PropertyValue::Bool(false))
    );
    assert_eq!(f.property("is_cartesian"), Some(PropertyValue::Bool(false)));
    assert_eq!(f.property("srid"), Some(PropertyValue::Int(4326)));
    assert_eq!(
        f.property("coordinate_system"),
        Some(PropertyValue::CoordinateSystem(Some(CoordinateSystem::wgs84())))
    );
    assert_eq!(f.property("no_such_property"), None);
}

#[test]
fn factory_serde_roundtrip() {
    let f = Factory::new(FactoryConfig::new(4326).with_m(true)).unwrap();
    let json = serde_json::to_string(&f).unwrap();
    let back: Factory = serde_json::from_str(&json).unwrap();
    assert_eq!(back, f);
    assert!(back.has_m());

    let bad = r#"{"has_z_coordinate": true, "has_m_coordinate": true}"#;
    assert!(serde_json::from_str::<Factory>(bad).is_err());
}

#[test]
fn multi_line_string_keeps_member_kinds() {
    let f = Factory::new(FactoryConfig::default()).unwrap();
    let p = |x: f64, y: f64| f.point(&[x, y]).unwrap();

    let plain = f.line_string(&[p(0.0, 0.0), p(1.0, 1.0), p(2.0, 0.0)]).unwrap();
    let line = f.line(&p(5.0, 5.0), &p(6.0, 6.0)).unwrap();
    let ring = f
        .linear_ring(&[p(10.0, 10.0), p(11.0, 10.0), p(11.0, 11.0), p(10.0, 10.0)])
        .unwrap();

    let multi = f
        .multi_line_string(&[plain.clone(), line.clone(), ring.clone()])
        .unwrap();
    assert_eq!(multi.num_geometries(), 3);
    assert_eq!(
        multi.geometry_n(0).unwrap().kind(),
        GeometryKind::LineString
    );
    assert_eq!(multi.geometry_n(1).unwrap().kind(), GeometryKind::Line);
    assert_eq!(
        multi.geometry_n(2).unwrap().kind(),
        GeometryKind::LinearRing
    );
    assert!(multi.geometry_n(1).unwrap().rep_equals(&line));

    let json = serde_json::to_string(&multi).unwrap();
    let back: fluree_db_geometry::Geometry = serde_json::from_str(&json).unwrap();
    assert_eq!(back.geometry_n(2).unwrap().kind(), GeometryKind::LinearRing);
}

#[test]
fn invalid_constructor_input() {
    let f = Factory::new(FactoryConfig::default()).unwrap();
    let p = f.point(&[0.0, 0.0]).unwrap();

    let err = f.line_string(&[p.clone()]).unwrap_err();
    assert!(matches!(err, GeometryError::InvalidGeometry(_)));

    let err = f
        .multi_point(&[p.clone(), f.parse_wkt("LINESTRING(0 0, 1 1)").unwrap()])
        .unwrap_err();
    assert!(matches!(err, GeometryError::InvalidGeometry(_)));

    let a = f.parse_wkt("POLYGON((0 0, 2 0, 2 2, 0 2, 0 0))").unwrap();
    let b = f.parse_wkt("POLYGON((1 1, 3 1, 3 3, 1 3, 1 1))").unwrap();
    let err = f.multi_polygon(&[a.clone(), b.clone()]).unwrap_err();
    assert!(matches!(err, GeometryError::InvalidGeometry(_)));

    let lenient =
        Factory::new(FactoryConfig::default().with_lenient_multi_polygon_assertions(true)).unwrap();
    assert!(lenient.multi_polygon(&[a, b]).is_ok());
}
