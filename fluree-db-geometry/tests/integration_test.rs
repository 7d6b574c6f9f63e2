//! End-to-end tests for fluree-db-geometry
//!
//! Exercises the full stack: factory creation, construction, predicates with
//! prepared caching, Z+M emulation, casting and serde round trips.

use fluree_db_geometry::{
    AnyGeometry, AutoPrepareMode, CastOptions, CombinedFactory, Factory, FactoryConfig, Geometry,
    GeometryKind, PreparedStatus,
};

#[test]
fn test_z_point_and_clone() {
    let f = Factory::new(FactoryConfig::default().with_z(true)).unwrap();
    let p = f.point(&[1.0, 2.0, 3.0]).unwrap();
    assert_eq!(p.z(), Some(3.0));
    assert_eq!(p.m(), None);

    let area = f
        .parse_wkt("POLYGON Z ((0 0 0, 5 0 0, 5 5 0, 0 5 0, 0 0 0))")
        .unwrap();
    area.prepare().unwrap();
    let copy = area.clone();
    assert!(area.is_prepared());
    assert_eq!(copy.prepared_status(), PreparedStatus::Armed);
    assert!(copy.contains(&p).unwrap());
}

#[test]
fn test_clone_follows_factory_default() {
    let f = Factory::new(FactoryConfig::default().with_auto_prepare(AutoPrepareMode::Disabled))
        .unwrap();
    let p = f.point(&[0.0, 0.0]).unwrap();
    p.prepare().unwrap();
    assert_eq!(p.clone().prepared_status(), PreparedStatus::Disabled);
}

#[test]
fn test_combined_point() {
    let f = CombinedFactory::new(FactoryConfig::default()).unwrap();
    let p = f.point(&[1.0, 2.0, 3.0, 4.0]).unwrap();
    assert_eq!(p.z(), Some(3.0));
    assert_eq!(p.m(), Some(4.0));
}

#[test]
fn test_query_flow() {
    let f = Factory::new(FactoryConfig::new(4326)).unwrap();
    let parks = [
        "POLYGON((0 0, 10 0, 10 10, 0 10, 0 0))",
        "POLYGON((20 20, 30 20, 30 30, 20 30, 20 20))",
    ]
    .iter()
    .map(|wkt| f.parse_wkt(wkt).unwrap())
    .collect::<Vec<_>>();

    let visits = (0..20)
        .map(|i| f.point(&[i as f64 * 1.5, i as f64 * 1.5]).unwrap())
        .collect::<Vec<_>>();

    let counts: Vec<usize> = parks
        .iter()
        .map(|park| {
            visits
                .iter()
                .filter(|v| park.contains(v).unwrap())
                .count()
        })
        .collect();
    assert_eq!(counts, vec![6, 6]);
    assert!(parks.iter().all(Geometry::is_prepared));

    let union = parks[0].union(&parks[1]).unwrap();
    assert_eq!(union.kind(), GeometryKind::MultiPolygon);
    assert!((union.area().unwrap() - 200.0).abs() < 1e-9);
    assert_eq!(union.srid(), 4326);
}

#[test]
fn test_serde_round_trips() {
    let f = Factory::new(FactoryConfig::new(4326).with_m(true)).unwrap();
    let g = f.parse_wkt("LINESTRING M (0 0 1, 1 1 2, 2 0 3)").unwrap();
    let json = serde_json::to_string(&g).unwrap();
    let back: Geometry = serde_json::from_str(&json).unwrap();
    assert!(back.rep_equals(&g));
    assert_eq!(back.factory(), &f);
    assert_eq!(back.prepared_status(), PreparedStatus::Armed);

    let any = AnyGeometry::from(back.cast(&f, CastOptions::new()).unwrap());
    assert_eq!(any.as_text(), "LINESTRING M (0 0 1, 1 1 2, 2 0 3)");
}

#[test]
fn test_buffered_z_geometry_round_trips() {
    let f = Factory::new(FactoryConfig::default().with_z(true)).unwrap();
    let buffered = f.point(&[0.0, 0.0, 5.0]).unwrap().buffer(1.0).unwrap();
    assert!(buffered.native().extra_values().iter().all(|z| *z == 0.0));

    let text = buffered.as_text();
    assert!(text.starts_with("POLYGON Z (("));
    assert!(!text.contains("NaN"));
    assert!(f.parse_wkt(&text).unwrap().rep_equals(&buffered));

    let json = serde_json::to_string(&buffered).unwrap();
    let back: Geometry = serde_json::from_str(&json).unwrap();
    assert_eq!(back, buffered);
}
