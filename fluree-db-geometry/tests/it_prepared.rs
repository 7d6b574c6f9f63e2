//! Prepared geometry integration tests
//!
//! Counts how often the engine is asked to build a prepared index while
//! predicates run through factories with different auto-prepare policies.

use fluree_db_geometry::engine::PreparedIndex;
use fluree_db_geometry::{
    AutoPrepareMode, BinaryPredicate, BuiltinResolver, EngineCapabilities, Factory, FactoryConfig,
    GeoEngine, GeometryEngine, GeometryError, NativeGeometry, OverlayOp, PreparedStatus, Result,
    UnaryOp,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Delegates to [`GeoEngine`] and counts prepared index builds.
#[derive(Debug)]
struct CountingEngine {
    inner: GeoEngine,
    builds: AtomicUsize,
}

impl CountingEngine {
    fn new(capabilities: EngineCapabilities) -> Arc<Self> {
        Arc::new(Self {
            inner: GeoEngine::with_capabilities(capabilities),
            builds: AtomicUsize::new(0),
        })
    }

    fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

impl GeometryEngine for CountingEngine {
    fn capabilities(&self) -> EngineCapabilities {
        self.inner.capabilities()
    }

    fn predicate(
        &self,
        predicate: BinaryPredicate,
        a: &NativeGeometry,
        b: &NativeGeometry,
    ) -> Result<bool> {
        self.inner.predicate(predicate, a, b)
    }

    fn relate(&self, a: &NativeGeometry, b: &NativeGeometry) -> Result<String> {
        self.inner.relate(a, b)
    }

    fn relate_pattern(
        &self,
        a: &NativeGeometry,
        b: &NativeGeometry,
        pattern: &str,
    ) -> Result<bool> {
        self.inner.relate_pattern(a, b, pattern)
    }

    fn distance(&self, a: &NativeGeometry, b: &NativeGeometry) -> Result<f64> {
        self.inner.distance(a, b)
    }

    fn area(&self, a: &NativeGeometry) -> Result<f64> {
        self.inner.area(a)
    }

    fn length(&self, a: &NativeGeometry) -> Result<f64> {
        self.inner.length(a)
    }

    fn unary(&self, op: UnaryOp, a: &NativeGeometry) -> Result<NativeGeometry> {
        self.inner.unary(op, a)
    }

    fn buffer(
        &self,
        a: &NativeGeometry,
        distance: f64,
        resolution: u32,
    ) -> Result<NativeGeometry> {
        self.inner.buffer(a, distance, resolution)
    }

    fn overlay(
        &self,
        op: OverlayOp,
        a: &NativeGeometry,
        b: &NativeGeometry,
    ) -> Result<NativeGeometry> {
        self.inner.overlay(op, a, b)
    }

    fn prepare(&self, a: &NativeGeometry) -> Result<Box<dyn PreparedIndex>> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        self.inner.prepare(a)
    }
}

fn factory_on(engine: &Arc<CountingEngine>, mode: AutoPrepareMode) -> Factory {
    let engine: Arc<dyn GeometryEngine> = engine.clone();
    Factory::with_engine(
        FactoryConfig::default().with_auto_prepare(mode),
        engine,
        Arc::new(BuiltinResolver),
    )
    .unwrap()
}

const SQUARE: &str = "POLYGON((0 0, 10 0, 10 10, 0 10, 0 0))";

#[test]
fn builds_once_on_second_accelerated_call() {
    let engine = CountingEngine::new(EngineCapabilities::FULL);
    let f = factory_on(&engine, AutoPrepareMode::Simple);
    let square = f.parse_wkt(SQUARE).unwrap();
    let inside = f.point(&[5.0, 5.0]).unwrap();
    let outside = f.point(&[15.0, 5.0]).unwrap();

    assert!(square.contains(&inside).unwrap());
    assert_eq!(engine.builds(), 0);
    assert_eq!(square.prepared_status(), PreparedStatus::PrimedForBuild);

    assert!(!square.contains(&outside).unwrap());
    assert_eq!(engine.builds(), 1);
    assert!(square.is_prepared());

    assert!(square.intersects(&inside).unwrap());
    assert!(square.contains(&inside).unwrap());
    assert_eq!(engine.builds(), 1);
}

#[test]
fn equals_never_advances_state() {
    let engine = CountingEngine::new(EngineCapabilities::FULL);
    let f = factory_on(&engine, AutoPrepareMode::Simple);
    let a = f.parse_wkt(SQUARE).unwrap();
    let b = f.parse_wkt(SQUARE).unwrap();

    for _ in 0..3 {
        assert!(a.equals(&b).unwrap());
    }
    assert_eq!(a.prepared_status(), PreparedStatus::Armed);
    assert_eq!(engine.builds(), 0);
}

#[test]
fn tier_two_predicates_need_tier_two() {
    let engine = CountingEngine::new(EngineCapabilities::new(true, false).unwrap());
    let f = factory_on(&engine, AutoPrepareMode::Simple);
    let square = f.parse_wkt(SQUARE).unwrap();
    let far = f.point(&[50.0, 50.0]).unwrap();

    assert!(square.disjoint(&far).unwrap());
    assert!(square.disjoint(&far).unwrap());
    assert_eq!(square.prepared_status(), PreparedStatus::Armed);
    assert_eq!(engine.builds(), 0);
}

#[test]
fn disabled_policy_never_builds() {
    let engine = CountingEngine::new(EngineCapabilities::FULL);
    let f = factory_on(&engine, AutoPrepareMode::Disabled);
    let square = f.parse_wkt(SQUARE).unwrap();
    let inside = f.point(&[5.0, 5.0]).unwrap();

    for _ in 0..5 {
        assert!(square.contains(&inside).unwrap());
    }
    assert_eq!(square.prepared_status(), PreparedStatus::Disabled);
    assert_eq!(engine.builds(), 0);

    square.prepare().unwrap();
    assert!(square.is_prepared());
    assert_eq!(engine.builds(), 1);
}

#[test]
fn clone_starts_over() {
    let engine = CountingEngine::new(EngineCapabilities::FULL);
    let f = factory_on(&engine, AutoPrepareMode::Simple);
    let square = f.parse_wkt(SQUARE).unwrap();
    square.prepare().unwrap();
    assert_eq!(engine.builds(), 1);

    let copy = square.clone();
    assert_eq!(copy.prepared_status(), PreparedStatus::Armed);
    assert!(copy.rep_equals(&square));
    assert!(square.is_prepared());
    assert_eq!(engine.builds(), 1);
}

#[test]
fn explicit_prepare_without_support_is_unsupported() {
    let engine = CountingEngine::new(EngineCapabilities::NONE);
    let f = factory_on(&engine, AutoPrepareMode::Simple);
    let square = f.parse_wkt(SQUARE).unwrap();
    let inside = f.point(&[5.0, 5.0]).unwrap();

    assert!(square.contains(&inside).unwrap());
    assert!(square.contains(&inside).unwrap());
    assert_eq!(engine.builds(), 0);

    let err = square.prepare().unwrap_err();
    assert!(matches!(err, GeometryError::UnsupportedOperation(_)));
}
