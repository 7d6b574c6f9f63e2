//! Lazy prepared-index caching.
//!
//! Each geometry owns a [`PreparedIndexCache`] that decides, per predicate
//! call, whether to use the plain engine comparison or a prepared index.
//!
//! ```text
//!   Disabled                       (auto-prepare off; queries never move it)
//!
//!   Armed ──1st accel. call──▶ PrimedForBuild ──2nd accel. call──▶ Built(index)
//!     │        (plain)                            (build + use)        │
//!     └──────────────────── prepare() from any state ─────────────────▶┘
//! ```
//!
//! A geometry queried exactly once never pays for an index. Predicates the
//! engine build cannot accelerate always use the plain comparison and leave
//! the state where it is.

use crate::capability::EngineCapabilities;
use crate::config::AutoPrepareMode;
use crate::engine::{BinaryPredicate, GeometryEngine, NativeGeometry, PreparedIndex};
use crate::error::{GeometryError, Result};
use std::cell::RefCell;
use std::fmt;

/// Prepared state of one geometry. Only moves forward.
pub enum PreparedState {
    Disabled,
    Armed,
    PrimedForBuild,
    Built(Box<dyn PreparedIndex>),
}

impl PreparedState {
    /// Initial state for a factory's auto-prepare mode.
    pub fn initial(mode: AutoPrepareMode) -> Self {
        match mode {
            AutoPrepareMode::Disabled => PreparedState::Disabled,
            AutoPrepareMode::Simple => PreparedState::Armed,
        }
    }

    pub fn status(&self) -> PreparedStatus {
        match self {
            PreparedState::Disabled => PreparedStatus::Disabled,
            PreparedState::Armed => PreparedStatus::Armed,
            PreparedState::PrimedForBuild => PreparedStatus::PrimedForBuild,
            PreparedState::Built(_) => PreparedStatus::Built,
        }
    }
}

impl fmt::Debug for PreparedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreparedState::Built(index) => f.debug_tuple("Built").field(index).finish(),
            other => fmt::Debug::fmt(&other.status(), f),
        }
    }
}

/// Copyable view of a [`PreparedState`], without the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreparedStatus {
    Disabled,
    Armed,
    PrimedForBuild,
    Built,
}

/// Per-geometry prepared state machine.
///
/// Interior mutability keeps predicates callable through `&Geometry`; the
/// `RefCell` also makes geometries `!Sync`, so a geometry has one logical
/// owner at a time.
#[derive(Debug)]
pub struct PreparedIndexCache {
    state: RefCell<PreparedState>,
}

impl PreparedIndexCache {
    pub fn new(mode: AutoPrepareMode) -> Self {
        Self {
            state: RefCell::new(PreparedState::initial(mode)),
        }
    }

    pub fn status(&self) -> PreparedStatus {
        self.state.borrow().status()
    }

    pub fn is_prepared(&self) -> bool {
        matches!(*self.state.borrow(), PreparedState::Built(_))
    }

    /// Evaluate `predicate(subject, other)`, consulting and advancing the
    /// state machine.
    pub fn evaluate(
        &self,
        predicate: BinaryPredicate,
        subject: &NativeGeometry,
        other: &NativeGeometry,
        engine: &dyn GeometryEngine,
        capabilities: &EngineCapabilities,
    ) -> Result<bool> {
        let accelerated = predicate
            .tier()
            .is_some_and(|tier| capabilities.supports(tier));
        if !accelerated {
            return engine.predicate(predicate, subject, other);
        }

        let mut state = self.state.borrow_mut();
        let built = match &*state {
            PreparedState::Built(index) => return index.evaluate(predicate, other),
            PreparedState::Disabled => return engine.predicate(predicate, subject, other),
            PreparedState::Armed => None,
            PreparedState::PrimedForBuild => Some(engine.prepare(subject)?),
        };

        match built {
            None => {
                tracing::trace!(?predicate, "Prepared state armed -> primed");
                *state = PreparedState::PrimedForBuild;
                engine.predicate(predicate, subject, other)
            }
            Some(index) => {
                tracing::trace!(?predicate, "Prepared state primed -> built");
                let result = index.evaluate(predicate, other);
                *state = PreparedState::Built(index);
                result
            }
        }
    }

    /// Force a prepared index to exist, regardless of query history.
    pub fn prepare(
        &self,
        subject: &NativeGeometry,
        engine: &dyn GeometryEngine,
        capabilities: &EngineCapabilities,
    ) -> Result<()> {
        if !capabilities.supports_prepared() {
            return Err(GeometryError::unsupported("engine build has no prepared geometry support"));
        }
        let mut state = self.state.borrow_mut();
        if matches!(*state, PreparedState::Built(_)) {
            return Ok(());
        }
        let index = engine.prepare(subject)?;
        tracing::trace!(from = ?state.status(), "Prepared index built on request");
        *state = PreparedState::Built(index);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{test_shape, ExtraOrdinate, GeoEngine};

    fn native(text: &str) -> NativeGeometry {
        NativeGeometry::new(test_shape(text), ExtraOrdinate::None, Vec::new(), 0).unwrap()
    }

    #[test]
    fn test_armed_primed_built() {
        let engine = GeoEngine::new();
        let caps = EngineCapabilities::FULL;
        let square = native("POLYGON((0 0, 4 0, 4 4, 0 4, 0 0))");
        let point = native("POINT(1 1)");
        let cache = PreparedIndexCache::new(AutoPrepareMode::Simple);

        assert_eq!(cache.status(), PreparedStatus::Armed);
        assert!(cache
            .evaluate(BinaryPredicate::Contains, &square, &point, &engine, &caps)
            .unwrap());
        assert_eq!(cache.status(), PreparedStatus::PrimedForBuild);
        assert!(cache
            .evaluate(BinaryPredicate::Contains, &square, &point, &engine, &caps)
            .unwrap());
        assert_eq!(cache.status(), PreparedStatus::Built);
        assert!(cache.is_prepared());
    }

    #[test]
    fn test_unaccelerated_predicates_do_not_advance() {
        let engine = GeoEngine::new();
        let square = native("POLYGON((0 0, 4 0, 4 4, 0 4, 0 0))");
        let point = native("POINT(1 1)");
        let cache = PreparedIndexCache::new(AutoPrepareMode::Simple);

        cache
            .evaluate(
                BinaryPredicate::Equals,
                &square,
                &point,
                &engine,
                &EngineCapabilities::FULL,
            )
            .unwrap();
        assert_eq!(cache.status(), PreparedStatus::Armed);

        let tier1_only = EngineCapabilities::new(true, false).unwrap();
        for _ in 0..3 {
            cache
                .evaluate(
                    BinaryPredicate::Touches,
                    &square,
                    &point,
                    &engine,
                    &tier1_only,
                )
                .unwrap();
        }
        assert_eq!(cache.status(), PreparedStatus::Armed);
    }

    #[test]
    fn test_disabled_never_moves() {
        let engine = GeoEngine::new();
        let square = native("POLYGON((0 0, 4 0, 4 4, 0 4, 0 0))");
        let point = native("POINT(1 1)");
        let cache = PreparedIndexCache::new(AutoPrepareMode::Disabled);
        for _ in 0..5 {
            cache
                .evaluate(
                    BinaryPredicate::Intersects,
                    &square,
                    &point,
                    &engine,
                    &EngineCapabilities::FULL,
                )
                .unwrap();
        }
        assert_eq!(cache.status(), PreparedStatus::Disabled);

        cache
            .prepare(&square, &engine, &EngineCapabilities::FULL)
            .unwrap();
        assert_eq!(cache.status(), PreparedStatus::Built);
    }

    #[test]
    fn test_prepare_without_capability_is_unsupported() {
        let engine = GeoEngine::new();
        let square = native("POLYGON((0 0, 4 0, 4 4, 0 4, 0 0))");
        let cache = PreparedIndexCache::new(AutoPrepareMode::Simple);
        let err = cache
            .prepare(&square, &engine, &EngineCapabilities::NONE)
            .unwrap_err();
        assert!(matches!(err, GeometryError::UnsupportedOperation(_)));
        assert_eq!(cache.status(), PreparedStatus::Armed);
    }
}
