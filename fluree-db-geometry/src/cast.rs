//! Casting geometries between factories and kinds.
//!
//! A cast tries cheap paths before rebuilding coordinates:
//!
//! ```text
//!   cast(G, target, options)
//!     │
//!     ├─ combined optimizer   combined G → its own Z/M sibling: hand out the shadow
//!     │                       combined G → compatible combined factory: re-point both shadows
//!     ├─ generic optimizer    same kind, compatible factory: re-point the native geometry
//!     │                       line string family kind change: re-wrap, no validation
//!     └─ full rebuild         lower to a Structure, project, convert kind, build
//! ```
//!
//! Factories are compatible when they carry the same extra ordinates and,
//! for projecting casts, share a coordinate system. A projecting cast
//! between different coordinate systems always rebuilds. The source
//! geometry is never modified.

use crate::combined::{CombinedFactory, CombinedGeometry};
use crate::coord_sys::CoordinateSystem;
use crate::error::{GeometryError, Result};
use crate::factory::Factory;
use crate::geometry::Geometry;
use crate::kind::GeometryKind;
use crate::structure::Structure;

/// Either kind of geometry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AnyGeometry {
    Plain(Geometry),
    Combined(CombinedGeometry),
}

impl AnyGeometry {
    pub fn kind(&self) -> GeometryKind {
        self.as_geometry_ref().kind()
    }

    pub fn factory(&self) -> AnyFactory {
        self.as_geometry_ref().factory()
    }

    pub fn as_geometry_ref(&self) -> GeometryRef<'_> {
        match self {
            AnyGeometry::Plain(g) => GeometryRef::Plain(g),
            AnyGeometry::Combined(g) => GeometryRef::Combined(g),
        }
    }

    pub fn rep_equals(&self, other: &AnyGeometry) -> bool {
        match (self, other) {
            (AnyGeometry::Plain(a), AnyGeometry::Plain(b)) => a.rep_equals(b),
            (AnyGeometry::Combined(a), AnyGeometry::Combined(b)) => a.rep_equals(b),
            _ => false,
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            AnyGeometry::Plain(g) => g.as_text(),
            AnyGeometry::Combined(g) => g.as_text(),
        }
    }

    /// The plain geometry, or an error for a combined one.
    pub fn into_plain(self) -> Result<Geometry> {
        match self {
            AnyGeometry::Plain(g) => Ok(g),
            AnyGeometry::Combined(_) => {
                Err(GeometryError::invalid("expected a plain geometry, got a combined one"))
            }
        }
    }

    /// The combined geometry, or an error for a plain one.
    pub fn into_combined(self) -> Result<CombinedGeometry> {
        match self {
            AnyGeometry::Combined(g) => Ok(g),
            AnyGeometry::Plain(_) => {
                Err(GeometryError::invalid("expected a combined geometry, got a plain one"))
            }
        }
    }
}

impl From<Geometry> for AnyGeometry {
    fn from(g: Geometry) -> Self {
        AnyGeometry::Plain(g)
    }
}

impl From<CombinedGeometry> for AnyGeometry {
    fn from(g: CombinedGeometry) -> Self {
        AnyGeometry::Combined(g)
    }
}

/// Borrowed view of either kind of geometry.
#[derive(Debug, Clone, Copy)]
pub enum GeometryRef<'a> {
    Plain(&'a Geometry),
    Combined(&'a CombinedGeometry),
}

impl GeometryRef<'_> {
    pub fn kind(&self) -> GeometryKind {
        match self {
            GeometryRef::Plain(g) => g.kind(),
            GeometryRef::Combined(g) => g.kind(),
        }
    }

    pub fn factory(&self) -> AnyFactory {
        match self {
            GeometryRef::Plain(g) => AnyFactory::Plain(g.factory().clone()),
            GeometryRef::Combined(g) => AnyFactory::Combined(g.factory().clone()),
        }
    }

    fn to_structure(self) -> Structure {
        match self {
            GeometryRef::Plain(g) => g.to_structure(),
            GeometryRef::Combined(g) => g.to_structure(),
        }
    }
}

impl<'a> From<&'a Geometry> for GeometryRef<'a> {
    fn from(g: &'a Geometry) -> Self {
        GeometryRef::Plain(g)
    }
}

impl<'a> From<&'a CombinedGeometry> for GeometryRef<'a> {
    fn from(g: &'a CombinedGeometry) -> Self {
        GeometryRef::Combined(g)
    }
}

impl<'a> From<&'a AnyGeometry> for GeometryRef<'a> {
    fn from(g: &'a AnyGeometry) -> Self {
        g.as_geometry_ref()
    }
}

/// Either kind of factory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AnyFactory {
    Plain(Factory),
    Combined(CombinedFactory),
}

impl AnyFactory {
    pub fn coordinate_system(&self) -> Option<&CoordinateSystem> {
        match self {
            AnyFactory::Plain(f) => f.coordinate_system(),
            AnyFactory::Combined(f) => f.coordinate_system(),
        }
    }

    /// (has Z, has M).
    fn ordinates(&self) -> (bool, bool) {
        match self {
            AnyFactory::Plain(f) => (f.has_z(), f.has_m()),
            AnyFactory::Combined(_) => (true, true),
        }
    }

    fn resolver_factory(&self) -> &Factory {
        match self {
            AnyFactory::Plain(f) => f,
            AnyFactory::Combined(f) => f.z_factory(),
        }
    }

    /// Build a geometry of `kind` through this factory's constructors.
    pub fn build(&self, kind: GeometryKind, structure: Structure) -> Result<AnyGeometry> {
        match self {
            AnyFactory::Plain(f) => f.build(kind, structure).map(AnyGeometry::Plain),
            AnyFactory::Combined(f) => f.build(kind, structure).map(AnyGeometry::Combined),
        }
    }
}

impl From<Factory> for AnyFactory {
    fn from(f: Factory) -> Self {
        AnyFactory::Plain(f)
    }
}

impl From<CombinedFactory> for AnyFactory {
    fn from(f: CombinedFactory) -> Self {
        AnyFactory::Combined(f)
    }
}

/// Cast request options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CastOptions {
    /// Requested kind; `None` keeps the geometry's kind.
    pub kind: Option<GeometryKind>,
    /// When the requested kind is a supertype of the geometry's kind, keep
    /// the more specific kind.
    pub keep_subtype: bool,
    /// Project coordinates into the target's coordinate system.
    pub project: bool,
}

impl CastOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_kind(mut self, kind: GeometryKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_keep_subtype(mut self, keep_subtype: bool) -> Self {
        self.keep_subtype = keep_subtype;
        self
    }

    pub fn with_project(mut self, project: bool) -> Self {
        self.project = project;
        self
    }

    /// Target kind for a geometry of kind `current`.
    pub fn resolve_kind(&self, current: GeometryKind) -> GeometryKind {
        match self.kind {
            None => current,
            Some(requested) if self.keep_subtype && current.is_subtype_of(requested) => current,
            Some(requested) => requested,
        }
    }
}

/// Which path a cast took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CastPath {
    /// A combined geometry's existing shadow was returned.
    Shadow,
    /// The native data was re-pointed at the target factory.
    Reassign,
    /// The native data was re-wrapped as another line string kind.
    Rewrap,
    /// Coordinates were lowered and rebuilt through the target factory.
    Rebuild,
}

/// Cast `geometry` into `target`.
pub fn cast<'a>(
    geometry: impl Into<GeometryRef<'a>>,
    target: &AnyFactory,
    options: CastOptions,
) -> Result<AnyGeometry> {
    cast_traced(geometry, target, options).map(|(cast, _)| cast)
}

/// Cast `geometry` into `target`, also reporting the path taken.
pub fn cast_traced<'a>(
    geometry: impl Into<GeometryRef<'a>>,
    target: &AnyFactory,
    options: CastOptions,
) -> Result<(AnyGeometry, CastPath)> {
    let source = geometry.into();
    let kind = options.resolve_kind(source.kind());

    let optimized = combined_optimizer(source, target, kind, &options)
        .or_else(|| generic_optimizer(source, target, kind, &options));
    if let Some((cast, path)) = optimized {
        tracing::debug!(from = %source.kind(), to = %kind, ?path, "Optimized geometry cast");
        return Ok((cast, path));
    }

    tracing::trace!(
        from = %source.kind(),
        to = %kind,
        project = options.project,
        "Rebuilding geometry for cast"
    );
    let cast = rebuild(source, target, kind, &options)?;
    Ok((cast, CastPath::Rebuild))
}

/// Cast a plain geometry into a plain factory.
pub fn cast_plain(geometry: &Geometry, target: &Factory, options: CastOptions) -> Result<Geometry> {
    cast(geometry, &AnyFactory::Plain(target.clone()), options)?.into_plain()
}

impl Geometry {
    /// Cast into `target`. See [`cast`].
    pub fn cast(&self, target: &Factory, options: CastOptions) -> Result<Geometry> {
        cast_plain(self, target, options)
    }
}

impl CombinedGeometry {
    /// Cast into any factory. See [`cast`].
    pub fn cast(&self, target: &AnyFactory, options: CastOptions) -> Result<AnyGeometry> {
        cast(self, target, options)
    }
}

/// Same extra ordinates, and the same coordinate system when projecting.
fn compatible(source: &AnyFactory, target: &AnyFactory, project: bool) -> bool {
    source.ordinates() == target.ordinates()
        && (!project || source.coordinate_system() == target.coordinate_system())
}

fn combined_optimizer(
    source: GeometryRef<'_>,
    target: &AnyFactory,
    kind: GeometryKind,
    options: &CastOptions,
) -> Option<(AnyGeometry, CastPath)> {
    let GeometryRef::Combined(geometry) = source else {
        return None;
    };
    if kind != geometry.kind() {
        return None;
    }
    match target {
        AnyFactory::Plain(factory) => {
            let shadow = if factory == geometry.factory().z_factory() {
                geometry.z_shadow()
            } else if factory == geometry.factory().m_factory() {
                geometry.m_shadow()
            } else {
                return None;
            };
            Some((AnyGeometry::Plain(shadow.clone()), CastPath::Shadow))
        }
        AnyFactory::Combined(factory) => {
            if !compatible(&source.factory(), target, options.project) {
                return None;
            }
            let z = geometry.z_shadow().reassigned(factory.z_factory(), kind);
            let m = geometry.m_shadow().reassigned(factory.m_factory(), kind);
            let pair = CombinedGeometry::pair(factory.clone(), z, m).ok()?;
            Some((AnyGeometry::Combined(pair), CastPath::Reassign))
        }
    }
}

fn generic_optimizer(
    source: GeometryRef<'_>,
    target: &AnyFactory,
    kind: GeometryKind,
    options: &CastOptions,
) -> Option<(AnyGeometry, CastPath)> {
    let (GeometryRef::Plain(geometry), AnyFactory::Plain(factory)) = (source, target) else {
        return None;
    };
    if !compatible(&source.factory(), target, options.project) {
        return None;
    }
    if kind == geometry.kind() {
        let cast = geometry.reassigned(factory, kind);
        return Some((AnyGeometry::Plain(cast), CastPath::Reassign));
    }
    if kind.is_line_string_family() && geometry.kind().is_line_string_family() {
        let cast = geometry.reassigned(factory, kind);
        return Some((AnyGeometry::Plain(cast), CastPath::Rewrap));
    }
    None
}

fn rebuild(
    source: GeometryRef<'_>,
    target: &AnyFactory,
    kind: GeometryKind,
    options: &CastOptions,
) -> Result<AnyGeometry> {
    let mut structure = source.to_structure();

    if options.project {
        let source_factory = source.factory();
        if let (Some(from), Some(to)) = (
            source_factory.coordinate_system(),
            target.coordinate_system(),
        ) {
            if from != to {
                let resolver = target.resolver_factory().resolver();
                structure.try_for_each_coord_mut(&mut |c| {
                    let (x, y) = resolver.transform(from, to, c.x, c.y)?;
                    c.x = x;
                    c.y = y;
                    Ok(())
                })?;
            }
        }
    }

    let structure = structure.convert(source.kind(), kind)?;
    target.build(kind, structure)
}
