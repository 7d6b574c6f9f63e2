//! Geometry factories for Fluree DB.
//!
//! This crate wraps a planar geometry engine (the `geo` crate) behind
//! configurable factories. It supports:
//!
//! - **Factories as identity**: two factories are equal iff the configurations
//!   they were created from are equal, and every geometry knows the factory
//!   that built it
//! - **Prepared predicate caching** that arms on first use and builds a
//!   segment index on the second accelerated predicate call
//! - **Z+M emulation** by pairing a Z-carrying and an M-carrying geometry
//! - **Casting** between factories and kinds, reusing native data when possible
//! - **WKT / EWKT** parsing and generation
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                 FactoryConfig  ──►  Factory                  │
//! │      (srid, Z/M, buffer resolution, auto-prepare, codec)     │
//! └──────────────────────────────────────────────────────────────┘
//!          │ constructors / parse_wkt          │ CombinedFactory
//!          ▼                                   ▼ (Z sibling + M sibling)
//!      Geometry ─────────────────────────► CombinedGeometry
//!          │  kind, NativeGeometry,            (z shadow, m shadow)
//!          │  PreparedIndexCache                      │
//!          ▼                                          │
//!    GeometryEngine (GeoEngine) ◄─────────────────────┘
//!          │
//!          ▼
//!    predicates · overlays · buffer · relate
//! ```
//!
//! # Modules
//!
//! - [`config`]: Factory and codec configuration
//! - [`factory`]: Geometry factory, constructors and properties
//! - [`geometry`]: The geometry handle and its operations
//! - [`combined`]: Z+M emulation over two sibling factories
//! - [`cast`]: Casting between factories and kinds
//! - [`prepared`]: Per-geometry prepared state machine
//! - [`engine`]: Engine abstraction and the `geo` backed implementation
//! - [`codec`]: WKT / EWKT generation and parsing
//! - [`structure`]: Engine-neutral coordinate trees
//! - [`kind`]: Geometry kinds and their subtype relation
//! - [`capability`]: Engine capability flags
//! - [`coord_sys`]: Coordinate systems and SRID resolution
//! - [`error`]: Error types

pub mod capability;
pub mod cast;
pub mod codec;
pub mod combined;
pub mod config;
pub mod coord_sys;
pub mod engine;
pub mod error;
pub mod factory;
pub mod geometry;
pub mod kind;
pub mod prepared;
pub mod structure;

// Re-export key types
pub use capability::{EngineCapabilities, PreparedTier};
pub use cast::{cast, cast_traced, AnyFactory, AnyGeometry, CastOptions, CastPath, GeometryRef};
pub use codec::{OrdinateLayout, ParsedWkt, WktCodec};
pub use combined::{CombinedFactory, CombinedGeometry};
pub use config::{AutoPrepareMode, CodecConfig, FactoryConfig};
pub use coord_sys::{
    BuiltinResolver, CoordinateSystem, CoordinateSystemKind, CoordinateSystemResolver,
};
pub use engine::{
    BinaryPredicate, ExtraOrdinate, GeoEngine, GeometryEngine, NativeGeometry, OverlayOp,
    UnaryOp,
};
pub use error::{GeometryError, Result};
pub use factory::{Factory, FactoryProperty, PropertyValue};
pub use geometry::Geometry;
pub use kind::GeometryKind;
pub use prepared::PreparedStatus;
pub use structure::{Coord4, Structure};
