//! Error types for geometry factories and operations.

use thiserror::Error;

/// Geometry layer errors.
#[derive(Error, Debug)]
pub enum GeometryError {
    /// Invalid factory configuration (e.g. both Z and M requested).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Malformed constructor input (too few points, failed element coercion,
    /// overlapping multi-polygon parts).
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// An explicitly requested capability that the bound engine lacks.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Failure reported by the geometry engine (topology errors etc.).
    #[error("Engine error: {0}")]
    Engine(String),

    /// WKT parse error.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl GeometryError {
    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        GeometryError::Configuration(msg.into())
    }

    /// Create an invalid geometry error
    pub fn invalid(msg: impl Into<String>) -> Self {
        GeometryError::InvalidGeometry(msg.into())
    }

    /// Create an unsupported operation error
    pub fn unsupported(msg: impl Into<String>) -> Self {
        GeometryError::UnsupportedOperation(msg.into())
    }

    /// Create an engine error
    pub fn engine(msg: impl Into<String>) -> Self {
        GeometryError::Engine(msg.into())
    }

    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        GeometryError::Parse(msg.into())
    }
}

/// Result type for geometry operations.
pub type Result<T> = std::result::Result<T, GeometryError>;
