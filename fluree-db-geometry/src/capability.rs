//! Engine capability descriptor.
//!
//! Describes which prepared-predicate acceleration tiers the bound engine
//! build supports. Computed once when an engine is created and copied into
//! every factory built on it, so nothing downstream consults global state.

use crate::error::{GeometryError, Result};
use serde::{Deserialize, Serialize};

/// Prepared-predicate acceleration tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PreparedTier {
    /// `contains` and `intersects`.
    Tier1,
    /// Tier 1 plus `disjoint`, `touches`, `crosses`, `within`, `overlaps`.
    Tier2,
}

/// Immutable description of what the linked engine can accelerate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EngineCapabilities {
    prepared_tier1: bool,
    prepared_tier2: bool,
}

impl EngineCapabilities {
    /// Capabilities of a build that accelerates every tier.
    pub const FULL: EngineCapabilities = EngineCapabilities {
        prepared_tier1: true,
        prepared_tier2: true,
    };

    /// Capabilities of a build without any prepared geometry support.
    pub const NONE: EngineCapabilities = EngineCapabilities {
        prepared_tier1: false,
        prepared_tier2: false,
    };

    /// Create a descriptor. Tier 2 acceleration requires Tier 1.
    pub fn new(prepared_tier1: bool, prepared_tier2: bool) -> Result<Self> {
        if prepared_tier2 && !prepared_tier1 {
            return Err(GeometryError::configuration(
                "tier 2 prepared acceleration requires tier 1",
            ));
        }
        Ok(Self {
            prepared_tier1,
            prepared_tier2,
        })
    }

    /// Whether predicates of `tier` can be served by a prepared index.
    pub fn supports(&self, tier: PreparedTier) -> bool {
        match tier {
            PreparedTier::Tier1 => self.prepared_tier1,
            PreparedTier::Tier2 => self.prepared_tier2,
        }
    }

    /// Whether any prepared acceleration is available.
    pub fn supports_prepared(&self) -> bool {
        self.prepared_tier1
    }
}

impl Default for EngineCapabilities {
    fn default() -> Self {
        Self::FULL
    }
}
