//! # Tarvos Static Data
//!
//! Read-only game content for the simulation engine: building catalogs with
//! per-level costs and timings, unit stat lines, and the research tree.
//!
//! Content is versioned and never mutated by the engine. [`StaticData`] is the
//! single lookup surface the core crates depend on; a server pins one instance
//! for its lifetime.

pub mod buildings;
pub mod modifiers;
pub mod research;
pub mod resources;
pub mod units;

pub use buildings::{BuildingLevel, BuildingType, MAX_BUILDING_LEVEL};
pub use modifiers::{Modifier, ModifierKind, ModifierTag};
pub use research::{ResearchId, ResearchNode};
pub use resources::{ResourceType, Resources};
pub use units::{UnitStats, UnitType};

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Hourly output of a production building that has not been built yet.
pub const BASE_PRODUCTION_PER_HOUR: f64 = 10.0;

/// Storage capacity of a city whose warehouse has not been built yet.
pub const BASE_WAREHOUSE_CAPACITY: f64 = 500.0;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataError {
    #[error("no level {level} defined for {building:?}")]
    UnknownBuildingLevel { building: BuildingType, level: u8 },
    #[error("unknown research node {0}")]
    UnknownResearch(ResearchId),
    #[error("no stats defined for unit {0:?}")]
    UnknownUnit(UnitType),
}

/// The complete content catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticData {
    /// Content revision, bumped whenever balance values change.
    pub version: u32,
    buildings: HashMap<BuildingType, Vec<BuildingLevel>>,
    units: HashMap<UnitType, UnitStats>,
    research: HashMap<ResearchId, ResearchNode>,
}

impl StaticData {
    /// The standard balance catalog shipped with the engine.
    pub fn standard() -> Self {
        let data = Self {
            version: 1,
            buildings: buildings::standard_catalog(),
            units: units::standard_catalog(),
            research: research::standard_catalog(),
        };
        log::debug!(
            "built standard catalog v{}: {} buildings, {} units, {} research nodes",
            data.version,
            data.buildings.len(),
            data.units.len(),
            data.research.len()
        );
        data
    }

    /// Level configuration for a building. Levels are 1-based; level 0 means
    /// "not built" and is covered by the `BASE_*` fallbacks.
    pub fn building_level(
        &self,
        building: BuildingType,
        level: u8,
    ) -> Result<&BuildingLevel, DataError> {
        self.buildings
            .get(&building)
            .and_then(|levels| levels.get(level.checked_sub(1)? as usize))
            .ok_or(DataError::UnknownBuildingLevel { building, level })
    }

    /// Highest defined level for a building.
    pub fn max_level(&self, building: BuildingType) -> u8 {
        self.buildings
            .get(&building)
            .map(|levels| levels.len() as u8)
            .unwrap_or(0)
    }

    pub fn unit(&self, unit: UnitType) -> Result<&UnitStats, DataError> {
        self.units.get(&unit).ok_or(DataError::UnknownUnit(unit))
    }

    pub fn research(&self, id: ResearchId) -> Result<&ResearchNode, DataError> {
        self.research.get(&id).ok_or(DataError::UnknownResearch(id))
    }

    /// All research nodes, in id order.
    pub fn research_nodes(&self) -> Vec<&ResearchNode> {
        let mut nodes: Vec<_> = self.research.values().collect();
        nodes.sort_by_key(|n| n.id);
        nodes
    }
}
