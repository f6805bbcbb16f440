//! Building catalog: per-level costs, timings, and effects.
//!
//! Level values follow compounding growth curves from a base line, the way
//! long-running browser strategy servers balance their content. Level 0 is
//! "not built" and is never catalogued; production and storage fall back to
//! the crate-level `BASE_*` constants.

use crate::modifiers::{Modifier, ModifierTag};
use crate::resources::{ResourceType, Resources};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Highest level any building can reach in the standard catalog.
pub const MAX_BUILDING_LEVEL: u8 = 20;

const COST_GROWTH: f64 = 1.28;
const TIME_GROWTH: f64 = 1.22;
const PRODUCTION_GROWTH: f64 = 1.16;
const CAPACITY_GROWTH: f64 = 1.33;
const HOUSING_GROWTH: f64 = 1.22;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BuildingType {
    LumberCamp,
    Quarry,
    IronMine,
    Warehouse,
    Farm,
    Barracks,
    Academy,
}

impl BuildingType {
    pub const ALL: [BuildingType; 7] = [
        BuildingType::LumberCamp,
        BuildingType::Quarry,
        BuildingType::IronMine,
        BuildingType::Warehouse,
        BuildingType::Farm,
        BuildingType::Barracks,
        BuildingType::Academy,
    ];

    /// The building whose level drives production of `resource`.
    pub fn producing(resource: ResourceType) -> BuildingType {
        match resource {
            ResourceType::Wood => BuildingType::LumberCamp,
            ResourceType::Stone => BuildingType::Quarry,
            ResourceType::Metal => BuildingType::IronMine,
        }
    }
}

impl fmt::Display for BuildingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BuildingType::LumberCamp => "lumber camp",
            BuildingType::Quarry => "quarry",
            BuildingType::IronMine => "iron mine",
            BuildingType::Warehouse => "warehouse",
            BuildingType::Farm => "farm",
            BuildingType::Barracks => "barracks",
            BuildingType::Academy => "academy",
        };
        write!(f, "{name}")
    }
}

/// Configuration of one building level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingLevel {
    pub level: u8,
    pub cost: Resources,
    pub build_secs: f64,
    /// Population occupied by the building at this level (cumulative).
    pub population: u32,
    /// City score awarded when this level completes.
    pub points: u32,
    /// Hourly resource output at this level. Zero for non-production buildings.
    pub production_per_hour: f64,
    /// Per-resource storage capacity at this level. Zero unless a warehouse.
    pub capacity: f64,
    /// Population capacity granted at this level. Zero unless housing.
    pub housing: f64,
    /// Effects this level contributes to the city's modifier stack.
    pub modifiers: Vec<Modifier>,
}

struct BuildingCurve {
    building: BuildingType,
    base_cost: Resources,
    base_secs: f64,
    pop_per_level: u32,
    points_per_level: u32,
}

fn curve(building: BuildingType) -> BuildingCurve {
    match building {
        BuildingType::LumberCamp => BuildingCurve {
            building,
            base_cost: Resources::new(60.0, 45.0, 30.0),
            base_secs: 180.0,
            pop_per_level: 2,
            points_per_level: 1,
        },
        BuildingType::Quarry => BuildingCurve {
            building,
            base_cost: Resources::new(50.0, 60.0, 25.0),
            base_secs: 200.0,
            pop_per_level: 2,
            points_per_level: 1,
        },
        BuildingType::IronMine => BuildingCurve {
            building,
            base_cost: Resources::new(70.0, 60.0, 40.0),
            base_secs: 240.0,
            pop_per_level: 3,
            points_per_level: 1,
        },
        BuildingType::Warehouse => BuildingCurve {
            building,
            base_cost: Resources::new(130.0, 150.0, 60.0),
            base_secs: 300.0,
            pop_per_level: 1,
            points_per_level: 1,
        },
        BuildingType::Farm => BuildingCurve {
            building,
            base_cost: Resources::new(90.0, 70.0, 30.0),
            base_secs: 260.0,
            pop_per_level: 0,
            points_per_level: 1,
        },
        BuildingType::Barracks => BuildingCurve {
            building,
            base_cost: Resources::new(210.0, 140.0, 260.0),
            base_secs: 480.0,
            pop_per_level: 4,
            points_per_level: 2,
        },
        BuildingType::Academy => BuildingCurve {
            building,
            base_cost: Resources::new(220.0, 160.0, 90.0),
            base_secs: 540.0,
            pop_per_level: 4,
            points_per_level: 3,
        },
    }
}

fn level_config(curve: &BuildingCurve, level: u8) -> BuildingLevel {
    let growth = |base: f64, factor: f64| base * factor.powi(level as i32 - 1);

    let production_per_hour = match curve.building {
        BuildingType::LumberCamp | BuildingType::Quarry | BuildingType::IronMine => {
            growth(20.0, PRODUCTION_GROWTH)
        }
        _ => 0.0,
    };
    let capacity = match curve.building {
        // Level 1 already outgrows the unbuilt 500 baseline.
        BuildingType::Warehouse => 800.0 * CAPACITY_GROWTH.powi(level as i32 - 1),
        _ => 0.0,
    };
    let housing = match curve.building {
        BuildingType::Farm => growth(80.0, HOUSING_GROWTH),
        _ => 0.0,
    };
    let modifiers = match curve.building {
        BuildingType::Barracks => vec![Modifier::increased(
            ModifierTag::RecruitmentSpeed,
            0.04 * level as f64,
            "barracks",
        )],
        BuildingType::Academy => vec![Modifier::increased(
            ModifierTag::ResearchSpeed,
            0.05 * level as f64,
            "academy",
        )],
        _ => Vec::new(),
    };

    BuildingLevel {
        level,
        cost: Resources {
            wood: growth(curve.base_cost.wood, COST_GROWTH).round(),
            stone: growth(curve.base_cost.stone, COST_GROWTH).round(),
            metal: growth(curve.base_cost.metal, COST_GROWTH).round(),
        },
        build_secs: growth(curve.base_secs, TIME_GROWTH).round(),
        population: curve.pop_per_level * level as u32,
        points: curve.points_per_level,
        production_per_hour,
        capacity,
        housing,
        modifiers,
    }
}

pub(crate) fn standard_catalog() -> HashMap<BuildingType, Vec<BuildingLevel>> {
    BuildingType::ALL
        .into_iter()
        .map(|building| {
            let curve = curve(building);
            let levels = (1..=MAX_BUILDING_LEVEL)
                .map(|level| level_config(&curve, level))
                .collect();
            (building, levels)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BASE_WAREHOUSE_CAPACITY;

    #[test]
    fn test_costs_grow_per_level() {
        let catalog = standard_catalog();
        for levels in catalog.values() {
            for pair in levels.windows(2) {
                assert!(pair[1].cost.total() > pair[0].cost.total());
                assert!(pair[1].build_secs > pair[0].build_secs);
            }
        }
    }

    #[test]
    fn test_production_buildings_outproduce_baseline() {
        let catalog = standard_catalog();
        for building in [
            BuildingType::LumberCamp,
            BuildingType::Quarry,
            BuildingType::IronMine,
        ] {
            let first = &catalog[&building][0];
            assert!(first.production_per_hour > crate::BASE_PRODUCTION_PER_HOUR);
        }
    }

    #[test]
    fn test_warehouse_levels_outgrow_baseline() {
        let catalog = standard_catalog();
        let warehouse = &catalog[&BuildingType::Warehouse];
        assert!(warehouse[0].capacity > BASE_WAREHOUSE_CAPACITY);
        for pair in warehouse.windows(2) {
            assert!(pair[1].capacity > pair[0].capacity);
        }
    }

    #[test]
    fn test_population_is_cumulative() {
        let catalog = standard_catalog();
        let barracks = &catalog[&BuildingType::Barracks];
        assert_eq!(barracks[0].population, 4);
        assert_eq!(barracks[2].population, 12);
        // Upgrading reserves only the delta between adjacent levels.
        assert_eq!(barracks[2].population - barracks[1].population, 4);
    }

    #[test]
    fn test_only_farm_houses_population() {
        let catalog = standard_catalog();
        for (building, levels) in &catalog {
            let housing = levels[0].housing;
            if *building == BuildingType::Farm {
                assert!(housing > 0.0);
            } else {
                assert_eq!(housing, 0.0);
            }
        }
    }
}
