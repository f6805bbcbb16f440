//! Unit stat lines.

use crate::resources::Resources;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UnitType {
    Militia,
    Swordsman,
    Archer,
    Knight,
    Ram,
}

impl UnitType {
    pub const ALL: [UnitType; 5] = [
        UnitType::Militia,
        UnitType::Swordsman,
        UnitType::Archer,
        UnitType::Knight,
        UnitType::Ram,
    ];
}

impl fmt::Display for UnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UnitType::Militia => "militia",
            UnitType::Swordsman => "swordsman",
            UnitType::Archer => "archer",
            UnitType::Knight => "knight",
            UnitType::Ram => "ram",
        };
        write!(f, "{name}")
    }
}

/// Combat and logistics stats for one unit type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitStats {
    pub unit: UnitType,
    /// Base offensive stat, per unit.
    pub power: f64,
    /// Base defensive stat, per unit.
    pub armor: f64,
    /// Casualty-distribution order: lower reach fights in front and dies first.
    pub reach: u8,
    /// Flat percentage amplifier on both power and armor.
    pub discipline: f64,
    /// Population occupied per unit.
    pub population: u32,
    /// Resource units one soldier can carry home.
    pub loot_capacity: f64,
    /// Training time per unit at an unmodified barracks.
    pub train_secs: f64,
    /// Map fields travelled per hour.
    pub speed: f64,
    pub cost: Resources,
}

pub(crate) fn standard_catalog() -> HashMap<UnitType, UnitStats> {
    [
        UnitStats {
            unit: UnitType::Militia,
            power: 10.0,
            armor: 15.0,
            reach: 1,
            discipline: 0.0,
            population: 1,
            loot_capacity: 20.0,
            train_secs: 120.0,
            speed: 7.0,
            cost: Resources::new(45.0, 40.0, 20.0),
        },
        UnitStats {
            unit: UnitType::Swordsman,
            power: 35.0,
            armor: 30.0,
            reach: 1,
            discipline: 10.0,
            population: 1,
            loot_capacity: 35.0,
            train_secs: 300.0,
            speed: 6.0,
            cost: Resources::new(95.0, 75.0, 60.0),
        },
        UnitStats {
            unit: UnitType::Archer,
            power: 28.0,
            armor: 18.0,
            reach: 4,
            discipline: 5.0,
            population: 1,
            loot_capacity: 25.0,
            train_secs: 240.0,
            speed: 6.5,
            cost: Resources::new(80.0, 30.0, 55.0),
        },
        UnitStats {
            unit: UnitType::Knight,
            power: 90.0,
            armor: 60.0,
            reach: 2,
            discipline: 20.0,
            population: 3,
            loot_capacity: 80.0,
            train_secs: 900.0,
            speed: 10.0,
            cost: Resources::new(280.0, 160.0, 220.0),
        },
        UnitStats {
            unit: UnitType::Ram,
            power: 5.0,
            armor: 80.0,
            reach: 6,
            discipline: 0.0,
            population: 4,
            loot_capacity: 0.0,
            train_secs: 1400.0,
            speed: 4.0,
            cost: Resources::new(300.0, 200.0, 170.0),
        },
    ]
    .into_iter()
    .map(|stats| (stats.unit, stats))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_covers_all_units() {
        let catalog = standard_catalog();
        for unit in UnitType::ALL {
            assert!(catalog.contains_key(&unit));
        }
    }

    #[test]
    fn test_frontline_has_lowest_reach() {
        let catalog = standard_catalog();
        let militia = &catalog[&UnitType::Militia];
        let ram = &catalog[&UnitType::Ram];
        assert!(militia.reach < ram.reach);
    }
}
