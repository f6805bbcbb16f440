//! Test fixtures shared across the crate's test modules.

use crate::state::{City, CityId, FocusEffect, PlayerId, Position};
use crate::time::Timestamp;
use tarvos_data::{BuildingType, Resources, UnitType};

/// Fluent builder for city fixtures.
pub struct CityBuilder {
    city: City,
}

impl CityBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            city: City::new(CityId(0), name, Position::new(0, 0)),
        }
    }

    pub fn owner(mut self, player: PlayerId) -> Self {
        self.city.owner = Some(player);
        self
    }

    pub fn position(mut self, position: Position) -> Self {
        self.city.position = position;
        self
    }

    pub fn resources(mut self, resources: Resources) -> Self {
        self.city.resources = resources;
        self
    }

    pub fn last_update(mut self, at: Timestamp) -> Self {
        self.city.last_resource_update = at;
        self
    }

    pub fn building(mut self, building: BuildingType, level: u8) -> Self {
        self.city.set_level(building, level);
        self
    }

    pub fn units(mut self, unit: UnitType, quantity: u32) -> Self {
        self.city.add_units(unit, quantity);
        self
    }

    pub fn focus(mut self, effect: FocusEffect) -> Self {
        self.city.focus_effects.push(effect);
        self
    }

    pub fn build(self) -> City {
        self.city
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let city = CityBuilder::new("Testheim").build();
        assert_eq!(city.name, "Testheim");
        assert_eq!(city.owner, None);
        assert_eq!(city.resources, Resources::ZERO);
        assert!(city.buildings.is_empty());
    }

    #[test]
    fn test_builder_composes() {
        let city = CityBuilder::new("Testheim")
            .owner(PlayerId(3))
            .building(BuildingType::Farm, 2)
            .units(UnitType::Archer, 7)
            .build();

        assert_eq!(city.owner, Some(PlayerId(3)));
        assert_eq!(city.level(BuildingType::Farm), 2);
        assert_eq!(city.unit_count(UnitType::Archer), 7);
    }
}
