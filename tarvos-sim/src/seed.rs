//! Demo world seeding for the standalone simulator.

use tarvos_core::{
    City, CityId, GameStore, MemoryStore, Player, PlayerId, Position, Timestamp,
};
use tarvos_data::{BuildingType, Resources, UnitType};

fn city(
    name: &str,
    owner: Option<PlayerId>,
    position: Position,
    now: Timestamp,
    buildings: &[(BuildingType, u8)],
    garrison: &[(UnitType, u32)],
) -> City {
    let mut city = City::new(CityId(0), name, position);
    city.owner = owner;
    city.resources = Resources::new(600.0, 500.0, 400.0);
    city.last_resource_update = now;
    for &(building, level) in buildings {
        city.set_level(building, level);
    }
    for &(unit, quantity) in garrison {
        city.add_units(unit, quantity);
    }
    city
}

/// A small two-player world with an unowned settlement worth raiding.
pub fn demo_world(now: Timestamp) -> MemoryStore {
    let mut store = MemoryStore::new();

    let mut ragna = Player::new(PlayerId(0), "Ragna");
    ragna.research_points = 400.0;
    let ragna = store.add_player(ragna);

    let mut boric = Player::new(PlayerId(0), "Boric");
    boric.research_points = 150.0;
    let boric = store.add_player(boric);

    store.add_city(city(
        "Ravenholt",
        Some(ragna),
        Position::new(0, 0),
        now,
        &[
            (BuildingType::LumberCamp, 4),
            (BuildingType::Quarry, 3),
            (BuildingType::IronMine, 2),
            (BuildingType::Warehouse, 3),
            (BuildingType::Farm, 5),
            (BuildingType::Barracks, 2),
            (BuildingType::Academy, 1),
        ],
        &[(UnitType::Militia, 30), (UnitType::Swordsman, 12)],
    ));

    store.add_city(city(
        "Dunmar",
        Some(boric),
        Position::new(14, -6),
        now,
        &[
            (BuildingType::LumberCamp, 3),
            (BuildingType::Quarry, 4),
            (BuildingType::Warehouse, 2),
            (BuildingType::Farm, 4),
            (BuildingType::Barracks, 1),
        ],
        &[(UnitType::Militia, 20), (UnitType::Archer, 10)],
    ));

    // An unowned ruin: accrues at baseline rates, defends with what it has.
    store.add_city(city(
        "Old Hollowfort",
        None,
        Position::new(5, 9),
        now,
        &[],
        &[(UnitType::Militia, 8)],
    ));

    log::info!(
        "seeded demo world: {} cities, 2 players",
        store.city_ids().len()
    );
    store
}
