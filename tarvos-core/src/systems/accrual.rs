//! Time-elapsed resource accrual.
//!
//! Stocks grow linearly with elapsed hours at a rate derived from the
//! matching production building's level, passed through the modifier engine,
//! and are capped by warehouse capacity. Accrual only ever raises a stock;
//! spending is an explicit debit performed by callers before a job is
//! accepted.

use crate::error::Result;
use crate::modifiers::{combine, ActiveFocuses, Combination, ModifierProvider};
use crate::state::City;
use crate::time::Timestamp;
use tarvos_data::{
    BuildingType, Modifier, ModifierTag, ResourceType, Resources, StaticData,
    BASE_PRODUCTION_PER_HOUR, BASE_WAREHOUSE_CAPACITY,
};

/// Per-resource storage cap from the city's warehouse level.
pub fn warehouse_capacity(city: &City, data: &StaticData) -> Result<f64> {
    match city.level(BuildingType::Warehouse) {
        0 => Ok(BASE_WAREHOUSE_CAPACITY),
        level => Ok(data.building_level(BuildingType::Warehouse, level)?.capacity),
    }
}

/// Hourly production of one resource, with the full modifier breakdown.
///
/// Sources: the production building's own level modifiers, the city's active
/// focus effects, and whatever the caller supplies (research, alliance).
pub fn hourly_rate(
    city: &City,
    data: &StaticData,
    resource: ResourceType,
    as_of: Timestamp,
    extra: &[Modifier],
) -> Result<Combination> {
    let building = BuildingType::producing(resource);
    let level = city.level(building);

    let (base, own_modifiers) = match level {
        0 => (BASE_PRODUCTION_PER_HOUR, Vec::new()),
        _ => {
            let config = data.building_level(building, level)?;
            (config.production_per_hour, config.modifiers.clone())
        }
    };

    let focuses = ActiveFocuses { city, as_of };
    let providers: [&dyn ModifierProvider; 3] = [&own_modifiers, &focuses, &extra];
    let tags = [
        ModifierTag::for_resource(resource),
        ModifierTag::ResourceProduction,
    ];
    Ok(combine(base, &tags, &providers))
}

/// Projected stocks at `as_of`, without committing them.
///
/// Each stock is `min(capacity, current + rate × hours)` and never below its
/// current value: elapsed time is floored at zero, and a stock already above
/// capacity is left alone rather than clawed back.
pub fn project(
    city: &City,
    data: &StaticData,
    as_of: Timestamp,
    extra: &[Modifier],
) -> Result<Resources> {
    let hours = as_of.hours_since(city.last_resource_update).max(0.0);
    let capacity = warehouse_capacity(city, data)?;

    let mut projected = city.resources;
    for resource in ResourceType::ALL {
        let current = projected[resource];
        if current >= capacity {
            continue;
        }
        let rate = hourly_rate(city, data, resource, as_of, extra)?.final_value;
        projected[resource] = (current + rate * hours).min(capacity);
    }
    Ok(projected)
}

/// Commit the projection: advance stocks and the accrual anchor to `as_of`,
/// and prune focus effects that have expired by then.
///
/// The anchor never moves backwards, so replaying an older timestamp is a
/// no-op rather than a rollback.
pub fn sync(city: &mut City, data: &StaticData, as_of: Timestamp, extra: &[Modifier]) -> Result<()> {
    city.resources = project(city, data, as_of, extra)?;
    if as_of > city.last_resource_update {
        city.last_resource_update = as_of;
    }
    let cutoff = city.last_resource_update;
    city.focus_effects.retain(|effect| effect.expires > cutoff);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::FocusEffect;
    use crate::testing::CityBuilder;

    fn data() -> StaticData {
        StaticData::standard()
    }

    #[test]
    fn test_baseline_rate_without_building() {
        let data = data();
        let city = CityBuilder::new("Empty").build();
        let rate = hourly_rate(&city, &data, ResourceType::Wood, Timestamp::from_secs(0), &[])
            .unwrap();
        assert_eq!(rate.final_value, BASE_PRODUCTION_PER_HOUR);
    }

    #[test]
    fn test_projection_caps_at_warehouse_capacity() {
        // 0-level warehouse (capacity 500), wood 490, production 20/hour,
        // one hour elapsed: the projection must stop at 500, not 510.
        let data = data();
        let t0 = Timestamp::from_secs(0);
        let city = CityBuilder::new("Capped")
            .building(BuildingType::LumberCamp, 1)
            .resources(Resources::new(490.0, 0.0, 0.0))
            .last_update(t0)
            .build();
        let rate = hourly_rate(&city, &data, ResourceType::Wood, t0, &[]).unwrap();
        assert_eq!(rate.final_value, 20.0);

        let projected = project(&city, &data, t0.plus_secs(3600.0), &[]).unwrap();
        assert_eq!(projected.wood, BASE_WAREHOUSE_CAPACITY);
        assert!(projected.stone > 0.0 && projected.stone <= BASE_WAREHOUSE_CAPACITY);
    }

    #[test]
    fn test_projection_is_monotone_and_bounded() {
        let data = data();
        let t0 = Timestamp::from_secs(0);
        let city = CityBuilder::new("Bounds")
            .building(BuildingType::LumberCamp, 5)
            .building(BuildingType::Warehouse, 2)
            .resources(Resources::new(10.0, 10.0, 10.0))
            .last_update(t0)
            .build();

        let capacity = warehouse_capacity(&city, &data).unwrap();
        let mut previous = city.resources;
        for hour in 1..200 {
            let projected =
                project(&city, &data, t0.plus_secs(hour as f64 * 3600.0), &[]).unwrap();
            for resource in ResourceType::ALL {
                assert!(projected[resource] >= previous[resource]);
                assert!(projected[resource] <= capacity);
                assert!(projected[resource] >= 0.0);
            }
            previous = projected;
        }
    }

    #[test]
    fn test_elapsed_time_is_floored_at_zero() {
        let data = data();
        let t0 = Timestamp::from_secs(1000);
        let city = CityBuilder::new("Backwards")
            .resources(Resources::new(100.0, 100.0, 100.0))
            .last_update(t0)
            .build();

        let projected = project(&city, &data, Timestamp::from_secs(0), &[]).unwrap();
        assert_eq!(projected, city.resources);
    }

    #[test]
    fn test_overfull_stock_is_not_clawed_back() {
        let data = data();
        let t0 = Timestamp::from_secs(0);
        // Loot deposits can leave a stock at the cap of a bigger, since
        // demolished, warehouse. Accrual must leave it untouched.
        let city = CityBuilder::new("Overfull")
            .resources(Resources::new(900.0, 0.0, 0.0))
            .last_update(t0)
            .build();

        let projected = project(&city, &data, t0.plus_secs(3600.0), &[]).unwrap();
        assert_eq!(projected.wood, 900.0);
    }

    #[test]
    fn test_sync_prunes_expired_focuses_and_anchors() {
        let data = data();
        let t0 = Timestamp::from_secs(0);
        let mut city = CityBuilder::new("Focused")
            .last_update(t0)
            .focus(FocusEffect {
                name: "harvest festival".into(),
                expires: t0.plus_secs(60.0),
                modifiers: vec![Modifier::increased(
                    ModifierTag::ResourceProduction,
                    0.5,
                    "festival",
                )],
            })
            .build();

        let later = t0.plus_secs(120.0);
        sync(&mut city, &data, later, &[]).unwrap();
        assert_eq!(city.last_resource_update, later);
        assert!(city.focus_effects.is_empty());

        // A stale timestamp must not rewind the anchor.
        sync(&mut city, &data, t0, &[]).unwrap();
        assert_eq!(city.last_resource_update, later);
    }

    #[test]
    fn test_external_modifiers_raise_the_rate() {
        let data = data();
        let city = CityBuilder::new("Researched").build();
        let research = [Modifier::increased(ModifierTag::WoodProduction, 0.10, "forestry")];

        let plain = hourly_rate(&city, &data, ResourceType::Wood, Timestamp::from_secs(0), &[])
            .unwrap();
        let boosted =
            hourly_rate(&city, &data, ResourceType::Wood, Timestamp::from_secs(0), &research)
                .unwrap();
        assert!((boosted.final_value - plain.final_value * 1.10).abs() < 1e-9);
    }
}
