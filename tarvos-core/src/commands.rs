//! The synchronous request path: queue jobs, cancel research, launch
//! deployments.
//!
//! Commands validate, debit atomically, and enqueue — effects land later via
//! the tick scheduler. Resources are debited here at submission, never
//! mid-tick, so the engines never raise `InsufficientResources` while a tick
//! is running. Commands and the tick loop share `&mut` access to the store,
//! which serializes mutation of any one city by construction.

use crate::error::{EngineError, Result};
use crate::modifiers::{combine, research_modifiers, ActiveFocuses, CityBuildings, ModifierProvider};
use crate::state::{
    City, CityId, DeploymentId, DeploymentKind, Job, JobId, JobKind, MovementStatus, PlayerId,
    UnitDeployment,
};
use crate::store::GameStore;
use crate::systems::{accrual, population};
use crate::time::Timestamp;
use tarvos_data::{
    BuildingType, Modifier, ModifierTag, ResearchId, Resources, StaticData, UnitType,
};

/// Floor for stacked speed penalties, so a duration can never become
/// unbounded.
const MIN_SPEED_FACTOR: f64 = 0.1;

/// Player-initiated actions against the simulation.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    QueueConstruction {
        city: CityId,
        building: BuildingType,
    },
    QueueRecruitment {
        city: CityId,
        unit: UnitType,
        quantity: u32,
    },
    QueueResearch {
        city: CityId,
        node: ResearchId,
    },
    CancelResearch {
        job: JobId,
    },
    SendDeployment {
        origin: CityId,
        target: CityId,
        unit: UnitType,
        quantity: u32,
        kind: DeploymentKind,
    },
}

/// What a successfully executed command produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    JobQueued(JobId),
    JobCancelled(JobId),
    DeploymentLaunched(DeploymentId),
}

/// Execute one command on behalf of `player` at `now`.
pub fn execute_command(
    store: &mut dyn GameStore,
    data: &StaticData,
    player: PlayerId,
    command: Command,
    now: Timestamp,
) -> Result<CommandOutcome> {
    match command {
        Command::QueueConstruction { city, building } => {
            queue_construction(store, data, player, city, building, now)
        }
        Command::QueueRecruitment {
            city,
            unit,
            quantity,
        } => queue_recruitment(store, data, player, city, unit, quantity, now),
        Command::QueueResearch { city, node } => {
            queue_research(store, data, player, city, node, now)
        }
        Command::CancelResearch { job } => cancel_research(store, data, player, job, now),
        Command::SendDeployment {
            origin,
            target,
            unit,
            quantity,
            kind,
        } => send_deployment(store, data, player, origin, target, unit, quantity, kind, now),
    }
}

fn owned_city(store: &dyn GameStore, player: PlayerId, city: CityId) -> Result<City> {
    let city_row = store.city(city)?;
    if city_row.owner != Some(player) {
        return Err(EngineError::NotOwned { city, player });
    }
    Ok(city_row)
}

/// Combined speed factor for a duration tag; higher is faster.
fn speed_factor(
    city: &City,
    data: &StaticData,
    tag: ModifierTag,
    research: &[Modifier],
    now: Timestamp,
) -> f64 {
    let buildings = CityBuildings { city, data };
    let focuses = ActiveFocuses { city, as_of: now };
    let providers: [&dyn ModifierProvider; 3] = [&buildings, &focuses, &research];
    combine(1.0, &[tag], &providers)
        .final_value
        .max(MIN_SPEED_FACTOR)
}

fn debit(city: &mut City, cost: &Resources) -> Result<()> {
    if !city.resources.covers(cost) {
        return Err(EngineError::InsufficientResources {
            needed: *cost,
            available: city.resources,
        });
    }
    city.resources = city.resources.saturating_sub(cost);
    Ok(())
}

fn check_population(
    city: &City,
    data: &StaticData,
    store: &dyn GameStore,
    needed: f64,
    research: &[Modifier],
    now: Timestamp,
) -> Result<()> {
    let jobs = store.jobs_for_city(city.id);
    let available = population::available_population(city, data, &jobs, now, research)?;
    if needed > available {
        return Err(EngineError::InsufficientPopulation { needed, available });
    }
    Ok(())
}

fn queue_construction(
    store: &mut dyn GameStore,
    data: &StaticData,
    player: PlayerId,
    city_id: CityId,
    building: BuildingType,
    now: Timestamp,
) -> Result<CommandOutcome> {
    let mut city = owned_city(store, player, city_id)?;
    let player_row = store.player(player)?;
    let research = research_modifiers(&player_row, data);

    let pending_upgrade = store.jobs_for_city(city_id).into_iter().any(|job| {
        !job.completed
            && matches!(job.kind, JobKind::Construction { building: b, .. } if b == building)
    });
    if pending_upgrade {
        return Err(EngineError::InvalidTransition(format!(
            "{building} is already being upgraded"
        )));
    }

    let target_level = city.level(building) + 1;
    if target_level > data.max_level(building) {
        return Err(EngineError::InvalidTransition(format!(
            "{building} is already at its maximum level"
        )));
    }
    let config = data.building_level(building, target_level)?;

    accrual::sync(&mut city, data, now, &research)?;
    debit(&mut city, &config.cost)?;

    let previous_population = match target_level {
        1 => 0,
        level => data.building_level(building, level - 1)?.population,
    };
    let delta = config.population.saturating_sub(previous_population) as f64;
    if delta > 0.0 {
        check_population(&city, data, store, delta, &research, now)?;
    }

    let factor = speed_factor(&city, data, ModifierTag::ConstructionSpeed, &research, now);
    let duration = config.build_secs / factor;

    store.put_city(city);
    let job = store.add_job(Job {
        id: JobId(0),
        player,
        city: Some(city_id),
        execution_time: now.plus_secs(duration),
        completed: false,
        kind: JobKind::Construction {
            building,
            target_level,
        },
    });
    log::info!("{city_id}: queued {building} level {target_level} ({duration:.0}s)");
    Ok(CommandOutcome::JobQueued(job))
}

fn queue_recruitment(
    store: &mut dyn GameStore,
    data: &StaticData,
    player: PlayerId,
    city_id: CityId,
    unit: UnitType,
    quantity: u32,
    now: Timestamp,
) -> Result<CommandOutcome> {
    if quantity == 0 {
        return Err(EngineError::InvalidTransition(
            "cannot recruit zero units".into(),
        ));
    }
    let mut city = owned_city(store, player, city_id)?;
    if city.level(BuildingType::Barracks) == 0 {
        return Err(EngineError::InvalidTransition(
            "recruitment requires a barracks".into(),
        ));
    }
    let player_row = store.player(player)?;
    let research = research_modifiers(&player_row, data);
    let stats = data.unit(unit)?;

    accrual::sync(&mut city, data, now, &research)?;
    debit(&mut city, &stats.cost.scaled(quantity as f64))?;
    check_population(
        &city,
        data,
        store,
        stats.population as f64 * quantity as f64,
        &research,
        now,
    )?;

    let factor = speed_factor(&city, data, ModifierTag::RecruitmentSpeed, &research, now);
    let secs_per_unit = stats.train_secs / factor;

    store.put_city(city);
    let job = store.add_job(Job {
        id: JobId(0),
        player,
        city: Some(city_id),
        execution_time: now.plus_secs(secs_per_unit),
        completed: false,
        kind: JobKind::Recruitment {
            unit,
            total_quantity: quantity,
            completed_quantity: 0,
            secs_per_unit,
            last_tick_time: now,
        },
    });
    log::info!("{city_id}: queued {quantity} {unit} ({secs_per_unit:.0}s each)");
    Ok(CommandOutcome::JobQueued(job))
}

fn queue_research(
    store: &mut dyn GameStore,
    data: &StaticData,
    player: PlayerId,
    city_id: CityId,
    node: ResearchId,
    now: Timestamp,
) -> Result<CommandOutcome> {
    let city = owned_city(store, player, city_id)?;
    if city.level(BuildingType::Academy) == 0 {
        return Err(EngineError::InvalidTransition(
            "research requires an academy".into(),
        ));
    }

    let mut player_row = store.player(player)?;
    if player_row.has_research(node) {
        return Err(EngineError::InvalidTransition(format!(
            "{node} is already researched"
        )));
    }
    let already_queued = store.jobs_for_player(player).into_iter().any(|job| {
        !job.completed && matches!(job.kind, JobKind::Research { node: n } if n == node)
    });
    if already_queued {
        return Err(EngineError::InvalidTransition(format!(
            "{node} is already being researched"
        )));
    }

    let config = data.research(node)?;
    if player_row.research_points < config.cost {
        return Err(EngineError::InsufficientResearchPoints {
            needed: config.cost,
            available: player_row.research_points,
        });
    }
    player_row.research_points -= config.cost;

    let research = research_modifiers(&player_row, data);
    let factor = speed_factor(&city, data, ModifierTag::ResearchSpeed, &research, now);
    let duration = config.duration_secs / factor;

    store.put_player(player_row);
    let job = store.add_job(Job {
        id: JobId(0),
        player,
        city: Some(city_id),
        execution_time: now.plus_secs(duration),
        completed: false,
        kind: JobKind::Research { node },
    });
    log::info!("{player}: queued {} ({duration:.0}s)", config.name);
    Ok(CommandOutcome::JobQueued(job))
}

/// Research supports explicit cancellation before its due time; everything
/// past that point is an invalid transition.
fn cancel_research(
    store: &mut dyn GameStore,
    data: &StaticData,
    player: PlayerId,
    job_id: JobId,
    now: Timestamp,
) -> Result<CommandOutcome> {
    let job = store.job(job_id)?;
    if job.player != player {
        return Err(EngineError::InvalidTransition(format!(
            "{job_id} does not belong to {player}"
        )));
    }
    let node = match job.kind {
        JobKind::Research { node } => node,
        _ => {
            return Err(EngineError::InvalidTransition(format!(
                "{job_id} is not a research job"
            )))
        }
    };
    if job.completed || job.execution_time <= now {
        return Err(EngineError::InvalidTransition(format!(
            "{job_id} is already due and can no longer be cancelled"
        )));
    }

    let config = data.research(node)?;
    let mut player_row = store.player(player)?;
    player_row.research_points += config.cost;
    store.put_player(player_row);
    store.delete_job(job_id)?;

    log::info!("{player}: cancelled {} (refunded {:.0})", config.name, config.cost);
    Ok(CommandOutcome::JobCancelled(job_id))
}

#[allow(clippy::too_many_arguments)]
fn send_deployment(
    store: &mut dyn GameStore,
    data: &StaticData,
    player: PlayerId,
    origin: CityId,
    target: CityId,
    unit: UnitType,
    quantity: u32,
    kind: DeploymentKind,
    now: Timestamp,
) -> Result<CommandOutcome> {
    if quantity == 0 {
        return Err(EngineError::InvalidTransition(
            "cannot deploy zero units".into(),
        ));
    }
    if origin == target {
        return Err(EngineError::InvalidTransition(
            "deployment target equals its origin".into(),
        ));
    }
    let mut origin_city = owned_city(store, player, origin)?;
    let target_city = store.city(target)?;
    let stats = data.unit(unit)?;

    origin_city.remove_units(unit, quantity)?;

    let distance = origin_city.position.distance(&target_city.position).max(1.0);
    let travel_secs = distance / stats.speed * 3600.0;

    store.put_city(origin_city);
    let deployment = store.add_deployment(UnitDeployment {
        id: DeploymentId(0),
        origin,
        target: Some(target),
        unit,
        quantity,
        kind,
        status: MovementStatus::Arriving,
        arrival_time: now.plus_secs(travel_secs),
        loot: Resources::ZERO,
    });
    log::info!(
        "{origin}: {quantity} {unit} marching on {target} ({travel_secs:.0}s, {kind:?})"
    );
    Ok(CommandOutcome::DeploymentLaunched(deployment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Player, Position};
    use crate::store::MemoryStore;
    use crate::testing::CityBuilder;

    struct Fixture {
        store: MemoryStore,
        data: StaticData,
        player: PlayerId,
        city: CityId,
    }

    fn fixture() -> Fixture {
        let mut store = MemoryStore::new();
        let mut player = Player::new(PlayerId(0), "Aldred");
        player.research_points = 500.0;
        let player = store.add_player(player);
        let city = store.add_city(
            CityBuilder::new("Commandia")
                .owner(player)
                .position(Position::new(0, 0))
                .building(BuildingType::Farm, 5)
                .building(BuildingType::Barracks, 1)
                .building(BuildingType::Academy, 1)
                .resources(Resources::new(5000.0, 5000.0, 5000.0))
                .building(BuildingType::Warehouse, 10)
                .last_update(Timestamp::from_secs(0))
                .build(),
        );
        Fixture {
            store,
            data: StaticData::standard(),
            player,
            city,
        }
    }

    #[test]
    fn test_queue_construction_debits_and_schedules() {
        let mut fx = fixture();
        let now = Timestamp::from_secs(10);
        let before = fx.store.city(fx.city).unwrap().resources;

        let outcome = execute_command(
            &mut fx.store,
            &fx.data,
            fx.player,
            Command::QueueConstruction {
                city: fx.city,
                building: BuildingType::Quarry,
            },
            now,
        )
        .unwrap();

        let job_id = match outcome {
            CommandOutcome::JobQueued(id) => id,
            other => panic!("unexpected outcome {other:?}"),
        };
        let job = fx.store.job(job_id).unwrap();
        let config = fx.data.building_level(BuildingType::Quarry, 1).unwrap();
        assert_eq!(job.execution_time, now.plus_secs(config.build_secs));

        let city = fx.store.city(fx.city).unwrap();
        // Debit happened after a resync to now, so the stock dropped by at
        // least the cost minus ten seconds of accrual.
        assert!(city.resources.wood <= before.wood - config.cost.wood + 1.0);
    }

    #[test]
    fn test_queue_construction_rejects_double_upgrade() {
        let mut fx = fixture();
        let now = Timestamp::from_secs(10);
        let cmd = Command::QueueConstruction {
            city: fx.city,
            building: BuildingType::Quarry,
        };

        execute_command(&mut fx.store, &fx.data, fx.player, cmd.clone(), now).unwrap();
        let err = execute_command(&mut fx.store, &fx.data, fx.player, cmd, now).unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition(_)));
    }

    #[test]
    fn test_queue_construction_rejects_poor_city() {
        let mut fx = fixture();
        let mut city = fx.store.city(fx.city).unwrap();
        city.resources = Resources::new(1.0, 1.0, 1.0);
        fx.store.put_city(city);

        let err = execute_command(
            &mut fx.store,
            &fx.data,
            fx.player,
            Command::QueueConstruction {
                city: fx.city,
                building: BuildingType::IronMine,
            },
            Timestamp::from_secs(0),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InsufficientResources { .. }));
    }

    #[test]
    fn test_population_gate_rejects_oversubscription() {
        let mut fx = fixture();
        let now = Timestamp::from_secs(0);

        // Fill the city to the brim with militia.
        let mut city = fx.store.city(fx.city).unwrap();
        let max = population::max_population(&city, &fx.data, now, &[]).unwrap();
        let used = population::current_usage(&city, &fx.data).unwrap();
        let free = (max - used) as u32;
        city.add_units(UnitType::Militia, free.saturating_sub(5));
        fx.store.put_city(city);

        // 5 free; asking for 6 militia must be rejected.
        let err = execute_command(
            &mut fx.store,
            &fx.data,
            fx.player,
            Command::QueueRecruitment {
                city: fx.city,
                unit: UnitType::Militia,
                quantity: 6,
            },
            now,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InsufficientPopulation { .. }));

        // 5 is still fine.
        execute_command(
            &mut fx.store,
            &fx.data,
            fx.player,
            Command::QueueRecruitment {
                city: fx.city,
                unit: UnitType::Militia,
                quantity: 5,
            },
            now,
        )
        .unwrap();
    }

    #[test]
    fn test_recruitment_requires_barracks() {
        let mut fx = fixture();
        let mut city = fx.store.city(fx.city).unwrap();
        city.set_level(BuildingType::Barracks, 0);
        fx.store.put_city(city);

        let err = execute_command(
            &mut fx.store,
            &fx.data,
            fx.player,
            Command::QueueRecruitment {
                city: fx.city,
                unit: UnitType::Militia,
                quantity: 1,
            },
            Timestamp::from_secs(0),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition(_)));
    }

    #[test]
    fn test_research_lifecycle_with_cancellation() {
        let mut fx = fixture();
        let now = Timestamp::from_secs(0);
        let node = ResearchId(1);

        let outcome = execute_command(
            &mut fx.store,
            &fx.data,
            fx.player,
            Command::QueueResearch {
                city: fx.city,
                node,
            },
            now,
        )
        .unwrap();
        let job_id = match outcome {
            CommandOutcome::JobQueued(id) => id,
            other => panic!("unexpected outcome {other:?}"),
        };

        let cost = fx.data.research(node).unwrap().cost;
        assert_eq!(fx.store.player(fx.player).unwrap().research_points, 500.0 - cost);

        // Duplicate queueing is rejected while the job is pending.
        let err = execute_command(
            &mut fx.store,
            &fx.data,
            fx.player,
            Command::QueueResearch {
                city: fx.city,
                node,
            },
            now,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition(_)));

        // Cancel before due: full refund, job gone.
        execute_command(
            &mut fx.store,
            &fx.data,
            fx.player,
            Command::CancelResearch { job: job_id },
            now.plus_secs(1.0),
        )
        .unwrap();
        assert_eq!(fx.store.player(fx.player).unwrap().research_points, 500.0);
        assert!(fx.store.job(job_id).unwrap_err().is_not_found());
    }

    #[test]
    fn test_cancel_after_due_time_is_invalid() {
        let mut fx = fixture();
        let now = Timestamp::from_secs(0);
        let node = ResearchId(2);

        let outcome = execute_command(
            &mut fx.store,
            &fx.data,
            fx.player,
            Command::QueueResearch {
                city: fx.city,
                node,
            },
            now,
        )
        .unwrap();
        let job_id = match outcome {
            CommandOutcome::JobQueued(id) => id,
            other => panic!("unexpected outcome {other:?}"),
        };
        let due = fx.store.job(job_id).unwrap().execution_time;

        let err = execute_command(
            &mut fx.store,
            &fx.data,
            fx.player,
            Command::CancelResearch { job: job_id },
            due.plus_secs(1.0),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition(_)));
        // The job is untouched and will still fire.
        assert!(fx.store.job(job_id).is_ok());
    }

    #[test]
    fn test_send_deployment_debits_garrison_and_schedules_arrival() {
        let mut fx = fixture();
        let now = Timestamp::from_secs(0);
        let target = fx.store.add_city(
            CityBuilder::new("Farside")
                .position(Position::new(6, 8))
                .build(),
        );

        let mut city = fx.store.city(fx.city).unwrap();
        city.add_units(UnitType::Knight, 12);
        fx.store.put_city(city);

        let outcome = execute_command(
            &mut fx.store,
            &fx.data,
            fx.player,
            Command::SendDeployment {
                origin: fx.city,
                target,
                unit: UnitType::Knight,
                quantity: 10,
                kind: DeploymentKind::Attack,
            },
            now,
        )
        .unwrap();
        let id = match outcome {
            CommandOutcome::DeploymentLaunched(id) => id,
            other => panic!("unexpected outcome {other:?}"),
        };

        assert_eq!(fx.store.city(fx.city).unwrap().unit_count(UnitType::Knight), 2);

        let deployment = fx.store.deployment(id).unwrap();
        assert_eq!(deployment.status, MovementStatus::Arriving);
        // Distance 10 at knight speed 10/h: one hour of travel.
        assert_eq!(deployment.arrival_time, now.plus_secs(3600.0));
    }

    #[test]
    fn test_send_deployment_rejects_overdraw_and_foreign_city() {
        let mut fx = fixture();
        let now = Timestamp::from_secs(0);
        let target = fx.store.add_city(CityBuilder::new("Farside").build());

        let err = execute_command(
            &mut fx.store,
            &fx.data,
            fx.player,
            Command::SendDeployment {
                origin: fx.city,
                target,
                unit: UnitType::Knight,
                quantity: 1,
                kind: DeploymentKind::Attack,
            },
            now,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InsufficientUnits { .. }));

        // Launching from a city you do not own is rejected.
        let err = execute_command(
            &mut fx.store,
            &fx.data,
            fx.player,
            Command::SendDeployment {
                origin: target,
                target: fx.city,
                unit: UnitType::Knight,
                quantity: 1,
                kind: DeploymentKind::Attack,
            },
            now,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::NotOwned { .. }));
    }
}
