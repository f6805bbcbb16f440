//! The job state machine: Pending → Due → Applied (deleted), with
//! recruitment jobs re-arming themselves while units remain.
//!
//! Before any kind-specific effect, the owning city's stocks are resynced to
//! the job's `execution_time`, so the resource state a job observes is never
//! stale relative to when it fired — however late the scheduler got to it.

use crate::error::{EngineError, Result};
use crate::modifiers::research_modifiers;
use crate::state::{City, CompletedResearch, Job, JobKind};
use crate::store::GameStore;
use crate::systems::accrual;
use crate::time::Timestamp;
use tarvos_data::StaticData;

/// Guards the floor division at exact unit boundaries: without it a unit due
/// precisely now could be lost to floating-point truncation.
pub const RECRUIT_EPSILON_SECS: f64 = 1e-3;

/// What the scheduler should do with a job after it was advanced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// Effects committed; delete the row.
    Completed,
    /// Partial progress committed; keep the row with its new due time.
    Rescheduled(Timestamp),
}

/// Advance one due job. `now` is the scheduler's current tick time; the
/// job's own `execution_time` anchors the resource resync.
pub fn advance_due_job(
    store: &mut dyn GameStore,
    data: &StaticData,
    job: &mut Job,
    now: Timestamp,
) -> Result<JobOutcome> {
    let outcome = match &mut job.kind {
        JobKind::Construction {
            building,
            target_level,
        } => {
            let city_id = job.city.ok_or_else(|| {
                EngineError::InvalidTransition("construction job without a city".into())
            })?;
            let mut city = synced_city(store, data, job.player, city_id, job.execution_time)?;

            let config = data.building_level(*building, *target_level)?;
            city.set_level(*building, *target_level);
            city.score += config.points;
            log::info!(
                "{city_id}: {building} reached level {target_level} (+{} score)",
                config.points
            );
            store.put_city(city);

            job.completed = true;
            JobOutcome::Completed
        }

        JobKind::Recruitment {
            unit,
            total_quantity,
            completed_quantity,
            secs_per_unit,
            last_tick_time,
        } => {
            let city_id = job.city.ok_or_else(|| {
                EngineError::InvalidTransition("recruitment job without a city".into())
            })?;
            let mut city = synced_city(store, data, job.player, city_id, job.execution_time)?;

            let elapsed = now.secs_since(*last_tick_time) + RECRUIT_EPSILON_SECS;
            let remaining = total_quantity.saturating_sub(*completed_quantity);
            let deliverable = (elapsed / *secs_per_unit).floor() as u32;
            let delivered = deliverable.min(remaining);

            if delivered > 0 {
                city.add_units(*unit, delivered);
                *completed_quantity += delivered;
                // Anchor to the exact unit boundary, not wall-clock now, so
                // fractional training time carries into the next delivery.
                *last_tick_time = last_tick_time.plus_secs(delivered as f64 * *secs_per_unit);
                log::debug!("{city_id}: delivered {delivered} {unit}");
            }
            store.put_city(city);

            if *completed_quantity >= *total_quantity {
                job.completed = true;
                JobOutcome::Completed
            } else {
                job.execution_time = last_tick_time.plus_secs(*secs_per_unit);
                JobOutcome::Rescheduled(job.execution_time)
            }
        }

        JobKind::Research { node } => {
            if let Some(city_id) = job.city {
                let city = synced_city(store, data, job.player, city_id, job.execution_time)?;
                store.put_city(city);
            }

            let mut player = store.player(job.player)?;
            if !player.has_research(*node) {
                player.completed_research.push(CompletedResearch {
                    node: *node,
                    completed_at: job.execution_time,
                });
                log::info!("{}: completed {}", player.id, node);
            }
            store.put_player(player);

            job.completed = true;
            JobOutcome::Completed
        }
    };

    Ok(outcome)
}

/// Fetch a city and resync its stocks to `as_of`, including the owning
/// player's research modifiers when available.
fn synced_city(
    store: &mut dyn GameStore,
    data: &StaticData,
    player: crate::state::PlayerId,
    city_id: crate::state::CityId,
    as_of: Timestamp,
) -> Result<City> {
    let mut city = store.city(city_id)?;
    let research = match store.player(player) {
        Ok(player) => research_modifiers(&player, data),
        Err(_) => Vec::new(),
    };
    accrual::sync(&mut city, data, as_of, &research)?;
    Ok(city)
}
