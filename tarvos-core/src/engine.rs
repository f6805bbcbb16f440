//! The tick scheduler: top-level driver pulling due work out of the store.
//!
//! One pass = due jobs through the job state machine, then due deployments
//! through the orchestrator. Failures are isolated per item: a broken job is
//! logged and retried on its next due evaluation, never allowed to halt the
//! loop. A separate full-world resync pass runs on a longer cadence as a
//! drift-correction safety net independent of job-triggered syncs.

use crate::modifiers::research_modifiers;
use crate::store::GameStore;
use crate::systems::{accrual, deployment, jobs};
use crate::time::Timestamp;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use tarvos_data::{Modifier, StaticData};
use tracing::instrument;

/// Counters for one scheduler pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub jobs_processed: usize,
    pub jobs_failed: usize,
    pub deployment_groups: usize,
    pub returns_processed: usize,
    pub deployment_failures: usize,
}

/// The simulation engine: a store, a content catalog, and a seeded RNG.
pub struct Engine<S: GameStore> {
    store: S,
    data: StaticData,
    rng: StdRng,
}

impl<S: GameStore> Engine<S> {
    pub fn new(store: S, data: StaticData, rng_seed: u64) -> Self {
        Self {
            store,
            data,
            rng: StdRng::seed_from_u64(rng_seed),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn data(&self) -> &StaticData {
        &self.data
    }

    /// Run one scheduler pass at `now`.
    #[instrument(skip_all, name = "tick")]
    pub fn run_tick(&mut self, now: Timestamp) -> TickSummary {
        let mut summary = TickSummary::default();

        for mut job in self.store.due_jobs(now) {
            match jobs::advance_due_job(&mut self.store, &self.data, &mut job, now) {
                Ok(jobs::JobOutcome::Completed) => {
                    if let Err(e) = self.store.delete_job(job.id) {
                        log::warn!("completed {} could not be deleted: {e}", job.id);
                    }
                    summary.jobs_processed += 1;
                }
                Ok(jobs::JobOutcome::Rescheduled(next)) => {
                    match self.store.update_job(&job) {
                        Ok(()) => log::trace!("{} re-armed for {next}", job.id),
                        Err(e) => log::warn!("{} could not be re-armed: {e}", job.id),
                    }
                    summary.jobs_processed += 1;
                }
                Err(e) if e.is_not_found() => {
                    // A delete raced this tick; the job stays put and the
                    // next cycle re-evaluates it.
                    log::debug!(
                        "skipping {} {} (city {:?}): {e}",
                        job.kind.name(),
                        job.id,
                        job.city
                    );
                    summary.jobs_failed += 1;
                }
                Err(e) => {
                    log::warn!(
                        "{} {} failed (city {:?}, player {}): {e}",
                        job.kind.name(),
                        job.id,
                        job.city,
                        job.player
                    );
                    summary.jobs_failed += 1;
                }
            }
        }

        let deployments =
            deployment::run_deployment_tick(&mut self.store, &self.data, now, &mut self.rng);
        summary.deployment_groups = deployments.groups_resolved;
        summary.returns_processed = deployments.returns_processed;
        summary.deployment_failures = deployments.failures;

        summary
    }

    /// Resync every city's stocks to `now`, regardless of pending jobs.
    ///
    /// Projection is pure per city, so the pass fans out across cities; the
    /// results are written back in one batch. Returns how many cities were
    /// synced.
    #[instrument(skip_all, name = "world_resync")]
    pub fn run_world_resync(&mut self, now: Timestamp) -> usize {
        let mut cities = Vec::new();
        for id in self.store.city_ids() {
            match self.store.city(id) {
                Ok(city) => {
                    let research: Vec<Modifier> = city
                        .owner
                        .and_then(|owner| self.store.player(owner).ok())
                        .map(|player| research_modifiers(&player, &self.data))
                        .unwrap_or_default();
                    cities.push((city, research));
                }
                Err(e) => log::debug!("resync skipping {id}: {e}"),
            }
        }

        let data = &self.data;
        let synced: Vec<_> = cities
            .into_par_iter()
            .filter_map(|(mut city, research)| {
                match accrual::sync(&mut city, data, now, &research) {
                    Ok(()) => Some(city),
                    Err(e) => {
                        log::warn!("resync failed for {}: {e}", city.id);
                        None
                    }
                }
            })
            .collect();

        let count = synced.len();
        self.store.put_cities(synced);
        log::debug!("world resync touched {count} cities");
        count
    }
}
