//! Persistence boundary.
//!
//! The engine only ever talks to [`GameStore`]; a deployment backs it with a
//! database, tests and the bundled binary use [`MemoryStore`]. Records are
//! fetched by value and written back whole — the store is the unit of
//! exclusive access for a city during one job or one deployment group.

use crate::error::{EngineError, Result};
use crate::state::{
    BattleReport, City, CityId, DeploymentId, Job, JobId, MovementStatus, Player, PlayerId,
    ReportId, UnitDeployment,
};
use crate::time::Timestamp;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

pub trait GameStore {
    fn city(&self, id: CityId) -> Result<City>;
    fn put_city(&mut self, city: City);
    fn put_cities(&mut self, cities: Vec<City>) {
        for city in cities {
            self.put_city(city);
        }
    }
    /// Every known city id, in deterministic order.
    fn city_ids(&self) -> Vec<CityId>;

    fn player(&self, id: PlayerId) -> Result<Player>;
    fn put_player(&mut self, player: Player);

    /// Persist a new job. The store assigns and returns the id.
    fn add_job(&mut self, job: Job) -> JobId;
    fn job(&self, id: JobId) -> Result<Job>;
    fn update_job(&mut self, job: &Job) -> Result<()>;
    fn delete_job(&mut self, id: JobId) -> Result<()>;
    /// Jobs with `execution_time <= now`, ordered by due time then id.
    fn due_jobs(&self, now: Timestamp) -> Vec<Job>;
    fn jobs_for_city(&self, city: CityId) -> Vec<Job>;
    fn jobs_for_player(&self, player: PlayerId) -> Vec<Job>;

    /// Persist a new deployment. The store assigns and returns the id.
    fn add_deployment(&mut self, deployment: UnitDeployment) -> DeploymentId;
    fn deployment(&self, id: DeploymentId) -> Result<UnitDeployment>;
    fn update_deployment(&mut self, deployment: &UnitDeployment) -> Result<()>;
    fn delete_deployment(&mut self, id: DeploymentId) -> Result<()>;
    /// In-flight deployments with `arrival_time <= now`, ordered by arrival
    /// then id. Stationed deployments never come due.
    fn due_deployments(&self, now: Timestamp) -> Vec<UnitDeployment>;
    /// Deployments currently stationed at a city.
    fn stationed_at(&self, city: CityId) -> Vec<UnitDeployment>;

    /// Append a battle report. The store assigns and returns the id.
    fn add_battle_report(&mut self, report: BattleReport) -> ReportId;
    fn reports_for(&self, owner: PlayerId) -> Vec<BattleReport>;
}

/// Hash-map backed store used by tests and the bundled simulator binary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryStore {
    cities: FxHashMap<CityId, City>,
    players: FxHashMap<PlayerId, Player>,
    jobs: FxHashMap<JobId, Job>,
    deployments: FxHashMap<DeploymentId, UnitDeployment>,
    reports: FxHashMap<ReportId, BattleReport>,
    next_city: u32,
    next_player: u32,
    next_job: u64,
    next_deployment: u64,
    next_report: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a city, assigning its id.
    pub fn add_city(&mut self, mut city: City) -> CityId {
        self.next_city += 1;
        let id = CityId(self.next_city);
        city.id = id;
        self.cities.insert(id, city);
        id
    }

    /// Seed a player, assigning their id.
    pub fn add_player(&mut self, mut player: Player) -> PlayerId {
        self.next_player += 1;
        let id = PlayerId(self.next_player);
        player.id = id;
        self.players.insert(id, player);
        id
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    pub fn deployment_count(&self) -> usize {
        self.deployments.len()
    }
}

impl GameStore for MemoryStore {
    fn city(&self, id: CityId) -> Result<City> {
        self.cities
            .get(&id)
            .cloned()
            .ok_or(EngineError::CityNotFound(id))
    }

    fn put_city(&mut self, city: City) {
        self.cities.insert(city.id, city);
    }

    fn city_ids(&self) -> Vec<CityId> {
        let mut ids: Vec<_> = self.cities.keys().copied().collect();
        ids.sort();
        ids
    }

    fn player(&self, id: PlayerId) -> Result<Player> {
        self.players
            .get(&id)
            .cloned()
            .ok_or(EngineError::PlayerNotFound(id))
    }

    fn put_player(&mut self, player: Player) {
        self.players.insert(player.id, player);
    }

    fn add_job(&mut self, mut job: Job) -> JobId {
        self.next_job += 1;
        let id = JobId(self.next_job);
        job.id = id;
        self.jobs.insert(id, job);
        id
    }

    fn job(&self, id: JobId) -> Result<Job> {
        self.jobs
            .get(&id)
            .cloned()
            .ok_or(EngineError::JobNotFound(id))
    }

    fn update_job(&mut self, job: &Job) -> Result<()> {
        if !self.jobs.contains_key(&job.id) {
            return Err(EngineError::JobNotFound(job.id));
        }
        self.jobs.insert(job.id, job.clone());
        Ok(())
    }

    fn delete_job(&mut self, id: JobId) -> Result<()> {
        self.jobs
            .remove(&id)
            .map(|_| ())
            .ok_or(EngineError::JobNotFound(id))
    }

    fn due_jobs(&self, now: Timestamp) -> Vec<Job> {
        let mut due: Vec<_> = self
            .jobs
            .values()
            .filter(|job| !job.completed && job.execution_time <= now)
            .cloned()
            .collect();
        due.sort_by_key(|job| (job.execution_time, job.id));
        due
    }

    fn jobs_for_city(&self, city: CityId) -> Vec<Job> {
        let mut jobs: Vec<_> = self
            .jobs
            .values()
            .filter(|job| job.city == Some(city))
            .cloned()
            .collect();
        jobs.sort_by_key(|job| job.id);
        jobs
    }

    fn jobs_for_player(&self, player: PlayerId) -> Vec<Job> {
        let mut jobs: Vec<_> = self
            .jobs
            .values()
            .filter(|job| job.player == player)
            .cloned()
            .collect();
        jobs.sort_by_key(|job| job.id);
        jobs
    }

    fn add_deployment(&mut self, mut deployment: UnitDeployment) -> DeploymentId {
        self.next_deployment += 1;
        let id = DeploymentId(self.next_deployment);
        deployment.id = id;
        self.deployments.insert(id, deployment);
        id
    }

    fn deployment(&self, id: DeploymentId) -> Result<UnitDeployment> {
        self.deployments
            .get(&id)
            .cloned()
            .ok_or(EngineError::DeploymentNotFound(id))
    }

    fn update_deployment(&mut self, deployment: &UnitDeployment) -> Result<()> {
        if !self.deployments.contains_key(&deployment.id) {
            return Err(EngineError::DeploymentNotFound(deployment.id));
        }
        self.deployments.insert(deployment.id, deployment.clone());
        Ok(())
    }

    fn delete_deployment(&mut self, id: DeploymentId) -> Result<()> {
        self.deployments
            .remove(&id)
            .map(|_| ())
            .ok_or(EngineError::DeploymentNotFound(id))
    }

    fn due_deployments(&self, now: Timestamp) -> Vec<UnitDeployment> {
        let mut due: Vec<_> = self
            .deployments
            .values()
            .filter(|d| d.status != MovementStatus::Stationed && d.arrival_time <= now)
            .cloned()
            .collect();
        due.sort_by_key(|d| (d.arrival_time, d.id));
        due
    }

    fn stationed_at(&self, city: CityId) -> Vec<UnitDeployment> {
        let mut stationed: Vec<_> = self
            .deployments
            .values()
            .filter(|d| d.status == MovementStatus::Stationed && d.target == Some(city))
            .cloned()
            .collect();
        stationed.sort_by_key(|d| d.id);
        stationed
    }

    fn add_battle_report(&mut self, mut report: BattleReport) -> ReportId {
        self.next_report += 1;
        let id = ReportId(self.next_report);
        report.id = id;
        self.reports.insert(id, report);
        id
    }

    fn reports_for(&self, owner: PlayerId) -> Vec<BattleReport> {
        let mut reports: Vec<_> = self
            .reports
            .values()
            .filter(|r| r.owner == owner)
            .cloned()
            .collect();
        reports.sort_by_key(|r| r.id);
        reports
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::JobKind;
    use tarvos_data::BuildingType;

    fn job_at(execution_time: Timestamp) -> Job {
        Job {
            id: JobId(0),
            player: PlayerId(1),
            city: Some(CityId(1)),
            execution_time,
            completed: false,
            kind: JobKind::Construction {
                building: BuildingType::Farm,
                target_level: 1,
            },
        }
    }

    #[test]
    fn test_due_jobs_ordering_and_cutoff() {
        let mut store = MemoryStore::new();
        let late = store.add_job(job_at(Timestamp::from_secs(50)));
        let early = store.add_job(job_at(Timestamp::from_secs(10)));
        store.add_job(job_at(Timestamp::from_secs(999)));

        let due = store.due_jobs(Timestamp::from_secs(60));
        assert_eq!(due.len(), 2);
        assert_eq!(due[0].id, early);
        assert_eq!(due[1].id, late);
    }

    #[test]
    fn test_stationed_deployments_never_come_due() {
        let mut store = MemoryStore::new();
        store.add_deployment(UnitDeployment {
            id: DeploymentId(0),
            origin: CityId(1),
            target: Some(CityId(2)),
            unit: tarvos_data::UnitType::Militia,
            quantity: 10,
            kind: crate::state::DeploymentKind::Support,
            status: MovementStatus::Stationed,
            arrival_time: Timestamp::NEVER,
            loot: tarvos_data::Resources::ZERO,
        });

        let far_future = Timestamp::from_millis(i64::MAX - 1);
        assert!(store.due_deployments(far_future).is_empty());
        assert_eq!(store.stationed_at(CityId(2)).len(), 1);
    }

    #[test]
    fn test_missing_rows_map_to_not_found() {
        let store = MemoryStore::new();
        assert!(store.city(CityId(9)).unwrap_err().is_not_found());
        assert!(store.job(JobId(9)).unwrap_err().is_not_found());
        assert!(store.deployment(DeploymentId(9)).unwrap_err().is_not_found());
    }
}
