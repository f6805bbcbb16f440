//! Per-tick simulation systems.

pub mod accrual;
pub mod combat;
pub mod deployment;
pub mod jobs;
pub mod population;

pub use accrual::{project, sync, warehouse_capacity};
pub use combat::{resolve, BattleOutcome, DAMAGE_SCALING};
pub use deployment::{run_deployment_tick, DeploymentSummary, RETURN_TRAVEL_SECS};
pub use jobs::{advance_due_job, JobOutcome};
pub use population::{available_population, current_usage, max_population, reserved_population};
