//! # Tarvos Simulation Core
//!
//! Server-side simulation backbone for a persistent browser strategy game:
//! cities accrue resources over elapsed time, queued jobs advance
//! construction, recruitment, and research, and armies travel, fight, and
//! loot — all driven by a periodic tick against a persistence boundary.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   commands    ┌────────────┐    due work    ┌───────────┐
//! │ request   │──────────────▶│  GameStore │◀──────────────▶│  Engine   │
//! │ handlers  │               │ (boundary) │                │ run_tick  │
//! └───────────┘               └────────────┘                └─────┬─────┘
//!                                                                 │
//!                      ┌────────────┬───────────────┬─────────────┤
//!                      ▼            ▼               ▼             ▼
//!                 job state     deployment      accrual /      combat
//!                  machine     orchestrator    population     resolution
//! ```
//!
//! ## Key types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`Engine`] | Tick scheduler: due jobs, due deployments, world resync |
//! | [`GameStore`] | Persistence boundary; [`MemoryStore`] for tests/tools |
//! | [`Command`] | Synchronous request path: queue, cancel, deploy |
//! | [`combine`] | Modifier stacking: `(base + Σflat) × max(0, 1 + Σ±%)` |
//! | [`Timestamp`] | Explicit simulation time; no ambient clock reads |
//!
//! Content (building curves, unit stats, research tree) lives in
//! `tarvos-data` and is read-only to everything here.

pub mod commands;
pub mod engine;
pub mod error;
pub mod modifiers;
pub mod state;
pub mod store;
pub mod systems;
pub mod testing;
pub mod time;

pub use commands::{execute_command, Command, CommandOutcome};
pub use engine::{Engine, TickSummary};
pub use error::{EngineError, Result};
pub use modifiers::{combine, Combination, ModifierProvider};
pub use state::{
    BattleReport, City, CityId, DeploymentId, DeploymentKind, FocusEffect, Job, JobId, JobKind,
    MovementStatus, Player, PlayerId, Position, ReportId, UnitDeployment, UnitStacks,
};
pub use store::{GameStore, MemoryStore};
pub use systems::{BattleOutcome, JobOutcome};
pub use time::Timestamp;
