//! Persistent game records: cities, players, jobs, deployments, reports.
//!
//! These are the rows the engine reads from and writes back to the
//! [`GameStore`](crate::store::GameStore) boundary. All mutation of a given
//! city happens under exclusive access for the duration of one job or one
//! deployment group.

use crate::error::{EngineError, Result};
use crate::time::Timestamp;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use tarvos_data::{BuildingType, Modifier, ResearchId, Resources, UnitType};

macro_rules! id_type {
    ($name:ident, $inner:ty, $label:literal) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            Default,
            Serialize,
            Deserialize,
        )]
        pub struct $name(pub $inner);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "#{}"), self.0)
            }
        }
    };
}

id_type!(CityId, u32, "city");
id_type!(PlayerId, u32, "player");
id_type!(JobId, u64, "job");
id_type!(DeploymentId, u64, "deployment");
id_type!(ReportId, u64, "report");

/// Unit composition keyed by type. Shared by garrisons and battle sides.
pub type UnitStacks = FxHashMap<UnitType, u32>;

/// Map coordinates of a city.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Position) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        (dx * dx + dy * dy).sqrt()
    }
}

/// A time-limited, city-scoped modifier source (e.g. a production focus the
/// player activated). Contributes nothing once expired.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusEffect {
    pub name: String,
    pub expires: Timestamp,
    pub modifiers: Vec<Modifier>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub id: CityId,
    pub name: String,
    /// Unowned cities exist (NPC / barbarian settlements).
    pub owner: Option<PlayerId>,
    pub position: Position,
    pub resources: Resources,
    /// Accrual anchor: stock growth is always computed relative to this.
    pub last_resource_update: Timestamp,
    pub buildings: FxHashMap<BuildingType, u8>,
    pub garrison: UnitStacks,
    pub focus_effects: Vec<FocusEffect>,
    pub score: u32,
}

impl City {
    pub fn new(id: CityId, name: impl Into<String>, position: Position) -> Self {
        Self {
            id,
            name: name.into(),
            owner: None,
            position,
            resources: Resources::ZERO,
            last_resource_update: Timestamp::default(),
            buildings: FxHashMap::default(),
            garrison: UnitStacks::default(),
            focus_effects: Vec::new(),
            score: 0,
        }
    }

    /// Current level of a building; 0 when not built.
    pub fn level(&self, building: BuildingType) -> u8 {
        self.buildings.get(&building).copied().unwrap_or(0)
    }

    pub fn set_level(&mut self, building: BuildingType, level: u8) {
        if level == 0 {
            self.buildings.remove(&building);
        } else {
            self.buildings.insert(building, level);
        }
    }

    pub fn unit_count(&self, unit: UnitType) -> u32 {
        self.garrison.get(&unit).copied().unwrap_or(0)
    }

    pub fn add_units(&mut self, unit: UnitType, quantity: u32) {
        if quantity > 0 {
            *self.garrison.entry(unit).or_insert(0) += quantity;
        }
    }

    pub fn remove_units(&mut self, unit: UnitType, quantity: u32) -> Result<()> {
        let available = self.unit_count(unit);
        if available < quantity {
            return Err(EngineError::InsufficientUnits {
                unit,
                needed: quantity,
                available,
            });
        }
        if available == quantity {
            self.garrison.remove(&unit);
        } else {
            self.garrison.insert(unit, available - quantity);
        }
        Ok(())
    }
}

/// A research node the player has completed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompletedResearch {
    pub node: ResearchId,
    pub completed_at: Timestamp,
}

/// World-scoped player character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub silver: f64,
    pub research_points: f64,
    pub ideology_points: f64,
    pub completed_research: Vec<CompletedResearch>,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            silver: 0.0,
            research_points: 0.0,
            ideology_points: 0.0,
            completed_research: Vec::new(),
        }
    }

    pub fn has_research(&self, node: ResearchId) -> bool {
        self.completed_research.iter().any(|r| r.node == node)
    }
}

/// Kind-specific payload of a queued job.
///
/// A closed union dispatched by exhaustive match: adding a job kind is a
/// compile-time-checked change everywhere jobs are processed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum JobKind {
    Construction {
        building: BuildingType,
        target_level: u8,
    },
    Recruitment {
        unit: UnitType,
        total_quantity: u32,
        completed_quantity: u32,
        secs_per_unit: f64,
        /// Anchor for partial-delivery accounting. Advanced in whole-unit
        /// steps so fractional training time is never lost between ticks.
        last_tick_time: Timestamp,
    },
    Research {
        node: ResearchId,
    },
}

impl JobKind {
    pub fn name(&self) -> &'static str {
        match self {
            JobKind::Construction { .. } => "construction",
            JobKind::Recruitment { .. } => "recruitment",
            JobKind::Research { .. } => "research",
        }
    }
}

/// One in-progress queued action. Created atomically with its resource
/// debit, mutated in place by the scheduler, deleted once completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub player: PlayerId,
    /// Nullable for global jobs.
    pub city: Option<CityId>,
    /// When the job next requires processing.
    pub execution_time: Timestamp,
    pub completed: bool,
    pub kind: JobKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeploymentKind {
    Attack,
    Support,
    Conquest,
}

impl DeploymentKind {
    /// Attack and Conquest missions resolve in battle; Support stations.
    pub fn is_combat(&self) -> bool {
        matches!(self, DeploymentKind::Attack | DeploymentKind::Conquest)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementStatus {
    Arriving,
    Stationed,
    Returning,
}

/// An in-flight or stationed army between two cities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitDeployment {
    pub id: DeploymentId,
    pub origin: CityId,
    /// `None` on the returning-home leg.
    pub target: Option<CityId>,
    pub unit: UnitType,
    pub quantity: u32,
    pub kind: DeploymentKind,
    pub status: MovementStatus,
    /// `Timestamp::NEVER` while stationed.
    pub arrival_time: Timestamp,
    pub loot: Resources,
}

/// Write-once log entry for one resolved engagement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleReport {
    pub id: ReportId,
    pub owner: PlayerId,
    pub title: String,
    pub body: String,
    pub created_at: Timestamp,
    pub read: bool,
}
