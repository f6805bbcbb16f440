use crate::state::{CityId, DeploymentId, JobId, PlayerId};
use tarvos_data::{DataError, Resources, UnitType};
use thiserror::Error;

/// Failures surfaced by the simulation engine.
///
/// The `*NotFound` class usually means a delete raced with the current tick;
/// the tick loop treats it as a skip, not a fault. The `Insufficient*` class
/// is caller-side admission control raised at submission time, never
/// mid-tick. `InvalidTransition` is surfaced to the caller and not retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("{0} not found")]
    CityNotFound(CityId),
    #[error("{0} not found")]
    PlayerNotFound(PlayerId),
    #[error("{0} not found")]
    JobNotFound(JobId),
    #[error("{0} not found")]
    DeploymentNotFound(DeploymentId),

    #[error("{city} is not owned by {player}")]
    NotOwned { city: CityId, player: PlayerId },

    #[error("insufficient resources: need {needed}, have {available}")]
    InsufficientResources {
        needed: Resources,
        available: Resources,
    },
    #[error("insufficient population: need {needed:.0}, have {available:.0} free")]
    InsufficientPopulation { needed: f64, available: f64 },
    #[error("insufficient {unit}: need {needed}, have {available}")]
    InsufficientUnits {
        unit: UnitType,
        needed: u32,
        available: u32,
    },
    #[error("insufficient research points: need {needed:.0}, have {available:.0}")]
    InsufficientResearchPoints { needed: f64, available: f64 },

    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    #[error(transparent)]
    Data(#[from] DataError),
}

impl EngineError {
    /// True for the races-with-a-delete class that the tick loop skips.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            EngineError::CityNotFound(_)
                | EngineError::PlayerNotFound(_)
                | EngineError::JobNotFound(_)
                | EngineError::DeploymentNotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
