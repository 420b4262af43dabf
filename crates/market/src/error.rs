//! # Simulation Error Types

use thiserror::Error;

use market_core::WorldError;

use crate::config::ConfigError;

/// Errors that can occur setting up or running the simulation.
#[derive(Error, Debug)]
pub enum SimulationError {
    /// The world could not be built.
    #[error("world error: {0}")]
    World(#[from] WorldError),

    /// The configuration could not be loaded.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type for simulation operations.
pub type SimulationResult<T> = Result<T, SimulationError>;
