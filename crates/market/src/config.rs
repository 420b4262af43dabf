//! # Simulation Configuration
//!
//! Loaded from a TOML file with four tables. Every key is optional:
//!
//! ```toml
//! [world]
//! width = 1280
//! height = 760
//! horizontal_tiles = 9
//! partitions = 3
//! trade_radius = 24.0
//!
//! [npc]
//! count = 200
//! min_speed = 10.0
//! max_speed = 30.0
//! frame_count = 4
//! animation_period = 0.15
//!
//! [rug]
//! count = 12
//! trade_cooldown_secs = 1.5
//!
//! [run]
//! seed = 333
//! frames = 600
//! fixed_dt = 0.016666
//! frame_budget_ms = 16.666
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use market_core::WorldConfig;
use market_shared::{DEFAULT_TRADE_COOLDOWN_SECS, MAX_SPEED, MIN_SPEED};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors loading or validating a [`SimulationConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML or has unknown keys.
    #[error("invalid config syntax: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// `[npc]` table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NpcConfig {
    /// NPCs to spawn.
    pub count: usize,
    /// Slowest walking speed (px/s).
    pub min_speed: f32,
    /// Fastest walking speed (px/s).
    pub max_speed: f32,
    /// Frames in the walk cycle.
    pub frame_count: u32,
    /// Seconds per walk-cycle frame.
    pub animation_period: f32,
}

impl Default for NpcConfig {
    fn default() -> Self {
        Self {
            count: 200,
            min_speed: MIN_SPEED,
            max_speed: MAX_SPEED,
            frame_count: 4,
            animation_period: 0.15,
        }
    }
}

/// `[rug]` table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RugConfig {
    /// Rugs to spawn.
    pub count: usize,
    /// Seconds a Rug stays closed after a trade.
    pub trade_cooldown_secs: f32,
}

impl Default for RugConfig {
    fn default() -> Self {
        Self {
            count: 12,
            trade_cooldown_secs: DEFAULT_TRADE_COOLDOWN_SECS,
        }
    }
}

/// `[run]` table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// RNG seed for spawn positions, goods, speeds and walk targets.
    pub seed: u64,
    /// Frames the headless binary simulates.
    pub frames: u64,
    /// Seconds simulated per frame.
    pub fixed_dt: f32,
    /// Wall-clock budget per frame before a slow-frame warning.
    pub frame_budget_ms: f64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            seed: 333,
            frames: 600,
            fixed_dt: 1.0 / 60.0,
            frame_budget_ms: 16.666,
        }
    }
}

/// Complete simulation configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// World geometry and partitioning.
    pub world: WorldConfig,
    /// NPC population and movement.
    pub npc: NpcConfig,
    /// Rug population and cooldown.
    pub rug: RugConfig,
    /// Headless run parameters.
    pub run: RunConfig,
}

impl SimulationConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on bad syntax or unknown keys, and
    /// [`ConfigError::Invalid`] on out-of-range values.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`from_toml_str`](Self::from_toml_str).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Checks value ranges the type system does not.
    ///
    /// World geometry is checked again by `World::new`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let npc = &self.npc;
        if !(npc.min_speed.is_finite() && npc.max_speed.is_finite()) {
            return Err(invalid("npc speeds must be finite"));
        }
        if npc.min_speed < 0.0 || npc.max_speed < npc.min_speed {
            return Err(invalid(format!(
                "npc speeds must satisfy 0 <= min_speed <= max_speed, got {}..{}",
                npc.min_speed, npc.max_speed
            )));
        }
        if npc.frame_count == 0 {
            return Err(invalid("npc.frame_count must be at least 1"));
        }
        if !(npc.animation_period.is_finite() && npc.animation_period > 0.0) {
            return Err(invalid("npc.animation_period must be positive"));
        }
        if !(self.rug.trade_cooldown_secs.is_finite() && self.rug.trade_cooldown_secs >= 0.0) {
            return Err(invalid("rug.trade_cooldown_secs must be non-negative"));
        }

        let total = npc.count.saturating_add(self.rug.count);
        if u32::try_from(total).is_err() {
            return Err(invalid(format!("{total} entities do not fit the id space")));
        }

        if !(self.run.fixed_dt.is_finite() && self.run.fixed_dt > 0.0) {
            return Err(invalid("run.fixed_dt must be positive"));
        }
        if !(self.run.frame_budget_ms.is_finite() && self.run.frame_budget_ms > 0.0) {
            return Err(invalid("run.frame_budget_ms must be positive"));
        }
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(message.into())
}
