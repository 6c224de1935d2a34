//! Simulation configuration, loadable from JSON.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Errors raised while loading or validating a [`SimConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The JSON did not match the expected shape.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Tunables for a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Seed for the engine's RNG.
    pub seed: u64,
    /// Shortest idle pause, in seconds.
    pub idle_time_min: f32,
    /// Longest idle pause, in seconds.
    pub idle_time_max: f32,
    /// Agent walking speed in tiles per second on cost-1 floor.
    pub agent_speed: f32,
    /// Stack limit for inventory the engine creates.
    pub max_stack_size: u32,
    /// Seconds between re-checks of jobs parked as unreachable.
    pub reachability_recheck_secs: f32,
    /// How far (in tiles) released materials may spill from a job site.
    pub spill_radius: i32,
    /// Need level (0..1) at which an agent queues a need job.
    pub need_threshold: f32,
    /// Hours of sim time per real second, for need decay.
    pub need_hours_per_second: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            idle_time_min: 0.2,
            idle_time_max: 2.0,
            agent_speed: 5.0,
            max_stack_size: 50,
            reachability_recheck_secs: 60.0,
            spill_radius: 5,
            need_threshold: 0.8,
            need_hours_per_second: 1.0 / 60.0,
        }
    }
}

impl SimConfig {
    /// Parse and validate a JSON config. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.idle_time_min >= 0.0 && self.idle_time_min <= self.idle_time_max) {
            return Err(ConfigError::Invalid(format!(
                "idle range {}..{} is empty or negative",
                self.idle_time_min, self.idle_time_max
            )));
        }
        if !(self.agent_speed > 0.0) {
            return Err(ConfigError::Invalid("agent_speed must be positive".into()));
        }
        if self.max_stack_size == 0 {
            return Err(ConfigError::Invalid("max_stack_size must be nonzero".into()));
        }
        if !(self.reachability_recheck_secs > 0.0) {
            return Err(ConfigError::Invalid(
                "reachability_recheck_secs must be positive".into(),
            ));
        }
        if self.spill_radius < 0 {
            return Err(ConfigError::Invalid("spill_radius must not be negative".into()));
        }
        Ok(())
    }
}
