//! Error types for the `tilework-core` crate.
//!
//! Only caller misuse surfaces here. Unreachable sites, missing materials and
//! stale routes are handled inside the agent states and never become errors.

use crate::config::ConfigError;
use crate::jobs::JobId;
use hecs::Entity;

/// Errors returned by [`SimulationEngine`](crate::engine::SimulationEngine).
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The entity is not a live agent.
    #[error("no such agent: {0:?}")]
    NoSuchAgent(Entity),

    /// The job handle does not refer to a live job.
    #[error("no such job: {0}")]
    NoSuchJob(JobId),

    /// Another agent is already working the job.
    #[error("{0} is already being worked")]
    JobTaken(JobId),

    /// The engine was configured with invalid settings.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
