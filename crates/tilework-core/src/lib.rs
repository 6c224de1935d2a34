//! Tilework Core - Job Dispatch and Agent Simulation Engine
//!
//! Agents on a tile grid pick jobs off a priority-tiered queue, haul the
//! materials those jobs need, walk to the job site and do the work. Each
//! agent is driven by a chain of states (Idle, Job, Haul, Dump, Move) that
//! is stepped once per tick.
//!
//! # Architecture
//!
//! The simulation uses an Entity Component System (ECS) architecture via `hecs`:
//! - **Entities**: Agents
//! - **Components**: [`Agent`](components::Agent), [`Brain`](states::Brain), [`Needs`](components::Needs)
//! - **Systems**: needs decay and need jobs, state assignment for idle agents
//!
//! Shared simulation data that is not per-agent (the tile world, the job
//! board, the RNG) lives on the [`SimulationEngine`](engine::SimulationEngine).
//!
//! # Example
//!
//! ```rust,no_run
//! use tilework_core::prelude::*;
//!
//! let mut engine = SimulationEngine::new(SimConfig::default(), TileWorld::new(10, 10));
//! engine.tiles_mut().place_inventory(TilePos::new(2, 2), Inventory::new("Steel", 5, 50));
//! engine.spawn_agent("Ada", TilePos::new(0, 0));
//!
//! let mut job = Job::new(JobPriority::High).at(TilePos::new(5, 5));
//! job.request("Steel", 5, 5);
//! engine.post_job(job);
//!
//! loop {
//!     engine.update(1.0 / 60.0); // 60 FPS
//! }
//! ```

pub mod components;
pub mod config;
pub mod engine;
pub mod error;
pub mod jobs;
pub mod states;
pub mod systems;
pub mod world;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::components::*;
    pub use crate::config::SimConfig;
    pub use crate::engine::SimulationEngine;
    pub use crate::error::EngineError;
    pub use crate::jobs::{Job, JobId, JobOutcome, JobPriority};
    pub use crate::states::{Brain, StateKind};
    pub use crate::world::TileWorld;
    pub use tilework_logic::grid::{Furniture, TilePos};
    pub use tilework_logic::inventory::Inventory;
}
