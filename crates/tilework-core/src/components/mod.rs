//! Component definitions for the ECS simulation.
//!
//! Components are pure data structs attached to entities.
//! They have no behavior - that lives in states and systems.

mod agent;
mod needs;

pub use agent::*;
pub use needs::*;
