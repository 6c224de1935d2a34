//! Jobs, the priority-tiered job queue, and the board that owns them.
//!
//! Jobs live in a single arena on the [`JobBoard`] and are referred to
//! everywhere else by [`JobId`]. A handle whose job is gone means the job
//! has stopped (completed or cancelled).

mod board;
mod job;
mod queue;

pub use board::*;
pub use job::*;
pub use queue::*;
