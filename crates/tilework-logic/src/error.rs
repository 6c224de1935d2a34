//! Error types for the `tilework-logic` crate.
//!
//! These only cover misuse. An unreachable goal is a normal search outcome
//! and is reported as `Ok(None)`, never as an error.

use crate::grid::TilePos;

/// Errors returned by [`PriorityQueue`](crate::priority_queue::PriorityQueue).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    /// `enqueue` was called for an item that is already in the queue.
    #[error("item is already queued")]
    AlreadyQueued,

    /// The item is not in the queue.
    #[error("item is not queued")]
    NotQueued,
}

/// Errors returned by [`find_path`](crate::pathfinding::find_path).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// The tile graph was built from an older version of the grid.
    #[error("tile graph is stale (graph version {graph}, grid version {grid})")]
    StaleGraph {
        /// Version the graph was built against.
        graph: u64,
        /// Current grid version.
        grid: u64,
    },

    /// The start tile lies outside the grid.
    #[error("start tile {0} is outside the grid")]
    OutOfBounds(TilePos),
}
