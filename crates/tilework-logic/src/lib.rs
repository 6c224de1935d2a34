//! Pure tile-world logic for Tilework.
//!
//! This crate contains the data model and search algorithms that the
//! simulation engine builds on. Functions take plain data and return
//! results, so everything here is unit-testable without an ECS world.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`error`] | Misuse errors for the priority queue and pathfinder |
//! | [`grid`] | Tiles, furniture, walkability and the corner-clip rule |
//! | [`inventory`] | Item stacks, locks and per-agent claims |
//! | [`pathfinding`] | A* search with goal predicates and heuristics |
//! | [`priority_queue`] | Indexed min-heap with in-place priority updates |
//! | [`tile_graph`] | Weighted adjacency derived from a grid, version-stamped |

pub mod error;
pub mod grid;
pub mod inventory;
pub mod pathfinding;
pub mod priority_queue;
pub mod tile_graph;
