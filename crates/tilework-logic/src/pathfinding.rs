//! A* search over a [`TileGraph`] with goal predicates.
//!
//! A search starts at a tile and stops the first time a popped tile
//! satisfies its [`Goal`]. Goals with a concrete target use a Chebyshev
//! heuristic scaled by the graph's cheapest edge, less one step when any
//! neighbour of the target will do. That keeps it admissible and consistent
//! under the uniform-cost edge model. Predicate goals with no
//! single target fall back to a zero heuristic (plain Dijkstra), so the
//! first match popped is the nearest one.
//!
//! An unreachable goal is `Ok(None)`. Errors are reserved for misuse.

use crate::error::PathError;
use crate::grid::{Grid, TilePos};
use crate::priority_queue::PriorityQueue;
use crate::tile_graph::TileGraph;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Condition a tile must meet to end a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Goal {
    /// Exactly this tile.
    Tile(TilePos),
    /// This tile or any of its 8 neighbours.
    Adjacent(TilePos),
    /// Any tile holding furniture of this kind.
    FurnitureKind(String),
    /// Any tile holding or next to furniture of this kind. Reaches
    /// furniture that cannot be stood on.
    AdjacentToFurniture(String),
    /// Any tile with a stack of one of `kinds` that can be picked up.
    Inventory {
        kinds: Vec<String>,
        allow_stockpile: bool,
    },
    /// Any bare floor tile that can take `amount` units of `kind`.
    DumpSpot { kind: String, amount: u32 },
}

impl Goal {
    pub fn is_met(&self, grid: &Grid, pos: TilePos) -> bool {
        let Some(tile) = grid.tile_at(pos) else {
            return false;
        };
        match self {
            Goal::Tile(target) => pos == *target,
            Goal::Adjacent(target) => pos == *target || pos.is_adjacent(*target),
            Goal::FurnitureKind(kind) => tile.has_furniture_kind(kind),
            Goal::AdjacentToFurniture(kind) => {
                tile.has_furniture_kind(kind)
                    || grid
                        .neighbors(pos, true)
                        .into_iter()
                        .any(|n| grid.tile_at(n).is_some_and(|t| t.has_furniture_kind(kind)))
            }
            Goal::Inventory {
                kinds,
                allow_stockpile,
            } => {
                tile.can_pick_up(*allow_stockpile)
                    && tile
                        .inventory
                        .as_ref()
                        .is_some_and(|inv| kinds.iter().any(|k| *k == inv.kind))
            }
            Goal::DumpSpot { kind, amount } => {
                tile.furniture.is_none() && tile.can_accept(kind, *amount)
            }
        }
    }

    /// The single tile this goal is aimed at, if there is one.
    pub fn target(&self) -> Option<TilePos> {
        match self {
            Goal::Tile(t) | Goal::Adjacent(t) => Some(*t),
            _ => None,
        }
    }
}

/// Distance estimate used to order the open set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Heuristic {
    /// Chebyshev distance to a target, times the cheapest edge weight.
    Chebyshev(TilePos),
    /// As `Chebyshev`, one step short: the target's neighbours also count.
    ChebyshevAdjacent(TilePos),
    /// No estimate. Turns A* into Dijkstra.
    Zero,
}

impl Heuristic {
    /// Chebyshev toward the goal's target, or zero for predicate goals.
    pub fn for_goal(goal: &Goal) -> Self {
        match goal {
            Goal::Tile(t) => Heuristic::Chebyshev(*t),
            Goal::Adjacent(t) => Heuristic::ChebyshevAdjacent(*t),
            _ => Heuristic::Zero,
        }
    }

    fn estimate(&self, pos: TilePos, min_cost: f32) -> f32 {
        match self {
            Heuristic::Chebyshev(target) => pos.chebyshev(*target) as f32 * min_cost,
            Heuristic::ChebyshevAdjacent(target) => {
                (pos.chebyshev(*target) - 1).max(0) as f32 * min_cost
            }
            Heuristic::Zero => 0.0,
        }
    }
}

/// An ordered list of tiles from the start (inclusive) to the goal tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub tiles: Vec<TilePos>,
    pub cost: f32,
}

impl Route {
    pub fn start(&self) -> Option<TilePos> {
        self.tiles.first().copied()
    }

    pub fn destination(&self) -> Option<TilePos> {
        self.tiles.last().copied()
    }

    /// Number of steps, not counting the start tile.
    pub fn steps(&self) -> usize {
        self.tiles.len().saturating_sub(1)
    }
}

/// Run A* from `start` until a tile satisfying `goal` is popped.
pub fn find_path(
    grid: &Grid,
    graph: &TileGraph,
    start: TilePos,
    goal: &Goal,
    heuristic: Heuristic,
) -> Result<Option<Route>, PathError> {
    if !graph.is_current(grid) {
        return Err(PathError::StaleGraph {
            graph: graph.version(),
            grid: grid.version(),
        });
    }
    if !grid.contains(start) {
        return Err(PathError::OutOfBounds(start));
    }

    let min_cost = graph.min_edge_cost();
    let mut open: PriorityQueue<TilePos> = PriorityQueue::new();
    let mut g_score: HashMap<TilePos, f32> = HashMap::new();
    let mut came_from: HashMap<TilePos, TilePos> = HashMap::new();
    let mut closed: HashSet<TilePos> = HashSet::new();

    g_score.insert(start, 0.0);
    open.enqueue_or_update(start, heuristic.estimate(start, min_cost));

    while let Some(current) = open.dequeue() {
        let current_g = g_score.get(&current).copied().unwrap_or(f32::INFINITY);
        if goal.is_met(grid, current) {
            return Ok(Some(reconstruct(&came_from, current, current_g)));
        }
        closed.insert(current);

        for edge in graph.edges(current) {
            if closed.contains(&edge.to) {
                continue;
            }
            let tentative = current_g + edge.cost;
            let known = g_score.get(&edge.to).copied().unwrap_or(f32::INFINITY);
            if tentative < known {
                came_from.insert(edge.to, current);
                g_score.insert(edge.to, tentative);
                open.enqueue_or_update(edge.to, tentative + heuristic.estimate(edge.to, min_cost));
            }
        }
    }

    log::trace!("no path from {start} to {goal:?}");
    Ok(None)
}

/// [`find_path`] with the default heuristic for `goal`.
pub fn find_path_to(
    grid: &Grid,
    graph: &TileGraph,
    start: TilePos,
    goal: &Goal,
) -> Result<Option<Route>, PathError> {
    find_path(grid, graph, start, goal, Heuristic::for_goal(goal))
}

fn reconstruct(came_from: &HashMap<TilePos, TilePos>, end: TilePos, cost: f32) -> Route {
    let mut tiles = vec![end];
    let mut cursor = end;
    while let Some(&prev) = came_from.get(&cursor) {
        tiles.push(prev);
        cursor = prev;
    }
    tiles.reverse();
    Route { tiles, cost }
}
