//! Weighted adjacency derived from a [`Grid`].
//!
//! Each in-bounds tile has a list of outgoing edges to its walkable
//! neighbours. An edge's weight is the neighbour's movement cost, so a
//! diagonal step costs the same as an orthogonal one. Diagonal edges that
//! would clip a corner are omitted.
//!
//! The graph remembers the grid version it was built against. Callers that
//! mutate walkability must [`patch`](TileGraph::patch) it afterwards.

use crate::grid::{Grid, TilePos};

/// A directed edge to a neighbouring tile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub to: TilePos,
    pub cost: f32,
}

/// Per-tile outgoing edges for a grid snapshot.
#[derive(Debug, Clone)]
pub struct TileGraph {
    width: i32,
    height: i32,
    edges: Vec<Vec<Edge>>,
    version: u64,
}

impl TileGraph {
    /// Build edges for every tile of `grid`.
    pub fn build(grid: &Grid) -> Self {
        let mut edges = Vec::with_capacity((grid.width() * grid.height()) as usize);
        for y in 0..grid.height() {
            for x in 0..grid.width() {
                edges.push(Self::edges_for(grid, TilePos::new(x, y)));
            }
        }
        Self {
            width: grid.width(),
            height: grid.height(),
            edges,
            version: grid.version(),
        }
    }

    /// Recompute edges around a single changed tile.
    ///
    /// Covers the tile and its 8 neighbours, which is every tile whose
    /// outgoing edges can depend on it. Assumes `pos` is the only tile that
    /// changed since the graph was last in sync.
    pub fn patch(&mut self, grid: &Grid, pos: TilePos) {
        if grid.width() != self.width || grid.height() != self.height {
            *self = Self::build(grid);
            return;
        }
        let mut touched = grid.neighbors(pos, true);
        touched.push(pos);
        for p in touched {
            if let Some(i) = grid.index_of(p) {
                self.edges[i] = Self::edges_for(grid, p);
            }
        }
        self.version = grid.version();
    }

    fn edges_for(grid: &Grid, pos: TilePos) -> Vec<Edge> {
        grid.neighbors(pos, true)
            .into_iter()
            .filter(|&n| grid.is_walkable(n) && !grid.is_clipping_corner(pos, n))
            .map(|n| Edge {
                to: n,
                cost: grid.movement_cost(n),
            })
            .collect()
    }

    /// Grid version this graph reflects.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_current(&self, grid: &Grid) -> bool {
        self.version == grid.version()
    }

    pub fn edges(&self, pos: TilePos) -> &[Edge] {
        if pos.x < 0 || pos.y < 0 || pos.x >= self.width || pos.y >= self.height {
            return &[];
        }
        &self.edges[(pos.y * self.width + pos.x) as usize]
    }

    /// Cheapest edge weight in the graph, or 0 if there are no edges.
    ///
    /// Scales the distance heuristic so it never overestimates.
    pub fn min_edge_cost(&self) -> f32 {
        self.edges
            .iter()
            .flatten()
            .map(|e| e.cost)
            .min_by(|a, b| a.total_cmp(b))
            .unwrap_or(0.0)
    }

    pub fn edge_count(&self) -> usize {
        self.edges.iter().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Furniture;

    #[test]
    fn test_open_grid_edge_counts() {
        let grid = Grid::new(3, 3);
        let graph = TileGraph::build(&grid);
        assert_eq!(graph.edges(TilePos::new(1, 1)).len(), 8);
        assert_eq!(graph.edges(TilePos::new(0, 0)).len(), 3);
        assert!((graph.min_edge_cost() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_edge_cost_is_neighbor_cost() {
        let mut grid = Grid::new(2, 2);
        grid.set_base_cost(TilePos::new(1, 1), 3.0);
        let graph = TileGraph::build(&grid);
        let diag = graph
            .edges(TilePos::new(0, 0))
            .iter()
            .find(|e| e.to == TilePos::new(1, 1))
            .copied();
        assert_eq!(diag.map(|e| e.cost), Some(3.0));
    }

    #[test]
    fn test_patch_matches_rebuild() {
        let mut grid = Grid::new(5, 5);
        let mut graph = TileGraph::build(&grid);
        let wall = TilePos::new(2, 2);
        grid.place_furniture(wall, Furniture::wall("Wall"));
        assert!(!graph.is_current(&grid));

        graph.patch(&grid, wall);
        assert!(graph.is_current(&grid));

        let rebuilt = TileGraph::build(&grid);
        for y in 0..5 {
            for x in 0..5 {
                let p = TilePos::new(x, y);
                assert_eq!(graph.edges(p), rebuilt.edges(p), "edges differ at {p}");
            }
        }
        // Diagonal past the wall is gone
        assert!(!graph
            .edges(TilePos::new(1, 2))
            .iter()
            .any(|e| e.to == TilePos::new(2, 3)));
    }
}
