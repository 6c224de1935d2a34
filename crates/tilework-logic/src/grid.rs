//! Tile grid: positions, tiles, furniture and walkability.
//!
//! A `Grid` is created once with a fixed size and mutated in place. Every
//! mutation that changes a tile's movement cost bumps [`Grid::version`], which
//! is how derived data such as the [`TileGraph`](crate::tile_graph::TileGraph)
//! detects that it is out of date.

use crate::inventory::Inventory;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Integer grid coordinates.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct TilePos {
    pub x: i32,
    pub y: i32,
}

impl TilePos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Grid distance where a diagonal step counts as one.
    pub fn chebyshev(self, other: TilePos) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }

    /// True for the 8 tiles surrounding `other` (not `other` itself).
    pub fn is_adjacent(self, other: TilePos) -> bool {
        self.chebyshev(other) == 1
    }

    pub fn is_diagonal_to(self, other: TilePos) -> bool {
        (self.x - other.x).abs() == 1 && (self.y - other.y).abs() == 1
    }

    /// Euclidean length of a single step to an adjacent tile: 1 or √2.
    pub fn step_length(self, other: TilePos) -> f32 {
        let dx = (self.x - other.x) as f32;
        let dy = (self.y - other.y) as f32;
        (dx * dx + dy * dy).sqrt()
    }
}

impl fmt::Display for TilePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Orthogonal offsets first, then diagonals. Search order depends on this.
const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
    (0, 1),
    (1, 0),
    (0, -1),
    (-1, 0),
    (1, 1),
    (1, -1),
    (-1, -1),
    (-1, 1),
];

/// Something built on a tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Furniture {
    /// Type name, e.g. `"Wall"`, `"Stockpile"`, `"Stove"`.
    pub kind: String,
    /// Multiplier applied to the tile's base cost. 0 makes the tile impassable.
    pub movement_multiplier: f32,
    /// Inventory stored on a storage tile is only taken by jobs that allow it.
    pub is_storage: bool,
}

impl Furniture {
    pub fn new(kind: impl Into<String>, movement_multiplier: f32) -> Self {
        Self {
            kind: kind.into(),
            movement_multiplier,
            is_storage: false,
        }
    }

    /// An impassable piece of furniture.
    pub fn wall(kind: impl Into<String>) -> Self {
        Self::new(kind, 0.0)
    }

    /// A walkable storage area.
    pub fn stockpile(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            movement_multiplier: 1.0,
            is_storage: true,
        }
    }

    pub fn blocks(&self) -> bool {
        self.movement_multiplier <= 0.0
    }
}

/// A single cell of the grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub pos: TilePos,
    /// Base traversal cost of the floor. 0 means there is no floor.
    pub base_cost: f32,
    pub furniture: Option<Furniture>,
    pub inventory: Option<Inventory>,
}

impl Tile {
    fn floor(pos: TilePos) -> Self {
        Self {
            pos,
            base_cost: 1.0,
            furniture: None,
            inventory: None,
        }
    }

    /// Effective traversal cost. 0 = impassable.
    pub fn movement_cost(&self) -> f32 {
        match &self.furniture {
            Some(f) => self.base_cost * f.movement_multiplier.max(0.0),
            None => self.base_cost,
        }
    }

    pub fn is_walkable(&self) -> bool {
        self.movement_cost() > 0.0
    }

    pub fn is_storage(&self) -> bool {
        self.furniture.as_ref().is_some_and(|f| f.is_storage)
    }

    pub fn has_furniture_kind(&self, kind: &str) -> bool {
        self.furniture.as_ref().is_some_and(|f| f.kind == kind)
    }

    /// Whether the tile's stack can be picked up by a job.
    ///
    /// Locked or fully claimed stacks are excluded. Stacks on storage
    /// furniture only count when `allow_stockpile` is set.
    pub fn can_pick_up(&self, allow_stockpile: bool) -> bool {
        match &self.inventory {
            Some(inv) => {
                !inv.locked && inv.available() > 0 && (allow_stockpile || !self.is_storage())
            }
            None => false,
        }
    }

    /// Whether `amount` units of `kind` could be dropped here.
    pub fn can_accept(&self, kind: &str, amount: u32) -> bool {
        if !self.is_walkable() {
            return false;
        }
        match &self.inventory {
            None => true,
            Some(inv) => inv.kind == kind && !inv.locked && inv.space() >= amount,
        }
    }
}

/// Fixed-size rectangular tile grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grid {
    width: i32,
    height: i32,
    tiles: Vec<Tile>,
    version: u64,
}

impl Grid {
    /// A `width` × `height` grid of plain floor (cost 1).
    pub fn new(width: i32, height: i32) -> Self {
        let width = width.max(0);
        let height = height.max(0);
        let mut tiles = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                tiles.push(Tile::floor(TilePos::new(x, y)));
            }
        }
        Self {
            width,
            height,
            tiles,
            version: 0,
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// Walkability version. Bumped on every movement-cost change.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn contains(&self, pos: TilePos) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.width && pos.y < self.height
    }

    pub(crate) fn index_of(&self, pos: TilePos) -> Option<usize> {
        self.contains(pos)
            .then(|| (pos.y * self.width + pos.x) as usize)
    }

    pub fn tile_at(&self, pos: TilePos) -> Option<&Tile> {
        self.index_of(pos).map(|i| &self.tiles[i])
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }

    pub fn is_walkable(&self, pos: TilePos) -> bool {
        self.tile_at(pos).is_some_and(Tile::is_walkable)
    }

    pub fn movement_cost(&self, pos: TilePos) -> f32 {
        self.tile_at(pos).map_or(0.0, Tile::movement_cost)
    }

    /// In-bounds neighbours of `pos`, orthogonal first.
    pub fn neighbors(&self, pos: TilePos, diagonals: bool) -> Vec<TilePos> {
        let count = if diagonals { 8 } else { 4 };
        NEIGHBOR_OFFSETS[..count]
            .iter()
            .map(|&(dx, dy)| pos.offset(dx, dy))
            .filter(|p| self.contains(*p))
            .collect()
    }

    /// A diagonal move clips a corner when either orthogonal flank is not walkable.
    ///
    /// Orthogonal moves never clip.
    pub fn is_clipping_corner(&self, from: TilePos, to: TilePos) -> bool {
        if !from.is_diagonal_to(to) {
            return false;
        }
        let flank_a = TilePos::new(to.x, from.y);
        let flank_b = TilePos::new(from.x, to.y);
        !self.is_walkable(flank_a) || !self.is_walkable(flank_b)
    }

    /// Whether `pos` can be entered in one step from some walkable neighbour.
    pub fn is_reachable_from_any_neighbor(&self, pos: TilePos) -> bool {
        self.neighbors(pos, true).into_iter().any(|n| {
            self.is_walkable(n) && !self.is_clipping_corner(n, pos)
        })
    }

    /// Set the floor cost of a tile. Returns false if out of bounds.
    pub fn set_base_cost(&mut self, pos: TilePos, cost: f32) -> bool {
        let Some(i) = self.index_of(pos) else {
            return false;
        };
        let cost = cost.max(0.0);
        if self.tiles[i].base_cost != cost {
            self.tiles[i].base_cost = cost;
            self.version += 1;
        }
        true
    }

    /// Install furniture on an empty tile. Returns false if occupied or out of bounds.
    pub fn place_furniture(&mut self, pos: TilePos, furniture: Furniture) -> bool {
        let Some(i) = self.index_of(pos) else {
            return false;
        };
        if self.tiles[i].furniture.is_some() {
            return false;
        }
        self.tiles[i].furniture = Some(furniture);
        self.version += 1;
        true
    }

    pub fn remove_furniture(&mut self, pos: TilePos) -> Option<Furniture> {
        let i = self.index_of(pos)?;
        let removed = self.tiles[i].furniture.take();
        if removed.is_some() {
            self.version += 1;
        }
        removed
    }

    /// Mutable access to a tile's inventory slot.
    ///
    /// Inventory never affects walkability, so this does not bump the version.
    pub fn inventory_slot_mut(&mut self, pos: TilePos) -> Option<&mut Option<Inventory>> {
        let i = self.index_of(pos)?;
        Some(&mut self.tiles[i].inventory)
    }
}
