//! The tile world: grid, derived tile graph and lookup indices.
//!
//! Every walkability mutation goes through here so the tile graph is patched
//! eagerly and never seen stale by a search. Inventory that becomes
//! available (placed, unclaimed or unlocked) is recorded by item type so
//! the job queue can wake jobs waiting on it.

use std::collections::{BTreeMap, BTreeSet};
use tilework_logic::grid::{Furniture, Grid, Tile, TilePos};
use tilework_logic::inventory::{ClaimantId, Inventory};
use tilework_logic::pathfinding::{find_path_to, Goal, Route};
use tilework_logic::tile_graph::TileGraph;

/// Grid plus everything derived from it.
#[derive(Debug, Clone)]
pub struct TileWorld {
    grid: Grid,
    graph: TileGraph,
    /// furniture kind → tiles
    furniture: BTreeMap<String, BTreeSet<TilePos>>,
    /// inventory kind → tiles with a stack of that kind
    inventory: BTreeMap<String, BTreeSet<TilePos>>,
    freed: Vec<String>,
    walkability_changed: bool,
}

impl TileWorld {
    /// A world of plain floor.
    pub fn new(width: i32, height: i32) -> Self {
        Self::from_grid(Grid::new(width, height))
    }

    pub fn from_grid(grid: Grid) -> Self {
        let graph = TileGraph::build(&grid);
        let mut world = Self {
            grid,
            graph,
            furniture: BTreeMap::new(),
            inventory: BTreeMap::new(),
            freed: Vec::new(),
            walkability_changed: false,
        };
        for tile in world.grid.tiles() {
            if let Some(f) = &tile.furniture {
                world
                    .furniture
                    .entry(f.kind.clone())
                    .or_default()
                    .insert(tile.pos);
            }
            if let Some(inv) = &tile.inventory {
                world
                    .inventory
                    .entry(inv.kind.clone())
                    .or_default()
                    .insert(tile.pos);
            }
        }
        world
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn graph(&self) -> &TileGraph {
        &self.graph
    }

    pub fn tile_at(&self, pos: TilePos) -> Option<&Tile> {
        self.grid.tile_at(pos)
    }

    pub fn is_walkable(&self, pos: TilePos) -> bool {
        self.grid.is_walkable(pos)
    }

    pub fn movement_cost(&self, pos: TilePos) -> f32 {
        self.grid.movement_cost(pos)
    }

    // ── Walkability mutations ──────────────────────────────────────────

    pub fn set_base_cost(&mut self, pos: TilePos, cost: f32) -> bool {
        let before = self.grid.version();
        let ok = self.grid.set_base_cost(pos, cost);
        self.after_mutation(pos, before);
        ok
    }

    pub fn place_furniture(&mut self, pos: TilePos, furniture: Furniture) -> bool {
        let before = self.grid.version();
        let kind = furniture.kind.clone();
        if !self.grid.place_furniture(pos, furniture) {
            return false;
        }
        self.furniture.entry(kind).or_default().insert(pos);
        self.after_mutation(pos, before);
        true
    }

    pub fn remove_furniture(&mut self, pos: TilePos) -> Option<Furniture> {
        let before = self.grid.version();
        let removed = self.grid.remove_furniture(pos)?;
        if let Some(set) = self.furniture.get_mut(&removed.kind) {
            set.remove(&pos);
        }
        self.after_mutation(pos, before);
        Some(removed)
    }

    fn after_mutation(&mut self, pos: TilePos, before: u64) {
        if self.grid.version() != before {
            self.graph.patch(&self.grid, pos);
            self.walkability_changed = true;
            log::debug!("walkability changed at {pos}, graph v{}", self.graph.version());
        }
    }

    /// Whether walkability changed since the last call.
    pub fn take_walkability_changed(&mut self) -> bool {
        std::mem::take(&mut self.walkability_changed)
    }

    pub fn furniture_count(&self, kind: &str) -> usize {
        self.furniture.get(kind).map_or(0, BTreeSet::len)
    }

    // ── Inventory ──────────────────────────────────────────────────────

    pub fn inventory_at(&self, pos: TilePos) -> Option<&Inventory> {
        self.grid.tile_at(pos)?.inventory.as_ref()
    }

    /// Drop a stack on a tile. Returns whatever could not be placed.
    ///
    /// An empty tile takes the whole stack. A tile holding the same kind
    /// takes as much as fits. Anything else takes nothing.
    pub fn place_inventory(&mut self, pos: TilePos, inv: Inventory) -> Option<Inventory> {
        if inv.is_empty() {
            return None;
        }
        if !self.grid.is_walkable(pos) {
            return Some(inv);
        }
        let Some(slot) = self.grid.inventory_slot_mut(pos) else {
            return Some(inv);
        };
        let kind = inv.kind.clone();
        let placed_before = inv.stack_size;
        let leftover = if let Some(existing) = slot.as_mut() {
            if existing.kind == kind && !existing.locked {
                existing.merge(inv)
            } else {
                Some(inv)
            }
        } else {
            *slot = Some(inv);
            None
        };
        let placed = placed_before - leftover.as_ref().map_or(0, |l| l.stack_size);
        if placed > 0 {
            self.inventory.entry(kind.clone()).or_default().insert(pos);
            self.freed.push(kind);
        }
        leftover
    }

    /// Spill a stack onto the nearest tiles that can take it, out to `radius`.
    ///
    /// Rings are searched by Chebyshev distance. Returns what did not fit.
    pub fn place_inventory_around(
        &mut self,
        center: TilePos,
        inv: Inventory,
        radius: i32,
    ) -> Option<Inventory> {
        let mut remaining = Some(inv);
        for r in 0..=radius {
            for dy in -r..=r {
                for dx in -r..=r {
                    if dx.abs().max(dy.abs()) != r {
                        continue;
                    }
                    let Some(inv) = remaining.take() else {
                        return None;
                    };
                    let pos = center.offset(dx, dy);
                    let bare = self
                        .grid
                        .tile_at(pos)
                        .is_some_and(|t| t.furniture.is_none());
                    remaining = if bare {
                        self.place_inventory(pos, inv)
                    } else {
                        Some(inv)
                    };
                }
            }
        }
        if let Some(left) = &remaining {
            log::warn!(
                "no room for {} {} within {radius} of {center}",
                left.stack_size,
                left.kind
            );
        }
        remaining
    }

    /// Take up to `amount` from a floor stack.
    ///
    /// `claimant`'s own claim is released first and other claims are
    /// respected. Returns `None` if nothing could be taken.
    pub fn take_inventory(
        &mut self,
        pos: TilePos,
        amount: u32,
        claimant: Option<ClaimantId>,
    ) -> Option<Inventory> {
        let slot = self.grid.inventory_slot_mut(pos)?;
        let stack = slot.as_mut()?;
        let (takeable, own_claim) = match claimant {
            Some(id) => {
                let own = stack.available_to(id);
                let claimed = stack.claimed_by(id);
                stack.release_claim(id);
                (own, claimed)
            }
            None => (stack.available(), 0),
        };
        let amount = if stack.locked { 0 } else { amount.min(takeable) };
        let taken = (amount > 0).then(|| stack.split(amount));
        let kind = stack.kind.clone();
        if stack.is_empty() {
            *slot = None;
            if let Some(set) = self.inventory.get_mut(&kind) {
                set.remove(&pos);
            }
        } else if own_claim > amount {
            // Part of the claim went unused
            self.freed.push(kind);
        }
        taken
    }

    pub fn set_locked(&mut self, pos: TilePos, locked: bool) -> bool {
        match self.grid.inventory_slot_mut(pos).and_then(|s| s.as_mut()) {
            Some(inv) => {
                if inv.locked && !locked {
                    self.freed.push(inv.kind.clone());
                }
                inv.locked = locked;
                true
            }
            None => false,
        }
    }

    /// Reserve up to `amount` of the stack on `pos`. Returns the amount reserved.
    pub fn claim_inventory(&mut self, pos: TilePos, claimant: ClaimantId, amount: u32) -> u32 {
        self.grid
            .inventory_slot_mut(pos)
            .and_then(|s| s.as_mut())
            .map_or(0, |inv| inv.claim(claimant, amount))
    }

    pub fn release_claim(&mut self, pos: TilePos, claimant: ClaimantId) -> bool {
        let Some(inv) = self.grid.inventory_slot_mut(pos).and_then(|s| s.as_mut()) else {
            return false;
        };
        if !inv.release_claim(claimant) {
            return false;
        }
        self.freed.push(inv.kind.clone());
        true
    }

    /// Whether any stack of `kind` anywhere could be picked up.
    pub fn has_inventory_of_kind(&self, kind: &str, allow_stockpile: bool) -> bool {
        self.inventory.get(kind).is_some_and(|tiles| {
            tiles.iter().any(|&pos| {
                self.grid
                    .tile_at(pos)
                    .is_some_and(|t| t.can_pick_up(allow_stockpile))
            })
        })
    }

    /// Item types placed, unclaimed or unlocked since the last call.
    pub fn drain_freed(&mut self) -> Vec<String> {
        let mut kinds = std::mem::take(&mut self.freed);
        kinds.sort();
        kinds.dedup();
        kinds
    }

    // ── Searches ───────────────────────────────────────────────────────

    /// Run a search against the current graph.
    ///
    /// The graph is always patched on mutation, so a search error here is a
    /// bug. It is logged and treated as "no path" so the agent re-plans.
    pub fn find_path(&self, from: TilePos, goal: &Goal) -> Option<Route> {
        match find_path_to(&self.grid, &self.graph, from, goal) {
            Ok(route) => route,
            Err(e) => {
                log::error!("path search from {from} failed: {e}");
                None
            }
        }
    }

    pub fn path_to_tile(&self, from: TilePos, target: TilePos, adjacent: bool) -> Option<Route> {
        let goal = if adjacent {
            Goal::Adjacent(target)
        } else {
            Goal::Tile(target)
        };
        self.find_path(from, &goal)
    }

    pub fn path_to_closest_inventory(
        &self,
        kinds: &[String],
        from: TilePos,
        allow_stockpile: bool,
    ) -> Option<Route> {
        if kinds.is_empty() {
            return None;
        }
        let goal = Goal::Inventory {
            kinds: kinds.to_vec(),
            allow_stockpile,
        };
        self.find_path(from, &goal)
    }

    /// Route to the nearest furniture of `kind`, or to a tile next to it.
    pub fn path_to_furniture(&self, from: TilePos, kind: &str, adjacent: bool) -> Option<Route> {
        if self.furniture_count(kind) == 0 {
            return None;
        }
        let goal = if adjacent {
            Goal::AdjacentToFurniture(kind.to_string())
        } else {
            Goal::FurnitureKind(kind.to_string())
        };
        self.find_path(from, &goal)
    }

    /// The furniture of `kind` at `pos`, or else one of its neighbours.
    pub fn furniture_near(&self, pos: TilePos, kind: &str) -> Option<TilePos> {
        let has = |p: TilePos| self.grid.tile_at(p).is_some_and(|t| t.has_furniture_kind(kind));
        if has(pos) {
            return Some(pos);
        }
        self.grid.neighbors(pos, true).into_iter().find(|&n| has(n))
    }

    pub fn path_to_dump(&self, from: TilePos, kind: &str, amount: u32) -> Option<Route> {
        let goal = Goal::DumpSpot {
            kind: kind.to_string(),
            amount,
        };
        self.find_path(from, &goal)
    }
}
