//! The agent component: where an agent stands and what it carries.

use hecs::Entity;
use serde::{Deserialize, Serialize};
use tilework_logic::grid::TilePos;
use tilework_logic::inventory::{ClaimantId, Inventory};

/// Claim and worker identity for an agent entity.
pub fn agent_id(entity: Entity) -> ClaimantId {
    entity.to_bits().get()
}

/// An autonomous worker on the grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub name: String,
    /// Tile the agent currently occupies.
    pub tile: TilePos,
    /// Tile the agent is stepping toward, while walking.
    pub next_tile: Option<TilePos>,
    /// Fraction (0..1) of the step toward `next_tile` already covered.
    pub move_progress: f32,
    /// Walking speed in tiles per second on cost-1 floor.
    pub speed: f32,
    /// At most one stack of one item type.
    pub carried: Option<Inventory>,
}

impl Agent {
    pub fn new(name: impl Into<String>, tile: TilePos, speed: f32) -> Self {
        Self {
            name: name.into(),
            tile,
            next_tile: None,
            move_progress: 0.0,
            speed,
            carried: None,
        }
    }

    pub fn carried_kind(&self) -> Option<&str> {
        self.carried.as_ref().map(|inv| inv.kind.as_str())
    }

    pub fn carried_amount(&self) -> u32 {
        self.carried.as_ref().map_or(0, |inv| inv.stack_size)
    }

    /// Add a stack to what the agent carries. Returns what did not fit.
    pub fn pick_up(&mut self, inv: Inventory) -> Option<Inventory> {
        match &mut self.carried {
            Some(held) => held.merge(inv),
            None => {
                self.carried = Some(inv);
                None
            }
        }
    }

    pub fn stop_walking(&mut self) {
        self.next_tile = None;
        self.move_progress = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_up_merges_same_kind() {
        let mut agent = Agent::new("Ada", TilePos::new(0, 0), 5.0);
        assert!(agent.pick_up(Inventory::new("Steel", 3, 50)).is_none());
        assert!(agent.pick_up(Inventory::new("Steel", 2, 50)).is_none());
        assert_eq!(agent.carried_amount(), 5);

        let rejected = agent.pick_up(Inventory::new("Wood", 1, 50));
        assert_eq!(rejected.map(|i| i.kind), Some("Wood".to_string()));
        assert_eq!(agent.carried_kind(), Some("Steel"));
    }
}
