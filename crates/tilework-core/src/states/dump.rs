use super::{AgentCtx, StateKind, Transition};
use tilework_logic::pathfinding::Goal;

/// Put down whatever the agent is carrying.
///
/// Drops on the current tile when it is empty or holds a compatible stack
/// with room. Otherwise walks to the nearest tile that can take it. With
/// nowhere to go, the agent keeps the inventory and the state finishes.
#[derive(Debug, Clone, Default)]
pub struct DumpState;

impl DumpState {
    pub(super) fn update(&mut self, ctx: &mut AgentCtx) -> Transition {
        let Some(carried) = ctx.agent.carried.as_ref() else {
            return Transition::Finished;
        };
        let (kind, amount) = (carried.kind.clone(), carried.stack_size);
        let here = ctx.agent.tile;

        let fits_here = ctx
            .world
            .tile_at(here)
            .is_some_and(|t| t.can_accept(&kind, amount));
        if fits_here {
            if let Some(inv) = ctx.agent.carried.take() {
                log::debug!("{}: dumping {} {} at {}", ctx.agent.name, amount, kind, here);
                ctx.agent.carried = ctx.world.place_inventory(here, inv);
            }
            return Transition::Finished;
        }

        match ctx.world.path_to_dump(here, &kind, amount) {
            Some(route) => match route.destination() {
                Some(dest) => Transition::Push(StateKind::move_along(route, Goal::Tile(dest))),
                None => Transition::Finished,
            },
            None => {
                log::warn!(
                    "{}: nowhere to dump {} {}, keeping it",
                    ctx.agent.name,
                    amount,
                    kind
                );
                Transition::Finished
            }
        }
    }
}
